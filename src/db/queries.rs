use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::crypto::hash_secret;
use crate::error::Result;
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{ORDER_COLS, query_one};

/// Seconds after which an unreleased initialization claim is considered abandoned.
pub const INIT_LOCK_TTL_SECS: i64 = 120;

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, &email, &input.name, now],
    )?;

    Ok(User {
        id,
        email,
        name: input.name.clone(),
        created_at: now,
    })
}

// ============ Sessions ============

/// Generate a new opaque session token.
pub fn generate_session_token() -> String {
    format!("sess_{}", Uuid::new_v4().as_simple())
}

/// Store a session for `token`. Only the token hash is persisted.
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    token: &str,
    ttl_secs: i64,
) -> Result<Session> {
    let now = now();
    let session = Session {
        token_hash: hash_secret(token),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + ttl_secs,
    };

    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            &session.token_hash,
            &session.user_id,
            session.created_at,
            session.expires_at
        ],
    )?;

    Ok(session)
}

/// Resolve a bearer token to its user, ignoring expired sessions.
pub fn get_session_user(conn: &Connection, token: &str) -> Result<Option<SessionUser>> {
    let hash = hash_secret(token);
    let user: Option<User> = query_one(
        conn,
        "SELECT u.id, u.email, u.name, u.created_at
         FROM sessions s JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ?1 AND s.expires_at > ?2",
        params![hash, now()],
    )?;

    Ok(user.map(|u| SessionUser {
        id: u.id,
        email: u.email,
    }))
}

/// Delete expired sessions. Returns the number of rows removed.
pub fn purge_expired_sessions(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now()],
    )?;
    Ok(deleted)
}

// ============ Orders ============

pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    let id = EntityType::Order.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO orders (id, user_id, total, shipping_address_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            &id,
            &input.user_id,
            input.total,
            &input.shipping_address_id,
            OrderStatus::Pending.as_ref(),
            now
        ],
    )?;

    Ok(Order {
        id,
        user_id: input.user_id.clone(),
        total: input.total,
        shipping_address_id: input.shipping_address_id.clone(),
        payment_reference: None,
        status: OrderStatus::Pending,
        init_locked_at: None,
        last_init_reference: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

/// Look up an order only if it belongs to `user_id`.
pub fn get_order_for_user(conn: &Connection, id: &str, user_id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM orders WHERE id = ?1 AND user_id = ?2",
            ORDER_COLS
        ),
        params![id, user_id],
    )
}

/// Atomically claim an order for payment initialization.
///
/// Succeeds only when the order belongs to `user_id`, has no payment
/// reference, and no other initialization holds a live claim. Claims older
/// than `INIT_LOCK_TTL_SECS` are treated as abandoned.
///
/// Returns:
/// - `Ok(true)` if this call now holds the claim
/// - `Ok(false)` if the order is missing, not owned, already paid, or claimed
pub fn try_claim_order_initialization(
    conn: &Connection,
    order_id: &str,
    user_id: &str,
) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE orders SET init_locked_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND payment_reference IS NULL
           AND (init_locked_at IS NULL OR init_locked_at < ?4)",
        params![now, order_id, user_id, now - INIT_LOCK_TTL_SECS],
    )?;
    Ok(affected > 0)
}

/// Release an initialization claim. On success the issued reference is recorded.
pub fn release_order_initialization(
    conn: &Connection,
    order_id: &str,
    issued_reference: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE orders
         SET init_locked_at = NULL,
             last_init_reference = COALESCE(?1, last_init_reference)
         WHERE id = ?2",
        params![issued_reference, order_id],
    )?;
    Ok(())
}

/// Record a confirmed payment: store the gateway reference and move the
/// order to PROCESSING.
///
/// Single write, so a replayed event leaves the same end state. A missing
/// reference keeps whatever reference is already stored. Orders already
/// SHIPPED or DELIVERED keep their status but still get the reference; a
/// CANCELLED order that was paid is reopened as PROCESSING.
///
/// Returns `false` if no order has this id.
pub fn confirm_order_payment(
    conn: &Connection,
    order_id: &str,
    reference: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders
         SET status = CASE WHEN status IN (?1, ?2) THEN status ELSE ?3 END,
             payment_reference = COALESCE(?4, payment_reference),
             updated_at = ?5
         WHERE id = ?6",
        params![
            OrderStatus::Shipped.as_ref(),
            OrderStatus::Delivered.as_ref(),
            OrderStatus::Processing.as_ref(),
            reference,
            now(),
            order_id
        ],
    )?;
    Ok(affected > 0)
}
