use serde::{Deserialize, Serialize};

/// Storefront customer. Owned by the external auth system; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
}

/// A login session. Only the SHA-256 of the bearer token is stored.
#[derive(Debug, Clone)]
pub struct Session {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Authenticated identity attached to requests by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}
