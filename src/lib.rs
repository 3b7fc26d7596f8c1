//! Orderpay - Paystack payment initialization and webhook confirmation
//!
//! This library provides the order pricing, database operations, Paystack
//! client, and HTTP handlers behind the `orderpay` server.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod util;
