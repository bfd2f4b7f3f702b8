//! Request handlers.

pub mod gateway;
pub mod health;
