//! API handlers.

pub mod admin;
pub mod dashboard;
pub mod health;
pub mod payments;
pub mod session;
