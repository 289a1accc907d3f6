//! Endpoint handlers.

pub mod dividends;
pub mod health;
pub mod history;
pub mod tasks;
pub mod token;
