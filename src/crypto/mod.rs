//! Cryptographic utilities and authentication.

pub mod auth;
pub mod ss58;
