//! Session token validation.

pub mod jwt;
