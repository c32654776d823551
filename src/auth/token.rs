//! Access tokens minted by the platform's token endpoint.

pub mod access;
pub mod secret;
