//! VK account linking.
//!
//! - `pkce` - verifier/challenge generation and the pending-login store
//! - `client` - VK ID OAuth endpoints and the VK API
//! - `tokens` - lazy refresh of stored access tokens
//! - `error` - integration error type

pub mod client;
pub mod error;
pub mod pkce;
pub mod tokens;

pub use client::{VkClient, VkGroup};
pub use pkce::PkceStore;
pub use tokens::valid_access_token;
