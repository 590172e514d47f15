#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
#[cfg(feature = "cookie-store")]
pub mod cookie_store;
pub mod error;
pub mod logout;
pub mod registry;
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use client::{BackendErrorPayload, SessionClient};
pub use config::SessionConfig;
#[cfg(feature = "cookie-store")]
pub use cookie_store::CookieTokenStore;
pub use error::Error;
pub use logout::LogoutOutcome;
pub use registry::ClientRegistry;
pub use store::{MemoryTokenStore, StoreError, TokenStore};
pub use token::{CredentialToken, TokenField};
pub use types::UserIdentifier;
