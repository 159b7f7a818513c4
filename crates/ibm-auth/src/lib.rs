//! IBM Cloud IAM authentication library
//!
//! Exchanges an IBM Cloud API key for an IAM bearer token and keeps that
//! token in a single-record store. The volumes proxy reads the stored token
//! on every upstream call; nothing here tracks expiry or refreshes.
//!
//! Flow:
//! 1. Caller hands an API key to `TokenManager::exchange_api_key()`
//! 2. `token::request_token()` POSTs the apikey grant to IAM
//! 3. The returned `access_token` overwrites the record via `TokenStore::set()`
//! 4. `TokenManager::load_token()` reads it back for upstream calls

pub mod constants;
pub mod error;
pub mod manager;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use manager::TokenManager;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{TokenResponse, request_token};
