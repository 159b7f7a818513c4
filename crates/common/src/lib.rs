//! Shared types for the IBM Cloud volumes proxy workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
