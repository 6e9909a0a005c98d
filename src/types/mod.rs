//! Shared types for Vineyard

mod error;

pub use error::{Result, VineyardError};
