//! HTTP server for Vineyard

pub mod http;

pub use http::{run, AppState};
