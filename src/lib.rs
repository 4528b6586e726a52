pub mod api;
pub mod config;
pub mod coverage;
pub mod deviation;
pub mod error;
pub mod export;
pub mod features;
pub mod geometry;
pub mod patterns;
pub mod session;
pub mod store;
pub mod types;

pub use error::{KeyTraceError, KtResult};
