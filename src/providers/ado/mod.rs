mod client;
pub mod links;
mod provider;
pub mod types;

pub(crate) use client::ensure_success;
pub use client::AdoClient;
pub use provider::{AdoProvider, DEFAULT_RUN_WINDOW};
