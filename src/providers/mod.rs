pub mod ado;
mod webhook;

pub use ado::{AdoClient, AdoProvider};
pub use webhook::WebhookClient;
