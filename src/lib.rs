pub mod api;
pub mod client;
pub mod context;
pub mod error;
pub mod inventory;
pub mod mcp;
pub mod models;
pub mod playbook;
pub mod store;

pub use context::Context;
