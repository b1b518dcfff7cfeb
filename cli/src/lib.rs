//! Interactive prompt-driven client for a crudify server.

pub mod client;
pub mod descriptors;
pub mod error;
pub mod input;
pub mod prompt;
pub mod session;

pub use client::ApiClient;
pub use descriptors::{discover, DescriptorSource};
pub use error::CliError;
pub use prompt::{LinePrompter, Prompter};
pub use session::{Operation, Session};
