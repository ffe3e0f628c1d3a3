//! Shared building blocks for the opshub integration hub.
//!
//! Nothing in this crate talks to the network. It owns the layered
//! configuration, the error taxonomy used at crate boundaries, and the
//! transient views of vendor payloads that the other crates inspect.

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::chat::{
    ChatCompletion, ChatMessage, ChatRequest, ChatRole, ToolCall, ToolChoice, ToolDefinition,
};
pub use domain::crm::{AccountId, AccountMatch, AccountSnapshot, NewNote, NewTask};
pub use errors::{ApplicationError, DomainError, InterfaceError};
