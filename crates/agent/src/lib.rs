//! Agent runtime: a bounded tool-routing loop over a chat-completion model.
//!
//! The loop offers the model a fixed registry of CRM functions, runs at
//! most one of them per turn and asks the model once more for the final
//! answer:
//!
//! 1. **Guardrails** (`guardrails`) - reject blank or oversized input
//! 2. **Conversation** (`conversation`) - strip mentions, build the prompt
//! 3. **Model call** (`llm`) - first completion, optionally choosing a tool
//! 4. **Tool execution** (`tools`, `crm_tools`) - one function call
//! 5. **Final answer** - second completion with the tool result attached
//!
//! # Key Types
//!
//! - `AgentRuntime` - the loop (see `runtime`)
//! - `LlmClient` - the model seam, implemented by the Writer client
//! - `ToolRegistry` - named functions with JSON-schema parameters

pub mod conversation;
pub mod crm_tools;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use runtime::{AgentError, AgentRuntime, ChatReply, TurnObserver, TurnOutcome};
