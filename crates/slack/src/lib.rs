//! Slack integration for opshub.
//!
//! - **Payloads** (`payload`) - Events API and interaction bodies decoded into envelopes
//! - **Signatures** (`signature`) - `v0` request signing checks
//! - **Events** (`events`) - Dispatcher routing envelopes to typed services
//! - **Block Kit** (`blocks`) - Message, modal and template builders
//! - **Web API** (`api`) - `chat.postMessage`, `chat.update`, `views.open`
//! - **Progress** (`progress`) - A single message edited through a sequence of steps
//!
//! ```text
//! HTTP webhook → signature check → payload → EventDispatcher → services
//!                                                   ↓
//!                            Block Kit ← SlackApi ← ProgressMessage
//! ```

pub mod api;
pub mod blocks;
pub mod events;
pub mod payload;
pub mod progress;
pub mod signature;
