// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # modelgate Dispatch
//!
//! Request orchestration for the modelgate gateway.
//!
//! A request names a model; the orchestrator resolves it through the
//! catalog, sends it to the model's client and runs the tool-call loop:
//!
//! - [`RequestOrchestrator`] - Non-streaming and streaming dispatch
//! - [`RoundFilter`] - Hides tool-call completion from streaming callers
//! - [`ToolBox`] - Registered [`ToolHandler`]s behind the executor contract
//!
//! ## Tool Rounds
//!
//! While a response asks for tools, the tools run and a follow-up request
//! carrying the assistant message and one `tool` message per call goes
//! out. After `max_tool_rounds` rounds a last request is sent with tools
//! disabled and its answer is returned as is.
//!
//! Streaming callers see status chunks between rounds and exactly one
//! completed chunk, from the round that ends the request.
//!
//! ## Usage
//!
//! ```ignore
//! use modelgate_dispatch::{RequestOrchestrator, ToolBox};
//!
//! let orchestrator = RequestOrchestrator::new(catalog, Arc::new(ToolBox::new()))
//!     .with_max_tool_rounds(5);
//!
//! let response = orchestrator
//!     .send_payload(json!({"model": "gpt-4o", "messages": [...]}))
//!     .await?;
//! ```

pub mod error;
pub mod orchestrator;
pub mod rounds;
pub mod tools;

pub use error::{DispatchError, ToolError};
pub use orchestrator::{DEFAULT_MAX_TOOL_ROUNDS, RequestOrchestrator};
pub use rounds::{MAX_ROUNDS_MESSAGE, RoundFilter, executing_status, max_rounds_status};
pub use tools::{FUNCTION_CALLING, ToolBox, ToolHandler, ToolResult};
