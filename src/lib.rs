//! # transform-workitem: Type-Keyed Transform Work Items
//!
//! A workflow-engine work item that converts an input object into a requested
//! output type by dispatching to a registered transform.
//!
//! ## Features
//!
//! - **Transform registry**: conversions keyed by (output type, input type) identity,
//!   safe to share across threads while transforms are still being registered
//! - **Work item handler**: validates `InputObject` / `OutputType`, resolves the
//!   type name, executes, and reports `OutputObject` or a typed failure
//! - **JSON host**: work requests and completions as JSON, with per-type codecs
//! - **HTTP server**: axum router exposing the JSON host
//! - **Standard transforms**: formatting and parsing between integers, floats,
//!   booleans and strings
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use transform_workitem::{
//!     CompletionSlot, TransformRegistry, TransformWorkItemHandler, WorkItem,
//!     WorkItemHandler, WorkOutcome, INPUT_OBJECT, OUTPUT_OBJECT, OUTPUT_TYPE,
//! };
//!
//! let registry = TransformRegistry::new();
//! registry.register(|n: i64| format!("#{}", n));
//! registry.alias::<String>("String");
//!
//! let handler = TransformWorkItemHandler::new(Arc::new(registry));
//! let item = WorkItem::new()
//!     .parameter(INPUT_OBJECT, 7i64)
//!     .parameter(OUTPUT_TYPE, "String".to_string());
//!
//! let slot = CompletionSlot::new();
//! handler.execute_work_item(item, &slot);
//!
//! match slot.into_outcome() {
//!     Some((_, WorkOutcome::Completed(mut results))) => {
//!         let out = results.remove(OUTPUT_OBJECT).unwrap();
//!         assert_eq!(out.downcast::<String>().unwrap(), "#7");
//!     }
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! ```

// Core modules
pub mod types;
pub mod catalog;
pub mod transform_registry;

// Engine-facing work item handler
pub mod workitem;

// JSON boundary
pub mod wire;
pub mod serialization;

pub mod builtins;
pub mod config;

// HTTP front end for `serve`
pub mod server;

// Re-export key types
pub use types::{DynValue, TypeKey};
pub use catalog::TypeCatalog;
pub use transform_registry::{BoxError, Transform, TransformError, TransformProvider, TransformRegistry};
pub use workitem::{
    CompletionSlot, TransformWorkItemHandler, WorkItem, WorkItemHandler, WorkItemManager,
    WorkOutcome, INPUT_OBJECT, OUTPUT_OBJECT, OUTPUT_TYPE,
};
pub use wire::{CompletionStatus, ErrorReport, JsonCodec, JsonHost, TypedValue, WorkCompletion, WorkRequest};
pub use serialization::{JsonArrayWriter, NdjsonReader, NdjsonWriter, SerializationError};
pub use builtins::{standard_codec, StandardTransforms};
pub use config::{HandlerConfig, ServerConfig};
