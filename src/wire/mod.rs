/// JSON boundary for work requests
///
/// Provides the wire envelope, a per-type JSON codec and a host that turns
/// JSON work requests into work items and back into completions.

pub mod codec;
pub mod envelope;
pub mod host;

pub use codec::JsonCodec;
pub use envelope::{CompletionStatus, ErrorReport, TypedValue, WorkCompletion, WorkRequest};
pub use host::JsonHost;
