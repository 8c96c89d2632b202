// ABOUTME: Type-safe identifiers for engine objects.
// ABOUTME: Uses phantom types to prevent id confusion at compile time.

mod id;

pub use id::{ContainerId, ExecId, Id, ServiceId, TaskId};
