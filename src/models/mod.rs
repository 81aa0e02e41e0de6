pub mod lifecycle;
pub mod process;
pub mod status;

pub use lifecycle::{Lifecycle, LifecycleEvent, LifecycleState};
pub use process::{sort_by_sequence, ProcessDefinition, ProcessInfo, ProcessSpec, SequenceUpdate};
pub use status::ProcessStatus;
