pub mod inventory;
pub mod launcher;
pub mod matcher;
pub mod orchestrator;
pub mod path_identity;
pub mod port_probe;
pub mod readiness;
pub mod terminator;

pub use inventory::SystemInventory;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use terminator::{platform_terminator, EscalationPolicy};
