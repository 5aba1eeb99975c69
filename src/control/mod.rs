//! Control core: comfort policy, tick loop and status output.

pub mod controller;
pub mod logic;
pub mod status;

pub use controller::Controller;
pub use logic::{ControlParameters, Decision, DecisionReason, decide, evaluate};
pub use status::{StatusRecord, StatusSink, StdoutStatusSink};
