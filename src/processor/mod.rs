mod control;
mod datapath;

pub use control::{ControlUnit, StepOutcome};
pub use datapath::DataPath;
