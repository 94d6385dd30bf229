mod runtime;
pub mod simulator;
pub mod value;

pub use simulator::{ExecResult, Outcome, Simulator};
pub use value::SimValue;
