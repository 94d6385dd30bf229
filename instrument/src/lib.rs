pub mod base_case;
pub mod editor;
pub mod explicit_int_loads;
pub mod loop_simplify;
pub mod rename_assume;
pub mod step_case;

#[cfg(test)]
mod test_utils;

pub use base_case::InductiveBase;
pub use explicit_int_loads::ExplicitIntLoads;
pub use loop_simplify::LoopSimplify;
pub use rename_assume::RenameAssume;
pub use step_case::InductiveStep;

use rrvm::program::LlvmProgram;
use utils::{errors::Result, KindError};

/// A whole-program transformation. `Ok(true)` means something changed.
pub trait RrvmPass {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool>;
}

/// Bounds supplied by the verification harness. Zero disables the
/// corresponding transformation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindConfig {
	/// Backedge traversals the base case explores before cutting the path.
	pub max_backedge_count: u32,
	/// Iterations assumed before the step case checks its assertions.
	pub k: u32,
}

/// Counter phis are named `<header>.counter`, possibly with a number appended.
pub const COUNTER_SUFFIX: &str = ".counter";

/// Turns a bound into the `i32` the counter is compared with. The counter
/// must still be able to exceed the bound without wrapping, so `i32::MAX`
/// itself is rejected.
pub(crate) fn checked_bound(n: u32, what: &str) -> Result<i32> {
	match i32::try_from(n) {
		Ok(bound) if bound < i32::MAX => Ok(bound),
		_ => Err(KindError::InvalidConfig(format!(
			"{} = {} leaves no room for an i32 counter to exceed it",
			what, n
		))),
	}
}
