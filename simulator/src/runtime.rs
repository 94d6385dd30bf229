use llvm::intrinsic::Intrinsic;
use log::trace;
use rand::Rng;
use utils::{KindError, Result};

use crate::{
	simulator::{Outcome, Simulator},
	value::SimValue,
};

fn arg(name: &str, args: &[SimValue], index: usize) -> Result<SimValue> {
	args.get(index).copied().ok_or_else(|| {
		KindError::RuntimeError(format!("{} called without argument {}", name, index))
	})
}

impl Simulator<'_> {
	/// Runs a call to a function with no body. Only the verifier runtime is
	/// known; anything else is an error.
	pub(crate) fn call_intrinsic(
		&mut self,
		name: &str,
		args: &[SimValue],
	) -> Result<Option<Outcome>> {
		let outcome = match Intrinsic::classify(name) {
			Intrinsic::Assume | Intrinsic::AssumeAlias => {
				(!arg(name, args, 0)?.is_true()?).then_some(Outcome::Discarded)
			}
			Intrinsic::AssumeNotAlias => arg(name, args, 0)?.is_true()?.then_some(Outcome::Discarded),
			Intrinsic::Assert => {
				(!arg(name, args, 0)?.is_true()?).then_some(Outcome::AssertionFailed)
			}
			Intrinsic::AssertOrAssume => {
				if arg(name, args, 0)?.is_true()? {
					None
				} else if arg(name, args, 1)?.is_true()? {
					Some(Outcome::Discarded)
				} else {
					Some(Outcome::AssertionFailed)
				}
			}
			Intrinsic::MakeNondet => {
				let addr = arg(name, args, 0)?;
				let raw = match self.nondet.pop_front() {
					Some(v) => v,
					None => self.rng.gen(),
				};
				let index = addr.as_ptr()?;
				let slot = self.memory.get_mut(index).ok_or_else(|| {
					KindError::RuntimeError(format!("dangling pointer {}", index))
				})?;
				let value = SimValue::from_int(slot.var_type, raw)?;
				trace!("nondet value {:?} stored at {}", value, index);
				slot.value = Some(value);
				None
			}
			Intrinsic::Abort => Some(Outcome::Aborted),
			Intrinsic::Unrecognized => {
				return Err(KindError::RuntimeError(format!(
					"call to external function {}",
					name
				)))
			}
		};
		Ok(outcome)
	}
}
