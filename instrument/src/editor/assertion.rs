use llvm::{intrinsic::Intrinsic, CallInstr, LlvmInstr, LlvmInstrVariant, Value, VarType};
use log::debug;
use rrvm::rrvm_loop::LoopPtr;

use super::LoopEditor;

fn is_assertion(instr: &LlvmInstr) -> bool {
	matches!(
		instr.get_variant(),
		LlvmInstrVariant::CallInstr(call) if Intrinsic::classify(&call.func.name) == Intrinsic::Assert
	)
}

impl LoopEditor<'_> {
	pub fn has_assertions(&self, loop_: &LoopPtr) -> bool {
		self
			.forest
			.blocks(loop_, &self.func.cfg)
			.iter()
			.any(|bb| bb.borrow().instrs.iter().any(is_assertion))
	}

	/// Replaces every `__VERIFIER_assert(e)` in the blocks of `loop_`, nested
	/// loops included, by `__VERIFIER_assert_or_assume(e, flag)`. Calls are
	/// visited in program order. Returns how many were rewritten.
	pub fn rewrite_assertions(&mut self, loop_: &LoopPtr, flag: Value) -> usize {
		let mut count = 0;
		let mut cond_type = None;
		for bb in self.forest.blocks(loop_, &self.func.cfg) {
			let mut bb_ = bb.borrow_mut();
			for instr in bb_.instrs.iter_mut() {
				let new_call = match instr.get_variant() {
					LlvmInstrVariant::CallInstr(call)
						if Intrinsic::classify(&call.func.name) == Intrinsic::Assert =>
					{
						let mut params = call.params.clone();
						cond_type.get_or_insert(
							params.first().map_or(VarType::I1, |(t, _)| *t),
						);
						params.push((VarType::I1, flag.clone()));
						CallInstr::new_void(
							Intrinsic::AssertOrAssume.symbol().unwrap_or_default(),
							params,
						)
					}
					_ => continue,
				};
				*instr = Box::new(new_call);
				count += 1;
			}
		}
		if let Some(cond_type) = cond_type {
			self.externals.get_or_insert_decl(Intrinsic::AssertOrAssume, cond_type);
		}
		debug!(
			"{}: rewrote {} assertions in loop {}",
			self.func.name,
			count,
			loop_.borrow().header_name()
		);
		count
	}
}
