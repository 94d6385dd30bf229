use llvm::{
	intrinsic::Intrinsic, ArithInstr, ArithOp, CallInstr, LlvmInstr, LlvmInstrVariant, Value,
	VarType,
};
use log::debug;
use rrvm::program::LlvmProgram;
use utils::errors::Result;

use super::RenameAssume;
use crate::RrvmPass;

impl RenameAssume {
	pub fn new() -> Self {
		Self::default()
	}
}

impl RrvmPass for RenameAssume {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool> {
		let mut flag = false;
		let assume = Intrinsic::Assume.symbol().unwrap_or_default();
		for func in program.funcs.iter() {
			for bb in func.cfg.blocks.iter() {
				let mut bb_ = bb.borrow_mut();
				let old_instrs = std::mem::take(&mut bb_.instrs);
				let mut new_instrs: Vec<LlvmInstr> = Vec::new();
				for instr in old_instrs {
					let rename = match instr.get_variant() {
						LlvmInstrVariant::CallInstr(call) => {
							let cond = call.params.first().map(|(_, v)| v.clone());
							match Intrinsic::classify(&call.func.name) {
								Intrinsic::AssumeAlias => cond.map(|v| (false, v)),
								Intrinsic::AssumeNotAlias => cond.map(|v| (true, v)),
								_ => None,
							}
						}
						_ => None,
					};
					let Some((negate, cond)) = rename else {
						new_instrs.push(instr);
						continue;
					};
					let cond = if negate {
						let target = program.temp_mgr.new_temp(VarType::I1, false);
						new_instrs.push(Box::new(ArithInstr {
							target: target.clone(),
							op: ArithOp::Xor,
							var_type: VarType::I1,
							lhs: cond,
							rhs: Value::Bool(true),
						}));
						Value::Temp(target)
					} else {
						cond
					};
					debug!("{}: renamed `{}`", func.name, instr);
					new_instrs.push(Box::new(CallInstr::new_void(
						assume,
						vec![(VarType::I1, cond)],
					)));
					flag = true;
				}
				bb_.instrs = new_instrs;
			}
		}
		if flag {
			program.externals.get_or_insert_decl(Intrinsic::Assume, VarType::I1);
		}
		Ok(flag)
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		test_utils::{count_calls, parse_ok},
		RenameAssume, RrvmPass,
	};

	#[test]
	fn aliases_are_renamed() {
		let src = r#"
declare void @verifier.assume(i1)
declare void @verifier.assume.not(i1)
define void @main(i32 %x) {
entry:
  %c = icmp sgt i32 %x, 0
  call void @verifier.assume(i1 %c)
  call void @verifier.assume.not(i1 %c)
  ret void
}
"#;
		let mut program = parse_ok(src);
		assert!(RenameAssume::new().apply(&mut program).unwrap());
		assert_eq!(count_calls(&program, "__VERIFIER_assume"), 2);
		assert_eq!(count_calls(&program, "verifier.assume"), 0);
		assert_eq!(count_calls(&program, "verifier.assume.not"), 0);
		let text = program.to_string();
		assert!(text.contains(
			"call void @__VERIFIER_assume(i1 %c)\n  %1 = xor i1 %c, true\n  call void @__VERIFIER_assume(i1 %1)"
		));
		assert!(!RenameAssume::new().apply(&mut program).unwrap());
	}
}
