use llvm::{
	intrinsic::Intrinsic, CallInstr, CompInstr, CompKind, CompOp, LlvmTemp, Value, VarType,
};
use log::{debug, info};
use rrvm::{program::LlvmProgram, rrvm_loop::LoopPtr, verify::assert_phi_nodes};
use utils::errors::Result;

use super::InductiveBase;
use crate::{checked_bound, editor::LoopEditor, KindConfig, RrvmPass};

impl InductiveBase {
	pub fn new(config: KindConfig) -> Self {
		Self { config }
	}
}

impl LoopEditor<'_> {
	/// `counter > bound` computed at the end of the header.
	pub(crate) fn push_exceeded(
		&mut self,
		loop_: &LoopPtr,
		counter: LlvmTemp,
		bound: i32,
	) -> LlvmTemp {
		let header = loop_.borrow().header.clone();
		let target = self
			.temp_mgr
			.new_named_temp(format!("{}.exceeded", header.borrow().name), VarType::I1);
		header.borrow_mut().push(Box::new(CompInstr {
			kind: CompKind::Icmp,
			target: target.clone(),
			op: CompOp::Sgt,
			var_type: VarType::I32,
			lhs: Value::Temp(counter),
			rhs: Value::Int(bound),
		}));
		target
	}

	/// Makes every execution that takes the backedge of `loop_` more than `n`
	/// times infeasible. Returns `Ok(false)` without editing when `n == 0`.
	pub fn bound(&mut self, loop_: &LoopPtr, n: u32) -> Result<bool> {
		if n == 0 {
			debug!("{}: backedge bound is 0, loop left unchanged", self.func.name);
			return Ok(false);
		}
		let bound = checked_bound(n, "max backedge count")?;
		self.check_instrumentable(loop_, false)?;

		let counter = self.inject_backedge_counter(loop_)?;
		let exceeded = self.push_exceeded(loop_, counter, bound);
		let header = loop_.borrow().header.clone();
		let then_name = format!("{}.bound", header.borrow().name);
		let (then, _) = self.split_block_and_insert_if_then(
			&header,
			Value::Temp(exceeded),
			&then_name,
		);

		let assume = self
			.externals
			.get_or_insert_decl(Intrinsic::Assume, VarType::I1)
			.name
			.clone();
		let abort = self
			.externals
			.get_or_insert_decl(Intrinsic::Abort, VarType::Void)
			.name
			.clone();
		{
			let mut then_ = then.borrow_mut();
			then_.push(Box::new(CallInstr::new_void(
				assume,
				vec![(VarType::I1, Value::Bool(false))],
			)));
			then_.push(Box::new(CallInstr::new_void(abort, Vec::new())));
		}
		assert_phi_nodes(self.func);
		info!(
			"{}: bounded loop {} to {} backedges",
			self.func.name,
			header.borrow().name,
			n
		);
		Ok(true)
	}
}

impl RrvmPass for InductiveBase {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool> {
		let n = self.config.max_backedge_count;
		if n == 0 {
			debug!("max backedge count is 0, base case disabled");
			return Ok(false);
		}
		checked_bound(n, "max backedge count")?;
		// 先检查所有循环，出错时程序保持原样
		for func in program.funcs.iter_mut() {
			let editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			for loop_ in editor.loops() {
				editor.check_instrumentable(&loop_, false)?;
			}
		}
		let mut flag = false;
		for func in program.funcs.iter_mut() {
			let mut editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			for loop_ in editor.loops() {
				flag |= editor.bound(&loop_, n)?;
			}
		}
		Ok(flag)
	}
}
