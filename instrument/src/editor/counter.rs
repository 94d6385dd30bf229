use std::rc::Rc;

use llvm::{ArithInstr, ArithOp, LlvmTemp, PhiInstr, Value, VarType};
use log::debug;
use rrvm::rrvm_loop::LoopPtr;
use utils::errors::Result;

use super::LoopEditor;
use crate::COUNTER_SUFFIX;

impl LoopEditor<'_> {
	/// Adds `%<header>.counter = phi i32 [ 0, %preheader ], [ %next, %latch ]`
	/// with `%next = add i32 %counter, 1` at the end of the latch, so that on
	/// entry to the header the counter equals the number of backedges taken.
	pub fn inject_backedge_counter(&mut self, loop_: &LoopPtr) -> Result<LlvmTemp> {
		let header = loop_.borrow().header.clone();
		let header_name = header.borrow().name.clone();
		let preheader = self.preheader(loop_)?;
		let mut latch = self.latch(loop_)?;

		// 单块循环：phi 在块首、自增在块尾，先把跳转拆出去作为新的 latch
		if Rc::ptr_eq(&header, &latch) {
			let at = header.borrow().instrs.len();
			latch = self.split_block(&header, at, &format!("{}.latch", header_name));
		}

		let counter = self
			.temp_mgr
			.new_named_temp(format!("{}{}", header_name, COUNTER_SUFFIX), VarType::I32);
		let phi = PhiInstr::new(
			counter.clone(),
			vec![(Value::Int(0), preheader.borrow().label())],
		);
		header.borrow_mut().phi_instrs.insert(0, phi);

		let next = self.temp_mgr.new_named_temp(
			format!("{}{}.next", header_name, COUNTER_SUFFIX),
			VarType::I32,
		);
		latch.borrow_mut().push(Box::new(ArithInstr {
			target: next.clone(),
			op: ArithOp::Add,
			var_type: VarType::I32,
			lhs: Value::Temp(counter.clone()),
			rhs: Value::Int(1),
		}));
		let latch_label = latch.borrow().label();
		header.borrow_mut().phi_instrs[0].add_incoming(Value::Temp(next), latch_label);
		debug!("{}: counter {} added to loop {}", self.func.name, counter, header_name);
		Ok(counter)
	}
}
