mod assertion;
mod counter;

use llvm::{LlvmTempManager, Value};
use log::trace;
use rrvm::{
	dominator::DomTree,
	func::LlvmFunc,
	program::Externals,
	rrvm_loop::{LoopForest, LoopPtr},
	LlvmNode,
};
use utils::{errors::Result, KindError};

use crate::COUNTER_SUFFIX;

/// Edits one function loop by loop, keeping its dominator tree and loop
/// forest valid across every block split.
pub struct LoopEditor<'a> {
	pub func: &'a mut LlvmFunc,
	pub temp_mgr: &'a mut LlvmTempManager,
	pub externals: &'a mut Externals,
	pub dom_tree: DomTree,
	pub forest: LoopForest,
}

impl<'a> LoopEditor<'a> {
	pub fn new(
		func: &'a mut LlvmFunc,
		temp_mgr: &'a mut LlvmTempManager,
		externals: &'a mut Externals,
	) -> Self {
		let dom_tree = DomTree::new(&func.cfg);
		let forest = LoopForest::new(&func.cfg, &dom_tree);
		Self {
			func,
			temp_mgr,
			externals,
			dom_tree,
			forest,
		}
	}

	/// Loops of the function, innermost first.
	pub fn loops(&self) -> Vec<LoopPtr> {
		self.forest.postorder()
	}

	pub fn recompute_analyses(&mut self) {
		self.dom_tree = DomTree::new(&self.func.cfg);
		self.forest = LoopForest::new(&self.func.cfg, &self.dom_tree);
	}

	pub fn split_block(&mut self, bb: &LlvmNode, at: usize, name: &str) -> LlvmNode {
		let new_bb = self.func.split_block(bb, at, name);
		self.dom_tree.insert_block(&new_bb, bb);
		self.forest.add_block_to_loop(&new_bb, bb);
		new_bb
	}

	/// Splits `bb` before its terminator and adds a block taken when `cond`
	/// holds. The new block ends in `unreachable`, so it belongs to no loop.
	/// Returns `(then, tail)`.
	pub fn split_block_and_insert_if_then(
		&mut self,
		bb: &LlvmNode,
		cond: Value,
		name: &str,
	) -> (LlvmNode, LlvmNode) {
		let (at, tail_name) = {
			let bb_ = bb.borrow();
			(bb_.instrs.len(), format!("{}.tail", bb_.name))
		};
		let tail = self.split_block(bb, at, &tail_name);
		let then = self.func.insert_if_then(bb, cond, name);
		self.dom_tree.insert_block(&then, bb);
		self.forest.add_block_to_root(&then);
		(then, tail)
	}

	fn non_canonical(&self, loop_: &LoopPtr, reason: String) -> KindError {
		KindError::NonCanonicalLoop {
			func: self.func.name.clone(),
			header: loop_.borrow().header_name(),
			reason,
		}
	}

	pub fn preheader(&self, loop_: &LoopPtr) -> Result<LlvmNode> {
		self.forest.get_loop_preheader(loop_).ok_or_else(|| {
			let preds = self.forest.outside_preds(loop_);
			let reason = match preds.as_slice() {
				[] => "missing preheader: the header has no predecessor outside the loop"
					.to_string(),
				[pred] => format!(
					"missing preheader: {} has {} successors",
					pred.borrow().name,
					pred.borrow().succ.len()
				),
				_ => format!(
					"missing preheader: the header has {} predecessors outside the loop",
					preds.len()
				),
			};
			self.non_canonical(loop_, reason)
		})
	}

	pub fn latch(&self, loop_: &LoopPtr) -> Result<LlvmNode> {
		self.forest.get_loop_latch(loop_).ok_or_else(|| {
			let reason = format!(
				"multiple latches: the header has {} backedges",
				self.forest.latches(loop_).len()
			);
			self.non_canonical(loop_, reason)
		})
	}

	pub fn is_instrumented(&self, loop_: &LoopPtr) -> bool {
		let loop_ = loop_.borrow();
		let prefix = format!("{}{}", loop_.header_name(), COUNTER_SUFFIX);
		let header = loop_.header.borrow();
		// 计数器名为 <header>.counter，重名时带数字后缀
		header.phi_instrs.iter().any(|v| {
			v.target
				.name
				.strip_prefix(&prefix)
				.is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
		})
	}

	/// Everything that can make instrumentation of `loop_` fail, checked
	/// without touching the function. With `havoc`, also rejects loop-carried
	/// values of a type that has no arbitrary value.
	pub fn check_instrumentable(&self, loop_: &LoopPtr, havoc: bool) -> Result<()> {
		let preheader = self.preheader(loop_)?;
		let latch = self.latch(loop_)?;
		if self.is_instrumented(loop_) {
			return Err(KindError::AlreadyInstrumented {
				func: self.func.name.clone(),
				header: loop_.borrow().header_name(),
			});
		}
		if havoc {
			for phi in self.loop_carried_phis(loop_, &preheader, &latch) {
				if phi.var_type.havoc_size().is_none() {
					return Err(KindError::UnsupportedHavocType {
						func: self.func.name.clone(),
						header: loop_.borrow().header_name(),
						var_type: phi.var_type.to_string(),
					});
				}
			}
		}
		trace!("{}: loop {} is instrumentable", self.func.name, loop_.borrow());
		Ok(())
	}

	/// Header phis fed from both the preheader and the latch.
	pub fn loop_carried_phis(
		&self,
		loop_: &LoopPtr,
		preheader: &LlvmNode,
		latch: &LlvmNode,
	) -> Vec<llvm::PhiInstr> {
		let (pre_label, latch_label) = (preheader.borrow().label(), latch.borrow().label());
		let header = loop_.borrow().header.clone();
		let header_ = header.borrow();
		header_
			.phi_instrs
			.iter()
			.filter(|v| {
				v.has_incoming_block(&pre_label) && v.has_incoming_block(&latch_label)
			})
			.cloned()
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use llvm::Value;
	use rrvm::{dominator::DomTree, rrvm_loop::LoopForest, LlvmFunc};

	use super::LoopEditor;
	use crate::test_utils::parse_ok;

	const NESTED: &str = r#"
declare void @__VERIFIER_assert(i1)
define void @main(i32 %n) {
entry:
  br label %outer
outer:
  %i = phi i32 [ 0, %entry ], [ %i.next, %outer.check ]
  %i.next = add i32 %i, 1
  br label %inner
inner:
  %j = phi i32 [ 0, %outer ], [ %j.next, %inner ]
  %cj = icmp sle i32 %j, %n
  call void @__VERIFIER_assert(i1 %cj)
  %j.next = add i32 %j, 1
  %more = icmp slt i32 %j.next, %n
  br i1 %more, label %inner, label %outer.check
outer.check:
  %again = icmp slt i32 %i.next, %n
  br i1 %again, label %outer, label %exit
exit:
  ret void
}
"#;

	/// Block name -> header of its innermost loop ("" outside loops).
	fn membership(forest: &LoopForest, func: &LlvmFunc) -> HashMap<String, String> {
		func
			.cfg
			.blocks
			.iter()
			.filter_map(|bb| {
				let l = forest.loop_map.get(&bb.borrow().id)?;
				let header = if l.borrow().is_root() {
					String::new()
				} else {
					l.borrow().header_name()
				};
				Some((bb.borrow().name.clone(), header))
			})
			.collect()
	}

	#[test]
	fn analyses_match_recomputation_after_edits() {
		let mut program = parse_ok(NESTED);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		for loop_ in editor.loops() {
			assert!(editor.instrument(&loop_, 2).unwrap());
		}
		let dom = DomTree::new(&editor.func.cfg);
		assert_eq!(editor.dom_tree, dom);
		let forest = LoopForest::new(&editor.func.cfg, &dom);
		assert_eq!(
			membership(&editor.forest, editor.func),
			membership(&forest, editor.func)
		);
	}

	#[test]
	fn analyses_match_recomputation_after_bounding() {
		let mut program = parse_ok(NESTED);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		for loop_ in editor.loops() {
			assert!(editor.bound(&loop_, 2).unwrap());
		}
		let dom = DomTree::new(&editor.func.cfg);
		assert_eq!(editor.dom_tree, dom);
		let forest = LoopForest::new(&editor.func.cfg, &dom);
		assert_eq!(
			membership(&editor.forest, editor.func),
			membership(&forest, editor.func)
		);
	}

	#[test]
	fn counter_on_self_loop_gets_its_own_latch() {
		let mut program = parse_ok(NESTED);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		let inner = editor.loops()[0].clone();
		let counter = editor.inject_backedge_counter(&inner).unwrap();
		assert_eq!(counter.name, "inner.counter");
		let latch = editor.latch(&inner).unwrap();
		assert_eq!(latch.borrow().name, "inner.latch");
		assert_eq!(
			latch.borrow().instrs.last().unwrap().to_string(),
			"%inner.counter.next = add i32 %inner.counter, 1"
		);
		let header = inner.borrow().header.clone();
		assert_eq!(
			header.borrow().phi_instrs[0].to_string(),
			"%inner.counter = phi i32 [ 0, %outer ], [ %inner.counter.next, %inner.latch ]"
		);
		assert!(editor.is_instrumented(&inner));
		assert_eq!(editor.dom_tree, DomTree::new(&editor.func.cfg));
	}

	#[test]
	fn assertion_rewrite_is_idempotent() {
		let mut program = parse_ok(NESTED);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		let outer = editor.loops()[1].clone();
		assert_eq!(editor.rewrite_assertions(&outer, Value::Bool(true)), 1);
		assert_eq!(editor.rewrite_assertions(&outer, Value::Bool(true)), 0);
		assert!(program
			.externals
			.get_decl("__VERIFIER_assert_or_assume")
			.is_some_and(|v| v.params.len() == 2));
	}

	#[test]
	fn counter_like_user_names_are_not_counters() {
		let src = r#"
define void @main(i32 %n) {
entry:
  br label %loop
loop:
  %loop.counterpart = phi i32 [ 0, %entry ], [ %n, %loop ]
  %loop.counter.next = phi i32 [ 0, %entry ], [ %n, %loop ]
  br label %loop
}
"#;
		let mut program = parse_ok(src);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		let loop_ = editor.loops()[0].clone();
		assert!(!editor.is_instrumented(&loop_));
		assert!(editor.bound(&loop_, 3).unwrap());
		assert!(editor.is_instrumented(&loop_));
	}

	#[test]
	fn renumbered_counter_is_recognised() {
		let src = r#"
define void @main() {
entry:
  %loop.counter = add i32 0, 0
  br label %loop
loop:
  br label %loop
}
"#;
		let mut program = parse_ok(src);
		let func = &mut program.funcs[0];
		let mut editor =
			LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		let loop_ = editor.loops()[0].clone();
		assert_eq!(editor.inject_backedge_counter(&loop_).unwrap().name, "loop.counter1");
		assert!(editor.is_instrumented(&loop_));
	}

	#[test]
	fn multiple_outside_preds_are_reported() {
		let src = r#"
define void @main(i1 %a) {
entry:
  br i1 %a, label %loop, label %side
side:
  br label %loop
loop:
  br label %loop
}
"#;
		let mut program = parse_ok(src);
		let func = &mut program.funcs[0];
		let editor = LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
		let loop_ = editor.loops()[0].clone();
		let err = editor.check_instrumentable(&loop_, false).unwrap_err();
		assert!(err.to_string().contains("missing preheader"));
	}
}
