use std::rc::Rc;

use log::{debug, trace};
use rrvm::{program::LlvmProgram, rrvm_loop::LoopPtr, verify::assert_phi_nodes, LlvmNode};
use utils::errors::Result;

use super::LoopSimplify;
use crate::{editor::LoopEditor, RrvmPass};

fn dedup_nodes(nodes: Vec<LlvmNode>) -> Vec<LlvmNode> {
	let mut res: Vec<LlvmNode> = Vec::new();
	for node in nodes {
		if !res.iter().any(|v| Rc::ptr_eq(v, &node)) {
			res.push(node);
		}
	}
	res
}

impl LoopSimplify {
	pub fn new() -> Self {
		Self::default()
	}
}

impl LoopEditor<'_> {
	fn find_loop(&self, header: &LlvmNode) -> Option<LoopPtr> {
		self
			.forest
			.get_loop(header)
			.filter(|l| Rc::ptr_eq(&l.borrow().header, header))
	}

	/// Routes every entry edge of `loop_` through one new block. Loops only
	/// reachable through their backedges get nothing.
	fn insert_preheader_for_loop(&mut self, loop_: &LoopPtr) -> Option<LlvmNode> {
		let header = loop_.borrow().header.clone();
		let outside_blocks = dedup_nodes(self.forest.outside_preds(loop_));
		if outside_blocks.is_empty() {
			trace!("loop {} has no entry edge, no preheader", header.borrow().name);
			return None;
		}
		let name = format!("{}.preheader", header.borrow().name);
		let new_bb = self.func.split_block_predecessors(
			&header,
			&outside_blocks,
			&name,
			self.temp_mgr,
		);
		debug!(
			"LoopSimplify: inserted preheader block {}",
			new_bb.borrow().label()
		);
		Some(new_bb)
	}

	/// Makes all backedges target one new block that jumps to the header.
	fn insert_unique_backedge_block(&mut self, loop_: &LoopPtr) -> Option<LlvmNode> {
		let header = loop_.borrow().header.clone();
		let backedge_blocks = dedup_nodes(self.forest.latches(loop_));
		let name = format!("{}.backedge", header.borrow().name);
		let new_bb = self.func.split_block_predecessors(
			&header,
			&backedge_blocks,
			&name,
			self.temp_mgr,
		);
		debug!(
			"LoopSimplify: inserted unique backedge block {}",
			new_bb.borrow().label()
		);
		Some(new_bb)
	}

	fn simplify_one_loop(&mut self, loop_: &LoopPtr) -> bool {
		let mut flag = false;
		if self.forest.get_loop_preheader(loop_).is_none() {
			flag |= self.insert_preheader_for_loop(loop_).is_some();
			self.recompute_analyses();
		}
		// 插入 preheader 后循环信息已重算，按 header 重新找到这个 loop
		let header = loop_.borrow().header.clone();
		if let Some(loop_) = self.find_loop(&header) {
			if self.forest.get_loop_latch(&loop_).is_none() {
				flag |= self.insert_unique_backedge_block(&loop_).is_some();
				self.recompute_analyses();
			}
		}
		flag
	}
}

impl RrvmPass for LoopSimplify {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool> {
		let mut flag = false;
		for func in program.funcs.iter_mut() {
			let mut editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			// 按 dfs 序逐个 loop 处理，每次修改后循环信息会重算，这里只记 header
			let headers: Vec<LlvmNode> =
				editor.loops().iter().map(|v| v.borrow().header.clone()).collect();
			for header in headers.iter() {
				if let Some(loop_) = editor.find_loop(header) {
					flag |= editor.simplify_one_loop(&loop_);
				}
			}
			assert_phi_nodes(editor.func);
		}
		Ok(flag)
	}
}

#[cfg(test)]
mod tests {
	use rrvm::{dominator::DomTree, rrvm_loop::LoopForest};

	use crate::{
		test_utils::{parse_ok, run_with},
		LoopSimplify, RrvmPass,
	};

	#[test]
	fn preheader_and_backedge_are_inserted() {
		let src = r#"
define i32 @main(i1 %a, i32 %n) {
entry:
  br i1 %a, label %head, label %side
side:
  br label %head
head:
  %x = phi i32 [ 1, %entry ], [ 2, %side ], [ %x.a, %b1 ], [ %x.b, %b2 ]
  %c = icmp slt i32 %x, %n
  br i1 %c, label %b1, label %exit
b1:
  %x.a = add i32 %x, 1
  %d = icmp slt i32 %x.a, 7
  br i1 %d, label %head, label %b2
b2:
  %x.b = add i32 %x.a, 2
  br label %head
exit:
  ret i32 %x
}
"#;
		let mut program = parse_ok(src);
		let args = vec![llvm::Value::Bool(true), llvm::Value::Int(20)];
		let before = run_with(&program, args.clone(), Vec::new());
		assert!(LoopSimplify::new().apply(&mut program).unwrap());
		let after = run_with(&program, args, Vec::new());
		assert_eq!(before.outcome, after.outcome);

		let func = &program.funcs[0];
		let dom = DomTree::new(&func.cfg);
		let forest = LoopForest::new(&func.cfg, &dom);
		let loops = forest.postorder();
		assert_eq!(loops.len(), 1);
		let preheader = forest.get_loop_preheader(&loops[0]).unwrap();
		let latch = forest.get_loop_latch(&loops[0]).unwrap();
		assert_eq!(preheader.borrow().name, "head.preheader");
		assert_eq!(latch.borrow().name, "head.backedge");
		// 两个外部入口值不同，需要在 preheader 中新建 phi
		assert_eq!(preheader.borrow().phi_instrs.len(), 1);
		assert_eq!(latch.borrow().phi_instrs.len(), 1);
		let head = loops[0].borrow().header.clone();
		assert_eq!(head.borrow().prev.len(), 2);

		assert!(!LoopSimplify::new().apply(&mut program).unwrap());
	}

	#[test]
	fn unreachable_loops_are_left_alone() {
		let src = r#"
define void @main() {
entry:
  ret void
dead:
  br label %dead
}
"#;
		let mut program = parse_ok(src);
		assert!(!LoopSimplify::new().apply(&mut program).unwrap());
	}
}
