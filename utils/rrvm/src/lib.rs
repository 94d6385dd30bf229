pub mod basicblock;
pub mod cfg;
pub mod dominator;
pub mod func;
pub mod impls;
pub mod parser;
pub mod program;
pub mod rrvm_loop;
pub mod verify;

pub use basicblock::{BasicBlock, Node};
pub use func::LlvmFunc;
pub use parser::parse;
pub use program::LlvmProgram;

pub type LlvmNode = Node;

#[cfg(test)]
mod tests {
	use llvm::Value;

	use crate::{
		dominator::DomTree, parser::parse, rrvm_loop::LoopForest,
		verify::check_phi_nodes,
	};

	const NESTED: &str = r#"
define i32 @main(i32 %n) {
entry:
  br label %outer
outer:
  %i = phi i32 [ 0, %entry ], [ %i.next, %outer.latch ]
  br label %inner
inner:
  %j = phi i32 [ 0, %outer ], [ %j.next, %inner ]
  %j.next = add i32 %j, 1
  %c = icmp slt i32 %j.next, %n
  br i1 %c, label %inner, label %outer.latch
outer.latch:
  %i.next = add i32 %i, 1
  %d = icmp slt i32 %i.next, %n
  br i1 %d, label %outer, label %exit
exit:
  ret i32 %i.next
}
"#;

	#[test]
	fn parse_print_parse() {
		let program = parse(NESTED).unwrap();
		let printed = program.to_string();
		let reparsed = parse(&printed).unwrap();
		assert_eq!(printed, reparsed.to_string());
		let func = program.get_func("main").unwrap();
		assert_eq!(func.cfg.size(), 5);
		assert!(check_phi_nodes(func).is_ok());
		let inner = func.cfg.blocks[2].borrow();
		assert_eq!(inner.prev_labels().len(), 2);
		assert_eq!(inner.succ[1].borrow().name, "outer.latch");
	}

	#[test]
	fn parse_rejects_unknown_label() {
		let src = "define void @f() {\nentry:\n  br label %nowhere\n}\n";
		assert!(parse(src).is_err());
		let src = "define void @f() {\nentry:\n  call void @g()\n  ret void\n}\n";
		assert!(parse(src).is_err());
	}

	#[test]
	fn string_and_declare_round_trip() {
		let src = r#"
@.str.x = private constant [2 x i8] c"x\00"
declare void @abort() noreturn nounwind
define void @f() {
entry:
  call void @abort()
  unreachable
}
"#;
		let program = parse(src).unwrap();
		assert_eq!(program.externals.strings[0].contents, "x");
		let printed = program.to_string();
		assert!(printed.contains("declare void @abort() noreturn nounwind"));
		assert!(printed.contains("@.str.x = private constant [2 x i8] c\"x\\00\""));
		assert_eq!(parse(&printed).unwrap().to_string(), printed);
	}

	#[test]
	fn dom_tree_and_loops() {
		let program = parse(NESTED).unwrap();
		let func = program.get_func("main").unwrap();
		let dom = DomTree::new(&func.cfg);
		let ids: Vec<i32> = func.cfg.blocks.iter().map(|v| v.borrow().id).collect();
		// entry, outer, inner, outer.latch, exit
		assert_eq!(dom.get_idom(ids[1]), Some(ids[0]));
		assert_eq!(dom.get_idom(ids[2]), Some(ids[1]));
		assert_eq!(dom.get_idom(ids[3]), Some(ids[2]));
		assert_eq!(dom.get_idom(ids[4]), Some(ids[3]));
		assert!(dom.dominates(ids[1], ids[4]));
		assert!(!dom.dominates(ids[2], ids[1]));

		let forest = LoopForest::new(&func.cfg, &dom);
		let loops = forest.postorder();
		assert_eq!(loops.len(), 2);
		assert_eq!(loops[0].borrow().header_name(), "inner");
		assert_eq!(loops[1].borrow().header_name(), "outer");
		assert_eq!(loops[0].borrow().level, 2);
		assert_eq!(forest.blocks(&loops[1], &func.cfg).len(), 3);
		assert_eq!(forest.blocks_without_subloops(&loops[1], &func.cfg).len(), 2);
		let inner_latch = forest.get_loop_latch(&loops[0]).unwrap();
		assert_eq!(inner_latch.borrow().name, "inner");
		let outer_pre = forest.get_loop_preheader(&loops[1]).unwrap();
		assert_eq!(outer_pre.borrow().name, "entry");
		// 内层循环的 header 有两个后继，外层块 outer 只有一个后继
		assert_eq!(
			forest.get_loop_preheader(&loops[0]).unwrap().borrow().name,
			"outer"
		);
	}

	#[test]
	fn split_keeps_dominators_and_phis() {
		let mut program = parse(NESTED).unwrap();
		let func = program.get_func_mut("main").unwrap();
		let mut dom = DomTree::new(&func.cfg);
		let inner = func.cfg.blocks[2].clone();
		// self loop: the split tail becomes the new latch
		let tail = func.split_block(&inner, 2, "inner.split");
		dom.insert_block(&tail, &inner);
		assert_eq!(dom, DomTree::new(&func.cfg));
		assert!(check_phi_nodes(func).is_ok());
		assert!(inner.borrow().phi_instrs[0].has_incoming_block(&tail.borrow().label()));

		// the tail has to be recorded before the branch gives `outer` a second
		// successor
		let outer = func.cfg.blocks[1].clone();
		let new_tail = func.split_block(&outer, 0, "outer.tail");
		dom.insert_block(&new_tail, &outer);
		let then = func.insert_if_then(&outer, Value::Bool(true), "outer.then");
		dom.insert_block(&then, &outer);
		assert_eq!(dom, DomTree::new(&func.cfg));
		assert!(check_phi_nodes(func).is_ok());
		let printed = program.to_string();
		assert!(printed.contains("br i1 true, label %outer.then, label %outer.tail"));
		assert!(parse(&printed).is_ok());
	}

	#[test]
	fn split_predecessors_merges_phis() {
		let src = r#"
define i32 @f(i1 %a, i1 %b) {
entry:
  br i1 %a, label %left, label %right
left:
  br label %join
right:
  br i1 %b, label %join, label %other
other:
  br label %join
join:
  %x = phi i32 [ 1, %left ], [ 1, %right ], [ 2, %other ]
  %y = phi i32 [ 1, %left ], [ 3, %right ], [ 2, %other ]
  ret i32 %x
}
"#;
		let mut program = parse(src).unwrap();
		let func = &mut program.funcs[0];
		let temp_mgr = &mut program.temp_mgr;
		let join = func.cfg.blocks[4].clone();
		let preds = vec![func.cfg.blocks[1].clone(), func.cfg.blocks[2].clone()];
		let new_bb = func.split_block_predecessors(&join, &preds, "join.pre", temp_mgr);
		assert!(check_phi_nodes(func).is_ok());
		assert_eq!(new_bb.borrow().phi_instrs.len(), 1);
		assert_eq!(join.borrow().prev.len(), 2);
		let join_ = join.borrow();
		let x = &join_.phi_instrs[0];
		assert_eq!(
			x.get_incoming_value_for_block(&new_bb.borrow().label()),
			Some(Value::Int(1))
		);
		// `right` still branches to `other`, in the same operand position
		let right = func.cfg.blocks[2].borrow();
		assert_eq!(right.succ[0].borrow().name, "join.pre");
		assert_eq!(right.succ_labels()[0].name, "join.pre");
	}

	#[test]
	fn malformed_phi_is_reported() {
		let mut program = parse(NESTED).unwrap();
		let func = program.get_func_mut("main").unwrap();
		let outer = func.cfg.blocks[1].clone();
		outer.borrow_mut().phi_instrs[0].source.pop();
		assert!(matches!(
			check_phi_nodes(func),
			Err(utils::KindError::MalformedPhi { .. })
		));
	}

	#[test]
	fn ill_typed_input_is_rejected() {
		let src = "define void @f() {\nentry:\n  %x = add i32 1, 2\n  %y = phi i32 [ 0, %entry ]\n  ret void\n}\n";
		assert!(parse(src).is_err());
		let src = "define void @f() {\nentry:\n  %x = add i1 1, 2\n  ret void\n}\n";
		assert!(parse(src).is_err());
	}
}
