use llvm::{
	intrinsic::Intrinsic, AllocInstr, CallInstr, CompInstr, CompKind, CompOp,
	LoadInstr, PhiInstr, Value, VarType,
};
use log::{debug, info, trace};
use rrvm::{
	program::LlvmProgram, rrvm_loop::LoopPtr, verify::assert_phi_nodes, LlvmNode,
};
use utils::errors::Result;

use super::InductiveStep;
use crate::{checked_bound, editor::LoopEditor, KindConfig, RrvmPass};

impl InductiveStep {
	pub fn new(config: KindConfig) -> Self {
		Self { config }
	}
}

impl LoopEditor<'_> {
	/// Gives `phi` an arbitrary value on loop entry: a stack slot in the entry
	/// block is made symbolic in the preheader and loaded there, and the load
	/// replaces the value coming from the preheader.
	fn havoc_phi(&mut self, header: &LlvmNode, preheader: &LlvmNode, phi: &PhiInstr) {
		let var_type = phi.var_type;
		// checked before any edit
		let size = var_type.havoc_size().unwrap_or_default();
		let name = &phi.target.name;

		let slot = self.temp_mgr.new_named_temp(format!("{}.havoc", name), VarType::Ptr);
		let entry = self.func.cfg.get_entry();
		{
			let mut entry_ = entry.borrow_mut();
			let pos = entry_.first_non_alloca();
			entry_.instrs.insert(
				pos,
				Box::new(AllocInstr {
					target: slot.clone(),
					var_type,
				}),
			);
		}

		let make_symbolic = self
			.externals
			.get_or_insert_decl(Intrinsic::MakeNondet, VarType::Void)
			.name
			.clone();
		let name_str = self.externals.add_string(name, name);
		let value = self.temp_mgr.new_named_temp(format!("{}.nondet", name), var_type);
		{
			let mut preheader_ = preheader.borrow_mut();
			preheader_.push(Box::new(CallInstr::new_void(
				make_symbolic,
				vec![
					(VarType::Ptr, Value::Temp(slot.clone())),
					(VarType::I64, Value::Long(size)),
					(VarType::Ptr, Value::Temp(name_str)),
				],
			)));
			preheader_.push(Box::new(LoadInstr {
				target: value.clone(),
				var_type,
				addr: Value::Temp(slot),
			}));
		}
		let pre_label = preheader.borrow().label();
		let mut header_ = header.borrow_mut();
		for v in header_.phi_instrs.iter_mut().filter(|v| v.target == phi.target) {
			v.set_incoming_value_for_block(&pre_label, Value::Temp(value.clone()));
		}
		trace!("{}: havocked {} with {}", self.func.name, phi.target, value);
	}

	/// Step-case instrumentation of one loop. Returns `Ok(false)` without
	/// editing when `k == 0`.
	pub fn instrument(&mut self, loop_: &LoopPtr, k: u32) -> Result<bool> {
		if k == 0 {
			debug!("{}: k is 0, loop left unchanged", self.func.name);
			return Ok(false);
		}
		let bound = checked_bound(k, "k")?;
		self.check_instrumentable(loop_, true)?;

		let header = loop_.borrow().header.clone();
		let header_name = header.borrow().name.clone();
		let preheader = self.preheader(loop_)?;
		let latch = self.latch(loop_)?;

		// 先 havoc 再插入计数器，计数器本身不能被 havoc
		for phi in self.loop_carried_phis(loop_, &preheader, &latch) {
			self.havoc_phi(&header, &preheader, &phi);
		}

		let counter = self.inject_backedge_counter(loop_)?;
		let exceeded = self.push_exceeded(loop_, counter.clone(), bound);
		let (then, _) = self.split_block_and_insert_if_then(
			&header,
			Value::Temp(exceeded),
			&format!("{}.bound", header_name),
		);
		let abort = self
			.externals
			.get_or_insert_decl(Intrinsic::Abort, VarType::Void)
			.name
			.clone();
		then.borrow_mut().push(Box::new(CallInstr::new_void(abort, Vec::new())));

		// 循环内没有断言时不需要 in_progress
		let rewritten = if self.has_assertions(loop_) {
			let in_progress = self
				.temp_mgr
				.new_named_temp(format!("{}.in_progress", header_name), VarType::I1);
			header.borrow_mut().instrs.insert(
				0,
				Box::new(CompInstr {
					kind: CompKind::Icmp,
					target: in_progress.clone(),
					op: CompOp::Slt,
					var_type: VarType::I32,
					lhs: Value::Temp(counter),
					rhs: Value::Int(bound),
				}),
			);
			self.rewrite_assertions(loop_, Value::Temp(in_progress))
		} else {
			0
		};
		assert_phi_nodes(self.func);
		info!(
			"{}: step case for loop {} with k = {}, {} assertions rewritten",
			self.func.name, header_name, k, rewritten
		);
		Ok(true)
	}
}

impl RrvmPass for InductiveStep {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool> {
		let k = self.config.k;
		if k == 0 {
			debug!("k is 0, step case disabled");
			return Ok(false);
		}
		checked_bound(k, "k")?;
		// 先检查所有循环，出错时程序保持原样
		for func in program.funcs.iter_mut() {
			let editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			for loop_ in editor.loops() {
				editor.check_instrumentable(&loop_, true)?;
			}
		}
		let mut flag = false;
		for func in program.funcs.iter_mut() {
			let mut editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			for loop_ in editor.loops() {
				flag |= editor.instrument(&loop_, k)?;
			}
		}
		Ok(flag)
	}
}

#[cfg(test)]
mod tests {
	use llvm::Value;
	use simulator::Outcome;
	use utils::KindError;

	use crate::{
		test_utils::{count_calls, parse_ok, run_with},
		InductiveStep, KindConfig, LoopSimplify, RrvmPass,
	};

	fn step(k: u32) -> InductiveStep {
		InductiveStep::new(KindConfig {
			max_backedge_count: 0,
			k,
		})
	}

	const CARRIED: &str = r#"
declare void @__VERIFIER_assert(i1)
define void @main() {
entry:
  br label %loop
loop:
  %x = phi i32 [ 5, %entry ], [ %x.next, %loop ]
  %c = icmp sgt i32 %x, 0
  call void @__VERIFIER_assert(i1 %c)
  %x.next = add i32 %x, 1
  br label %loop
}
"#;

	#[test]
	fn loop_carried_value_is_havocked() {
		let mut program = parse_ok(CARRIED);
		assert!(step(2).apply(&mut program).unwrap());
		let text = program.to_string();
		assert!(text.contains("@.str.x = private constant [2 x i8] c\"x\\00\""));
		assert!(text.contains(
			"entry:\n  %x.havoc = alloca i32\n  call void @klee_make_symbolic(ptr %x.havoc, i64 4, ptr @.str.x)\n  %x.nondet = load i32, ptr %x.havoc\n  br label %loop"
		));
		assert!(text.contains("%x = phi i32 [ %x.nondet, %entry ], [ %x.next, %loop.latch ]"));
		assert!(text.contains("%loop.in_progress = icmp slt i32 %loop.counter, 2"));
		assert!(text.contains(
			"call void @__VERIFIER_assert_or_assume(i1 %c, i1 %loop.in_progress)"
		));
		assert!(text.contains("loop.bound:\n  call void @abort()\n  unreachable"));
		assert!(!text.contains("@__VERIFIER_assume"));
		assert_eq!(count_calls(&program, "__VERIFIER_assert"), 0);
		assert_eq!(count_calls(&program, "__VERIFIER_assert_or_assume"), 1);
	}

	#[test]
	fn step_case_runs() {
		let mut program = parse_ok(CARRIED);
		step(2).apply(&mut program).unwrap();
		// 断言一直成立，k 次之后 abort
		let result = run_with(&program, Vec::new(), vec![5]);
		assert_eq!(result.outcome, Outcome::Aborted);
		// 初始状态不满足断言，被当作假设排除
		let result = run_with(&program, Vec::new(), vec![-3]);
		assert_eq!(result.outcome, Outcome::Discarded);
		// 前 k 次成立，第 k+1 次溢出后失败
		let result = run_with(&program, Vec::new(), vec![i32::MAX as i64 - 1]);
		assert_eq!(result.outcome, Outcome::AssertionFailed);
	}

	#[test]
	fn loop_without_assertions_gets_no_flag() {
		let src = r#"
define void @main() {
entry:
  br label %a
a:
  %x = phi i32 [ 0, %entry ], [ %x.next, %a ]
  %x.next = add i32 %x, 1
  br label %a
}
"#;
		let mut program = parse_ok(src);
		assert!(step(2).apply(&mut program).unwrap());
		let text = program.to_string();
		assert!(!text.contains("in_progress"));
		assert!(!text.contains("__VERIFIER_assert_or_assume"));
		assert!(text.contains("%a.exceeded = icmp sgt i32 %a.counter, 2"));
		let result = run_with(&program, Vec::new(), vec![7]);
		assert_eq!(result.outcome, Outcome::Aborted);
	}

	#[test]
	fn zero_k_leaves_program_unchanged() {
		let mut program = parse_ok(CARRIED);
		let before = program.to_string();
		assert!(!step(0).apply(&mut program).unwrap());
		assert_eq!(program.to_string(), before);
	}

	const NESTED: &str = r#"
declare void @__VERIFIER_assert(i1)
define void @main(i32 %n) {
entry:
  %pre = icmp sge i32 %n, 0
  call void @__VERIFIER_assert(i1 %pre)
  br label %outer
outer:
  %i = phi i32 [ 0, %entry ], [ %i.next, %outer.latch ]
  %ci = icmp sge i32 %i, 0
  call void @__VERIFIER_assert(i1 %ci)
  br label %inner
inner:
  %j = phi i32 [ 0, %outer ], [ %j.next, %inner ]
  %cj = icmp sle i32 %j, %n
  call void @__VERIFIER_assert(i1 %cj)
  %j.next = add i32 %j, 1
  %more = icmp slt i32 %j.next, %n
  br i1 %more, label %inner, label %outer.latch
outer.latch:
  %i.next = add i32 %i, 1
  call void @__VERIFIER_assert(i1 %ci)
  br label %outer
}
"#;

	#[test]
	fn assertions_in_loops_are_all_rewritten() {
		let mut program = parse_ok(NESTED);
		let before = count_calls(&program, "__VERIFIER_assert");
		assert_eq!(before, 4);
		step(3).apply(&mut program).unwrap();
		// 入口块中的断言不在循环内
		assert_eq!(count_calls(&program, "__VERIFIER_assert"), 1);
		assert_eq!(count_calls(&program, "__VERIFIER_assert_or_assume"), 3);
		let text = program.to_string();
		// 内层断言用内层的 flag
		assert!(text.contains("@__VERIFIER_assert_or_assume(i1 %cj, i1 %inner.in_progress)"));
		assert!(text.contains("@__VERIFIER_assert_or_assume(i1 %ci, i1 %outer.in_progress)"));
	}

	#[test]
	fn inner_loops_are_instrumented_first() {
		let mut program = parse_ok(NESTED);
		step(1).apply(&mut program).unwrap();
		let names: Vec<_> =
			program.externals.strings.iter().map(|v| v.name.as_str()).collect();
		assert_eq!(names, vec![".str.j", ".str.i"]);
		let entry = program.funcs[0].cfg.get_entry();
		let allocas: Vec<_> = entry.borrow().instrs[..2]
			.iter()
			.map(|v| v.get_write().unwrap().name)
			.collect();
		assert_eq!(allocas, vec!["j.havoc", "i.havoc"]);
	}

	#[test]
	fn pointer_phi_is_rejected_before_any_edit() {
		let src = r#"
define void @main(ptr %p) {
entry:
  br label %first
first:
  %a = phi i32 [ 0, %entry ], [ %a.next, %first ]
  %a.next = add i32 %a, 1
  %c = icmp slt i32 %a.next, 4
  br i1 %c, label %first, label %mid
mid:
  br label %second
second:
  %q = phi ptr [ %p, %mid ], [ %q, %second ]
  br label %second
}
"#;
		let mut program = parse_ok(src);
		let before = program.to_string();
		let err = step(2).apply(&mut program).unwrap_err();
		match err {
			KindError::UnsupportedHavocType { header, var_type, .. } => {
				assert_eq!(header, "second");
				assert_eq!(var_type, "ptr");
			}
			other => panic!("unexpected error {}", other),
		}
		assert_eq!(program.to_string(), before);
	}

	const TWO_LATCHES: &str = r#"
define void @main(i32 %n) {
entry:
  br label %outer
outer:
  %i = phi i32 [ 0, %entry ], [ %i.next, %outer.latch ]
  br label %inner
inner:
  %j = phi i32 [ 0, %outer ], [ %j.a, %left ], [ %j.b, %right ]
  %odd = srem i32 %j, 2
  %is_odd = icmp eq i32 %odd, 1
  br i1 %is_odd, label %left, label %right
left:
  %j.a = add i32 %j, 1
  %ca = icmp slt i32 %j.a, %n
  br i1 %ca, label %inner, label %outer.latch
right:
  %j.b = add i32 %j, 3
  %cb = icmp slt i32 %j.b, %n
  br i1 %cb, label %inner, label %outer.latch
outer.latch:
  %i.next = add i32 %i, 1
  br label %outer
}
"#;

	#[test]
	fn non_canonical_inner_loop_fails_without_edits() {
		let mut program = parse_ok(TWO_LATCHES);
		let before = program.to_string();
		let err = step(2).apply(&mut program).unwrap_err();
		match err {
			KindError::NonCanonicalLoop { header, reason, .. } => {
				assert_eq!(header, "inner");
				assert!(reason.contains("multiple latches"));
			}
			other => panic!("unexpected error {}", other),
		}
		assert_eq!(program.to_string(), before);

		assert!(LoopSimplify::new().apply(&mut program).unwrap());
		assert!(step(2).apply(&mut program).unwrap());
		let result = run_with(&program, vec![Value::Int(5)], vec![0, 0, 0, 0]);
		assert_ne!(result.outcome, Outcome::StepLimit);
	}

	#[test]
	fn rerun_is_rejected() {
		let mut program = parse_ok(CARRIED);
		step(2).apply(&mut program).unwrap();
		let before = program.to_string();
		let err = step(2).apply(&mut program).unwrap_err();
		assert!(matches!(err, KindError::AlreadyInstrumented { .. }));
		assert_eq!(program.to_string(), before);
	}
}
