use std::rc::Rc;

use llvm::{
	JumpCondInstr, LlvmTemp, LlvmTempManager, PhiInstr, UnreachableInstr, Value,
	VarType,
};
use log::trace;
use utils::Label;

use crate::{
	basicblock::{BasicBlock, Node},
	cfg::{link_node, retarget_node, CFG},
};

pub struct LlvmFunc {
	pub total: i32, // 已创建过的基本块数量，total 为下一个基本块的编号；块被删除后编号不复用
	pub cfg: CFG,
	pub name: String,
	pub ret_type: VarType,
	pub params: Vec<LlvmTemp>,
}

impl LlvmFunc {
	pub fn new(name: impl ToString, ret_type: VarType, params: Vec<LlvmTemp>) -> Self {
		Self {
			total: 0,
			cfg: CFG::new(),
			name: name.to_string(),
			ret_type,
			params,
		}
	}
	pub fn len(&self) -> usize {
		self.cfg.blocks.iter().map(|v| v.borrow().instrs.len()).sum()
	}
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
	/// Creates a detached block whose name is `name`, or `name` followed by a
	/// number when another block already uses it.
	pub fn new_basicblock(&mut self, name: &str) -> Node {
		let mut candidate = name.to_string();
		let mut suffix = 0;
		while self.cfg.blocks.iter().any(|v| v.borrow().name == candidate) {
			suffix += 1;
			candidate = format!("{}{}", name, suffix);
		}
		let id = self.total;
		self.total += 1;
		BasicBlock::new_node(id, candidate)
	}
	fn insert_after(&mut self, bb: &Node, new_bb: Node) {
		let pos = self.cfg.position(bb).map_or(self.cfg.blocks.len(), |v| v + 1);
		self.cfg.blocks.insert(pos, new_bb);
	}
	fn insert_before(&mut self, bb: &Node, new_bb: Node) {
		let pos = self.cfg.position(bb).unwrap_or(self.cfg.blocks.len());
		self.cfg.blocks.insert(pos, new_bb);
	}

	/// Moves `instrs[at..]` and the terminator of `bb` into a new block placed
	/// right after it, and makes `bb` branch there unconditionally. Successor
	/// edges (and the phi entries naming `bb` in the successors) now belong to
	/// the new block.
	pub fn split_block(&mut self, bb: &Node, at: usize, name: &str) -> Node {
		let new_bb = self.new_basicblock(name);
		let (tail, jump, succ) = {
			let mut bb_ = bb.borrow_mut();
			let tail = bb_.instrs.split_off(at);
			(tail, bb_.jump_instr.take(), std::mem::take(&mut bb_.succ))
		};
		let old_label = bb.borrow().label();
		let new_label = new_bb.borrow().label();
		{
			let mut new_ = new_bb.borrow_mut();
			new_.instrs = tail;
			new_.jump_instr = jump;
		}
		// 一条边一条边地改，后继可能就是 bb 自己
		for s in succ.iter() {
			{
				let mut s_ = s.borrow_mut();
				if let Some(p) = s_.prev.iter_mut().find(|v| Rc::ptr_eq(v, bb)) {
					*p = new_bb.clone();
				}
				for phi in s_.phi_instrs.iter_mut() {
					phi.replace_incoming_block(&old_label, &new_label);
				}
			}
			new_bb.borrow_mut().succ.push(s.clone());
		}
		bb.borrow_mut().gen_jump(new_label.clone());
		link_node(bb, &new_bb);
		self.insert_after(bb, new_bb.clone());
		trace!("split {} at {}, tail is {}", old_label, at, new_label);
		new_bb
	}

	/// `bb` must end with an unconditional branch to some block `tail`. Adds a
	/// block that `bb` enters when `cond` holds, ending in `unreachable`, and
	/// turns the branch of `bb` into `br i1 cond, then, tail`.
	pub fn insert_if_then(&mut self, bb: &Node, cond: Value, name: &str) -> Node {
		let tail = {
			let bb_ = bb.borrow();
			assert!(
				bb_.succ.len() == 1,
				"insert_if_then: {} must have exactly one successor",
				bb_.name
			);
			bb_.succ[0].clone()
		};
		let then = self.new_basicblock(name);
		then.borrow_mut().set_jump(Some(Box::new(UnreachableInstr {})));
		let then_label = then.borrow().label();
		let tail_label = tail.borrow().label();
		bb.borrow_mut().set_jump(Some(Box::new(JumpCondInstr {
			var_type: VarType::I1,
			cond,
			target_true: then_label,
			target_false: tail_label,
		})));
		// 后继顺序与跳转指令的操作数顺序一致
		bb.borrow_mut().succ.insert(0, then.clone());
		then.borrow_mut().prev.push(bb.clone());
		self.insert_after(bb, then.clone());
		then
	}

	/// Inserts a new block that the blocks in `preds` branch to instead of
	/// `bb`, and that falls through to `bb`. Phi entries of `bb` coming from
	/// `preds` are moved to the new block; a phi is created there only when
	/// those entries disagree.
	pub fn split_block_predecessors(
		&mut self,
		bb: &Node,
		preds: &[Node],
		name: &str,
		temp_mgr: &mut LlvmTempManager,
	) -> Node {
		assert!(!preds.is_empty());
		let new_bb = self.new_basicblock(name);
		let new_label = new_bb.borrow().label();
		let pred_labels: Vec<Label> =
			preds.iter().map(|v| v.borrow().label()).collect();

		// Move the edges from Preds to point to NewBB instead of BB.
		for pred in preds.iter() {
			retarget_node(pred, bb, &new_bb);
		}

		let mut new_phis = Vec::new();
		for phi in bb.borrow_mut().phi_instrs.iter_mut() {
			let moved: Vec<(Value, Label)> = phi
				.source
				.iter()
				.filter(|(_, l)| pred_labels.contains(l))
				.cloned()
				.collect();
			phi.source.retain(|(_, l)| !pred_labels.contains(l));
			let first = moved.first().map(|(v, _)| v.clone());
			match first {
				Some(v) if moved.iter().all(|(w, _)| *w == v) => {
					phi.source.push((v, new_label.clone()));
				}
				Some(_) => {
					let new_target =
						temp_mgr.new_named_temp(format!("{}.ph", phi.target.name), phi.var_type);
					phi.source.push((Value::Temp(new_target.clone()), new_label.clone()));
					new_phis.push(PhiInstr::new(new_target, moved));
				}
				None => {}
			}
		}
		{
			let mut new_ = new_bb.borrow_mut();
			new_.phi_instrs = new_phis;
			new_.gen_jump(bb.borrow().label());
		}
		link_node(&new_bb, bb);
		self.insert_before(bb, new_bb.clone());
		new_bb
	}
}
