mod naive;

use std::collections::HashMap;

pub use naive::*;

use crate::{basicblock::Node, cfg::CFG};

/// Dominator tree over the blocks reachable from the entry, keyed by block id.
#[derive(Debug, Default, Clone)]
pub struct DomTree {
	pub entry: i32,
	pub idom: HashMap<i32, i32>,
	pub children: HashMap<i32, Vec<i32>>,
}

impl DomTree {
	pub fn new(cfg: &CFG) -> Self {
		let dominates = compute_dominates(cfg);
		let idom = compute_idom(&dominates);
		let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
		// 按布局顺序插入，保证子节点顺序确定
		for bb in cfg.blocks.iter() {
			let id = bb.borrow().id;
			if let Some(parent) = idom.get(&id) {
				children.entry(*parent).or_default().push(id);
			}
		}
		Self {
			entry: cfg.get_entry().borrow().id,
			idom,
			children,
		}
	}
	pub fn get_idom(&self, id: i32) -> Option<i32> {
		self.idom.get(&id).copied()
	}
	pub fn get_children(&self, id: i32) -> &[i32] {
		self.children.get(&id).map_or(&[], |v| v.as_slice())
	}
	pub fn is_reachable(&self, id: i32) -> bool {
		id == self.entry || self.idom.contains_key(&id)
	}
	/// Whether `a` dominates `b` (reflexive).
	pub fn dominates(&self, a: i32, b: i32) -> bool {
		if !self.is_reachable(b) {
			return false;
		}
		let mut cur = Some(b);
		while let Some(v) = cur {
			if v == a {
				return true;
			}
			cur = self.get_idom(v);
		}
		false
	}
	pub fn dominates_node(&self, a: &Node, b: &Node) -> bool {
		self.dominates(a.borrow().id, b.borrow().id)
	}
	/// Records that `new` was inserted between `pred` and some of the former
	/// successors of `pred`. When `pred` now reaches everything only through
	/// `new`, all of the children of `pred` move under `new`; otherwise `new`
	/// is a leaf below `pred`.
	pub fn insert_block(&mut self, new: &Node, pred: &Node) {
		let new_id = new.borrow().id;
		let pred_id = pred.borrow().id;
		let only_succ = {
			let pred_ = pred.borrow();
			pred_.succ.len() == 1 && std::rc::Rc::ptr_eq(&pred_.succ[0], new)
		};
		if only_succ {
			let moved = self.children.remove(&pred_id).unwrap_or_default();
			for child in moved.iter() {
				self.idom.insert(*child, new_id);
			}
			self.children.insert(new_id, moved);
		}
		self.idom.insert(new_id, pred_id);
		self.children.entry(pred_id).or_default().push(new_id);
	}
}

impl PartialEq for DomTree {
	fn eq(&self, other: &Self) -> bool {
		self.entry == other.entry && self.idom == other.idom
	}
}
