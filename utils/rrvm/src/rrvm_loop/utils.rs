use std::rc::Rc;

use crate::{basicblock::Node, cfg::CFG};

use super::{LoopForest, LoopPtr};

impl LoopForest {
	/// Innermost real loop containing `bb`.
	pub fn get_loop(&self, bb: &Node) -> Option<LoopPtr> {
		self
			.loop_map
			.get(&bb.borrow().id)
			.filter(|v| !v.borrow().is_root())
			.cloned()
	}
	pub fn contains_block(&self, loop_: &LoopPtr, bb: &Node) -> bool {
		self
			.loop_map
			.get(&bb.borrow().id)
			.is_some_and(|l| loop_.borrow().is_super_loop_of(l))
	}
	/// Member blocks of `loop_`, sub-loops included, in layout order.
	pub fn blocks(&self, loop_: &LoopPtr, cfg: &CFG) -> Vec<Node> {
		cfg
			.blocks
			.iter()
			.filter(|v| self.contains_block(loop_, v))
			.cloned()
			.collect()
	}
	pub fn blocks_without_subloops(&self, loop_: &LoopPtr, cfg: &CFG) -> Vec<Node> {
		cfg
			.blocks
			.iter()
			.filter(|v| {
				self.loop_map.get(&v.borrow().id).is_some_and(|l| Rc::ptr_eq(l, loop_))
			})
			.cloned()
			.collect()
	}
	/// Every real loop, children before parents, siblings in layout order.
	pub fn postorder(&self) -> Vec<LoopPtr> {
		fn dfs(node: &LoopPtr, dfs_vec: &mut Vec<LoopPtr>) {
			for subloop in node.borrow().subloops.iter() {
				dfs(subloop, dfs_vec);
			}
			dfs_vec.push(node.clone());
		}
		let mut dfs_vec = Vec::new();
		dfs(&self.root, &mut dfs_vec);
		// 移去 root
		dfs_vec.pop();
		dfs_vec
	}
	/// Predecessors of the header outside the loop.
	pub fn outside_preds(&self, loop_: &LoopPtr) -> Vec<Node> {
		let header = loop_.borrow().header.clone();
		let header_ = header.borrow();
		header_
			.prev
			.iter()
			.filter(|v| !self.contains_block(loop_, v))
			.cloned()
			.collect()
	}
	/// Predecessors of the header inside the loop, one entry per backedge.
	pub fn latches(&self, loop_: &LoopPtr) -> Vec<Node> {
		let header = loop_.borrow().header.clone();
		let header_ = header.borrow();
		header_
			.prev
			.iter()
			.filter(|v| self.contains_block(loop_, v))
			.cloned()
			.collect()
	}
	/// The unique outside predecessor of the header, if its only successor is
	/// the header.
	pub fn get_loop_preheader(&self, loop_: &LoopPtr) -> Option<Node> {
		let preds = self.outside_preds(loop_);
		match preds.as_slice() {
			[pred] if pred.borrow().succ.len() == 1 => Some(pred.clone()),
			_ => None,
		}
	}
	/// The unique block branching back to the header.
	pub fn get_loop_latch(&self, loop_: &LoopPtr) -> Option<Node> {
		let latches = self.latches(loop_);
		match latches.as_slice() {
			[latch] => Some(latch.clone()),
			_ => None,
		}
	}
	/// `new` joins the innermost loop of `like` (and so all of its parents).
	pub fn add_block_to_loop(&mut self, new: &Node, like: &Node) {
		if let Some(l) = self.loop_map.get(&like.borrow().id).cloned() {
			self.loop_map.insert(new.borrow().id, l);
		}
	}
	/// `new` is in no loop.
	pub fn add_block_to_root(&mut self, new: &Node) {
		self.loop_map.insert(new.borrow().id, self.root.clone());
	}
}
