use std::rc::Rc;

use utils::{KindError, Label, Result};

pub use crate::basicblock::{BasicBlock, Node};

pub struct CFG {
	pub blocks: Vec<Node>,
}

impl CFG {
	pub fn new() -> Self {
		Self { blocks: Vec::new() }
	}
	pub fn get_entry(&self) -> Node {
		self.blocks.first().unwrap().clone()
	}
	pub fn size(&self) -> usize {
		self.blocks.len()
	}
	pub fn find_block(&self, label: &Label) -> Option<Node> {
		self.blocks.iter().find(|v| v.borrow().name == label.name).cloned()
	}
	pub fn position(&self, bb: &Node) -> Option<usize> {
		self.blocks.iter().position(|v| Rc::ptr_eq(v, bb))
	}
	/// Rebuilds every `prev` / `succ` list from the terminators.
	pub fn resolve_edges(&mut self) -> Result<()> {
		self.blocks.iter().for_each(|v| v.borrow_mut().clear());
		for bb in self.blocks.iter() {
			let labels = bb.borrow().succ_labels();
			for label in labels {
				let target = self.find_block(&label).ok_or_else(|| {
					KindError::InvalidIr(format!(
						"block '{}' branches to unknown label '{}'",
						bb.borrow().name,
						label
					))
				})?;
				link_node(bb, &target);
			}
		}
		Ok(())
	}
}

impl Default for CFG {
	fn default() -> Self {
		Self::new()
	}
}

pub fn link_node(from: &Node, to: &Node) {
	from.borrow_mut().succ.push(to.clone());
	to.borrow_mut().prev.push(from.clone());
}

/// Makes `from` branch to `new` wherever it branched to `old`, moving every
/// such edge and keeping the successor order.
pub fn retarget_node(from: &Node, old: &Node, new: &Node) {
	let (old_label, new_label) = (old.borrow().label(), new.borrow().label());
	let mut edges = 0;
	{
		let mut from_ = from.borrow_mut();
		for succ in from_.succ.iter_mut().filter(|v| Rc::ptr_eq(v, old)) {
			*succ = new.clone();
			edges += 1;
		}
		if let Some(jump) = from_.jump_instr.as_mut() {
			jump.replace_succ_label(&old_label, &new_label);
		}
	}
	for _ in 0..edges {
		let mut old_ = old.borrow_mut();
		if let Some(pos) = old_.prev.iter().position(|v| Rc::ptr_eq(v, from)) {
			old_.prev.remove(pos);
		}
	}
	for _ in 0..edges {
		new.borrow_mut().prev.push(from.clone());
	}
}
