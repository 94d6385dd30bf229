use std::{
	cell::RefCell,
	collections::HashMap,
	fmt::Display,
	rc::{Rc, Weak},
};

use crate::basicblock::Node;

pub mod loop_analysis;
pub mod utils;

pub type LoopPtr = Rc<RefCell<Loop>>;

// Instances of this class are used to represent loops that are detected in the flow graph.
// The root of the loop tree is a pseudo loop with level 0 holding every block
// that is in no loop.
pub struct Loop {
	pub id: u32,
	pub outer: Option<Weak<RefCell<Loop>>>,
	pub header: Node,
	pub level: u32,
	pub subloops: Vec<LoopPtr>,
}

impl Loop {
	pub fn new(id: u32, header: Node) -> Self {
		Self {
			id,
			outer: None,
			header,
			level: 0,
			subloops: Vec::new(),
		}
	}
	pub fn new_ptr(id: u32, header: Node) -> LoopPtr {
		Rc::new(RefCell::new(Self::new(id, header)))
	}
	pub fn is_root(&self) -> bool {
		self.level == 0
	}
	pub fn get_outer(&self) -> Option<LoopPtr> {
		self.outer.as_ref().and_then(|v| v.upgrade())
	}
	/// Reflexive: a loop is a super loop of itself.
	pub fn is_super_loop_of(&self, other: &LoopPtr) -> bool {
		let mut cur = Some(other.clone());
		while let Some(l) = cur {
			if l.borrow().id == self.id {
				return true;
			}
			cur = l.borrow().get_outer();
		}
		false
	}
	pub fn header_name(&self) -> String {
		self.header.borrow().name.clone()
	}
}

impl Display for Loop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let outer = match self.get_outer() {
			Some(outer) => outer.borrow().header_name(),
			None => "None".to_string(),
		};
		write!(
			f,
			"loop {} outer: {}, header: {}, level: {}, subloops: {}",
			self.id,
			outer,
			self.header_name(),
			self.level,
			self.subloops.len()
		)
	}
}

/// The loop tree of one function plus the innermost loop of every block
/// reachable from the entry.
pub struct LoopForest {
	pub root: LoopPtr,
	pub loop_map: HashMap<i32, LoopPtr>,
}
