use std::{cell::RefCell, fmt::Display, rc::Rc};

use llvm::{JumpInstr, LlvmInstr, PhiInstr};
use utils::Label;

pub type Node = Rc<RefCell<BasicBlock>>;

pub struct BasicBlock {
	pub id: i32,
	pub name: String,
	pub prev: Vec<Node>,
	pub succ: Vec<Node>,
	pub phi_instrs: Vec<PhiInstr>,
	pub instrs: Vec<LlvmInstr>,
	pub jump_instr: Option<LlvmInstr>,
}

impl BasicBlock {
	pub fn new(id: i32, name: impl Display) -> BasicBlock {
		BasicBlock {
			id,
			name: name.to_string(),
			prev: Vec::new(),
			succ: Vec::new(),
			phi_instrs: Vec::new(),
			instrs: Vec::new(),
			jump_instr: None,
		}
	}
	pub fn new_node(id: i32, name: impl Display) -> Node {
		Rc::new(RefCell::new(Self::new(id, name)))
	}
	pub fn label(&self) -> Label {
		Label::new(&self.name)
	}
	pub fn clear(&mut self) {
		self.prev.clear();
		self.succ.clear();
	}
	pub fn push(&mut self, instr: LlvmInstr) {
		self.instrs.push(instr);
	}
	pub fn push_phi(&mut self, instr: PhiInstr) {
		self.phi_instrs.push(instr);
	}
	pub fn set_jump(&mut self, instr: Option<LlvmInstr>) {
		self.jump_instr = instr;
	}
	pub fn gen_jump(&mut self, target: Label) {
		self.jump_instr = Some(Box::new(JumpInstr { target }));
	}
	/// Labels named by the terminator, in operand order.
	pub fn succ_labels(&self) -> Vec<Label> {
		self
			.jump_instr
			.as_ref()
			.map(|v| v.get_succ_labels())
			.unwrap_or_default()
	}
	pub fn prev_labels(&self) -> Vec<Label> {
		self.prev.iter().map(|v| v.borrow().label()).collect()
	}
	/// Position of the first instruction that is not an `alloca`.
	pub fn first_non_alloca(&self) -> usize {
		self
			.instrs
			.iter()
			.position(|v| {
				!matches!(v.get_variant(), llvm::LlvmInstrVariant::AllocInstr(_))
			})
			.unwrap_or(self.instrs.len())
	}
}

fn instr_format<T: Display>(v: T) -> String {
	format!("  {}", v)
}

#[cfg(not(feature = "debug"))]
impl Display for BasicBlock {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let instrs = self
			.phi_instrs
			.iter()
			.map(instr_format)
			.chain(self.instrs.iter().map(instr_format))
			.chain(self.jump_instr.iter().map(instr_format))
			.collect::<Vec<_>>()
			.join("\n");
		write!(f, "{}:\n{}", self.label(), instrs)
	}
}

#[cfg(feature = "debug")]
impl Display for BasicBlock {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let prev: Vec<_> =
			self.prev.iter().map(|v| format!("%{}", v.borrow().name)).collect();
		let instrs = self
			.phi_instrs
			.iter()
			.map(instr_format)
			.chain(self.instrs.iter().map(instr_format))
			.chain(self.jump_instr.iter().map(instr_format))
			.collect::<Vec<_>>()
			.join("\n");
		write!(
			f,
			"{}:{:>width$}; id = {} preds = {}\n{}",
			self.label(),
			"",
			self.id,
			prev.join(", "),
			instrs,
			width = 4
		)
	}
}
