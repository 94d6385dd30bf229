use std::fmt::Display;

use utils::Label;

use crate::{llvmop::*, llvmvar::VarType, temp::Temp, LlvmInstrVariant};

pub trait CloneLlvmInstr {
	fn clone_box(&self) -> Box<dyn LlvmInstrTrait>;
}

impl<T> CloneLlvmInstr for T
where
	T: 'static + LlvmInstrTrait + Clone,
{
	fn clone_box(&self) -> Box<dyn LlvmInstrTrait> {
		Box::new(self.clone())
	}
}

impl Clone for Box<dyn LlvmInstrTrait> {
	fn clone(&self) -> Self {
		self.clone_box()
	}
}

pub trait LlvmInstrTrait: Display + CloneLlvmInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_>;
	fn get_write(&self) -> Option<Temp> {
		None
	}
	fn type_valid(&self) -> bool {
		true
	}
	fn is_terminator(&self) -> bool {
		false
	}
	/// Labels this instruction may transfer control to, in operand order.
	fn get_succ_labels(&self) -> Vec<Label> {
		Vec::new()
	}
	fn replace_succ_label(&mut self, _old: &Label, _new: &Label) {}
}

pub type LlvmInstr = Box<dyn LlvmInstrTrait>;

#[derive(Clone)]
pub struct ArithInstr {
	pub target: Temp,
	pub op: ArithOp,
	pub var_type: VarType,
	pub lhs: Value,
	pub rhs: Value,
}

#[derive(Clone)]
pub struct CompInstr {
	pub kind: CompKind,
	pub target: Temp,
	pub op: CompOp,
	pub var_type: VarType,
	pub lhs: Value,
	pub rhs: Value,
}

#[derive(Clone)]
pub struct ConvertInstr {
	pub target: Temp,
	pub op: ConvertOp,
	pub from_type: VarType,
	pub lhs: Value,
	pub to_type: VarType,
}

#[derive(Clone)]
pub struct JumpInstr {
	pub target: Label,
}

#[derive(Clone)]
pub struct JumpCondInstr {
	pub var_type: VarType,
	pub cond: Value,
	pub target_true: Label,
	pub target_false: Label,
}

#[derive(Clone, Debug)]
pub struct PhiInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub source: Vec<(Value, Label)>,
}

#[derive(Clone)]
pub struct RetInstr {
	pub value: Option<Value>,
}

#[derive(Clone)]
pub struct AllocInstr {
	pub target: Temp,
	pub var_type: VarType,
}

#[derive(Clone)]
pub struct StoreInstr {
	pub var_type: VarType,
	pub value: Value,
	pub addr: Value,
}

#[derive(Clone)]
pub struct LoadInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub addr: Value,
}

#[derive(Clone)]
pub struct CallInstr {
	pub target: Option<Temp>,
	pub var_type: VarType,
	pub func: Label,
	pub params: Vec<(VarType, Value)>,
}

#[derive(Clone)]
pub struct UnreachableInstr {}
