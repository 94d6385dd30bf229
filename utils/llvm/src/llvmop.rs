use std::fmt::Display;

use kind_derive::LlvmDisplay;

use crate::{llvmvar::VarType, temp::Temp};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Bool(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Temp(Temp),
	Void,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, LlvmDisplay)]
pub enum ArithOp {
	Add,
	Sub,
	Mul,
	Sdiv,
	// signed modulo
	Srem,
	Fadd,
	Fsub,
	Fmul,
	Fdiv,
	// shift left
	Shl,
	// logical shift right
	Lshr,
	// arithmetic shift right
	Ashr,
	And,
	Or,
	Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, LlvmDisplay)]
pub enum CompOp {
	Eq,
	Ne,
	// signed greater than
	Sgt,
	// signed greater or equal
	Sge,
	// signed less than
	Slt,
	// signed less or equal
	Sle,
	// ordered and equal
	Oeq,
	// ordered and not equal
	One,
	// ordered and greater than
	Ogt,
	// ordered and greater or equal
	Oge,
	// ordered and less than
	Olt,
	// ordered and less or equal
	Ole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, LlvmDisplay)]
pub enum CompKind {
	Icmp,
	Fcmp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, LlvmDisplay)]
pub enum ConvertOp {
	Zext,
	Sext,
	Trunc,
	Sitofp,
	Fptosi,
}

impl Value {
	pub fn get_type(&self) -> VarType {
		match self {
			Self::Bool(_) => VarType::I1,
			Self::Int(_) => VarType::I32,
			Self::Long(_) => VarType::I64,
			Self::Float(_) => VarType::F32,
			Self::Temp(v) => v.var_type,
			Self::Void => VarType::Void,
		}
	}
	pub fn unwrap_temp(&self) -> Option<Temp> {
		match self {
			Self::Temp(v) => Some(v.clone()),
			_ => None,
		}
	}
	pub fn is_num(&self) -> bool {
		matches!(
			self,
			Self::Bool(_) | Self::Int(_) | Self::Long(_) | Self::Float(_)
		)
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Bool(v) => write!(f, "{}", v),
			Self::Int(v) => write!(f, "{}", v),
			Self::Long(v) => write!(f, "{}", v),
			Self::Float(v) => write!(f, "{:?}", v),
			Self::Temp(v) => write!(f, "{}", v),
			Self::Void => write!(f, "void"),
		}
	}
}

impl ArithOp {
	pub fn is_float(&self) -> bool {
		matches!(self, Self::Fadd | Self::Fsub | Self::Fmul | Self::Fdiv)
	}
}

impl CompOp {
	pub fn kind(&self) -> CompKind {
		match self {
			Self::Eq | Self::Ne | Self::Sgt | Self::Sge | Self::Slt | Self::Sle => {
				CompKind::Icmp
			}
			_ => CompKind::Fcmp,
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(value)
	}
}

impl From<Temp> for Value {
	fn from(value: Temp) -> Self {
		Value::Temp(value)
	}
}
