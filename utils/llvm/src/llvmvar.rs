use kind_derive::LlvmDisplay;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, LlvmDisplay)]
pub enum VarType {
	#[style("void")]
	Void,
	#[style("i1")]
	I1,
	#[style("i32")]
	I32,
	#[style("i64")]
	I64,
	#[style("float")]
	F32,
	#[style("ptr")]
	Ptr,
}

impl VarType {
	pub fn is_int(&self) -> bool {
		matches!(self, Self::I1 | Self::I32 | Self::I64)
	}
	pub fn is_float(&self) -> bool {
		matches!(self, Self::F32)
	}
	/// Number of bytes a stack slot of this type occupies, or `None` when the
	/// type cannot be materialised in memory as an arbitrary value.
	pub fn havoc_size(&self) -> Option<i64> {
		match self {
			Self::I1 => Some(1),
			Self::I32 | Self::F32 => Some(4),
			Self::I64 => Some(8),
			Self::Void | Self::Ptr => None,
		}
	}
}
