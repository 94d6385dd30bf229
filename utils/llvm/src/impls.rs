use std::fmt::Display;

use utils::Label;

use crate::{
	llvminstr::*,
	llvmop::*,
	llvmvar::VarType,
	temp::Temp,
	utils_llvm::all_equal,
	LlvmInstrVariant,
};

impl Display for ArithInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = {} {} {}, {}",
			self.target, self.op, self.var_type, self.lhs, self.rhs
		)
	}
}

impl LlvmInstrTrait for ArithInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::ArithInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.op.is_float() == self.var_type.is_float()
			&& all_equal(&[
				&self.var_type,
				&self.target.var_type,
				&self.lhs.get_type(),
				&self.rhs.get_type(),
			])
	}
}

impl Display for CompInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = {} {} {} {}, {}",
			self.target, self.kind, self.op, self.var_type, self.lhs, self.rhs
		)
	}
}

impl LlvmInstrTrait for CompInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::CompInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.kind == self.op.kind()
			&& self.target.var_type == VarType::I1
			&& all_equal(&[
				&self.var_type,
				&self.lhs.get_type(),
				&self.rhs.get_type(),
			])
	}
}

impl Display for ConvertInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = {} {} {} to {}",
			self.target, self.op, self.from_type, self.lhs, self.to_type
		)
	}
}

impl LlvmInstrTrait for ConvertInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::ConvertInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.to_type == self.target.var_type
			&& self.from_type == self.lhs.get_type()
	}
}

impl Display for JumpInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "br label %{}", self.target)
	}
}

impl LlvmInstrTrait for JumpInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::JumpInstr(self)
	}
	fn is_terminator(&self) -> bool {
		true
	}
	fn get_succ_labels(&self) -> Vec<Label> {
		vec![self.target.clone()]
	}
	fn replace_succ_label(&mut self, old: &Label, new: &Label) {
		if self.target == *old {
			self.target = new.clone();
		}
	}
}

impl Display for JumpCondInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"br {} {}, label %{}, label %{}",
			self.var_type, self.cond, self.target_true, self.target_false
		)
	}
}

impl LlvmInstrTrait for JumpCondInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::JumpCondInstr(self)
	}
	fn type_valid(&self) -> bool {
		self.var_type == VarType::I1 && self.cond.get_type() == VarType::I1
	}
	fn is_terminator(&self) -> bool {
		true
	}
	fn get_succ_labels(&self) -> Vec<Label> {
		vec![self.target_true.clone(), self.target_false.clone()]
	}
	fn replace_succ_label(&mut self, old: &Label, new: &Label) {
		if self.target_true == *old {
			self.target_true = new.clone();
		}
		if self.target_false == *old {
			self.target_false = new.clone();
		}
	}
}

impl Display for PhiInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let source = self
			.source
			.iter()
			.map(|(value, label)| format!("[ {}, %{} ]", value, label))
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "{} = phi {} {}", self.target, self.var_type, source)
	}
}

impl LlvmInstrTrait for PhiInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::PhiInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.target.var_type == self.var_type
			&& self.source.iter().all(|(v, _)| v.get_type() == self.var_type)
	}
}

impl PhiInstr {
	pub fn new(target: Temp, source: Vec<(Value, Label)>) -> Self {
		Self {
			var_type: target.var_type,
			target,
			source,
		}
	}
	pub fn add_incoming(&mut self, value: Value, label: Label) {
		self.source.push((value, label));
	}
	pub fn get_incoming_value_for_block(&self, label: &Label) -> Option<Value> {
		self.source.iter().find(|(_, l)| l == label).map(|(v, _)| v.clone())
	}
	/// Replaces the value of every entry coming from `label`. Returns whether
	/// such an entry existed.
	pub fn set_incoming_value_for_block(
		&mut self,
		label: &Label,
		value: Value,
	) -> bool {
		let mut found = false;
		for (v, l) in self.source.iter_mut() {
			if l == label {
				*v = value.clone();
				found = true;
			}
		}
		found
	}
	/// Renames the first entry coming from `old` so it comes from `new`.
	pub fn replace_incoming_block(&mut self, old: &Label, new: &Label) {
		if let Some((_, l)) = self.source.iter_mut().find(|(_, l)| l == old) {
			*l = new.clone();
		}
	}
	pub fn has_incoming_block(&self, label: &Label) -> bool {
		self.source.iter().any(|(_, l)| l == label)
	}
}

impl Display for RetInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match &self.value {
			Some(value) => write!(f, "ret {} {}", value.get_type(), value),
			None => write!(f, "ret void"),
		}
	}
}

impl LlvmInstrTrait for RetInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::RetInstr(self)
	}
	fn is_terminator(&self) -> bool {
		true
	}
}

impl Display for AllocInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{} = alloca {}", self.target, self.var_type)
	}
}

impl LlvmInstrTrait for AllocInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::AllocInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.target.var_type == VarType::Ptr && self.var_type != VarType::Void
	}
}

impl Display for StoreInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"store {} {}, {} {}",
			self.var_type,
			self.value,
			VarType::Ptr,
			self.addr
		)
	}
}

impl LlvmInstrTrait for StoreInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::StoreInstr(self)
	}
	fn type_valid(&self) -> bool {
		self.value.get_type() == self.var_type
			&& self.addr.get_type() == VarType::Ptr
	}
}

impl Display for LoadInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = load {}, {} {}",
			self.target,
			self.var_type,
			VarType::Ptr,
			self.addr
		)
	}
}

impl LlvmInstrTrait for LoadInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::LoadInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.target.var_type == self.var_type
			&& self.addr.get_type() == VarType::Ptr
	}
}

impl Display for CallInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let params = self
			.params
			.iter()
			.map(|(var_type, value)| format!("{} {}", var_type, value))
			.collect::<Vec<_>>()
			.join(", ");
		if let Some(target) = &self.target {
			write!(f, "{} = ", target)?;
		}
		write!(f, "call {} @{}({})", self.var_type, self.func, params)
	}
}

impl LlvmInstrTrait for CallInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::CallInstr(self)
	}
	fn get_write(&self) -> Option<Temp> {
		self.target.clone()
	}
	fn type_valid(&self) -> bool {
		self.target.as_ref().map_or(VarType::Void, |t| t.var_type)
			== self.var_type
			&& self.params.iter().all(|(t, v)| *t == v.get_type())
	}
}

impl CallInstr {
	/// A call whose result, if any, is discarded.
	pub fn new_void(func: impl Display, params: Vec<(VarType, Value)>) -> Self {
		Self {
			target: None,
			var_type: VarType::Void,
			func: Label::new(func),
			params,
		}
	}
}

impl Display for UnreachableInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "unreachable")
	}
}

impl LlvmInstrTrait for UnreachableInstr {
	fn get_variant(&self) -> LlvmInstrVariant<'_> {
		LlvmInstrVariant::UnreachableInstr(self)
	}
	fn is_terminator(&self) -> bool {
		true
	}
}
