use std::{collections::HashSet, fmt::Display};

use crate::llvmvar::VarType;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temp {
	pub name: String,
	pub is_global: bool,
	pub var_type: VarType,
}

impl Display for Temp {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		if self.is_global {
			write!(f, "@{}", self.name)
		} else {
			write!(f, "%{}", self.name)
		}
	}
}

impl Temp {
	pub fn new(name: impl Display, var_type: VarType, is_global: bool) -> Self {
		Self {
			name: name.to_string(),
			var_type,
			is_global,
		}
	}
}

/// Hands out temp names that are unique within a program. Names read from
/// the input are reserved first so fresh temps never shadow them.
#[derive(Default)]
pub struct TempManager {
	pub total: u32,
	used: HashSet<String>,
}

impl TempManager {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn reserve(&mut self, name: impl Display) {
		self.used.insert(name.to_string());
	}
	pub fn is_used(&self, name: &str) -> bool {
		self.used.contains(name)
	}
	pub fn new_temp(&mut self, var_type: VarType, is_global: bool) -> Temp {
		loop {
			self.total += 1;
			let name = self.total.to_string();
			if self.used.insert(name.clone()) {
				return Temp::new(name, var_type, is_global);
			}
		}
	}
	/// Returns a local temp called `name`, or `name` followed by a number when
	/// that is already taken.
	pub fn new_named_temp(&mut self, name: impl Display, var_type: VarType) -> Temp {
		let base = name.to_string();
		let mut candidate = base.clone();
		let mut suffix = 0;
		while self.used.contains(&candidate) {
			suffix += 1;
			candidate = format!("{}{}", base, suffix);
		}
		self.used.insert(candidate.clone());
		Temp::new(candidate, var_type, false)
	}
}
