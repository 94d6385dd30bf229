use std::fmt::Display;

use crate::{
	cfg::CFG,
	func::LlvmFunc,
	program::{FuncDecl, GlobalStr, LlvmProgram},
};

impl Display for CFG {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{}",
			self
				.blocks
				.iter()
				.map(|v| v.borrow().to_string())
				.collect::<Vec<_>>()
				.join("\n")
		)
	}
}

impl Display for LlvmFunc {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let params = self
			.params
			.iter()
			.map(|v| format!("{} {}", v.var_type, v))
			.collect::<Vec<_>>()
			.join(", ");
		let head = format!("define {} @{}({})", self.ret_type, self.name, params);
		write!(f, "{} {{\n{}\n}}", head, self.cfg)
	}
}

impl Display for FuncDecl {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let params = self
			.params
			.iter()
			.map(|v| v.to_string())
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "declare {} @{}({})", self.ret_type, self.name, params)?;
		for attr in self.attrs.iter() {
			write!(f, " {}", attr)?;
		}
		Ok(())
	}
}

/// Printable ASCII stays as is; everything else, and the two characters the
/// syntax needs, become `\XX`.
pub fn escape_string(s: &str) -> String {
	let mut res = String::new();
	for byte in s.bytes() {
		match byte {
			b'"' | b'\\' => res.push_str(&format!("\\{:02X}", byte)),
			0x20..=0x7e => res.push(byte as char),
			_ => res.push_str(&format!("\\{:02X}", byte)),
		}
	}
	res
}

impl Display for GlobalStr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"@{} = private constant [{} x i8] c\"{}\\00\"",
			self.name,
			self.contents.len() + 1,
			escape_string(&self.contents)
		)
	}
}

impl Display for LlvmProgram {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		for item in self.externals.strings.iter() {
			writeln!(f, "{}", item)?;
		}
		for item in self.externals.decls.iter() {
			writeln!(f, "{}", item)?;
		}
		if !self.externals.strings.is_empty() || !self.externals.decls.is_empty() {
			writeln!(f)?;
		}
		let funcs =
			self.funcs.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n\n");
		writeln!(f, "{}", funcs)
	}
}
