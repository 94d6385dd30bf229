use llvm::{
	intrinsic::{FnAttr, Intrinsic},
	LlvmTemp, LlvmTempManager, VarType,
};

pub use crate::func::LlvmFunc;

/// An external function: `declare <ret> @name(<params>) <attrs>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncDecl {
	pub name: String,
	pub ret_type: VarType,
	pub params: Vec<VarType>,
	pub attrs: Vec<FnAttr>,
}

/// A private string constant: `@name = private constant c"contents\00"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalStr {
	pub name: String,
	pub contents: String,
}

/// Everything in a module that is not a function body.
#[derive(Default)]
pub struct Externals {
	pub decls: Vec<FuncDecl>,
	pub strings: Vec<GlobalStr>,
}

impl Externals {
	pub fn get_decl(&self, name: &str) -> Option<&FuncDecl> {
		self.decls.iter().find(|v| v.name == name)
	}
	/// Declares `intrinsic` with its attribute set unless a declaration of the
	/// same symbol already exists. `condition` is the checked value's type
	/// for the assertion family.
	pub fn get_or_insert_decl(
		&mut self,
		intrinsic: Intrinsic,
		condition: VarType,
	) -> &FuncDecl {
		let name = intrinsic.symbol().unwrap_or_default();
		let pos = match self.decls.iter().position(|v| v.name == name) {
			Some(pos) => pos,
			None => {
				self.decls.push(FuncDecl {
					name: name.to_string(),
					ret_type: VarType::Void,
					params: intrinsic.param_types(condition),
					attrs: intrinsic.attrs(),
				});
				self.decls.len() - 1
			}
		};
		&self.decls[pos]
	}
	/// Adds a string constant named `.str.<stem>` (numbered when taken) and
	/// returns the global holding its address.
	pub fn add_string(&mut self, stem: &str, contents: &str) -> LlvmTemp {
		let base = format!(".str.{}", stem);
		let mut name = base.clone();
		let mut suffix = 0;
		while self.strings.iter().any(|v| v.name == name) {
			suffix += 1;
			name = format!("{}{}", base, suffix);
		}
		self.strings.push(GlobalStr {
			name: name.clone(),
			contents: contents.to_string(),
		});
		LlvmTemp::new(name, VarType::Ptr, true)
	}
}

pub struct LlvmProgram {
	pub externals: Externals,
	pub funcs: Vec<LlvmFunc>,
	pub temp_mgr: LlvmTempManager,
}

impl LlvmProgram {
	pub fn new() -> Self {
		Self {
			externals: Externals::default(),
			funcs: Vec::new(),
			temp_mgr: LlvmTempManager::new(),
		}
	}
	pub fn get_func(&self, name: &str) -> Option<&LlvmFunc> {
		self.funcs.iter().find(|v| v.name == name)
	}
	pub fn get_func_mut(&mut self, name: &str) -> Option<&mut LlvmFunc> {
		self.funcs.iter_mut().find(|v| v.name == name)
	}
	pub fn get_or_insert_decl(
		&mut self,
		intrinsic: Intrinsic,
		condition: VarType,
	) -> &FuncDecl {
		self.externals.get_or_insert_decl(intrinsic, condition)
	}
}

impl Default for LlvmProgram {
	fn default() -> Self {
		Self::new()
	}
}
