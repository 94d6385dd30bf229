//! The verifier runtime's functions this crate knows by name.
//!
//! Every place that asks "is this call one of ours" goes through
//! [`Intrinsic::classify`], so the symbol list below is the whole contract with
//! the runtime.

use kind_derive::LlvmDisplay;

use crate::llvmvar::VarType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
	/// `void __VERIFIER_assume(i1)`: discard the path when false.
	Assume,
	/// `void __VERIFIER_assert(T)`: report a violation when false.
	Assert,
	/// `void __VERIFIER_assert_or_assume(T, i1)`: assume when the flag is set,
	/// assert otherwise.
	AssertOrAssume,
	/// `void klee_make_symbolic(ptr, i64, ptr)`: fill a buffer with an arbitrary
	/// value.
	MakeNondet,
	/// `void abort()`.
	Abort,
	/// `verifier.assume`, spelled this way by other analysis tools.
	AssumeAlias,
	/// `verifier.assume.not`: assume the negation of the argument.
	AssumeNotAlias,
	Unrecognized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, LlvmDisplay)]
pub enum FnAttr {
	Nounwind,
	Norecurse,
	Optnone,
	Noinline,
	Inaccessiblememonly,
	Noreturn,
}

/// Calls carrying these attributes are never folded away, even when the
/// callee looks free of side effects.
const OPAQUE_CALL_ATTRS: [FnAttr; 5] = [
	FnAttr::Nounwind,
	FnAttr::Norecurse,
	FnAttr::Optnone,
	FnAttr::Noinline,
	FnAttr::Inaccessiblememonly,
];

impl Intrinsic {
	pub fn classify(name: &str) -> Self {
		match name {
			"__VERIFIER_assume" => Self::Assume,
			"__VERIFIER_assert" => Self::Assert,
			"__VERIFIER_assert_or_assume" => Self::AssertOrAssume,
			"klee_make_symbolic" => Self::MakeNondet,
			"abort" => Self::Abort,
			"verifier.assume" => Self::AssumeAlias,
			"verifier.assume.not" => Self::AssumeNotAlias,
			_ => Self::Unrecognized,
		}
	}
	pub fn symbol(&self) -> Option<&'static str> {
		match self {
			Self::Assume => Some("__VERIFIER_assume"),
			Self::Assert => Some("__VERIFIER_assert"),
			Self::AssertOrAssume => Some("__VERIFIER_assert_or_assume"),
			Self::MakeNondet => Some("klee_make_symbolic"),
			Self::Abort => Some("abort"),
			Self::AssumeAlias => Some("verifier.assume"),
			Self::AssumeNotAlias => Some("verifier.assume.not"),
			Self::Unrecognized => None,
		}
	}
	/// Parameter types of the declaration this crate emits. `condition` is the
	/// type of the checked value, which the runtime accepts at any int width.
	pub fn param_types(&self, condition: VarType) -> Vec<VarType> {
		match self {
			Self::Assume | Self::AssumeAlias | Self::AssumeNotAlias => {
				vec![VarType::I1]
			}
			Self::Assert => vec![condition],
			Self::AssertOrAssume => vec![condition, VarType::I1],
			Self::MakeNondet => vec![VarType::Ptr, VarType::I64, VarType::Ptr],
			Self::Abort | Self::Unrecognized => Vec::new(),
		}
	}
	pub fn attrs(&self) -> Vec<FnAttr> {
		match self {
			Self::Assume | Self::AssertOrAssume => OPAQUE_CALL_ATTRS.to_vec(),
			Self::Abort => vec![FnAttr::Noreturn, FnAttr::Nounwind],
			_ => Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classify_round_trips_symbols() {
		for intrinsic in [
			Intrinsic::Assume,
			Intrinsic::Assert,
			Intrinsic::AssertOrAssume,
			Intrinsic::MakeNondet,
			Intrinsic::Abort,
			Intrinsic::AssumeAlias,
			Intrinsic::AssumeNotAlias,
		] {
			let symbol = intrinsic.symbol().unwrap();
			assert_eq!(Intrinsic::classify(symbol), intrinsic);
		}
		assert_eq!(Intrinsic::classify("assert"), Intrinsic::Unrecognized);
		assert_eq!(Intrinsic::Unrecognized.symbol(), None);
	}

	#[test]
	fn assume_is_not_foldable() {
		let attrs = Intrinsic::Assume.attrs();
		assert!(attrs.contains(&FnAttr::Optnone));
		assert!(attrs.contains(&FnAttr::Inaccessiblememonly));
		assert_eq!(FnAttr::Inaccessiblememonly.to_string(), "inaccessiblememonly");
		assert_eq!(Intrinsic::AssertOrAssume.attrs(), attrs);
	}
}
