pub mod intrinsic;
pub mod llvminstr;
pub mod llvmop;
pub mod llvmvar;
pub mod temp;

mod impls;
mod utils_llvm;

pub use llvminstr::*;
pub use llvmop::*;
pub use llvmvar::*;
pub use temp::Temp;

pub type LlvmTemp = temp::Temp;
pub type LlvmTempManager = temp::TempManager;

pub enum LlvmInstrVariant<'a> {
	ArithInstr(&'a ArithInstr),
	CompInstr(&'a CompInstr),
	ConvertInstr(&'a ConvertInstr),
	JumpInstr(&'a JumpInstr),
	JumpCondInstr(&'a JumpCondInstr),
	PhiInstr(&'a PhiInstr),
	RetInstr(&'a RetInstr),
	AllocInstr(&'a AllocInstr),
	StoreInstr(&'a StoreInstr),
	LoadInstr(&'a LoadInstr),
	CallInstr(&'a CallInstr),
	UnreachableInstr(&'a UnreachableInstr),
}
