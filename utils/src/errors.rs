use thiserror::Error;

#[derive(Error, Debug)]
pub enum KindError {
	#[error("syntax error in llvm ir: {0}")]
	LlvmSyntaxError(String),
	#[error("invalid llvm ir: {0}")]
	InvalidIr(String),
	#[error("system error: {0}")]
	SystemError(String),
	#[error("runtime error: {0}")]
	RuntimeError(String),
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("loop at '{header}' in function '{func}' is not canonical: {reason}")]
	NonCanonicalLoop {
		func: String,
		header: String,
		reason: String,
	},
	#[error("loop at '{header}' in function '{func}' is already instrumented")]
	AlreadyInstrumented { func: String, header: String },
	#[error(
		"cannot havoc loop-carried value of type {var_type} at '{header}' in function '{func}'"
	)]
	UnsupportedHavocType {
		func: String,
		header: String,
		var_type: String,
	},
	#[error("phi {phi} in block '{block}' of function '{func}' does not match predecessors: {detail}")]
	MalformedPhi {
		func: String,
		block: String,
		phi: String,
		detail: String,
	},
}

pub type Result<T, E = KindError> = std::result::Result<T, E>;

pub fn map_sys_err(e: std::io::Error) -> KindError {
	KindError::SystemError(e.to_string())
}
