use llvm::{ArithOp, CompOp, ConvertOp, Value, VarType};
use utils::{KindError, Result};

/// A value held by a temporary or a stack slot while interpreting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimValue {
	Bool(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	// index into the simulator's memory
	Ptr(usize),
}

fn type_error(what: &str, value: &SimValue) -> KindError {
	KindError::RuntimeError(format!("expected {}, found {:?}", what, value))
}

impl SimValue {
	pub fn from_const(value: &Value) -> Option<Self> {
		match value {
			Value::Bool(v) => Some(Self::Bool(*v)),
			Value::Int(v) => Some(Self::Int(*v)),
			Value::Long(v) => Some(Self::Long(*v)),
			Value::Float(v) => Some(Self::Float(*v)),
			Value::Temp(_) | Value::Void => None,
		}
	}

	pub fn to_value(self) -> Value {
		match self {
			Self::Bool(v) => Value::Bool(v),
			Self::Int(v) => Value::Int(v),
			Self::Long(v) => Value::Long(v),
			Self::Float(v) => Value::Float(v),
			Self::Ptr(v) => Value::Long(v as i64),
		}
	}

	/// Integer view, sign-extended. `i1` is 0 or 1.
	pub fn as_i64(&self) -> Result<i64> {
		match self {
			Self::Bool(v) => Ok(*v as i64),
			Self::Int(v) => Ok(*v as i64),
			Self::Long(v) => Ok(*v),
			_ => Err(type_error("an integer", self)),
		}
	}

	pub fn as_f32(&self) -> Result<f32> {
		match self {
			Self::Float(v) => Ok(*v),
			_ => Err(type_error("a float", self)),
		}
	}

	pub fn as_ptr(&self) -> Result<usize> {
		match self {
			Self::Ptr(v) => Ok(*v),
			_ => Err(type_error("a pointer", self)),
		}
	}

	pub fn is_true(&self) -> Result<bool> {
		Ok(self.as_i64()? != 0)
	}

	/// Wraps an integer into `var_type`, keeping the low bits.
	pub fn from_int(var_type: VarType, v: i64) -> Result<Self> {
		match var_type {
			VarType::I1 => Ok(Self::Bool(v & 1 != 0)),
			VarType::I32 => Ok(Self::Int(v as i32)),
			VarType::I64 => Ok(Self::Long(v)),
			VarType::F32 => Ok(Self::Float(f32::from_bits(v as u32))),
			_ => Err(KindError::RuntimeError(format!(
				"cannot build a {} from an integer",
				var_type
			))),
		}
	}
}

fn div_error() -> KindError {
	KindError::RuntimeError("division by zero".to_string())
}

pub fn arith(op: ArithOp, var_type: VarType, lhs: SimValue, rhs: SimValue) -> Result<SimValue> {
	if op.is_float() {
		let (a, b) = (lhs.as_f32()?, rhs.as_f32()?);
		return Ok(SimValue::Float(match op {
			ArithOp::Fadd => a + b,
			ArithOp::Fsub => a - b,
			ArithOp::Fmul => a * b,
			_ => a / b,
		}));
	}
	let (a, b) = (lhs.as_i64()?, rhs.as_i64()?);
	// 按位宽截断后再运算，保证 i32 上的回绕行为
	let v = match var_type {
		VarType::I32 => {
			let (a, b) = (a as i32, b as i32);
			let v = match op {
				ArithOp::Add => a.wrapping_add(b),
				ArithOp::Sub => a.wrapping_sub(b),
				ArithOp::Mul => a.wrapping_mul(b),
				ArithOp::Sdiv => a.checked_div(b).ok_or_else(div_error)?,
				ArithOp::Srem => a.checked_rem(b).ok_or_else(div_error)?,
				ArithOp::Shl => a.wrapping_shl(b as u32),
				ArithOp::Lshr => ((a as u32).wrapping_shr(b as u32)) as i32,
				ArithOp::Ashr => a.wrapping_shr(b as u32),
				ArithOp::And => a & b,
				ArithOp::Or => a | b,
				ArithOp::Xor => a ^ b,
				_ => unreachable!(),
			};
			v as i64
		}
		_ => match op {
			ArithOp::Add => a.wrapping_add(b),
			ArithOp::Sub => a.wrapping_sub(b),
			ArithOp::Mul => a.wrapping_mul(b),
			ArithOp::Sdiv => a.checked_div(b).ok_or_else(div_error)?,
			ArithOp::Srem => a.checked_rem(b).ok_or_else(div_error)?,
			ArithOp::Shl => a.wrapping_shl(b as u32),
			ArithOp::Lshr => ((a as u64).wrapping_shr(b as u32)) as i64,
			ArithOp::Ashr => a.wrapping_shr(b as u32),
			ArithOp::And => a & b,
			ArithOp::Or => a | b,
			ArithOp::Xor => a ^ b,
			_ => unreachable!(),
		},
	};
	SimValue::from_int(var_type, v)
}

pub fn compare(op: CompOp, lhs: SimValue, rhs: SimValue) -> Result<bool> {
	if let (SimValue::Float(a), SimValue::Float(b)) = (lhs, rhs) {
		return Ok(match op {
			CompOp::Eq | CompOp::Oeq => a == b,
			CompOp::Ne | CompOp::One => a != b,
			CompOp::Sgt | CompOp::Ogt => a > b,
			CompOp::Sge | CompOp::Oge => a >= b,
			CompOp::Slt | CompOp::Olt => a < b,
			CompOp::Sle | CompOp::Ole => a <= b,
		});
	}
	if let (SimValue::Ptr(a), SimValue::Ptr(b)) = (lhs, rhs) {
		return match op {
			CompOp::Eq => Ok(a == b),
			CompOp::Ne => Ok(a != b),
			_ => Err(KindError::RuntimeError("ordered pointer comparison".to_string())),
		};
	}
	let (a, b) = (lhs.as_i64()?, rhs.as_i64()?);
	Ok(match op {
		CompOp::Eq | CompOp::Oeq => a == b,
		CompOp::Ne | CompOp::One => a != b,
		CompOp::Sgt | CompOp::Ogt => a > b,
		CompOp::Sge | CompOp::Oge => a >= b,
		CompOp::Slt | CompOp::Olt => a < b,
		CompOp::Sle | CompOp::Ole => a <= b,
	})
}

pub fn convert(op: ConvertOp, to_type: VarType, value: SimValue) -> Result<SimValue> {
	match op {
		ConvertOp::Zext => {
			let v = match value {
				SimValue::Bool(v) => v as i64,
				SimValue::Int(v) => v as u32 as i64,
				_ => value.as_i64()?,
			};
			SimValue::from_int(to_type, v)
		}
		ConvertOp::Sext | ConvertOp::Trunc => SimValue::from_int(to_type, value.as_i64()?),
		ConvertOp::Sitofp => Ok(SimValue::Float(value.as_i64()? as f32)),
		ConvertOp::Fptosi => SimValue::from_int(to_type, value.as_f32()? as i64),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn i32_arithmetic_wraps() {
		let v = arith(ArithOp::Add, VarType::I32, SimValue::Int(i32::MAX), SimValue::Int(1));
		assert_eq!(v.unwrap(), SimValue::Int(i32::MIN));
		let v = arith(ArithOp::Sdiv, VarType::I32, SimValue::Int(1), SimValue::Int(0));
		assert!(v.is_err());
		let v = arith(ArithOp::Xor, VarType::I1, SimValue::Bool(true), SimValue::Bool(true));
		assert_eq!(v.unwrap(), SimValue::Bool(false));
	}

	#[test]
	fn conversions() {
		assert_eq!(
			convert(ConvertOp::Zext, VarType::I32, SimValue::Bool(true)).unwrap(),
			SimValue::Int(1)
		);
		assert_eq!(
			convert(ConvertOp::Sext, VarType::I64, SimValue::Int(-2)).unwrap(),
			SimValue::Long(-2)
		);
		assert_eq!(
			convert(ConvertOp::Trunc, VarType::I1, SimValue::Int(3)).unwrap(),
			SimValue::Bool(true)
		);
		assert!(compare(CompOp::Slt, SimValue::Int(-1), SimValue::Int(0)).unwrap());
	}
}
