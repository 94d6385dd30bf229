use std::collections::HashSet;

use llvm::{
	intrinsic::FnAttr, AllocInstr, ArithInstr, ArithOp, CallInstr, CompInstr,
	CompKind, CompOp, ConvertInstr, ConvertOp, JumpCondInstr, JumpInstr,
	LlvmInstr, LlvmTemp, LlvmTempManager, LoadInstr, PhiInstr, RetInstr,
	StoreInstr, UnreachableInstr, Value, VarType,
};
use log::trace;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use utils::{
	errors::Result,
	KindError::{InvalidIr, LlvmSyntaxError},
	Label,
};

use crate::{
	basicblock::Node,
	func::LlvmFunc,
	program::{FuncDecl, GlobalStr, LlvmProgram},
};

#[derive(Parser)]
#[grammar = "llvmir.pest"]
struct IrParser;

fn parse_type(pair: Pair<Rule>) -> VarType {
	match pair.as_str() {
		"void" => VarType::Void,
		"i1" => VarType::I1,
		"i32" => VarType::I32,
		"i64" => VarType::I64,
		"float" => VarType::F32,
		"ptr" => VarType::Ptr,
		_ => unreachable!(),
	}
}

fn map_arith_op(pair: &Pair<Rule>) -> ArithOp {
	match pair.as_str() {
		"add" => ArithOp::Add,
		"sub" => ArithOp::Sub,
		"mul" => ArithOp::Mul,
		"sdiv" => ArithOp::Sdiv,
		"srem" => ArithOp::Srem,
		"fadd" => ArithOp::Fadd,
		"fsub" => ArithOp::Fsub,
		"fmul" => ArithOp::Fmul,
		"fdiv" => ArithOp::Fdiv,
		"shl" => ArithOp::Shl,
		"lshr" => ArithOp::Lshr,
		"ashr" => ArithOp::Ashr,
		"and" => ArithOp::And,
		"or" => ArithOp::Or,
		"xor" => ArithOp::Xor,
		_ => unreachable!(),
	}
}

fn map_comp_op(pair: &Pair<Rule>) -> CompOp {
	match pair.as_str() {
		"eq" => CompOp::Eq,
		"ne" => CompOp::Ne,
		"sgt" => CompOp::Sgt,
		"sge" => CompOp::Sge,
		"slt" => CompOp::Slt,
		"sle" => CompOp::Sle,
		"oeq" => CompOp::Oeq,
		"one" => CompOp::One,
		"ogt" => CompOp::Ogt,
		"oge" => CompOp::Oge,
		"olt" => CompOp::Olt,
		"ole" => CompOp::Ole,
		_ => unreachable!(),
	}
}

fn map_convert_op(pair: &Pair<Rule>) -> ConvertOp {
	match pair.as_str() {
		"zext" => ConvertOp::Zext,
		"sext" => ConvertOp::Sext,
		"trunc" => ConvertOp::Trunc,
		"sitofp" => ConvertOp::Sitofp,
		"fptosi" => ConvertOp::Fptosi,
		_ => unreachable!(),
	}
}

fn map_fn_attr(s: &str) -> Option<FnAttr> {
	match s {
		"nounwind" => Some(FnAttr::Nounwind),
		"norecurse" => Some(FnAttr::Norecurse),
		"optnone" => Some(FnAttr::Optnone),
		"noinline" => Some(FnAttr::Noinline),
		"inaccessiblememonly" => Some(FnAttr::Inaccessiblememonly),
		"noreturn" => Some(FnAttr::Noreturn),
		_ => None,
	}
}

/// `%name` or `@name` without the sigil.
fn parse_name(pair: Pair<Rule>) -> String {
	pair.as_str()[1..].to_string()
}

fn parse_attrs(pair: Pair<Rule>) -> Vec<FnAttr> {
	pair
		.into_inner()
		.filter_map(|v| {
			let attr = map_fn_attr(v.as_str());
			if attr.is_none() {
				trace!("ignoring function attribute {}", v.as_str());
			}
			attr
		})
		.collect()
}

fn unescape_string(s: &str) -> Result<String> {
	let bytes = s.as_bytes();
	let mut res = Vec::new();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'\\' {
			let hex = s.get(i + 1..i + 3).ok_or_else(|| {
				LlvmSyntaxError(format!("truncated escape in c\"{}\"", s))
			})?;
			let byte = u8::from_str_radix(hex, 16).map_err(|_| {
				LlvmSyntaxError(format!("bad escape \\{} in c\"{}\"", hex, s))
			})?;
			res.push(byte);
			i += 3;
		} else {
			res.push(bytes[i]);
			i += 1;
		}
	}
	if res.last() == Some(&0) {
		res.pop();
	}
	String::from_utf8(res)
		.map_err(|_| LlvmSyntaxError(format!("c\"{}\" is not UTF-8", s)))
}

/// Per-function parsing state.
struct FuncParser<'a> {
	func_name: String,
	temp_mgr: &'a mut LlvmTempManager,
	defined: HashSet<String>,
}

impl<'a> FuncParser<'a> {
	fn define(&mut self, pair: Pair<Rule>, var_type: VarType) -> Result<LlvmTemp> {
		let name = parse_name(pair);
		if !self.defined.insert(name.clone()) {
			return Err(InvalidIr(format!(
				"{}: %{} is defined more than once",
				self.func_name, name
			)));
		}
		self.temp_mgr.reserve(&name);
		Ok(LlvmTemp::new(name, var_type, false))
	}

	/// Operands are typed by the instruction they appear in.
	fn parse_value(&self, pair: Pair<Rule>, var_type: VarType) -> Result<Value> {
		let inner = pair.into_inner().next().unwrap();
		let text = inner.as_str();
		let bad_literal = || {
			LlvmSyntaxError(format!(
				"{}: literal {} is not a valid {}",
				self.func_name, text, var_type
			))
		};
		match inner.as_rule() {
			Rule::LocalName => Ok(Value::Temp(LlvmTemp::new(
				parse_name(inner),
				var_type,
				false,
			))),
			Rule::GlobalName => {
				Ok(Value::Temp(LlvmTemp::new(parse_name(inner), VarType::Ptr, true)))
			}
			Rule::Bool => match var_type {
				VarType::I1 => Ok(Value::Bool(text == "true")),
				_ => Err(bad_literal()),
			},
			Rule::Int => match var_type {
				VarType::I1 => match text {
					"0" => Ok(Value::Bool(false)),
					"1" | "-1" => Ok(Value::Bool(true)),
					_ => Err(bad_literal()),
				},
				VarType::I32 => text.parse().map(Value::Int).map_err(|_| bad_literal()),
				VarType::I64 => text.parse().map(Value::Long).map_err(|_| bad_literal()),
				VarType::F32 => text.parse().map(Value::Float).map_err(|_| bad_literal()),
				_ => Err(bad_literal()),
			},
			Rule::Float => match var_type {
				VarType::F32 => text.parse().map(Value::Float).map_err(|_| bad_literal()),
				_ => Err(bad_literal()),
			},
			_ => unreachable!(),
		}
	}

	fn parse_phi(&mut self, pair: Pair<Rule>) -> Result<PhiInstr> {
		let mut pairs = pair.into_inner();
		let target = pairs.next().unwrap();
		let var_type = parse_type(pairs.next().unwrap());
		let target = self.define(target, var_type)?;
		let mut source = Vec::new();
		for incoming in pairs {
			let mut inner = incoming.into_inner();
			let value = self.parse_value(inner.next().unwrap(), var_type)?;
			let label = Label::new(parse_name(inner.next().unwrap()));
			source.push((value, label));
		}
		Ok(PhiInstr::new(target, source))
	}

	fn parse_instr(&mut self, pair: Pair<Rule>) -> Result<LlvmInstr> {
		let rule = pair.as_rule();
		let mut pairs = pair.into_inner();
		let instr: LlvmInstr = match rule {
			Rule::Arith => {
				let target = pairs.next().unwrap();
				let op = map_arith_op(&pairs.next().unwrap());
				let var_type = parse_type(pairs.next().unwrap());
				Box::new(ArithInstr {
					target: self.define(target, var_type)?,
					op,
					var_type,
					lhs: self.parse_value(pairs.next().unwrap(), var_type)?,
					rhs: self.parse_value(pairs.next().unwrap(), var_type)?,
				})
			}
			Rule::Comp => {
				let target = pairs.next().unwrap();
				let kind = match pairs.next().unwrap().as_str() {
					"icmp" => CompKind::Icmp,
					_ => CompKind::Fcmp,
				};
				let op = map_comp_op(&pairs.next().unwrap());
				let var_type = parse_type(pairs.next().unwrap());
				Box::new(CompInstr {
					kind,
					target: self.define(target, VarType::I1)?,
					op,
					var_type,
					lhs: self.parse_value(pairs.next().unwrap(), var_type)?,
					rhs: self.parse_value(pairs.next().unwrap(), var_type)?,
				})
			}
			Rule::Convert => {
				let target = pairs.next().unwrap();
				let op = map_convert_op(&pairs.next().unwrap());
				let from_type = parse_type(pairs.next().unwrap());
				let lhs = self.parse_value(pairs.next().unwrap(), from_type)?;
				let to_type = parse_type(pairs.next().unwrap());
				Box::new(ConvertInstr {
					target: self.define(target, to_type)?,
					op,
					from_type,
					lhs,
					to_type,
				})
			}
			Rule::Alloca => {
				let target = pairs.next().unwrap();
				Box::new(AllocInstr {
					target: self.define(target, VarType::Ptr)?,
					var_type: parse_type(pairs.next().unwrap()),
				})
			}
			Rule::Load => {
				let target = pairs.next().unwrap();
				let var_type = parse_type(pairs.next().unwrap());
				Box::new(LoadInstr {
					target: self.define(target, var_type)?,
					var_type,
					addr: self.parse_value(pairs.next().unwrap(), VarType::Ptr)?,
				})
			}
			Rule::Store => {
				let var_type = parse_type(pairs.next().unwrap());
				Box::new(StoreInstr {
					var_type,
					value: self.parse_value(pairs.next().unwrap(), var_type)?,
					addr: self.parse_value(pairs.next().unwrap(), VarType::Ptr)?,
				})
			}
			Rule::Call => {
				let mut next = pairs.next().unwrap();
				let target = if next.as_rule() == Rule::LocalName {
					let target = next;
					next = pairs.next().unwrap();
					Some(target)
				} else {
					None
				};
				let var_type = parse_type(next);
				let target = match target {
					Some(v) => Some(self.define(v, var_type)?),
					None => None,
				};
				let func = Label::new(parse_name(pairs.next().unwrap()));
				let mut params = Vec::new();
				if let Some(args) = pairs.next() {
					for arg in args.into_inner() {
						let mut inner = arg.into_inner();
						let arg_type = parse_type(inner.next().unwrap());
						params.push((arg_type, self.parse_value(inner.next().unwrap(), arg_type)?));
					}
				}
				Box::new(CallInstr {
					target,
					var_type,
					func,
					params,
				})
			}
			Rule::Br => Box::new(JumpInstr {
				target: Label::new(parse_name(pairs.next().unwrap())),
			}),
			Rule::CondBr => {
				let var_type = parse_type(pairs.next().unwrap());
				Box::new(JumpCondInstr {
					var_type,
					cond: self.parse_value(pairs.next().unwrap(), var_type)?,
					target_true: Label::new(parse_name(pairs.next().unwrap())),
					target_false: Label::new(parse_name(pairs.next().unwrap())),
				})
			}
			Rule::Ret => {
				let first = pairs.next().unwrap();
				let value = match first.as_rule() {
					Rule::RetVoid => None,
					_ => {
						let var_type = parse_type(first);
						Some(self.parse_value(pairs.next().unwrap(), var_type)?)
					}
				};
				Box::new(RetInstr { value })
			}
			Rule::Unreachable => Box::new(UnreachableInstr {}),
			_ => unreachable!(),
		};
		if !instr.type_valid() {
			return Err(InvalidIr(format!(
				"{}: ill-typed instruction `{}`",
				self.func_name, instr
			)));
		}
		Ok(instr)
	}

	fn parse_block(&mut self, pair: Pair<Rule>, func: &mut LlvmFunc) -> Result<Node> {
		let mut pairs = pair.into_inner();
		let label = pairs.next().unwrap().into_inner().next().unwrap().as_str();
		if func.cfg.blocks.iter().any(|v| v.borrow().name == label) {
			return Err(InvalidIr(format!(
				"{}: block {} is defined more than once",
				self.func_name, label
			)));
		}
		let node = func.new_basicblock(label);
		for item in pairs {
			match item.as_rule() {
				Rule::Phi => {
					let phi = self.parse_phi(item)?;
					node.borrow_mut().push_phi(phi);
				}
				Rule::Br | Rule::CondBr | Rule::Ret | Rule::Unreachable => {
					let jump = self.parse_instr(item)?;
					node.borrow_mut().set_jump(Some(jump));
				}
				_ => {
					let instr = self.parse_instr(item)?;
					node.borrow_mut().push(instr);
				}
			}
		}
		Ok(node)
	}
}

fn parse_define(pair: Pair<Rule>, temp_mgr: &mut LlvmTempManager) -> Result<LlvmFunc> {
	let mut pairs = pair.into_inner();
	let ret_type = parse_type(pairs.next().unwrap());
	let name = parse_name(pairs.next().unwrap());
	let mut parser = FuncParser {
		func_name: name.clone(),
		temp_mgr,
		defined: HashSet::new(),
	};
	let mut params = Vec::new();
	let mut func = LlvmFunc::new(&name, ret_type, Vec::new());
	for item in pairs {
		match item.as_rule() {
			Rule::Params => {
				for param in item.into_inner() {
					let mut inner = param.into_inner();
					let var_type = parse_type(inner.next().unwrap());
					params.push(parser.define(inner.next().unwrap(), var_type)?);
				}
			}
			Rule::Attrs => {}
			Rule::Block => {
				let node = parser.parse_block(item, &mut func)?;
				func.cfg.blocks.push(node);
			}
			_ => unreachable!(),
		}
	}
	func.params = params;
	func.cfg.resolve_edges().map_err(|e| InvalidIr(format!("{}: {}", name, e)))?;
	Ok(func)
}

fn parse_declare(pair: Pair<Rule>) -> FuncDecl {
	let mut pairs = pair.into_inner();
	let ret_type = parse_type(pairs.next().unwrap());
	let name = parse_name(pairs.next().unwrap());
	let mut params = Vec::new();
	let mut attrs = Vec::new();
	for item in pairs {
		match item.as_rule() {
			Rule::TypeList => params = item.into_inner().map(parse_type).collect(),
			Rule::Attrs => attrs = parse_attrs(item),
			_ => unreachable!(),
		}
	}
	FuncDecl {
		name,
		ret_type,
		params,
		attrs,
	}
}

fn parse_global_str(pair: Pair<Rule>) -> Result<GlobalStr> {
	let mut pairs = pair.into_inner();
	let name = parse_name(pairs.next().unwrap());
	// 跳过可选的数组长度
	let body = pairs
		.find(|v| v.as_rule() == Rule::CString)
		.and_then(|v| v.into_inner().next())
		.map_or("", |v| v.as_str());
	Ok(GlobalStr {
		name,
		contents: unescape_string(body)?,
	})
}

/// Calls must name a defined or declared function.
fn check_callees(program: &LlvmProgram) -> Result<()> {
	for func in program.funcs.iter() {
		for bb in func.cfg.blocks.iter() {
			for instr in bb.borrow().instrs.iter() {
				if let llvm::LlvmInstrVariant::CallInstr(call) = instr.get_variant() {
					let callee = &call.func.name;
					if program.get_func(callee).is_none()
						&& program.externals.get_decl(callee).is_none()
					{
						return Err(InvalidIr(format!(
							"{}: call to undeclared function @{}",
							func.name, callee
						)));
					}
				}
			}
		}
	}
	Ok(())
}

pub fn parse(str: &str) -> Result<LlvmProgram> {
	let program_pair = IrParser::parse(Rule::Program, str)
		.map_err(|e| LlvmSyntaxError(e.to_string()))?
		.next()
		.unwrap();
	let mut program = LlvmProgram::new();
	for item in program_pair.into_inner() {
		match item.as_rule() {
			Rule::GlobalStr => {
				let global = parse_global_str(item)?;
				program.externals.strings.push(global);
			}
			Rule::Declare => program.externals.decls.push(parse_declare(item)),
			Rule::Define => {
				let func = parse_define(item, &mut program.temp_mgr)?;
				program.funcs.push(func);
			}
			Rule::EOI => {}
			_ => unreachable!(),
		}
	}
	check_callees(&program)?;
	Ok(program)
}
