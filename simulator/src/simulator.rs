use std::collections::{HashMap, VecDeque};

use llvm::{LlvmInstr, LlvmInstrVariant, Value, VarType};
use log::trace;
use rand::{rngs::StdRng, SeedableRng};
use rrvm::{program::LlvmProgram, LlvmFunc};
use utils::{KindError, Result};

use crate::value::{arith, compare, convert, SimValue};

/// How an execution ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
	Returned(Option<Value>),
	/// An assumption failed; the path does not count.
	Discarded,
	AssertionFailed,
	Aborted,
	StepLimit,
}

pub struct ExecResult {
	pub outcome: Outcome,
	/// Names of the blocks entered, in order.
	pub trace: Vec<String>,
	/// Traversal count of every `(from, to)` edge taken, keyed by block name.
	pub edge_counts: HashMap<(String, String), usize>,
}

pub(crate) struct Slot {
	pub var_type: VarType,
	pub value: Option<SimValue>,
}

pub(crate) enum Exit {
	Return(Option<SimValue>),
	Halt(Outcome),
}

type Frame = HashMap<String, SimValue>;

pub struct Simulator<'a> {
	program: &'a LlvmProgram,
	pub(crate) nondet: VecDeque<i64>,
	pub(crate) rng: StdRng,
	pub(crate) memory: Vec<Slot>,
	globals: HashMap<String, usize>,
	step_limit: usize,
	steps: usize,
	trace: Vec<String>,
	edge_counts: HashMap<(String, String), usize>,
}

fn runtime_error(msg: String) -> KindError {
	KindError::RuntimeError(msg)
}

impl<'a> Simulator<'a> {
	pub fn new(program: &'a LlvmProgram) -> Self {
		Self {
			program,
			nondet: VecDeque::new(),
			rng: StdRng::seed_from_u64(0),
			memory: Vec::new(),
			globals: HashMap::new(),
			step_limit: 1_000_000,
			steps: 0,
			trace: Vec::new(),
			edge_counts: HashMap::new(),
		}
	}

	/// Values handed out, in order, by `klee_make_symbolic` before falling
	/// back to the random generator.
	pub fn with_nondet(mut self, values: Vec<i64>) -> Self {
		self.nondet = values.into();
		self
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.rng = StdRng::seed_from_u64(seed);
		self
	}

	pub fn with_step_limit(mut self, limit: usize) -> Self {
		self.step_limit = limit;
		self
	}

	pub fn run(mut self, func: &str, args: Vec<Value>) -> Result<ExecResult> {
		for global in self.program.externals.strings.iter() {
			self.globals.insert(global.name.clone(), self.memory.len());
			self.memory.push(Slot {
				var_type: VarType::Void,
				value: None,
			});
		}
		let args = args
			.iter()
			.map(|v| {
				SimValue::from_const(v)
					.ok_or_else(|| runtime_error(format!("argument {} is not a constant", v)))
			})
			.collect::<Result<Vec<_>>>()?;
		let outcome = match self.call(func, args)? {
			Exit::Return(v) => Outcome::Returned(v.map(SimValue::to_value)),
			Exit::Halt(outcome) => outcome,
		};
		trace!("{} finished after {} steps: {:?}", func, self.steps, outcome);
		Ok(ExecResult {
			outcome,
			trace: self.trace,
			edge_counts: self.edge_counts,
		})
	}

	fn tick(&mut self) -> bool {
		self.steps += 1;
		self.steps > self.step_limit
	}

	fn eval(&self, value: &Value, frame: &Frame) -> Result<SimValue> {
		match value {
			Value::Temp(t) if t.is_global => self
				.globals
				.get(&t.name)
				.map(|v| SimValue::Ptr(*v))
				.ok_or_else(|| runtime_error(format!("unknown global {}", t))),
			Value::Temp(t) => frame
				.get(&t.name)
				.copied()
				.ok_or_else(|| runtime_error(format!("{} used before definition", t))),
			_ => SimValue::from_const(value)
				.ok_or_else(|| runtime_error(format!("cannot evaluate {}", value))),
		}
	}

	fn slot(&mut self, addr: SimValue) -> Result<&mut Slot> {
		let index = addr.as_ptr()?;
		self
			.memory
			.get_mut(index)
			.ok_or_else(|| runtime_error(format!("dangling pointer {}", index)))
	}

	fn call(&mut self, name: &str, args: Vec<SimValue>) -> Result<Exit> {
		let program = self.program;
		let Some(func) = program.get_func(name) else {
			return self.call_intrinsic(name, &args).map(|v| match v {
				Some(outcome) => Exit::Halt(outcome),
				None => Exit::Return(None),
			});
		};
		if func.params.len() != args.len() {
			return Err(runtime_error(format!(
				"{} expects {} arguments, got {}",
				name,
				func.params.len(),
				args.len()
			)));
		}
		let mut frame: Frame =
			func.params.iter().map(|v| v.name.clone()).zip(args).collect();
		self.run_func(func, &mut frame)
	}

	fn run_func(&mut self, func: &LlvmFunc, frame: &mut Frame) -> Result<Exit> {
		let mut bb = func.cfg.get_entry();
		let mut prev: Option<String> = None;
		loop {
			let next = {
				let block = bb.borrow();
				self.trace.push(block.name.clone());

				// phi 并行求值：先全部读出再统一写入
				if !block.phi_instrs.is_empty() {
					let Some(from) = prev.as_ref() else {
						return Err(runtime_error(format!("phi in entry block {}", block.name)));
					};
					let mut values = Vec::new();
					for phi in block.phi_instrs.iter() {
						if self.tick() {
							return Ok(Exit::Halt(Outcome::StepLimit));
						}
						let (value, _) =
							phi.source.iter().find(|(_, l)| &l.name == from).ok_or_else(|| {
								runtime_error(format!("{} has no value for {}", phi.target, from))
							})?;
						values.push(self.eval(value, frame)?);
					}
					for (phi, value) in block.phi_instrs.iter().zip(values) {
						frame.insert(phi.target.name.clone(), value);
					}
				}

				for instr in block.instrs.iter() {
					if self.tick() {
						return Ok(Exit::Halt(Outcome::StepLimit));
					}
					if let Some(outcome) = self.exec(instr, frame)? {
						return Ok(Exit::Halt(outcome));
					}
				}

				if self.tick() {
					return Ok(Exit::Halt(Outcome::StepLimit));
				}
				let jump = block
					.jump_instr
					.as_ref()
					.ok_or_else(|| runtime_error(format!("{} has no terminator", block.name)))?;
				let target = match jump.get_variant() {
					LlvmInstrVariant::JumpInstr(i) => i.target.clone(),
					LlvmInstrVariant::JumpCondInstr(i) => {
						if self.eval(&i.cond, frame)?.is_true()? {
							i.target_true.clone()
						} else {
							i.target_false.clone()
						}
					}
					LlvmInstrVariant::RetInstr(i) => {
						let value = match &i.value {
							Some(v) => Some(self.eval(v, frame)?),
							None => None,
						};
						return Ok(Exit::Return(value));
					}
					LlvmInstrVariant::UnreachableInstr(_) => {
						return Err(runtime_error(format!(
							"reached unreachable in {}",
							block.name
						)));
					}
					_ => return Err(runtime_error(format!("bad terminator {}", jump))),
				};
				*self
					.edge_counts
					.entry((block.name.clone(), target.name.clone()))
					.or_default() += 1;
				prev = Some(block.name.clone());
				func
					.cfg
					.find_block(&target)
					.ok_or_else(|| runtime_error(format!("unknown block {}", target)))?
			};
			bb = next;
		}
	}

	/// Executes one non-terminator instruction. Returns the outcome when the
	/// execution halts inside it.
	fn exec(&mut self, instr: &LlvmInstr, frame: &mut Frame) -> Result<Option<Outcome>> {
		match instr.get_variant() {
			LlvmInstrVariant::ArithInstr(i) => {
				let lhs = self.eval(&i.lhs, frame)?;
				let rhs = self.eval(&i.rhs, frame)?;
				frame.insert(i.target.name.clone(), arith(i.op, i.var_type, lhs, rhs)?);
			}
			LlvmInstrVariant::CompInstr(i) => {
				let lhs = self.eval(&i.lhs, frame)?;
				let rhs = self.eval(&i.rhs, frame)?;
				let v = compare(i.op, lhs, rhs)?;
				frame.insert(i.target.name.clone(), SimValue::Bool(v));
			}
			LlvmInstrVariant::ConvertInstr(i) => {
				let v = convert(i.op, i.to_type, self.eval(&i.lhs, frame)?)?;
				frame.insert(i.target.name.clone(), v);
			}
			LlvmInstrVariant::AllocInstr(i) => {
				frame.insert(i.target.name.clone(), SimValue::Ptr(self.memory.len()));
				self.memory.push(Slot {
					var_type: i.var_type,
					value: None,
				});
			}
			LlvmInstrVariant::StoreInstr(i) => {
				let value = self.eval(&i.value, frame)?;
				let addr = self.eval(&i.addr, frame)?;
				self.slot(addr)?.value = Some(value);
			}
			LlvmInstrVariant::LoadInstr(i) => {
				let addr = self.eval(&i.addr, frame)?;
				let value = self
					.slot(addr)?
					.value
					.ok_or_else(|| runtime_error(format!("{} reads uninitialised memory", i.target)))?;
				frame.insert(i.target.name.clone(), value);
			}
			LlvmInstrVariant::CallInstr(i) => {
				let args = i
					.params
					.iter()
					.map(|(_, v)| self.eval(v, frame))
					.collect::<Result<Vec<_>>>()?;
				match self.call(&i.func.name, args)? {
					Exit::Halt(outcome) => return Ok(Some(outcome)),
					Exit::Return(value) => {
						if let Some(target) = &i.target {
							let value = value.ok_or_else(|| {
								runtime_error(format!("{} returned no value", i.func))
							})?;
							frame.insert(target.name.clone(), value);
						}
					}
				}
			}
			_ => return Err(runtime_error(format!("unexpected instruction {}", instr))),
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use llvm::Value;

	use super::{Outcome, Simulator};

	fn run(src: &str, args: Vec<Value>, nondet: Vec<i64>) -> super::ExecResult {
		let program = rrvm::parse(src).unwrap();
		Simulator::new(&program)
			.with_nondet(nondet)
			.with_step_limit(10_000)
			.run("main", args)
			.unwrap()
	}

	#[test]
	fn recursion_and_memory() {
		let src = r#"
define i32 @fact(i32 %n) {
entry:
  %slot = alloca i32
  store i32 1, ptr %slot
  %small = icmp sle i32 %n, 1
  br i1 %small, label %done, label %rec
rec:
  %m = sub i32 %n, 1
  %r = call i32 @fact(i32 %m)
  %p = mul i32 %r, %n
  store i32 %p, ptr %slot
  br label %done
done:
  %v = load i32, ptr %slot
  ret i32 %v
}
define i32 @main(i32 %x) {
entry:
  %r = call i32 @fact(i32 %x)
  ret i32 %r
}
"#;
		let result = run(src, vec![Value::Int(5)], Vec::new());
		assert_eq!(result.outcome, Outcome::Returned(Some(Value::Int(120))));
	}

	#[test]
	fn phis_are_evaluated_in_parallel() {
		let src = r#"
define i32 @main() {
entry:
  br label %loop
loop:
  %a = phi i32 [ 1, %entry ], [ %b, %loop ]
  %b = phi i32 [ 2, %entry ], [ %a, %loop ]
  %i = phi i32 [ 0, %entry ], [ %i.next, %loop ]
  %i.next = add i32 %i, 1
  %c = icmp slt i32 %i.next, 2
  br i1 %c, label %loop, label %exit
exit:
  ret i32 %a
}
"#;
		let result = run(src, Vec::new(), Vec::new());
		assert_eq!(result.outcome, Outcome::Returned(Some(Value::Int(2))));
		assert_eq!(result.edge_counts[&("loop".to_string(), "loop".to_string())], 1);
		assert_eq!(result.trace, vec!["entry", "loop", "loop", "exit"]);
	}

	const SHIMS: &str = r#"
@.str.x = private constant [2 x i8] c"x\00"
declare void @klee_make_symbolic(ptr, i64, ptr)
declare void @__VERIFIER_assume(i1)
declare void @__VERIFIER_assert_or_assume(i1, i1)
declare void @abort() noreturn nounwind
define void @main(i1 %f) {
entry:
  %slot = alloca i32
  call void @klee_make_symbolic(ptr %slot, i64 4, ptr @.str.x)
  %x = load i32, ptr %slot
  %pos = icmp sge i32 %x, 0
  call void @__VERIFIER_assume(i1 %pos)
  %small = icmp slt i32 %x, 10
  call void @__VERIFIER_assert_or_assume(i1 %small, i1 %f)
  call void @abort()
  unreachable
}
"#;

	#[test]
	fn verifier_shims() {
		let f = |v| vec![Value::Bool(v)];
		assert_eq!(run(SHIMS, f(false), vec![-1]).outcome, Outcome::Discarded);
		assert_eq!(run(SHIMS, f(false), vec![3]).outcome, Outcome::Aborted);
		assert_eq!(run(SHIMS, f(false), vec![12]).outcome, Outcome::AssertionFailed);
		assert_eq!(run(SHIMS, f(true), vec![12]).outcome, Outcome::Discarded);
		// 高位被截掉，只剩低 32 位
		assert_eq!(run(SHIMS, f(false), vec![1 << 32 | 5]).outcome, Outcome::Aborted);
	}

	#[test]
	fn same_seed_same_run() {
		let program = rrvm::parse(SHIMS).unwrap();
		let run_seeded = |seed| {
			Simulator::new(&program)
				.with_seed(seed)
				.run("main", vec![Value::Bool(false)])
				.unwrap()
				.outcome
		};
		assert_eq!(run_seeded(7), run_seeded(7));
	}

	#[test]
	fn infinite_loop_hits_step_limit() {
		let src = r#"
define void @main() {
entry:
  br label %loop
loop:
  br label %loop
}
"#;
		assert_eq!(run(src, Vec::new(), Vec::new()).outcome, Outcome::StepLimit);
	}
}
