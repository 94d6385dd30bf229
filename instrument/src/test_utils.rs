use llvm::{LlvmInstrVariant, Value};
use rrvm::program::LlvmProgram;
use simulator::{ExecResult, Simulator};

pub fn parse_ok(src: &str) -> LlvmProgram {
	rrvm::parse(src).unwrap()
}

pub fn run_with(program: &LlvmProgram, args: Vec<Value>, nondet: Vec<i64>) -> ExecResult {
	Simulator::new(program)
		.with_nondet(nondet)
		.with_step_limit(100_000)
		.run("main", args)
		.unwrap()
}

pub fn run_main(program: &LlvmProgram, args: Vec<Value>) -> ExecResult {
	run_with(program, args, Vec::new())
}

pub fn edge_count(result: &ExecResult, from: &str, to: &str) -> usize {
	result
		.edge_counts
		.get(&(from.to_string(), to.to_string()))
		.copied()
		.unwrap_or(0)
}

pub fn count_calls(program: &LlvmProgram, callee: &str) -> usize {
	let mut count = 0;
	for func in program.funcs.iter() {
		for bb in func.cfg.blocks.iter() {
			for instr in bb.borrow().instrs.iter() {
				if let LlvmInstrVariant::CallInstr(call) = instr.get_variant() {
					if call.func.name == callee {
						count += 1;
					}
				}
			}
		}
	}
	count
}
