pub use clap::Parser;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
	/// bound every loop by the max backedge count
	Base,
	/// havoc loop-carried values and check k consecutive iterations
	Step,
}

#[derive(Parser, Debug)]
#[command(about = "k-induction instrumentation of loops in LLVM-like IR")]
pub struct Args {
	#[arg(short)]
	pub output: Option<String>,

	#[arg(long, value_enum, default_value_t = Mode::Base)]
	pub mode: Mode,

	#[arg(long = "kind-max-backedge-count", default_value_t = 0)]
	pub max_backedge_count: u32,

	#[arg(long = "kind-k", default_value_t = 0)]
	pub k: u32,

	/// rewrite `verifier.assume` style calls first
	#[arg(long)]
	pub rename_assume: bool,

	#[arg(long)]
	pub explicit_int_loads: bool,

	#[arg(long)]
	pub no_loop_simplify: bool,

	/// -v info, -vv debug, -vvv trace
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[arg(value_parser)]
	pub input: Option<String>,
}
