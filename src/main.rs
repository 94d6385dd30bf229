mod cli;
mod logging;

use std::{
	fs::{self, File},
	io,
	io::Write,
};

use anyhow::Result;
use cli::{Args, Mode, Parser};
use instrument::*;
use log::{info, trace};
use rrvm::{program::LlvmProgram, verify::verify_func};
use utils::{fatal_error, map_sys_err, warning};

fn step_parse(file_name: &str) -> Result<LlvmProgram> {
	let code = fs::read_to_string(file_name).map_err(map_sys_err)?;
	Ok(rrvm::parse(&code)?)
}

fn step_instrument(program: &mut LlvmProgram, args: &Args) -> Result<bool> {
	let config = KindConfig {
		max_backedge_count: args.max_backedge_count,
		k: args.k,
	};
	let mut changed = false;
	if args.rename_assume {
		changed |= RenameAssume::new().apply(program)?;
	}
	if args.explicit_int_loads {
		changed |= ExplicitIntLoads::new().apply(program)?;
	}
	if !args.no_loop_simplify {
		changed |= LoopSimplify::new().apply(program)?;
	}
	changed |= match args.mode {
		Mode::Base => {
			if args.k != 0 {
				warning("--kind-k has no effect in base mode");
			}
			InductiveBase::new(config).apply(program)?
		}
		Mode::Step => {
			if args.max_backedge_count != 0 {
				warning("--kind-max-backedge-count has no effect in step mode");
			}
			InductiveStep::new(config).apply(program)?
		}
	};
	for func in program.funcs.iter() {
		verify_func(func)?;
	}
	Ok(changed)
}

fn main() -> Result<()> {
	let args = Args::parse();
	logging::init(args.verbose);
	trace!("start");

	let file_name = args.input.clone().unwrap_or_else(|| {
		fatal_error("no input files");
		unreachable!()
	});

	let mut program = step_parse(&file_name)?;
	let changed = step_instrument(&mut program, &args)?;
	info!("{}: {}", file_name, if changed { "instrumented" } else { "unchanged" });

	let mut writer: Box<dyn Write> = if let Some(o) = &args.output {
		Box::new(File::create(o).map_err(map_sys_err)?)
	} else {
		Box::new(io::stdout())
	};
	write!(writer, "{}", program)?;
	Ok(())
}
