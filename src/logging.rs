use log::LevelFilter;

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `-v`.
pub fn init(verbose: u8) {
	let level = match verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};
	env_logger::Builder::new()
		.filter_level(level)
		.parse_default_env()
		.target(env_logger::Target::Stderr)
		.format_timestamp(None)
		.format_module_path(false)
		.init();
}
