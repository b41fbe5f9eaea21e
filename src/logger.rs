use std::fmt;
use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

/// Dependencies that log every parsed page or pooled connection at debug.
const CHATTY_MODULES: [&str; 5] = ["html5ever", "selectors", "reqwest", "hyper_util", "lettre"];

fn line(level: Level, args: &fmt::Arguments<'_>) -> String {
    format!("{} [{}] - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), level, args)
}

/// Timestamped logger, `info` unless `RUST_LOG` says otherwise. Parser and
/// transport crates stay at `warn` so `RUST_LOG=debug` shows the pipeline.
pub fn init() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| writeln!(buf, "{}", line(record.level(), record.args())))
        .filter(None, LevelFilter::Info);
    for module in CHATTY_MODULES {
        builder.filter_module(module, LevelFilter::Warn);
    }
    builder.parse_env(Env::default()).init();

    log::info!("Logger initialized.");
}
