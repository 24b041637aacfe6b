//! Logger setup for the service binary.
//!
//! `YIELD_ALLOCATOR_LOG` takes a full env_logger filter (`info,yield_allocator::allocation=debug`)
//! and wins over the configured level; `YIELD_ALLOCATOR_LOG_STYLE` controls colouring.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::info;
use std::io::Write;

pub const LOG_FILTER_ENV: &str = "YIELD_ALLOCATOR_LOG";
pub const LOG_STYLE_ENV: &str = "YIELD_ALLOCATOR_LOG_STYLE";

const CRATE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

/// Module path without the crate prefix, so lines read `[allocation] ...`.
fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_PREFIX).unwrap_or(target)
}

/// Install the global logger. Only the first call has any effect.
pub fn init_logging(level: &str) {
    let env = Env::default().filter_or(LOG_FILTER_ENV, level).write_style_or(LOG_STYLE_ENV, "auto");

    let installed = Builder::from_env(env)
        .format(|buf, record| {
            let styled_level = buf.default_styled_level(record.level());
            writeln!(
                buf,
                "{} {:5} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                styled_level,
                short_target(record.target()),
                record.args()
            )
        })
        .target(Target::Stdout)
        .try_init()
        .is_ok();

    if installed {
        let filter = std::env::var(LOG_FILTER_ENV).unwrap_or_else(|_| level.to_string());
        info!("Logging initialized (filter: {})", filter);
    }
}
