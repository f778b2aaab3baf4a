//! Logger initialization.

use log::LevelFilter;
use std::io::Write;

/// Initialize `env_logger`.
///
/// `RUST_LOG` is read first; `level` then overrides the global filter, so
/// `--log-level` always wins while per-module `RUST_LOG` directives still work
/// for dependencies. HTTP client internals never log below `level` or info,
/// whichever is quieter.
///
/// Uses `try_init`, so calling this twice (as tests may) is an error rather
/// than a panic.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", level.min(LevelFilter::Info));
    builder.filter_module("hyper", level.min(LevelFilter::Info));
    builder.filter_module("graduate_map", level);

    builder.format(|buf, record| {
        let emoji = match record.level() {
            log::Level::Error => "❌",
            log::Level::Warn => "⚠️",
            log::Level::Info => "✔️",
            log::Level::Debug => "🔍",
            log::Level::Trace => "🔬",
        };
        writeln!(
            buf,
            "{} {} [{}] {}",
            emoji,
            record.target(),
            record.level(),
            record.args()
        )
    });

    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_without_panicking() {
        let _ = init_logger(LevelFilter::Warn);
        assert!(init_logger(LevelFilter::Debug).is_err());
    }
}
