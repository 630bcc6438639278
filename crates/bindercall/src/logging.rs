use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Targets that follow `--log-level`. Everything else is capped at warn.
const CRATE_TARGETS: [&str; 5] = [
    "bindercall",
    "bindercall_client",
    "bindercall_shell",
    "bindercall_opcode",
    "bindercall_parcel",
];

fn targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_targets(CRATE_TARGETS.iter().map(|target| (*target, level)))
        .with_default(level.min(LevelFilter::WARN))
}

/// Install the stderr subscriber. Event targets are printed so shell and
/// resolver events can be told apart.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(targets(level)).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(targets(level)).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn crate_targets_follow_requested_level() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("bindercall_shell::session", &Level::DEBUG));
        assert!(filter.would_enable("bindercall_opcode", &Level::DEBUG));
        assert!(!filter.would_enable("bindercall_client", &Level::TRACE));
    }

    #[test]
    fn dependency_targets_are_capped_at_warn() {
        let filter = targets(LogLevel::Trace);
        assert!(filter.would_enable("mio::poll", &Level::WARN));
        assert!(!filter.would_enable("mio::poll", &Level::INFO));
    }

    #[test]
    fn quiet_levels_apply_everywhere() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("bindercall_shell", &Level::WARN));
        assert!(!filter.would_enable("tokio", &Level::WARN));
        assert!(filter.would_enable("tokio", &Level::ERROR));
    }
}
