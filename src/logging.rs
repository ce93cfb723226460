use tracing_subscriber::EnvFilter;

use crate::progress::OutputMode;

/// Install the global tracing subscriber on stderr.
///
/// When the spinner UI manages the terminal (Normal mode), tracing is
/// suppressed entirely — stray stderr lines corrupt indicatif's
/// terminal line tracking. Plain mode logs at info, Verbose at debug.
pub fn init(mode: OutputMode) {
    let filter = match mode {
        OutputMode::Verbose => EnvFilter::new("debug"),
        OutputMode::Normal => EnvFilter::new("off"),
        OutputMode::Plain => EnvFilter::from_default_env()
            .add_directive("winup=info".parse().expect("valid log directive")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
