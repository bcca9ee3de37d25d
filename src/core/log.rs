use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Upstream crates that are chatty at debug level during a briefing run.
const QUIET_TARGETS: [&str; 4] = ["hyper_util", "reqwest", "fjall", "lsm_tree"];

/// Installs the global subscriber. `verbose` turns on debug output for this
/// crate and keeps HTTP and storage internals at warn. Without it, `RUST_LOG`
/// decides. A second call is a no-op.
pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::OFF, "off")
    };
    let app_filter = QUIET_TARGETS
        .iter()
        .fold(Targets::new(), |targets, target| {
            targets.with_target(*target, LevelFilter::WARN)
        })
        .with_target("tickerbrief", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_target(verbose))
        .with(app_filter)
        .with(env_filter)
        .try_init();
}
