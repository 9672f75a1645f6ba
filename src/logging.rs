//! Structured logging initialization.
//!
//! Sets up `tracing` with:
//! - JSON (production) or pretty (development) formatting
//! - Sampling strategies (all, error-only, sampled)
//! - Optional non-blocking buffered output
//!
//! Configuration comes from `BRRTD_LOG_*` environment variables, see
//! [`LogConfig::from_env`]. `RUST_LOG` takes precedence over the level when set.

use anyhow::{Context, Result};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::subscriber::Interest;
use tracing::Level;
use tracing::{Event, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Sampling mode: how to decide which logs to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Log everything (high volume)
    All,
    /// Log only WARN and ERROR levels
    ErrorOnly,
    /// Sample routine events, log all warnings and errors
    Sampled,
}

impl SamplingMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "all" => SamplingMode::All,
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            _ => SamplingMode::Sampled,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Sampling rate (0.0-1.0) for Sampled mode
    pub sampling_rate: f64,
    /// Write through a non-blocking buffered writer
    pub async_logging: bool,
    /// Lines buffered before the non-blocking writer starts dropping
    pub buffer_size: usize,
    /// Extra filter directives (comma-separated, `target=level`)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prod = Self::default_prod();
        Self {
            log_level: lookup("BRRTD_LOG_LEVEL").unwrap_or(prod.log_level),
            format: lookup("BRRTD_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(prod.format),
            sampling_mode: lookup("BRRTD_LOG_SAMPLING_MODE")
                .map(|s| SamplingMode::parse(&s))
                .unwrap_or(prod.sampling_mode),
            sampling_rate: lookup("BRRTD_LOG_SAMPLING_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.sampling_rate),
            async_logging: lookup("BRRTD_LOG_ASYNC")
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.async_logging),
            buffer_size: lookup("BRRTD_LOG_BUFFER_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.buffer_size),
            target_filter: lookup("BRRTD_LOG_TARGET_FILTER"),
            include_location: lookup("BRRTD_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(prod.include_location),
        }
    }

    /// Default configuration for development and tests
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            buffer_size: 1024,
            target_filter: None,
            include_location: true,
        }
    }

    /// Default production configuration
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::Sampled,
            sampling_rate: 0.1,
            async_logging: true,
            buffer_size: 8192,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Sampling layer: decides whether to emit a log based on sampling rules
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, metadata: &Metadata<'_>) -> bool {
        let important = matches!(metadata.level(), &Level::WARN | &Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                let sample_interval = (1.0 / self.sampling_rate) as u64;
                sample_interval > 0 && count % sample_interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        let important = matches!(metadata.level(), &Level::WARN | &Level::ERROR);
        match self.mode {
            SamplingMode::All => Interest::always(),
            SamplingMode::ErrorOnly if important => Interest::always(),
            SamplingMode::ErrorOnly => Interest::never(),
            // Routine callsites must be asked every time or the first draw sticks
            SamplingMode::Sampled if important => Interest::always(),
            SamplingMode::Sampled => Interest::sometimes(),
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        self.should_sample(metadata)
    }

    fn on_event(&self, _event: &Event<'_>, _ctx: LayerContext<'_, S>) {}
}

/// Initialize logging at `log_level`, everything else from the environment.
///
/// # Errors
///
/// If a global subscriber is already installed.
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

/// Install the global subscriber described by `config`.
///
/// With `async_logging` the returned guard owns the background writer; keep
/// it alive for the lifetime of the process or buffered lines are lost.
///
/// # Errors
///
/// If a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use brrtdispatch::logging::{init_logging_with_config, LogConfig};
///
/// let _guard = init_logging_with_config(&LogConfig::from_env())
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {}", filter),
            }
        }
    }

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate));

    if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
            .buffered_lines_limit(config.buffer_size)
            .finish(std::io::stdout());

        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(writer)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(writer)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;
        Ok(Some(guard))
    } else {
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize sync logging")?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn metadata(level: Level) -> Metadata<'static> {
        Metadata::new(
            "test",
            "test::module",
            level,
            None,
            None,
            None,
            tracing::field::FieldSet::new(&[], tracing::callsite::Identifier(&CALLSITE)),
            tracing::metadata::Kind::EVENT,
        )
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
        assert_eq!(SamplingMode::parse("error_only"), SamplingMode::ErrorOnly);
        assert_eq!(SamplingMode::parse("all"), SamplingMode::All);
        assert_eq!(SamplingMode::parse("invalid"), SamplingMode::Sampled);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("BRRTD_LOG_LEVEL", "debug"),
            ("BRRTD_LOG_FORMAT", "pretty"),
            ("BRRTD_LOG_SAMPLING_RATE", "oops"),
            ("BRRTD_LOG_ASYNC", "false"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.sampling_rate, 0.1);
        assert!(!config.async_logging);
        assert_eq!(config.buffer_size, 8192);
    }

    #[test]
    fn test_error_only_mode() {
        let layer = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(!layer.should_sample(&metadata(Level::INFO)));
        assert!(layer.should_sample(&metadata(Level::WARN)));
        assert!(layer.should_sample(&metadata(Level::ERROR)));
    }

    #[test]
    fn test_sampled_mode_respects_rate() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, 0.5);
        let info = metadata(Level::INFO);
        let sampled = (0..100).filter(|_| layer.should_sample(&info)).count();
        assert_eq!(sampled, 50);
        for _ in 0..10 {
            assert!(layer.should_sample(&metadata(Level::ERROR)));
        }
    }

    #[test]
    fn test_zero_rate_drops_routine_events() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, -1.0);
        assert_eq!(layer.sampling_rate, 0.0);
        assert!(!layer.should_sample(&metadata(Level::INFO)));
        assert!(layer.should_sample(&metadata(Level::WARN)));
    }

    /// Counts delivered events per source line.
    #[derive(Clone, Default)]
    struct LineCounter(std::sync::Arc<parking_lot::Mutex<HashMap<u32, usize>>>);

    impl<S: Subscriber> Layer<S> for LineCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            let line = event.metadata().line().unwrap_or(0);
            *self.0.lock().entry(line).or_default() += 1;
        }
    }

    #[test]
    fn test_sampling_applies_per_event_not_per_callsite() {
        let counter = LineCounter::default();
        let subscriber = tracing_subscriber::registry()
            .with(SamplingLayer::new(SamplingMode::Sampled, 0.5))
            .with(counter.clone());

        tracing::subscriber::with_default(subscriber, || {
            for i in 0..100 {
                tracing::info!(i, "first callsite");
            }
            for i in 0..100 {
                tracing::info!(i, "second callsite");
            }
            for _ in 0..5 {
                tracing::warn!("always kept");
            }
        });

        let counts = counter.0.lock();
        let mut per_line: Vec<usize> = counts.values().copied().collect();
        per_line.sort_unstable();
        assert_eq!(per_line.len(), 3, "{counts:?}");
        assert_eq!(per_line[0], 5);
        assert!((40..=60).contains(&per_line[1]), "{counts:?}");
        assert!((40..=60).contains(&per_line[2]), "{counts:?}");
    }

    struct TestCallsite;
    impl tracing::callsite::Callsite for TestCallsite {
        fn set_interest(&self, _interest: tracing::subscriber::Interest) {}
        fn metadata(&self) -> &tracing::Metadata<'_> {
            panic!("not used in tests")
        }
    }
    static CALLSITE: TestCallsite = TestCallsite;
}
