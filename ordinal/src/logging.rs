// Logging System for Ordinal
//
// Ordinal logs through the `tracing` ecosystem. Library code only emits events;
// binaries and tests pick a subscriber once through the `init*` functions here.
//
// # Usage Examples
//
// ## Initialization
//
// ```rust,no_run
// use ordinal::logging;
//
// // DEBUG level, colored output, file/line info
// logging::init_development();
//
// // Or INFO level as flattened JSON
// logging::init_production();
//
// // Or a custom configuration
// logging::init(logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     target_filters: Some("ordinal::router=trace".to_string()),
//     ..Default::default()
// });
// ```
//
// `RUST_LOG` is honored on top of the configured level.
//
// ## Event Macros
//
// ```rust,no_run
// use ordinal::{actor_span, log_dispatch, log_lifecycle};
//
// let span = actor_span!("room", "r1");
// let _guard = span.enter();
//
// log_lifecycle!("router", "router:room", "drain started");
// log_dispatch!("room:r1", "resolved", queue_length = 3);
// ```

use std::io;
use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the Ordinal logging system
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global subscriber for `config`.
///
/// Safe to call more than once; only the first call of any `init*`
/// function takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let env_filter = build_filter(&config);
        let registry = tracing_subscriber::registry().with(env_filter);

        let subscriber: Box<dyn Subscriber + Send + Sync> = match (config.json_format, config.show_time) {
            (true, _) => Box::new(registry.with(fmt::layer().json().flatten_event(true))),
            (false, true) => Box::new(registry.with(console_layer(&config))),
            (false, false) => Box::new(registry.with(console_layer(&config).without_time())),
        };

        set_global_subscriber(subscriber);
    });
}

/// Like [`init`], additionally appending plain-text events to `log_file`.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    // Fail early on an unwritable path instead of silently falling back later.
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let env_filter = build_filter(&config);
        let log_file_path = log_file.to_string();

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || match file_writer(&log_file_path) {
                Ok(writer) => writer,
                Err(_) => Box::new(io::stderr()),
            })
            .with_file(true)
            .with_line_number(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer(&config))
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// DEBUG level with router internals at TRACE; colored output with locations.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        json_format: false,
        show_file_line: true,
        show_thread_info: true,
        show_time: true,
        target_filters: Some("ordinal=debug,ordinal::router=trace".to_string()),
    });
}

/// INFO level, flattened JSON, no source locations.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// Warnings and errors only, compact plain text.
///
/// Call it at the top of each test that wants log output:
///
/// ```rust,no_run
/// ordinal::logging::init_test();
/// ```
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            match filter.trim().parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(err) => eprintln!("Ignoring log filter '{}': {}", filter, err),
            }
        }
    }

    env_filter
}

fn console_layer<S>(config: &LogConfig) -> fmt::Layer<S>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_file(config.show_file_line)
        .with_line_number(config.show_file_line)
        .with_thread_names(config.show_thread_info)
        .with_thread_ids(config.show_thread_info)
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` for appending, creating it if needed.
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Box::new(file))
}

/// Span covering work done on behalf of one actor key.
#[macro_export]
macro_rules! actor_span {
    ($actor_type:expr, $actor_id:expr) => {
        $crate::__tracing::info_span!("actor", actor_type = $actor_type, actor_id = $actor_id)
    };
    ($actor_type:expr, $actor_id:expr, $($fields:tt)*) => {
        $crate::__tracing::info_span!("actor", actor_type = $actor_type, actor_id = $actor_id, $($fields)*)
    };
}

/// Lifecycle event of a component instance (router, activation).
#[macro_export]
macro_rules! log_lifecycle {
    ($component:expr, $instance:expr, $event:expr) => {
        $crate::__tracing::debug!(component = $component, instance = $instance, event = $event)
    };
    ($component:expr, $instance:expr, $event:expr, $($fields:tt)*) => {
        $crate::__tracing::debug!(component = $component, instance = $instance, event = $event, $($fields)*)
    };
}

/// Per-message dispatch event inside the drain loop.
#[macro_export]
macro_rules! log_dispatch {
    ($actor_key:expr, $status:expr) => {
        $crate::__tracing::trace!(actor_key = %$actor_key, status = $status)
    };
    ($actor_key:expr, $status:expr, $($fields:tt)*) => {
        $crate::__tracing::trace!(actor_key = %$actor_key, status = $status, $($fields)*)
    };
}

/// Failure that the runtime recovered from but an operator should see.
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {
        $crate::__tracing::warn!(error = %$error)
    };
    ($error:expr, $($fields:tt)*) => {
        $crate::__tracing::warn!(error = %$error, $($fields)*)
    };
}

pub use tracing::{debug, error, info, trace, warn};
