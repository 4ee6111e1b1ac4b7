use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use serde::Deserialize;
use std::fmt::Write;
use std::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Console,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum LogLevel {
    #[serde(rename = "DEBUG", alias = "debug")]
    #[value(name = "DEBUG")]
    Debug,
    #[serde(rename = "INFO", alias = "info")]
    #[value(name = "INFO")]
    Info,
    #[serde(rename = "WARN", alias = "warn")]
    #[value(name = "WARN")]
    Warn,
    #[serde(rename = "ERROR", alias = "error")]
    #[value(name = "ERROR")]
    Error,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

/// Build the logger for the process. The returned dispatcher is not installed
/// globally; callers pass it to the components that log.
///
/// `RUST_LOG` directives, when set, are added on top of the configured level.
pub fn build_dispatch(config: &LogConfig) -> Dispatch {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.filter().into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    match config.format {
        LogFormat::Json => Dispatch::new(builder.json().finish()),
        LogFormat::Console => Dispatch::new(builder.finish()),
    }
}

/// Generate a 16-character hex trace ID (8 random bytes).
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn format_elapsed(elapsed_us: u128) -> String {
    if elapsed_us < 1000 {
        format!("{elapsed_us}µs")
    } else if elapsed_us < 1_000_000 {
        format!("{}ms", elapsed_us / 1000)
    } else {
        format!("{:.1}s", elapsed_us as f64 / 1_000_000.0)
    }
}

/// Request logging middleware. Runs the handler under `logger` so that
/// anything logged while serving the request reaches the process logger.
pub async fn request_logging(State(logger): State<Dispatch>, req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut response = next.run(req).with_subscriber(logger.clone()).await;
    let elapsed = format_elapsed(start.elapsed().as_micros());
    let status = response.status();

    tracing::dispatcher::with_default(&logger, || {
        if status.is_server_error() {
            tracing::error!(
                trace_id = %trace_id,
                method = %method,
                path = %path,
                status = status.as_u16(),
                elapsed = %elapsed,
                "Request failed"
            );
        } else {
            tracing::debug!(
                trace_id = %trace_id,
                method = %method,
                path = %path,
                ua = %user_agent,
                status = status.as_u16(),
                elapsed = %elapsed,
                "Request served"
            );
        }
    });

    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("X-Trace-Id", val);
    }
    response
}
