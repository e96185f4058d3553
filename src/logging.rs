//! Structured logging setup.
//!
//! Binding and dispatch emit `tracing` events with structured fields
//! (`handler_name`, `route`, `request_id`, `phase`). This module installs a
//! subscriber for them, configured from the environment:
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `OBJR_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `OBJR_LOG_FORMAT` | json/pretty | `json` |
//! | `OBJR_LOG_ASYNC` | true/false | `false` |
//! | `OBJR_LOG_FILTER` | comma-separated `EnvFilter` directives | none |
//!
//! `RUST_LOG`, when set, takes precedence over `OBJR_LOG_LEVEL`. Logs are
//! written to stderr.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Subscriber settings for the `objroute` binary and embedding servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Write through a background thread
    pub non_blocking: bool,
    /// Extra directives such as `objroute::binding=debug`
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            non_blocking: false,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from a variable lookup; unknown values keep the default.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(level) = var("OBJR_LOG_LEVEL").and_then(|v| v.trim().parse().ok()) {
            config.level = level;
        }
        if let Some(format) = var("OBJR_LOG_FORMAT") {
            if format.trim().eq_ignore_ascii_case("pretty") {
                config.format = LogFormat::Pretty;
            }
        }
        if let Some(flag) = var("OBJR_LOG_ASYNC").and_then(|v| v.trim().parse().ok()) {
            config.non_blocking = flag;
        }
        if let Some(filter) = var("OBJR_LOG_FILTER") {
            config.directives = filter
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        config
    }

    /// Pretty `debug` output for `--verbose`.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => eprintln!("Warning: ignoring log filter directive '{directive}'"),
            }
        }
        filter
    }
}

fn fmt_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_target(true).with_writer(writer);
    match format {
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Install the global subscriber.
///
/// With a non-blocking writer the returned guard must be kept alive; dropping
/// it flushes and stops the writer thread.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    if config.non_blocking {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        registry
            .with(fmt_layer(config.format, writer))
            .try_init()
            .context("failed to install non-blocking log subscriber")?;
        Ok(Some(guard))
    } else {
        registry
            .with(fmt_layer(config.format, std::io::stderr))
            .try_init()
            .context("failed to install log subscriber")?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_vars_override_defaults() {
        let config = from_map(&[
            ("OBJR_LOG_LEVEL", "warn"),
            ("OBJR_LOG_FORMAT", "Pretty"),
            ("OBJR_LOG_ASYNC", "true"),
            ("OBJR_LOG_FILTER", "objroute::binding=debug, ,objroute::pool=trace"),
        ]);
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.non_blocking);
        assert_eq!(
            config.directives,
            vec!["objroute::binding=debug", "objroute::pool=trace"]
        );
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_map(&[("OBJR_LOG_LEVEL", "loud"), ("OBJR_LOG_ASYNC", "maybe")]);
        assert_eq!(config, LogConfig::default());
    }
}
