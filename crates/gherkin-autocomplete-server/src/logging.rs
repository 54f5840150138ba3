//! Tracing setup for the language server.
//!
//! stdout carries JSON-RPC, so every log line goes to stderr. The configured
//! level applies to this workspace's crates; the protocol plumbing stays at
//! `warn` unless the level asks for something quieter.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LogLevel, ServerConfig};

/// Crates whose output follows the configured level.
const OWN_TARGETS: [&str; 2] = ["gherkin_autocomplete_server", "gherkin_autocomplete_lsp"];

/// Protocol and service plumbing that only reports problems.
const QUIET_TARGETS: [&str; 2] = ["async_lsp", "tower"];

fn filter_directives(level: LogLevel) -> String {
    let own = level.as_filter_str();
    let quiet = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    let mut directives = vec![quiet.to_owned()];
    directives.extend(OWN_TARGETS.iter().map(|target| format!("{target}={own}")));
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}={quiet}")));
    directives.join(",")
}

fn filter_from_config(config: &ServerConfig) -> EnvFilter {
    EnvFilter::new(filter_directives(config.log_level))
}

/// Install the global stderr subscriber.
///
/// Level precedence is CLI `--log-level`, then
/// `GHERKIN_AUTOCOMPLETE_LSP_LOG_LEVEL`, then the default; all three are
/// already folded into `config.log_level`. Span close events are logged so
/// index builds report their duration.
///
/// A second call keeps the first subscriber.
pub fn init_logging(config: &ServerConfig) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_from_config(config))
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    // Tests and embedders may have installed one already.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn init_logging_is_idempotent() {
        let config = ServerConfig::default();
        init_logging(&config);
        init_logging(&config);
    }

    #[rstest]
    #[case(LogLevel::Debug, "gherkin_autocomplete_server=debug", "async_lsp=warn")]
    #[case(LogLevel::Trace, "gherkin_autocomplete_lsp=trace", "tower=warn")]
    #[case(LogLevel::Error, "gherkin_autocomplete_server=error", "async_lsp=error")]
    fn own_crates_follow_the_level_and_plumbing_stays_quiet(
        #[case] level: LogLevel,
        #[case] own: &str,
        #[case] plumbing: &str,
    ) {
        let directives = filter_directives(level);
        let parts: Vec<&str> = directives.split(',').collect();
        assert!(parts.contains(&own), "{directives}");
        assert!(parts.contains(&plumbing), "{directives}");
    }

    #[test]
    fn filter_builds_from_config() {
        let config = ServerConfig::default().with_log_level(LogLevel::Debug);
        let filter = filter_from_config(&config);
        assert!(filter.to_string().contains("gherkin_autocomplete_server=debug"));
    }
}
