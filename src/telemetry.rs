//! Log output setup.
//!
//! Logs go to stderr so rendered output on stdout stays clean. The filter
//! comes from `DESKCHAT_LOG`, then `RUST_LOG`, then the `-v` count.
//! `DESKCHAT_LOG_FORMAT=json` switches to one JSON object per event.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "DESKCHAT_LOG";
pub const LOG_FORMAT_ENV: &str = "DESKCHAT_LOG_FORMAT";

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: u8) {
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let (plain, json_layer) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter(verbosity))
        .with(plain)
        .with(json_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(7), "trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(2);
        tracing::info!("still alive");
    }
}
