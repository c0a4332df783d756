//! logging
//!
//! Tracing subscriber setup.
//!
//! Logs go to stderr. `RUST_LOG` takes precedence; otherwise the level is
//! `info` for this crate and `warn` for dependencies, or `debug` for both
//! with `--debug`. `--log-json` switches to one JSON object per line.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub debug: bool,
    pub json: bool,
}

/// Default filter directives when `RUST_LOG` is unset.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "debug,hyper=info,h2=info"
    } else {
        "warn,postbridge=info,tower_http=info"
    }
}

/// Build the filter from `RUST_LOG`, falling back to the defaults.
pub fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

/// Install the global subscriber.
///
/// Installing twice (e.g. from tests) is not an error; the first one wins.
pub fn init(options: LogOptions) {
    let filter = env_filter(options.debug);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if options.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(?options, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_default_level() {
        assert!(default_directives(true).starts_with("debug"));
        assert!(default_directives(false).contains("postbridge=info"));
    }

    #[test]
    fn default_directives_parse() {
        for debug in [false, true] {
            for directive in default_directives(debug).split(',') {
                assert!(
                    directive.parse::<tracing_subscriber::filter::Directive>().is_ok(),
                    "{directive}"
                );
            }
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogOptions::default());
        init(LogOptions {
            debug: true,
            json: true,
        });
    }
}
