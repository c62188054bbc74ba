//! Tracing subscriber setup

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::Environment;

/// Initialize tracing for the given environment
///
/// - **Production**: JSON lines, `warn` unless `RUST_LOG` says otherwise
/// - **Development/Test**: pretty output, `info,sea_orm=warn` by default
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info,sea_orm=warn")
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => tracing::info!(?environment, "tracing initialized"),
        Err(_) => tracing::debug!("tracing already initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(&Environment::Test);
        // second subscriber is rejected quietly
        init_tracing(&Environment::Production);
    }
}
