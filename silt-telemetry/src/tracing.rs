use std::sync::Once;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

static TEST_TRACING: Once = Once::new();

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to install the global tracing subscriber")]
    SetGlobalDefault(#[source] tracing::subscriber::SetGlobalDefaultError),
}

/// Initializes tracing for a service binary.
///
/// The filter comes from `RUST_LOG`, defaulting to `info` for the service
/// itself. Must be called once, before any spans are created.
pub fn init_tracing(service_name: &str) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(TracingError::SetGlobalDefault)?;

    Ok(())
}

/// Initializes tracing for tests.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
