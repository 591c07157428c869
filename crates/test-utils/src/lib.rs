pub mod builders;
pub mod fake_executor;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{Project, ProjectBuilder};
pub use fake_executor::{FakeExecutor, executed_names};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). Levels come from `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
