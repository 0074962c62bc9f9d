use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

/// Installs the fmt subscriber once per process.
///
/// `RUST_LOG` wins over the built-in filter. A subscriber installed earlier by
/// the embedding application is left in place.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                EnvFilter::new("warn,playerlink=debug,playerlink_runtime=debug")
            } else {
                EnvFilter::new("info")
            }
        });
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTime::rfc_3339())
            .with_target(true)
            .with_thread_names(true)
            .with_thread_ids(true)
            .try_init();
    });
}
