use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Installs the global subscriber once; later calls are no-ops.
///
/// The filter comes from `SOCIAL_LOG` (e.g. `social_plus=debug`).
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_new(crate::config::log_filter())
            .unwrap_or_else(|_| EnvFilter::new("social_plus=info"));

        // Spin forwards stderr to the component log
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init();
    });
}
