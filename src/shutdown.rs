//! Interrupt handling

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

/// Exit code used when a second interrupt forces the process down
const FORCED_EXIT_CODE: i32 = 130;

/// Shared flag set when the operator asks the run to stop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Route Ctrl-C and SIGTERM to this flag.
    ///
    /// The first signal lets the in-flight contact finish; a second one
    /// exits immediately. Can only be installed once per process.
    pub fn install_handler(&self) -> Result<(), ctrlc::Error> {
        let requested = Arc::clone(&self.requested);
        ctrlc::set_handler(move || {
            if requested.swap(true, Ordering::SeqCst) {
                std::process::exit(FORCED_EXIT_CODE);
            }
            warn!("Interrupt received, stopping after the current contact");
        })
    }
}
