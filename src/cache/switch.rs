//! Process-wide caching switch
//!
//! Caching is enabled by default. Disabling it turns every `load` into a
//! passthrough that returns the original locator. The state is not persisted.
//!
//! Managers hold a [`CachingSwitch`] handle; [`CachingSwitch::global`] is the
//! process-wide one that [`set_caching_enabled`] toggles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static GLOBAL: LazyLock<CachingSwitch> = LazyLock::new(CachingSwitch::new);

/// Shared enable/disable flag read at the start of every load
#[derive(Debug, Clone)]
pub struct CachingSwitch {
    enabled: Arc<AtomicBool>,
}

impl CachingSwitch {
    /// Create an independent switch (enabled)
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle to the process-wide switch
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Whether caching is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable caching for every holder of this switch
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for CachingSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Enable or disable caching process-wide
pub fn set_caching_enabled(enabled: bool) {
    debug!("Caching {}", if enabled { "enabled" } else { "disabled" });
    GLOBAL.set_enabled(enabled);
}

/// Whether caching is enabled process-wide
pub fn caching_enabled() -> bool {
    GLOBAL.is_enabled()
}
