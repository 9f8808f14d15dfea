//! # fractal-settings
//!
//! Configuration management with layered sources for the Fractal engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`FractalSettings::default()`]
//! 2. **User file** — `~/.fractal/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `FRACTAL_*` overrides (highest priority)
//!
//! The interesting part is the agent role table: each agent role
//! (reasoner, summarizer, merge-arbiter, graph-builder, explorer) maps to a
//! model name on one of two inference devices. Roles left unbound are
//! unavailable — the runtime decides whether a fallback role applies.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::{Arc, RwLock};

/// Global settings singleton.
///
/// `RwLock<Option<Arc<FractalSettings>>>` so reads are cheap (shared lock +
/// `Arc::clone`) and tests can inject their own values via [`init_settings`].
static SETTINGS: RwLock<Option<Arc<FractalSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.fractal/settings.json` with env var
/// overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
pub fn get_settings() -> Arc<FractalSettings> {
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    // Another thread may have initialized between the locks.
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            FractalSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings. Useful for tests and server
/// startup where the settings path is known.
pub fn init_settings(settings: FractalSettings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_replaces_cached_value() {
        let mut custom = FractalSettings::default();
        custom.server.port = 9999;
        init_settings(custom);
        assert_eq!(get_settings().server.port, 9999);

        init_settings(FractalSettings::default());
        assert_eq!(get_settings().server.port, 8400);
    }
}
