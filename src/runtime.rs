//! Process-wide initialisation and teardown.
//!
//! Connections are independent, but a few things are shared by the whole
//! process: the OS RNG health check and the default settings new
//! connections pick up. Both live behind a single mutex. [`init`] is
//! idempotent and [`teardown`] undoes it; connections created while the
//! runtime is not initialised fall back to [`Config::default`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::config::Config;
use crate::crypto::CryptoError;
use crate::error::Result;

struct RuntimeState {
    config: Config,
    initialized_at: Instant,
}

static RUNTIME: Mutex<Option<RuntimeState>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<RuntimeState>> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Initialise process-wide state.
///
/// Returns `Ok(true)` for the call that performed the initialisation and
/// `Ok(false)` if the runtime was already up (the new config is ignored).
pub fn init(config: &Config) -> Result<bool> {
    let mut guard = lock();
    if guard.is_some() {
        tracing::debug!("sealwire runtime already initialized");
        return Ok(false);
    }

    config.validate()?;
    check_rng()?;

    *guard = Some(RuntimeState {
        config: config.clone(),
        initialized_at: Instant::now(),
    });
    tracing::info!(
        encryption = config.connection.encryption,
        compression_level = config.compression.level,
        "sealwire runtime initialized"
    );
    Ok(true)
}

/// Release process-wide state. Returns `false` if nothing was initialised.
pub fn teardown() -> bool {
    match lock().take() {
        Some(state) => {
            tracing::info!(
                uptime_ms = state.initialized_at.elapsed().as_millis() as u64,
                "sealwire runtime torn down"
            );
            true
        },
        None => false,
    }
}

/// Whether [`init`] has run without a matching [`teardown`].
pub fn is_initialized() -> bool {
    lock().is_some()
}

/// Settings new connections should use.
pub fn config() -> Config {
    lock()
        .as_ref()
        .map(|state| state.config.clone())
        .unwrap_or_default()
}

fn check_rng() -> Result<()> {
    let mut probe = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut probe)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    if probe.iter().all(|&b| b == 0) {
        return Err(CryptoError::Rng("OS RNG returned all zeros".to_string()).into());
    }
    Ok(())
}
