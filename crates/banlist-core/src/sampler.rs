//! Deterministic modulo sampling.

use std::sync::atomic::{AtomicU64, Ordering};

/// Returns `true` on exactly every Nth call.
///
/// The guarantee is on the number of calls, not on which thread makes the
/// Nth one: after `k` calls from any number of threads, exactly `k / modulo`
/// of them have returned `true`.
#[derive(Debug)]
pub struct ModuloSampler {
    counter: AtomicU64,
    modulo: u64,
}

impl ModuloSampler {
    /// Create a sampler that fires on every `modulo`-th call.
    ///
    /// A modulo of zero is treated as one, so every call samples.
    #[must_use]
    pub fn new(modulo: u64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            modulo: modulo.max(1),
        }
    }

    /// Count this call and report whether it is a multiple of the modulo.
    pub fn sample(&self) -> bool {
        let value = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        value % self.modulo == 0
    }

    /// The effective modulo.
    #[must_use]
    pub fn modulo(&self) -> u64 {
        self.modulo
    }
}

impl Default for ModuloSampler {
    fn default() -> Self {
        Self::new(1)
    }
}
