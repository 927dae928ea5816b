//! Generation tokens for discarding superseded work

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one document load.
///
/// Every request sent to the workers carries the generation that was
/// current when it was issued. A result whose generation no longer matches
/// belongs to a superseded document and must not touch any surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// The generation the owning session currently displays, shared with workers
#[derive(Clone, Debug, Default)]
pub struct LiveGeneration(Arc<AtomicU64>);

impl LiveGeneration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, generation: Generation) {
        self.0.store(generation.0, Ordering::Release);
    }

    #[must_use]
    pub fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    /// Capture a token for work launched on behalf of `generation`
    #[must_use]
    pub fn token(&self, generation: Generation) -> CancelToken {
        CancelToken {
            live: self.clone(),
            generation,
        }
    }
}

/// Checked by workers at every resumption point.
///
/// Advisory only: the session re-checks the generation before committing,
/// so a token that races a cancellation can at worst waste one render.
#[derive(Clone, Debug)]
pub struct CancelToken {
    live: LiveGeneration,
    generation: Generation,
}

impl CancelToken {
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.live.current() != self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_cancelled_once_a_newer_generation_is_published() {
        let live = LiveGeneration::new();
        let first = Generation(1);
        live.publish(first);
        let token = live.token(first);
        assert!(!token.is_cancelled());

        live.publish(first.next());
        assert!(token.is_cancelled());
    }
}
