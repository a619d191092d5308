use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag raised when the user asks the run to stop.
///
/// Raising the flag never interrupts a git command in flight; the orchestrator
/// only looks at it between steps.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// A lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next safe point.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let handle = interrupt.clone();
        assert!(!interrupt.is_raised());
        handle.raise();
        assert!(interrupt.is_raised());
    }
}
