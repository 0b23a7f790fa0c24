//! Document readiness gate.
//!
//! `Loading -> Ready` happens once. While loading, sweep requests are
//! dropped rather than queued; the transition itself performs the single
//! catch-up sweep.

use crate::registry::SweepBatch;
use crate::state::ConsentState;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct ReadinessGate {
    state: Readiness,
}

impl ReadinessGate {
    pub fn new(loading: bool) -> Self {
        Self {
            state: if loading {
                Readiness::Loading
            } else {
                Readiness::Ready
            },
        }
    }

    pub fn loading() -> Self {
        Self::new(true)
    }

    pub fn ready() -> Self {
        Self::new(false)
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == Readiness::Ready
    }

    /// Sweep now if ready; otherwise report the request as deferred.
    pub fn request_sweep(&self, state: &mut ConsentState) -> SweepBatch {
        match self.state {
            Readiness::Ready => state.collect_due(),
            Readiness::Loading => {
                debug!("consent sweep deferred until document is loaded");
                SweepBatch::deferred()
            }
        }
    }

    /// Handle the document's load-completion signal.
    ///
    /// The first call flips the gate and sweeps; later calls are no-ops.
    pub fn mark_ready(&mut self, state: &mut ConsentState) -> SweepBatch {
        if self.is_ready() {
            return SweepBatch::unchanged();
        }
        self.state = Readiness::Ready;
        debug!(
            pending = state.registry().pending_count(),
            "document loaded, running catch-up consent sweep"
        );
        state.collect_due()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategorySet;
    use crate::registry::SweepStatus;

    fn noop() -> crate::registry::Action {
        Box::new(|| Ok(()))
    }

    #[test]
    fn test_initial_state_follows_loading_flag() {
        assert_eq!(ReadinessGate::new(true).state(), Readiness::Loading);
        assert_eq!(ReadinessGate::new(false).state(), Readiness::Ready);
    }

    #[test]
    fn test_requests_while_loading_are_deferred() {
        let gate = ReadinessGate::loading();
        let mut state = ConsentState::new(CategorySet::new(["a"]));
        let (_, registered) = state.register("a", noop(), &gate);
        assert_eq!(registered.status(), SweepStatus::Deferred);

        let batch = gate.request_sweep(&mut state);
        assert_eq!(batch.status(), SweepStatus::Deferred);
        assert!(batch.is_empty());
        assert_eq!(state.registry().pending_count(), 1);
    }

    #[test]
    fn test_mark_ready_sweeps_once() {
        let mut gate = ReadinessGate::loading();
        let mut state = ConsentState::new(CategorySet::new(["a"]));
        let _ = state.register("a", noop(), &gate);
        assert_eq!(state.registry().pending_count(), 1);

        let first = gate.mark_ready(&mut state).run();
        assert_eq!(first.status, SweepStatus::Completed);
        assert_eq!(first.fired.len(), 1);
        assert!(gate.is_ready());

        let second = gate.mark_ready(&mut state).run();
        assert_eq!(second.status, SweepStatus::Unchanged);
    }

    #[test]
    fn test_ready_gate_sweeps_immediately() {
        let gate = ReadinessGate::ready();
        let mut state = ConsentState::new(CategorySet::default());
        let (_, batch) = state.register(Vec::<String>::new(), noop(), &gate);

        let report = batch.run();
        assert_eq!(report.fired.len(), 1);
    }
}
