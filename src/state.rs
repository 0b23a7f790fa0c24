//! Consent state: the granted set plus the callback registry.
//!
//! Every mutation asks the readiness gate for a sweep. Category updates
//! only ask when membership actually changed.

use crate::category::{CategorySet, RequiredCategories};
use crate::readiness::ReadinessGate;
use crate::registry::{Action, CallbackRegistry, RegistrationId, SweepBatch};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConsentState {
    categories: CategorySet,
    registry: CallbackRegistry,
}

impl ConsentState {
    pub fn new(categories: CategorySet) -> Self {
        Self {
            categories,
            registry: CallbackRegistry::new(),
        }
    }

    /// Granted categories, in the order last supplied.
    pub fn categories(&self) -> &[String] {
        self.categories.as_slice()
    }

    pub fn granted(&self) -> &CategorySet {
        &self.categories
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Replace the granted set; sweep through `gate` only on change.
    pub fn set_categories<I, S>(&mut self, categories: I, gate: &ReadinessGate) -> SweepBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.categories.replace(categories) {
            debug!("granted categories unchanged, skipping sweep");
            return SweepBatch::unchanged();
        }
        debug!(granted = ?self.categories.as_slice(), "granted categories replaced");
        gate.request_sweep(self)
    }

    /// Untyped variant of [`set_categories`](Self::set_categories).
    /// Non-array input leaves the state untouched.
    pub fn set_categories_value(&mut self, value: &Value, gate: &ReadinessGate) -> SweepBatch {
        if !self.categories.replace_value(value) {
            return SweepBatch::unchanged();
        }
        debug!(granted = ?self.categories.as_slice(), "granted categories replaced");
        gate.request_sweep(self)
    }

    /// Append a registration and immediately try to fire it.
    pub fn register(
        &mut self,
        required: impl Into<RequiredCategories>,
        action: Action,
        gate: &ReadinessGate,
    ) -> (RegistrationId, SweepBatch) {
        let id = self.registry.append(required.into(), action);
        (id, gate.request_sweep(self))
    }

    pub(crate) fn collect_due(&mut self) -> SweepBatch {
        self.registry.collect_due(&self.categories)
    }
}
