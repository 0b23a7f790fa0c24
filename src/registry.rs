//! Callback registry and the sweep algorithm.
//!
//! A sweep runs in two steps:
//!
//! ```text
//! collect_due(granted)            SweepBatch::run()
//!   registration order              registration order
//!   pending + satisfied  ──────►    mark fired, invoke, isolate Err
//!   claim, take action              build SweepReport
//! ```
//!
//! Splitting collection from invocation lets a shared owner release its
//! borrow before user actions run, so actions may call back into the
//! resolver. A claimed registration is never collected again, so an action
//! can never be picked up twice even if it re-enters. Claims that were not
//! run (a batch dropped unrun, or an earlier action panicking) go back to
//! pending with their action and fire on the next sweep.

use crate::category::{CategorySet, RequiredCategories};
use crate::error::ActionError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// A gated action. `FnOnce` enforces single invocation.
pub type Action = Box<dyn FnOnce() -> Result<(), ActionError>>;

/// Position of a registration in its registry (registration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(usize);

impl RegistrationId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Pending,
    /// Taken by a batch that has not reached it yet.
    Claimed,
    Fired,
}

struct ActionSlot {
    progress: Progress,
    action: Option<Action>,
}

/// Shared between the registry and any in-flight batch.
type SharedSlot = Rc<RefCell<ActionSlot>>;

/// One pending or fired pairing of requirements and an action.
pub struct CallbackRegistration {
    required: RequiredCategories,
    slot: SharedSlot,
}

impl CallbackRegistration {
    pub fn required(&self) -> &RequiredCategories {
        &self.required
    }

    /// True once the action has been invoked. Stays true.
    pub fn is_fired(&self) -> bool {
        self.progress() == Progress::Fired
    }

    fn progress(&self) -> Progress {
        self.slot.borrow().progress
    }
}

impl fmt::Debug for CallbackRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistration")
            .field("required", &self.required)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

/// Append-only, ordered list of registrations.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    registrations: Vec<CallbackRegistration>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unfired registration. Sweeping is the owner's job.
    pub fn append(&mut self, required: RequiredCategories, action: Action) -> RegistrationId {
        let id = RegistrationId(self.registrations.len());
        debug!(registration = %id, required = %required, "consent callback registered");
        self.registrations.push(CallbackRegistration {
            required,
            slot: Rc::new(RefCell::new(ActionSlot {
                progress: Progress::Pending,
                action: Some(action),
            })),
        });
        id
    }

    /// Claim every pending, satisfied registration and hand back their
    /// actions in registration order.
    pub fn collect_due(&mut self, granted: &CategorySet) -> SweepBatch {
        let due: Vec<DueAction> = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, registration)| {
                registration.progress() == Progress::Pending
                    && granted.includes_all(&registration.required)
            })
            .filter_map(|(index, registration)| {
                let mut slot = registration.slot.borrow_mut();
                let action = slot.action.take()?;
                slot.progress = Progress::Claimed;
                Some(DueAction {
                    registration: RegistrationId(index),
                    action,
                    slot: Rc::clone(&registration.slot),
                })
            })
            .collect();

        SweepBatch {
            status: SweepStatus::Completed,
            due,
        }
    }

    /// Collect and run in one go.
    pub fn sweep(&mut self, granted: &CategorySet) -> SweepReport {
        self.collect_due(granted).run()
    }

    pub fn get(&self, id: RegistrationId) -> Option<&CallbackRegistration> {
        self.registrations.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallbackRegistration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations neither fired nor claimed by an in-flight batch.
    pub fn pending_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.progress() == Progress::Pending)
            .count()
    }
}

/// A claimed registration waiting in a batch.
struct DueAction {
    registration: RegistrationId,
    action: Action,
    slot: SharedSlot,
}

impl DueAction {
    /// Undo the claim: the action goes back to its registration.
    fn release(self) {
        let DueAction { action, slot, .. } = self;
        let mut slot = slot.borrow_mut();
        slot.progress = Progress::Pending;
        slot.action = Some(action);
    }
}

/// Releases whatever a run did not reach, including when an action panics.
struct Unrun(std::vec::IntoIter<DueAction>);

impl Drop for Unrun {
    fn drop(&mut self) {
        let released = self.0.len();
        for due in self.0.by_ref() {
            due.release();
        }
        if released > 0 {
            warn!(released, "consent sweep interrupted, unrun callbacks returned to pending");
        }
    }
}

/// Why a sweep did or did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepStatus {
    /// The mutation did not change anything that warrants a sweep.
    #[default]
    Unchanged,
    /// A sweep was requested while the document is still loading.
    Deferred,
    /// The registry was swept.
    Completed,
}

/// Actions taken out of the registry by one sweep, not yet invoked.
#[must_use = "a sweep batch does nothing until it is run"]
pub struct SweepBatch {
    status: SweepStatus,
    due: Vec<DueAction>,
}

impl SweepBatch {
    pub(crate) fn unchanged() -> Self {
        Self {
            status: SweepStatus::Unchanged,
            due: Vec::new(),
        }
    }

    pub(crate) fn deferred() -> Self {
        Self {
            status: SweepStatus::Deferred,
            due: Vec::new(),
        }
    }

    pub fn status(&self) -> SweepStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }

    /// Invoke every collected action in registration order.
    ///
    /// An `Err` from one action is logged and recorded; later actions
    /// still run. Panics are not caught: the panicking registration stays
    /// fired and the ones after it go back to pending.
    pub fn run(mut self) -> SweepReport {
        let mut report = SweepReport {
            status: self.status,
            ..SweepReport::default()
        };

        let mut unrun = Unrun(std::mem::take(&mut self.due).into_iter());
        while let Some(DueAction {
            registration,
            action,
            slot,
        }) = unrun.0.next()
        {
            slot.borrow_mut().progress = Progress::Fired;
            match action() {
                Ok(()) => report.fired.push(registration),
                Err(error) => {
                    warn!(registration = %registration, %error, "consent callback failed");
                    report.failures.push(ActionFailure {
                        registration,
                        error,
                    });
                }
            }
        }

        if report.status == SweepStatus::Completed {
            debug!(
                fired = report.fired.len(),
                failed = report.failures.len(),
                "consent sweep completed"
            );
        }
        report
    }
}

impl fmt::Debug for SweepBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepBatch")
            .field("status", &self.status)
            .field(
                "due",
                &self.due.iter().map(|due| due.registration).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Drop for SweepBatch {
    fn drop(&mut self) {
        for due in self.due.drain(..) {
            due.release();
        }
    }
}

/// A registration whose action returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub registration: RegistrationId,
    pub error: ActionError,
}

/// What a single mutation caused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub status: SweepStatus,
    /// Registrations whose action completed, in invocation order.
    pub fired: Vec<RegistrationId>,
    /// Registrations whose action returned an error. They stay fired.
    pub failures: Vec<ActionFailure>,
}

impl SweepReport {
    /// Number of actions invoked, successful or not.
    pub fn invoked(&self) -> usize {
        self.fired.len() + self.failures.len()
    }

    pub fn is_deferred(&self) -> bool {
        self.status == SweepStatus::Deferred
    }
}
