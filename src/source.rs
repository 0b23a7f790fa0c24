//! External consent sources (consent banners and their event emitters).
//!
//! A source publishes decisions as an object mapping category to a
//! decision string. Only the literal `"granted"` counts.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Category → decision, e.g. `{"analytics": "granted", "ads": "denied"}`.
pub type ConsentDecisions = serde_json::Map<String, Value>;

pub type ConsentHandler = Box<dyn FnMut(&ConsentDecisions)>;

pub const GRANTED: &str = "granted";

/// Categories whose decision is exactly `"granted"`.
pub fn granted_categories(decisions: &ConsentDecisions) -> Vec<String> {
    decisions
        .iter()
        .filter(|(_, decision)| decision.as_str() == Some(GRANTED))
        .map(|(category, _)| category.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentEvent {
    /// The visitor's first decision on the banner.
    FirstAction,
    /// Any later change of decisions.
    Changed,
}

impl ConsentEvent {
    pub const ALL: [ConsentEvent; 2] = [ConsentEvent::FirstAction, ConsentEvent::Changed];

    /// Default wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentEvent::FirstAction => "consent:first-action",
            ConsentEvent::Changed => "consent:changed",
        }
    }
}

impl fmt::Display for ConsentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ConsentSource {
    fn on(&self, event: ConsentEvent, handler: ConsentHandler);
}

/// In-process event emitter.
#[derive(Default)]
pub struct MemoryConsentSource {
    handlers: RefCell<HashMap<ConsentEvent, Vec<ConsentHandler>>>,
}

impl MemoryConsentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self, event: ConsentEvent) -> usize {
        self.handlers.borrow().get(&event).map_or(0, Vec::len)
    }

    /// Deliver `decisions` to every handler of `event`, in subscription
    /// order. Handlers may subscribe further handlers while running.
    pub fn emit(&self, event: ConsentEvent, decisions: &ConsentDecisions) {
        let mut active = self.handlers.borrow_mut().remove(&event).unwrap_or_default();
        for handler in active.iter_mut() {
            handler(decisions);
        }

        let mut handlers = self.handlers.borrow_mut();
        let added = handlers.entry(event).or_default();
        active.append(added);
        *added = active;
    }
}

impl ConsentSource for MemoryConsentSource {
    fn on(&self, event: ConsentEvent, handler: ConsentHandler) {
        self.handlers
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(handler);
    }
}

impl fmt::Debug for MemoryConsentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        f.debug_struct("MemoryConsentSource")
            .field(
                "first_action",
                &handlers.get(&ConsentEvent::FirstAction).map_or(0, Vec::len),
            )
            .field("changed", &handlers.get(&ConsentEvent::Changed).map_or(0, Vec::len))
            .finish()
    }
}
