//! Shared fixtures for resolver integration tests.

#![allow(dead_code)]

use cookie_consent_resolver::MemoryDocument;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

pub const COOKIE_NAME: &str = "cc-settings";

/// Store `{"categories": [...]}` under the consent cookie, the way a
/// consent banner would.
pub fn set_consent_cookie(document: &MemoryDocument, categories: &[&str]) {
    let value = json!({ "categories": categories }).to_string();
    document.set_cookie(COOKIE_NAME, &value);
}

/// Ordered record of which callbacks ran.
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<String>>>);

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback appending `label` when invoked.
    pub fn push(&self, label: &str) -> impl FnOnce() + 'static {
        let log = Rc::clone(&self.0);
        let label = label.to_string();
        move || log.borrow_mut().push(label)
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
