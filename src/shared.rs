//! Shared resolver handle for callback-driven hosts.
//!
//! Document-load and consent-banner events arrive as callbacks, so the
//! resolver has to be reachable from closures. The handle keeps it in an
//! `Rc<RefCell<_>>`; each operation collects its sweep batch under the
//! borrow and runs the actions after releasing it, which lets actions
//! call back into the same handle.

use crate::category::RequiredCategories;
use crate::config::ResolverConfig;
use crate::document::{Document, ScriptAttributes};
use crate::error::ActionError;
use crate::registry::SweepReport;
use crate::resolver::ConsentResolver;
use crate::source::{granted_categories, ConsentDecisions, ConsentEvent, ConsentSource};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

pub struct SharedResolver<D: Document> {
    inner: Rc<RefCell<ConsentResolver<D>>>,
}

impl<D: Document> Clone for SharedResolver<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Document + 'static> SharedResolver<D> {
    /// Wrap `resolver` and, if its gate is still closed, subscribe to the
    /// content-loaded signal for the catch-up sweep. A document that has
    /// loaded in the meantime is caught up immediately.
    pub fn new(resolver: ConsentResolver<D>) -> Self {
        let shared = Self {
            inner: Rc::new(RefCell::new(resolver)),
        };
        shared.listen_for_ready();
        shared
    }

    pub fn from_cookie(cookie_name: &str, document: Rc<D>) -> Self {
        Self::new(ConsentResolver::from_cookie(cookie_name, document))
    }

    pub fn from_config(config: &ResolverConfig, document: Rc<D>) -> Self {
        Self::new(ConsentResolver::from_config(config, document))
    }

    fn listen_for_ready(&self) {
        let document = {
            let resolver = self.inner.borrow();
            if resolver.is_ready() {
                return;
            }
            Rc::clone(resolver.document())
        };
        // The signal fires once; if it already has, catch up now.
        if !document.is_loading() {
            debug!("document finished loading before the resolver was shared");
            self.document_loaded();
            return;
        }
        // Weak: the document is owned by the resolver.
        let weak: Weak<RefCell<ConsentResolver<D>>> = Rc::downgrade(&self.inner);
        document.on_content_loaded(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                let batch = inner.borrow_mut().stage_ready();
                batch.run();
            }
        }));
    }

    pub fn categories(&self) -> Vec<String> {
        self.inner.borrow().categories().to_vec()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.borrow().is_ready()
    }

    pub fn resolve<F>(&self, categories: impl Into<RequiredCategories>, action: F) -> SweepReport
    where
        F: FnOnce() + 'static,
    {
        self.try_resolve(categories, move || {
            action();
            Ok(())
        })
    }

    pub fn try_resolve<F>(&self, categories: impl Into<RequiredCategories>, action: F) -> SweepReport
    where
        F: FnOnce() -> Result<(), ActionError> + 'static,
    {
        let batch = self
            .inner
            .borrow_mut()
            .stage_resolve(categories.into(), Box::new(action));
        batch.run()
    }

    pub fn inject_script(
        &self,
        categories: impl Into<RequiredCategories>,
        url: impl Into<String>,
        attributes: ScriptAttributes,
    ) -> SweepReport {
        let batch = self
            .inner
            .borrow_mut()
            .stage_inject_script(categories.into(), url.into(), attributes);
        batch.run()
    }

    pub fn update_categories<I, S>(&self, categories: I) -> SweepReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batch = self.inner.borrow_mut().stage_update(categories);
        batch.run()
    }

    pub fn update_categories_value(&self, categories: &Value) -> SweepReport {
        let batch = self.inner.borrow_mut().stage_update_value(categories);
        batch.run()
    }

    pub fn apply_consent(&self, decisions: &ConsentDecisions) -> SweepReport {
        self.update_categories(granted_categories(decisions))
    }

    pub fn document_loaded(&self) -> SweepReport {
        let batch = self.inner.borrow_mut().stage_ready();
        batch.run()
    }

    /// Subscribe to both consent events of `source`. Each payload replaces
    /// the granted set with its `"granted"` entries.
    pub fn bind_external_consent_source<S>(&self, source: &S)
    where
        S: ConsentSource + ?Sized,
    {
        for event in ConsentEvent::ALL {
            let handle = self.clone();
            source.on(
                event,
                Box::new(move |decisions: &ConsentDecisions| {
                    let report = handle.apply_consent(decisions);
                    debug!(
                        event = %event,
                        status = ?report.status,
                        fired = report.fired.len(),
                        "consent source event applied"
                    );
                }),
            );
        }
    }
}
