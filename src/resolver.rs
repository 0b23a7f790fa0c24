//! Consent resolver façade.
//!
//! Owns one [`ConsentState`] and one [`ReadinessGate`] and routes every
//! mutation through the same sweep. All calls are synchronous: the sweep a
//! call triggers has finished when the call returns.
//!
//! For hosts that deliver events through callbacks (document load,
//! consent banners), wrap the resolver in a
//! [`SharedResolver`](crate::shared::SharedResolver).

use crate::category::{CategorySet, RequiredCategories};
use crate::config::ResolverConfig;
use crate::cookie::read_consent_categories;
use crate::document::{Document, ScriptAttributes, ScriptElement};
use crate::error::ActionError;
use crate::readiness::ReadinessGate;
use crate::registry::{Action, SweepBatch, SweepReport};
use crate::source::{granted_categories, ConsentDecisions};
use crate::state::ConsentState;
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, info};

pub struct ConsentResolver<D: Document> {
    document: Rc<D>,
    state: ConsentState,
    gate: ReadinessGate,
}

impl<D: Document + 'static> ConsentResolver<D> {
    /// Resolver with an initial granted set. Readiness is read from the
    /// document once, here.
    pub fn new<I, S>(categories: I, document: Rc<D>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gate = ReadinessGate::new(document.is_loading());
        Self {
            document,
            state: ConsentState::new(CategorySet::new(categories)),
            gate,
        }
    }

    /// Seed the granted set from a consent cookie. A missing or malformed
    /// cookie yields no granted categories.
    pub fn from_cookie(cookie_name: &str, document: Rc<D>) -> Self {
        let categories = read_consent_categories(&document.cookie(), cookie_name);
        info!(
            cookie = cookie_name,
            granted = ?categories,
            "consent resolver created from cookie"
        );
        Self::new(categories, document)
    }

    pub fn from_config(config: &ResolverConfig, document: Rc<D>) -> Self {
        Self::from_cookie(&config.cookie_name, document)
    }

    /// Currently granted categories.
    pub fn categories(&self) -> &[String] {
        self.state.categories()
    }

    pub fn state(&self) -> &ConsentState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn document(&self) -> &Rc<D> {
        &self.document
    }

    /// Run `action` once `categories` are all granted and the document
    /// is ready. Fires immediately if both already hold.
    pub fn resolve<F>(&mut self, categories: impl Into<RequiredCategories>, action: F) -> SweepReport
    where
        F: FnOnce() + 'static,
    {
        self.try_resolve(categories, move || {
            action();
            Ok(())
        })
    }

    /// Like [`resolve`](Self::resolve) for actions that can fail. A
    /// failure is logged and reported; it does not stop other actions.
    pub fn try_resolve<F>(
        &mut self,
        categories: impl Into<RequiredCategories>,
        action: F,
    ) -> SweepReport
    where
        F: FnOnce() -> Result<(), ActionError> + 'static,
    {
        self.stage_resolve(categories.into(), Box::new(action)).run()
    }

    /// Append `<script src=url>` with `attributes` to the body once
    /// `categories` are granted.
    pub fn inject_script(
        &mut self,
        categories: impl Into<RequiredCategories>,
        url: impl Into<String>,
        attributes: ScriptAttributes,
    ) -> SweepReport {
        self.stage_inject_script(categories.into(), url.into(), attributes)
            .run()
    }

    /// Replace the granted set. Sweeps only if membership changed.
    pub fn update_categories<I, S>(&mut self, categories: I) -> SweepReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stage_update(categories).run()
    }

    /// Replace the granted set from an untyped value; non-arrays are
    /// silently ignored.
    pub fn update_categories_value(&mut self, categories: &Value) -> SweepReport {
        self.stage_update_value(categories).run()
    }

    /// Apply a consent-source payload: granted entries become the new set.
    pub fn apply_consent(&mut self, decisions: &ConsentDecisions) -> SweepReport {
        self.update_categories(granted_categories(decisions))
    }

    /// Feed the document's "content loaded" signal into the gate.
    pub fn document_loaded(&mut self) -> SweepReport {
        self.stage_ready().run()
    }

    pub(crate) fn stage_resolve(&mut self, required: RequiredCategories, action: Action) -> SweepBatch {
        let (_, batch) = self.state.register(required, action, &self.gate);
        batch
    }

    pub(crate) fn stage_inject_script(
        &mut self,
        required: RequiredCategories,
        url: String,
        attributes: ScriptAttributes,
    ) -> SweepBatch {
        let script = ScriptElement::new(url).with_attributes(attributes);
        let document = Rc::clone(&self.document);
        debug!(src = %script.src, required = %required, "script injection registered");
        self.stage_resolve(
            required,
            Box::new(move || {
                document.append_script(&script)?;
                debug!(src = %script.src, "script injected");
                Ok(())
            }),
        )
    }

    pub(crate) fn stage_update<I, S>(&mut self, categories: I) -> SweepBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.set_categories(categories, &self.gate)
    }

    pub(crate) fn stage_update_value(&mut self, categories: &Value) -> SweepBatch {
        self.state.set_categories_value(categories, &self.gate)
    }

    pub(crate) fn stage_ready(&mut self) -> SweepBatch {
        self.gate.mark_ready(&mut self.state)
    }
}

impl<D: Document> std::fmt::Debug for ConsentResolver<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentResolver")
            .field("state", &self.state)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
