//! Host document collaborator.
//!
//! The resolver never touches a global document. Everything it needs
//! (readiness, the raw cookie string, script injection, the one-shot
//! "content loaded" signal) goes through [`Document`].

use crate::error::DocumentError;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Properties applied to an injected `<script>` element, e.g.
/// `{"id": "tracker", "async": true}`.
pub type ScriptAttributes = serde_json::Map<String, Value>;

/// Description of a `<script>` element to append to `<body>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptElement {
    pub src: String,
    pub attributes: ScriptAttributes,
}

impl ScriptElement {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            attributes: ScriptAttributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: ScriptAttributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The source the element ends up loading. Attributes are applied
    /// after `src`, so a string `src` attribute wins.
    pub fn effective_src(&self) -> &str {
        self.attribute("src")
            .and_then(Value::as_str)
            .unwrap_or(&self.src)
    }
}

pub trait Document {
    /// Whether the document is still parsing its initial content.
    fn is_loading(&self) -> bool;

    /// Raw cookie string, `name=value` pairs separated by `;`.
    fn cookie(&self) -> String;

    /// Create a `<script>` with `src` and `attributes` set as element
    /// properties, and append it to `<body>`.
    fn append_script(&self, script: &ScriptElement) -> Result<(), DocumentError>;

    /// Run `callback` once when the initial content has loaded.
    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>);
}

/// In-process document for tests and hosts without a DOM.
pub struct MemoryDocument {
    loading: Cell<bool>,
    has_body: Cell<bool>,
    cookie: RefCell<String>,
    scripts: RefCell<Vec<ScriptElement>>,
    loaded_listeners: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A fully loaded document with a body and no cookies.
    pub fn new() -> Self {
        Self {
            loading: Cell::new(false),
            has_body: Cell::new(true),
            cookie: RefCell::new(String::new()),
            scripts: RefCell::new(Vec::new()),
            loaded_listeners: RefCell::new(Vec::new()),
        }
    }

    /// A document still parsing its initial content.
    pub fn loading() -> Self {
        let document = Self::new();
        document.loading.set(true);
        document
    }

    pub fn with_raw_cookie(self, raw: impl Into<String>) -> Self {
        *self.cookie.borrow_mut() = raw.into();
        self
    }

    pub fn without_body(self) -> Self {
        self.has_body.set(false);
        self
    }

    /// Set or overwrite one cookie, like assigning `document.cookie`.
    pub fn set_cookie(&self, name: &str, value: &str) {
        let mut pairs = self.other_cookies(name);
        pairs.push(format!("{name}={value}"));
        *self.cookie.borrow_mut() = pairs.join("; ");
    }

    pub fn remove_cookie(&self, name: &str) {
        let pairs = self.other_cookies(name);
        *self.cookie.borrow_mut() = pairs.join("; ");
    }

    fn other_cookies(&self, name: &str) -> Vec<String> {
        self.cookie
            .borrow()
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .filter(|pair| pair.split('=').next().map(str::trim) != Some(name))
            .map(str::to_string)
            .collect()
    }

    /// Finish loading and notify subscribers, each exactly once.
    pub fn finish_loading(&self) {
        self.loading.set(false);
        let listeners = std::mem::take(&mut *self.loaded_listeners.borrow_mut());
        for listener in listeners {
            listener();
        }
    }

    pub fn scripts(&self) -> Vec<ScriptElement> {
        self.scripts.borrow().clone()
    }

    pub fn script_sources(&self) -> Vec<String> {
        self.scripts
            .borrow()
            .iter()
            .map(|script| script.src.clone())
            .collect()
    }

    pub fn pending_listeners(&self) -> usize {
        self.loaded_listeners.borrow().len()
    }
}

impl Document for MemoryDocument {
    fn is_loading(&self) -> bool {
        self.loading.get()
    }

    fn cookie(&self) -> String {
        self.cookie.borrow().clone()
    }

    fn append_script(&self, script: &ScriptElement) -> Result<(), DocumentError> {
        if !self.has_body.get() {
            return Err(DocumentError::NoBody);
        }
        let mut appended = script.clone();
        appended.src = script.effective_src().to_string();
        self.scripts.borrow_mut().push(appended);
        Ok(())
    }

    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>) {
        self.loaded_listeners.borrow_mut().push(callback);
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("loading", &self.loading.get())
            .field("has_body", &self.has_body.get())
            .field("cookie", &self.cookie.borrow())
            .field("scripts", &self.scripts.borrow().len())
            .field("loaded_listeners", &self.loaded_listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_set_cookie_overwrites_existing_value() {
        let document = MemoryDocument::new().with_raw_cookie("theme=dark");
        document.set_cookie("cc-settings", "1");
        document.set_cookie("cc-settings", "2");
        assert_eq!(document.cookie(), "theme=dark; cc-settings=2");
    }

    #[test]
    fn test_remove_cookie() {
        let document = MemoryDocument::new().with_raw_cookie("a=1; cc-settings=2; b=3");
        document.remove_cookie("cc-settings");
        assert_eq!(document.cookie(), "a=1; b=3");
    }

    #[test]
    fn test_append_script_records_element() {
        let document = MemoryDocument::new();
        let script = ScriptElement::new("https://example.com/a.js").with_attribute("async", true);
        document.append_script(&script).unwrap();

        assert_eq!(document.script_sources(), vec!["https://example.com/a.js"]);
        assert_eq!(document.scripts()[0].attribute("async"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_src_attribute_overrides_url() {
        let document = MemoryDocument::new();
        let script = ScriptElement::new("https://example.com/a.js")
            .with_attribute("src", "https://cdn.example.com/a.js")
            .with_attribute("id", "tracker");
        document.append_script(&script).unwrap();

        assert_eq!(document.script_sources(), vec!["https://cdn.example.com/a.js"]);
        assert_eq!(document.scripts()[0].attribute("id"), Some(&Value::from("tracker")));
    }

    #[test]
    fn test_non_string_src_attribute_is_ignored() {
        let script = ScriptElement::new("a.js").with_attribute("src", 5);
        assert_eq!(script.effective_src(), "a.js");
    }

    #[test]
    fn test_append_script_without_body_fails() {
        let document = MemoryDocument::new().without_body();
        let result = document.append_script(&ScriptElement::new("x.js"));
        assert_eq!(result, Err(DocumentError::NoBody));
        assert!(document.scripts().is_empty());
    }

    #[test]
    fn test_finish_loading_notifies_listeners_once() {
        let document = MemoryDocument::loading();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        document.on_content_loaded(Box::new(move || counter.set(counter.get() + 1)));

        assert!(document.is_loading());
        document.finish_loading();
        document.finish_loading();

        assert!(!document.is_loading());
        assert_eq!(calls.get(), 1);
        assert_eq!(document.pending_listeners(), 0);
    }
}
