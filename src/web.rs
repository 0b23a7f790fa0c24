//! Browser bindings (feature `web`).
//!
//! Connects the resolver to the real DOM and exports it to JavaScript:
//!
//! ```text
//! JS page ──► CookieConsentResolver (wasm_bindgen) ──► SharedResolver
//!                                                         │
//!     DOMContentLoaded ◄── BrowserDocument ◄──────────────┘
//!     consent wrapper  ──► JsConsentSource ──► apply_consent
//! ```
//!
//! ```js
//! const resolver = CookieConsentResolver.createFromCookie('cc-settings');
//! resolver.injectScript('analytics', 'https://example.com/a.js', { async: true });
//! resolver.bindCookieConsentWrapper(window.CookieConsentWrapper);
//! ```

use crate::category::RequiredCategories;
use crate::config::ResolverConfig;
use crate::document::{Document, ScriptAttributes, ScriptElement};
use crate::error::{ActionError, ConsentError, DocumentError};
use crate::shared::SharedResolver;
use crate::source::{ConsentDecisions, ConsentEvent, ConsentHandler, ConsentSource};
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// [`Document`] backed by `web_sys::Document`.
pub struct BrowserDocument {
    document: web_sys::Document,
}

impl BrowserDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The page's own document, if there is one.
    pub fn from_window() -> Result<Self, ConsentError> {
        let window = web_sys::window().ok_or(ConsentError::NoDocument)?;
        let document = window.document().ok_or(ConsentError::NoDocument)?;
        Ok(Self::new(document))
    }
}

impl Document for BrowserDocument {
    fn is_loading(&self) -> bool {
        is_loading_state(&self.document.ready_state())
    }

    fn cookie(&self) -> String {
        self.document
            .dyn_ref::<web_sys::HtmlDocument>()
            .and_then(|html| html.cookie().ok())
            .unwrap_or_default()
    }

    fn append_script(&self, script: &ScriptElement) -> Result<(), DocumentError> {
        let element = self
            .document
            .create_element("script")
            .map_err(|e| DocumentError::CreateElement(describe(&e)))?;

        set_property(&element, "src", &JsValue::from_str(&script.src))?;
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        for (name, value) in &script.attributes {
            let js_value = value
                .serialize(&serializer)
                .map_err(|e| DocumentError::SetProperty {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            set_property(&element, name, &js_value)?;
        }

        let body = self.document.body().ok_or(DocumentError::NoBody)?;
        body.append_child(&element)
            .map_err(|e| DocumentError::Append(describe(&e)))?;
        Ok(())
    }

    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>) {
        let listener = Closure::once_into_js(move || callback());
        if let Err(error) = self
            .document
            .add_event_listener_with_callback("DOMContentLoaded", listener.unchecked_ref())
        {
            warn!(error = %describe(&error), "failed to subscribe to DOMContentLoaded");
        }
    }
}

/// `document.readyState` is `"loading"`, `"interactive"` or `"complete"`.
fn is_loading_state(ready_state: &str) -> bool {
    ready_state == "loading"
}

/// Set a property (not an attribute) on `element`, like `script[name] = value`.
fn set_property(element: &web_sys::Element, name: &str, value: &JsValue) -> Result<(), DocumentError> {
    js_sys::Reflect::set(element, &JsValue::from_str(name), value)
        .map(|_| ())
        .map_err(|e| DocumentError::SetProperty {
            name: name.to_string(),
            reason: describe(&e),
        })
}

/// Any JS object exposing `on(eventName, handler)`.
struct JsConsentSource {
    target: JsValue,
    on: js_sys::Function,
    config: ResolverConfig,
}

impl JsConsentSource {
    fn new(target: JsValue, config: ResolverConfig) -> Result<Self, JsValue> {
        let on = js_sys::Reflect::get(&target, &JsValue::from_str("on"))?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| js_sys::TypeError::new("consent source has no on() method"))?;
        Ok(Self { target, on, config })
    }
}

impl ConsentSource for JsConsentSource {
    fn on(&self, event: ConsentEvent, mut handler: ConsentHandler) {
        let callback = Closure::wrap(Box::new(move |payload: JsValue| {
            match serde_wasm_bindgen::from_value::<ConsentDecisions>(payload) {
                Ok(decisions) => handler(&decisions),
                Err(error) => warn!(event = %event, %error, "ignoring malformed consent payload"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        let name = JsValue::from_str(self.config.event_name(event));
        if let Err(error) = self
            .on
            .call2(&self.target, &name, callback.as_ref().unchecked_ref())
        {
            warn!(event = %event, error = %describe(&error), "failed to bind consent source");
        }

        // The source keeps calling it for the page's lifetime.
        callback.forget();
    }
}

fn required_categories(categories: &JsValue) -> Result<RequiredCategories, JsValue> {
    let value: Value = serde_wasm_bindgen::from_value(categories.clone())?;
    RequiredCategories::from_value(&value).ok_or_else(|| {
        js_sys::TypeError::new("categories must be a string or an array of strings").into()
    })
}

fn js_action(callback: js_sys::Function) -> impl FnOnce() -> Result<(), ActionError> + 'static {
    move || {
        callback
            .call0(&JsValue::NULL)
            .map(|_| ())
            .map_err(|e| ActionError::new(describe(&e)))
    }
}

/// JavaScript-facing resolver.
#[wasm_bindgen(js_name = CookieConsentResolver)]
pub struct WebConsentResolver {
    shared: SharedResolver<BrowserDocument>,
    config: ResolverConfig,
}

#[wasm_bindgen(js_class = CookieConsentResolver)]
impl WebConsentResolver {
    /// `createFromCookie(cookieName?, config?)`.
    #[wasm_bindgen(js_name = createFromCookie)]
    pub fn create_from_cookie(
        cookie_name: Option<String>,
        config: JsValue,
    ) -> Result<WebConsentResolver, JsValue> {
        let mut config: ResolverConfig = if config.is_undefined() || config.is_null() {
            ResolverConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        if let Some(name) = cookie_name {
            config.cookie_name = name;
        }
        config
            .validate()
            .map_err(|e| JsValue::from(js_sys::Error::new(&e.to_string())))?;

        let document =
            BrowserDocument::from_window().map_err(|e| JsValue::from(js_sys::Error::new(&e.to_string())))?;
        let shared = SharedResolver::from_config(&config, Rc::new(document));
        Ok(Self { shared, config })
    }

    #[wasm_bindgen(getter)]
    pub fn categories(&self) -> js_sys::Array {
        self.shared
            .categories()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    pub fn resolve(&self, categories: JsValue, callback: js_sys::Function) -> Result<(), JsValue> {
        let required = required_categories(&categories)?;
        self.shared.try_resolve(required, js_action(callback));
        Ok(())
    }

    #[wasm_bindgen(js_name = injectScript)]
    pub fn inject_script(
        &self,
        categories: JsValue,
        url: String,
        attributes: JsValue,
    ) -> Result<(), JsValue> {
        let required = required_categories(&categories)?;
        let attributes: ScriptAttributes = if attributes.is_undefined() || attributes.is_null() {
            ScriptAttributes::new()
        } else {
            serde_wasm_bindgen::from_value(attributes)?
        };
        self.shared.inject_script(required, url, attributes);
        Ok(())
    }

    /// Non-array input is ignored.
    #[wasm_bindgen(js_name = updateCategories)]
    pub fn update_categories(&self, categories: JsValue) {
        let value: Value = serde_wasm_bindgen::from_value(categories).unwrap_or(Value::Null);
        self.shared.update_categories_value(&value);
    }

    #[wasm_bindgen(js_name = bindCookieConsentWrapper)]
    pub fn bind_cookie_consent_wrapper(&self, wrapper: JsValue) -> Result<(), JsValue> {
        let source = JsConsentSource::new(wrapper, self.config.clone())?;
        self.shared.bind_external_consent_source(&source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_loading_ready_state_holds_the_gate() {
        assert!(is_loading_state("loading"));
        assert!(!is_loading_state("interactive"));
        assert!(!is_loading_state("complete"));
    }
}
