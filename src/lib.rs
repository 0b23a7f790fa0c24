//! Cookie Consent Resolver
//!
//! Gates callbacks (and script injection) behind user-granted consent
//! categories. Whenever the granted set changes, every registration whose
//! requirements are now met fires, in registration order, at most once.
//! Nothing fires before the host document has finished loading.
//!
//! ## Architecture
//!
//! ```text
//! cookie / updateCategories / consent source
//!                  │
//!                  ▼
//!          ConsentResolver ───────────────► Document (trait)
//!           │            │                   cookie, readiness, <script>
//!           ▼            ▼
//!     ConsentState   ReadinessGate
//!     │          │        │ request_sweep / mark_ready
//!     ▼          ▼        ▼
//! CategorySet  CallbackRegistry ──► SweepBatch ──► SweepReport
//! ```
//!
//! [`SharedResolver`] wraps the resolver for hosts that deliver events
//! through callbacks. With the `web` feature, [`web`] binds it to the
//! browser DOM and exports it to JavaScript.
//!
//! ## Example
//!
//! ```
//! use cookie_consent_resolver::{ConsentResolver, MemoryDocument};
//! use std::rc::Rc;
//!
//! let document = MemoryDocument::new()
//!     .with_raw_cookie(r#"cc-settings={"categories":["analytics"]}"#);
//! let mut resolver = ConsentResolver::from_cookie("cc-settings", Rc::new(document));
//!
//! let report = resolver.resolve("analytics", || println!("analytics enabled"));
//! assert_eq!(report.fired.len(), 1);
//!
//! let report = resolver.resolve(["analytics", "ads"], || println!("ads enabled"));
//! assert!(report.fired.is_empty());
//! ```

pub mod category;
pub mod config;
pub mod cookie;
pub mod document;
pub mod error;
pub mod readiness;
pub mod registry;
pub mod resolver;
pub mod shared;
pub mod source;
pub mod state;

#[cfg(feature = "web")]
pub mod web;

pub use category::{CategorySet, RequiredCategories};
pub use config::ResolverConfig;
pub use cookie::{find_cookie, read_consent_categories, ConsentCookie};
pub use document::{Document, MemoryDocument, ScriptAttributes, ScriptElement};
pub use error::{ActionError, ConsentError, DocumentError};
pub use readiness::{Readiness, ReadinessGate};
pub use registry::{
    Action, ActionFailure, CallbackRegistration, CallbackRegistry, RegistrationId, SweepBatch,
    SweepReport, SweepStatus,
};
pub use resolver::ConsentResolver;
pub use shared::SharedResolver;
pub use source::{
    granted_categories, ConsentDecisions, ConsentEvent, ConsentHandler, ConsentSource,
    MemoryConsentSource,
};
pub use state::ConsentState;
