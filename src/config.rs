//! Resolver configuration.
//!
//! Field names are camelCase so the same shape can be handed over from a
//! JavaScript object or a JSON file. Every field is optional.

use crate::error::ConsentError;
use crate::source::ConsentEvent;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COOKIE_NAME: &str = "cc-settings";

/// Env var overriding the cookie name in [`ResolverConfig::from_env`].
pub const COOKIE_NAME_ENV: &str = "CONSENT_COOKIE_NAME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Cookie holding `{"categories": [...]}`.
    pub cookie_name: String,
    /// Event name a consent source uses for the first decision.
    pub first_action_event: String,
    /// Event name a consent source uses for later changes.
    pub changed_event: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            first_action_event: ConsentEvent::FirstAction.as_str().to_string(),
            changed_event: ConsentEvent::Changed.as_str().to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConsentError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConsentError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, with the cookie name taken from `CONSENT_COOKIE_NAME`
    /// when set.
    pub fn from_env() -> Result<Self, ConsentError> {
        let mut config = Self::default();
        if let Ok(name) = std::env::var(COOKIE_NAME_ENV) {
            config.cookie_name = name;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConsentError> {
        let name = self.cookie_name.trim();
        if name.is_empty() {
            return Err(ConsentError::InvalidConfig(
                "cookieName must not be empty".to_string(),
            ));
        }
        if name.contains(['=', ';']) {
            return Err(ConsentError::InvalidConfig(format!(
                "cookieName {:?} must not contain '=' or ';'",
                self.cookie_name
            )));
        }
        if self.first_action_event.is_empty() || self.changed_event.is_empty() {
            return Err(ConsentError::InvalidConfig(
                "consent event names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn event_name(&self, event: ConsentEvent) -> &str {
        match event {
            ConsentEvent::FirstAction => &self.first_action_event,
            ConsentEvent::Changed => &self.changed_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_banner_conventions() {
        let config = ResolverConfig::default();
        assert_eq!(config.cookie_name, "cc-settings");
        assert_eq!(config.event_name(ConsentEvent::FirstAction), "consent:first-action");
        assert_eq!(config.event_name(ConsentEvent::Changed), "consent:changed");
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = ResolverConfig::from_json(r#"{"cookieName":"consent"}"#).unwrap();
        assert_eq!(config.cookie_name, "consent");
        assert_eq!(config.changed_event, "consent:changed");
    }

    #[test]
    fn test_from_json_rejects_bad_cookie_names() {
        for json in [r#"{"cookieName":""}"#, r#"{"cookieName":"a=b"}"#, r#"{"cookieName":"a;b"}"#] {
            assert!(matches!(
                ResolverConfig::from_json(json),
                Err(ConsentError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_from_json_rejects_invalid_json() {
        assert!(matches!(
            ResolverConfig::from_json("{"),
            Err(ConsentError::InvalidConfig(_))
        ));
    }
}
