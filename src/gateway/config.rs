//! Gateway configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};

/// Image model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// REST endpoint prefix for model calls.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variables checked for the credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Settings for the remote image-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Credential. `None` or blank means generation is unavailable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Creates a config with default model and endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the credential from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: api_key_from(|var| std::env::var(var).ok()),
            ..Self::default()
        }
    }

    /// Builder: Set API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builder: Replace the API key only when `api_key` is present and not blank.
    pub fn with_api_key_override(self, api_key: Option<impl Into<String>>) -> Self {
        match api_key.map(Into::into) {
            Some(key) if !key.trim().is_empty() => self.with_api_key(key),
            _ => self,
        }
    }

    /// Builder: Set model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder: Set base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder: Set timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Returns the credential, or the configuration error if none is set.
    pub fn require_api_key(&self) -> EditResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(EditError::Configuration)
    }

    /// Full URL of the `generateContent` call for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// First non-blank value among [`API_KEY_VARS`]. A blank variable does not
/// hide a later one.
fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|&var| lookup(var).filter(|key| !key.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Tests touching process environment run one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.require_api_key(), Err(EditError::Configuration));
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = GatewayConfig::new().with_api_key("   ");
        assert_eq!(config.require_api_key(), Err(EditError::Configuration));
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::new()
            .with_api_key("secret")
            .with_model("custom-model")
            .with_base_url("http://localhost:8080/v1/")
            .with_timeout_secs(5);
        assert_eq!(config.require_api_key(), Ok("secret"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(
            config.endpoint(),
            "http://localhost:8080/v1/custom-model:generateContent"
        );
    }

    #[test]
    fn test_key_is_not_serialized() {
        let config = GatewayConfig::new().with_api_key("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_api_key_lookup_order() {
        assert_eq!(
            api_key_from(lookup_in(&[("API_KEY", "first"), ("GEMINI_API_KEY", "second")])),
            Some("first".to_string())
        );
        assert_eq!(
            api_key_from(lookup_in(&[("GEMINI_API_KEY", "second")])),
            Some("second".to_string())
        );
        assert_eq!(api_key_from(lookup_in(&[])), None);
    }

    #[test]
    fn test_blank_api_key_falls_through() {
        assert_eq!(
            api_key_from(lookup_in(&[("API_KEY", ""), ("GEMINI_API_KEY", "real-key")])),
            Some("real-key".to_string())
        );
        assert_eq!(
            api_key_from(lookup_in(&[("API_KEY", "  "), ("GEMINI_API_KEY", "")])),
            None
        );
    }

    #[test]
    fn test_from_env_skips_blank_api_key() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = API_KEY_VARS.iter().map(|v| (*v, std::env::var(v).ok())).collect();

        std::env::set_var("API_KEY", "");
        std::env::set_var("GEMINI_API_KEY", "real-key");
        let config = GatewayConfig::from_env();

        for (var, value) in saved {
            match value {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }

        assert_eq!(config.require_api_key(), Ok("real-key"));
    }

    #[test]
    fn test_api_key_override() {
        let config = GatewayConfig::new().with_api_key("from-env");
        assert_eq!(
            config.clone().with_api_key_override(Some("from-flag")).require_api_key(),
            Ok("from-flag")
        );
        assert_eq!(
            config.clone().with_api_key_override(None::<String>).require_api_key(),
            Ok("from-env")
        );
        assert_eq!(
            config.with_api_key_override(Some("  ")).require_api_key(),
            Ok("from-env")
        );
    }
}
