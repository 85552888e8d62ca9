/// Caller authentication.
///
/// The runner never looks at sessions or headers itself: an [`Authenticator`]
/// turns whatever credentials the transport carried into a [`CapabilitySet`].
use std::collections::{BTreeSet, HashMap};

use crate::config::ApiKeyConfig;

/// Capabilities granted to the current actor, e.g. `manage_options`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: BTreeSet<String>,
}

impl CapabilitySet {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, capability: &str) -> bool {
        self.caps.contains(capability)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            caps: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Trait for resolving caller credentials.
///
/// Implementations must be `Send + Sync` to be shared behind `Arc`.
pub trait Authenticator: Send + Sync {
    /// Resolve the capabilities of the caller. Unknown or missing
    /// credentials yield an empty set, never an error.
    fn capabilities(&self, credentials: Option<&str>) -> CapabilitySet;
}

/// Maps static API keys (sent as `Authorization: Bearer <key>`) to capabilities.
#[derive(Debug, Default)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, (String, CapabilitySet)>,
}

impl ApiKeyAuthenticator {
    #[must_use]
    pub fn new(entries: &[ApiKeyConfig]) -> Self {
        let keys = entries
            .iter()
            .map(|e| {
                (
                    e.key.clone(),
                    (
                        e.user.clone(),
                        e.capabilities.iter().cloned().collect::<CapabilitySet>(),
                    ),
                )
            })
            .collect();
        Self { keys }
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn capabilities(&self, credentials: Option<&str>) -> CapabilitySet {
        let Some(key) = credentials else {
            return CapabilitySet::empty();
        };
        match self.keys.get(key) {
            Some((user, caps)) => {
                tracing::debug!("Authenticated API key for user {user}");
                caps.clone()
            }
            None => CapabilitySet::empty(),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ApiKeyConfig> {
        vec![
            ApiKeyConfig {
                key: "admin-key".to_string(),
                user: "admin".to_string(),
                capabilities: vec!["manage_options".to_string(), "edit_posts".to_string()],
            },
            ApiKeyConfig {
                key: "editor-key".to_string(),
                user: "editor".to_string(),
                capabilities: vec!["edit_posts".to_string()],
            },
        ]
    }

    #[test]
    fn test_known_key_resolves_capabilities() {
        let auth = ApiKeyAuthenticator::new(&entries());
        let caps = auth.capabilities(Some("admin-key"));
        assert!(caps.contains("manage_options"));
        assert!(caps.contains("edit_posts"));
    }

    #[test]
    fn test_editor_lacks_manage_options() {
        let auth = ApiKeyAuthenticator::new(&entries());
        let caps = auth.capabilities(Some("editor-key"));
        assert!(!caps.contains("manage_options"));
        assert!(caps.contains("edit_posts"));
    }

    #[test]
    fn test_unknown_or_missing_key_is_empty() {
        let auth = ApiKeyAuthenticator::new(&entries());
        assert!(auth.capabilities(Some("nope")).is_empty());
        assert!(auth.capabilities(None).is_empty());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
