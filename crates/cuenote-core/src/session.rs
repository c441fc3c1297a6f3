//! Stream session identity.
//!
//! A session binds the engine to one media stream and one acting user. All
//! mutations and permission checks run against this identity until the
//! engine is disposed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

/// Identity of a live engine: which stream, acting as whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSession {
    pub stream_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub started_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn new(
        stream_id: impl Into<String>,
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            actor_id: actor_id.into(),
            actor_name: actor_name.into(),
            started_at: Utc::now(),
        }
    }

    /// Resolve a session from config defaults plus optional overrides.
    ///
    /// Missing actor identity gets a generated `viewer-<hex>` id so an
    /// unconfigured CLI still works.
    pub fn resolve(
        config: &Config,
        stream_id: Option<String>,
        actor_id: Option<String>,
        actor_name: Option<String>,
    ) -> Self {
        let stream_id = stream_id
            .or_else(|| config.stream_id.clone())
            .unwrap_or_else(|| "default".to_string());
        let actor_id = actor_id
            .or_else(|| config.actor_id.clone())
            .unwrap_or_else(generated_actor_id);
        let actor_name = actor_name
            .or_else(|| config.actor_name.clone())
            .unwrap_or_else(|| actor_id.clone());
        Self::new(stream_id, actor_id, actor_name)
    }
}

fn generated_actor_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("viewer-{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_overrides() {
        let config = Config {
            stream_id: Some("config-stream".to_string()),
            actor_id: Some("config-actor".to_string()),
            actor_name: Some("Config Actor".to_string()),
            ..Config::default()
        };

        let session = StreamSession::resolve(
            &config,
            Some("flag-stream".to_string()),
            Some("flag-actor".to_string()),
            None,
        );
        assert_eq!(session.stream_id, "flag-stream");
        assert_eq!(session.actor_id, "flag-actor");
        // Name falls back to config when the flag is absent
        assert_eq!(session.actor_name, "Config Actor");
    }

    #[test]
    fn test_resolve_generates_actor_when_unconfigured() {
        let session = StreamSession::resolve(&Config::default(), None, None, None);
        assert_eq!(session.stream_id, "default");
        assert!(session.actor_id.starts_with("viewer-"));
        assert_eq!(session.actor_name, session.actor_id);
    }
}
