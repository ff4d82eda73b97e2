//! Tunables for the thread store and the reaction engine.
//!
//! Both structs deserialize from partial JSON; missing fields take the
//! defaults below.

use memeshare_shared::SortOrder;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Top-level comments per page.
    pub per_page: u32,
    /// Replies per page, per parent.
    pub reply_per_page: u32,
    /// Order of top-level comments. Replies are always oldest first.
    pub sort: SortOrder,
    /// Fetch the first reply page of every top-level comment on load.
    pub eager_replies: bool,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            per_page: 10,
            reply_per_page: 5,
            sort: SortOrder::Oldest,
            eager_replies: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// The single reaction type the UI offers.
    pub reaction_kind: String,
    /// Prefix of every durable cache key.
    pub cache_prefix: String,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            reaction_kind: "laugh".to_string(),
            cache_prefix: "memeshare".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: ThreadConfig = serde_json::from_str(r#"{"per_page": 20}"#).unwrap();
        assert_eq!(config.per_page, 20);
        assert_eq!(config.reply_per_page, 5);
        assert!(config.eager_replies);

        let config: ReactionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReactionConfig::default());
    }

    #[test]
    fn sort_is_lowercase() {
        let config: ThreadConfig = serde_json::from_str(r#"{"sort": "newest"}"#).unwrap();
        assert_eq!(config.sort, SortOrder::Newest);
    }
}
