//! Run configuration read once from environment-style keys.
//!
//! Every command reads the same [`RelayConfig`]; credentials are only checked
//! when a component that needs them is built.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use relay_core::{FilterRules, SyncSettings};

use crate::feed_writer::FeedSettings;
use crate::fetch::FetchSettings;
use crate::publish::GraphSettings;
use crate::retry::RetryPolicy;
use crate::transform::{GeminiSettings, TransformPolicy};

pub const DEFAULT_CHANNEL_URL: &str = "https://t.me/s/alkulife";
pub const DEFAULT_FEED_URL: &str = "https://bidjadraft.github.io/rss/rss.xml";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v12.0";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_FEED_TITLE: &str = "قناة أبي جعفر عبدالله الخليفي";
pub const DEFAULT_CHANNEL_WATERMARK_FILE: &str = "lastpost.txt";
pub const DEFAULT_FEED_WATERMARK_FILE: &str = "last_sent_id.txt";
pub const DEFAULT_RSS_FILE: &str = "rss.xml";
pub const DEFAULT_FEED_MAX_ITEMS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCredentials {
    pub page_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub channel_url: String,
    pub feed_url: String,
    pub page: Option<PageCredentials>,
    pub graph_api_base: String,
    /// Present only when rewriting is enabled.
    pub rewrite: Option<RewriteConfig>,
    pub transform_policy: TransformPolicy,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub cooldown: Duration,
    /// Explicit watermark path; each command has its own default.
    pub watermark_file: Option<PathBuf>,
    pub rss_file: PathBuf,
    pub feed_title: String,
    pub feed_max_items: usize,
    pub min_words: usize,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let page = match (
            get(&["FACEBOOK_PAGE_ID", "PAGE_ID"]),
            get(&["FACEBOOK_TOKEN", "SOURCE_TOKEN"]),
        ) {
            (Some(page_id), Some(access_token)) => Some(PageCredentials {
                page_id,
                access_token,
            }),
            _ => None,
        };

        let rewrite_enabled = match get(&["REWRITE_ENABLED"]) {
            Some(value) => parse_bool("REWRITE_ENABLED", &value)?,
            None => false,
        };
        let rewrite = if rewrite_enabled {
            let api_key =
                get(&["GEMINI_API_KEY", "API_KEY"]).ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
            Some(RewriteConfig {
                api_key,
                model: get(&["GEMINI_MODEL"]).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: get(&["GEMINI_API_BASE"])
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            })
        } else {
            None
        };

        let transform_policy = match get(&["TRANSFORM_FAILURE_POLICY"]) {
            Some(value) => TransformPolicy::from_str(&value).map_err(|reason| {
                ConfigError::Invalid {
                    key: "TRANSFORM_FAILURE_POLICY",
                    value,
                    reason,
                }
            })?,
            None => TransformPolicy::AbortItem,
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_number(&get, "RETRY_COUNT", defaults.max_attempts)?.max(1),
            delay: Duration::from_secs(parse_number(
                &get,
                "RETRY_DELAY_SECONDS",
                defaults.delay.as_secs(),
            )?),
        };

        Ok(Self {
            channel_url: get(&["CHANNEL_URL"]).unwrap_or_else(|| DEFAULT_CHANNEL_URL.to_string()),
            feed_url: get(&["FEED_URL"]).unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            page,
            graph_api_base: get(&["GRAPH_API_BASE"])
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            rewrite,
            transform_policy,
            retry,
            request_timeout: Duration::from_secs(parse_number(
                &get,
                "REQUEST_TIMEOUT_SECONDS",
                30,
            )?),
            cooldown: Duration::from_secs(parse_number(
                &get,
                "INTER_ITEM_DELAY_SECONDS",
                relay_core::DEFAULT_COOLDOWN.as_secs(),
            )?),
            watermark_file: get(&["WATERMARK_FILE"]).map(PathBuf::from),
            rss_file: get(&["RSS_FILE"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RSS_FILE)),
            feed_title: get(&["FEED_TITLE"]).unwrap_or_else(|| DEFAULT_FEED_TITLE.to_string()),
            feed_max_items: parse_number(&get, "FEED_MAX_ITEMS", DEFAULT_FEED_MAX_ITEMS)?.max(1),
            min_words: parse_number(&get, "MIN_WORDS", relay_core::MIN_WORDS)?,
        })
    }

    pub fn watermark_path_or(&self, default: &str) -> PathBuf {
        self.watermark_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(default))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: self.request_timeout,
            ..FetchSettings::default()
        }
    }

    pub fn filter_rules(&self) -> FilterRules {
        FilterRules {
            min_words: self.min_words,
            ..FilterRules::default()
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            rules: self.filter_rules(),
            cooldown: self.cooldown,
        }
    }

    /// Destination settings; publishing commands cannot run without them.
    pub fn graph_settings(&self) -> Result<GraphSettings, ConfigError> {
        let page = self
            .page
            .as_ref()
            .ok_or(ConfigError::Missing("FACEBOOK_PAGE_ID and FACEBOOK_TOKEN"))?;
        Ok(GraphSettings {
            api_base: self.graph_api_base.clone(),
            page_id: page.page_id.clone(),
            access_token: page.access_token.clone(),
            timeout: self.request_timeout,
        })
    }

    pub fn gemini_settings(&self) -> Option<GeminiSettings> {
        self.rewrite.as_ref().map(|rewrite| GeminiSettings {
            api_base: rewrite.api_base.clone(),
            model: rewrite.model.clone(),
            api_key: rewrite.api_key.clone(),
            timeout: self.request_timeout,
        })
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            output_path: self.rss_file.clone(),
            title: self.feed_title.clone(),
            link: self.channel_url.clone(),
            max_items: self.feed_max_items,
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_number<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&[&str]) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(&[key]) {
        Some(value) => value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<RelayConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.channel_url, DEFAULT_CHANNEL_URL);
        assert_eq!(cfg.page, None);
        assert_eq!(cfg.rewrite, None);
        assert_eq!(cfg.transform_policy, TransformPolicy::AbortItem);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert_eq!(cfg.cooldown, Duration::from_secs(10));
        assert_eq!(cfg.feed_max_items, 50);
        assert_eq!(cfg.min_words, 40);
        assert_eq!(cfg.watermark_path_or(DEFAULT_CHANNEL_WATERMARK_FILE), PathBuf::from("lastpost.txt"));
    }

    #[test]
    fn legacy_credential_names_are_accepted() {
        let cfg = config(&[("PAGE_ID", "123"), ("SOURCE_TOKEN", "tok")]).unwrap();
        let graph = cfg.graph_settings().unwrap();
        assert_eq!(graph.page_id, "123");
        assert_eq!(graph.access_token, "tok");
        assert_eq!(graph.api_base, DEFAULT_GRAPH_API_BASE);
    }

    #[test]
    fn publishing_without_credentials_is_a_config_error() {
        let cfg = config(&[("FACEBOOK_PAGE_ID", "123")]).unwrap();
        assert!(matches!(cfg.graph_settings(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn rewrite_without_key_is_rejected() {
        let err = config(&[("REWRITE_ENABLED", "true")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GEMINI_API_KEY"));
    }

    #[test]
    fn rewrite_with_key_uses_default_model() {
        let cfg = config(&[("REWRITE_ENABLED", "1"), ("API_KEY", "k")]).unwrap();
        let gemini = cfg.gemini_settings().unwrap();
        assert_eq!(gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(gemini.api_key, "k");
    }

    #[test]
    fn bad_numbers_and_policies_are_rejected() {
        assert!(matches!(
            config(&[("RETRY_COUNT", "many")]),
            Err(ConfigError::Invalid { key: "RETRY_COUNT", .. })
        ));
        assert!(matches!(
            config(&[("TRANSFORM_FAILURE_POLICY", "ignore")]),
            Err(ConfigError::Invalid { key: "TRANSFORM_FAILURE_POLICY", .. })
        ));
        assert!(matches!(
            config(&[("REWRITE_ENABLED", "maybe")]),
            Err(ConfigError::Invalid { key: "REWRITE_ENABLED", .. })
        ));
    }

    #[test]
    fn retry_count_of_zero_still_makes_one_attempt() {
        let cfg = config(&[("RETRY_COUNT", "0"), ("RETRY_DELAY_SECONDS", "2")]).unwrap();
        assert_eq!(cfg.retry.max_attempts, 1);
        assert_eq!(cfg.retry.delay, Duration::from_secs(2));
    }
}
