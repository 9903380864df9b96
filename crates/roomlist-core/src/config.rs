//! Environment-backed configuration for a room summary provider.

use std::{env, error::Error, fmt, time::Duration};

use crate::filter::FilterSettings;

const DEFAULT_NAME: &str = "all_rooms";
const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_BATCH_WINDOW_MS: u64 = 100;
const DEFAULT_PAGINATION_THROTTLE_MS: u64 = 500;
const DEFAULT_SUBSCRIPTION_DEBOUNCE_MS: u64 = 500;
const DEFAULT_MAX_VISIBLE_RANGE: usize = 30;

/// Tuning values of one room summary provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Name used to tag logs and spans of this provider.
    pub name: String,
    /// Number of rooms per page requested from the remote list.
    pub page_size: u32,
    /// Collection window used to coalesce bursts of diffs.
    pub batch_window_ms: u64,
    /// Minimum interval between two pagination decisions.
    pub pagination_throttle_ms: u64,
    /// Quiet period required before the subscription set is updated.
    pub subscription_debounce_ms: u64,
    /// Widest visible range used to derive a subscription set.
    pub max_visible_range: usize,
    /// Whether this provider forwards visible rooms as subscriptions.
    pub manage_subscriptions: bool,
    /// Settings forwarded into filter translation.
    pub filter_settings: FilterSettings,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
            batch_window_ms: DEFAULT_BATCH_WINDOW_MS,
            pagination_throttle_ms: DEFAULT_PAGINATION_THROTTLE_MS,
            subscription_debounce_ms: DEFAULT_SUBSCRIPTION_DEBOUNCE_MS,
            max_visible_range: DEFAULT_MAX_VISIBLE_RANGE,
            manage_subscriptions: false,
            filter_settings: FilterSettings::default(),
        }
    }
}

impl ProviderConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let name = optional_trimmed_env("ROOMLIST_NAME", &mut lookup)
            .unwrap_or_else(|| DEFAULT_NAME.to_owned());
        let page_size = parse_or_default("ROOMLIST_PAGE_SIZE", DEFAULT_PAGE_SIZE, &mut lookup)?;
        let batch_window_ms = parse_or_default(
            "ROOMLIST_BATCH_WINDOW_MS",
            DEFAULT_BATCH_WINDOW_MS,
            &mut lookup,
        )?;
        let pagination_throttle_ms = parse_or_default(
            "ROOMLIST_PAGINATION_THROTTLE_MS",
            DEFAULT_PAGINATION_THROTTLE_MS,
            &mut lookup,
        )?;
        let subscription_debounce_ms = parse_or_default(
            "ROOMLIST_SUBSCRIPTION_DEBOUNCE_MS",
            DEFAULT_SUBSCRIPTION_DEBOUNCE_MS,
            &mut lookup,
        )?;
        let max_visible_range = parse_or_default(
            "ROOMLIST_MAX_VISIBLE_RANGE",
            DEFAULT_MAX_VISIBLE_RANGE,
            &mut lookup,
        )?;
        let manage_subscriptions =
            parse_bool_or_default("ROOMLIST_MANAGE_SUBSCRIPTIONS", false, &mut lookup)?;
        let fuzzy_search = parse_bool_or_default("ROOMLIST_FUZZY_SEARCH", false, &mut lookup)?;
        let low_priority_filter =
            parse_bool_or_default("ROOMLIST_LOW_PRIORITY_FILTER", false, &mut lookup)?;

        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROOMLIST_PAGE_SIZE",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if max_visible_range == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROOMLIST_MAX_VISIBLE_RANGE",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            name,
            page_size,
            batch_window_ms,
            pagination_throttle_ms,
            subscription_debounce_ms,
            max_visible_range,
            manage_subscriptions,
            filter_settings: FilterSettings {
                fuzzy_search,
                low_priority_filter,
            },
        })
    }

    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    pub fn pagination_throttle(&self) -> Duration {
        Duration::from_millis(self.pagination_throttle_ms)
    }

    pub fn subscription_debounce(&self) -> Duration {
        Duration::from_millis(self.subscription_debounce_ms)
    }
}

/// Errors produced while parsing provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_or_default<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value.parse::<T>().map_err(|err| ConfigError::InvalidValue {
        key,
        value,
        reason: err.to_string(),
    })
}

fn parse_bool_or_default<F>(
    key: &'static str,
    default: bool,
    lookup: &mut F,
) -> Result<bool, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<ProviderConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        ProviderConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = config_from_pairs(&[]).expect("config should parse");
        assert_eq!(cfg, ProviderConfig::default());
        assert_eq!(cfg.batch_window(), Duration::from_millis(100));
        assert_eq!(cfg.pagination_throttle(), Duration::from_millis(500));
        assert_eq!(cfg.subscription_debounce(), Duration::from_millis(500));
        assert_eq!(cfg.max_visible_range, 30);
        assert!(!cfg.manage_subscriptions);
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from_pairs(&[
            ("ROOMLIST_NAME", " home "),
            ("ROOMLIST_PAGE_SIZE", "50"),
            ("ROOMLIST_BATCH_WINDOW_MS", "20"),
            ("ROOMLIST_MAX_VISIBLE_RANGE", "12"),
            ("ROOMLIST_MANAGE_SUBSCRIPTIONS", "yes"),
            ("ROOMLIST_FUZZY_SEARCH", "1"),
            ("ROOMLIST_LOW_PRIORITY_FILTER", "off"),
        ])
        .expect("config should parse");

        assert_eq!(cfg.name, "home");
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.batch_window_ms, 20);
        assert_eq!(cfg.max_visible_range, 12);
        assert!(cfg.manage_subscriptions);
        assert!(cfg.filter_settings.fuzzy_search);
        assert!(!cfg.filter_settings.low_priority_filter);
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let err = config_from_pairs(&[("ROOMLIST_PAGE_SIZE", "abc")])
            .expect_err("invalid page size should fail");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "ROOMLIST_PAGE_SIZE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_page_size_and_range() {
        assert!(config_from_pairs(&[("ROOMLIST_PAGE_SIZE", "0")]).is_err());
        assert!(config_from_pairs(&[("ROOMLIST_MAX_VISIBLE_RANGE", "0")]).is_err());
    }

    #[test]
    fn rejects_unknown_boolean_spelling() {
        let err = config_from_pairs(&[("ROOMLIST_MANAGE_SUBSCRIPTIONS", "maybe")])
            .expect_err("invalid boolean should fail");
        assert_eq!(
            err.to_string(),
            "invalid ROOMLIST_MANAGE_SUBSCRIPTIONS='maybe': expected a boolean"
        );
    }
}
