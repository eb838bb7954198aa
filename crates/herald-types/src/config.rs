use std::sync::{Arc, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Dynamically-typed setting value as stored by the (external) settings
/// layer. Accessors fail closed: a type mismatch yields the zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            _ => false,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            SettingValue::Int(i) => *i,
            SettingValue::Text(s) => s.parse().unwrap_or(0),
            SettingValue::Bool(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SettingValue::Text(s) => s,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: SettingValue,
}

/// Body-rewrite filter applied to message text at creation time,
/// configured as "pattern#replacement".
#[derive(Debug, Clone)]
pub struct BodyFilter {
    pub pattern: Regex,
    pub replacement: String,
}

/// Immutable view of the channel configuration. Operations capture one
/// snapshot at call start so a concurrent reload cannot tear mid-operation.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Emoji allowed as reactions. The empty string is the "no reaction"
    /// sentinel and is always part of the list.
    pub allowed_emoji: Vec<String>,

    /// When true, authenticated viewers see real author fields; when false
    /// only admins and moderators do.
    pub show_author_to_authenticated: bool,
    pub hide_edit_time: bool,
    pub count_views: bool,
    pub hide_view_counts_from_users: bool,

    /// Seconds after creation during which a non-privileged owner may still
    /// edit or delete their message.
    pub edit_time_limit_secs: i64,

    /// Whether thread replies get a feed-index entry (and therefore appear
    /// in top-level pagination).
    pub index_thread_replies: bool,

    pub max_searches_per_second: u32,
    pub max_searches_per_minute: u32,
    pub max_searches_per_hour: u32,
    pub search_days_back_default: i64,
    pub search_days_back_max: i64,

    pub body_filters: Vec<BodyFilter>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            allowed_emoji: [
                "👍", "👎", "❤️", "😂", "😮", "😢", "😡", "🔥", "🎉", "🙏", "👀",
                "💯", "💔", "🤔", "🙌", "👏", "💡", "",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            show_author_to_authenticated: false,
            hide_edit_time: false,
            count_views: true,
            hide_view_counts_from_users: false,
            edit_time_limit_secs: 300,
            index_thread_replies: true,
            max_searches_per_second: 2,
            max_searches_per_minute: 30,
            max_searches_per_hour: 500,
            search_days_back_default: 365,
            search_days_back_max: 1095,
            body_filters: Vec::new(),
        }
    }
}

impl ConfigSnapshot {
    /// Build a snapshot from the raw settings list, starting from defaults.
    /// Unknown keys are ignored; malformed values keep the default.
    pub fn from_settings(settings: &[Setting]) -> Self {
        let mut config = Self::default();

        for setting in settings {
            match setting.key.as_str() {
                "show-author-to-authenticated" => {
                    config.show_author_to_authenticated = setting.value.as_bool();
                }
                "hide-edit-time" => config.hide_edit_time = setting.value.as_bool(),
                "count-views" => config.count_views = setting.value.as_bool(),
                "hide-view-counts-for-users" => {
                    config.hide_view_counts_from_users = setting.value.as_bool();
                }
                "edit-time-limit" => {
                    if setting.value.as_int() > 0 {
                        config.edit_time_limit_secs = setting.value.as_int();
                    }
                }
                "index-thread-replies" => {
                    config.index_thread_replies = setting.value.as_bool();
                }
                "allowed-emoji" => {
                    let list: Vec<String> = setting
                        .value
                        .as_str()
                        .split(',')
                        .map(|e| e.trim().to_string())
                        .collect();
                    if !list.is_empty() {
                        config.allowed_emoji = list;
                        if !config.allowed_emoji.iter().any(|e| e.is_empty()) {
                            config.allowed_emoji.push(String::new());
                        }
                    }
                }
                "body-filter" => {
                    let raw = setting.value.as_str();
                    if let Some((pattern, replacement)) = raw.split_once('#') {
                        match Regex::new(pattern) {
                            Ok(pattern) => config.body_filters.push(BodyFilter {
                                pattern,
                                replacement: replacement.to_string(),
                            }),
                            Err(err) => warn!("invalid body-filter pattern: {err}"),
                        }
                    }
                }
                _ => {}
            }
        }

        config
    }

    pub fn is_allowed_emoji(&self, emoji: &str) -> bool {
        self.allowed_emoji.iter().any(|e| e == emoji)
    }
}

/// Process-wide handle to the current configuration snapshot. Reloads swap
/// the inner Arc atomically; readers keep whatever snapshot they captured.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl ConfigHandle {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace(&self, snapshot: ConfigSnapshot) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(snapshot);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ConfigSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_fail_closed_on_type_mismatch() {
        assert!(!SettingValue::Text("true".into()).as_bool());
        assert!(!SettingValue::Int(1).as_bool());
        assert_eq!(SettingValue::Bool(true).as_int(), 0);
        assert_eq!(SettingValue::Text("17".into()).as_int(), 17);
        assert_eq!(SettingValue::Text("seventeen".into()).as_int(), 0);
        assert_eq!(SettingValue::Int(5).as_str(), "");
    }

    #[test]
    fn builds_snapshot_from_settings() {
        let settings = vec![
            Setting {
                key: "show-author-to-authenticated".into(),
                value: SettingValue::Bool(true),
            },
            Setting {
                key: "edit-time-limit".into(),
                value: SettingValue::Text("600".into()),
            },
            Setting {
                key: "body-filter".into(),
                value: SettingValue::Text(r"\bfoo\b#bar".into()),
            },
            Setting {
                key: "body-filter".into(),
                value: SettingValue::Text("(unclosed#x".into()),
            },
            Setting {
                key: "no-such-key".into(),
                value: SettingValue::Bool(true),
            },
        ];

        let config = ConfigSnapshot::from_settings(&settings);
        assert!(config.show_author_to_authenticated);
        assert_eq!(config.edit_time_limit_secs, 600);
        // the malformed filter is dropped, the valid one kept
        assert_eq!(config.body_filters.len(), 1);
        assert_eq!(config.body_filters[0].replacement, "bar");
    }

    #[test]
    fn empty_sentinel_is_always_an_allowed_emoji() {
        let config = ConfigSnapshot::default();
        assert!(config.is_allowed_emoji(""));
        assert!(config.is_allowed_emoji("👍"));
        assert!(!config.is_allowed_emoji("🦀"));

        let custom = ConfigSnapshot::from_settings(&[Setting {
            key: "allowed-emoji".into(),
            value: SettingValue::Text("👍,👎".into()),
        }]);
        assert!(custom.is_allowed_emoji(""));
        assert!(!custom.is_allowed_emoji("❤️"));
    }

    #[test]
    fn handle_swaps_snapshots_atomically() {
        let handle = ConfigHandle::default();
        let before = handle.current();
        assert!(before.count_views);

        let mut next = ConfigSnapshot::default();
        next.count_views = false;
        handle.replace(next);

        // the old snapshot is unchanged, the handle serves the new one
        assert!(before.count_views);
        assert!(!handle.current().count_views);
    }
}
