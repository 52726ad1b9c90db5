//! Immutable, complete settings snapshots.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::error::ValidationError;
use super::schema::{SettingKey, SettingValue};

/// Raw options as persisted by the settings store, keyed by wire name.
pub type StoredOptions = BTreeMap<String, Value>;

/// Stable hash of a snapshot's canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point-in-time read of every setting. Every key always holds a valid value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    values: [SettingValue; SettingKey::COUNT],
}

/// Result of merging an override onto a base snapshot.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: SettingsSnapshot,
    /// Overrides that were ignored or rejected; the base value was kept for each.
    pub issues: Vec<ValidationError>,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}

impl SettingsSnapshot {
    pub fn defaults() -> Self {
        Self {
            values: std::array::from_fn(|index| SettingKey::ALL[index].default_value()),
        }
    }

    /// Decode stored options leniently: unknown keys are skipped and invalid
    /// or missing values take their defaults. Returns the problems found.
    pub fn from_stored(raw: &StoredOptions) -> (Self, Vec<ValidationError>) {
        let mut snapshot = Self::defaults();
        let mut issues = Vec::new();

        for (name, value) in raw {
            let Some(key) = SettingKey::from_name(name) else {
                issues.push(ValidationError::unknown(name.as_str()));
                continue;
            };
            match key.coerce(value) {
                Ok(valid) => snapshot.values[key as usize] = valid,
                Err(err) => issues.push(err),
            }
        }

        (snapshot, issues)
    }

    /// Merge `overrides` onto this snapshot. Override values win when valid;
    /// malformed values keep the base value and are reported.
    pub fn merge(&self, overrides: &Map<String, Value>) -> MergeOutcome {
        let mut snapshot = self.clone();
        let mut issues = Vec::new();

        for (name, value) in overrides {
            let Some(key) = SettingKey::from_name(name) else {
                issues.push(ValidationError::unknown(name.as_str()));
                continue;
            };
            match key.coerce(value) {
                Ok(valid) => snapshot.values[key as usize] = valid,
                Err(err) => issues.push(err),
            }
        }

        MergeOutcome { snapshot, issues }
    }

    /// Merge `overrides`, failing on the first malformed value. Unknown keys
    /// are skipped and returned by wire name.
    pub fn apply_strict(
        &self,
        overrides: &Map<String, Value>,
    ) -> Result<(Self, Vec<String>), ValidationError> {
        let mut snapshot = self.clone();
        let mut ignored = Vec::new();

        for (name, value) in overrides {
            let Some(key) = SettingKey::from_name(name) else {
                ignored.push(name.clone());
                continue;
            };
            snapshot.values[key as usize] = key.coerce(value)?;
        }

        Ok((snapshot, ignored))
    }

    pub fn get(&self, key: SettingKey) -> &SettingValue {
        &self.values[key as usize]
    }

    pub fn toggle(&self, key: SettingKey) -> bool {
        match self.get(key) {
            SettingValue::Toggle(value) => *value,
            _ => matches!(key.default_value(), SettingValue::Toggle(true)),
        }
    }

    pub fn integer(&self, key: SettingKey) -> i64 {
        match self.get(key) {
            SettingValue::Integer(value) => *value,
            _ => match key.default_value() {
                SettingValue::Integer(value) => value,
                _ => 0,
            },
        }
    }

    pub fn text(&self, key: SettingKey) -> &str {
        match self.get(key) {
            SettingValue::Text(value) => value.as_str(),
            _ => "",
        }
    }

    /// Iterate values in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, &SettingValue)> {
        SettingKey::ALL.iter().copied().zip(self.values.iter())
    }

    pub fn to_stored(&self) -> StoredOptions {
        self.iter()
            .map(|(key, value)| (key.as_str().to_string(), value.to_json()))
            .collect()
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(key, value)| (key.as_str().to_string(), value.to_json()))
            .collect()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for (key, value) in self.iter() {
            hasher.update(key.as_str().as_bytes());
            hasher.update(b"=");
            hasher.update(value.canonical().as_bytes());
            hasher.update(b"\n");
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn overrides(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn defaults_are_complete_and_ordered() {
        let snapshot = SettingsSnapshot::defaults();
        let keys: Vec<SettingKey> = snapshot.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, SettingKey::ALL.to_vec());
        assert_eq!(snapshot.text(SettingKey::MenuBackground), "#23282d");
        assert_eq!(snapshot.integer(SettingKey::MenuWidth), 160);
        assert!(snapshot.toggle(SettingKey::EnablePlugin));
    }

    #[test]
    fn stored_options_ignore_unknown_and_default_invalid() {
        let mut raw = StoredOptions::new();
        raw.insert("menu_background".into(), json!("#FF0000"));
        raw.insert("menu_width".into(), json!("wide"));
        raw.insert("legacy_option".into(), json!(1));

        let (snapshot, issues) = SettingsSnapshot::from_stored(&raw);
        assert_eq!(snapshot.text(SettingKey::MenuBackground), "#ff0000");
        assert_eq!(snapshot.integer(SettingKey::MenuWidth), 160);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|issue| issue.is_unknown_key()));
    }

    #[test]
    fn merge_prefers_override_and_keeps_untouched_keys() {
        let base = SettingsSnapshot::defaults()
            .merge(&overrides(json!({"menu_text_color": "#eeeeee"})))
            .snapshot;
        let outcome = base.merge(&overrides(json!({"menu_background": "#ff0000"})));

        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.snapshot.text(SettingKey::MenuBackground), "#ff0000");
        assert_eq!(outcome.snapshot.text(SettingKey::MenuTextColor), "#eeeeee");
        assert_eq!(base.text(SettingKey::MenuBackground), "#23282d");
    }

    #[test]
    fn merge_falls_back_to_base_for_malformed_values() {
        let base = SettingsSnapshot::defaults()
            .merge(&overrides(json!({"menu_width": 240})))
            .snapshot;
        let outcome = base.merge(&overrides(json!({
            "menu_width": "not-a-number",
            "link_color": "#123456",
        })));

        assert_eq!(outcome.snapshot.integer(SettingKey::MenuWidth), 240);
        assert_eq!(outcome.snapshot.text(SettingKey::LinkColor), "#123456");
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].key(), "menu_width");
    }

    #[test]
    fn strict_apply_rejects_malformed_values() {
        let base = SettingsSnapshot::defaults();
        let err = base
            .apply_strict(&overrides(json!({"menu_width": "huge"})))
            .expect_err("strict apply should fail");
        assert_eq!(err.key(), "menu_width");

        let (updated, ignored) = base
            .apply_strict(&overrides(json!({"menu_width": 300, "bogus": true})))
            .expect("strict apply");
        assert_eq!(updated.integer(SettingKey::MenuWidth), 300);
        assert_eq!(ignored, vec!["bogus".to_string()]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = SettingsSnapshot::defaults();
        let b = SettingsSnapshot::defaults();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);

        let c = a
            .merge(&overrides(json!({"font_size": 14})))
            .snapshot;
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn stored_form_round_trips_through_lenient_decode() {
        let snapshot = SettingsSnapshot::defaults()
            .merge(&overrides(json!({"menu_floating": true, "custom_css": "a { color: red; }"})))
            .snapshot;
        let (decoded, issues) = SettingsSnapshot::from_stored(&snapshot.to_stored());
        assert!(issues.is_empty());
        assert_eq!(decoded, snapshot);
    }
}
