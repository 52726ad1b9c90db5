//! The fixed settings schema: every key, its default and its validator.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use super::color;
use super::error::ValidationError;

/// Identifier of a tracked setting. Declaration order is the snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    EnablePlugin,
    ColorScheme,
    MenuBackground,
    MenuTextColor,
    MenuHoverBackground,
    MenuHoverTextColor,
    MenuActiveBackground,
    MenuActiveTextColor,
    MenuWidth,
    MenuBorderRadius,
    MenuFloating,
    MenuMargin,
    AdminBarBackground,
    AdminBarTextColor,
    AdminBarHeight,
    AdminBarFloating,
    ContentBackground,
    ContentTextColor,
    LinkColor,
    ButtonPrimaryBackground,
    ButtonPrimaryTextColor,
    ButtonBorderRadius,
    FontFamily,
    FontSize,
    EnableAnimations,
    AnimationSpeed,
    GlassmorphismEffects,
    ShadowEffects,
    CustomCss,
}

pub const FONT_FAMILIES: &[&str] = &["system", "inter", "roboto", "open_sans", "georgia", "monospace"];
pub const COLOR_SCHEMES: &[&str] = &["light", "dark", "auto"];
pub const CUSTOM_CSS_MAX_LEN: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Color,
    Length {
        min: i64,
        max: i64,
        unit: &'static str,
    },
    Toggle,
    Choice(&'static [&'static str]),
    Text {
        max_len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Toggle(bool),
    Integer(i64),
    Text(&'static str),
}

impl DefaultValue {
    pub fn to_value(self) -> SettingValue {
        match self {
            DefaultValue::Toggle(value) => SettingValue::Toggle(value),
            DefaultValue::Integer(value) => SettingValue::Integer(value),
            DefaultValue::Text(value) => SettingValue::Text(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    pub key: SettingKey,
    pub name: &'static str,
    pub kind: SettingKind,
    pub default: DefaultValue,
}

/// A validated setting value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Toggle(bool),
    Integer(i64),
    Text(String),
}

impl SettingValue {
    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Toggle(value) => Value::Bool(*value),
            SettingValue::Integer(value) => Value::from(*value),
            SettingValue::Text(value) => Value::String(value.clone()),
        }
    }

    /// Stable textual form used for fingerprinting.
    pub(crate) fn canonical(&self) -> String {
        match self {
            SettingValue::Toggle(value) => format!("b:{value}"),
            SettingValue::Integer(value) => format!("i:{value}"),
            SettingValue::Text(value) => format!("s:{}", value.escape_default()),
        }
    }
}

const fn color(key: SettingKey, name: &'static str, default: &'static str) -> SettingSpec {
    SettingSpec {
        key,
        name,
        kind: SettingKind::Color,
        default: DefaultValue::Text(default),
    }
}

const fn length(
    key: SettingKey,
    name: &'static str,
    default: i64,
    min: i64,
    max: i64,
    unit: &'static str,
) -> SettingSpec {
    SettingSpec {
        key,
        name,
        kind: SettingKind::Length { min, max, unit },
        default: DefaultValue::Integer(default),
    }
}

const fn toggle(key: SettingKey, name: &'static str, default: bool) -> SettingSpec {
    SettingSpec {
        key,
        name,
        kind: SettingKind::Toggle,
        default: DefaultValue::Toggle(default),
    }
}

const fn choice(
    key: SettingKey,
    name: &'static str,
    default: &'static str,
    choices: &'static [&'static str],
) -> SettingSpec {
    SettingSpec {
        key,
        name,
        kind: SettingKind::Choice(choices),
        default: DefaultValue::Text(default),
    }
}

use SettingKey as K;

/// Indexed by `SettingKey as usize`.
pub static SCHEMA: [SettingSpec; SettingKey::COUNT] = [
    toggle(K::EnablePlugin, "enable_plugin", true),
    choice(K::ColorScheme, "color_scheme", "light", COLOR_SCHEMES),
    color(K::MenuBackground, "menu_background", "#23282d"),
    color(K::MenuTextColor, "menu_text_color", "#ffffff"),
    color(K::MenuHoverBackground, "menu_hover_background", "#32373c"),
    color(K::MenuHoverTextColor, "menu_hover_text_color", "#00b9eb"),
    color(K::MenuActiveBackground, "menu_active_background", "#0073aa"),
    color(K::MenuActiveTextColor, "menu_active_text_color", "#ffffff"),
    length(K::MenuWidth, "menu_width", 160, 120, 400, "px"),
    length(K::MenuBorderRadius, "menu_border_radius", 0, 0, 32, "px"),
    toggle(K::MenuFloating, "menu_floating", false),
    length(K::MenuMargin, "menu_margin", 10, 0, 48, "px"),
    color(K::AdminBarBackground, "admin_bar_background", "#23282d"),
    color(K::AdminBarTextColor, "admin_bar_text_color", "#ffffff"),
    length(K::AdminBarHeight, "admin_bar_height", 32, 28, 64, "px"),
    toggle(K::AdminBarFloating, "admin_bar_floating", false),
    color(K::ContentBackground, "content_background", "#f1f1f1"),
    color(K::ContentTextColor, "content_text_color", "#1d2327"),
    color(K::LinkColor, "link_color", "#2271b1"),
    color(K::ButtonPrimaryBackground, "button_primary_background", "#2271b1"),
    color(K::ButtonPrimaryTextColor, "button_primary_text_color", "#ffffff"),
    length(K::ButtonBorderRadius, "button_border_radius", 3, 0, 24, "px"),
    choice(K::FontFamily, "font_family", "system", FONT_FAMILIES),
    length(K::FontSize, "font_size", 13, 11, 20, "px"),
    toggle(K::EnableAnimations, "enable_animations", true),
    length(K::AnimationSpeed, "animation_speed", 200, 50, 1000, "ms"),
    toggle(K::GlassmorphismEffects, "glassmorphism_effects", false),
    toggle(K::ShadowEffects, "shadow_effects", true),
    SettingSpec {
        key: K::CustomCss,
        name: "custom_css",
        kind: SettingKind::Text {
            max_len: CUSTOM_CSS_MAX_LEN,
        },
        default: DefaultValue::Text(""),
    },
];

static BY_NAME: Lazy<HashMap<&'static str, SettingKey>> =
    Lazy::new(|| SCHEMA.iter().map(|spec| (spec.name, spec.key)).collect());

impl SettingKey {
    pub const COUNT: usize = 29;

    pub const ALL: [SettingKey; SettingKey::COUNT] = [
        K::EnablePlugin,
        K::ColorScheme,
        K::MenuBackground,
        K::MenuTextColor,
        K::MenuHoverBackground,
        K::MenuHoverTextColor,
        K::MenuActiveBackground,
        K::MenuActiveTextColor,
        K::MenuWidth,
        K::MenuBorderRadius,
        K::MenuFloating,
        K::MenuMargin,
        K::AdminBarBackground,
        K::AdminBarTextColor,
        K::AdminBarHeight,
        K::AdminBarFloating,
        K::ContentBackground,
        K::ContentTextColor,
        K::LinkColor,
        K::ButtonPrimaryBackground,
        K::ButtonPrimaryTextColor,
        K::ButtonBorderRadius,
        K::FontFamily,
        K::FontSize,
        K::EnableAnimations,
        K::AnimationSpeed,
        K::GlassmorphismEffects,
        K::ShadowEffects,
        K::CustomCss,
    ];

    pub fn spec(self) -> &'static SettingSpec {
        &SCHEMA[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name.trim()).copied()
    }

    pub fn default_value(self) -> SettingValue {
        self.spec().default.to_value()
    }

    /// Validate a raw JSON value for this key.
    pub fn coerce(self, raw: &Value) -> Result<SettingValue, ValidationError> {
        let name = self.as_str();
        match self.spec().kind {
            SettingKind::Color => coerce_color(name, raw),
            SettingKind::Length { min, max, unit } => coerce_length(name, raw, min, max, unit),
            SettingKind::Toggle => coerce_toggle(name, raw),
            SettingKind::Choice(choices) => coerce_choice(name, raw, choices),
            SettingKind::Text { max_len } => coerce_text(name, raw, max_len),
        }
    }
}

fn coerce_color(key: &'static str, raw: &Value) -> Result<SettingValue, ValidationError> {
    let text = raw
        .as_str()
        .ok_or_else(|| ValidationError::invalid(key, "must be a color string"))?;
    color::normalize(text)
        .map(SettingValue::Text)
        .map_err(|err| ValidationError::invalid(key, err.to_string()))
}

fn coerce_length(
    key: &'static str,
    raw: &Value,
    min: i64,
    max: i64,
    unit: &'static str,
) -> Result<SettingValue, ValidationError> {
    let parsed = match raw {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(round_to_i64)),
        Value::String(text) => parse_length_text(text, unit),
        _ => None,
    };

    let value = parsed
        .ok_or_else(|| ValidationError::invalid(key, format!("must be a number of {unit}")))?;
    Ok(SettingValue::Integer(value.clamp(min, max)))
}

fn parse_length_text(text: &str, unit: &str) -> Option<i64> {
    let trimmed = text.trim();
    let numeric = match trimmed.len().checked_sub(unit.len()) {
        Some(split) if trimmed.is_char_boundary(split)
            && trimmed[split..].eq_ignore_ascii_case(unit) =>
        {
            trimmed[..split].trim_end()
        }
        _ => trimmed,
    };

    if let Ok(value) = numeric.parse::<i64>() {
        return Some(value);
    }
    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(round_to_i64)
}

fn round_to_i64(value: f64) -> i64 {
    // `as` saturates at the i64 bounds; clamping happens afterwards.
    value.round() as i64
}

fn coerce_toggle(key: &'static str, raw: &Value) -> Result<SettingValue, ValidationError> {
    let parsed = match raw {
        Value::Bool(value) => Some(*value),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };

    parsed
        .map(SettingValue::Toggle)
        .ok_or_else(|| ValidationError::invalid(key, "must be a boolean"))
}

fn coerce_choice(
    key: &'static str,
    raw: &Value,
    choices: &'static [&'static str],
) -> Result<SettingValue, ValidationError> {
    let text = raw
        .as_str()
        .ok_or_else(|| ValidationError::invalid(key, "must be a string"))?;
    let candidate = text.trim().to_ascii_lowercase().replace('-', "_");
    choices
        .iter()
        .find(|choice| **choice == candidate)
        .map(|choice| SettingValue::Text((*choice).to_string()))
        .ok_or_else(|| {
            ValidationError::invalid(key, format!("must be one of: {}", choices.join(", ")))
        })
}

fn coerce_text(
    key: &'static str,
    raw: &Value,
    max_len: usize,
) -> Result<SettingValue, ValidationError> {
    let text = raw
        .as_str()
        .ok_or_else(|| ValidationError::invalid(key, "must be a string"))?;

    let lowered = text.to_ascii_lowercase();
    if lowered.contains("</style") || lowered.contains("<script") {
        return Err(ValidationError::invalid(
            key,
            "must not contain markup tags",
        ));
    }

    let truncated = match text.char_indices().nth(max_len) {
        Some((index, _)) => &text[..index],
        None => text,
    };
    Ok(SettingValue::Text(truncated.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn schema_is_indexed_by_key() {
        assert_eq!(SCHEMA.len(), SettingKey::ALL.len());
        for (index, key) in SettingKey::ALL.iter().enumerate() {
            assert_eq!(*key as usize, index);
            assert_eq!(SCHEMA[index].key, *key);
            assert_eq!(SettingKey::from_name(SCHEMA[index].name), Some(*key));
        }
    }

    #[test]
    fn defaults_pass_their_own_validator() {
        for key in SettingKey::ALL {
            let default = key.default_value();
            let coerced = key.coerce(&default.to_json()).expect("default should validate");
            assert_eq!(coerced, default, "default for {}", key.as_str());
        }
    }

    #[test]
    fn lengths_accept_numbers_and_unit_strings() {
        let key = SettingKey::MenuWidth;
        assert_eq!(key.coerce(&json!(220)), Ok(SettingValue::Integer(220)));
        assert_eq!(key.coerce(&json!("220")), Ok(SettingValue::Integer(220)));
        assert_eq!(key.coerce(&json!("220PX")), Ok(SettingValue::Integer(220)));
        assert_eq!(key.coerce(&json!(219.6)), Ok(SettingValue::Integer(220)));
    }

    #[test]
    fn lengths_clamp_out_of_range_values() {
        let key = SettingKey::MenuWidth;
        assert_eq!(key.coerce(&json!(10_000)), Ok(SettingValue::Integer(400)));
        assert_eq!(key.coerce(&json!("-5px")), Ok(SettingValue::Integer(120)));
    }

    #[test]
    fn lengths_reject_non_numeric_input() {
        let err = SettingKey::MenuWidth
            .coerce(&json!("not-a-number"))
            .expect_err("non-numeric width");
        assert_eq!(err.key(), "menu_width");
        assert!(SettingKey::MenuWidth.coerce(&json!(true)).is_err());
    }

    #[test]
    fn toggles_accept_common_spellings() {
        let key = SettingKey::MenuFloating;
        assert_eq!(key.coerce(&json!("on")), Ok(SettingValue::Toggle(true)));
        assert_eq!(key.coerce(&json!(0)), Ok(SettingValue::Toggle(false)));
        assert_eq!(key.coerce(&json!("No")), Ok(SettingValue::Toggle(false)));
        assert!(key.coerce(&json!(2)).is_err());
        assert!(key.coerce(&json!("maybe")).is_err());
    }

    #[test]
    fn choices_normalize_case_and_dashes() {
        let key = SettingKey::FontFamily;
        assert_eq!(
            key.coerce(&json!("Open-Sans")),
            Ok(SettingValue::Text("open_sans".to_string()))
        );
        assert!(key.coerce(&json!("comic_sans")).is_err());
    }

    #[test]
    fn custom_css_rejects_markup_and_truncates() {
        let key = SettingKey::CustomCss;
        assert!(key.coerce(&json!("a{}</STYLE><script>")).is_err());

        let long = "x".repeat(CUSTOM_CSS_MAX_LEN + 10);
        match key.coerce(&json!(long)) {
            Ok(SettingValue::Text(text)) => assert_eq!(text.len(), CUSTOM_CSS_MAX_LEN),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn colors_are_normalized() {
        assert_eq!(
            SettingKey::LinkColor.coerce(&json!("#ABC")),
            Ok(SettingValue::Text("#aabbcc".to_string()))
        );
        assert!(SettingKey::LinkColor.coerce(&json!(123)).is_err());
    }
}
