//! Stylesheet generation from a settings snapshot.

use askama::{Error as AskamaError, Template};
use thiserror::Error;

use crate::domain::color;
use crate::domain::css::CssDocument;
use crate::domain::schema::SettingKey;
use crate::domain::snapshot::SettingsSnapshot;

const LINK_HOVER_SHADE: i16 = -20;
const BUTTON_HOVER_SHADE: i16 = -10;
const BUTTON_BORDER_SHADE: i16 = -18;
const SUBMENU_SHADE: i16 = -18;
const GLASS_ALPHA_PERCENT: u8 = 85;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("stylesheet template failed to render")]
    Template(#[source] AskamaError),
    #[error("stylesheet renderer produced no output")]
    Empty,
    #[error("stylesheet render task aborted: {0}")]
    Aborted(String),
}

/// Turns a snapshot into a stylesheet. Implementations must be deterministic.
pub trait StyleRenderer: Send + Sync {
    fn render(&self, snapshot: &SettingsSnapshot) -> Result<CssDocument, GenerationError>;
}

/// Default renderer backed by the `admin_style.css` template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl StyleRenderer for TemplateRenderer {
    fn render(&self, snapshot: &SettingsSnapshot) -> Result<CssDocument, GenerationError> {
        generate(snapshot)
    }
}

/// Render the admin stylesheet for `snapshot`.
pub fn generate(snapshot: &SettingsSnapshot) -> Result<CssDocument, GenerationError> {
    let view = StyleView::from_snapshot(snapshot);
    let text = AdminStyleTemplate { view: &view }
        .render()
        .map_err(GenerationError::Template)?;

    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(CssDocument::from(text))
}

#[derive(Template)]
#[template(path = "admin_style.css", escape = "none")]
struct AdminStyleTemplate<'a> {
    view: &'a StyleView,
}

/// Values the template needs, already clamped, normalized and derived.
#[derive(Debug, Clone)]
pub struct StyleView {
    pub enabled: bool,
    pub dark_scheme: bool,
    pub auto_scheme: bool,

    pub menu_background: String,
    pub menu_text_color: String,
    pub menu_hover_background: String,
    pub menu_hover_text_color: String,
    pub menu_active_background: String,
    pub menu_active_text_color: String,
    pub submenu_background: String,
    pub menu_width: i64,
    pub menu_border_radius: i64,
    pub menu_floating: bool,
    pub menu_margin: i64,

    pub admin_bar_background: String,
    pub admin_bar_text_color: String,
    pub admin_bar_height: i64,
    pub admin_bar_floating: bool,

    pub content_background: String,
    pub content_text_color: String,
    pub link_color: String,
    pub link_hover_color: String,

    pub button_background: String,
    pub button_text_color: String,
    pub button_hover_background: String,
    pub button_border_color: String,
    pub button_border_radius: i64,

    pub font_stack: &'static str,
    pub font_size: i64,

    pub animations: bool,
    pub transition_ms: i64,
    pub glass: bool,
    pub glass_menu_background: String,
    pub glass_bar_background: String,
    pub shadows: bool,

    pub custom_css: String,
}

impl StyleView {
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Self {
        let text = |key: SettingKey| snapshot.text(key).to_string();
        let scheme = snapshot.text(SettingKey::ColorScheme);

        let menu_background = text(SettingKey::MenuBackground);
        let admin_bar_background = text(SettingKey::AdminBarBackground);
        let link_color = text(SettingKey::LinkColor);
        let button_background = text(SettingKey::ButtonPrimaryBackground);
        let menu_floating = snapshot.toggle(SettingKey::MenuFloating);

        Self {
            enabled: snapshot.toggle(SettingKey::EnablePlugin),
            dark_scheme: scheme == "dark",
            auto_scheme: scheme == "auto",

            submenu_background: color::shade(&menu_background, SUBMENU_SHADE),
            glass_menu_background: color::translucent(&menu_background, GLASS_ALPHA_PERCENT),
            menu_background,
            menu_text_color: text(SettingKey::MenuTextColor),
            menu_hover_background: text(SettingKey::MenuHoverBackground),
            menu_hover_text_color: text(SettingKey::MenuHoverTextColor),
            menu_active_background: text(SettingKey::MenuActiveBackground),
            menu_active_text_color: text(SettingKey::MenuActiveTextColor),
            menu_width: snapshot.integer(SettingKey::MenuWidth),
            menu_border_radius: snapshot.integer(SettingKey::MenuBorderRadius),
            menu_floating,
            // Margin only renders for a floating menu.
            menu_margin: if menu_floating {
                snapshot.integer(SettingKey::MenuMargin)
            } else {
                0
            },

            glass_bar_background: color::translucent(&admin_bar_background, GLASS_ALPHA_PERCENT),
            admin_bar_background,
            admin_bar_text_color: text(SettingKey::AdminBarTextColor),
            admin_bar_height: snapshot.integer(SettingKey::AdminBarHeight),
            admin_bar_floating: snapshot.toggle(SettingKey::AdminBarFloating),

            content_background: text(SettingKey::ContentBackground),
            content_text_color: text(SettingKey::ContentTextColor),
            link_hover_color: color::shade(&link_color, LINK_HOVER_SHADE),
            link_color,

            button_hover_background: color::shade(&button_background, BUTTON_HOVER_SHADE),
            button_border_color: color::shade(&button_background, BUTTON_BORDER_SHADE),
            button_background,
            button_text_color: text(SettingKey::ButtonPrimaryTextColor),
            button_border_radius: snapshot.integer(SettingKey::ButtonBorderRadius),

            font_stack: font_stack(snapshot.text(SettingKey::FontFamily)),
            font_size: snapshot.integer(SettingKey::FontSize),

            animations: snapshot.toggle(SettingKey::EnableAnimations),
            transition_ms: snapshot.integer(SettingKey::AnimationSpeed),
            glass: snapshot.toggle(SettingKey::GlassmorphismEffects),
            shadows: snapshot.toggle(SettingKey::ShadowEffects),

            custom_css: snapshot.text(SettingKey::CustomCss).trim().to_string(),
        }
    }
}

fn font_stack(family: &str) -> &'static str {
    match family {
        "inter" => r#""Inter", -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif"#,
        "roboto" => r#""Roboto", "Helvetica Neue", Arial, sans-serif"#,
        "open_sans" => r#""Open Sans", "Helvetica Neue", Arial, sans-serif"#,
        "georgia" => r#"Georgia, "Times New Roman", serif"#,
        "monospace" => r#""SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace"#,
        _ => {
            r#"-apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Oxygen-Sans, Ubuntu, Cantarell, "Helvetica Neue", sans-serif"#
        }
    }
}
