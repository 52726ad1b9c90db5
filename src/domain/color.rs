//! Hex color parsing, normalization and shading.

use std::fmt;

use thiserror::Error;

pub const TRANSPARENT: &str = "transparent";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("must be a hex color such as #23282d")]
    NotHex,
    #[error("hex color must have 3, 4, 6 or 8 digits")]
    BadLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn parse_hex(input: &str) -> Result<Self, ColorError> {
        let digits = input.trim().strip_prefix('#').ok_or(ColorError::NotHex)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::NotHex);
        }

        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return Err(ColorError::BadLength),
        };

        let channel = |index: usize| -> Result<u8, ColorError> {
            u8::from_str_radix(&expanded[index..index + 2], 16).map_err(|_| ColorError::NotHex)
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if expanded.len() == 8 { channel(6)? } else { 255 },
        })
    }

    /// Move every channel toward white (positive) or black (negative) by `percent`.
    pub fn shade(self, percent: i16) -> Self {
        let percent = i32::from(percent.clamp(-100, 100));
        let adjust = |channel: u8| -> u8 {
            let channel = i32::from(channel);
            let target = if percent >= 0 { 255 } else { 0 };
            let shifted = channel + (target - channel) * percent.abs() / 100;
            shifted.clamp(0, 255) as u8
        };
        Self {
            r: adjust(self.r),
            g: adjust(self.g),
            b: adjust(self.b),
            a: self.a,
        }
    }

    /// `rgba(r, g, b, alpha)` with `alpha_percent` replacing the stored alpha.
    pub fn to_css_rgba(self, alpha_percent: u8) -> String {
        let alpha = alpha_percent.min(100);
        format!(
            "rgba({}, {}, {}, {}.{:02})",
            self.r,
            self.g,
            self.b,
            alpha / 100,
            alpha % 100
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Normalize a color to lowercase long-form hex, keeping `transparent` as is.
pub fn normalize(input: &str) -> Result<String, ColorError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case(TRANSPARENT) {
        return Ok(TRANSPARENT.to_string());
    }
    Rgba::parse_hex(trimmed).map(|color| color.to_string())
}

/// Shade a normalized color; `transparent` stays transparent.
pub fn shade(color: &str, percent: i16) -> String {
    match Rgba::parse_hex(color) {
        Ok(parsed) => parsed.shade(percent).to_string(),
        Err(_) => color.to_string(),
    }
}

/// Translucent variant of a normalized color for overlay effects.
pub fn translucent(color: &str, alpha_percent: u8) -> String {
    match Rgba::parse_hex(color) {
        Ok(parsed) => parsed.to_css_rgba(alpha_percent),
        Err(_) => color.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_short_and_uppercase_forms() {
        assert_eq!(normalize("#FFF").as_deref(), Ok("#ffffff"));
        assert_eq!(normalize(" #23282D ").as_deref(), Ok("#23282d"));
        assert_eq!(normalize("#0f08").as_deref(), Ok("#00ff0088"));
        assert_eq!(normalize("Transparent").as_deref(), Ok("transparent"));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert_eq!(normalize("red"), Err(ColorError::NotHex));
        assert_eq!(normalize("#12345"), Err(ColorError::BadLength));
        assert_eq!(normalize("#zzzzzz"), Err(ColorError::NotHex));
        assert_eq!(normalize("#"), Err(ColorError::BadLength));
    }

    #[test]
    fn shading_moves_toward_black_or_white() {
        assert_eq!(shade("#808080", -100), "#000000");
        assert_eq!(shade("#808080", 100), "#ffffff");
        assert_eq!(shade("#2271b1", 0), "#2271b1");
        assert_eq!(shade("transparent", -20), "transparent");
    }

    #[test]
    fn translucent_formats_alpha() {
        assert_eq!(translucent("#23282d", 85), "rgba(35, 40, 45, 0.85)");
        assert_eq!(translucent("#000000", 100), "rgba(0, 0, 0, 1.00)");
    }
}
