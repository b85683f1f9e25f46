//! Theme accent color parsing and normalization.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

use std::num::ParseIntError;

use crate::consts::DEFAULT_THEME_COLOR;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("color must start with #")]
    MissingHash,
    #[error("expected 3 or 6 hex digits, got {0}")]
    BadLength(usize),
    #[error("{0:?} is not a hex digit")]
    InvalidDigit(char),
    #[error("invalid hex pair {pair:?}")]
    BadPair {
        pair: String,
        #[source]
        source: ParseIntError,
    },
}

impl crate::error::ErrorCode for ColorError {
    fn error_code(&self) -> &'static str {
        "E_COLOR_FORMAT"
    }
}

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
///
/// # Errors
///
/// `ColorError` naming the first problem found.
pub fn parse_hex_rgb(raw: &str) -> Result<(u8, u8, u8), ColorError> {
    let hex = raw.trim().strip_prefix('#').ok_or(ColorError::MissingHash)?;
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidDigit(bad));
    }
    match hex.len() {
        3 => {
            let r = hex_byte(&hex[0..1].repeat(2))?;
            let g = hex_byte(&hex[1..2].repeat(2))?;
            let b = hex_byte(&hex[2..3].repeat(2))?;
            Ok((r, g, b))
        }
        6 => Ok((hex_byte(&hex[0..2])?, hex_byte(&hex[2..4])?, hex_byte(&hex[4..6])?)),
        len => Err(ColorError::BadLength(len)),
    }
}

fn hex_byte(pair: &str) -> Result<u8, ColorError> {
    u8::from_str_radix(pair, 16).map_err(|source| ColorError::BadPair { pair: pair.to_string(), source })
}

/// Canonical lowercase `#rrggbb` form of a color.
///
/// # Errors
///
/// Same as [`parse_hex_rgb`].
pub fn canonical_hex(value: &str) -> Result<String, ColorError> {
    let (r, g, b) = parse_hex_rgb(value)?;
    Ok(format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Normalize a color to canonical lowercase `#rrggbb`, falling back to
/// `fallback` and then to the default theme accent.
#[must_use]
pub fn normalize_hex_color(value: &str, fallback: &str) -> String {
    canonical_hex(value)
        .or_else(|_| canonical_hex(fallback))
        .unwrap_or_else(|_| DEFAULT_THEME_COLOR.to_string())
}
