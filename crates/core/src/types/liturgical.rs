//! Liturgical colors and the shade ramps used to theme the portal.
//!
//! The backend decides which color applies on a given day; this module only
//! models the result. A color always carries a complete ten-stop ramp so that
//! a theme is never applied partially.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shade stops of a ramp, lightest first.
pub const SHADE_STOPS: [u16; 10] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900];

/// The colors of the liturgical calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LiturgicalColor {
    White,
    Red,
    /// Ordinary Time.
    #[default]
    Green,
    /// Advent and Lent.
    #[serde(alias = "violet")]
    Purple,
    /// Gaudete and Laetare Sundays.
    Rose,
    Gold,
}

/// Error returned when a color name is not one of the six liturgical colors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown liturgical color: {0}")]
pub struct UnknownColor(pub String);

impl LiturgicalColor {
    /// All colors, in calendar-neutral order.
    pub const ALL: [Self; 6] = [
        Self::White,
        Self::Red,
        Self::Green,
        Self::Purple,
        Self::Rose,
        Self::Gold,
    ];

    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Red => "red",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Rose => "rose",
            Self::Gold => "gold",
        }
    }

    /// Display color used when the backend does not send one.
    #[must_use]
    pub const fn default_hex(self) -> &'static str {
        match self {
            Self::White => "#FFFFFF",
            Self::Red => "#DC2626",
            Self::Green => "#16A34A",
            Self::Purple => "#7E22CE",
            Self::Rose => "#F43F5E",
            Self::Gold => "#D97706",
        }
    }

    /// Built-in ramp used when the backend does not send one.
    #[must_use]
    pub fn default_ramp(self) -> ShadeRamp {
        let stops: [&str; 10] = match self {
            Self::White => [
                "#F9FAFB", "#F3F4F6", "#E5E7EB", "#D1D5DB", "#9CA3AF", "#6B7280", "#4B5563",
                "#374151", "#1F2937", "#111827",
            ],
            Self::Red => [
                "#FEF2F2", "#FEE2E2", "#FECACA", "#FCA5A5", "#F87171", "#EF4444", "#DC2626",
                "#B91C1C", "#991B1B", "#7F1D1D",
            ],
            Self::Green => [
                "#F0FDF4", "#DCFCE7", "#BBF7D0", "#86EFAC", "#4ADE80", "#22C55E", "#16A34A",
                "#15803D", "#166534", "#14532D",
            ],
            Self::Purple => [
                "#FAF5FF", "#F3E8FF", "#E9D5FF", "#D8B4FE", "#C084FC", "#A855F7", "#9333EA",
                "#7E22CE", "#6B21A8", "#581C87",
            ],
            Self::Rose => [
                "#FFF1F2", "#FFE4E6", "#FECDD3", "#FDA4AF", "#FB7185", "#F43F5E", "#E11D48",
                "#BE123C", "#9F1239", "#881337",
            ],
            Self::Gold => [
                "#FFFBEB", "#FEF3C7", "#FDE68A", "#FCD34D", "#FBBF24", "#F59E0B", "#D97706",
                "#B45309", "#92400E", "#78350F",
            ],
        };
        ShadeRamp(stops.map(str::to_owned))
    }
}

impl fmt::Display for LiturgicalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LiturgicalColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "purple" | "violet" => Ok(Self::Purple),
            "rose" => Ok(Self::Rose),
            "gold" => Ok(Self::Gold),
            _ => Err(UnknownColor(s.to_owned())),
        }
    }
}

/// Error building a [`ShadeRamp`] from a stop map.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShadeRampError {
    #[error("shade ramp is missing stop {0}")]
    MissingStop(u16),
    #[error("shade ramp has unexpected stop {0:?}")]
    UnexpectedStop(String),
}

/// Ten color stops, one per entry of [`SHADE_STOPS`].
///
/// On the wire a ramp is an object keyed by stop (`{"50": "#..", ..}`).
/// Deserialising an incomplete ramp fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct ShadeRamp([String; 10]);

impl ShadeRamp {
    /// Pairs of `(stop, color)`, lightest first.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        SHADE_STOPS
            .iter()
            .copied()
            .zip(self.0.iter().map(String::as_str))
    }

    /// The lightest stop (50).
    #[must_use]
    pub fn lightest(&self) -> &str {
        let [first, ..] = &self.0;
        first
    }

    /// The darkest stop (900).
    #[must_use]
    pub fn darkest(&self) -> &str {
        let [.., last] = &self.0;
        last
    }
}

impl TryFrom<BTreeMap<String, String>> for ShadeRamp {
    type Error = ShadeRampError;

    fn try_from(mut map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut stops: [String; 10] = Default::default();
        for (slot, stop) in stops.iter_mut().zip(SHADE_STOPS) {
            *slot = map
                .remove(&stop.to_string())
                .ok_or(ShadeRampError::MissingStop(stop))?;
        }
        if let Some(extra) = map.into_keys().next() {
            return Err(ShadeRampError::UnexpectedStop(extra));
        }
        Ok(Self(stops))
    }
}

impl From<ShadeRamp> for BTreeMap<String, String> {
    fn from(ramp: ShadeRamp) -> Self {
        SHADE_STOPS
            .iter()
            .map(u16::to_string)
            .zip(ramp.0)
            .collect()
    }
}

/// Today's color as returned by `GET /liturgical-color`.
///
/// Only `color` is mandatory; missing fields are filled from the built-in
/// defaults when the payload is turned into a [`LiturgicalColorState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiturgicalColorPayload {
    pub color: LiturgicalColor,
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub tailwind: Option<ShadeRamp>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celebration: Option<String>,
}

/// The theme currently applied (or ready to be applied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiturgicalColorState {
    pub color: LiturgicalColor,
    pub hex: String,
    pub tailwind: ShadeRamp,
    /// Calendar date the color applies to.
    pub date: NaiveDate,
}

impl LiturgicalColorState {
    /// Complete a payload, dating it `today` when the backend sent no date.
    #[must_use]
    pub fn from_payload(payload: LiturgicalColorPayload, today: NaiveDate) -> Self {
        let color = payload.color;
        Self {
            color,
            hex: payload.hex.unwrap_or_else(|| color.default_hex().to_owned()),
            tailwind: payload.tailwind.unwrap_or_else(|| color.default_ramp()),
            date: payload.date.unwrap_or(today),
        }
    }

    /// A state made only of built-in defaults.
    #[must_use]
    pub fn with_defaults(color: LiturgicalColor, date: NaiveDate) -> Self {
        Self {
            color,
            hex: color.default_hex().to_owned(),
            tailwind: color.default_ramp(),
            date,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_color_names_and_aliases() {
        assert_eq!("Violet".parse::<LiturgicalColor>().unwrap(), LiturgicalColor::Purple);
        let c: LiturgicalColor = serde_json::from_str("\"violet\"").unwrap();
        assert_eq!(c, LiturgicalColor::Purple);
        assert_eq!(
            "blue".parse::<LiturgicalColor>(),
            Err(UnknownColor("blue".to_string()))
        );
        for color in LiturgicalColor::ALL {
            assert_eq!(color.name().parse::<LiturgicalColor>().unwrap(), color);
        }
    }

    #[test]
    fn test_ramp_wire_format() {
        let ramp = LiturgicalColor::Green.default_ramp();
        let json = serde_json::to_value(&ramp).unwrap();
        assert_eq!(json["50"], "#F0FDF4");
        assert_eq!(json["900"], "#14532D");

        let back: ShadeRamp = serde_json::from_value(json).unwrap();
        assert_eq!(back, ramp);
        assert_eq!(back.lightest(), "#F0FDF4");
        assert_eq!(back.darkest(), "#14532D");
    }

    #[test]
    fn test_incomplete_ramp_is_rejected() {
        let mut map: BTreeMap<String, String> = LiturgicalColor::Red.default_ramp().into();
        map.remove("400");
        assert_eq!(
            ShadeRamp::try_from(map),
            Err(ShadeRampError::MissingStop(400))
        );
    }

    #[test]
    fn test_unexpected_stop_is_rejected() {
        let mut map: BTreeMap<String, String> = LiturgicalColor::Red.default_ramp().into();
        map.insert("950".to_string(), "#000000".to_string());
        assert!(matches!(
            ShadeRamp::try_from(map),
            Err(ShadeRampError::UnexpectedStop(_))
        ));
    }

    #[test]
    fn test_payload_defaults_fill_missing_fields() {
        let payload: LiturgicalColorPayload =
            serde_json::from_str(r#"{"color":"rose"}"#).unwrap();
        let state = LiturgicalColorState::from_payload(payload, date());

        assert_eq!(state.color, LiturgicalColor::Rose);
        assert_eq!(state.hex, "#F43F5E");
        assert_eq!(state.tailwind, LiturgicalColor::Rose.default_ramp());
        assert_eq!(state.date, date());
    }

    #[test]
    fn test_payload_values_win_over_defaults() {
        let payload: LiturgicalColorPayload = serde_json::from_value(serde_json::json!({
            "color": "purple",
            "hex": "#5B2C83",
            "date": "2026-03-01",
            "season": "Lent"
        }))
        .unwrap();
        let state = LiturgicalColorState::from_payload(payload, date());

        assert_eq!(state.hex, "#5B2C83");
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }
}
