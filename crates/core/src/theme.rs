//! Theme tokens derived from a liturgical color.
//!
//! Applying a theme means writing one [`CssVariables`] batch: ten shade
//! variables, three contrast variables and four typography variables. The
//! batch is built in full before anything is applied.

use std::fmt::Write as _;

use crate::types::{LiturgicalColor, LiturgicalColorState};

/// Prefix shared by every variable the theme writes.
pub const VARIABLE_PREFIX: &str = "--liturgical";

/// Typography treatment groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Treatment {
    /// Purple, red and rose: heavier headings.
    Solemn,
    /// White: light weights on a pale palette.
    Radiant,
    /// Gold: slightly larger body text.
    Festal,
    /// Green and anything ordinary.
    Ordinary,
}

impl Treatment {
    /// Whether the palette is light enough that text needs the darkest stop.
    #[must_use]
    pub const fn is_light(self) -> bool {
        matches!(self, Self::Radiant | Self::Festal)
    }
}

/// Typography values for one treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeTokens {
    pub treatment: Treatment,
    pub font_size_base: &'static str,
    pub font_weight_normal: &'static str,
    pub font_weight_medium: &'static str,
    pub font_weight_bold: &'static str,
}

/// Fixed typography table, keyed by color.
#[must_use]
pub const fn theme_tokens(color: LiturgicalColor) -> ThemeTokens {
    match color {
        LiturgicalColor::Purple | LiturgicalColor::Red | LiturgicalColor::Rose => ThemeTokens {
            treatment: Treatment::Solemn,
            font_size_base: "16px",
            font_weight_normal: "400",
            font_weight_medium: "600",
            font_weight_bold: "800",
        },
        LiturgicalColor::White => ThemeTokens {
            treatment: Treatment::Radiant,
            font_size_base: "16px",
            font_weight_normal: "300",
            font_weight_medium: "500",
            font_weight_bold: "600",
        },
        LiturgicalColor::Gold => ThemeTokens {
            treatment: Treatment::Festal,
            font_size_base: "17px",
            font_weight_normal: "400",
            font_weight_medium: "500",
            font_weight_bold: "700",
        },
        LiturgicalColor::Green => ThemeTokens {
            treatment: Treatment::Ordinary,
            font_size_base: "16px",
            font_weight_normal: "400",
            font_weight_medium: "500",
            font_weight_bold: "700",
        },
    }
}

/// An ordered batch of CSS custom properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssVariables {
    entries: Vec<(String, String)>,
}

impl CssVariables {
    /// Number of variables a complete theme writes.
    pub const THEME_VARIABLE_COUNT: usize = 17;

    /// Build the full variable batch for a color state.
    #[must_use]
    pub fn for_state(state: &LiturgicalColorState) -> Self {
        let tokens = theme_tokens(state.color);
        let ramp = &state.tailwind;
        let mut entries = Vec::with_capacity(Self::THEME_VARIABLE_COUNT);

        for (stop, color) in ramp.iter() {
            entries.push((format!("{VARIABLE_PREFIX}-{stop}"), color.to_owned()));
        }

        let text = if tokens.treatment.is_light() {
            ramp.darkest()
        } else {
            ramp.lightest()
        };
        entries.push((
            format!("{VARIABLE_PREFIX}-contrast-dark"),
            ramp.darkest().to_owned(),
        ));
        entries.push((
            format!("{VARIABLE_PREFIX}-contrast-light"),
            ramp.lightest().to_owned(),
        ));
        entries.push((format!("{VARIABLE_PREFIX}-contrast-text"), text.to_owned()));

        entries.push((
            format!("{VARIABLE_PREFIX}-font-size-base"),
            tokens.font_size_base.to_owned(),
        ));
        entries.push((
            format!("{VARIABLE_PREFIX}-font-weight-normal"),
            tokens.font_weight_normal.to_owned(),
        ));
        entries.push((
            format!("{VARIABLE_PREFIX}-font-weight-medium"),
            tokens.font_weight_medium.to_owned(),
        ));
        entries.push((
            format!("{VARIABLE_PREFIX}-font-weight-bold"),
            tokens.font_weight_bold.to_owned(),
        ));

        Self { entries }
    }

    /// Look up a variable by full name (including the leading `--`).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate `(name, value)` pairs in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a `:root` stylesheet block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in self.iter() {
            let _ = writeln!(css, "  {name}: {value};");
        }
        css.push_str("}\n");
        css
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn state(color: LiturgicalColor) -> LiturgicalColorState {
        LiturgicalColorState::with_defaults(color, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn test_every_color_sets_every_variable() {
        for color in LiturgicalColor::ALL {
            let vars = CssVariables::for_state(&state(color));
            assert_eq!(vars.len(), CssVariables::THEME_VARIABLE_COUNT, "{color}");

            for stop in crate::SHADE_STOPS {
                assert!(vars.get(&format!("--liturgical-{stop}")).is_some(), "{color} {stop}");
            }
            for name in ["contrast-dark", "contrast-light", "contrast-text"] {
                assert!(vars.get(&format!("--liturgical-{name}")).is_some(), "{color} {name}");
            }
            for name in [
                "font-size-base",
                "font-weight-normal",
                "font-weight-medium",
                "font-weight-bold",
            ] {
                assert!(vars.get(&format!("--liturgical-{name}")).is_some(), "{color} {name}");
            }
        }
    }

    #[test]
    fn test_treatment_groups() {
        for color in [
            LiturgicalColor::Purple,
            LiturgicalColor::Red,
            LiturgicalColor::Rose,
        ] {
            assert_eq!(theme_tokens(color).treatment, Treatment::Solemn);
        }
        assert_eq!(theme_tokens(LiturgicalColor::White).treatment, Treatment::Radiant);
        assert_eq!(theme_tokens(LiturgicalColor::Gold).treatment, Treatment::Festal);
        assert_eq!(theme_tokens(LiturgicalColor::Green).treatment, Treatment::Ordinary);
    }

    #[test]
    fn test_contrast_text_follows_palette_lightness() {
        let white = CssVariables::for_state(&state(LiturgicalColor::White));
        assert_eq!(white.get("--liturgical-contrast-text"), Some("#111827"));

        let purple = CssVariables::for_state(&state(LiturgicalColor::Purple));
        assert_eq!(purple.get("--liturgical-contrast-text"), Some("#FAF5FF"));
        assert_eq!(purple.get("--liturgical-contrast-dark"), Some("#581C87"));
        assert_eq!(purple.get("--liturgical-contrast-light"), Some("#FAF5FF"));
    }

    #[test]
    fn test_render_stylesheet() {
        let css = CssVariables::for_state(&state(LiturgicalColor::Gold)).render();
        assert!(css.starts_with(":root {\n"));
        assert!(css.contains("  --liturgical-500: #F59E0B;\n"));
        assert!(css.contains("  --liturgical-font-size-base: 17px;\n"));
        assert!(css.ends_with("}\n"));
    }
}
