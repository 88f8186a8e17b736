//! Project colours.
//!
//! Each project gets a hue from a fixed eight-entry palette, chosen by the
//! order in which the project first appears in the log. Projects whose
//! indices are congruent modulo eight share a colour.

use std::fmt;

use serde::Serialize;

use crate::types::ProjectKey;

/// Palette hues: red, orange, yellow, green, cyan, blue, purple, magenta.
pub const PALETTE: [u16; 8] = [0, 30, 60, 120, 180, 220, 260, 300];

/// Saturation shared by every project colour, in percent.
const SATURATION: u8 = 55;

/// Lightness of the normal variant, in percent.
const BASE_LIGHTNESS: u8 = 45;

/// Lightness of the high-intensity variant, in percent.
const HIGH_LIGHTNESS: u8 = 55;

/// A colour in HSL space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Hsl {
    /// Hue in degrees, `0..360`.
    pub hue: u16,
    /// Saturation in percent.
    pub saturation: u8,
    /// Lightness in percent.
    pub lightness: u8,
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

/// Normal colour for the project at `index` in first-appearance order.
#[must_use]
pub fn base_color(index: usize) -> Hsl {
    Hsl {
        hue: PALETTE[index % PALETTE.len()],
        saturation: SATURATION,
        lightness: BASE_LIGHTNESS,
    }
}

/// Lighter colour used on high-intensity days.
#[must_use]
pub fn high_intensity_color(index: usize) -> Hsl {
    Hsl {
        lightness: HIGH_LIGHTNESS,
        ..base_color(index)
    }
}

/// Colour lookup for a fixed first-appearance ordering of projects.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    order: Vec<ProjectKey>,
}

impl ColorAssigner {
    /// Creates an assigner for projects listed in first-appearance order.
    #[must_use]
    pub fn new(order: Vec<ProjectKey>) -> Self {
        Self { order }
    }

    /// Projects in first-appearance order.
    #[must_use]
    pub fn projects(&self) -> &[ProjectKey] {
        &self.order
    }

    /// First-appearance index of `project`.
    #[must_use]
    pub fn index_of(&self, project: &str) -> Option<usize> {
        self.order.iter().position(|p| p == project)
    }

    /// Normal colour for `project`; unknown projects take the next free index.
    #[must_use]
    pub fn base(&self, project: &str) -> Hsl {
        base_color(self.index_or_next(project))
    }

    /// High-intensity colour for `project`.
    #[must_use]
    pub fn high(&self, project: &str) -> Hsl {
        high_intensity_color(self.index_or_next(project))
    }

    fn index_or_next(&self, project: &str) -> usize {
        self.index_of(project).unwrap_or(self.order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_and_high_differ_only_in_lightness() {
        let base = base_color(3);
        let high = high_intensity_color(3);

        assert_eq!(base.hue, 120);
        assert_eq!(high.hue, 120);
        assert_eq!(base.saturation, high.saturation);
        assert_eq!(base.lightness, 45);
        assert_eq!(high.lightness, 55);
    }

    #[test]
    fn palette_cycles_after_eight() {
        assert_eq!(base_color(0), base_color(8));
        assert_eq!(high_intensity_color(1), high_intensity_color(9));
        assert_ne!(base_color(0), base_color(1));
    }

    #[test]
    fn first_eight_projects_are_distinct() {
        let hues: std::collections::HashSet<u16> = (0..8).map(|i| base_color(i).hue).collect();
        assert_eq!(hues.len(), 8);
    }

    #[test]
    fn display_formats_css_hsl() {
        assert_eq!(base_color(0).to_string(), "hsl(0, 55%, 45%)");
        assert_eq!(high_intensity_color(5).to_string(), "hsl(220, 55%, 55%)");
    }

    #[test]
    fn assigner_uses_first_appearance_order() {
        let assigner = ColorAssigner::new(vec!["beta".to_string(), "alpha".to_string()]);

        assert_eq!(assigner.index_of("beta"), Some(0));
        assert_eq!(assigner.base("beta"), base_color(0));
        assert_eq!(assigner.base("alpha"), base_color(1));
        assert_eq!(assigner.high("alpha"), high_intensity_color(1));
        assert_eq!(assigner.base("unseen"), base_color(2));
    }
}
