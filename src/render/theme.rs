use crate::foundation::color::Rgb8;
use crate::foundation::error::SlidecastResult;

const DARK_BASE: Rgb8 = Rgb8::new(0x1e, 0x29, 0x3b);
const DARK_ACCENT: Rgb8 = Rgb8::new(0x33, 0x41, 0x55);
const LIGHT_BASE: Rgb8 = Rgb8::new(0xf1, 0xf5, 0xf9);
const LIGHT_ACCENT: Rgb8 = Rgb8::new(0xe2, 0xe8, 0xf0);

/// Per-channel darkening applied to a custom background to derive its accent.
pub const OVERRIDE_ACCENT_DARKEN: u8 = 30;

/// Background theme of the composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Dark (`true`) or light palette.
    pub dark: bool,
    /// Explicit background color replacing the palette base.
    pub background: Option<Rgb8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            dark: true,
            background: None,
        }
    }
}

impl Theme {
    /// Gradient start color.
    pub fn base(&self) -> Rgb8 {
        match (self.background, self.dark) {
            (Some(c), _) => c,
            (None, true) => DARK_BASE,
            (None, false) => LIGHT_BASE,
        }
    }

    /// Gradient end color.
    pub fn accent(&self) -> Rgb8 {
        match (self.background, self.dark) {
            (Some(c), _) => c.darken(OVERRIDE_ACCENT_DARKEN),
            (None, true) => DARK_ACCENT,
            (None, false) => LIGHT_ACCENT,
        }
    }

    /// Set the background override from a `#RRGGBB` string.
    pub fn set_background_hex(&mut self, hex: &str) -> SlidecastResult<()> {
        self.background = Some(Rgb8::from_hex(hex)?);
        Ok(())
    }

    /// Return to the palette default background.
    pub fn reset_background(&mut self) {
        self.background = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/theme.rs"]
mod tests;
