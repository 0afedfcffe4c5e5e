use std::fmt;

/// Output geometry and bitrate fixed for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Target video bitrate in bits per second.
    pub bitrate: u64,
}

/// Recording quality preset.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 1280×720 at 3 Mbps.
    Hd,
    /// 1920×1080 at 5 Mbps.
    #[default]
    Fhd,
    /// 3840×2160 at 15 Mbps.
    #[serde(rename = "4k")]
    #[value(name = "4k")]
    Uhd4k,
}

impl Quality {
    /// Every preset, smallest first.
    pub const ALL: [Self; 3] = [Self::Hd, Self::Fhd, Self::Uhd4k];

    /// Geometry of this preset.
    pub fn geometry(self) -> Geometry {
        let (width, height, bitrate) = match self {
            Self::Hd => (1280, 720, 3_000_000),
            Self::Fhd => (1920, 1080, 5_000_000),
            Self::Uhd4k => (3840, 2160, 15_000_000),
        };
        Geometry {
            width,
            height,
            bitrate,
        }
    }

    /// Short label used in file names and the UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hd => "HD",
            Self::Fhd => "FHD",
            Self::Uhd4k => "4K",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/quality.rs"]
mod tests;
