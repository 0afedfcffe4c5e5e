//! WebM codec negotiation against the encoders a local `ffmpeg` build provides.

use std::collections::HashSet;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Video codecs usable in WebM, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    /// VP9 via `libvpx-vp9`.
    Vp9,
    /// Baseline VP8 via `libvpx`.
    Vp8,
}

impl VideoCodec {
    /// Preference order.
    pub const PREFERENCE: [Self; 2] = [Self::Vp9, Self::Vp8];

    /// `ffmpeg` encoder name.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
        }
    }

    fn mime(self) -> &'static str {
        match self {
            Self::Vp9 => "vp9",
            Self::Vp8 => "vp8",
        }
    }
}

/// Audio codecs usable in WebM, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    /// Opus via `libopus`.
    Opus,
    /// Vorbis via `libvorbis`.
    Vorbis,
}

impl AudioCodec {
    /// Preference order.
    pub const PREFERENCE: [Self; 2] = [Self::Opus, Self::Vorbis];

    /// `ffmpeg` encoder name.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
        }
    }

    fn mime(self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
        }
    }
}

/// Result of [`negotiate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecChoice {
    /// Selected video codec.
    pub video: VideoCodec,
    /// Selected audio codec; `None` when audio was not requested or nothing usable exists.
    pub audio: Option<AudioCodec>,
}

impl CodecChoice {
    /// MIME type of the produced container, e.g. `video/webm;codecs=vp9,opus`.
    pub fn mime_type(&self) -> String {
        match self.audio {
            Some(a) => format!("video/webm;codecs={},{}", self.video.mime(), a.mime()),
            None => format!("video/webm;codecs={}", self.video.mime()),
        }
    }
}

/// Extract encoder names from `ffmpeg -encoders` output.
///
/// Entries follow a `------` separator line; each is `<flags> <name> <description>`.
pub fn parse_encoders(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_owned)
        .collect()
}

/// Pick the best video codec (and audio codec when `want_audio`) among `available`.
pub fn negotiate(available: &HashSet<String>, want_audio: bool) -> SlidecastResult<CodecChoice> {
    let video = VideoCodec::PREFERENCE
        .into_iter()
        .find(|c| available.contains(c.encoder()))
        .ok_or_else(|| {
            SlidecastError::encoder("no supported WebM video encoder (libvpx-vp9 or libvpx)")
        })?;
    let audio = if want_audio {
        AudioCodec::PREFERENCE
            .into_iter()
            .find(|c| available.contains(c.encoder()))
    } else {
        None
    };
    tracing::debug!(video = video.encoder(), audio = ?audio.map(AudioCodec::encoder), "negotiated codecs");
    Ok(CodecChoice { video, audio })
}

/// Run `<program> -hide_banner -encoders` and parse the result.
pub fn probe_encoders(program: &Path) -> SlidecastResult<HashSet<String>> {
    let out = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            SlidecastError::encoder(format!(
                "failed to run '{}' to list encoders: {e}",
                program.display()
            ))
        })?;
    if !out.status.success() {
        return Err(SlidecastError::encoder(format!(
            "'{}' -encoders exited with status {}",
            program.display(),
            out.status
        )));
    }
    Ok(parse_encoders(&String::from_utf8_lossy(&out.stdout)))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
