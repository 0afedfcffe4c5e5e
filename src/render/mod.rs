//! Frame composition on the CPU.
//!
//! The compositor draws one [`compositor::CompositeState`] snapshot per tick into a reused
//! premultiplied RGBA8 buffer.

/// Frame buffer type shared with encoder sinks.
pub mod backend;
/// Layered compositor for slides, camera and recording overlay.
pub mod compositor;
/// Panel geometry and animation curves.
pub mod layout;
pub(crate) mod paint;
pub(crate) mod text;
/// Background theme.
pub mod theme;
