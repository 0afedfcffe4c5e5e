//! Documents as pre-rasterized pages.

/// Document rasterization backends.
pub mod raster;
/// Page storage and the active-page cursor.
pub mod store;
