//! CPU-side rendering support types.
//!
//! [`Surface`] is the caller-owned pixel buffer render backends write
//! into; [`Camera`] produces the per-frame view direction they consume.

mod camera;
mod surface;

pub use camera::Camera;
pub use surface::Surface;

pub fn crate_info() -> &'static str {
    "dawnfell-render v0.1.0"
}
