//! GPU ray-tracing dispatch.
//!
//! [`RayDispatcher`] owns one compute device, one queue, and one compiled
//! kernel specialized to a fixed frame size. Per frame it streams the
//! camera direction into a device buffer, launches the kernel over the 2D
//! pixel grid, and blocks until the color buffer is read back into a
//! caller-owned [`dawnfell_render::Surface`].

mod dispatcher;

pub use dispatcher::{GpuError, RayDispatcher, KERNEL_ENTRY_POINT, KERNEL_PATH};

pub fn crate_info() -> &'static str {
    "dawnfell-render-gpu v0.1.0"
}
