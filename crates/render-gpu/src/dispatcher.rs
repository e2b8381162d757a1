use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use dawnfell_render::Surface;
use glam::Vec3;

/// Default path of the ray-tracing kernel source, relative to the working
/// directory.
pub const KERNEL_PATH: &str = "data/kernels/kernel.wgsl";

/// Entry point the kernel must expose.
pub const KERNEL_ENTRY_POINT: &str = "ray_trace";

/// Workgroup edge length the kernel is written for, in both dimensions.
const WORKGROUP_SIZE: u32 = 8;

/// Errors from dispatcher construction and per-frame operation.
///
/// All are fatal to the operation that raised them; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no compute-capable adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(String),
    #[error("failed to read kernel source {path}: {source}")]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("kernel build failed:\n{log}")]
    KernelBuild { log: String },
    #[error(
        "destination surface is {actual_width}x{actual_height}, \
         dispatcher renders {width}x{height}"
    )]
    SurfaceSizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("{operation} failed: {detail}")]
    Device {
        operation: &'static str,
        detail: String,
    },
}

/// Camera direction as uploaded to kernel binding 0.
///
/// Padded to 16 bytes to satisfy uniform buffer alignment.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DirectionUniform {
    direction: [f32; 3],
    _pad: f32,
}

/// Prepend frame-size specialization constants to the kernel source.
///
/// The kernel references `SCREEN_WIDTH`, `SCREEN_HEIGHT`, and
/// `ASPECT_RATIO` without defining them; the dispatcher supplies them for
/// the fixed frame size it was built with.
fn specialized_source(width: u32, height: u32, source: &str) -> String {
    let aspect = width as f32 / height as f32;
    format!(
        "const SCREEN_WIDTH: u32 = {width}u;\n\
         const SCREEN_HEIGHT: u32 = {height}u;\n\
         const ASPECT_RATIO: f32 = {aspect:?}f;\n\
         {source}"
    )
}

/// Workgroups needed to cover `size` pixels along one axis.
fn dispatch_extent(size: u32) -> u32 {
    size.div_ceil(WORKGROUP_SIZE)
}

fn check_surface_size(width: u32, height: u32, dst: &Surface) -> Result<(), GpuError> {
    if dst.width() != width || dst.height() != height {
        return Err(GpuError::SurfaceSizeMismatch {
            width,
            height,
            actual_width: dst.width(),
            actual_height: dst.height(),
        });
    }
    Ok(())
}

/// GPU ray-tracing dispatcher with frame dimensions fixed at construction.
///
/// Owns the device, queue, compiled kernel, and all device buffers for its
/// whole lifetime; dropping the dispatcher releases them. The host side is
/// single-threaded and every operation blocks until the device is done, so
/// a frame is fully on the CPU when [`RayDispatcher::render`] returns.
pub struct RayDispatcher {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    direction_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl RayDispatcher {
    /// Build the full dispatch state: adapter, device, specialized kernel,
    /// and both device buffers. Construction is linear with no retry; the
    /// first failing step aborts with a descriptive error.
    pub fn new(width: u32, height: u32, kernel_path: impl AsRef<Path>) -> Result<Self, GpuError> {
        assert!(width > 0, "frame width must be positive");
        assert!(height > 0, "frame height must be positive");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "selected adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ray_dispatch_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| GpuError::RequestDevice(e.to_string()))?;

        let kernel_path = kernel_path.as_ref();
        let raw_source =
            std::fs::read_to_string(kernel_path).map_err(|source| GpuError::KernelSource {
                path: kernel_path.to_path_buf(),
                source,
            })?;
        let source = specialized_source(width, height, &raw_source);

        // Compile inside a validation scope so the compiler's diagnostics
        // become the error detail rather than an uncaught device error.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ray_kernel"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::KernelBuild {
                log: error.to_string(),
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ray_bind_group_layout"),
            entries: &[
                // Slot 0: camera direction.
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Slot 1: output color buffer.
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ray_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("ray_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(KERNEL_ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Device {
                operation: "create compute pipeline",
                detail: error.to_string(),
            });
        }

        let direction_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("direction_buffer"),
            size: std::mem::size_of::<DirectionUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let color_bytes = (width as u64) * (height as u64) * 4;
        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("color_buffer"),
            size: color_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("color_staging_buffer"),
            size: color_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ray_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: direction_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: color_buffer.as_entire_binding(),
                },
            ],
        });

        tracing::debug!(width, height, color_bytes, "dispatcher ready");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group,
            direction_buffer,
            color_buffer,
            staging_buffer,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stream a new camera direction into the kernel's slot-0 buffer.
    ///
    /// The write is blocking: the transfer is submitted and the device
    /// polled until it completes, so the next [`RayDispatcher::render`]
    /// sees this direction. The bind group keeps referencing the same
    /// buffer object, so no rebind is needed between frames.
    pub fn update_direction(&mut self, direction: Vec3) -> Result<(), GpuError> {
        let uniform = DirectionUniform {
            direction: direction.to_array(),
            _pad: 0.0,
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.queue
            .write_buffer(&self.direction_buffer, 0, bytemuck::bytes_of(&uniform));
        self.queue.submit(std::iter::empty());
        let _ = self.device.poll(wgpu::Maintain::Wait);
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::Device {
                operation: "write direction buffer",
                detail: error.to_string(),
            });
        }
        Ok(())
    }

    /// Launch the kernel over the full `width x height` grid and read the
    /// color buffer back into `dst`. Synchronous end-to-end: compute and
    /// readback never overlap, and the frame is complete on return.
    pub fn render(&mut self, dst: &mut Surface) -> Result<(), GpuError> {
        check_surface_size(self.width, self.height, dst)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ray_dispatch_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("ray_trace_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(
                dispatch_extent(self.width),
                dispatch_extent(self.height),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(
            &self.color_buffer,
            0,
            &self.staging_buffer,
            0,
            self.color_buffer.size(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        let _ = self.device.poll(wgpu::Maintain::Wait);

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::Device {
                operation: "kernel dispatch",
                detail: error.to_string(),
            });
        }

        // Blocking device-to-host read of the whole frame.
        let buffer_slice = self.staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| GpuError::Device {
                operation: "map staging buffer",
                detail: "map callback dropped".to_string(),
            })?
            .map_err(|e| GpuError::Device {
                operation: "map staging buffer",
                detail: e.to_string(),
            })?;

        {
            let mapped = buffer_slice.get_mapped_range();
            dst.as_bytes_mut().copy_from_slice(&mapped);
        }
        self.staging_buffer.unmap();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialized_source_prepends_constants() {
        let source = specialized_source(640, 360, "@compute fn ray_trace() {}");
        let lines: Vec<&str> = source.lines().collect();
        assert_eq!(lines[0], "const SCREEN_WIDTH: u32 = 640u;");
        assert_eq!(lines[1], "const SCREEN_HEIGHT: u32 = 360u;");
        assert!(lines[2].starts_with("const ASPECT_RATIO: f32 = 1.777"));
        assert!(lines[2].ends_with("f;"));
        assert_eq!(lines[3], "@compute fn ray_trace() {}");
    }

    #[test]
    fn aspect_ratio_is_a_float_literal() {
        // A 2:1 frame must still produce "2.0f", not a bare "2f" the
        // compiler would reject as an integer-looking literal.
        let source = specialized_source(200, 100, "");
        assert!(source.contains("const ASPECT_RATIO: f32 = 2.0f;"));
    }

    #[test]
    fn dispatch_extent_covers_whole_frame() {
        assert_eq!(dispatch_extent(640), 80);
        assert_eq!(dispatch_extent(641), 81);
        assert_eq!(dispatch_extent(1), 1);
        assert_eq!(dispatch_extent(8), 1);
        assert_eq!(dispatch_extent(9), 2);
    }

    #[test]
    fn surface_size_mismatch_is_rejected() {
        let surface = Surface::new(320, 200);
        assert!(check_surface_size(320, 200, &surface).is_ok());

        let err = check_surface_size(640, 360, &surface).unwrap_err();
        match err {
            GpuError::SurfaceSizeMismatch {
                width,
                height,
                actual_width,
                actual_height,
            } => {
                assert_eq!((width, height), (640, 360));
                assert_eq!((actual_width, actual_height), (320, 200));
            }
            other => panic!("expected SurfaceSizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn direction_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<DirectionUniform>(), 16);
    }
}
