//! Core GPU context and device management.
//!
//! [`GpuContext`] holds the wgpu surface, device, queue and surface
//! configuration, and is passed by reference to every render pass.
//!
//! # Optional features
//!
//! Wireframe and point rendering need `POLYGON_MODE_LINE` and
//! `POLYGON_MODE_POINT`; the shadow sampler prefers
//! `ADDRESS_MODE_CLAMP_TO_BORDER`. Each is requested only when the adapter
//! offers it, and [`GpuContext::features`] reports what was granted.
//!
//! # Error polling
//!
//! Validation errors are captured in an error scope opened at the start of a
//! frame and checked at the end with [`check_gpu_errors!`](crate::check_gpu_errors).
//! They are logged with the call site and never interrupt the frame loop.

use std::sync::Arc;
use winit::window::Window;

use crate::error::ViewerError;

/// Features used when available.
pub const OPTIONAL_FEATURES: wgpu::Features = wgpu::Features::POLYGON_MODE_LINE
    .union(wgpu::Features::POLYGON_MODE_POINT)
    .union(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);

/// Log any GPU validation error captured since the frame began, tagged with
/// the current file and line.
#[macro_export]
macro_rules! check_gpu_errors {
    ($gpu:expr) => {
        $gpu.poll_errors(file!(), line!())
    };
}

/// Core GPU context holding wgpu resources.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// Creates the instance, surface, adapter, device and queue, then
    /// configures the surface with an sRGB format and Fifo present mode.
    pub fn new(window: Arc<Window>) -> Result<Self, ViewerError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let available = adapter.features();
        let required_features = available & OPTIONAL_FEATURES;
        let missing = OPTIONAL_FEATURES - required_features;
        if !missing.is_empty() {
            log::warn!("Adapter lacks optional features {missing:?}; falling back where needed");
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Winterscape Device"),
            required_features,
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(ViewerError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(ViewerError::UnsupportedSurface)?;
        log::info!("Surface format {surface_format:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Ignores zero-sized dimensions (which occur while minimized).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface with its current size, after it was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Features granted to the device.
    pub fn features(&self) -> wgpu::Features {
        self.device.features()
    }

    /// Required alignment of dynamic uniform offsets.
    pub fn uniform_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }

    /// Start capturing validation errors for this frame.
    pub fn begin_error_scope(&self) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
    }

    /// Close the frame's error scope and log whatever it caught.
    ///
    /// Returns true if an error was logged. Use through [`check_gpu_errors!`](crate::check_gpu_errors).
    pub fn poll_errors(&self, file: &str, line: u32) -> bool {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => {
                log::error!("GPU error | {file} ({line}): {error}");
                true
            }
            None => false,
        }
    }
}
