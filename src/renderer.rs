//! GPU side of a frame.
//!
//! [`Renderer`] owns the device and every pass, and turns a
//! [`RenderContext`] into one submitted frame:
//!
//! 1. shadow depth from the sun
//! 2. lit placements sampling that depth
//! 3. sky backdrop, the last opaque draw
//! 4. snow, blended over everything without writing depth

use std::sync::Arc;

use winit::window::Window;

use crate::check_gpu_errors;
use crate::compositor::{DEPTH_FORMAT, FrameUniforms, SceneCompositor};
use crate::config::ViewerConfig;
use crate::context::RenderContext;
use crate::error::ViewerError;
use crate::gpu::GpuContext;
use crate::mesh::Model;
use crate::particles::SnowPass;
use crate::shadow::ShadowPass;
use crate::skybox::SkyboxSelector;

/// Shown only where neither geometry nor sky covers the screen.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

pub struct Renderer {
    pub gpu: GpuContext,
    shadow: ShadowPass,
    compositor: SceneCompositor,
    skybox: SkyboxSelector,
    snow: SnowPass,
    models: Vec<Model>,
}

impl Renderer {
    /// Create the device and every pass, loading all models and both skies.
    pub fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self, ViewerError> {
        let gpu = GpuContext::new(window)?;
        let placements = config.scene.placements.len();
        let asset_root = &config.scene.asset_root;

        let shadow = ShadowPass::new(&gpu, &config.shadow, placements);
        let compositor = SceneCompositor::new(&gpu, &shadow.map, placements);
        let models = compositor.load_models(&gpu, &config.scene.models, asset_root)?;
        let skybox = SkyboxSelector::new(&gpu, &config.skybox, asset_root, DEPTH_FORMAT)?;
        let snow = SnowPass::new(&gpu, &config.snow, DEPTH_FORMAT);

        log::info!(
            "Renderer ready: {} models, {} placements, shadow map {}²",
            models.len(),
            placements,
            shadow.map.resolution
        );

        Ok(Self {
            gpu,
            shadow,
            compositor,
            skybox,
            snow,
            models,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.compositor.ensure_depth_size(&self.gpu);
    }

    /// Encode and submit one frame.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped. Only
    /// running out of memory is an error.
    pub fn render(&mut self, ctx: &RenderContext) -> Result<(), ViewerError> {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(ViewerError::OutOfMemory),
            Err(e) => {
                log::warn!("Skipping frame: {e}");
                return Ok(());
            }
        };

        self.gpu.begin_error_scope();
        self.compositor.ensure_depth_size(&self.gpu);

        let view = ctx.view();
        let proj = ctx.projection();
        let light_space = ctx.light_space();
        let frame = FrameUniforms::new(&view, &proj, &light_space, ctx.lighting_uniforms());

        self.compositor.prepare(&self.gpu, &frame, &ctx.scene, &view);
        self.skybox.prepare(&self.gpu, &view, &proj);

        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.shadow
            .render(&self.gpu, &mut encoder, &ctx.scene, &self.models, &light_space);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.compositor.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.compositor
                .draw(&mut pass, &ctx.scene, &self.models, ctx.render_mode);
            self.skybox.draw(&mut pass, ctx.lighting.sun_enabled());
            self.snow.render(&self.gpu, &mut pass, &ctx.snow, &view, &proj);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        check_gpu_errors!(self.gpu);
        Ok(())
    }
}
