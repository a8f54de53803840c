//! Day and night sky backdrops.
//!
//! Both cubemaps stay loaded for the whole run. Which one is drawn follows
//! the sun switch with a hard cut; there is no blending between them.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::config::SkyboxConfig;
use crate::error::AssetError;
use crate::gpu::GpuContext;
use crate::texture::Cubemap;

/// Which backdrop is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sky {
    Day,
    Night,
}

impl Sky {
    pub fn for_sun(sun_enabled: bool) -> Self {
        if sun_enabled { Self::Day } else { Self::Night }
    }
}

/// Projection × view with the translation removed, so the sky never moves
/// relative to the camera.
pub fn sky_view_projection(view: &Mat4, proj: &Mat4) -> Mat4 {
    *proj * Mat4::from_mat3(Mat3::from_mat4(*view))
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct SkyUniforms {
    view_proj: [[f32; 4]; 4],
}

/// Draws the backdrop matching the sun state.
pub struct SkyboxSelector {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    day: wgpu::BindGroup,
    night: wgpu::BindGroup,
}

impl SkyboxSelector {
    pub fn new(
        gpu: &GpuContext,
        config: &SkyboxConfig,
        asset_root: &Path,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, AssetError> {
        let device = &gpu.device;

        let faces = |list: &[std::path::PathBuf]| -> Vec<std::path::PathBuf> {
            list.iter().map(|face| asset_root.join(face)).collect()
        };
        let day_map = Cubemap::from_files(gpu, faces(&config.day).as_slice(), "Day Sky")?;
        let night_map = Cubemap::from_files(gpu, faces(&config.night).as_slice(), "Night Sky")?;
        log::info!(
            "Loaded sky cubemaps (day {}², night {}²)",
            day_map.size,
            night_map.size
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Skybox Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/skybox.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Skybox Uniforms"),
            size: std::mem::size_of::<SkyUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = |map: &Cubemap, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        };
        let day = bind_group(&day_map, "Day Sky Bind Group");
        let night = bind_group(&night_map, "Night Sky Bind Group");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Sky depth is exactly 1.0; it fills only what geometry left clear.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            day,
            night,
        })
    }

    /// Upload the rotation-only transform. Call before the render pass begins.
    pub fn prepare(&self, gpu: &GpuContext, view: &Mat4, proj: &Mat4) {
        let uniforms = SkyUniforms {
            view_proj: sky_view_projection(view, proj).to_cols_array_2d(),
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Draw the backdrop for the current sun state.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass, sun_enabled: bool) {
        let bind_group = match Sky::for_sun(sun_enabled) {
            Sky::Day => &self.day,
            Sky::Night => &self.night,
        };
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..36, 0..1);
    }
}
