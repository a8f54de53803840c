//! Directional shadow mapping.
//!
//! The sun's depth is rendered into a square [`ShadowMap`] each frame from a
//! fixed orthographic frustum. The frustum depends only on the sun direction
//! and the [`ShadowConfig`], never on the camera, so the same direction always
//! yields the same [`light_space_transform`].
//!
//! The depth pass culls front faces while the main pass culls back faces.
//! Storing the depth of the far side keeps lit surfaces from shadowing
//! themselves at grazing angles.

use std::num::NonZeroU64;

use glam::{Mat4, Vec3};

use crate::config::ShadowConfig;
use crate::gpu::GpuContext;
use crate::mesh::{Model, Vertex3d};
use crate::program::{ObjectUniforms, UniformLayout};
use crate::scene::Scene;

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Projection × view of the sun's frustum.
///
/// The eye sits `light_distance` along the normalized sun direction and looks
/// at the configured target.
pub fn light_space_transform(sun_direction: Vec3, config: &ShadowConfig) -> Mat4 {
    let direction = sun_direction.try_normalize().unwrap_or(Vec3::Y);
    let eye = direction * config.light_distance;
    // Looking straight down the Y axis needs a different up vector.
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(eye, Vec3::from_array(config.target), up);

    let h = config.half_extent;
    let projection = Mat4::orthographic_rh(-h, h, -h, h, config.near, config.far);
    projection * view
}

/// The depth texture sampled by the main pass.
pub struct ShadowMap {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub resolution: u32,
}

impl ShadowMap {
    pub fn new(gpu: &GpuContext, resolution: u32) -> Self {
        let max = gpu.device.limits().max_texture_dimension_2d;
        let resolution = if resolution > max {
            log::warn!("Shadow map {resolution}² exceeds the device limit, using {max}²");
            max
        } else {
            resolution.max(1)
        };

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Outside the frustum the border reads as the farthest depth, so
        // nothing there is ever in shadow. Without border support the shader
        // performs the same test itself.
        let (address_mode, border_color) = if gpu
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
        {
            (
                wgpu::AddressMode::ClampToBorder,
                Some(wgpu::SamplerBorderColor::OpaqueWhite),
            )
        } else {
            log::warn!("Clamp-to-border unavailable, shadow map clamps to edge");
            (wgpu::AddressMode::ClampToEdge, None)
        };

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            border_color,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            resolution,
        }
    }
}

/// Renders every placement's depth from the sun.
pub struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    objects: ObjectUniforms,
    pub map: ShadowMap,
}

impl ShadowPass {
    pub fn new(gpu: &GpuContext, config: &ShadowConfig, placements: usize) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/depth.wgsl").into()),
        });

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Space Uniforms"),
            size: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Space Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Space Bind Group"),
            layout: &light_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });

        let object_layout = object_bind_group_layout(gpu, UniformLayout::DEPTH, "Depth");
        let objects = ObjectUniforms::new(UniformLayout::DEPTH, gpu.uniform_alignment(), placements);
        let (object_buffer, object_bind_group) =
            object_buffer(gpu, &object_layout, &objects, "Depth");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Pipeline Layout"),
            bind_group_layouts: &[&light_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Depth Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Front),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            light_buffer,
            light_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            objects,
            map: ShadowMap::new(gpu, config.resolution),
        }
    }

    /// Clear the shadow map and draw every placement into it.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        models: &[Model],
        light_space: &Mat4,
    ) {
        gpu.queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::cast_slice(&light_space.to_cols_array()),
        );

        // The depth layout has no normal slot, so the view is never read.
        self.objects.write_scene(scene, &Mat4::IDENTITY);
        if self.objects.as_bytes().len() as u64 > self.object_buffer.size() {
            let (buffer, bind_group) =
                object_buffer(gpu, &self.object_layout, &self.objects, "Depth");
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
        }
        gpu.queue
            .write_buffer(&self.object_buffer, 0, self.objects.as_bytes());

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.light_bind_group, &[]);
        for (index, placement) in scene.placements.iter().enumerate() {
            let Some(model) = models.get(placement.model.0) else {
                continue;
            };
            pass.set_bind_group(1, &self.object_bind_group, &[self.objects.offset(index)]);
            model.draw(&mut pass, None);
        }
    }
}

/// Layout for a per-object block addressed with a dynamic offset.
pub(crate) fn object_bind_group_layout(
    gpu: &GpuContext,
    layout: UniformLayout,
    label: &str,
) -> wgpu::BindGroupLayout {
    gpu.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Object Bind Group Layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(layout.size as u64),
                },
                count: None,
            }],
        })
}

/// Buffer sized for every block in `objects`, bound one block at a time.
pub(crate) fn object_buffer(
    gpu: &GpuContext,
    bind_group_layout: &wgpu::BindGroupLayout,
    objects: &ObjectUniforms,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} Object Uniforms")),
        size: objects.as_bytes().len() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} Object Bind Group")),
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(objects.layout().size as u64),
            }),
        }],
    });

    (buffer, bind_group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn same_direction_gives_bit_identical_transform() {
        let config = ShadowConfig::default();
        let a = light_space_transform(Vec3::new(0.0, 20.0, 20.0), &config);
        let b = light_space_transform(Vec3::new(0.0, 20.0, 20.0), &config);
        assert_eq!(a.to_cols_array(), b.to_cols_array());
    }

    #[test]
    fn direction_length_does_not_matter() {
        let config = ShadowConfig::default();
        let a = light_space_transform(Vec3::new(0.0, 20.0, 20.0), &config);
        let b = light_space_transform(Vec3::new(0.0, 1.0, 1.0), &config);
        assert!(a.abs_diff_eq(b, 1e-5));
    }

    #[test]
    fn target_projects_to_frustum_center() {
        let config = ShadowConfig::default();
        let m = light_space_transform(Vec3::new(0.0, 20.0, 20.0), &config);
        let clip = m * Vec4::new(0.0, 0.0, 50.0, 1.0);
        assert!(clip.x.abs() < 1e-4);
        assert!(clip.y.abs() < 1e-4);
        // inside [near, far]
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn vertical_sun_stays_finite() {
        let m = light_space_transform(Vec3::Y, &ShadowConfig::default());
        assert!(m.is_finite());
        let zero = light_space_transform(Vec3::ZERO, &ShadowConfig::default());
        assert!(zero.is_finite());
    }

    #[test]
    fn point_beyond_half_extent_leaves_the_frustum() {
        let config = ShadowConfig::default();
        let m = light_space_transform(Vec3::new(0.0, 20.0, 20.0), &config);
        let clip = m * Vec4::new(200.0, 0.0, 50.0, 1.0);
        assert!(clip.x > 1.0);
    }
}
