//! Main scene pass: lit, textured, shadowed placements.
//!
//! # Bind groups
//!
//! - **Group 0**: frame uniforms (view, projection, light space, lights and
//!   fog) at binding 0, the shadow map at binding 1 and its comparison
//!   sampler at binding 2
//! - **Group 1**: per-placement model and normal matrices, one aligned block
//!   per placement selected with a dynamic offset
//! - **Group 2**: the diffuse texture and sampler of the part being drawn
//!
//! One pipeline is built per [`RenderMode`] the device supports. A mode whose
//! polygon-mode feature is missing is drawn with the solid pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::AssetError;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::lighting::LightingUniforms;
use crate::mesh::{Model, ModelPart, Vertex3d};
use crate::program::{ObjectUniforms, UniformLayout};
use crate::render_mode::RenderMode;
use crate::scene::{ModelSpec, Scene};
use crate::shadow::{ShadowMap, object_bind_group_layout, object_buffer};
use crate::texture::Texture;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bind group index of the per-part diffuse texture.
const MATERIAL_GROUP: u32 = 2;

/// Per-frame uniforms of the main pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    /// World → light clip space, for shadow lookups.
    pub light_space: [[f32; 4]; 4],
    pub lighting: LightingUniforms,
}

impl FrameUniforms {
    pub fn new(view: &Mat4, proj: &Mat4, light_space: &Mat4, lighting: LightingUniforms) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_space: light_space.to_cols_array_2d(),
            lighting,
        }
    }
}

/// Draws every placement with lighting, fog and shadows.
pub struct SceneCompositor {
    pipelines: [Option<wgpu::RenderPipeline>; 3],
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    objects: ObjectUniforms,
    material_layout: wgpu::BindGroupLayout,
    default_texture: Texture,
    #[allow(dead_code)]
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl SceneCompositor {
    pub fn new(gpu: &GpuContext, shadow_map: &ShadowMap, placements: usize) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        // Frame uniforms + shadow map (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });

        // Per-placement matrices (group 1)
        let object_layout = object_bind_group_layout(gpu, UniformLayout::LIT, "Lit");
        let objects = ObjectUniforms::new(UniformLayout::LIT, gpu.uniform_alignment(), placements);
        let (object_buffer, object_bind_group) = object_buffer(gpu, &object_layout, &objects, "Lit");

        // Diffuse texture (group 2)
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let features = gpu.features();
        let pipelines = RenderMode::ALL.map(|mode| {
            if !features.contains(mode.required_feature()) {
                log::warn!("{mode:?} rendering unsupported by this adapter, drawing solid instead");
                return None;
            }
            Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("Scene Pipeline ({mode:?})")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
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
                    cull_mode: Some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    polygon_mode: mode.polygon_mode(),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            }))
        });

        let default_texture = Texture::white(gpu);
        let (depth_texture, depth_view) = Self::create_depth_texture(gpu);

        Self {
            pipelines,
            frame_buffer,
            frame_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            objects,
            material_layout,
            default_texture,
            depth_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    /// Load every model in the table, in order, so `ModelId`s index the result.
    ///
    /// Textures shared between parts are uploaded once. A diffuse texture that
    /// fails to load is replaced by plain white.
    pub fn load_models(
        &self,
        gpu: &GpuContext,
        models: &[ModelSpec],
        asset_root: &Path,
    ) -> Result<Vec<Model>, AssetError> {
        let mut textures: HashMap<PathBuf, Texture> = HashMap::new();
        let mut loaded = Vec::with_capacity(models.len());

        for spec in models {
            let path = asset_root.join(&spec.path);
            let data = geometry::load_model(&path)?;

            let mut parts = Vec::with_capacity(data.len());
            for part in data {
                let texture = match part.diffuse_texture {
                    Some(texture_path) => {
                        if !textures.contains_key(&texture_path) {
                            match Texture::from_file(gpu, &texture_path) {
                                Ok(texture) => {
                                    textures.insert(texture_path.clone(), texture);
                                }
                                Err(e) => log::warn!("{e}; using white"),
                            }
                        }
                        textures.get(&texture_path).unwrap_or(&self.default_texture)
                    }
                    None => &self.default_texture,
                };

                parts.push(ModelPart {
                    mesh: part.geometry.upload(gpu),
                    material: self.material_bind_group(gpu, texture),
                });
            }

            log::info!("Loaded model '{}' ({} parts)", spec.name, parts.len());
            loaded.push(Model {
                name: spec.name.clone(),
                parts,
            });
        }

        Ok(loaded)
    }

    /// Bind group for a diffuse texture at group 2.
    pub fn material_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_depth_texture(gpu: &GpuContext) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreate the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            let (texture, view) = Self::create_depth_texture(gpu);
            self.depth_texture = texture;
            self.depth_view = view;
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Depth attachment shared by the scene, sky and snow draws.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    fn pipeline(&self, mode: RenderMode) -> Option<&wgpu::RenderPipeline> {
        self.pipelines[mode.index()]
            .as_ref()
            .or(self.pipelines[RenderMode::Solid.index()].as_ref())
    }

    /// Upload this frame's uniforms. Call before the render pass begins.
    pub fn prepare(&mut self, gpu: &GpuContext, frame: &FrameUniforms, scene: &Scene, view: &Mat4) {
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[*frame]));

        self.objects.write_scene(scene, view);
        if self.objects.as_bytes().len() as u64 > self.object_buffer.size() {
            let (buffer, bind_group) = object_buffer(gpu, &self.object_layout, &self.objects, "Lit");
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
        }
        gpu.queue
            .write_buffer(&self.object_buffer, 0, self.objects.as_bytes());
    }

    /// Draw every placement with the pipeline for `mode`.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass,
        scene: &Scene,
        models: &[Model],
        mode: RenderMode,
    ) {
        let Some(pipeline) = self.pipeline(mode) else {
            return;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (index, placement) in scene.placements.iter().enumerate() {
            let Some(model) = models.get(placement.model.0) else {
                continue;
            };
            render_pass.set_bind_group(1, &self.object_bind_group, &[self.objects.offset(index)]);
            model.draw(render_pass, Some(MATERIAL_GROUP));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 3 * 64 + 8 * 16);
    }

    #[test]
    fn frame_uniforms_keep_matrix_columns() {
        let view = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let frame = FrameUniforms::new(
            &view,
            &Mat4::IDENTITY,
            &Mat4::IDENTITY,
            LightingUniforms::default(),
        );
        assert_eq!(frame.view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(frame.proj[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
