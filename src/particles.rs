//! Falling snow: a fixed-capacity particle pool and its billboard pass.
//!
//! [`SnowPool`] is pure simulation and never allocates after construction.
//! Particles that fall through the floor or drift outside the spawn square
//! are respawned at the top with a fresh velocity. [`SnowPass`] uploads the
//! positions and draws one camera-facing quad per particle, alpha blended,
//! with depth testing on and depth writes off.
//!
//! Both are no-ops while snow is switched off: nothing is integrated,
//! uploaded or drawn.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SnowConfig;
use crate::gpu::GpuContext;
use crate::lighting::Switch;

/// One snowflake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnowParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    /// Seconds since the last respawn. Informational only.
    pub lifetime: f32,
}

/// Spawn volume and recycling limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnowBounds {
    /// Half side of the horizontal spawn square centered on the origin.
    pub half_extent: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Recycle below this height.
    pub floor: f32,
    pub min_fall_speed: f32,
    pub max_fall_speed: f32,
    pub jitter: f32,
}

impl SnowBounds {
    pub fn from_config(config: &SnowConfig) -> Self {
        let (min_height, max_height) = ordered(config.min_height, config.max_height);
        let (min_fall, max_fall) = ordered(config.fall_speed[0], config.fall_speed[1]);
        Self {
            half_extent: config.half_extent.abs(),
            min_height,
            max_height,
            floor: config.floor,
            min_fall_speed: min_fall,
            max_fall_speed: max_fall,
            jitter: config.jitter.abs(),
        }
    }

    /// True when a particle must be recycled.
    pub fn escaped(&self, p: Vec3) -> bool {
        p.y < self.floor || p.x.abs() > self.half_extent || p.z.abs() > self.half_extent
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Fixed-capacity snow simulation.
pub struct SnowPool {
    particles: Vec<SnowParticle>,
    /// Upload staging, one `vec4` per particle, sized once.
    positions: Vec<[f32; 4]>,
    bounds: SnowBounds,
    size: f32,
    rng: ChaCha8Rng,
    pub switch: Switch,
}

impl SnowPool {
    pub fn new(config: &SnowConfig) -> Self {
        let bounds = SnowBounds::from_config(config);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let size = config.point_size;

        let particles: Vec<_> = (0..config.capacity)
            .map(|_| {
                let height = rng.random_range(bounds.min_height..=bounds.max_height);
                spawn(&mut rng, &bounds, height, size)
            })
            .collect();
        let positions = particles
            .iter()
            .map(|p| p.position.extend(p.size).to_array())
            .collect();

        Self {
            particles,
            positions,
            bounds,
            size,
            rng,
            switch: Switch::from_enabled(config.enabled),
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn bounds(&self) -> &SnowBounds {
        &self.bounds
    }

    pub fn is_enabled(&self) -> bool {
        self.switch.is_on()
    }

    pub fn toggle(&mut self) -> Switch {
        self.switch = self.switch.toggled();
        self.switch
    }

    pub fn particles(&self) -> &[SnowParticle] {
        &self.particles
    }

    /// Positions (xyz) and sizes (w) as of the last update.
    pub fn positions(&self) -> &[[f32; 4]] {
        &self.positions
    }

    /// Integrate one step and recycle escaped particles.
    pub fn update(&mut self, dt: f32) {
        if !self.is_enabled() {
            return;
        }

        let top = self.bounds.max_height;
        for (particle, staged) in self.particles.iter_mut().zip(self.positions.iter_mut()) {
            if self.bounds.escaped(particle.position) {
                *particle = spawn(&mut self.rng, &self.bounds, top, self.size);
            } else {
                particle.position += particle.velocity * dt;
                particle.lifetime += dt;
                if self.bounds.escaped(particle.position) {
                    *particle = spawn(&mut self.rng, &self.bounds, top, self.size);
                }
            }
            *staged = particle.position.extend(particle.size).to_array();
        }
    }
}

fn spawn(rng: &mut ChaCha8Rng, bounds: &SnowBounds, height: f32, size: f32) -> SnowParticle {
    let h = bounds.half_extent;
    let j = bounds.jitter;
    SnowParticle {
        position: Vec3::new(rng.random_range(-h..=h), height, rng.random_range(-h..=h)),
        velocity: Vec3::new(
            rng.random_range(-j..=j),
            -rng.random_range(bounds.min_fall_speed..=bounds.max_fall_speed),
            rng.random_range(-j..=j),
        ),
        size,
        lifetime: 0.0,
    }
}

/// Uniforms for the snow billboard shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct SnowUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    color: [f32; 4],
    /// x = quad half-size in world units.
    size: [f32; 4],
}

/// GPU resources for drawing the snow pool.
pub struct SnowPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    color: [f32; 4],
    size: f32,
}

impl SnowPass {
    const INSTANCE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 4]>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x4,
        }],
    };

    pub fn new(gpu: &GpuContext, config: &SnowConfig, depth_format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Snow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/snow.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Uniforms"),
            size: std::mem::size_of::<SnowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let capacity = config.capacity.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Instances"),
            size: (capacity * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Snow Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Snow Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Snow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Snow Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Self::INSTANCE_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Depth write stays off for this pipeline only; opaque pipelines keep writing.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
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
            uniform_buffer,
            bind_group,
            instance_buffer,
            capacity,
            color: config.color,
            size: config.point_size,
        }
    }

    /// Upload this frame's positions and draw them. Does nothing when snow is off.
    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        pool: &SnowPool,
        view: &Mat4,
        proj: &Mat4,
    ) {
        if !pool.is_enabled() || pool.capacity() == 0 {
            return;
        }

        let uniforms = SnowUniforms {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            color: self.color,
            size: [self.size, 0.0, 0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let count = pool.capacity().min(self.capacity);
        gpu.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&pool.positions()[..count]),
        );

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        render_pass.draw(0..6, 0..count as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SnowConfig {
        SnowConfig {
            capacity: 500,
            enabled: true,
            ..SnowConfig::default()
        }
    }

    #[test]
    fn initial_pool_fills_the_spawn_volume() {
        let pool = SnowPool::new(&config());
        assert_eq!(pool.capacity(), 500);
        let b = *pool.bounds();
        for p in pool.particles() {
            assert!(p.position.x.abs() <= b.half_extent);
            assert!(p.position.z.abs() <= b.half_extent);
            assert!((b.min_height..=b.max_height).contains(&p.position.y));
            assert!(p.velocity.y < 0.0);
            assert!(p.velocity.x.abs() <= b.jitter);
        }
    }

    #[test]
    fn escaped_particles_respawn_inside_the_volume() {
        let mut pool = SnowPool::new(&config());
        let b = *pool.bounds();
        {
            let particles = &mut pool.particles;
            particles[0].position = Vec3::new(0.0, b.floor - 5.0, 0.0);
            particles[1].position = Vec3::new(b.half_extent + 10.0, 5.0, 0.0);
            particles[1].velocity = Vec3::new(-100.0, 0.0, 0.0);
            particles[2].position = Vec3::new(0.0, 5.0, -b.half_extent - 1.0);
            particles[2].lifetime = 9.0;
        }
        pool.update(0.016);

        for p in &pool.particles()[..3] {
            assert!(p.position.y >= b.min_height);
            assert!(p.position.x.abs() <= b.half_extent);
            assert!(p.position.z.abs() <= b.half_extent);
            assert_eq!(p.lifetime, 0.0);
        }
    }

    #[test]
    fn capacity_is_constant_over_many_steps() {
        let mut pool = SnowPool::new(&config());
        let before = pool.particles().as_ptr();
        for _ in 0..2000 {
            pool.update(0.05);
        }
        assert_eq!(pool.capacity(), 500);
        assert_eq!(pool.particles().as_ptr(), before);
        let b = *pool.bounds();
        assert!(pool.particles().iter().all(|p| !b.escaped(p.position)));
    }

    #[test]
    fn euler_step_and_lifetime() {
        let mut pool = SnowPool::new(&config());
        let p0 = pool.particles()[7];
        pool.update(0.1);
        let p1 = pool.particles()[7];
        if p1.lifetime > 0.0 {
            assert!((p1.position - (p0.position + p0.velocity * 0.1)).length() < 1e-5);
            assert!((p1.lifetime - 0.1).abs() < 1e-6);
            assert_eq!(pool.positions()[7][1], p1.position.y);
        }
    }

    #[test]
    fn disabled_pool_does_not_move() {
        let mut pool = SnowPool::new(&SnowConfig {
            enabled: false,
            capacity: 50,
            ..SnowConfig::default()
        });
        let before: Vec<_> = pool.particles().to_vec();
        pool.update(1.0);
        assert_eq!(pool.particles(), &before[..]);
    }

    #[test]
    fn same_seed_same_snow() {
        let a = SnowPool::new(&config());
        let b = SnowPool::new(&config());
        assert_eq!(a.particles(), b.particles());
    }
}
