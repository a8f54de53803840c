use std::path::Path;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// 1×1 white texture for untextured materials.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "Default White Texture")
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &Path) -> Result<Self, AssetError> {
        let img = load_rgba(path)?;
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, &path.to_string_lossy()))
    }
}

/// Decode an image file to RGBA8.
pub(crate) fn load_rgba(path: &Path) -> Result<image::RgbaImage, AssetError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// A six-face cube texture for sky backdrops.
#[derive(Debug)]
pub struct Cubemap {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub size: u32,
}

impl Cubemap {
    /// Load six faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn from_files<P: AsRef<Path>>(
        gpu: &GpuContext,
        faces: &[P],
        label: &str,
    ) -> Result<Self, AssetError> {
        if faces.len() != 6 {
            return Err(AssetError::CubemapSize(format!("{} faces", faces.len())));
        }

        let images = faces
            .iter()
            .map(|face| load_rgba(face.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let size = images[0].width();
        if let Some(bad) = images
            .iter()
            .find(|img| img.width() != size || img.height() != size)
        {
            return Err(AssetError::CubemapSize(format!(
                "{}x{} alongside {size}x{size}",
                bad.width(),
                bad.height()
            )));
        }

        let data: Vec<u8> = images.iter().flat_map(|img| img.as_raw().iter().copied()).collect();
        Ok(Self::from_rgba_faces(gpu, &data, size, label))
    }

    /// Create from six square RGBA faces laid out one after another.
    pub fn from_rgba_faces(gpu: &GpuContext, data: &[u8], size: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture,
            view,
            size,
        }
    }
}
