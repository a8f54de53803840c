//! Per-object uniform layouts and the shared placement writer.
//!
//! Each pipeline ("program") declares which per-object uniforms it reads and
//! where they live in its uniform block. Looking up a name that the program
//! does not use returns `None`, and the writer simply skips that value. This
//! lets the depth-only shadow program, which has no normal matrix, share the
//! placement loop with the lit main program.

use glam::{Mat3, Mat4};

use crate::scene::{Scene, normal_matrix};

/// Byte offset of a uniform inside a program's per-object block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot(pub usize);

/// Name → offset table for one program's per-object uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLayout {
    pub label: &'static str,
    slots: &'static [(&'static str, usize)],
    /// Size of the block in bytes, before alignment.
    pub size: usize,
}

impl UniformLayout {
    /// Main pass: `model: mat4x4<f32>`, `normal_matrix: mat3x3<f32>`.
    pub const LIT: UniformLayout = UniformLayout {
        label: "lit",
        slots: &[("model", 0), ("normal_matrix", 64)],
        size: 64 + 48,
    };

    /// Shadow pass: `model: mat4x4<f32>` only.
    pub const DEPTH: UniformLayout = UniformLayout {
        label: "depth",
        slots: &[("model", 0)],
        size: 64,
    };

    /// Look up a uniform by name.
    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots
            .iter()
            .find(|(slot_name, _)| *slot_name == name)
            .map(|&(_, offset)| UniformSlot(offset))
    }

    /// Block size rounded up to the dynamic-offset alignment.
    pub fn stride(&self, alignment: u32) -> usize {
        let alignment = alignment.max(1) as usize;
        self.size.div_ceil(alignment) * alignment
    }
}

/// CPU staging area holding one aligned uniform block per placement.
///
/// Filled once per pass per frame, then uploaded with a single buffer write
/// and addressed with dynamic offsets.
#[derive(Clone, Debug)]
pub struct ObjectUniforms {
    layout: UniformLayout,
    stride: usize,
    bytes: Vec<u8>,
}

impl ObjectUniforms {
    pub fn new(layout: UniformLayout, alignment: u32, capacity: usize) -> Self {
        let stride = layout.stride(alignment);
        Self {
            layout,
            stride,
            bytes: vec![0; stride * capacity.max(1)],
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Dynamic offset of the block for placement `index`.
    pub fn offset(&self, index: usize) -> u32 {
        (index * self.stride) as u32
    }

    /// Raw block for placement `index`.
    pub fn block(&self, index: usize) -> &[u8] {
        &self.bytes[index * self.stride..(index + 1) * self.stride]
    }

    /// Every block, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write every placement's uniforms for this frame.
    ///
    /// Normal matrices are rebuilt from `view · model` for every object on
    /// every frame since the view keeps changing.
    pub fn write_scene(&mut self, scene: &Scene, view: &Mat4) {
        let needed = scene.placements.len() * self.stride;
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
        for index in 0..scene.placements.len() {
            let model = scene.model_matrix(index);
            self.write_object(index, &model, view);
        }
    }

    /// Write one object's block, skipping uniforms the layout has no slot for.
    pub fn write_object(&mut self, index: usize, model: &Mat4, view: &Mat4) {
        let base = index * self.stride;

        if let Some(UniformSlot(offset)) = self.layout.slot("model") {
            let cols = model.to_cols_array();
            self.put(base + offset, bytemuck::cast_slice(&cols));
        }

        if let Some(UniformSlot(offset)) = self.layout.slot("normal_matrix") {
            let padded = pad_mat3(&normal_matrix(view, model));
            self.put(base + offset, bytemuck::cast_slice(&padded));
        }
    }

    fn put(&mut self, at: usize, data: &[u8]) {
        self.bytes[at..at + data.len()].copy_from_slice(data);
    }
}

/// WGSL `mat3x3<f32>` in a uniform buffer: three columns, each padded to 16 bytes.
fn pad_mat3(m: &Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}
