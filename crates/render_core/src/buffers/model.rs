//! Per-node model data storage buffer mirror

use crate::buffers::layout::{FieldKind, MemoryLayout, StructLayout};
use crate::foundation::math::Mat4;

/// Per-node model indices and transforms - std430 storage record
///
/// One record per scene node referenced by a pipeline; field order must
/// match [`ModelIndices::layout`].
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct ModelIndices {
    /// Previous frame's model matrix (velocity/reprojection)
    pub prv_model: [[f32; 4]; 4],
    /// Current model matrix (object to world space)
    pub cur_model: [[f32; 4]; 4],
    /// Normal matrix, mat4-padded for layout stability
    pub normal: [[f32; 4]; 4],
    /// Texture configuration ids, first four slots
    pub textures0: [u32; 4],
    /// Texture configuration ids, last four slots
    pub textures1: [u32; 4],
    /// texture count, material id, env map id, shadow receiver flag
    pub counts: [i32; 4],
    /// meshlet count, vertex offset, index offset, unused
    pub meshlets: [u32; 4],
}

// Safety: only f32/u32/i32 fields with explicit C layout, no padding
// (asserted against the std430 layout in tests).
unsafe impl bytemuck::Pod for ModelIndices {}
unsafe impl bytemuck::Zeroable for ModelIndices {}

impl Default for ModelIndices {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Mat4::identity().into();
        Self {
            prv_model: identity,
            cur_model: identity,
            normal: identity,
            textures0: [0; 4],
            textures1: [0; 4],
            counts: [0; 4],
            meshlets: [0; 4],
        }
    }
}

impl ModelIndices {
    /// The std430 layout description shared with shader generation.
    pub fn layout() -> StructLayout {
        StructLayout::builder("ModelIndices", MemoryLayout::Std430)
            .field("prvModel", FieldKind::Mat4)
            .field("curModel", FieldKind::Mat4)
            .field("normal", FieldKind::Mat4)
            .field("textures0", FieldKind::UVec4)
            .field("textures1", FieldKind::UVec4)
            .field("counts", FieldKind::IVec4)
            .field("meshlets", FieldKind::UVec4)
            .build()
    }

    /// GLSL storage block declaration (runtime-sized record array).
    pub fn glsl_block(set: u32, binding: u32) -> String {
        let mut out = Self::layout().glsl_struct();
        out.push_str(&format!(
            "layout(set = {}, binding = {}, std430) restrict readonly buffer ModelsBlock\n\
             {{\n\
             \tModelIndices models[];\n\
             }};\n",
            set, binding,
        ));
        out
    }

    /// Updates the transforms, rolling the current matrix into the
    /// previous-frame slot.
    pub fn update_transform(&mut self, model: &Mat4) {
        self.prv_model = self.cur_model;
        self.cur_model = (*model).into();
        let normal = model
            .try_inverse()
            .unwrap_or_else(Mat4::identity)
            .transpose();
        self.normal = normal.into();
    }
}

/// Fixed-capacity CPU mirror of the per-node model storage buffer.
///
/// Capacity is fixed at pool allocation; records are updated in place every
/// frame and uploaded as one contiguous range before submission.
#[derive(Debug)]
pub struct ModelsBuffer {
    records: Vec<ModelIndices>,
}

impl ModelsBuffer {
    /// Allocates `capacity` zero-initialised records.
    pub fn new(capacity: usize) -> Self {
        ModelIndices::layout().checked_against::<ModelIndices>();
        Self {
            records: vec![ModelIndices::default(); capacity],
        }
    }

    /// Number of records.
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Mutable access to one record; `None` past capacity.
    pub fn record_mut(&mut self, index: usize) -> Option<&mut ModelIndices> {
        self.records.get_mut(index)
    }

    /// Writes all records into mapped memory.
    ///
    /// # Panics
    ///
    /// The mapped region must hold the whole mirror; the allocation is
    /// sized from the same capacity, so a shorter `destination` is a
    /// caller bug and panics.
    pub fn upload(&self, destination: &mut [u8]) {
        let bytes = bytemuck::cast_slice(&self.records);
        destination[..bytes.len()].copy_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn layout_matches_cpu_mirror() {
        let layout = ModelIndices::layout();
        assert_eq!(layout.size(), 256);
        layout.checked_against::<ModelIndices>();
    }

    #[test]
    fn transform_update_rolls_previous_matrix() {
        let mut record = ModelIndices::default();
        let first = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let second = Mat4::new_translation(&Vec3::new(4.0, 5.0, 6.0));

        record.update_transform(&first);
        record.update_transform(&second);

        assert_eq!(record.prv_model, <[[f32; 4]; 4]>::from(first));
        assert_eq!(record.cur_model, <[[f32; 4]; 4]>::from(second));
    }

    #[test]
    fn normal_matrix_is_the_inverse_transpose() {
        use approx::assert_relative_eq;

        let mut record = ModelIndices::default();
        record.update_transform(&Mat4::new_scaling(2.0));

        // Uniform scale s gives 1/s on the normal matrix diagonal.
        assert_relative_eq!(record.normal[0][0], 0.5);
        assert_relative_eq!(record.normal[1][1], 0.5);
        assert_relative_eq!(record.normal[2][2], 0.5);
        assert_relative_eq!(record.normal[1][0], 0.0);
    }

    #[test]
    fn upload_fills_a_capacity_sized_destination() {
        let buffer = ModelsBuffer::new(2);
        let mut destination = vec![0xffu8; 2 * 256];
        buffer.upload(&mut destination);

        // Default records start from identity matrices, not 0xff filler.
        assert_eq!(&destination[..4], &1.0f32.to_le_bytes());
    }

    #[test]
    #[should_panic]
    fn upload_rejects_a_short_destination() {
        let buffer = ModelsBuffer::new(2);
        let mut destination = vec![0u8; 256];
        buffer.upload(&mut destination);
    }

    #[test]
    fn block_declares_runtime_array() {
        let block = ModelIndices::glsl_block(0, 1);
        assert!(block.contains("struct ModelIndices"));
        assert!(block.contains("ModelIndices models[];"));
    }
}
