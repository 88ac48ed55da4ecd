//! Per-draw object id storage buffer mirror

use crate::buffers::layout::{FieldKind, MemoryLayout, StructLayout};

/// Maximum draw records one pipeline's objects-ids buffer can hold.
///
/// Single configured constant: every capacity check and every allocation
/// references this value, never a per-site literal, so CPU mirrors and
/// shader-side expectations cannot diverge.
pub const MAX_NODES_PER_PIPELINE: usize = 1024;

/// Ids locating one draw's data in the other storage buffers - std430
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectIds {
    /// Index into the models buffer
    pub node_id: u32,
    /// Index into the morphing weights buffer (0 = none)
    pub morphing_id: u32,
    /// Index into the skinning transforms buffer (0 = none)
    pub skinning_id: u32,
    /// Unused, keeps the record one uvec4 wide
    pub _pad: u32,
}

// Safety: four u32 fields, explicit C layout, no padding.
unsafe impl bytemuck::Pod for ObjectIds {}
unsafe impl bytemuck::Zeroable for ObjectIds {}

impl ObjectIds {
    /// The std430 layout description shared with shader generation.
    pub fn layout() -> StructLayout {
        StructLayout::builder("ObjectIds", MemoryLayout::Std430)
            .field("nodeId", FieldKind::UInt)
            .field("morphingId", FieldKind::UInt)
            .field("skinningId", FieldKind::UInt)
            .field("pad", FieldKind::UInt)
            .build()
    }

    /// GLSL storage block declaration.
    pub fn glsl_block(set: u32, binding: u32) -> String {
        let mut out = Self::layout().glsl_struct();
        out.push_str(&format!(
            "layout(set = {}, binding = {}, std430) restrict readonly buffer ObjectIdsBlock\n\
             {{\n\
             \tObjectIds objects[{}];\n\
             }};\n",
            set,
            binding,
            MAX_NODES_PER_PIPELINE,
        ));
        out
    }
}

/// Fixed-capacity CPU mirror of the per-draw object ids buffer.
///
/// Capacity is [`MAX_NODES_PER_PIPELINE`], fixed at creation. Records are
/// rewritten from scratch each frame in draw submission order.
#[derive(Debug)]
pub struct ObjectIdsBuffer {
    records: Vec<ObjectIds>,
    count: usize,
}

impl Default for ObjectIdsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIdsBuffer {
    /// Allocates the full fixed capacity.
    pub fn new() -> Self {
        ObjectIds::layout().checked_against::<ObjectIds>();
        Self {
            records: vec![ObjectIds::default(); MAX_NODES_PER_PIPELINE],
            count: 0,
        }
    }

    /// Appends one draw record; `false` once capacity is reached.
    pub fn push(&mut self, ids: ObjectIds) -> bool {
        if self.count >= MAX_NODES_PER_PIPELINE {
            return false;
        }
        self.records[self.count] = ids;
        self.count += 1;
        true
    }

    /// Number of records written this frame.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Resets the frame's record list without releasing storage.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Writes the populated range into mapped memory.
    ///
    /// # Panics
    ///
    /// `destination` must hold the populated range (`count()` records); a
    /// shorter mapping is a caller bug and panics.
    pub fn upload(&self, destination: &mut [u8]) {
        let bytes = bytemuck::cast_slice(&self.records[..self.count]);
        destination[..bytes.len()].copy_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_cpu_mirror() {
        let layout = ObjectIds::layout();
        assert_eq!(layout.size(), 16);
        layout.checked_against::<ObjectIds>();
    }

    #[test]
    fn push_respects_fixed_capacity() {
        let mut buffer = ObjectIdsBuffer::new();
        for index in 0..MAX_NODES_PER_PIPELINE {
            assert!(buffer.push(ObjectIds {
                node_id: index as u32,
                ..Default::default()
            }));
        }
        assert!(!buffer.push(ObjectIds::default()));
        assert_eq!(buffer.count(), MAX_NODES_PER_PIPELINE);
    }

    #[test]
    fn block_capacity_uses_the_configured_constant() {
        let block = ObjectIds::glsl_block(0, 2);
        assert!(block.contains(&format!("objects[{}];", MAX_NODES_PER_PIPELINE)));
    }
}
