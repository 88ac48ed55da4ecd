//! Packed per-material storage buffer
//!
//! Each registered component may contribute one chunk of material data.
//! The chunks are packed into a single per-material record whose layout is
//! computed once, at registration time, by [`pack_chunks`]: 16-byte
//! multiples first, then vec3s with floats back-filling their tail slots,
//! then vec2s, then the remaining floats, with explicit padding closing
//! every hole. The packed description drives both the CPU-side chunk
//! writes and the shader-side `Material` declaration.

use crate::buffers::layout::{align_up, FieldKind, MemoryLayout};
use crate::flags::PassComponentId;

/// One component's contribution to the packed material record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialChunk {
    /// Field name in the shader-side `Material` struct.
    pub name: String,
    /// Semantic type of the chunk.
    pub kind: FieldKind,
}

impl MaterialChunk {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    fn size(&self) -> u32 {
        self.kind.size(MemoryLayout::Std430)
    }
}

/// One resolved slot of the packed material record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSlot {
    /// Contributing component, `None` for padding slots.
    pub component: Option<PassComponentId>,
    /// Field name (`padN` for padding slots).
    pub name: String,
    /// Semantic type.
    pub kind: FieldKind,
    /// Byte offset within the record.
    pub offset: u32,
}

/// Resolved packed layout of one material record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialBufferLayout {
    /// Slots in packed order, padding included.
    pub slots: Vec<MaterialSlot>,
    /// Record stride in bytes, 16-byte aligned.
    pub stride: u32,
}

impl MaterialBufferLayout {
    /// Byte offset of a component's chunk, if it contributed one.
    pub fn chunk_offset(&self, component: PassComponentId) -> Option<u32> {
        self.slots
            .iter()
            .find(|slot| slot.component == Some(component))
            .map(|slot| slot.offset)
    }

    /// GLSL declaration of the packed record and its storage block.
    pub fn glsl_block(&self, set: u32, binding: u32) -> String {
        let mut out = String::from("struct Material\n{\n");
        for slot in &self.slots {
            out.push_str(&format!("\t{} {};\n", slot.kind.glsl_name(), slot.name));
        }
        out.push_str("};\n");
        out.push_str(&format!(
            "layout(set = {}, binding = {}, std430) restrict readonly buffer MaterialsBlock\n\
             {{\n\
             \tMaterial materials[];\n\
             }};\n",
            set, binding,
        ));
        out
    }
}

/// Packs component chunks into one material record layout.
///
/// Input order is registration order; the algorithm is deterministic, so
/// a fixed component set always yields the same record layout.
pub fn pack_chunks(chunks: Vec<(PassComponentId, MaterialChunk)>) -> MaterialBufferLayout {
    const ALIGNMENT: u32 = 16;

    let mut slots = Vec::new();
    let mut pad_index = 0u32;
    let mut offset = 0u32;

    let mut vec3s = Vec::new();
    let mut vec2s = Vec::new();
    let mut floats = Vec::new();

    // 16-byte multiples go first, already aligned.
    for (id, chunk) in chunks {
        match chunk.size() {
            size if size >= ALIGNMENT && size % ALIGNMENT == 0 => {
                slots.push(MaterialSlot {
                    component: Some(id),
                    name: chunk.name,
                    kind: chunk.kind,
                    offset,
                });
                offset += size;
            }
            12 => vec3s.push((id, chunk)),
            8 => vec2s.push((id, chunk)),
            4 => floats.push((id, chunk)),
            size => {
                // Odd-sized chunks round up to a full slot at the end.
                vec3s.push((id, chunk));
                debug_assert!(size < ALIGNMENT, "unaligned oversized chunk");
            }
        }
    }

    let mut floats = floats.into_iter();

    // Each vec3 owns one 16-byte slot; a float back-fills the tail when
    // available, padding otherwise.
    for (id, chunk) in vec3s {
        slots.push(MaterialSlot {
            component: Some(id),
            name: chunk.name,
            kind: chunk.kind,
            offset,
        });
        match floats.next() {
            Some((filler_id, filler)) => slots.push(MaterialSlot {
                component: Some(filler_id),
                name: filler.name,
                kind: filler.kind,
                offset: offset + 12,
            }),
            None => {
                slots.push(MaterialSlot {
                    component: None,
                    name: format!("pad{}", pad_index),
                    kind: FieldKind::Float,
                    offset: offset + 12,
                });
                pad_index += 1;
            }
        }
        offset += ALIGNMENT;
    }

    // vec2s pack pairwise.
    for (id, chunk) in vec2s {
        slots.push(MaterialSlot {
            component: Some(id),
            name: chunk.name,
            kind: chunk.kind,
            offset,
        });
        offset += 8;
    }

    // Remaining floats pack tightly.
    for (id, chunk) in floats {
        slots.push(MaterialSlot {
            component: Some(id),
            name: chunk.name,
            kind: chunk.kind,
            offset,
        });
        offset += 4;
    }

    // Close the record with explicit padding.
    while offset % ALIGNMENT != 0 {
        slots.push(MaterialSlot {
            component: None,
            name: format!("pad{}", pad_index),
            kind: FieldKind::Float,
            offset,
        });
        pad_index += 1;
        offset += 4;
    }

    MaterialBufferLayout {
        slots,
        stride: align_up(offset, ALIGNMENT),
    }
}

/// Fixed-capacity CPU mirror of the packed materials buffer.
#[derive(Debug)]
pub struct MaterialsBuffer {
    layout: MaterialBufferLayout,
    data: Vec<u8>,
    capacity: usize,
}

impl MaterialsBuffer {
    /// Allocates `capacity` zeroed records with the given packed layout.
    pub fn new(layout: MaterialBufferLayout, capacity: usize) -> Self {
        let data = vec![0u8; layout.stride as usize * capacity];
        Self {
            layout,
            data,
            capacity,
        }
    }

    /// The packed record layout.
    pub fn layout(&self) -> &MaterialBufferLayout {
        &self.layout
    }

    /// Number of material records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mutable bytes of one component's chunk within one record.
    ///
    /// `None` when the record index is out of range or the component
    /// contributed no chunk.
    pub fn chunk_mut(
        &mut self,
        material_index: usize,
        component: PassComponentId,
        size: usize,
    ) -> Option<&mut [u8]> {
        if material_index >= self.capacity {
            return None;
        }
        let offset = self.layout.chunk_offset(component)? as usize;
        let base = material_index * self.layout.stride as usize + offset;
        self.data.get_mut(base..base + size)
    }

    /// Writes all records into mapped memory.
    ///
    /// # Panics
    ///
    /// `destination` must hold `capacity()` records of the layout's
    /// stride; a shorter mapping is a caller bug and panics.
    pub fn upload(&self, destination: &mut [u8]) {
        destination[..self.data.len()].copy_from_slice(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: PassComponentId, name: &str, kind: FieldKind) -> (PassComponentId, MaterialChunk) {
        (id, MaterialChunk::new(name, kind))
    }

    #[test]
    fn vec4_chunks_lead_the_record() {
        let layout = pack_chunks(vec![
            chunk(1, "roughness", FieldKind::Float),
            chunk(2, "colourOpacity", FieldKind::Vec4),
            chunk(3, "emissive", FieldKind::Vec3),
        ]);

        assert_eq!(layout.chunk_offset(2), Some(0));
        assert_eq!(layout.chunk_offset(3), Some(16));
        // The float back-fills the vec3's tail slot.
        assert_eq!(layout.chunk_offset(1), Some(28));
        assert_eq!(layout.stride, 32);
    }

    #[test]
    fn stride_is_always_vec4_aligned() {
        let layout = pack_chunks(vec![
            chunk(1, "metalness", FieldKind::Float),
            chunk(2, "roughness", FieldKind::Float),
            chunk(3, "opacity", FieldKind::Float),
        ]);

        assert_eq!(layout.stride % 16, 0);
        assert_eq!(layout.stride, 16);
        // One explicit padding float closes the record.
        assert_eq!(
            layout.slots.iter().filter(|s| s.component.is_none()).count(),
            1
        );
    }

    #[test]
    fn packing_is_deterministic() {
        let build = || {
            pack_chunks(vec![
                chunk(1, "colourOpacity", FieldKind::Vec4),
                chunk(2, "emissive", FieldKind::Vec3),
                chunk(3, "roughness", FieldKind::Float),
                chunk(4, "metalness", FieldKind::Float),
            ])
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn chunk_writes_land_in_the_right_record() {
        let layout = pack_chunks(vec![chunk(1, "colourOpacity", FieldKind::Vec4)]);
        let mut buffer = MaterialsBuffer::new(layout, 4);

        let bytes = buffer.chunk_mut(2, 1, 16).unwrap();
        bytes.copy_from_slice(bytemuck::bytes_of(&[1.0f32, 0.5, 0.25, 1.0]));

        let mut uploaded = vec![0u8; 64];
        buffer.upload(&mut uploaded);
        let values: &[f32] = bytemuck::cast_slice(&uploaded[32..48]);
        assert_eq!(values, &[1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn glsl_block_declares_packed_fields() {
        let layout = pack_chunks(vec![
            chunk(1, "colourOpacity", FieldKind::Vec4),
            chunk(2, "roughness", FieldKind::Float),
        ]);

        let block = layout.glsl_block(1, 0);
        assert!(block.contains("vec4 colourOpacity;"));
        assert!(block.contains("float roughness;"));
        assert!(block.contains("Material materials[];"));
    }
}
