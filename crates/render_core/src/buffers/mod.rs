//! GPU data buffer descriptors
//!
//! CPU-mirrored structures whose field layout is declared once and shared
//! between the CPU-side population code and the GPU-side shader
//! declarations. Every mirror pins itself against its [`layout`] description
//! at construction; a size divergence is a build defect and fails fast.

pub mod camera;
pub mod layout;
pub mod material;
pub mod model;
pub mod objects;

pub use camera::{CameraData, CameraUbo};
pub use layout::{FieldKind, LayoutField, MemoryLayout, StructLayout};
pub use material::{pack_chunks, MaterialBufferLayout, MaterialChunk, MaterialSlot, MaterialsBuffer};
pub use model::{ModelIndices, ModelsBuffer};
pub use objects::{ObjectIds, ObjectIdsBuffer, MAX_NODES_PER_PIPELINE};
