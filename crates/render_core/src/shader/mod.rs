//! Runtime shader generation
//!
//! Shader source is assembled at runtime from the registered components, as
//! a pure function of the pipeline flags. The writer guarantees
//! deterministic text, the surface builder guarantees stable interface
//! locations, and the assembler stitches contributor output into complete
//! stage sources.

pub mod assembler;
pub mod surface;
pub mod writer;

pub use assembler::{assemble, AssemblyError};
pub use surface::{SurfaceBuilder, SurfaceField, UNUSED_LOCATION};
pub use writer::{GlslWriter, ProgramSource, ShaderSource, ShaderStage};
