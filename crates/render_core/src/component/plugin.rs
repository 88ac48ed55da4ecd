//! Pass component plugin interface
//!
//! One plugin instance exists per component *kind* (roughness, normal map,
//! clearcoat, ...), owned by the register for the engine's lifetime. A
//! plugin is a behaviour object: it carries no per-material state, only the
//! knowledge of how its capability contributes to surface layouts, shader
//! code and the packed material buffer.

use crate::buffers::material::MaterialChunk;
use crate::buffers::layout::FieldKind;
use crate::component::pass::Pass;
use crate::flags::{ComponentModeFlags, TextureFlag, TextureFlagConfiguration};
use crate::pipeline::PipelineFlags;
use crate::shader::surface::SurfaceBuilder;
use crate::shader::writer::GlslWriter;

/// Behaviour contract of one pass component kind.
///
/// Plugins asked to contribute to a flag combination they do not support
/// must be no-ops, never errors: unsupported combinations are filtered
/// upstream by flag masking.
pub trait PassComponentPlugin: Send + Sync {
    /// Stable component type name, the registration key.
    fn name(&self) -> &'static str;

    /// Component type names this component depends on.
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Component type names this component cannot coexist with.
    fn excludes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Aspects of rendering this component participates in.
    fn modes(&self) -> ComponentModeFlags;

    /// This component makes the pass alpha-blended.
    fn provides_alpha_blending(&self) -> bool {
        false
    }

    /// This component makes the pass alpha-tested.
    fn provides_alpha_test(&self) -> bool {
        false
    }

    /// This component makes the pass transmissive.
    fn provides_transmission(&self) -> bool {
        false
    }

    /// This component enables one-pass parallax occlusion mapping.
    fn provides_parallax_occlusion_one(&self) -> bool {
        false
    }

    /// This component enables repeated parallax occlusion mapping.
    fn provides_parallax_occlusion_repeat(&self) -> bool {
        false
    }

    /// This component defers diffuse lighting (subsurface scattering).
    fn provides_deferred_diffuse_lighting(&self) -> bool {
        false
    }

    /// This component samples a texture map.
    fn is_map_component(&self) -> bool {
        false
    }

    /// Texture roles this map component consumes.
    fn texture_flags(&self) -> TextureFlag {
        TextureFlag::empty()
    }

    /// This component's chunk in the packed material record, if any.
    fn material_chunk(&self) -> Option<MaterialChunk> {
        None
    }

    /// Appends this component's fields to the surface under construction.
    ///
    /// Called for every registered component in registration order; the
    /// implementation decides from `flags` whether its fields are active
    /// (next location) or unused (sentinel).
    fn fill_surface(&self, _flags: &PipelineFlags, surface: SurfaceBuilder) -> SurfaceBuilder {
        surface
    }

    /// Shader-side contributor for the blended components value.
    ///
    /// Must be pure with respect to global state: equal flags always yield
    /// equivalent generated code, since the results feed a cache key.
    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        None
    }

    /// Writes this component's material chunk for one pass.
    ///
    /// The default copies the pass's stored value for this component, or
    /// zero-fills when the pass does not carry it.
    fn fill_material(&self, pass: &Pass, chunk: &mut [u8]) {
        match pass.chunk_value(self.name()) {
            Some(value) => {
                let len = value.len().min(chunk.len());
                chunk[..len].copy_from_slice(&value[..len]);
                chunk[len..].fill(0);
            }
            None => chunk.fill(0),
        }
    }
}

/// Shader-fragment contributor for one component kind.
///
/// Instances are created per program build, walk in registration order, and
/// are discarded once generation completes; only the generated source is
/// cached.
pub trait ComponentsShader: Send + Sync {
    /// Declares this component's members of the blended components struct.
    ///
    /// Appends `(name, type)` pairs; order and count must match the
    /// initialisers emitted by [`write_blend`](Self::write_blend). A
    /// component that does not apply to `flags` appends nothing.
    fn fill_components(&self, flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>);

    /// Emits the assignments computing this component's members from the
    /// material record and sampled textures.
    fn write_blend(&self, flags: &PipelineFlags, writer: &mut GlslWriter);

    /// Emits the sampling remap for one texture channel configuration.
    fn apply_texture(&self, _config: &TextureFlagConfiguration, _writer: &mut GlslWriter) {}
}
