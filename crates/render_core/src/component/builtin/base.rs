//! Base material components
//!
//! The components nearly every material carries: the pass header, base
//! colour, opacity, the blending/alpha-test switches, surface normals and
//! texture coordinates.

use crate::buffers::layout::FieldKind;
use crate::buffers::material::MaterialChunk;
use crate::component::plugin::{ComponentsShader, PassComponentPlugin};
use crate::flags::{ComponentModeFlags, ShaderFlag, SubmeshFlag, TextureFlag, TextureFlagConfiguration};
use crate::pipeline::PipelineFlags;
use crate::shader::surface::SurfaceBuilder;
use crate::shader::writer::GlslWriter;

/// Per-pass header data: pass id, flags word and two spare words.
pub struct PassHeaderComponent;

impl PassComponentPlugin for PassHeaderComponent {
    fn name(&self) -> &'static str {
        "pass-header"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::SPECIFICS
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("passHeader", FieldKind::UVec4))
    }
}

/// Base colour of the surface.
pub struct ColourComponent;

impl PassComponentPlugin for ColourComponent {
    fn name(&self) -> &'static str {
        "colour"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::COLOUR | ComponentModeFlags::DIFFUSE_LIGHTING
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("colour", FieldKind::Vec3))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(ColourShader))
    }
}

struct ColourShader;

impl ComponentsShader for ColourShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("colour".to_string(), FieldKind::Vec3));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.colour = material.colour;");
    }

    fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
        if config.flag.contains(TextureFlag::COLOUR) {
            writer.line(&format!(
                "components.colour *= sampled.{};",
                channel_swizzle(config.start_index, config.component_count),
            ));
        }
    }
}

/// Surface opacity.
pub struct OpacityComponent;

impl PassComponentPlugin for OpacityComponent {
    fn name(&self) -> &'static str {
        "opacity"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("opacity", FieldKind::Float))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(OpacityShader))
    }
}

struct OpacityShader;

impl ComponentsShader for OpacityShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("opacity".to_string(), FieldKind::Float));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.opacity = material.opacity;");
    }

    fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
        if config.flag.contains(TextureFlag::OPACITY) {
            writer.line(&format!(
                "components.opacity *= sampled.{};",
                channel_swizzle(config.start_index, 1),
            ));
        }
    }
}

/// Marks the pass as alpha-blended.
pub struct BlendComponent;

impl PassComponentPlugin for BlendComponent {
    fn name(&self) -> &'static str {
        "blend"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["opacity"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::ALPHA_BLENDING | ComponentModeFlags::OPACITY
    }

    fn provides_alpha_blending(&self) -> bool {
        true
    }
}

/// Marks the pass as alpha-tested, with the reference value.
pub struct AlphaTestComponent;

impl PassComponentPlugin for AlphaTestComponent {
    fn name(&self) -> &'static str {
        "alpha-test"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["opacity"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY
    }

    fn provides_alpha_test(&self) -> bool {
        true
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("alphaRef", FieldKind::Float))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(AlphaTestShader))
    }
}

struct AlphaTestShader;

impl ComponentsShader for AlphaTestShader {
    fn fill_components(&self, flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        if flags.uses_alpha_test() {
            members.push(("alphaRef".to_string(), FieldKind::Float));
        }
    }

    fn write_blend(&self, flags: &PipelineFlags, writer: &mut GlslWriter) {
        if flags.uses_alpha_test() {
            writer.line("components.alphaRef = material.alphaRef;");
        }
    }
}

/// Surface normal handling: forwards the interpolated normal and, when
/// the geometry carries one, the tangent frame.
pub struct NormalsComponent;

impl PassComponentPlugin for NormalsComponent {
    fn name(&self) -> &'static str {
        "normals"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::NORMALS
    }

    fn fill_surface(&self, flags: &PipelineFlags, surface: SurfaceBuilder) -> SurfaceBuilder {
        let wants_normal = flags.shader.contains(ShaderFlag::NORMAL)
            && flags.submesh.contains(SubmeshFlag::NORMALS);
        surface
            .with_field("normal", FieldKind::Vec3, wants_normal)
            .with_field("tangent", FieldKind::Vec4, flags.uses_tangent_space())
    }
}

/// Texture coordinate forwarding for up to three sets.
pub struct TexturesComponent;

impl PassComponentPlugin for TexturesComponent {
    fn name(&self) -> &'static str {
        "textures"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::COLOUR
            | ComponentModeFlags::OPACITY
            | ComponentModeFlags::NORMALS
            | ComponentModeFlags::GEOMETRY
    }

    fn fill_surface(&self, flags: &PipelineFlags, surface: SurfaceBuilder) -> SurfaceBuilder {
        let has_textures = flags.textures.config_count > 0;
        surface
            .with_field(
                "texcoord0",
                FieldKind::Vec3,
                has_textures && flags.submesh.contains(SubmeshFlag::TEXCOORDS0),
            )
            .with_field(
                "texcoord1",
                FieldKind::Vec3,
                has_textures && flags.submesh.contains(SubmeshFlag::TEXCOORDS1),
            )
            .with_field(
                "texcoord2",
                FieldKind::Vec3,
                has_textures && flags.submesh.contains(SubmeshFlag::TEXCOORDS2),
            )
    }
}

/// GLSL swizzle for a channel range starting at `start` spanning `count`.
pub(crate) fn channel_swizzle(start: u32, count: u32) -> String {
    const CHANNELS: [char; 4] = ['r', 'g', 'b', 'a'];
    (start..start + count)
        .map(|index| CHANNELS[index.min(3) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::TextureCombine;

    #[test]
    fn swizzle_maps_channel_ranges() {
        assert_eq!(channel_swizzle(0, 3), "rgb");
        assert_eq!(channel_swizzle(1, 1), "g");
        assert_eq!(channel_swizzle(3, 1), "a");
    }

    #[test]
    fn normals_component_tracks_stream_availability() {
        let component = NormalsComponent;

        let flags = PipelineFlags {
            shader: ShaderFlag::NORMAL,
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS,
            ..Default::default()
        };
        let surface = component.fill_surface(&flags, SurfaceBuilder::new());
        assert_eq!(surface.location_of("normal"), Some(0));
        assert_eq!(surface.location_of("tangent"), None);

        let flags = PipelineFlags {
            shader: ShaderFlag::NORMAL,
            submesh: SubmeshFlag::POSITIONS,
            ..Default::default()
        };
        let surface = component.fill_surface(&flags, SurfaceBuilder::new());
        assert_eq!(surface.active_count(), 0);
    }

    #[test]
    fn texcoords_follow_the_texture_combine() {
        let component = TexturesComponent;
        let flags = PipelineFlags {
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::TEXCOORDS0,
            textures: TextureCombine {
                config_count: 1,
                flags: TextureFlag::COLOUR,
            },
            ..Default::default()
        };

        let surface = component.fill_surface(&flags, SurfaceBuilder::new());
        assert_eq!(surface.location_of("texcoord0"), Some(0));
        assert_eq!(surface.location_of("texcoord1"), None);
    }
}
