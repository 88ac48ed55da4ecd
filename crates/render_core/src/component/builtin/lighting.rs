//! Lighting-model material components
//!
//! Everything feeding the lighting evaluation: the lighting-model anchor
//! component and the PBR inputs that depend on it. All of these declare a
//! dependency on `lighting-model`, so a pass cannot carry roughness or
//! transmission without selecting a model first.

use crate::buffers::layout::FieldKind;
use crate::buffers::material::MaterialChunk;
use crate::component::builtin::base::channel_swizzle;
use crate::component::plugin::{ComponentsShader, PassComponentPlugin};
use crate::flags::{ComponentModeFlags, TextureFlag, TextureFlagConfiguration};
use crate::pipeline::PipelineFlags;
use crate::shader::writer::GlslWriter;

/// Anchor component selecting the lighting model for the pass.
pub struct LightingModelComponent;

impl PassComponentPlugin for LightingModelComponent {
    fn name(&self) -> &'static str {
        "lighting-model"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::DIFFUSE_LIGHTING | ComponentModeFlags::SPECULAR_LIGHTING
    }
}

macro_rules! scalar_lighting_component {
    ($component:ident, $shader:ident, $name:literal, $field:literal, $flag:ident) => {
        #[doc = concat!("PBR `", $field, "` input.")]
        pub struct $component;

        impl PassComponentPlugin for $component {
            fn name(&self) -> &'static str {
                $name
            }

            fn requires(&self) -> &'static [&'static str] {
                &["lighting-model"]
            }

            fn modes(&self) -> ComponentModeFlags {
                ComponentModeFlags::DIFFUSE_LIGHTING | ComponentModeFlags::SPECULAR_LIGHTING
            }

            fn material_chunk(&self) -> Option<MaterialChunk> {
                Some(MaterialChunk::new($field, FieldKind::Float))
            }

            fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
                Some(Box::new($shader))
            }
        }

        struct $shader;

        impl ComponentsShader for $shader {
            fn fill_components(
                &self,
                _flags: &PipelineFlags,
                members: &mut Vec<(String, FieldKind)>,
            ) {
                members.push(($field.to_string(), FieldKind::Float));
            }

            fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
                writer.line(concat!(
                    "components.", $field, " = material.", $field, ";"
                ));
            }

            fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
                if config.flag.contains(TextureFlag::$flag) {
                    writer.line(&format!(
                        concat!("components.", $field, " *= sampled.{};"),
                        channel_swizzle(config.start_index, 1),
                    ));
                }
            }
        }
    };
}

scalar_lighting_component!(MetalnessComponent, MetalnessShader, "metalness", "metalness", METALNESS);
scalar_lighting_component!(RoughnessComponent, RoughnessShader, "roughness", "roughness", ROUGHNESS);

/// Specular colour input.
pub struct SpecularComponent;

impl PassComponentPlugin for SpecularComponent {
    fn name(&self) -> &'static str {
        "specular"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["lighting-model"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::SPECULAR_LIGHTING
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("specular", FieldKind::Vec3))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(SpecularShader))
    }
}

struct SpecularShader;

impl ComponentsShader for SpecularShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("specular".to_string(), FieldKind::Vec3));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.specular = material.specular;");
    }

    fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
        if config.flag.contains(TextureFlag::SPECULAR) {
            writer.line(&format!(
                "components.specular *= sampled.{};",
                channel_swizzle(config.start_index, config.component_count),
            ));
        }
    }
}

/// Emissive colour input.
pub struct EmissiveComponent;

impl PassComponentPlugin for EmissiveComponent {
    fn name(&self) -> &'static str {
        "emissive"
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::COLOUR
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("emissive", FieldKind::Vec3))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(EmissiveShader))
    }
}

struct EmissiveShader;

impl ComponentsShader for EmissiveShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("emissive".to_string(), FieldKind::Vec3));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.emissive = material.emissive;");
    }

    fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
        if config.flag.contains(TextureFlag::EMISSIVE) {
            writer.line(&format!(
                "components.emissive *= sampled.{};",
                channel_swizzle(config.start_index, config.component_count),
            ));
        }
    }
}

/// Light transmission through the surface.
pub struct TransmissionComponent;

impl PassComponentPlugin for TransmissionComponent {
    fn name(&self) -> &'static str {
        "transmission"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["lighting-model"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::DIFFUSE_LIGHTING | ComponentModeFlags::SPECULAR_LIGHTING
    }

    fn provides_transmission(&self) -> bool {
        true
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("transmission", FieldKind::Float))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(TransmissionShader))
    }
}

struct TransmissionShader;

impl ComponentsShader for TransmissionShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("transmission".to_string(), FieldKind::Float));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.transmission = material.transmission;");
    }

    fn apply_texture(&self, config: &TextureFlagConfiguration, writer: &mut GlslWriter) {
        if config.flag.contains(TextureFlag::TRANSMISSION) {
            writer.line(&format!(
                "components.transmission *= sampled.{};",
                channel_swizzle(config.start_index, 1),
            ));
        }
    }
}

/// Clearcoat layer: intensity in x, roughness in y.
pub struct ClearcoatComponent;

impl PassComponentPlugin for ClearcoatComponent {
    fn name(&self) -> &'static str {
        "clearcoat"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["lighting-model"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::SPECULAR_LIGHTING
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("clearcoat", FieldKind::Vec2))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(ClearcoatShader))
    }
}

struct ClearcoatShader;

impl ComponentsShader for ClearcoatShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("clearcoat".to_string(), FieldKind::Vec2));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.clearcoat = material.clearcoat;");
    }
}

/// Sheen layer: colour in xyz, roughness in w.
pub struct SheenComponent;

impl PassComponentPlugin for SheenComponent {
    fn name(&self) -> &'static str {
        "sheen"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["lighting-model"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::SPECULAR_LIGHTING
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("sheen", FieldKind::Vec4))
    }

    fn components_shader(&self) -> Option<Box<dyn ComponentsShader>> {
        Some(Box::new(SheenShader))
    }
}

struct SheenShader;

impl ComponentsShader for SheenShader {
    fn fill_components(&self, _flags: &PipelineFlags, members: &mut Vec<(String, FieldKind)>) {
        members.push(("sheen".to_string(), FieldKind::Vec4));
    }

    fn write_blend(&self, _flags: &PipelineFlags, writer: &mut GlslWriter) {
        writer.line("components.sheen = material.sheen;");
    }
}

/// Subsurface scattering; its diffuse contribution is deferred.
pub struct SubsurfaceScatteringComponent;

impl PassComponentPlugin for SubsurfaceScatteringComponent {
    fn name(&self) -> &'static str {
        "subsurface-scattering"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["lighting-model"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::DIFFUSE_LIGHTING
    }

    fn provides_deferred_diffuse_lighting(&self) -> bool {
        true
    }

    fn material_chunk(&self) -> Option<MaterialChunk> {
        Some(MaterialChunk::new("sssStrength", FieldKind::Float))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighting_inputs_declare_their_dependency() {
        assert_eq!(RoughnessComponent.requires(), &["lighting-model"]);
        assert_eq!(MetalnessComponent.requires(), &["lighting-model"]);
        assert_eq!(TransmissionComponent.requires(), &["lighting-model"]);
    }

    #[test]
    fn transmission_raises_the_derived_flag() {
        assert!(TransmissionComponent.provides_transmission());
        assert!(!RoughnessComponent.provides_transmission());
    }

    #[test]
    fn roughness_shader_emits_its_member() {
        let shader = RoughnessComponent.components_shader().unwrap();
        let mut members = Vec::new();
        shader.fill_components(&PipelineFlags::default(), &mut members);
        assert_eq!(members, vec![("roughness".to_string(), FieldKind::Float)]);

        let mut writer = GlslWriter::new();
        shader.write_blend(&PipelineFlags::default(), &mut writer);
        assert!(writer.text().contains("components.roughness = material.roughness;"));
    }
}
