//! Render system facade
//!
//! Owns the component register, the generated-program cache and the CPU
//! mirrors of the GPU buffers, wired together from one configuration. This
//! is the surface the rest of an engine talks to; the modules underneath
//! stay independently testable.

use std::sync::Arc;

use crate::buffers::camera::CameraUbo;
use crate::buffers::material::MaterialsBuffer;
use crate::buffers::model::ModelsBuffer;
use crate::buffers::objects::ObjectIdsBuffer;
use crate::component::pass::Pass;
use crate::component::register::{ComponentError, PassComponentRegister};
use crate::component::builtin;
use crate::config::RenderConfig;
use crate::flags::PassComponentCombine;
use crate::pipeline::cache::ShaderProgramCache;
use crate::pipeline::pass::{PipelineFlagsRequest, RenderNodesPass};
use crate::pipeline::PipelineFlags;
use crate::plugins::{load_plugins, PluginError, PluginFactory};
use crate::shader::writer::ProgramSource;

/// The assembled rendering core.
pub struct RenderSystem {
    config: RenderConfig,
    register: PassComponentRegister,
    cache: ShaderProgramCache,
    camera: CameraUbo,
    models: ModelsBuffer,
    objects: ObjectIdsBuffer,
    materials: MaterialsBuffer,
}

impl RenderSystem {
    /// Builds the system with the built-in component set loaded.
    pub fn new(config: RenderConfig) -> Result<Self, PluginError> {
        let mut register = PassComponentRegister::new();
        load_plugins(&mut register, &builtin::factories())?;

        let materials =
            MaterialsBuffer::new(register.material_layout().clone(), config.limits.max_materials);
        let models = ModelsBuffer::new(config.limits.max_models);

        Ok(Self {
            config,
            register,
            cache: ShaderProgramCache::new(),
            camera: CameraUbo::new(),
            models,
            objects: ObjectIdsBuffer::new(),
            materials,
        })
    }

    /// Loads additional component factories (engine extensions).
    ///
    /// The material layout grows with the new chunks, so the materials
    /// buffer is reallocated; call this before filling material records.
    pub fn load_components(&mut self, factories: &[PluginFactory]) -> Result<(), PluginError> {
        load_plugins(&mut self.register, factories)?;
        self.materials = MaterialsBuffer::new(
            self.register.material_layout().clone(),
            self.config.limits.max_materials,
        );
        self.cache.clear();
        Ok(())
    }

    /// Active configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The component register.
    pub fn register(&self) -> &PassComponentRegister {
        &self.register
    }

    /// Camera uniform mirror.
    pub fn camera_mut(&mut self) -> &mut CameraUbo {
        &mut self.camera
    }

    /// Models buffer mirror.
    pub fn models_mut(&mut self) -> &mut ModelsBuffer {
        &mut self.models
    }

    /// Object ids buffer mirror.
    pub fn objects_mut(&mut self) -> &mut ObjectIdsBuffer {
        &mut self.objects
    }

    /// Materials buffer mirror.
    pub fn materials(&self) -> &MaterialsBuffer {
        &self.materials
    }

    /// Reconciles a material pass and resolves its combine.
    ///
    /// Map components are synchronised with the pass's texture
    /// configurations first, so adding or removing a texture changes the
    /// combine without any manual component bookkeeping.
    pub fn resolve_material(
        &mut self,
        pass: &mut Pass,
    ) -> Result<PassComponentCombine, ComponentError> {
        let configurations = pass.texture_configurations().to_vec();
        self.register.update_map_components(&configurations, pass);
        self.register.resolve_pass_combine(pass)
    }

    /// Writes a material pass's component data into its buffer record.
    pub fn upload_material(&mut self, pass: &Pass, material_index: usize) {
        self.register
            .fill_material_buffer(pass, material_index, &mut self.materials);
    }

    /// Assembles the variant selector for one node under a render pass.
    pub fn pipeline_flags(
        &mut self,
        render_pass: &dyn RenderNodesPass,
        material: &mut Pass,
        request: &PipelineFlagsRequest,
    ) -> Result<PipelineFlags, ComponentError> {
        render_pass.pipeline_flags(&mut self.register, material, request)
    }

    /// Fetches or generates the program for a selector.
    pub fn program(&mut self, flags: &PipelineFlags) -> Option<Arc<ProgramSource>> {
        self.cache.get_or_build(&self.register, flags)
    }

    /// Program cache statistics: (cached selectors, failed selectors).
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache.len(), self.cache.failed_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{
        SubmeshFlag, TextureCombine, TextureConfiguration, TextureFlag, TextureFlagConfiguration,
    };
    use crate::pipeline::pass::{DepthPass, OpaquePass};
    use crate::shader::writer::ShaderStage;

    fn lit_material(system: &RenderSystem) -> Pass {
        let mut pass = Pass::new("stone");
        for name in ["colour", "opacity", "lighting-model", "roughness", "metalness"] {
            pass.add_component(system.register().component_id(name).unwrap());
        }
        pass
    }

    #[test]
    fn texture_configurations_drive_map_components() {
        let mut system = RenderSystem::new(RenderConfig::default()).unwrap();
        let mut material = lit_material(&system);
        material.add_texture_configuration(TextureConfiguration {
            configurations: vec![TextureFlagConfiguration {
                flag: TextureFlag::COLOUR,
                start_index: 0,
                component_count: 3,
            }],
        });

        let combine = system.resolve_material(&mut material).unwrap();
        let colour_map = system.register().component_id("colour-map").unwrap();
        assert!(material.has_component(colour_map));
        assert_ne!(combine.base_id, 0);

        // Removing the texture removes the map component and changes the combine.
        material.set_texture_configurations(Vec::new());
        let without = system.resolve_material(&mut material).unwrap();
        assert!(!material.has_component(colour_map));
        assert_ne!(combine.base_id, without.base_id);
    }

    #[test]
    fn end_to_end_material_to_program() {
        let mut system = RenderSystem::new(RenderConfig::default()).unwrap();
        let mut material = lit_material(&system);
        system.resolve_material(&mut material).unwrap();

        // Pack the material record.
        material.set_chunk_value("roughness", 0.5f32.to_ne_bytes().to_vec());
        system.upload_material(&material, 0);

        let request = PipelineFlagsRequest {
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS | SubmeshFlag::TEXCOORDS0,
            textures: TextureCombine::default(),
            ..Default::default()
        };
        let flags = system
            .pipeline_flags(&OpaquePass, &mut material, &request)
            .unwrap();

        let program = system.program(&flags).unwrap();
        assert!(program.stage(ShaderStage::Vertex).is_some());
        assert!(program.stage(ShaderStage::Fragment).is_some());

        // Second request for the same selector hits the cache.
        let again = system.program(&flags).unwrap();
        assert!(Arc::ptr_eq(&program, &again));
        assert_eq!(system.cache_stats(), (1, 0));
    }

    #[test]
    fn depth_and_opaque_share_the_material_but_not_the_program() {
        let mut system = RenderSystem::new(RenderConfig::default()).unwrap();
        let mut material = lit_material(&system);
        system.resolve_material(&mut material).unwrap();

        let request = PipelineFlagsRequest {
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS,
            ..Default::default()
        };
        let opaque = system
            .pipeline_flags(&OpaquePass, &mut material, &request)
            .unwrap();
        let depth = system
            .pipeline_flags(&DepthPass, &mut material, &request)
            .unwrap();

        assert_ne!(opaque, depth);
        assert!(system.program(&opaque).is_some());
        assert!(system.program(&depth).is_some());
        assert_eq!(system.cache_stats(), (2, 0));
    }

    #[test]
    fn material_record_round_trips_through_the_buffer() {
        let mut system = RenderSystem::new(RenderConfig::default()).unwrap();
        let mut material = lit_material(&system);
        system.resolve_material(&mut material).unwrap();

        material.set_chunk_value("roughness", 0.25f32.to_ne_bytes().to_vec());
        system.upload_material(&material, 3);

        let layout = system.register().material_layout().clone();
        let roughness = system.register().component_id("roughness").unwrap();
        let offset = layout.chunk_offset(roughness).unwrap() as usize;

        let mut bytes =
            vec![0u8; layout.stride as usize * system.config().limits.max_materials];
        system.materials().upload(&mut bytes);
        let base = 3 * layout.stride as usize + offset;
        let value = f32::from_ne_bytes(bytes[base..base + 4].try_into().unwrap());
        assert_eq!(value, 0.25);
    }
}
