//! Aggregate pipeline flags
//!
//! Everything that selects a shader variant, gathered into one hashable
//! value: the resolved component combine, the geometry streams, the
//! program/scene/shader switches, the texture combine, and the few scalar
//! states (alpha compare, lighting model, layer) that generated code
//! branches on. Two pipelines with equal flags share one generated program.

use ash::vk;

use crate::flags::{
    PassComponentCombine, ProgramFlag, SceneFlag, ShaderFlag, SubmeshFlag, TextureCombine,
};

/// Identifier of a lighting model implementation (Phong, PBR, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightingModelId(pub u16);

/// Complete shader-variant selector for one render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineFlags {
    /// Resolved material component combine.
    pub pass: PassComponentCombine,
    /// Vertex attribute streams the submesh provides.
    pub submesh: SubmeshFlag,
    /// Program-level code-generation switches.
    pub program: ProgramFlag,
    /// Scene-wide feature switches.
    pub scene: SceneFlag,
    /// Stage data requirements of the owning pass.
    pub shader: ShaderFlag,
    /// Deduplicated identity of the sampled texture set.
    pub textures: TextureCombine,
    /// Alpha-test comparison; `ALWAYS` disables the test.
    pub alpha_func: vk::CompareOp,
    /// Selected lighting model.
    pub lighting_model: LightingModelId,
    /// Pass layer index (multi-layer materials).
    pub pass_layer: u8,
}

impl Default for PipelineFlags {
    fn default() -> Self {
        Self {
            pass: PassComponentCombine::default(),
            submesh: SubmeshFlag::default(),
            program: ProgramFlag::default(),
            scene: SceneFlag::default(),
            shader: ShaderFlag::default(),
            textures: TextureCombine::default(),
            alpha_func: vk::CompareOp::ALWAYS,
            lighting_model: LightingModelId::default(),
            pass_layer: 0,
        }
    }
}

impl PipelineFlags {
    /// True when the program uses the mesh-shading path.
    pub fn uses_mesh_shading(&self) -> bool {
        self.program.contains(ProgramFlag::HAS_MESH)
    }

    /// True when a task stage precedes the mesh stage.
    pub fn uses_task_stage(&self) -> bool {
        self.program.contains(ProgramFlag::HAS_TASK)
    }

    /// True when object ids are fetched per instance.
    pub fn uses_instantiation(&self) -> bool {
        self.program.contains(ProgramFlag::INSTANTIATION)
    }

    /// True when the fragment stage runs an alpha test.
    pub fn uses_alpha_test(&self) -> bool {
        self.pass.has_alpha_test && self.alpha_func != vk::CompareOp::ALWAYS
    }

    /// True when the pass blends into its colour target.
    pub fn uses_alpha_blending(&self) -> bool {
        self.pass.has_alpha_blending
    }

    /// True when the pass evaluates lighting.
    pub fn uses_lighting(&self) -> bool {
        self.shader.contains(ShaderFlag::LIGHTING)
    }

    /// True when geometry carries a tangent space.
    pub fn uses_tangent_space(&self) -> bool {
        self.shader.contains(ShaderFlag::TANGENT)
            && self.submesh.contains(SubmeshFlag::TANGENTS)
    }

    /// True when per-vertex velocity is produced.
    pub fn writes_velocity(&self) -> bool {
        self.shader.contains(ShaderFlag::VELOCITY)
    }

    /// Diagnostic rendering of the selector, for error messages.
    pub fn describe(&self) -> String {
        format!(
            "combine {} (bits {:#x}), submesh {:#x}, program {:#x}, scene {:#x}, shader {:#x}, \
             textures {}, layer {}",
            self.pass.base_id,
            self.pass.flags.bits(),
            self.submesh.bits(),
            self.program.bits(),
            self.scene.bits(),
            self.shader.bits(),
            self.textures.config_count,
            self.pass_layer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::PassComponentFlags;

    #[test]
    fn equal_selectors_hash_identically() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let make = || PipelineFlags {
            pass: PassComponentCombine {
                base_id: 3,
                flags: PassComponentFlags::from_bit(1),
                ..Default::default()
            },
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS,
            shader: ShaderFlag::NORMAL | ShaderFlag::LIGHTING,
            ..Default::default()
        };

        let hash = |flags: &PipelineFlags| {
            let mut hasher = DefaultHasher::new();
            flags.hash(&mut hasher);
            hasher.finish()
        };

        assert_eq!(make(), make());
        assert_eq!(hash(&make()), hash(&make()));
    }

    #[test]
    fn alpha_test_requires_both_component_and_compare_op() {
        let mut flags = PipelineFlags {
            pass: PassComponentCombine {
                has_alpha_test: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!flags.uses_alpha_test());

        flags.alpha_func = vk::CompareOp::GREATER;
        assert!(flags.uses_alpha_test());
    }

    #[test]
    fn tangent_space_requires_the_stream() {
        let flags = PipelineFlags {
            shader: ShaderFlag::TANGENT,
            submesh: SubmeshFlag::POSITIONS,
            ..Default::default()
        };
        assert!(!flags.uses_tangent_space());

        let flags = PipelineFlags {
            shader: ShaderFlag::TANGENT,
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::TANGENTS,
            ..Default::default()
        };
        assert!(flags.uses_tangent_space());
    }
}
