//! Render node passes
//!
//! A render nodes pass draws a set of scene nodes with a family of shader
//! variants. The base trait is a template: the shared `pipeline_flags`
//! assembly calls the per-pass hooks (flag adjustment, component filter,
//! blend/depth state), so a concrete pass only states how it differs from
//! the default behaviour.

use std::sync::Arc;

use ash::vk;

use crate::component::pass::Pass;
use crate::component::register::{ComponentError, PassComponentRegister};
use crate::flags::{
    ComponentModeFlags, ProgramFlag, SceneFlag, ShaderFlag, SubmeshFlag, TextureCombine,
};
use crate::pipeline::cache::ShaderProgramCache;
use crate::pipeline::flags::{LightingModelId, PipelineFlags};
use crate::shader::writer::ProgramSource;

/// One descriptor binding a pass's programs consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlot {
    /// Binding index within the set.
    pub binding: u32,
    /// Descriptor type.
    pub descriptor: vk::DescriptorType,
    /// Stages that access the binding.
    pub stages: vk::ShaderStageFlags,
    /// Array size; 1 for non-arrayed bindings.
    pub count: u32,
}

/// Depth/stencil configuration of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Depth test enabled.
    pub test: bool,
    /// Depth writes enabled.
    pub write: bool,
    /// Depth comparison.
    pub compare: vk::CompareOp,
}

/// Inputs to one pipeline-flags assembly.
#[derive(Debug, Clone)]
pub struct PipelineFlagsRequest {
    /// Vertex attribute streams the submesh provides.
    pub submesh: SubmeshFlag,
    /// Program switches requested by the draw path.
    pub program: ProgramFlag,
    /// Scene feature switches currently active.
    pub scene: SceneFlag,
    /// Texture set identity of the pass.
    pub textures: TextureCombine,
    /// Alpha comparison configured on the material.
    pub alpha_func: vk::CompareOp,
    /// Lighting model selected for the pass.
    pub lighting_model: LightingModelId,
    /// Pass layer index.
    pub pass_layer: u8,
}

impl Default for PipelineFlagsRequest {
    fn default() -> Self {
        Self {
            submesh: SubmeshFlag::default(),
            program: ProgramFlag::default(),
            scene: SceneFlag::default(),
            textures: TextureCombine::default(),
            alpha_func: vk::CompareOp::ALWAYS,
            lighting_model: LightingModelId::default(),
            pass_layer: 0,
        }
    }
}

/// Template for render node passes.
pub trait RenderNodesPass {
    /// Diagnostic pass name.
    fn name(&self) -> &'static str;

    /// Stage data this pass's shaders consume.
    fn shader_flags(&self) -> ShaderFlag;

    /// Component aspects this pass keeps; everything else is stripped from
    /// the resolved combine before it keys any caching.
    fn components_filter(&self) -> ComponentModeFlags;

    /// Hook: pass-specific program flag adjustment.
    fn adjust_program_flags(&self, flags: ProgramFlag) -> ProgramFlag {
        flags
    }

    /// Hook: pass-specific scene flag adjustment.
    fn adjust_scene_flags(&self, flags: SceneFlag) -> SceneFlag {
        flags
    }

    /// Colour blend state for one attachment.
    ///
    /// The default blends when the combine carries alpha blending and
    /// writes opaquely otherwise.
    fn create_blend_state(&self, flags: &PipelineFlags) -> vk::PipelineColorBlendAttachmentState {
        if flags.uses_alpha_blending() {
            vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::TRUE,
                src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
                dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
                alpha_blend_op: vk::BlendOp::ADD,
                color_write_mask: vk::ColorComponentFlags::RGBA,
            }
        } else {
            vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::FALSE,
                color_write_mask: vk::ColorComponentFlags::RGBA,
                ..Default::default()
            }
        }
    }

    /// Depth/stencil state; the default tests and writes with LESS.
    fn create_depth_state(&self, _flags: &PipelineFlags) -> DepthState {
        DepthState {
            test: true,
            write: true,
            compare: vk::CompareOp::LESS,
        }
    }

    /// Descriptor bindings shared by all of this pass's programs.
    fn descriptor_bindings(&self) -> Vec<BindingSlot> {
        let geometry_stages = vk::ShaderStageFlags::VERTEX
            | vk::ShaderStageFlags::MESH_EXT
            | vk::ShaderStageFlags::TASK_EXT;
        vec![
            BindingSlot {
                binding: 0,
                descriptor: vk::DescriptorType::UNIFORM_BUFFER,
                stages: geometry_stages | vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            BindingSlot {
                binding: 1,
                descriptor: vk::DescriptorType::STORAGE_BUFFER,
                stages: geometry_stages,
                count: 1,
            },
            BindingSlot {
                binding: 2,
                descriptor: vk::DescriptorType::STORAGE_BUFFER,
                stages: geometry_stages,
                count: 1,
            },
        ]
    }

    /// Assembles the variant selector for one node under this pass.
    ///
    /// Shared template: resolve the material's combine, strip the aspects
    /// this pass filters out, publish the filtered set so it carries a
    /// stable id, then apply the per-pass flag hooks. The filtered set is
    /// published without dependency re-validation: filtering may legally
    /// strip a requirement while keeping its dependent.
    fn pipeline_flags(
        &self,
        register: &mut PassComponentRegister,
        pass: &mut Pass,
        request: &PipelineFlagsRequest,
    ) -> Result<PipelineFlags, ComponentError> {
        let combine = register.resolve_pass_combine(pass)?;
        let filtered = register.filter_combine(self.components_filter(), &combine);
        let published = register.resolve_filtered_combine(&filtered)?;

        Ok(PipelineFlags {
            pass: published,
            submesh: request.submesh,
            program: self.adjust_program_flags(request.program),
            scene: self.adjust_scene_flags(request.scene),
            shader: self.shader_flags(),
            textures: request.textures,
            alpha_func: request.alpha_func,
            lighting_model: request.lighting_model,
            pass_layer: request.pass_layer,
        })
    }

    /// Fetches or generates the program for a selector.
    ///
    /// `None` when generation failed; the draw for this selector is skipped
    /// rather than aborting the frame.
    fn prepare_program(
        &self,
        register: &PassComponentRegister,
        cache: &mut ShaderProgramCache,
        flags: &PipelineFlags,
    ) -> Option<Arc<ProgramSource>> {
        cache.get_or_build(register, flags)
    }
}

/// Forward opaque colour pass.
pub struct OpaquePass;

impl RenderNodesPass for OpaquePass {
    fn name(&self) -> &'static str {
        "opaque"
    }

    fn shader_flags(&self) -> ShaderFlag {
        ShaderFlag::NORMAL
            | ShaderFlag::TANGENT
            | ShaderFlag::WORLD_SPACE
            | ShaderFlag::VIEW_SPACE
            | ShaderFlag::COLOUR
            | ShaderFlag::OPACITY
            | ShaderFlag::LIGHTING
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::all()
    }
}

/// Forward transparent colour pass.
pub struct TransparentPass;

impl RenderNodesPass for TransparentPass {
    fn name(&self) -> &'static str {
        "transparent"
    }

    fn shader_flags(&self) -> ShaderFlag {
        OpaquePass.shader_flags()
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::all()
    }

    fn create_depth_state(&self, _flags: &PipelineFlags) -> DepthState {
        // Transparent draws test against opaque depth but never write it.
        DepthState {
            test: true,
            write: false,
            compare: vk::CompareOp::LESS_OR_EQUAL,
        }
    }
}

/// Depth prepass.
pub struct DepthPass;

impl RenderNodesPass for DepthPass {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn shader_flags(&self) -> ShaderFlag {
        ShaderFlag::DEPTH | ShaderFlag::OPACITY
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY | ComponentModeFlags::GEOMETRY
    }

    fn adjust_scene_flags(&self, flags: SceneFlag) -> SceneFlag {
        // Depth output is independent of lighting features.
        flags - SceneFlag::ALL_GLOBAL_ILLUMINATION - SceneFlag::ALL_FOG - SceneFlag::SHADOWS
    }

    fn create_blend_state(&self, _flags: &PipelineFlags) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            color_write_mask: vk::ColorComponentFlags::empty(),
            ..Default::default()
        }
    }
}

/// Visibility-buffer pass: writes packed node/primitive ids.
pub struct VisibilityPass;

impl RenderNodesPass for VisibilityPass {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn shader_flags(&self) -> ShaderFlag {
        ShaderFlag::DEPTH | ShaderFlag::OPACITY
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY | ComponentModeFlags::GEOMETRY
    }

    fn adjust_scene_flags(&self, flags: SceneFlag) -> SceneFlag {
        flags - SceneFlag::ALL_GLOBAL_ILLUMINATION - SceneFlag::ALL_FOG
    }
}

/// Mouse picking pass: writes node ids under the cursor.
pub struct PickingPass;

impl RenderNodesPass for PickingPass {
    fn name(&self) -> &'static str {
        "picking"
    }

    fn shader_flags(&self) -> ShaderFlag {
        ShaderFlag::PICKING | ShaderFlag::OPACITY
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY | ComponentModeFlags::GEOMETRY
    }

    fn adjust_scene_flags(&self, _flags: SceneFlag) -> SceneFlag {
        SceneFlag::empty()
    }
}

/// Shadow map projection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// Omnidirectional cube map.
    Point,
    /// Single frustum map.
    Spot,
}

/// Shadow map pass.
pub struct ShadowPass {
    kind: ShadowKind,
}

impl ShadowPass {
    /// Shadow pass for one projection kind.
    pub fn new(kind: ShadowKind) -> Self {
        Self { kind }
    }

    /// The projection kind.
    pub fn kind(&self) -> ShadowKind {
        self.kind
    }
}

impl RenderNodesPass for ShadowPass {
    fn name(&self) -> &'static str {
        match self.kind {
            ShadowKind::Point => "shadow-point",
            ShadowKind::Spot => "shadow-spot",
        }
    }

    fn shader_flags(&self) -> ShaderFlag {
        match self.kind {
            // Point shadows store linear distance, which needs world space.
            ShadowKind::Point => ShaderFlag::DEPTH | ShaderFlag::OPACITY | ShaderFlag::WORLD_SPACE,
            ShadowKind::Spot => ShaderFlag::DEPTH | ShaderFlag::OPACITY,
        }
    }

    fn components_filter(&self) -> ComponentModeFlags {
        ComponentModeFlags::OPACITY | ComponentModeFlags::GEOMETRY
    }

    fn adjust_scene_flags(&self, _flags: SceneFlag) -> SceneFlag {
        SceneFlag::empty()
    }

    fn create_depth_state(&self, _flags: &PipelineFlags) -> DepthState {
        DepthState {
            test: true,
            write: true,
            compare: vk::CompareOp::LESS_OR_EQUAL,
        }
    }
}
