//! Pipeline orchestration
//!
//! Assembles variant selectors from material, geometry and pass state,
//! caches generated programs per selector, and describes the fixed-function
//! state each pass configures.

pub mod cache;
pub mod flags;
pub mod pass;

pub use cache::ShaderProgramCache;
pub use flags::{LightingModelId, PipelineFlags};
pub use pass::{
    BindingSlot, DepthState, OpaquePass, DepthPass, PickingPass, PipelineFlagsRequest,
    RenderNodesPass, ShadowKind, ShadowPass, TransparentPass, VisibilityPass,
};
