//! # Render Core
//!
//! Component-driven material and shader-variant system for a Vulkan
//! renderer.
//!
//! ## Features
//!
//! - **Component Registry**: Material capabilities as plugins with stable
//!   ids and deduplicated combines
//! - **Runtime Shader Assembly**: GLSL generated from the active component
//!   set, deterministic per flag combination
//! - **Layout Agreement**: One std140/std430 layout description drives both
//!   the CPU mirrors and the generated shader blocks
//! - **Pass Orchestration**: Template render passes assembling variant
//!   selectors and fixed-function state
//! - **Program Caching**: One generated program per distinct selector, with
//!   terminal failure states
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut system = RenderSystem::new(RenderConfig::default())?;
//!
//!     let mut material = Pass::new("stone");
//!     material.add_component(system.register().component_id("colour")?);
//!     material.add_component(system.register().component_id("opacity")?);
//!     system.resolve_material(&mut material)?;
//!
//!     let flags = system.pipeline_flags(
//!         &OpaquePass,
//!         &mut material,
//!         &PipelineFlagsRequest {
//!             submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS,
//!             ..Default::default()
//!         },
//!     )?;
//!     let program = system.program(&flags).expect("generation succeeds");
//!     println!("{}", program.stage(ShaderStage::Fragment).unwrap());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod buffers;
pub mod component;
pub mod config;
pub mod flags;
pub mod foundation;
pub mod pipeline;
pub mod plugins;
pub mod shader;

mod render_system;

pub use render_system::RenderSystem;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        component::{Pass, PassComponentPlugin, PassComponentRegister},
        config::RenderConfig,
        flags::{
            PassComponentCombine, ProgramFlag, SceneFlag, ShaderFlag, SubmeshFlag, TextureFlag,
        },
        pipeline::{
            DepthPass, OpaquePass, PipelineFlags, PipelineFlagsRequest, RenderNodesPass,
            ShaderProgramCache, TransparentPass,
        },
        plugins::PluginFactory,
        shader::{ProgramSource, ShaderStage},
        RenderSystem,
    };
}
