//! Pass component system
//!
//! Components are the unit of material capability: each kind is a plugin
//! registered once at startup, passes activate kinds per material layer, and
//! the register resolves active sets into deduplicated combines that key all
//! shader and pipeline caching.

pub mod builtin;
pub mod pass;
pub mod plugin;
pub mod register;

pub use pass::Pass;
pub use plugin::{ComponentsShader, PassComponentPlugin};
pub use register::{ComponentError, PassComponentRegister, MAX_PASS_COMBINES};
