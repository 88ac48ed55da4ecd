//! Pass component register
//!
//! Central authority mapping component kinds to stable ids/bit positions
//! and resolving heterogeneous active-component sets into comparable,
//! deduplicated [`PassComponentCombine`] values. The register is populated
//! once at engine start and read-only afterwards; combine resolution is the
//! only steady-state mutation (appending to the dedup table) and stays on
//! the calling thread.
//!
//! Determinism contract: a fixed registration order plus a fixed bitset
//! always yields the same combine id, and distinct bitsets never share an
//! id. Shader-variant caching keys off these ids, so they are never
//! renumbered once published.

use std::collections::HashMap;

use thiserror::Error;

use crate::buffers::material::{pack_chunks, MaterialBufferLayout, MaterialsBuffer};
use crate::buffers::layout::MemoryLayout;
use crate::component::pass::Pass;
use crate::component::plugin::{ComponentsShader, PassComponentPlugin};
use crate::flags::{
    ComponentModeFlags, PassCombineId, PassComponentCombine, PassComponentFlags, PassComponentId,
    TextureConfiguration, MAX_PASS_COMPONENTS,
};
use crate::pipeline::PipelineFlags;

/// Hard ceiling on distinct published combines.
pub const MAX_PASS_COMBINES: usize = 4096;

/// Component registration and resolution errors.
///
/// All of these are configuration errors: they fail the specific
/// material/pass operation and leave previously registered state valid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComponentError {
    /// Lookup by a name that was never registered.
    #[error("unknown component type [{0}]")]
    UnknownComponent(String),

    /// Lookup by an id that was never assigned.
    #[error("unknown component id {0}")]
    UnknownComponentId(PassComponentId),

    /// A second registration under an existing name.
    #[error("component type [{0}] is already registered")]
    DuplicateComponent(String),

    /// One bit per component kind; the 64-bit set is full.
    #[error("maximum supported component count ({MAX_PASS_COMPONENTS}) exceeded")]
    CapacityExceeded,

    /// A component's declared requirement is not in the resolved set.
    #[error("component [{component}] requires [{requirement}], which is not active")]
    MissingDependency {
        /// Component whose declaration failed.
        component: String,
        /// The missing requirement.
        requirement: String,
    },

    /// Two mutually exclusive components were both requested.
    #[error("components [{first}] and [{second}] are mutually exclusive")]
    ExclusiveConflict {
        /// Component declaring the exclusion.
        first: String,
        /// The excluded component.
        second: String,
    },

    /// The combine dedup table is full.
    #[error("maximum pass combine count ({MAX_PASS_COMBINES}) exceeded")]
    CombineOverflow,
}

struct RegisteredComponent {
    id: PassComponentId,
    plugin: Box<dyn PassComponentPlugin>,
}

/// The per-engine component registry.
pub struct PassComponentRegister {
    registered: Vec<RegisteredComponent>,
    ids_by_name: HashMap<&'static str, PassComponentId>,
    combines: Vec<PassComponentCombine>,
    combine_ids: HashMap<PassComponentFlags, PassCombineId>,
    alpha_blending_flag: PassComponentFlags,
    alpha_test_flag: PassComponentFlags,
    transmission_flag: PassComponentFlags,
    parallax_occlusion_one_flag: PassComponentFlags,
    parallax_occlusion_repeat_flag: PassComponentFlags,
    deferred_diffuse_flag: PassComponentFlags,
    material_layout: MaterialBufferLayout,
}

impl Default for PassComponentRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl PassComponentRegister {
    /// Empty register; the empty combine is pre-published as id 1 so an
    /// unconfigured pass still resolves to a valid identity.
    pub fn new() -> Self {
        let mut register = Self {
            registered: Vec::new(),
            ids_by_name: HashMap::new(),
            combines: Vec::new(),
            combine_ids: HashMap::new(),
            alpha_blending_flag: PassComponentFlags::empty(),
            alpha_test_flag: PassComponentFlags::empty(),
            transmission_flag: PassComponentFlags::empty(),
            parallax_occlusion_one_flag: PassComponentFlags::empty(),
            parallax_occlusion_repeat_flag: PassComponentFlags::empty(),
            deferred_diffuse_flag: PassComponentFlags::empty(),
            material_layout: MaterialBufferLayout::default(),
        };
        register
            .publish_combine(PassComponentFlags::empty())
            .expect("empty combine always fits");
        register
    }

    /// Registers a component kind, assigning the next free bit/id.
    ///
    /// Fails with [`ComponentError::CapacityExceeded`] past the component
    /// bit ceiling and [`ComponentError::DuplicateComponent`] on name
    /// reuse; previously registered components remain valid either way.
    pub fn register(
        &mut self,
        plugin: Box<dyn PassComponentPlugin>,
    ) -> Result<PassComponentId, ComponentError> {
        let name = plugin.name();
        if self.ids_by_name.contains_key(name) {
            return Err(ComponentError::DuplicateComponent(name.to_string()));
        }
        if self.registered.len() >= MAX_PASS_COMPONENTS {
            return Err(ComponentError::CapacityExceeded);
        }

        let id = (self.registered.len() + 1) as PassComponentId;
        let flag = PassComponentFlags::from_bit((id - 1) as u8);

        if plugin.provides_alpha_blending() {
            self.alpha_blending_flag.insert(flag);
        }
        if plugin.provides_alpha_test() {
            self.alpha_test_flag.insert(flag);
        }
        if plugin.provides_transmission() {
            self.transmission_flag.insert(flag);
        }
        if plugin.provides_parallax_occlusion_one() {
            self.parallax_occlusion_one_flag.insert(flag);
        }
        if plugin.provides_parallax_occlusion_repeat() {
            self.parallax_occlusion_repeat_flag.insert(flag);
        }
        if plugin.provides_deferred_diffuse_lighting() {
            self.deferred_diffuse_flag.insert(flag);
        }

        self.ids_by_name.insert(name, id);
        self.registered.push(RegisteredComponent { id, plugin });
        self.reorder_material_layout();

        log::debug!("Registered component id {} for [{}]", id, name);
        Ok(id)
    }

    /// Id of a component kind by its stable name.
    pub fn component_id(&self, name: &str) -> Result<PassComponentId, ComponentError> {
        self.ids_by_name
            .get(name)
            .copied()
            .ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))
    }

    /// Plugin behaviour object for an assigned id.
    pub fn plugin(&self, id: PassComponentId) -> Result<&dyn PassComponentPlugin, ComponentError> {
        self.registered
            .get(id.checked_sub(1).ok_or(ComponentError::UnknownComponentId(id))? as usize)
            .map(|component| component.plugin.as_ref())
            .ok_or(ComponentError::UnknownComponentId(id))
    }

    /// Single-bit flag set for an assigned id.
    pub fn component_flag(&self, id: PassComponentId) -> PassComponentFlags {
        if id == 0 || id as usize > self.registered.len() {
            return PassComponentFlags::empty();
        }
        PassComponentFlags::from_bit((id - 1) as u8)
    }

    /// Number of registered component kinds.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Resolves an active-component set into its deduplicated combine.
    ///
    /// Deterministic: the same set always yields the same id, distinct sets
    /// always yield distinct ids. Dependency and exclusion declarations are
    /// enforced here; a violation fails the resolution rather than
    /// silently degrading the combine.
    pub fn resolve_combine(
        &mut self,
        ids: &[PassComponentId],
    ) -> Result<PassComponentCombine, ComponentError> {
        let mut flags = PassComponentFlags::empty();
        for &id in ids {
            if id == 0 || id as usize > self.registered.len() {
                return Err(ComponentError::UnknownComponentId(id));
            }
            flags.insert(PassComponentFlags::from_bit((id - 1) as u8));
        }

        self.validate_flags(flags)?;
        self.publish_combine(flags)
    }

    /// Name-based variant of [`resolve_combine`](Self::resolve_combine).
    pub fn resolve_combine_by_name(
        &mut self,
        names: &[&str],
    ) -> Result<PassComponentCombine, ComponentError> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            ids.push(self.component_id(name)?);
        }
        self.resolve_combine(&ids)
    }

    /// Resolves a pass's active set and caches the id on the pass.
    pub fn resolve_pass_combine(
        &mut self,
        pass: &mut Pass,
    ) -> Result<PassComponentCombine, ComponentError> {
        let ids: Vec<_> = pass.components().collect();
        let combine = self.resolve_combine(&ids)?;
        pass.set_combine_id(combine.base_id);
        Ok(combine)
    }

    /// Published combine for an id; `None` for 0 or unknown ids.
    pub fn combine(&self, id: PassCombineId) -> Option<PassComponentCombine> {
        if id == 0 {
            return None;
        }
        self.combines.get(id as usize - 1).copied()
    }

    /// Rebuilds the derived booleans for an externally assembled bitset.
    pub fn fill_combine(&self, combine: &mut PassComponentCombine) {
        combine.has_transmission = combine.flags.intersects(self.transmission_flag);
        combine.has_alpha_test = combine.flags.intersects(self.alpha_test_flag);
        combine.has_alpha_blending = combine.flags.intersects(self.alpha_blending_flag);
        combine.has_parallax_occlusion_mapping_one =
            combine.flags.intersects(self.parallax_occlusion_one_flag);
        combine.has_parallax_occlusion_mapping_repeat =
            combine.flags.intersects(self.parallax_occlusion_repeat_flag);
        combine.has_deferred_diffuse_lighting =
            combine.flags.intersects(self.deferred_diffuse_flag);
    }

    /// Strips components whose every aspect is filtered out by `filter`.
    ///
    /// The returned combine is unpublished (id 0); pass it through
    /// [`resolve_filtered_combine`](Self::resolve_filtered_combine) before
    /// using it as a cache key.
    pub fn filter_combine(
        &self,
        filter: ComponentModeFlags,
        combine: &PassComponentCombine,
    ) -> PassComponentCombine {
        let mut flags = combine.flags;
        for component in &self.registered {
            let bit = PassComponentFlags::from_bit((component.id - 1) as u8);
            if flags.intersects(bit) && !component.plugin.modes().intersects(filter) {
                flags.remove(bit);
            }
        }

        let mut result = PassComponentCombine {
            base_id: 0,
            flags,
            ..Default::default()
        };
        self.fill_combine(&mut result);
        result
    }

    /// Publishes a combine produced by [`filter_combine`](Self::filter_combine).
    ///
    /// Filtering may strip a component that another kept component
    /// requires, so the set is published without dependency re-validation;
    /// the source combine already passed validation when first resolved.
    pub fn resolve_filtered_combine(
        &mut self,
        filtered: &PassComponentCombine,
    ) -> Result<PassComponentCombine, ComponentError> {
        self.publish_combine(filtered.flags)
    }

    /// All plugins in registration order, for surface construction.
    ///
    /// Every plugin gets a chance to append its surface fields; inactive
    /// ones contribute unused-sentinel entries, keeping the field order
    /// independent of the active set.
    pub fn surface_contributors(&self) -> impl Iterator<Item = &dyn PassComponentPlugin> {
        self.registered
            .iter()
            .map(|component| component.plugin.as_ref())
    }

    /// Shader contributors for the components active under `flags`,
    /// restricted to the aspects in `filter`, in registration order.
    pub fn components_shaders(
        &self,
        flags: &PipelineFlags,
        filter: ComponentModeFlags,
    ) -> Vec<Box<dyn ComponentsShader>> {
        let mut shaders = Vec::new();
        for component in &self.registered {
            let bit = PassComponentFlags::from_bit((component.id - 1) as u8);
            if !flags.pass.flags.intersects(bit) {
                continue;
            }
            if !component.plugin.modes().intersects(filter) {
                continue;
            }
            if let Some(shader) = component.plugin.components_shader() {
                shaders.push(shader);
            }
        }
        shaders
    }

    /// Packed material record layout for the registered component set.
    pub fn material_layout(&self) -> &MaterialBufferLayout {
        &self.material_layout
    }

    /// Writes one pass's chunks into one material record.
    ///
    /// Components the pass does not carry have their chunks zeroed, so a
    /// record never holds stale data from a previous configuration.
    pub fn fill_material_buffer(
        &self,
        pass: &Pass,
        material_index: usize,
        buffer: &mut MaterialsBuffer,
    ) {
        for slot in self.material_layout.slots.clone() {
            let Some(id) = slot.component else {
                continue;
            };
            let size = slot.kind.size(MemoryLayout::Std430) as usize;
            let Some(chunk) = buffer.chunk_mut(material_index, id, size) else {
                continue;
            };
            if pass.has_component(id) {
                if let Ok(plugin) = self.plugin(id) {
                    plugin.fill_material(pass, chunk);
                }
            } else {
                chunk.fill(0);
            }
        }
    }

    /// Reconciles a pass's map components with its texture configurations.
    ///
    /// Map components whose texture roles appear in the configurations are
    /// added; map components no longer fed by any texture are removed.
    pub fn update_map_components(
        &self,
        configurations: &[TextureConfiguration],
        pass: &mut Pass,
    ) {
        let mut needed_flags = crate::flags::TextureFlag::empty();
        for configuration in configurations {
            needed_flags |= configuration.flags();
        }

        for component in &self.registered {
            if !component.plugin.is_map_component() {
                continue;
            }
            let needed = component
                .plugin
                .texture_flags()
                .intersects(needed_flags);
            let present = pass.has_component(component.id);
            if needed && !present {
                pass.add_component(component.id);
            } else if !needed && present {
                pass.remove_component(component.id);
            }
        }
    }

    /// Derived flag mask: components providing alpha blending.
    pub fn alpha_blending_flag(&self) -> PassComponentFlags {
        self.alpha_blending_flag
    }

    /// Derived flag mask: components providing alpha testing.
    pub fn alpha_test_flag(&self) -> PassComponentFlags {
        self.alpha_test_flag
    }

    /// Derived flag mask: components providing transmission.
    pub fn transmission_flag(&self) -> PassComponentFlags {
        self.transmission_flag
    }

    fn validate_flags(&self, flags: PassComponentFlags) -> Result<(), ComponentError> {
        for component in &self.registered {
            let bit = PassComponentFlags::from_bit((component.id - 1) as u8);
            if !flags.intersects(bit) {
                continue;
            }

            for requirement in component.plugin.requires() {
                let required_bit = match self.ids_by_name.get(requirement) {
                    Some(&id) => PassComponentFlags::from_bit((id - 1) as u8),
                    None => PassComponentFlags::empty(),
                };
                if !flags.intersects(required_bit) {
                    return Err(ComponentError::MissingDependency {
                        component: component.plugin.name().to_string(),
                        requirement: (*requirement).to_string(),
                    });
                }
            }

            for excluded in component.plugin.excludes() {
                if let Some(&id) = self.ids_by_name.get(excluded) {
                    let excluded_bit = PassComponentFlags::from_bit((id - 1) as u8);
                    if flags.intersects(excluded_bit) {
                        return Err(ComponentError::ExclusiveConflict {
                            first: component.plugin.name().to_string(),
                            second: (*excluded).to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn publish_combine(
        &mut self,
        flags: PassComponentFlags,
    ) -> Result<PassComponentCombine, ComponentError> {
        if let Some(&id) = self.combine_ids.get(&flags) {
            let mut combine = self.combines[id as usize - 1];
            // Derived masks may have grown since publication.
            self.fill_combine(&mut combine);
            self.combines[id as usize - 1] = combine;
            return Ok(combine);
        }

        if self.combines.len() >= MAX_PASS_COMBINES {
            return Err(ComponentError::CombineOverflow);
        }

        let mut combine = PassComponentCombine {
            base_id: (self.combines.len() + 1) as PassCombineId,
            flags,
            ..Default::default()
        };
        self.fill_combine(&mut combine);
        self.combines.push(combine);
        self.combine_ids.insert(flags, combine.base_id);
        Ok(combine)
    }

    fn reorder_material_layout(&mut self) {
        let chunks = self
            .registered
            .iter()
            .filter_map(|component| {
                component
                    .plugin
                    .material_chunk()
                    .map(|chunk| (component.id, chunk))
            })
            .collect();
        self.material_layout = pack_chunks(chunks);
    }
}
