//! Material pass - the consumer of component resolution
//!
//! A pass is one renderable material layer: a set of active component
//! kinds, the values they pack into the material buffer, and the texture
//! configurations feeding its map components. The pass itself holds no
//! shader knowledge; it is resolved through the register into a
//! [`PassComponentCombine`](crate::flags::PassComponentCombine) whose id
//! keys all downstream caching.

use std::collections::{BTreeSet, HashMap};

use crate::flags::{PassCombineId, PassComponentId, TextureConfiguration};

/// One material pass's component set and data.
#[derive(Debug, Default)]
pub struct Pass {
    name: String,
    active: BTreeSet<PassComponentId>,
    chunk_values: HashMap<String, Vec<u8>>,
    texture_configurations: Vec<TextureConfiguration>,
    combine_id: PassCombineId,
}

impl Pass {
    /// Empty pass with a diagnostic name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Activates a component kind; invalidates the cached combine id.
    pub fn add_component(&mut self, id: PassComponentId) {
        if self.active.insert(id) {
            self.combine_id = 0;
        }
    }

    /// Deactivates a component kind; invalidates the cached combine id.
    pub fn remove_component(&mut self, id: PassComponentId) {
        if self.active.remove(&id) {
            self.combine_id = 0;
        }
    }

    /// True when the component kind is active.
    pub fn has_component(&self, id: PassComponentId) -> bool {
        self.active.contains(&id)
    }

    /// Active component ids in ascending (registration) order.
    pub fn components(&self) -> impl Iterator<Item = PassComponentId> + '_ {
        self.active.iter().copied()
    }

    /// Stores the packed value a component writes into the material buffer.
    pub fn set_chunk_value(&mut self, component_name: impl Into<String>, value: Vec<u8>) {
        self.chunk_values.insert(component_name.into(), value);
    }

    /// Packed value for a component, if set.
    pub fn chunk_value(&self, component_name: &str) -> Option<&[u8]> {
        self.chunk_values
            .get(component_name)
            .map(Vec::as_slice)
    }

    /// Adds a texture configuration feeding this pass's map components.
    pub fn add_texture_configuration(&mut self, configuration: TextureConfiguration) {
        self.texture_configurations.push(configuration);
        self.combine_id = 0;
    }

    /// Replaces all texture configurations.
    pub fn set_texture_configurations(&mut self, configurations: Vec<TextureConfiguration>) {
        self.texture_configurations = configurations;
        self.combine_id = 0;
    }

    /// Texture configurations in declaration order.
    pub fn texture_configurations(&self) -> &[TextureConfiguration] {
        &self.texture_configurations
    }

    /// Cached combine id; 0 until resolved (or after any mutation).
    pub fn combine_id(&self) -> PassCombineId {
        self.combine_id
    }

    pub(crate) fn set_combine_id(&mut self, id: PassCombineId) {
        self.combine_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_mutation_invalidates_combine_id() {
        let mut pass = Pass::new("test");
        pass.add_component(1);
        pass.set_combine_id(4);
        assert_eq!(pass.combine_id(), 4);

        pass.add_component(2);
        assert_eq!(pass.combine_id(), 0);

        pass.set_combine_id(7);
        pass.remove_component(1);
        assert_eq!(pass.combine_id(), 0);
    }

    #[test]
    fn redundant_mutation_keeps_combine_id() {
        let mut pass = Pass::new("test");
        pass.add_component(1);
        pass.set_combine_id(4);

        // Adding an already-active component changes nothing.
        pass.add_component(1);
        assert_eq!(pass.combine_id(), 4);
    }

    #[test]
    fn components_iterate_in_ascending_order() {
        let mut pass = Pass::new("test");
        pass.add_component(5);
        pass.add_component(1);
        pass.add_component(3);

        assert_eq!(pass.components().collect::<Vec<_>>(), vec![1, 3, 5]);
    }
}
