//! Built-in pass components
//!
//! The component set shipped with the renderer. External code adds its own
//! kinds through [`PluginFactory`](crate::plugins::PluginFactory) lists;
//! these are simply the factories loaded first.

pub mod base;
pub mod lighting;
pub mod maps;

pub use base::{
    AlphaTestComponent, BlendComponent, ColourComponent, NormalsComponent, OpacityComponent,
    PassHeaderComponent, TexturesComponent,
};
pub use lighting::{
    ClearcoatComponent, EmissiveComponent, LightingModelComponent, MetalnessComponent,
    RoughnessComponent, SheenComponent, SpecularComponent, SubsurfaceScatteringComponent,
    TransmissionComponent,
};
pub use maps::{
    ColourMapComponent, EmissiveMapComponent, HeightMapComponent, MetalnessMapComponent,
    NormalMapComponent, OcclusionMapComponent, OpacityMapComponent, ParallaxOcclusionComponent,
    ParallaxOcclusionRepeatComponent, RoughnessMapComponent,
};

use crate::plugins::PluginFactory;

/// Factories for every built-in component, in registration order.
///
/// The order is part of the determinism contract: component ids follow it,
/// and generated shader code iterates components in id order.
pub fn factories() -> Vec<PluginFactory> {
    vec![
        PluginFactory::new("pass-header", || Box::new(PassHeaderComponent)),
        PluginFactory::new("colour", || Box::new(ColourComponent)),
        PluginFactory::new("opacity", || Box::new(OpacityComponent)),
        PluginFactory::new("blend", || Box::new(BlendComponent)),
        PluginFactory::new("alpha-test", || Box::new(AlphaTestComponent)),
        PluginFactory::new("normals", || Box::new(NormalsComponent)),
        PluginFactory::new("textures", || Box::new(TexturesComponent)),
        PluginFactory::new("lighting-model", || Box::new(LightingModelComponent)),
        PluginFactory::new("metalness", || Box::new(MetalnessComponent)),
        PluginFactory::new("roughness", || Box::new(RoughnessComponent)),
        PluginFactory::new("specular", || Box::new(SpecularComponent)),
        PluginFactory::new("emissive", || Box::new(EmissiveComponent)),
        PluginFactory::new("transmission", || Box::new(TransmissionComponent)),
        PluginFactory::new("clearcoat", || Box::new(ClearcoatComponent)),
        PluginFactory::new("sheen", || Box::new(SheenComponent)),
        PluginFactory::new("subsurface-scattering", || {
            Box::new(SubsurfaceScatteringComponent)
        }),
        PluginFactory::new("colour-map", || Box::new(ColourMapComponent)),
        PluginFactory::new("opacity-map", || Box::new(OpacityMapComponent)),
        PluginFactory::new("normal-map", || Box::new(NormalMapComponent)),
        PluginFactory::new("roughness-map", || Box::new(RoughnessMapComponent)),
        PluginFactory::new("metalness-map", || Box::new(MetalnessMapComponent)),
        PluginFactory::new("emissive-map", || Box::new(EmissiveMapComponent)),
        PluginFactory::new("occlusion-map", || Box::new(OcclusionMapComponent)),
        PluginFactory::new("height-map", || Box::new(HeightMapComponent)),
        PluginFactory::new("parallax-occlusion", || Box::new(ParallaxOcclusionComponent)),
        PluginFactory::new("parallax-occlusion-repeat", || {
            Box::new(ParallaxOcclusionRepeatComponent)
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_names_match_their_plugins() {
        for factory in factories() {
            assert_eq!(factory.name(), (factory.construct()).name());
        }
    }

    #[test]
    fn factory_names_are_unique() {
        let factories = factories();
        let mut names: Vec<_> = factories.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), factories.len());
    }
}
