//! Texture-map components
//!
//! Map components are toggled automatically from the pass's texture
//! configurations: when a texture feeds a role, the matching map component
//! joins the combine, and it leaves when no texture feeds it any more. They
//! carry no material chunk of their own; their effect is the sampling code
//! applied to the base component's value.
//!
//! The parallax components are the exception: they are user-selected modes
//! on top of the height map, and the one-pass and repeated variants are
//! mutually exclusive.

use crate::component::plugin::PassComponentPlugin;
use crate::flags::{ComponentModeFlags, TextureFlag};

macro_rules! map_component {
    ($component:ident, $name:literal, $flag:ident, $modes:expr) => {
        #[doc = concat!("Map component toggled by `", $name, "` textures.")]
        pub struct $component;

        impl PassComponentPlugin for $component {
            fn name(&self) -> &'static str {
                $name
            }

            fn modes(&self) -> ComponentModeFlags {
                $modes
            }

            fn is_map_component(&self) -> bool {
                true
            }

            fn texture_flags(&self) -> TextureFlag {
                TextureFlag::$flag
            }
        }
    };
}

map_component!(
    ColourMapComponent,
    "colour-map",
    COLOUR,
    ComponentModeFlags::COLOUR
);
map_component!(
    OpacityMapComponent,
    "opacity-map",
    OPACITY,
    ComponentModeFlags::OPACITY
);
map_component!(
    NormalMapComponent,
    "normal-map",
    NORMAL,
    ComponentModeFlags::NORMALS
);
map_component!(
    RoughnessMapComponent,
    "roughness-map",
    ROUGHNESS,
    ComponentModeFlags::SPECULAR_LIGHTING.union(ComponentModeFlags::DIFFUSE_LIGHTING)
);
map_component!(
    MetalnessMapComponent,
    "metalness-map",
    METALNESS,
    ComponentModeFlags::SPECULAR_LIGHTING
);
map_component!(
    EmissiveMapComponent,
    "emissive-map",
    EMISSIVE,
    ComponentModeFlags::COLOUR
);
map_component!(
    OcclusionMapComponent,
    "occlusion-map",
    OCCLUSION,
    ComponentModeFlags::OCCLUSION
);
map_component!(
    HeightMapComponent,
    "height-map",
    HEIGHT,
    ComponentModeFlags::GEOMETRY
);

/// One-pass parallax occlusion mapping on the height map.
pub struct ParallaxOcclusionComponent;

impl PassComponentPlugin for ParallaxOcclusionComponent {
    fn name(&self) -> &'static str {
        "parallax-occlusion"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["height-map"]
    }

    fn excludes(&self) -> &'static [&'static str] {
        &["parallax-occlusion-repeat"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::GEOMETRY
    }

    fn provides_parallax_occlusion_one(&self) -> bool {
        true
    }
}

/// Repeated parallax occlusion mapping on the height map.
pub struct ParallaxOcclusionRepeatComponent;

impl PassComponentPlugin for ParallaxOcclusionRepeatComponent {
    fn name(&self) -> &'static str {
        "parallax-occlusion-repeat"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["height-map"]
    }

    fn excludes(&self) -> &'static [&'static str] {
        &["parallax-occlusion"]
    }

    fn modes(&self) -> ComponentModeFlags {
        ComponentModeFlags::GEOMETRY
    }

    fn provides_parallax_occlusion_repeat(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_components_declare_their_texture_role() {
        assert!(ColourMapComponent.is_map_component());
        assert_eq!(ColourMapComponent.texture_flags(), TextureFlag::COLOUR);
        assert_eq!(NormalMapComponent.texture_flags(), TextureFlag::NORMAL);
        assert_eq!(HeightMapComponent.texture_flags(), TextureFlag::HEIGHT);
    }

    #[test]
    fn parallax_variants_are_mutually_exclusive() {
        assert_eq!(
            ParallaxOcclusionComponent.excludes(),
            &["parallax-occlusion-repeat"]
        );
        assert_eq!(
            ParallaxOcclusionRepeatComponent.excludes(),
            &["parallax-occlusion"]
        );
        assert!(ParallaxOcclusionComponent.provides_parallax_occlusion_one());
        assert!(ParallaxOcclusionRepeatComponent.provides_parallax_occlusion_repeat());
    }
}
