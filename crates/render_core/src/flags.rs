//! Bit-flag model for render capabilities
//!
//! Every orthogonal capability in the renderer is described by a bit in one
//! of the mask enumerations below. Combining two flag sets is a bitwise OR,
//! testing a capability is a bitwise AND. Bit values are stable for the
//! lifetime of a build: generated shader variants are cached by keys derived
//! from these bits.
//!
//! Pass-component bits are the one exception to the static enumerations:
//! component kinds receive their bit position at registration time, so their
//! flag set is the dynamic [`PassComponentFlags`] bitset rather than a
//! `bitflags` enum.

use bitflags::bitflags;

bitflags! {
    /// Semantic roles a texture channel can feed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlag: u32 {
        /// Base colour (albedo) map
        const COLOUR = 1 << 0;
        /// Opacity map
        const OPACITY = 1 << 1;
        /// Tangent-space normal map
        const NORMAL = 1 << 2;
        /// Height/displacement map
        const HEIGHT = 1 << 3;
        /// Ambient occlusion map
        const OCCLUSION = 1 << 4;
        /// Roughness map
        const ROUGHNESS = 1 << 5;
        /// Metalness map
        const METALNESS = 1 << 6;
        /// Specular colour map
        const SPECULAR = 1 << 7;
        /// Emissive map
        const EMISSIVE = 1 << 8;
        /// Transmission map
        const TRANSMISSION = 1 << 9;
        /// Clearcoat intensity map
        const CLEARCOAT = 1 << 10;
        /// Clearcoat normal map
        const CLEARCOAT_NORMAL = 1 << 11;
        /// Clearcoat roughness map
        const CLEARCOAT_ROUGHNESS = 1 << 12;
        /// Sheen colour map
        const SHEEN = 1 << 13;
        /// Sheen roughness map
        const SHEEN_ROUGHNESS = 1 << 14;
        /// Glossiness map (inverted roughness workflows)
        const GLOSSINESS = 1 << 15;
    }
}

bitflags! {
    /// Data a shader stage needs from the geometry pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFlag: u32 {
        /// Surface normals are consumed
        const NORMAL = 1 << 0;
        /// Tangent space is consumed (normal mapping)
        const TANGENT = 1 << 1;
        /// Per-vertex velocity output is produced
        const VELOCITY = 1 << 2;
        /// World-space positions are consumed
        const WORLD_SPACE = 1 << 3;
        /// View-space positions are consumed
        const VIEW_SPACE = 1 << 4;
        /// Depth-only output
        const DEPTH = 1 << 5;
        /// Picking id output
        const PICKING = 1 << 6;
        /// Vertex colours are consumed
        const COLOUR = 1 << 7;
        /// Opacity is evaluated
        const OPACITY = 1 << 8;
        /// Full lighting is evaluated
        const LIGHTING = 1 << 9;
    }
}

bitflags! {
    /// Program-level code-generation switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProgramFlag: u32 {
        /// Hardware instantiation (object ids fetched per instance)
        const INSTANTIATION = 1 << 0;
        /// Billboard expansion in the vertex stage
        const BILLBOARDS = 1 << 1;
        /// Morph-target animation inputs
        const MORPHING = 1 << 2;
        /// Skeletal skinning inputs
        const SKINNING = 1 << 3;
        /// Mesh-shading entry point (mesh stage replaces vertex stage)
        const HAS_MESH = 1 << 4;
        /// Task stage ahead of the mesh stage (per-meshlet culling)
        const HAS_TASK = 1 << 5;
    }
}

bitflags! {
    /// Scene-wide feature switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SceneFlag: u32 {
        /// Linear fog
        const FOG_LINEAR = 1 << 0;
        /// Exponential fog
        const FOG_EXPONENTIAL = 1 << 1;
        /// Squared exponential fog
        const FOG_SQUARED_EXPONENTIAL = 1 << 2;
        /// Shadow maps are sampled
        const SHADOWS = 1 << 3;
        /// Light propagation volumes GI
        const LPV_GI = 1 << 4;
        /// Layered light propagation volumes GI
        const LAYERED_LPV_GI = 1 << 5;
        /// Voxel cone tracing GI
        const VOXEL_CONE_TRACING = 1 << 6;
    }
}

impl SceneFlag {
    /// All global-illumination bits, stripped by passes that do not light.
    pub const ALL_GLOBAL_ILLUMINATION: Self = Self::LPV_GI
        .union(Self::LAYERED_LPV_GI)
        .union(Self::VOXEL_CONE_TRACING);

    /// All fog bits.
    pub const ALL_FOG: Self = Self::FOG_LINEAR
        .union(Self::FOG_EXPONENTIAL)
        .union(Self::FOG_SQUARED_EXPONENTIAL);
}

bitflags! {
    /// Vertex attribute streams a submesh provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SubmeshFlag: u32 {
        /// Positions stream
        const POSITIONS = 1 << 0;
        /// Normals stream
        const NORMALS = 1 << 1;
        /// Tangents stream
        const TANGENTS = 1 << 2;
        /// Bitangents stream
        const BITANGENTS = 1 << 3;
        /// Vertex colours stream
        const COLOURS = 1 << 4;
        /// First texture coordinates set
        const TEXCOORDS0 = 1 << 5;
        /// Second texture coordinates set
        const TEXCOORDS1 = 1 << 6;
        /// Third texture coordinates set
        const TEXCOORDS2 = 1 << 7;
        /// Per-vertex velocity stream
        const VELOCITY = 1 << 8;
        /// Per-instance object id stream
        const OBJECT_IDS = 1 << 9;
        /// Skinning weights/indices streams
        const SKIN = 1 << 10;
        /// Morph-target offsets
        const MORPH = 1 << 11;
    }
}

bitflags! {
    /// Filter selecting which aspects of a component a pass cares about.
    ///
    /// Depth-only passes keep opacity but drop lighting contributions,
    /// picking passes keep geometry only, and so on. Components whose every
    /// aspect is filtered out are stripped from the resolved combine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentModeFlags: u32 {
        /// Opacity evaluation
        const OPACITY = 1 << 0;
        /// Alpha blending participation
        const ALPHA_BLENDING = 1 << 1;
        /// Normal computation
        const NORMALS = 1 << 2;
        /// Geometry displacement
        const GEOMETRY = 1 << 3;
        /// Base colour
        const COLOUR = 1 << 4;
        /// Diffuse lighting inputs
        const DIFFUSE_LIGHTING = 1 << 5;
        /// Specular lighting inputs
        const SPECULAR_LIGHTING = 1 << 6;
        /// Occlusion inputs
        const OCCLUSION = 1 << 7;
        /// Model-specific extension data
        const SPECIFICS = 1 << 8;
    }
}

/// Identifier of a registered pass component kind.
///
/// Ids start at 1; 0 is never assigned. The id doubles as the component's
/// bit position (`id - 1`) in [`PassComponentFlags`].
pub type PassComponentId = u16;

/// Identifier of a resolved, deduplicated component combine.
///
/// Ids start at 1; 0 denotes "not resolved yet".
pub type PassCombineId = u16;

/// Hard ceiling on simultaneously registered component kinds.
///
/// One bit per kind in a 64-bit set. Exceeding this at registration is a
/// fatal configuration error, not a runtime-recoverable one.
pub const MAX_PASS_COMPONENTS: usize = 64;

/// Dynamic bitset of active pass-component kinds.
///
/// Unlike the static `bitflags` enumerations, component bits are assigned
/// by the register at startup, so this is a plain 64-bit set with the usual
/// mask operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PassComponentFlags(pub u64);

impl PassComponentFlags {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set with the single bit at `position` raised.
    ///
    /// `position` must be below [`MAX_PASS_COMPONENTS`].
    pub const fn from_bit(position: u8) -> Self {
        Self(1u64 << position)
    }

    /// True when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when any bit of `other` is set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Raises the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Raw bit value.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Iterates the raised bit positions in ascending order.
    pub fn iter_bits(self) -> impl Iterator<Item = u8> {
        (0..MAX_PASS_COMPONENTS as u8).filter(move |bit| self.0 & (1u64 << bit) != 0)
    }
}

impl std::ops::BitOr for PassComponentFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for PassComponentFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::Not for PassComponentFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Resolved set of components active for one material pass.
///
/// Built by the component register; immutable once published into the
/// deduplicating combine table. Two passes with identical component sets
/// share one combine id, and shader/pipeline caching keys off that id.
///
/// The booleans are derived from `flags` once at resolution time so the hot
/// path never rescans the bitset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassComponentCombine {
    /// Deduplicated table id; 0 until the combine is registered.
    pub base_id: PassCombineId,
    /// Active component bits.
    pub flags: PassComponentFlags,
    /// A component providing transmission is active.
    pub has_transmission: bool,
    /// A component providing alpha testing is active.
    pub has_alpha_test: bool,
    /// A component providing alpha blending is active.
    pub has_alpha_blending: bool,
    /// One-pass parallax occlusion mapping is active.
    pub has_parallax_occlusion_mapping_one: bool,
    /// Repeated parallax occlusion mapping is active.
    pub has_parallax_occlusion_mapping_repeat: bool,
    /// Deferred diffuse lighting (subsurface scattering) is active.
    pub has_deferred_diffuse_lighting: bool,
}

// Equality is structural: base id + flags. The derived booleans are a pure
// function of `flags` and must not influence identity.
impl PartialEq for PassComponentCombine {
    fn eq(&self, other: &Self) -> bool {
        self.base_id == other.base_id && self.flags == other.flags
    }
}

impl Eq for PassComponentCombine {}

impl std::hash::Hash for PassComponentCombine {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.base_id.hash(state);
        self.flags.hash(state);
    }
}

/// True when any bit of `flags` is active in the combine.
pub fn has_any(combine: &PassComponentCombine, flags: PassComponentFlags) -> bool {
    combine.flags.intersects(flags)
}

/// Adds component bits to a combine.
///
/// The combine loses its published id: a mutated set must go back through
/// the register to obtain (or share) an id for the new bitset.
pub fn add_flags(combine: &mut PassComponentCombine, flags: PassComponentFlags) {
    combine.flags.insert(flags);
    combine.base_id = 0;
}

/// Removes component bits from a combine.
///
/// Same re-resolution requirement as [`add_flags`].
pub fn rem_flags(combine: &mut PassComponentCombine, flags: PassComponentFlags) {
    combine.flags.remove(flags);
    combine.base_id = 0;
}

/// A texture flag set paired with its deduplicated configuration id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureFlagsId {
    /// Semantic roles the texture feeds.
    pub flags: TextureFlag,
    /// Configuration table id.
    pub id: u32,
}

/// Deduplicated identity of the set of textures a pass samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureCombine {
    /// Number of distinct texture configurations.
    pub config_count: u32,
    /// Union of the semantic roles fed by the textures.
    pub flags: TextureFlag,
}

/// Maps one texture's channel range onto a semantic component slot.
///
/// `start_index` is the first channel (0 = red) and `component_count` the
/// number of consecutive channels read, e.g. roughness stored in green is
/// `{ flag: ROUGHNESS, start_index: 1, component_count: 1 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFlagConfiguration {
    /// Semantic role fed by the channel range.
    pub flag: TextureFlag,
    /// First channel read (0 = red).
    pub start_index: u32,
    /// Number of consecutive channels read.
    pub component_count: u32,
}

/// Full channel-mapping description of one texture unit.
///
/// Produced at import time or on user edit; consumed when generating
/// per-pixel sampling code and when packing the texture-configuration
/// buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureConfiguration {
    /// Per-semantic channel mappings.
    pub configurations: Vec<TextureFlagConfiguration>,
}

impl TextureConfiguration {
    /// Union of the semantic roles this texture feeds.
    pub fn flags(&self) -> TextureFlag {
        self.configurations
            .iter()
            .fold(TextureFlag::empty(), |acc, config| acc | config.flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_flags_set_operations() {
        let a = PassComponentFlags::from_bit(0);
        let c = PassComponentFlags::from_bit(2);
        let both = a | c;

        assert_eq!(both.bits(), 0b101);
        assert!(both.intersects(a));
        assert!(both.contains(a | c));
        assert!(!both.intersects(PassComponentFlags::from_bit(1)));
        assert_eq!(both.iter_bits().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn add_then_rem_round_trips() {
        let original = PassComponentCombine {
            flags: PassComponentFlags::from_bit(3),
            ..Default::default()
        };
        let extra = PassComponentFlags::from_bit(7);

        let mut combine = original;
        add_flags(&mut combine, extra);
        assert!(has_any(&combine, extra));
        rem_flags(&mut combine, extra);

        assert_eq!(combine, original);
    }

    #[test]
    fn has_any_matches_membership() {
        let combine = PassComponentCombine {
            flags: PassComponentFlags::from_bit(0) | PassComponentFlags::from_bit(2),
            ..Default::default()
        };

        assert!(has_any(&combine, PassComponentFlags::from_bit(0)));
        assert!(!has_any(&combine, PassComponentFlags::from_bit(1)));
        assert!(has_any(&combine, PassComponentFlags::from_bit(2)));
    }

    #[test]
    fn combine_equality_ignores_derived_booleans() {
        let a = PassComponentCombine {
            base_id: 1,
            flags: PassComponentFlags::from_bit(0),
            has_alpha_test: true,
            ..Default::default()
        };
        let b = PassComponentCombine {
            base_id: 1,
            flags: PassComponentFlags::from_bit(0),
            ..Default::default()
        };

        assert_eq!(a, b);
    }

    #[test]
    fn texture_configuration_unions_flags() {
        let config = TextureConfiguration {
            configurations: vec![
                TextureFlagConfiguration {
                    flag: TextureFlag::COLOUR,
                    start_index: 0,
                    component_count: 3,
                },
                TextureFlagConfiguration {
                    flag: TextureFlag::OPACITY,
                    start_index: 3,
                    component_count: 1,
                },
            ],
        };

        assert_eq!(config.flags(), TextureFlag::COLOUR | TextureFlag::OPACITY);
    }
}
