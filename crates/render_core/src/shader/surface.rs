//! Per-vertex surface structure builder
//!
//! The surface struct is assembled from the contributions of all active
//! components: each contributor appends its fields in turn, taking the next
//! available location index when the field is active and the UNUSED
//! sentinel when it is not. The builder is an explicit value threaded
//! through the contributor sequence, so the ordering dependency is visible
//! at every call site: apply contributors in registration order and the
//! resulting field order is reproducible across builds.

use crate::buffers::layout::FieldKind;
use crate::shader::writer::GlslWriter;

/// Sentinel location for fields declared but not active for these flags.
pub const UNUSED_LOCATION: u32 = u32::MAX;

/// One declared surface field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceField {
    /// Field name, shared by the vertex input and the stage-to-stage block.
    pub name: String,
    /// Semantic type.
    pub kind: FieldKind,
    /// Assigned location, or [`UNUSED_LOCATION`].
    pub location: u32,
}

/// Accumulator for the surface struct under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceBuilder {
    fields: Vec<SurfaceField>,
    next_location: u32,
}

impl SurfaceBuilder {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, consuming the next location when `active`.
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind, active: bool) -> Self {
        let location = if active {
            let location = self.next_location;
            self.next_location += 1;
            location
        } else {
            UNUSED_LOCATION
        };
        self.fields.push(SurfaceField {
            name: name.into(),
            kind,
            location,
        });
        self
    }

    /// Declared fields in application order, inactive entries included.
    pub fn fields(&self) -> &[SurfaceField] {
        &self.fields
    }

    /// Location of a named field; `None` when absent or inactive.
    pub fn location_of(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.location)
            .filter(|&location| location != UNUSED_LOCATION)
    }

    /// Number of active fields.
    pub fn active_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|field| field.location != UNUSED_LOCATION)
            .count()
    }

    /// Emits the active fields as stage interface declarations.
    ///
    /// `qualifier` is `in` or `out`; `prefix` namespaces the variable names
    /// (e.g. `vtx_`).
    pub fn declare(&self, writer: &mut GlslWriter, qualifier: &str, prefix: &str) {
        for field in &self.fields {
            if field.location == UNUSED_LOCATION {
                continue;
            }
            writer.line(&format!(
                "layout(location = {}) {} {} {}{};",
                field.location,
                qualifier,
                field.kind.glsl_name(),
                prefix,
                field.name,
            ));
        }
    }

    /// Emits the active fields as mesh-stage per-vertex outputs.
    ///
    /// A mesh shader writes one element per emitted vertex, so every field
    /// becomes an unsized output array; the fragment side keeps the plain
    /// [`declare`](Self::declare) form.
    pub fn declare_per_vertex(&self, writer: &mut GlslWriter, prefix: &str) {
        for field in &self.fields {
            if field.location == UNUSED_LOCATION {
                continue;
            }
            writer.line(&format!(
                "layout(location = {}) out {} {}{}[];",
                field.location,
                field.kind.glsl_name(),
                prefix,
                field.name,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_fields_take_consecutive_locations() {
        let surface = SurfaceBuilder::new()
            .with_field("position", FieldKind::Vec4, true)
            .with_field("normal", FieldKind::Vec3, false)
            .with_field("texcoord0", FieldKind::Vec3, true);

        assert_eq!(surface.location_of("position"), Some(0));
        assert_eq!(surface.location_of("normal"), None);
        assert_eq!(surface.location_of("texcoord0"), Some(1));
        assert_eq!(surface.active_count(), 2);
    }

    #[test]
    fn field_order_is_application_order() {
        let build = || {
            SurfaceBuilder::new()
                .with_field("position", FieldKind::Vec4, true)
                .with_field("normal", FieldKind::Vec3, true)
                .with_field("tangent", FieldKind::Vec4, true)
        };

        let first = build();
        let second = build();
        assert_eq!(first, second);
        assert_eq!(
            first
                .fields()
                .iter()
                .map(|field| field.name.as_str())
                .collect::<Vec<_>>(),
            vec!["position", "normal", "tangent"],
        );
    }

    #[test]
    fn declarations_skip_inactive_fields() {
        let surface = SurfaceBuilder::new()
            .with_field("position", FieldKind::Vec4, true)
            .with_field("velocity", FieldKind::Vec3, false);

        let mut writer = GlslWriter::new();
        surface.declare(&mut writer, "in", "vtx_");

        assert!(writer.text().contains("in vec4 vtx_position;"));
        assert!(!writer.text().contains("velocity"));
    }

    #[test]
    fn per_vertex_declarations_are_output_arrays() {
        let surface = SurfaceBuilder::new()
            .with_field("position", FieldKind::Vec4, true)
            .with_field("normal", FieldKind::Vec3, true);

        let mut writer = GlslWriter::new();
        surface.declare_per_vertex(&mut writer, "vtx_");

        assert!(writer.text().contains("out vec4 vtx_position[];"));
        assert!(writer.text().contains("out vec3 vtx_normal[];"));
    }
}
