//! Camera uniform buffer mirror
//!
//! [`CameraData`] is the CPU mirror of the per-frame camera uniform block.
//! Its field order and packing byte-match the std140 declaration produced
//! by [`CameraData::layout`]; the match is asserted once at construction.
//!
//! The block also carries derived shader-side accessors (projection to
//! screen UV, view/projection space conversions) generated next to the
//! declaration, so every stage shares one expression of that math instead
//! of reimplementing it per shader.

use crate::buffers::layout::{FieldKind, MemoryLayout, StructLayout};
use crate::foundation::math::{Mat4, Vec3};

/// Per-frame camera data - std140 uniform block mirror
///
/// Layout must match [`CameraData::layout`] exactly; see the module docs.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct CameraData {
    /// World-space frustum planes (left, right, top, bottom, near, far)
    pub frustum_planes: [[f32; 4]; 6],
    /// Projection matrix (camera to clip space)
    pub projection: [[f32; 4]; 4],
    /// Inverse projection matrix
    pub inv_projection: [[f32; 4]; 4],
    /// View matrix (world to camera space)
    pub view: [[f32; 4]; 4],
    /// Inverse view matrix
    pub inv_view: [[f32; 4]; 4],
    /// Pre-multiplied projection * view
    pub prj_view: [[f32; 4]; 4],
    /// Inverse of projection * view
    pub inv_prj_view: [[f32; 4]; 4],
    /// Previous frame's projection * view (velocity/reprojection)
    pub prv_prj_view: [[f32; 4]; 4],
    /// Previous frame's view matrix
    pub prv_view: [[f32; 4]; 4],
    /// Projection with the temporal jitter offset applied
    pub jittered_projection: [[f32; 4]; 4],
    /// Inverse of the jittered projection
    pub inv_jittered_projection: [[f32; 4]; 4],
    /// Render target size in pixels
    pub size: [u32; 2],
    /// Temporal jitter offset in clip space
    pub jitter: [f32; 2],
    /// Camera position in world space
    pub position: [f32; 3],
    /// Output gamma
    pub gamma: f32,
    /// Debug visualisation index
    pub debug_index: u32,
    /// Near clip plane distance
    pub near_plane: f32,
    /// Far clip plane distance
    pub far_plane: f32,
    /// Exposure multiplier
    pub exposure: f32,
}

// Safety: only f32/u32 fields with explicit C layout and 16-byte alignment,
// no padding bytes (asserted against the std140 layout in tests).
unsafe impl bytemuck::Pod for CameraData {}
unsafe impl bytemuck::Zeroable for CameraData {}

impl Default for CameraData {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Mat4::identity().into();
        Self {
            frustum_planes: [[0.0; 4]; 6],
            projection: identity,
            inv_projection: identity,
            view: identity,
            inv_view: identity,
            prj_view: identity,
            inv_prj_view: identity,
            prv_prj_view: identity,
            prv_view: identity,
            jittered_projection: identity,
            inv_jittered_projection: identity,
            size: [0, 0],
            jitter: [0.0, 0.0],
            position: [0.0; 3],
            gamma: 2.2,
            debug_index: 0,
            near_plane: 0.1,
            far_plane: 1000.0,
            exposure: 1.0,
        }
    }
}

impl CameraData {
    /// The std140 layout description shared with shader generation.
    pub fn layout() -> StructLayout {
        StructLayout::builder("CameraBlock", MemoryLayout::Std140)
            .array("frustumPlanes", FieldKind::Vec4, 6)
            .field("projection", FieldKind::Mat4)
            .field("invProjection", FieldKind::Mat4)
            .field("view", FieldKind::Mat4)
            .field("invView", FieldKind::Mat4)
            .field("prjView", FieldKind::Mat4)
            .field("invPrjView", FieldKind::Mat4)
            .field("prvPrjView", FieldKind::Mat4)
            .field("prvView", FieldKind::Mat4)
            .field("jitteredProjection", FieldKind::Mat4)
            .field("invJitteredProjection", FieldKind::Mat4)
            .field("size", FieldKind::UVec2)
            .field("jitterX", FieldKind::Float)
            .field("jitterY", FieldKind::Float)
            .field("position", FieldKind::Vec3)
            .field("gamma", FieldKind::Float)
            .field("debugIndex", FieldKind::UInt)
            .field("nearPlane", FieldKind::Float)
            .field("farPlane", FieldKind::Float)
            .field("exposure", FieldKind::Float)
            .build()
    }

    /// Shader-side helper functions derived from the stored fields.
    ///
    /// Pure functions of the block contents; generated alongside the
    /// declaration so every stage uses the same math.
    pub fn glsl_helpers(instance: &str) -> String {
        format!(
            "vec2 camProjectToScreen(vec3 viewPosition)\n\
             {{\n\
             \tvec4 projected = {i}.projection * vec4(viewPosition, 1.0);\n\
             \tprojected.xy /= projected.w;\n\
             \treturn projected.xy * 0.5 + 0.5;\n\
             }}\n\
             vec3 camProjToView(vec4 clipPosition)\n\
             {{\n\
             \tvec4 viewPosition = {i}.invProjection * clipPosition;\n\
             \treturn viewPosition.xyz / viewPosition.w;\n\
             }}\n\
             vec4 camViewToProj(vec3 viewPosition)\n\
             {{\n\
             \treturn {i}.projection * vec4(viewPosition, 1.0);\n\
             }}\n\
             vec3 camWorldToView(vec3 worldPosition)\n\
             {{\n\
             \treturn ({i}.view * vec4(worldPosition, 1.0)).xyz;\n\
             }}\n",
            i = instance,
        )
    }
}

/// Camera uniform buffer with incremental per-frame population.
///
/// The view and projection halves may be updated by independent calls
/// within one frame; [`CameraUbo::upload`] recombines the pair and writes a
/// fully consistent block, so no partial state is ever observable by GPU
/// reads as long as upload precedes submission.
#[derive(Debug, Default)]
pub struct CameraUbo {
    data: CameraData,
}

impl CameraUbo {
    /// Creates the buffer mirror and verifies layout integrity once.
    pub fn new() -> Self {
        CameraData::layout().checked_against::<CameraData>();
        Self {
            data: CameraData::default(),
        }
    }

    /// Updates the view half of the view/projection pair.
    pub fn update_view(&mut self, view: &Mat4, position: &Vec3) {
        self.data.prv_view = self.data.view;
        self.data.view = (*view).into();
        self.data.inv_view = view
            .try_inverse()
            .unwrap_or_else(Mat4::identity)
            .into();
        self.data.position = [position.x, position.y, position.z];
    }

    /// Updates the projection half of the view/projection pair.
    pub fn update_projection(
        &mut self,
        projection: &Mat4,
        size: [u32; 2],
        near_plane: f32,
        far_plane: f32,
    ) {
        self.data.projection = (*projection).into();
        self.data.inv_projection = projection
            .try_inverse()
            .unwrap_or_else(Mat4::identity)
            .into();
        self.data.size = size;
        self.data.near_plane = near_plane;
        self.data.far_plane = far_plane;
    }

    /// Sets the temporal jitter offset and the jittered projection pair.
    pub fn update_jitter(&mut self, jitter: [f32; 2], jittered_projection: &Mat4) {
        self.data.jitter = jitter;
        self.data.jittered_projection = (*jittered_projection).into();
        self.data.inv_jittered_projection = jittered_projection
            .try_inverse()
            .unwrap_or_else(Mat4::identity)
            .into();
    }

    /// Sets the world-space frustum planes.
    pub fn update_frustum(&mut self, planes: [[f32; 4]; 6]) {
        self.data.frustum_planes = planes;
    }

    /// Recombines the pair and writes the block into mapped memory.
    ///
    /// Must be called before the frame's GPU work referencing this buffer
    /// is submitted; after it returns the destination holds a complete,
    /// consistent block.
    ///
    /// # Panics
    ///
    /// `destination` must hold the whole block (the layout's size); a
    /// shorter mapping is a caller bug and panics.
    pub fn upload(&mut self, destination: &mut [u8]) {
        let projection = Mat4::from(self.data.projection);
        let view = Mat4::from(self.data.view);
        let prj_view = projection * view;

        self.data.prv_prj_view = self.data.prj_view;
        self.data.prj_view = prj_view.into();
        self.data.inv_prj_view = prj_view
            .try_inverse()
            .unwrap_or_else(Mat4::identity)
            .into();

        let bytes = bytemuck::bytes_of(&self.data);
        destination[..bytes.len()].copy_from_slice(bytes);
    }

    /// Current CPU-side contents.
    pub fn data(&self) -> &CameraData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_cpu_mirror() {
        // 6 vec4 planes + 10 mat4 + trailing scalar block, all std140.
        let layout = CameraData::layout();
        assert_eq!(layout.size() % 16, 0);
        assert_eq!(layout.size(), 784);
        layout.checked_against::<CameraData>();
    }

    #[test]
    fn layout_offsets_follow_std140() {
        let layout = CameraData::layout();
        assert_eq!(layout.offset_of("frustumPlanes"), Some(0));
        assert_eq!(layout.offset_of("projection"), Some(96));
        assert_eq!(layout.offset_of("size"), Some(736));
        assert_eq!(layout.offset_of("jitterX"), Some(744));
        assert_eq!(layout.offset_of("position"), Some(752));
        assert_eq!(layout.offset_of("gamma"), Some(764));
        assert_eq!(layout.offset_of("exposure"), Some(780));
    }

    #[test]
    fn upload_recombines_view_projection_pair() {
        let mut ubo = CameraUbo::new();
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));
        let projection = Mat4::new_perspective(16.0 / 9.0, 1.2, 0.1, 100.0);

        ubo.update_view(&view, &Vec3::new(0.0, 0.0, 5.0));
        ubo.update_projection(&projection, [1920, 1080], 0.1, 100.0);

        let mut bytes = vec![0u8; std::mem::size_of::<CameraData>()];
        ubo.upload(&mut bytes);

        let expected: [[f32; 4]; 4] = (projection * view).into();
        assert_eq!(ubo.data().prj_view, expected);

        let written: &CameraData = bytemuck::from_bytes(&bytes);
        assert_eq!(written.prj_view, expected);
        assert_eq!(written.size, [1920, 1080]);
    }

    #[test]
    fn upload_tracks_previous_frame_matrices() {
        let mut ubo = CameraUbo::new();
        let first = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let second = Mat4::new_translation(&Vec3::new(2.0, 0.0, 0.0));
        let mut bytes = vec![0u8; std::mem::size_of::<CameraData>()];

        ubo.update_view(&first, &Vec3::zeros());
        ubo.upload(&mut bytes);
        let first_prj_view = ubo.data().prj_view;

        ubo.update_view(&second, &Vec3::zeros());
        ubo.upload(&mut bytes);

        assert_eq!(ubo.data().prv_view, <[[f32; 4]; 4]>::from(first));
        assert_eq!(ubo.data().prv_prj_view, first_prj_view);
    }

    #[test]
    fn helpers_reference_the_block_instance() {
        let helpers = CameraData::glsl_helpers("camera");
        assert!(helpers.contains("camera.projection"));
        assert!(helpers.contains("camProjectToScreen"));
    }
}
