//! Math type aliases over nalgebra

/// Two-component float vector
pub type Vec2 = nalgebra::Vector2<f32>;
/// Three-component float vector
pub type Vec3 = nalgebra::Vector3<f32>;
/// Four-component float vector
pub type Vec4 = nalgebra::Vector4<f32>;
/// 3x3 float matrix
pub type Mat3 = nalgebra::Matrix3<f32>;
/// Column-major 4x4 float matrix
pub type Mat4 = nalgebra::Matrix4<f32>;
