//! Shader program assembly
//!
//! Generates the complete GLSL program for one [`PipelineFlags`] value by
//! walking the registered components in registration order. Generation is a
//! pure function of the register contents and the flags: equal flags always
//! produce byte-identical source, which is what makes flag-keyed program
//! caching sound.
//!
//! The geometry front-end is either the classic vertex stage or, when the
//! program flags request it, a task/mesh pair; the fragment stage is shared
//! by both paths.

use thiserror::Error;

use crate::buffers::camera::CameraData;
use crate::buffers::layout::FieldKind;
use crate::buffers::model::ModelIndices;
use crate::buffers::objects::ObjectIds;
use crate::component::register::PassComponentRegister;
use crate::flags::{ComponentModeFlags, ShaderFlag, SubmeshFlag, TextureFlag, TextureFlagConfiguration};
use crate::pipeline::PipelineFlags;
use crate::shader::surface::SurfaceBuilder;
use crate::shader::writer::{GlslWriter, ProgramSource, ShaderStage};

/// Descriptor set/binding assignments shared by all generated programs.
mod bindings {
    pub const CAMERA_SET: u32 = 0;
    pub const CAMERA_BINDING: u32 = 0;
    pub const MODELS_SET: u32 = 0;
    pub const MODELS_BINDING: u32 = 1;
    pub const OBJECTS_SET: u32 = 0;
    pub const OBJECTS_BINDING: u32 = 2;
    pub const MATERIALS_SET: u32 = 1;
    pub const MATERIALS_BINDING: u32 = 0;
    pub const MAPS_SET: u32 = 2;
    pub const MAPS_BINDING: u32 = 0;

    // Mesh-shading path: meshlet descriptions, their culling bounds and the
    // per-stream vertex pulls replacing the fixed-function vertex input.
    pub const MESHLETS_SET: u32 = 0;
    pub const MESHLETS_BINDING: u32 = 3;
    pub const MESHLET_BOUNDS_SET: u32 = 0;
    pub const MESHLET_BOUNDS_BINDING: u32 = 4;
    pub const MESH_POSITIONS_BINDING: u32 = 5;
    pub const MESH_NORMALS_BINDING: u32 = 6;
    pub const MESH_TANGENTS_BINDING: u32 = 7;
    pub const MESH_COLOURS_BINDING: u32 = 8;
    pub const MESH_TEXCOORDS0_BINDING: u32 = 9;
    pub const MESH_TEXCOORDS1_BINDING: u32 = 10;
    pub const MESH_TEXCOORDS2_BINDING: u32 = 11;
}

/// Shader generation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// The combine references a component bit with no registered plugin.
    #[error("no registered contributor for active components; selector: {flags}")]
    MissingContributor {
        /// Diagnostic rendering of the offending selector.
        flags: String,
    },
}

/// Generates the program for one variant selector.
pub fn assemble(
    register: &PassComponentRegister,
    flags: &PipelineFlags,
) -> Result<ProgramSource, AssemblyError> {
    for bit in flags.pass.flags.iter_bits() {
        if bit as usize >= register.len() {
            return Err(AssemblyError::MissingContributor {
                flags: flags.describe(),
            });
        }
    }

    let surface = build_surface(register, flags);
    let mut stages = Vec::new();

    if flags.uses_mesh_shading() {
        if flags.uses_task_stage() {
            stages.push(task_stage(flags));
        }
        stages.push(mesh_stage(flags, &surface));
    } else {
        stages.push(vertex_stage(flags, &surface));
    }
    stages.push(fragment_stage(register, flags, &surface));

    Ok(ProgramSource { stages })
}

fn build_surface(register: &PassComponentRegister, flags: &PipelineFlags) -> SurfaceBuilder {
    let mut surface = SurfaceBuilder::new()
        .with_field("worldPosition", FieldKind::Vec4, true)
        .with_field(
            "viewPosition",
            FieldKind::Vec3,
            flags.shader.contains(ShaderFlag::VIEW_SPACE),
        )
        .with_field("velocity", FieldKind::Vec3, flags.writes_velocity())
        .with_field(
            "vertexColour",
            FieldKind::Vec3,
            flags.shader.contains(ShaderFlag::COLOUR)
                && flags.submesh.contains(SubmeshFlag::COLOURS),
        );
    for contributor in register.surface_contributors() {
        surface = contributor.fill_surface(flags, surface);
    }
    surface
}

fn stage_header(writer: &mut GlslWriter, extensions: &[&str]) {
    writer.line("#version 450");
    for extension in extensions {
        writer.line(&format!("#extension {} : require", extension));
    }
    writer.blank();
}

fn geometry_blocks(writer: &mut GlslWriter) {
    writer.raw(&CameraData::layout().glsl_block(
        bindings::CAMERA_SET,
        bindings::CAMERA_BINDING,
        "uniform",
        "camera",
    ));
    writer.raw(&CameraData::glsl_helpers("camera"));
    writer.raw(&ModelIndices::glsl_block(
        bindings::MODELS_SET,
        bindings::MODELS_BINDING,
    ));
    writer.raw(&ObjectIds::glsl_block(
        bindings::OBJECTS_SET,
        bindings::OBJECTS_BINDING,
    ));
    writer.blank();
}

fn vertex_inputs(writer: &mut GlslWriter, flags: &PipelineFlags) {
    let streams = [
        (SubmeshFlag::POSITIONS, FieldKind::Vec4, "inPosition"),
        (SubmeshFlag::NORMALS, FieldKind::Vec3, "inNormal"),
        (SubmeshFlag::TANGENTS, FieldKind::Vec4, "inTangent"),
        (SubmeshFlag::BITANGENTS, FieldKind::Vec3, "inBitangent"),
        (SubmeshFlag::COLOURS, FieldKind::Vec3, "inColour"),
        (SubmeshFlag::TEXCOORDS0, FieldKind::Vec3, "inTexcoord0"),
        (SubmeshFlag::TEXCOORDS1, FieldKind::Vec3, "inTexcoord1"),
        (SubmeshFlag::TEXCOORDS2, FieldKind::Vec3, "inTexcoord2"),
        (SubmeshFlag::VELOCITY, FieldKind::Vec3, "inVelocity"),
    ];
    let mut location = 0;
    for (stream, kind, name) in streams {
        if flags.submesh.contains(stream) {
            writer.line(&format!(
                "layout(location = {}) in {} {};",
                location,
                kind.glsl_name(),
                name,
            ));
            location += 1;
        }
    }
    writer.blank();
}

fn vertex_stage(flags: &PipelineFlags, surface: &SurfaceBuilder) -> crate::shader::writer::ShaderSource {
    let mut writer = GlslWriter::new();
    stage_header(&mut writer, &[]);
    vertex_inputs(&mut writer, flags);
    geometry_blocks(&mut writer);
    surface.declare(&mut writer, "out", "vtx_");
    writer.blank();

    writer.line("void main()");
    writer.open();
    if flags.uses_instantiation() {
        writer.line("ObjectIds ids = objects[gl_InstanceIndex];");
    } else {
        writer.line("ObjectIds ids = objects[0];");
    }
    writer.line("ModelIndices model = models[ids.nodeId];");
    if flags.program.contains(crate::flags::ProgramFlag::BILLBOARDS) {
        writer.line("vec3 right = vec3(camera.view[0][0], camera.view[1][0], camera.view[2][0]);");
        writer.line("vec3 up = vec3(camera.view[0][1], camera.view[1][1], camera.view[2][1]);");
        writer.line("vec4 worldPosition = model.curModel * vec4(0.0, 0.0, 0.0, 1.0)");
        writer.line("\t+ vec4(right * inPosition.x + up * inPosition.y, 0.0);");
    } else {
        writer.line("vec4 worldPosition = model.curModel * inPosition;");
    }
    writer.line("vtx_worldPosition = worldPosition;");
    if surface.location_of("viewPosition").is_some() {
        writer.line("vtx_viewPosition = (camera.view * worldPosition).xyz;");
    }
    if surface.location_of("normal").is_some() {
        writer.line("vtx_normal = normalize(mat3(model.normal) * inNormal);");
    }
    if surface.location_of("tangent").is_some() {
        writer.line("vtx_tangent = vec4(normalize(mat3(model.normal) * inTangent.xyz), inTangent.w);");
    }
    if surface.location_of("vertexColour").is_some() {
        writer.line("vtx_vertexColour = inColour;");
    }
    for set in ["texcoord0", "texcoord1", "texcoord2"] {
        if surface.location_of(set).is_some() {
            let input = format!("inTexcoord{}", &set[8..]);
            writer.line(&format!("vtx_{} = {};", set, input));
        }
    }
    if surface.location_of("velocity").is_some() {
        writer.line("vec4 prvPosition = model.prvModel * inPosition;");
        writer.line("vtx_velocity = worldPosition.xyz - prvPosition.xyz;");
    }
    writer.line("gl_Position = camera.jitteredProjection * camera.view * worldPosition;");
    writer.close();
    writer.finish(ShaderStage::Vertex)
}

fn task_stage(_flags: &PipelineFlags) -> crate::shader::writer::ShaderSource {
    let mut writer = GlslWriter::new();
    stage_header(&mut writer, &["GL_EXT_mesh_shader"]);
    writer.line("layout(local_size_x = 32) in;");
    writer.blank();
    geometry_blocks(&mut writer);
    writer.raw(&format!(
        "layout(set = {}, binding = {}, std430) restrict readonly buffer MeshletBoundsBlock\n\
         {{\n\
         \tvec4 meshletBounds[];\n\
         }};\n",
        bindings::MESHLET_BOUNDS_SET,
        bindings::MESHLET_BOUNDS_BINDING,
    ));
    writer.raw("struct TaskPayload\n{\n\tuint meshletIndices[32];\n};\n");
    writer.line("taskPayloadSharedEXT TaskPayload payload;");
    writer.line("shared uint visibleCount;");
    writer.blank();
    writer.line("void main()");
    writer.open();
    writer.line("if (gl_LocalInvocationID.x == 0u)");
    writer.open();
    writer.line("visibleCount = 0u;");
    writer.close();
    writer.line("barrier();");
    writer.line("ObjectIds ids = objects[0];");
    writer.line("ModelIndices model = models[ids.nodeId];");
    writer.line("uint meshletIndex = gl_GlobalInvocationID.x;");
    // Bounding-sphere frustum test in world space; invocations past the
    // model's meshlet count cull unconditionally.
    writer.line("bool visible = meshletIndex < model.meshlets.x;");
    writer.line("if (visible)");
    writer.open();
    writer.line("vec4 sphere = meshletBounds[meshletIndex];");
    writer.line("vec3 centre = (model.curModel * vec4(sphere.xyz, 1.0)).xyz;");
    writer.line("float radius = sphere.w;");
    writer.line("for (int plane = 0; plane < 6 && visible; ++plane)");
    writer.open();
    writer.line("visible = dot(camera.frustumPlanes[plane].xyz, centre) + camera.frustumPlanes[plane].w >= -radius;");
    writer.close();
    writer.close();
    writer.line("if (visible)");
    writer.open();
    writer.line("payload.meshletIndices[atomicAdd(visibleCount, 1u)] = meshletIndex;");
    writer.close();
    // The emitted count must be uniform across the workgroup, so it is read
    // only after the barrier has settled all the atomics.
    writer.line("barrier();");
    writer.line("EmitMeshTasksEXT(visibleCount, 1u, 1u);");
    writer.close();
    writer.finish(ShaderStage::Task)
}

fn mesh_vertex_streams(writer: &mut GlslWriter, surface: &SurfaceBuilder) {
    let streams = [
        ("PositionsBlock", "positions", bindings::MESH_POSITIONS_BINDING, true),
        (
            "NormalsBlock",
            "normals",
            bindings::MESH_NORMALS_BINDING,
            surface.location_of("normal").is_some(),
        ),
        (
            "TangentsBlock",
            "tangents",
            bindings::MESH_TANGENTS_BINDING,
            surface.location_of("tangent").is_some(),
        ),
        (
            "ColoursBlock",
            "colours",
            bindings::MESH_COLOURS_BINDING,
            surface.location_of("vertexColour").is_some(),
        ),
        (
            "Texcoords0Block",
            "texcoords0",
            bindings::MESH_TEXCOORDS0_BINDING,
            surface.location_of("texcoord0").is_some(),
        ),
        (
            "Texcoords1Block",
            "texcoords1",
            bindings::MESH_TEXCOORDS1_BINDING,
            surface.location_of("texcoord1").is_some(),
        ),
        (
            "Texcoords2Block",
            "texcoords2",
            bindings::MESH_TEXCOORDS2_BINDING,
            surface.location_of("texcoord2").is_some(),
        ),
    ];
    // Every stream is vec4 so the std430 array stride is unambiguous.
    for (block, name, binding, active) in streams {
        if !active {
            continue;
        }
        writer.raw(&format!(
            "layout(set = {}, binding = {}, std430) restrict readonly buffer {}\n\
             {{\n\
             \tvec4 {}[];\n\
             }};\n",
            bindings::MESHLETS_SET,
            binding,
            block,
            name,
        ));
    }
    writer.blank();
}

fn mesh_stage(flags: &PipelineFlags, surface: &SurfaceBuilder) -> crate::shader::writer::ShaderSource {
    let mut writer = GlslWriter::new();
    stage_header(&mut writer, &["GL_EXT_mesh_shader"]);
    writer.line("layout(local_size_x = 32) in;");
    writer.line("layout(triangles, max_vertices = 64, max_primitives = 124) out;");
    writer.blank();
    geometry_blocks(&mut writer);
    writer.raw(&format!(
        "struct Meshlet\n\
         {{\n\
         \tuint vertices[64];\n\
         \tuint indices[372];\n\
         \tuint vertexCount;\n\
         \tuint primitiveCount;\n\
         }};\n\
         layout(set = {}, binding = {}, std430) restrict readonly buffer MeshletsBlock\n\
         {{\n\
         \tMeshlet meshlets[];\n\
         }};\n",
        bindings::MESHLETS_SET,
        bindings::MESHLETS_BINDING,
    ));
    mesh_vertex_streams(&mut writer, surface);
    if flags.uses_task_stage() {
        writer.raw("struct TaskPayload\n{\n\tuint meshletIndices[32];\n};\n");
        writer.line("taskPayloadSharedEXT TaskPayload payload;");
        writer.blank();
    }
    surface.declare_per_vertex(&mut writer, "vtx_");
    writer.blank();
    writer.line("void main()");
    writer.open();
    if flags.uses_task_stage() {
        writer.line("uint meshletIndex = payload.meshletIndices[gl_WorkGroupID.x];");
    } else {
        writer.line("uint meshletIndex = gl_WorkGroupID.x;");
    }
    writer.line("ObjectIds ids = objects[0];");
    writer.line("ModelIndices model = models[ids.nodeId];");
    writer.line("Meshlet meshlet = meshlets[meshletIndex];");
    writer.line("SetMeshOutputsEXT(meshlet.vertexCount, meshlet.primitiveCount);");
    writer.line("for (uint v = gl_LocalInvocationID.x; v < meshlet.vertexCount; v += 32u)");
    writer.open();
    writer.line("uint vertexIndex = model.meshlets.y + meshlet.vertices[v];");
    writer.line("vec4 worldPosition = model.curModel * positions[vertexIndex];");
    writer.line("vtx_worldPosition[v] = worldPosition;");
    if surface.location_of("viewPosition").is_some() {
        writer.line("vtx_viewPosition[v] = (camera.view * worldPosition).xyz;");
    }
    if surface.location_of("normal").is_some() {
        writer.line("vtx_normal[v] = normalize(mat3(model.normal) * normals[vertexIndex].xyz);");
    }
    if surface.location_of("tangent").is_some() {
        writer.line(
            "vtx_tangent[v] = vec4(normalize(mat3(model.normal) * tangents[vertexIndex].xyz), tangents[vertexIndex].w);",
        );
    }
    if surface.location_of("vertexColour").is_some() {
        writer.line("vtx_vertexColour[v] = colours[vertexIndex].rgb;");
    }
    for set in ["texcoord0", "texcoord1", "texcoord2"] {
        if surface.location_of(set).is_some() {
            writer.line(&format!(
                "vtx_{}[v] = texcoords{}[vertexIndex].xyz;",
                set,
                &set[8..],
            ));
        }
    }
    if surface.location_of("velocity").is_some() {
        writer.line("vec4 prvPosition = model.prvModel * positions[vertexIndex];");
        writer.line("vtx_velocity[v] = worldPosition.xyz - prvPosition.xyz;");
    }
    writer.line("gl_MeshVerticesEXT[v].gl_Position = camera.jitteredProjection * camera.view * worldPosition;");
    writer.close();
    writer.line("for (uint p = gl_LocalInvocationID.x; p < meshlet.primitiveCount; p += 32u)");
    writer.open();
    writer.line(
        "gl_PrimitiveTriangleIndicesEXT[p] = uvec3(meshlet.indices[3u * p], meshlet.indices[3u * p + 1u], meshlet.indices[3u * p + 2u]);",
    );
    writer.close();
    writer.close();
    writer.finish(ShaderStage::Mesh)
}

fn fragment_stage(
    register: &PassComponentRegister,
    flags: &PipelineFlags,
    surface: &SurfaceBuilder,
) -> crate::shader::writer::ShaderSource {
    let shaders = register.components_shaders(flags, fragment_filter(flags));

    // Maps can only be sampled when the submesh actually feeds a texcoord
    // stream through the surface; without one the sampling code would
    // reference an undeclared input.
    let samples_maps =
        flags.textures.config_count > 0 && surface.location_of("texcoord0").is_some();

    let mut writer = GlslWriter::new();
    stage_header(&mut writer, &[]);
    surface.declare(&mut writer, "in", "vtx_");
    writer.blank();
    writer.line("layout(location = 0) out vec4 outColour;");
    writer.blank();
    writer.raw(&register.material_layout().glsl_block(
        bindings::MATERIALS_SET,
        bindings::MATERIALS_BINDING,
    ));
    if samples_maps {
        writer.line(&format!(
            "layout(set = {}, binding = {}) uniform sampler2D maps[{}];",
            bindings::MAPS_SET,
            bindings::MAPS_BINDING,
            flags.textures.config_count,
        ));
    }
    writer.blank();

    // Blended components struct, one member per contributing component. An
    // empty struct is not valid GLSL, so a componentless variant skips the
    // blend machinery entirely.
    let mut members = Vec::new();
    for shader in &shaders {
        shader.fill_components(flags, &mut members);
    }
    if !members.is_empty() {
        let mut declaration = String::from("struct BlendComponents\n{\n");
        for (name, kind) in &members {
            declaration.push_str(&format!("\t{} {};\n", kind.glsl_name(), name));
        }
        declaration.push_str("};\n");
        writer.raw(&declaration);
        writer.blank();
    }

    writer.line("void main()");
    writer.open();
    writer.line("Material material = materials[0];");
    if !members.is_empty() {
        writer.line("BlendComponents components;");
        for shader in &shaders {
            shader.write_blend(flags, &mut writer);
        }
    }

    if samples_maps {
        for (index, config) in canonical_texture_configs(flags).into_iter().enumerate() {
            writer.open();
            writer.line(&format!(
                "vec4 sampled = texture(maps[{}], vtx_texcoord0.xy);",
                index,
            ));
            for shader in &shaders {
                shader.apply_texture(&config, &mut writer);
            }
            writer.close();
        }
    }

    if flags.uses_alpha_test() {
        writer.line(&format!(
            "if (!(components.opacity {} components.alphaRef)) discard;",
            compare_operator(flags.alpha_func),
        ));
    }

    if members.iter().any(|(name, _)| name == "colour") {
        if flags.uses_alpha_blending() {
            writer.line("outColour = vec4(components.colour, components.opacity);");
        } else {
            writer.line("outColour = vec4(components.colour, 1.0);");
        }
    } else {
        writer.line("outColour = vec4(1.0);");
    }
    writer.close();
    writer.finish(ShaderStage::Fragment)
}

fn fragment_filter(flags: &PipelineFlags) -> ComponentModeFlags {
    let mut filter = ComponentModeFlags::COLOUR
        | ComponentModeFlags::OPACITY
        | ComponentModeFlags::SPECIFICS;
    if flags.uses_lighting() {
        filter |= ComponentModeFlags::DIFFUSE_LIGHTING
            | ComponentModeFlags::SPECULAR_LIGHTING
            | ComponentModeFlags::OCCLUSION
            | ComponentModeFlags::NORMALS;
    }
    if flags.uses_alpha_blending() {
        filter |= ComponentModeFlags::ALPHA_BLENDING;
    }
    filter
}

/// Canonical channel assignment per texture role.
///
/// Actual channel remaps live in the texture-configuration buffer; generated
/// code uses the conventional packing so the source stays a pure function of
/// the flags.
fn canonical_texture_configs(flags: &PipelineFlags) -> Vec<TextureFlagConfiguration> {
    let roles = [
        (TextureFlag::COLOUR, 0, 3),
        (TextureFlag::OPACITY, 3, 1),
        (TextureFlag::NORMAL, 0, 3),
        (TextureFlag::HEIGHT, 0, 1),
        (TextureFlag::OCCLUSION, 0, 1),
        (TextureFlag::ROUGHNESS, 1, 1),
        (TextureFlag::METALNESS, 2, 1),
        (TextureFlag::SPECULAR, 0, 3),
        (TextureFlag::EMISSIVE, 0, 3),
        (TextureFlag::TRANSMISSION, 0, 1),
    ];
    roles
        .into_iter()
        .filter(|(flag, _, _)| flags.textures.flags.contains(*flag))
        .map(|(flag, start_index, component_count)| TextureFlagConfiguration {
            flag,
            start_index,
            component_count,
        })
        .collect()
}

fn compare_operator(op: ash::vk::CompareOp) -> &'static str {
    match op {
        ash::vk::CompareOp::LESS => "<",
        ash::vk::CompareOp::LESS_OR_EQUAL => "<=",
        ash::vk::CompareOp::GREATER => ">",
        ash::vk::CompareOp::GREATER_OR_EQUAL => ">=",
        ash::vk::CompareOp::EQUAL => "==",
        ash::vk::CompareOp::NOT_EQUAL => "!=",
        _ => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::builtin;
    use crate::flags::{PassComponentCombine, ProgramFlag, TextureCombine};
    use crate::plugins::load_plugins;

    fn loaded_register() -> PassComponentRegister {
        let mut register = PassComponentRegister::new();
        load_plugins(&mut register, &builtin::factories()).unwrap();
        register
    }

    fn lit_flags(register: &mut PassComponentRegister) -> PipelineFlags {
        let combine = register
            .resolve_combine_by_name(&[
                "colour",
                "opacity",
                "lighting-model",
                "roughness",
                "metalness",
            ])
            .unwrap();
        PipelineFlags {
            pass: combine,
            submesh: SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS | SubmeshFlag::TEXCOORDS0,
            shader: ShaderFlag::NORMAL | ShaderFlag::LIGHTING,
            ..Default::default()
        }
    }

    #[test]
    fn equal_flags_produce_identical_source() {
        let mut register = loaded_register();
        let flags = lit_flags(&mut register);

        let first = assemble(&register, &flags).unwrap();
        let second = assemble(&register, &flags).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn classic_path_emits_vertex_and_fragment() {
        let mut register = loaded_register();
        let flags = lit_flags(&mut register);

        let program = assemble(&register, &flags).unwrap();
        let vertex = program.stage(ShaderStage::Vertex).unwrap();
        let fragment = program.stage(ShaderStage::Fragment).unwrap();

        assert!(program.stage(ShaderStage::Mesh).is_none());
        assert!(vertex.contains("in vec4 inPosition;"));
        assert!(vertex.contains("gl_Position = camera.jitteredProjection"));
        assert!(fragment.contains("struct BlendComponents"));
        assert!(fragment.contains("components.roughness = material.roughness;"));
    }

    #[test]
    fn mesh_path_replaces_the_vertex_stage() {
        let mut register = loaded_register();
        let mut flags = lit_flags(&mut register);
        flags.program = ProgramFlag::HAS_MESH | ProgramFlag::HAS_TASK;

        let program = assemble(&register, &flags).unwrap();

        assert!(program.stage(ShaderStage::Vertex).is_none());
        assert!(program.stage(ShaderStage::Task).is_some());
        let mesh = program.stage(ShaderStage::Mesh).unwrap();
        assert!(mesh.contains("GL_EXT_mesh_shader"));
        assert!(mesh.contains("SetMeshOutputsEXT"));
    }

    #[test]
    fn task_culling_tests_meshlet_bounds_against_the_frustum() {
        let mut register = loaded_register();
        let mut flags = lit_flags(&mut register);
        flags.program = ProgramFlag::HAS_MESH | ProgramFlag::HAS_TASK;

        let program = assemble(&register, &flags).unwrap();
        let task = program.stage(ShaderStage::Task).unwrap();

        assert!(task.contains("vec4 sphere = meshletBounds[meshletIndex];"));
        assert!(task.contains("dot(camera.frustumPlanes[plane].xyz, centre)"));
        assert!(task.contains("meshletIndex < model.meshlets.x"));

        // The emitted count is read only after the barrier, so it is
        // workgroup-uniform when EmitMeshTasksEXT runs.
        let barrier = task.rfind("barrier();").unwrap();
        let emit = task.find("EmitMeshTasksEXT(visibleCount").unwrap();
        assert!(barrier < emit);
    }

    #[test]
    fn mesh_stage_writes_every_output_it_declares() {
        let mut register = loaded_register();
        let mut flags = lit_flags(&mut register);
        flags.program = ProgramFlag::HAS_MESH | ProgramFlag::HAS_TASK;

        let program = assemble(&register, &flags).unwrap();
        let mesh = program.stage(ShaderStage::Mesh).unwrap();

        assert!(mesh.contains("vtx_worldPosition[v] = worldPosition;"));
        assert!(mesh.contains("gl_MeshVerticesEXT[v].gl_Position"));
        assert!(mesh.contains("gl_PrimitiveTriangleIndicesEXT[p]"));

        // Every declared per-vertex output carries an assignment; the
        // fragment stage must never read an unwritten input.
        for line in mesh.lines() {
            let trimmed = line.trim();
            if trimmed.contains(") out ") && trimmed.ends_with("[];") {
                let name = trimmed
                    .rsplit(' ')
                    .next()
                    .unwrap()
                    .trim_end_matches("[];");
                assert!(
                    mesh.contains(&format!("{}[v] =", name)),
                    "declared output {} is never written",
                    name,
                );
            }
        }
    }

    #[test]
    fn unregistered_component_bit_is_a_missing_contributor() {
        let mut register = loaded_register();
        let flags = PipelineFlags {
            pass: PassComponentCombine {
                base_id: 999,
                flags: crate::flags::PassComponentFlags::from_bit(63),
                ..Default::default()
            },
            ..Default::default()
        };

        let error = assemble(&register, &flags).unwrap_err();
        assert!(matches!(error, AssemblyError::MissingContributor { .. }));
        assert!(error.to_string().contains("combine 999"));

        // A selector without the dangling bit still builds.
        let valid = lit_flags(&mut register);
        assert!(assemble(&register, &valid).is_ok());
    }

    #[test]
    fn texture_sampling_follows_the_combine() {
        let mut register = loaded_register();
        let mut flags = lit_flags(&mut register);
        flags.textures = TextureCombine {
            config_count: 1,
            flags: TextureFlag::COLOUR,
        };

        let program = assemble(&register, &flags).unwrap();
        let fragment = program.stage(ShaderStage::Fragment).unwrap();

        assert!(fragment.contains("uniform sampler2D maps[1];"));
        assert!(fragment.contains("components.colour *= sampled.rgb;"));
    }

    #[test]
    fn textures_without_a_texcoord_stream_skip_sampling() {
        let mut register = loaded_register();
        let mut flags = lit_flags(&mut register);
        flags.submesh = SubmeshFlag::POSITIONS | SubmeshFlag::NORMALS;
        flags.textures = TextureCombine {
            config_count: 1,
            flags: TextureFlag::COLOUR,
        };

        let program = assemble(&register, &flags).unwrap();
        let fragment = program.stage(ShaderStage::Fragment).unwrap();

        // No texcoord input exists, so no map code may reference one.
        assert!(!fragment.contains("vtx_texcoord0"));
        assert!(!fragment.contains("sampler2D"));
        assert!(fragment.contains("components.colour = material.colour;"));
    }

    #[test]
    fn alpha_test_emits_a_discard() {
        let mut register = loaded_register();
        let combine = register
            .resolve_combine_by_name(&["colour", "opacity", "alpha-test"])
            .unwrap();
        let flags = PipelineFlags {
            pass: combine,
            submesh: SubmeshFlag::POSITIONS,
            alpha_func: ash::vk::CompareOp::GREATER,
            ..Default::default()
        };
        assert!(flags.uses_alpha_test());

        let program = assemble(&register, &flags).unwrap();
        let fragment = program.stage(ShaderStage::Fragment).unwrap();
        assert!(fragment.contains("discard;"));
        assert!(fragment.contains("components.opacity > components.alphaRef"));
    }
}
