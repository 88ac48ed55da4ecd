//! GPU buffer memory-layout engine
//!
//! A [`StructLayout`] is the single source of truth for one CPU/GPU shared
//! structure: the ordered field list is declared once, then consumed by two
//! independent emitters — the GLSL block declaration used by generated
//! shaders, and the size/offset assertions that pin the CPU-side mirror.
//! Field lists are never hand-duplicated on both sides.
//!
//! The packing rules are the Vulkan std140/std430 rules and must be
//! reproduced exactly: any divergence between the CPU mirror and the
//! GPU-side declaration silently corrupts every read. Mismatches are
//! therefore build-time-detectable fatal errors (see
//! [`StructLayout::checked_against`]), never runtime conditions.

/// Memory-layout packing rules for one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLayout {
    /// Uniform-buffer rules: array strides and struct sizes round up to
    /// 16-byte (vec4) boundaries.
    Std140,
    /// Storage-buffer rules: natural member alignment, no outer rounding
    /// to 16 bytes.
    Std430,
}

impl MemoryLayout {
    /// GLSL layout qualifier keyword.
    pub const fn glsl_qualifier(self) -> &'static str {
        match self {
            Self::Std140 => "std140",
            Self::Std430 => "std430",
        }
    }
}

/// Semantic type of one declared field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 32-bit float scalar
    Float,
    /// 32-bit signed integer scalar
    Int,
    /// 32-bit unsigned integer scalar
    UInt,
    /// Two-component float vector
    Vec2,
    /// Three-component float vector
    Vec3,
    /// Four-component float vector
    Vec4,
    /// Two-component unsigned vector
    UVec2,
    /// Four-component unsigned vector
    UVec4,
    /// Four-component signed vector
    IVec4,
    /// Column-major 4x4 float matrix
    Mat4,
    /// Fixed-size array of a uniform element kind
    Array(Box<FieldKind>, usize),
}

const VEC4_ALIGN: u32 = 16;

impl FieldKind {
    /// Base alignment of the kind under the given layout rules.
    pub fn base_align(&self, layout: MemoryLayout) -> u32 {
        match self {
            Self::Float | Self::Int | Self::UInt => 4,
            Self::Vec2 | Self::UVec2 => 8,
            Self::Vec3 | Self::Vec4 | Self::UVec4 | Self::IVec4 | Self::Mat4 => VEC4_ALIGN,
            Self::Array(element, _) => {
                let element_align = element.base_align(layout);
                match layout {
                    MemoryLayout::Std140 => element_align.max(VEC4_ALIGN),
                    MemoryLayout::Std430 => element_align,
                }
            }
        }
    }

    /// Occupied size of the kind under the given layout rules.
    ///
    /// For arrays this is `stride * len`: under std140 scalar and vec2
    /// elements are expanded to one vec4 slot per element.
    pub fn size(&self, layout: MemoryLayout) -> u32 {
        match self {
            Self::Float | Self::Int | Self::UInt => 4,
            Self::Vec2 | Self::UVec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 | Self::UVec4 | Self::IVec4 => 16,
            Self::Mat4 => 64,
            Self::Array(_, len) => self.array_stride(layout) * (*len as u32),
        }
    }

    /// Element stride of an array of this element kind.
    fn array_stride(&self, layout: MemoryLayout) -> u32 {
        match self {
            Self::Array(element, _) => {
                let align = match layout {
                    MemoryLayout::Std140 => element.base_align(layout).max(VEC4_ALIGN),
                    MemoryLayout::Std430 => element.base_align(layout),
                };
                align_up(element.size(layout), align)
            }
            _ => self.size(layout),
        }
    }

    /// GLSL type name; arrays render through the declaration site.
    pub fn glsl_name(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::UVec2 => "uvec2",
            Self::UVec4 => "uvec4",
            Self::IVec4 => "ivec4",
            Self::Mat4 => "mat4",
            Self::Array(element, _) => element.glsl_name(),
        }
    }
}

/// Rounds `value` up to the next multiple of `alignment`.
pub const fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}

/// One resolved field of a [`StructLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutField {
    /// Field name, identical on the CPU and shader sides.
    pub name: String,
    /// Semantic type.
    pub kind: FieldKind,
    /// Byte offset from the start of the structure.
    pub offset: u32,
}

/// Ordered, typed field list with resolved offsets under one memory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    name: String,
    layout: MemoryLayout,
    fields: Vec<LayoutField>,
    size: u32,
}

impl StructLayout {
    /// Starts building a layout with the given struct name and packing rules.
    pub fn builder(name: impl Into<String>, layout: MemoryLayout) -> StructLayoutBuilder {
        StructLayoutBuilder {
            name: name.into(),
            layout,
            fields: Vec::new(),
        }
    }

    /// Struct name used in generated declarations.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packing rules this layout was resolved under.
    pub const fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// Resolved fields in declaration order.
    pub fn fields(&self) -> &[LayoutField] {
        &self.fields
    }

    /// Byte offset of the named field, if declared.
    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.offset)
    }

    /// Total aligned size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Verifies that the CPU mirror type byte-matches this layout.
    ///
    /// A size divergence is a build defect: it means the mirror and the
    /// shader declaration would disagree on every subsequent field, so this
    /// fails fast instead of letting reads desynchronize.
    #[track_caller]
    pub fn checked_against<T>(&self) -> &Self {
        assert_eq!(
            std::mem::size_of::<T>(),
            self.size as usize,
            "CPU mirror {} does not match the {} layout of {} ({} bytes expected)",
            std::any::type_name::<T>(),
            self.layout.glsl_qualifier(),
            self.name,
            self.size,
        );
        self
    }

    /// Emits the GLSL interface block for this layout.
    ///
    /// `block_keyword` is `uniform` or `buffer`; `instance` is the in-shader
    /// instance name.
    pub fn glsl_block(&self, set: u32, binding: u32, block_keyword: &str, instance: &str) -> String {
        let mut out = format!(
            "layout(set = {}, binding = {}, {}) {} {}\n{{\n",
            set,
            binding,
            self.layout.glsl_qualifier(),
            block_keyword,
            self.name,
        );
        for field in &self.fields {
            out.push_str(&self.glsl_member(field));
        }
        out.push_str(&format!("}} {};\n", instance));
        out
    }

    /// Emits a plain `struct` declaration for this layout.
    pub fn glsl_struct(&self) -> String {
        let mut out = format!("struct {}\n{{\n", self.name);
        for field in &self.fields {
            out.push_str(&self.glsl_member(field));
        }
        out.push_str("};\n");
        out
    }

    fn glsl_member(&self, field: &LayoutField) -> String {
        match &field.kind {
            FieldKind::Array(element, len) => {
                format!("\t{} {}[{}];\n", element.glsl_name(), field.name, len)
            }
            kind => format!("\t{} {};\n", kind.glsl_name(), field.name),
        }
    }
}

/// Accumulates fields and resolves their offsets on [`build`](Self::build).
pub struct StructLayoutBuilder {
    name: String,
    layout: MemoryLayout,
    fields: Vec<(String, FieldKind)>,
}

impl StructLayoutBuilder {
    /// Appends a field; declaration order is layout order.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    /// Appends a fixed-size array field.
    pub fn array(self, name: impl Into<String>, element: FieldKind, len: usize) -> Self {
        self.field(name, FieldKind::Array(Box::new(element), len))
    }

    /// Resolves offsets and the total aligned size.
    pub fn build(self) -> StructLayout {
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut cursor = 0u32;
        let mut max_align = 4u32;

        for (name, kind) in self.fields {
            let align = kind.base_align(self.layout);
            max_align = max_align.max(align);
            let offset = align_up(cursor, align);
            cursor = offset + kind.size(self.layout);
            fields.push(LayoutField { name, kind, offset });
        }

        let struct_align = match self.layout {
            MemoryLayout::Std140 => max_align.max(VEC4_ALIGN),
            MemoryLayout::Std430 => max_align,
        };

        StructLayout {
            name: self.name,
            layout: self.layout,
            fields,
            size: align_up(cursor, struct_align),
        }
    }
}
