//! Deterministic GLSL source writer
//!
//! Line-oriented emitter used by every shader contributor. Output is a pure
//! function of the emitted calls: no timestamps, no map-order iteration, no
//! environment lookups, so two identical call sequences produce
//! byte-identical source. Shader-variant caching depends on this.

/// Shader stage tag attached to generated sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Traditional per-vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Mesh-shading geometry emission stage
    Mesh,
    /// Mesh-shading per-meshlet culling stage
    Task,
    /// Compute stage
    Compute,
}

impl ShaderStage {
    /// Human-readable stage name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Mesh => "mesh",
            Self::Task => "task",
            Self::Compute => "compute",
        }
    }
}

/// One stage's generated source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Stage this source targets.
    pub stage: ShaderStage,
    /// Generated GLSL text.
    pub text: String,
}

/// A complete generated shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    /// Stage sources in pipeline order.
    pub stages: Vec<ShaderSource>,
}

impl ProgramSource {
    /// Source text for one stage, if present.
    pub fn stage(&self, stage: ShaderStage) -> Option<&str> {
        self.stages
            .iter()
            .find(|source| source.stage == stage)
            .map(|source| source.text.as_str())
    }
}

/// Indentation-tracking GLSL text builder.
#[derive(Debug, Default)]
pub struct GlslWriter {
    out: String,
    indent: usize,
}

impl GlslWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one indented line.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Emits an empty line.
    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emits pre-formatted text verbatim, line by line at current indent.
    pub fn raw(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
    }

    /// Opens a brace block and indents.
    pub fn open(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    /// Dedents and closes the brace block.
    pub fn close(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    /// Finishes a stage, tagging the accumulated text.
    pub fn finish(self, stage: ShaderStage) -> ShaderSource {
        ShaderSource {
            stage,
            text: self.out,
        }
    }

    /// Accumulated text so far.
    pub fn text(&self) -> &str {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_indent_nested_lines() {
        let mut writer = GlslWriter::new();
        writer.line("void main()");
        writer.open();
        writer.line("gl_Position = vec4(0.0);");
        writer.close();

        assert_eq!(
            writer.text(),
            "void main()\n{\n\tgl_Position = vec4(0.0);\n}\n"
        );
    }

    #[test]
    fn identical_call_sequences_match_byte_for_byte() {
        let build = || {
            let mut writer = GlslWriter::new();
            writer.line("#version 450");
            writer.blank();
            writer.raw("layout(location = 0) in vec3 position;\n");
            writer.finish(ShaderStage::Vertex)
        };

        assert_eq!(build(), build());
    }
}
