//! Generated batch shaders, one program per texture-unit count.

use std::fmt::Write;
use std::sync::Arc;

use spritebatch_core::alloc::HashMap;

use crate::error::{BatchError, BatchResult};

const COUNT_PLACEHOLDER: &str = "%count%";
const FORLOOP_PLACEHOLDER: &str = "%forloop%";
const BINDINGS_PLACEHOLDER: &str = "%bindings%";

/// Bind group holding the sampled textures.
pub const TEXTURE_BIND_GROUP: u32 = 1;

/// Default vertex stage.
pub const DEFAULT_VERTEX_SRC: &str = include_str!("../shaders/batch_vertex.wgsl");

/// Default fragment template.
pub const DEFAULT_FRAGMENT_TEMPLATE: &str = include_str!("../shaders/batch_fragment.wgsl");

/// WGSL binding index of the texture for `unit`.
pub fn texture_binding(unit: u32) -> u32 {
    unit * 2
}

/// WGSL binding index of the sampler for `unit`.
pub fn sampler_binding(unit: u32) -> u32 {
    unit * 2 + 1
}

/// Generated source for a batch program supporting `max_textures` units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgram {
    pub max_textures: u32,
    /// Complete WGSL module (vertex + fragment stages).
    pub source: String,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
}

/// Builds batch programs from a vertex stage and a fragment template.
///
/// The fragment template must contain `%count%`, `%bindings%` and
/// `%forloop%`. They are replaced with the unit count, one texture/sampler
/// binding pair per unit, and an `if`/`else` ladder picking the unit named
/// by the interpolated texture id. Programs are cached per unit count.
#[derive(Debug)]
pub struct BatchShaderGenerator {
    vertex_src: String,
    fragment_template: String,
    cache: HashMap<u32, Arc<BatchProgram>>,
}

impl Default for BatchShaderGenerator {
    fn default() -> Self {
        Self {
            vertex_src: DEFAULT_VERTEX_SRC.to_string(),
            fragment_template: DEFAULT_FRAGMENT_TEMPLATE.to_string(),
            cache: HashMap::new(),
        }
    }
}

impl BatchShaderGenerator {
    pub fn new(
        vertex_src: impl Into<String>,
        fragment_template: impl Into<String>,
    ) -> BatchResult<Self> {
        let fragment_template = fragment_template.into();

        for placeholder in [COUNT_PLACEHOLDER, BINDINGS_PLACEHOLDER, FORLOOP_PLACEHOLDER] {
            if !fragment_template.contains(placeholder) {
                return Err(BatchError::InvalidTemplate { placeholder });
            }
        }

        Ok(Self {
            vertex_src: vertex_src.into(),
            fragment_template,
            cache: HashMap::new(),
        })
    }

    /// Program for `max_textures` units, generated on first request.
    pub fn generate_program(&mut self, max_textures: u32) -> BatchResult<Arc<BatchProgram>> {
        if max_textures == 0 {
            return Err(BatchError::InvalidTextureCount);
        }

        if let Some(program) = self.cache.get(&max_textures) {
            return Ok(program.clone());
        }

        let fragment = self
            .fragment_template
            .replace(COUNT_PLACEHOLDER, &max_textures.to_string())
            .replace(BINDINGS_PLACEHOLDER, &generate_bindings_src(max_textures))
            .replace(FORLOOP_PLACEHOLDER, &generate_sample_src(max_textures));

        let program = Arc::new(BatchProgram {
            max_textures,
            source: format!("{}\n{}", self.vertex_src, fragment),
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
        });

        tracing::debug!(max_textures, "generated batch program");
        self.cache.insert(max_textures, program.clone());
        Ok(program)
    }

    /// Number of cached programs.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Texture and sampler declarations for `max_textures` units.
pub fn generate_bindings_src(max_textures: u32) -> String {
    let mut src = String::new();
    for unit in 0..max_textures {
        let _ = writeln!(
            src,
            "@group({group}) @binding({tex}) var u_texture_{unit}: texture_2d<f32>;\n\
             @group({group}) @binding({smp}) var u_sampler_{unit}: sampler;",
            group = TEXTURE_BIND_GROUP,
            tex = texture_binding(unit),
            smp = sampler_binding(unit),
        );
    }
    src
}

/// The `if`/`else` ladder selecting a texture unit by `in.texture_id`.
pub fn generate_sample_src(max_textures: u32) -> String {
    let mut src = String::from("\n");
    for unit in 0..max_textures {
        if unit > 0 {
            src.push_str("\n    else ");
        } else {
            src.push_str("    ");
        }
        if unit + 1 < max_textures {
            let _ = write!(src, "if (in.texture_id < {unit}.5) ");
        }
        let _ = write!(
            src,
            "{{\n        color = textureSampleGrad(u_texture_{unit}, u_sampler_{unit}, in.uv, ddx, ddy);\n    }}"
        );
    }
    src.push('\n');
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_requires_placeholders() {
        let err = BatchShaderGenerator::new("", "%bindings% %forloop%").unwrap_err();
        assert_eq!(
            err,
            BatchError::InvalidTemplate {
                placeholder: "%count%"
            }
        );

        let err = BatchShaderGenerator::new("", "%count% %bindings%").unwrap_err();
        assert_eq!(
            err,
            BatchError::InvalidTemplate {
                placeholder: "%forloop%"
            }
        );
    }

    #[test]
    fn test_sample_ladder_has_one_branch_per_unit() {
        let src = generate_sample_src(4);
        assert_eq!(src.matches("textureSampleGrad").count(), 4);
        assert_eq!(src.matches("if (").count(), 3);
        assert!(src.contains("if (in.texture_id < 2.5)"));
        assert!(src.contains("u_texture_3"));
        assert!(!src.contains("3.5"));
    }

    #[test]
    fn test_single_unit_has_no_condition() {
        let src = generate_sample_src(1);
        assert!(!src.contains("if"));
        assert!(src.contains("u_texture_0"));
    }

    #[test]
    fn test_bindings_pair_textures_and_samplers() {
        let src = generate_bindings_src(2);
        assert!(src.contains("@group(1) @binding(0) var u_texture_0"));
        assert!(src.contains("@group(1) @binding(1) var u_sampler_0"));
        assert!(src.contains("@group(1) @binding(2) var u_texture_1"));
        assert!(src.contains("@group(1) @binding(3) var u_sampler_1"));
    }

    #[test]
    fn test_programs_are_cached_per_count() {
        let mut generator = BatchShaderGenerator::default();
        let a = generator.generate_program(8).unwrap();
        let b = generator.generate_program(8).unwrap();
        let c = generator.generate_program(4).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(generator.cached(), 2);
        assert!(a.source.contains("Samples one of 8 texture units"));
        assert!(!a.source.contains('%'));
    }

    #[test]
    fn test_zero_units_rejected() {
        let mut generator = BatchShaderGenerator::default();
        assert_eq!(
            generator.generate_program(0),
            Err(BatchError::InvalidTextureCount)
        );
    }
}
