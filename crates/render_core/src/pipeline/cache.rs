//! Shader program cache
//!
//! One generated program per distinct [`PipelineFlags`] value. Generation
//! failures are terminal for their selector: the failure is logged once and
//! the selector stays in the failed state instead of retrying (and
//! re-logging) every frame.

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::register::PassComponentRegister;
use crate::pipeline::PipelineFlags;
use crate::shader::assembler::assemble;
use crate::shader::writer::ProgramSource;

enum VariantState {
    Ready(Arc<ProgramSource>),
    Failed,
}

/// Flag-keyed cache of generated shader programs.
#[derive(Default)]
pub struct ShaderProgramCache {
    variants: HashMap<PipelineFlags, VariantState>,
    hits: u64,
    misses: u64,
}

impl ShaderProgramCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The program for `flags`, generating it on first request.
    ///
    /// `None` when generation failed for this selector, now or previously.
    pub fn get_or_build(
        &mut self,
        register: &PassComponentRegister,
        flags: &PipelineFlags,
    ) -> Option<Arc<ProgramSource>> {
        if let Some(state) = self.variants.get(flags) {
            self.hits += 1;
            return match state {
                VariantState::Ready(program) => Some(Arc::clone(program)),
                VariantState::Failed => None,
            };
        }

        self.misses += 1;
        match assemble(register, flags) {
            Ok(program) => {
                let program = Arc::new(program);
                self.variants
                    .insert(flags.clone(), VariantState::Ready(Arc::clone(&program)));
                Some(program)
            }
            Err(error) => {
                log::error!("Shader generation failed: {}", error);
                self.variants.insert(flags.clone(), VariantState::Failed);
                None
            }
        }
    }

    /// Cached program for `flags` without generating.
    pub fn get(&self, flags: &PipelineFlags) -> Option<Arc<ProgramSource>> {
        match self.variants.get(flags) {
            Some(VariantState::Ready(program)) => Some(Arc::clone(program)),
            _ => None,
        }
    }

    /// Number of cached selectors, failed ones included.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// True when nothing has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Number of selectors in the failed state.
    pub fn failed_count(&self) -> usize {
        self.variants
            .values()
            .filter(|state| matches!(state, VariantState::Failed))
            .count()
    }

    /// Lookup counters since construction: (hits, misses).
    pub fn hit_miss(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Drops all cached programs (e.g. on component set reload).
    pub fn clear(&mut self) {
        self.variants.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::builtin;
    use crate::flags::{PassComponentCombine, PassComponentFlags, SubmeshFlag};
    use crate::plugins::load_plugins;

    fn loaded_register() -> PassComponentRegister {
        let mut register = PassComponentRegister::new();
        load_plugins(&mut register, &builtin::factories()).unwrap();
        register
    }

    #[test]
    fn repeated_requests_share_one_program() {
        let mut register = loaded_register();
        let combine = register.resolve_combine_by_name(&["colour"]).unwrap();
        let flags = PipelineFlags {
            pass: combine,
            submesh: SubmeshFlag::POSITIONS,
            ..Default::default()
        };

        let mut cache = ShaderProgramCache::new();
        let first = cache.get_or_build(&register, &flags).unwrap();
        let second = cache.get_or_build(&register, &flags).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hit_miss(), (1, 1));
    }

    #[test]
    fn failed_generation_is_terminal() {
        let register = loaded_register();
        let flags = PipelineFlags {
            pass: PassComponentCombine {
                base_id: 99,
                flags: PassComponentFlags::from_bit(63),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut cache = ShaderProgramCache::new();
        assert!(cache.get_or_build(&register, &flags).is_none());
        assert!(cache.get_or_build(&register, &flags).is_none());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.failed_count(), 1);
    }

    #[test]
    fn distinct_selectors_cache_separately() {
        let mut register = loaded_register();
        let colour = register.resolve_combine_by_name(&["colour"]).unwrap();
        let lit = register
            .resolve_combine_by_name(&["colour", "lighting-model"])
            .unwrap();

        let base = PipelineFlags {
            submesh: SubmeshFlag::POSITIONS,
            ..Default::default()
        };
        let first = PipelineFlags { pass: colour, ..base.clone() };
        let second = PipelineFlags { pass: lit, ..base };

        let mut cache = ShaderProgramCache::new();
        cache.get_or_build(&register, &first).unwrap();
        cache.get_or_build(&register, &second).unwrap();

        assert_eq!(cache.len(), 2);
    }
}
