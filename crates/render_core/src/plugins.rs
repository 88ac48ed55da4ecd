//! Component plugin loading
//!
//! Factories are validated in parallel (construction plus self-consistency
//! checks are independent per factory), then registered sequentially in
//! declaration order so component ids never depend on thread scheduling.

use std::sync::Mutex;

use thiserror::Error;

use crate::component::plugin::PassComponentPlugin;
use crate::component::register::{ComponentError, PassComponentRegister};

/// Constructor for one component kind.
pub struct PluginFactory {
    name: &'static str,
    construct: fn() -> Box<dyn PassComponentPlugin>,
}

impl PluginFactory {
    /// Factory producing the component registered under `name`.
    pub fn new(name: &'static str, construct: fn() -> Box<dyn PassComponentPlugin>) -> Self {
        Self { name, construct }
    }

    /// Name the constructed component must register under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds a fresh plugin instance.
    pub fn construct(&self) -> Box<dyn PassComponentPlugin> {
        (self.construct)()
    }
}

/// Plugin loading errors.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Registration of a validated plugin was rejected.
    #[error(transparent)]
    Registration(#[from] ComponentError),
}

/// Loads a factory list into the register.
///
/// Returns the assigned ids of the loaded plugins in declaration order.
/// Factories that fail validation are skipped, their failures logged as one
/// warning summary; the engine runs without the capability they would have
/// contributed. Registration rejections (duplicate names, capacity) are
/// errors: they indicate a broken factory list, not a broken plugin.
pub fn load_plugins(
    register: &mut PassComponentRegister,
    factories: &[PluginFactory],
) -> Result<Vec<crate::flags::PassComponentId>, PluginError> {
    let failures = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        // Shared borrow for the workers; the Mutex itself stays owned here
        // so into_inner works after the scope joins.
        let failures = &failures;
        for chunk in factories.chunks(8) {
            scope.spawn(move || {
                for factory in chunk {
                    if let Err(reason) = validate(factory) {
                        failures
                            .lock()
                            .expect("validation lock poisoned")
                            .push((factory.name().to_string(), reason));
                    }
                }
            });
        }
    });

    let mut failures = failures.into_inner().expect("validation lock poisoned");
    if !failures.is_empty() {
        failures.sort();
        log::warn!(
            "Skipping {} plugin(s) that failed validation: {}",
            failures.len(),
            failures
                .iter()
                .map(|(name, reason)| format!("[{}] {}", name, reason))
                .collect::<Vec<_>>()
                .join("; "),
        );
    }

    let mut ids = Vec::with_capacity(factories.len());
    for factory in factories {
        if failures.iter().any(|(name, _)| name == factory.name()) {
            continue;
        }
        ids.push(register.register(factory.construct())?);
    }
    log::info!("Loaded {} pass components", ids.len());
    Ok(ids)
}

fn validate(factory: &PluginFactory) -> Result<(), String> {
    let plugin = factory.construct();
    if plugin.name().is_empty() {
        return Err("empty component name".to_string());
    }
    if plugin.name() != factory.name() {
        return Err(format!(
            "factory name [{}] does not match component name [{}]",
            factory.name(),
            plugin.name(),
        ));
    }
    if plugin.requires().contains(&plugin.name()) {
        return Err("component requires itself".to_string());
    }
    if plugin.excludes().contains(&plugin.name()) {
        return Err("component excludes itself".to_string());
    }
    if plugin.is_map_component() && plugin.texture_flags().is_empty() {
        return Err("map component declares no texture roles".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::builtin;
    use crate::flags::ComponentModeFlags;

    #[test]
    fn builtin_factories_load_with_sequential_ids() {
        let mut register = PassComponentRegister::new();
        let factories = builtin::factories();
        let ids = load_plugins(&mut register, &factories).unwrap();

        assert_eq!(ids.len(), factories.len());
        for (index, id) in ids.iter().enumerate() {
            assert_eq!(*id as usize, index + 1);
        }
    }

    #[test]
    fn loading_is_deterministic_across_runs() {
        let load = || {
            let mut register = PassComponentRegister::new();
            load_plugins(&mut register, &builtin::factories()).unwrap()
        };

        assert_eq!(load(), load());
    }

    #[test]
    fn invalid_factories_are_skipped_not_fatal() {
        struct Misnamed;
        impl PassComponentPlugin for Misnamed {
            fn name(&self) -> &'static str {
                "actual"
            }
            fn modes(&self) -> ComponentModeFlags {
                ComponentModeFlags::COLOUR
            }
        }

        struct Valid;
        impl PassComponentPlugin for Valid {
            fn name(&self) -> &'static str {
                "valid"
            }
            fn modes(&self) -> ComponentModeFlags {
                ComponentModeFlags::COLOUR
            }
        }

        let mut register = PassComponentRegister::new();
        let factories = [
            PluginFactory::new("declared", || Box::new(Misnamed)),
            PluginFactory::new("valid", || Box::new(Valid)),
        ];
        let ids = load_plugins(&mut register, &factories).unwrap();

        // The misnamed factory is dropped; the valid one still loads.
        assert_eq!(ids.len(), 1);
        assert!(register.component_id("valid").is_ok());
        assert!(register.component_id("actual").is_err());
        assert!(register.component_id("declared").is_err());
    }

    #[test]
    fn failures_in_distinct_validation_chunks_are_all_collected() {
        struct Misnamed;
        impl PassComponentPlugin for Misnamed {
            fn name(&self) -> &'static str {
                "actual"
            }
            fn modes(&self) -> ComponentModeFlags {
                ComponentModeFlags::COLOUR
            }
        }

        // Splice two broken factories into the builtin list far enough
        // apart to land in separate worker chunks.
        let mut factories = builtin::factories();
        let expected = factories.len();
        factories.insert(2, PluginFactory::new("bad-early", || Box::new(Misnamed)));
        factories.push(PluginFactory::new("bad-late", || Box::new(Misnamed)));

        let mut register = PassComponentRegister::new();
        let ids = load_plugins(&mut register, &factories).unwrap();

        assert_eq!(ids.len(), expected);
        assert!(register.component_id("bad-early").is_err());
        assert!(register.component_id("bad-late").is_err());
        assert!(register.component_id("colour").is_ok());
    }
}
