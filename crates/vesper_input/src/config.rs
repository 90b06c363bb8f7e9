use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::ActionCatalog,
    error::InputError,
    physical::BindingResolver,
    router::{DisablePolicy, ModeRouter},
};

/// Runtime settings for the input layer, usually read from a JSON file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Action asset to load; the bundled "GameInputs" asset when absent.
    pub catalog: Option<PathBuf>,
    pub disable_policy: DisablePolicy,
    /// Group name -> mode names. Activating one member disables the others.
    pub exclusive_groups: BTreeMap<String, Vec<String>>,
    /// Only bindings in this binding group are resolved.
    pub control_scheme: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            disable_policy: DisablePolicy::default(),
            exclusive_groups: BTreeMap::from([(
                "gameplay".to_string(),
                vec!["Player".to_string(), "UI".to_string()],
            )]),
            control_scheme: None,
        }
    }
}

impl InputConfig {
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn load_catalog(&self) -> Result<ActionCatalog, InputError> {
        match &self.catalog {
            Some(path) => ActionCatalog::from_path(path),
            None => ActionCatalog::game_inputs(),
        }
    }

    pub fn build_router(&self, catalog: Arc<ActionCatalog>) -> Result<ModeRouter, InputError> {
        let mut router = ModeRouter::new(catalog).with_policy(self.disable_policy);

        for (group, modes) in &self.exclusive_groups {
            let names: Vec<&str> = modes.iter().map(String::as_str).collect();
            router.set_exclusive_group(group, &names)?;
        }

        Ok(router)
    }

    pub fn build_resolver(&self, catalog: Arc<ActionCatalog>) -> BindingResolver {
        if let Some(scheme) = &self.control_scheme {
            if catalog.control_scheme(scheme).is_none() {
                log::warn!("control scheme '{scheme}' is not declared by the input asset");
            }
        }

        BindingResolver::with_scheme(catalog, self.control_scheme.clone())
    }
}
