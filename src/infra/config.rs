// ============================================================
// Layer 6 — Config Loader
// ============================================================
// Reads a YAML training config, brings older layouts up to the
// current field set, then deserializes and validates it.
//
// Migrations (applied in this order):
//   num_models_to_keep            → copied to num_last_models_to_keep
//                                   and num_best_models_to_keep, removed
//   optimizer_lr                  → 1e-3 if absent
//   exponential_lr_scheduler_gamma → dropped
//   weight_decay                  → 0 if absent
//   test_ratio                    → 0 if absent
//   use_layernorm                 → dropped

use std::{fs, path::Path};

use serde_yaml::{Mapping, Value};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::{Result, TranslitError};

/// Rewrite a raw config mapping into the current layout.
pub fn migrate(mut config: Mapping) -> Mapping {
    if let Some(keep) = config.remove("num_models_to_keep") {
        config.insert("num_last_models_to_keep".into(), keep.clone());
        config.insert("num_best_models_to_keep".into(), keep);
    }

    if !config.contains_key("optimizer_lr") {
        config.insert("optimizer_lr".into(), Value::from(1e-3));
    }

    config.remove("exponential_lr_scheduler_gamma");

    if !config.contains_key("weight_decay") {
        config.insert("weight_decay".into(), Value::from(0.0));
    }

    if !config.contains_key("test_ratio") {
        config.insert("test_ratio".into(), Value::from(0.0));
    }

    config.remove("use_layernorm");

    config
}

/// Parse, migrate, deserialize and validate a YAML document.
pub fn parse_config(text: &str) -> Result<TrainConfig> {
    let raw: Value = serde_yaml::from_str(text)
        .map_err(|e| TranslitError::Config(format!("malformed YAML: {e}")))?;
    let Value::Mapping(mapping) = raw else {
        return Err(TranslitError::Config("top level must be a mapping".into()));
    };

    let config: TrainConfig = serde_yaml::from_value(Value::Mapping(migrate(mapping)))
        .map_err(|e| TranslitError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load a config file from disk.
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| TranslitError::io(path, e))?;
    let config = parse_config(&text)?;
    tracing::debug!("Loaded config from '{}'", path.display());
    Ok(config)
}

/// Write the resolved (already migrated) config as YAML.
pub fn save_config(config: &TrainConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(config)
        .map_err(|e| TranslitError::Config(format!("cannot serialize config: {e}")))?;
    fs::write(path, text).map_err(|e| TranslitError::io(path, e))?;
    tracing::debug!("Saved resolved config to '{}'", path.display());
    Ok(())
}
