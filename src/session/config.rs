//! Manual configuration as authored alongside the function.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::analysis::Linkage;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported configuration format '{0}', expected .toml or .json")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableRole {
    /// Set by the viewer; restored to its default on every refresh.
    #[default]
    Input,
    /// Produced by the manual function.
    Computed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub id: String,
    #[serde(default)]
    pub role: VariableRole,
    #[serde(default)]
    pub default: Value,
    /// Parent array variable this one describes an element of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_of: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    pub manual_function: Option<String>,
    pub variables: Vec<VariableSpec>,
    pub linkage: BTreeMap<String, Linkage>,
    pub output: Option<String>,
    pub max_steps: Option<usize>,
}

impl ManualConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn variable(&self, id: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Every declared variable with its default value.
    pub fn default_values(&self) -> Map<String, Value> {
        self.variables
            .iter()
            .map(|v| (v.id.clone(), v.default.clone()))
            .collect()
    }

    pub fn input_variables(&self) -> impl Iterator<Item = &VariableSpec> {
        self.variables
            .iter()
            .filter(|v| v.role == VariableRole::Input)
    }

    /// Member variable id → parent variable id.
    pub fn members(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .filter_map(|v| v.member_of.as_ref().map(|p| (v.id.clone(), p.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn reads_toml() {
        let config = ManualConfig::from_toml_str(
            r#"
manual_function = "function({a}) { return a * 2; }"
output = "doubled"

[[variables]]
id = "a"
default = 3

[[variables]]
id = "doubled"
role = "computed"

[linkage]
x = "a"
both = ["a", "doubled"]
"#,
        )
        .unwrap();
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.variables[0].role, VariableRole::Input);
        assert_eq!(config.variables[0].default, json!(3));
        assert_eq!(config.variables[1].role, VariableRole::Computed);
        assert_eq!(config.variables[1].default, Value::Null);
        assert_eq!(config.linkage["x"], Linkage::Single("a".to_string()));
        assert_eq!(
            config.linkage["both"],
            Linkage::Multi(vec!["a".to_string(), "doubled".to_string()])
        );
        assert_eq!(config.output.as_deref(), Some("doubled"));
        assert_eq!(config.max_steps, None);
    }

    #[test]
    fn reads_json_with_members() {
        let config = ManualConfig::from_json_str(
            r#"{"variables": [
                {"id": "points", "default": [1, 2]},
                {"id": "point", "member_of": "points"}
            ], "max_steps": 50}"#,
        )
        .unwrap();
        assert_eq!(config.members()["point"], "points");
        assert_eq!(config.max_steps, Some(50));
        assert_eq!(config.input_variables().count(), 2);
        assert_eq!(config.default_values()["points"], json!([1, 2]));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = std::env::temp_dir().join("manual-stepper-config-test.yaml");
        fs::write(&dir, "a: 1").unwrap();
        let err = ManualConfig::from_path(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "yaml"));
        let _ = fs::remove_file(&dir);
    }
}
