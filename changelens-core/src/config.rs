use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default file name looked up by the CLI.
pub const CONFIG_FILE_NAME: &str = "changelens.toml";

/// Top-level changelens configuration, matching `changelens.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelensConfig {
    #[serde(default)]
    pub diff: DiffSection,
    #[serde(default)]
    pub factory: FactorySection,
    #[serde(default)]
    pub config_methods: ConfigMethodsSection,
    #[serde(default)]
    pub public_api: PublicApiSection,
    #[serde(default)]
    pub communication_layer: CommunicationLayerSection,
    #[serde(default)]
    pub constants: ConstantsSection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub context: ContextSection,
}

impl ChangelensConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Parse(format!("{}: {e}", path.display())),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("factory.class_suffix", &self.factory.class_suffix),
            ("communication_layer.directory", &self.communication_layer.directory),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        for (field, values) in [
            ("factory.method_prefixes", &self.factory.method_prefixes),
            ("factory.accessor_names", &self.factory.accessor_names),
            ("config_methods.class_suffixes", &self.config_methods.class_suffixes),
            ("config_methods.annotation_tags", &self.config_methods.annotation_tags),
            ("public_api.class_suffixes", &self.public_api.class_suffixes),
            ("communication_layer.class_suffixes", &self.communication_layer.class_suffixes),
            ("constants.class_suffixes", &self.constants.class_suffixes),
            ("constants.directories", &self.constants.directories),
        ] {
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must not contain empty entries"
                )));
            }
        }
        for (field, value) in [
            ("risk.modified_config_methods_high", self.risk.modified_config_methods_high),
            ("risk.new_public_api_medium", self.risk.new_public_api_medium),
            ("risk.internal_with_impact_medium", self.risk.internal_with_impact_medium),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be at least 1")));
            }
        }
        for pattern in self
            .context
            .include_patterns
            .iter()
            .chain(&self.context.exclude_patterns)
        {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "context patterns must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection {
    /// Context lines retained on each side of a run of changes.
    pub context_lines: usize,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self { context_lines: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorySection {
    pub class_suffix: String,
    pub method_prefixes: Vec<String>,
    /// Accessors whose `@method`/`@return` annotation names the owner's factory.
    pub accessor_names: Vec<String>,
}

impl Default for FactorySection {
    fn default() -> Self {
        Self {
            class_suffix: "Factory".into(),
            method_prefixes: vec!["create".into(), "get".into()],
            accessor_names: vec!["getFactory".into(), "getBusinessFactory".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMethodsSection {
    pub class_suffixes: Vec<String>,
    /// Doc tags (without `@`) that mark a public method as configuration.
    pub annotation_tags: Vec<String>,
}

impl Default for ConfigMethodsSection {
    fn default() -> Self {
        Self {
            class_suffixes: vec!["Config".into()],
            annotation_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicApiSection {
    /// Owner suffixes marking public API; `Interface`-suffixed variants match too.
    pub class_suffixes: Vec<String>,
}

impl Default for PublicApiSection {
    fn default() -> Self {
        Self {
            class_suffixes: vec![
                "Facade".into(),
                "Client".into(),
                "Service".into(),
                "Plugin".into(),
            ],
        }
    }
}

/// Controllers, forms and tables of a module's Communication layer. Their
/// modified methods form a category of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationLayerSection {
    /// Path component that marks the layer.
    pub directory: String,
    pub class_suffixes: Vec<String>,
}

impl Default for CommunicationLayerSection {
    fn default() -> Self {
        Self {
            directory: "Communication".into(),
            class_suffixes: vec!["Controller".into(), "Form".into(), "Table".into()],
        }
    }
}

/// Which classes hold configuration constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantsSection {
    pub class_suffixes: Vec<String>,
    /// Path components whose classes all count as configuration holders.
    pub directories: Vec<String>,
}

impl Default for ConstantsSection {
    fn default() -> Self {
        Self {
            class_suffixes: vec!["Config".into(), "Constants".into()],
            directories: vec!["Config".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub modified_config_methods_high: usize,
    pub new_public_api_medium: usize,
    pub internal_with_impact_medium: usize,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            modified_config_methods_high: 3,
            new_public_api_medium: 5,
            internal_with_impact_medium: 10,
        }
    }
}

/// Untouched files loaded alongside the diff so documentation can be inherited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*Interface.php".into()],
            exclude_patterns: vec![
                "**/vendor/**".into(),
                "**/node_modules/**".into(),
                "**/.git/**".into(),
            ],
        }
    }
}
