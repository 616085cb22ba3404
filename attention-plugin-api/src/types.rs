//! Plugin metadata and configuration descriptors

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin configuration: a JSON object of setting name to value.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Kind of plugin, reported in metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    #[default]
    General,
    Analyzer,
    Nudge,
    Reporter,
    Exporter,
    Provider,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Analyzer => "analyzer",
            Self::Nudge => "nudge",
            Self::Reporter => "reporter",
            Self::Exporter => "exporter",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin metadata. `name` is the globally unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique identifier, e.g. `wechat-nudge`
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub plugin_type: PluginType,
    pub homepage: String,
    pub tags: Vec<String>,
}

impl PluginMetadata {
    /// Create metadata with version `0.1.0` and everything else empty
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            version: "0.1.0".to_string(),
            author: String::new(),
            plugin_type: PluginType::General,
            homepage: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = homepage.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn plugin_type(mut self, plugin_type: PluginType) -> Self {
        self.plugin_type = plugin_type;
        self
    }
}

/// Input widget kind for a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Boolean,
    Select,
    /// Rendered masked, e.g. webhook tokens
    Secret,
}

/// Describes one configuration setting for a management surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Choices for [`FieldType::Select`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            required: false,
            default: None,
            options: Vec::new(),
            help: None,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldType::Text)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Merge `overlay` over `base`, key by key. Overlay values win; keys only in
/// `base` are kept.
pub fn merge_config(base: &ConfigMap, overlay: &ConfigMap) -> ConfigMap {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
