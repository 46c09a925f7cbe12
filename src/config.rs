use json::JsonValue;
use std::fmt;
use std::fs::read_to_string;

/// Runtime switches for the library
///
/// Adaptive refinement is enabled by default. When `refinement_enabled` is `false`, every refinement
/// operation on a [`Mesh`](crate::Mesh) fails with [`RefinementError::Disabled`](crate::RefinementError)
///
/// Configuration files are JSON objects:
/// ```JSON
/// {
///     "refinement_enabled": false
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibConfig {
    pub refinement_enabled: bool,
}

impl LibConfig {
    /// A configuration with adaptive refinement turned off
    pub fn without_refinement() -> Self {
        Self {
            refinement_enabled: false,
        }
    }

    /// Read a configuration from a JSON file. Missing keys keep their default values.
    pub fn from_file(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        let contents = read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        let config_json = json::parse(&contents).map_err(ConfigError::Parse)?;
        Self::from_json(&config_json)
    }

    /// Build a configuration from an already parsed JSON object
    pub fn from_json(config_json: &JsonValue) -> Result<Self, ConfigError> {
        if !config_json.is_object() {
            return Err(ConfigError::NotAnObject);
        }

        let mut config = Self::default();

        let refinement = &config_json["refinement_enabled"];
        if !refinement.is_null() {
            config.refinement_enabled = refinement
                .as_bool()
                .ok_or(ConfigError::InvalidField("refinement_enabled"))?;
        }

        Ok(config)
    }

    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        json::object! {
            "refinement_enabled": self.refinement_enabled,
        }
    }
}

impl Default for LibConfig {
    fn default() -> Self {
        Self {
            refinement_enabled: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(json::Error),
    NotAnObject,
    InvalidField(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "Unable to read config file: {}", err),
            Self::Parse(err) => write!(f, "Unable to parse config file as JSON: {}", err),
            Self::NotAnObject => write!(f, "Config must be a JSON object!"),
            Self::InvalidField(name) => write!(f, "Config field '{}' has the wrong type!", name),
        }
    }
}

impl std::error::Error for ConfigError {}
