//! Layered configuration loader.
//!
//! Layers apply in order, later ones overriding earlier ones key by key:
//!
//! 1. a preset (`with_defaults`, `with_development`, `with_production`)
//! 2. files and strings (TOML or JSON), in the order they were added
//! 3. `PREFIX__SECTION__KEY` environment variables
//!
//! Unknown keys are rejected at every layer.

use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, StitchConfig};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use stitch_config::ConfigLoader;
///
/// # fn main() -> Result<(), stitch_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("stitch.toml")?
///     .with_env_prefix("STITCH")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    base: StitchConfig,
    layers: Vec<Value>,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Creates a loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`StitchConfig::default`].
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.base = StitchConfig::default();
        self
    }

    /// Starts from [`StitchConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.base = StitchConfig::development();
        self
    }

    /// Starts from [`StitchConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.base = StitchConfig::production();
        self
    }

    /// Adds a TOML (`.toml`) or JSON (`.json`) file layer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension or does not parse.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::unsupported_format(path.display().to_string()))?;

        self.with_string(&content, format)
    }

    /// Adds a file layer if the file exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Adds a layer from a string in the given format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use stitch_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// assert!(config.server.keep_alive);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };

        // Rejects unknown keys and bad types now rather than at `load`.
        serde_json::from_value::<StitchConfig>(layer.clone())?;

        self.layers.push(layer);
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` environment overrides, e.g.
    /// `STITCH__SERVER__HTTP_ADDR=127.0.0.1:9000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Reads overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Loads `.env` from the current directory, if present, into the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the given `.env`-style file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path)?;
        Ok(self)
    }

    /// Merges all layers and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override is malformed or validation fails.
    pub fn load(self) -> Result<StitchConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Merges all layers without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override is malformed or the merged tree
    /// does not deserialize.
    pub fn load_unvalidated(self) -> Result<StitchConfig, ConfigError> {
        let mut merged = serde_json::to_value(&self.base)?;
        for layer in self.layers {
            merge(&mut merged, layer);
        }

        if let Some(prefix) = &self.env_prefix {
            let vars = self.env_vars.unwrap_or_else(|| env::vars().collect());
            for (key, value) in &vars {
                apply_env_var(&mut merged, prefix, key, value)?;
            }
        }

        Ok(serde_json::from_value(merged)?)
    }
}

/// Recursively merges `layer` into `target`. Tables merge; anything else
/// replaces.
fn merge(target: &mut Value, layer: Value) {
    match (target, layer) {
        (Value::Object(target), Value::Object(layer)) => {
            for (key, value) in layer {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, layer) => *target = layer,
    }
}

fn apply_env_var(
    merged: &mut Value,
    prefix: &str,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let Some(path) = key
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix("__"))
    else {
        return Ok(());
    };

    let pointer = path
        .split("__")
        .fold(String::new(), |acc, part| acc + "/" + &part.to_lowercase());

    let slot = merged
        .pointer_mut(&pointer)
        .ok_or_else(|| ConfigError::UnknownKey {
            var: key.to_string(),
        })?;
    if slot.is_object() {
        return Err(ConfigError::env_parse_error(key, "names a section, not a key"));
    }

    *slot = parse_env_value(slot, key, value)?;
    Ok(())
}

/// Parses `raw` into the JSON type the key currently holds. `none` or an
/// empty value unsets anything but a string.
fn parse_env_value(current: &Value, var: &str, raw: &str) -> Result<Value, ConfigError> {
    if !current.is_string() && (raw.is_empty() || raw.eq_ignore_ascii_case("none")) {
        return Ok(Value::Null);
    }

    let value = match current {
        Value::Bool(_) => Value::Bool(
            parse_bool(raw).ok_or_else(|| ConfigError::env_parse_error(var, "expected boolean"))?,
        ),
        Value::Number(_) => parse_number(raw)
            .ok_or_else(|| ConfigError::env_parse_error(var, "expected number"))?,
        Value::Array(_) => Value::Array(
            raw.split(',')
                .map(|item| {
                    parse_number(item.trim()).ok_or_else(|| {
                        ConfigError::env_parse_error(var, "expected comma-separated numbers")
                    })
                })
                .collect::<Result<_, _>>()?,
        ),
        Value::String(_) => Value::String(raw.to_string()),
        Value::Null | Value::Object(_) => {
            parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string()))
        }
    };
    Ok(value)
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Value::from(n));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
