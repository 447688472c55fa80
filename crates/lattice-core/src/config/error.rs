use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error during operation '{operation}' on path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format for path: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Deserialization from '{format}' failed: {source}")]
    Deserialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ConfigError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ConfigError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    fn deserialization<E>(format: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::Deserialization {
            format: format.to_string(),
            source: Box::new(source),
        }
    }
}

pub(crate) fn json_error(source: serde_json::Error) -> ConfigError {
    ConfigError::deserialization("json", source)
}

#[cfg(feature = "yaml-config")]
pub(crate) fn yaml_error(source: serde_yaml::Error) -> ConfigError {
    ConfigError::deserialization("yaml", source)
}

#[cfg(feature = "toml-config")]
pub(crate) fn toml_error(source: toml::de::Error) -> ConfigError {
    ConfigError::deserialization("toml", source)
}
