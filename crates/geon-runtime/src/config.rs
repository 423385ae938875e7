use std::collections::BTreeSet;
use std::path::Path;

use geon_types::Address;
use serde::{Deserialize, Serialize};

/// Where each component is deployed and who administers them.
///
/// Addresses are written as `0x`-prefixed hex. Missing fields take their
/// default, derived from a fixed label (see [`Address::derive`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Owner of all three components.
    pub owner: Address,
    pub coin: Address,
    pub registry: Address,
    pub store: Address,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            owner: Address::derive("owner"),
            coin: Address::derive("geon-coin"),
            registry: Address::derive("geon-registry"),
            store: Address::derive("geon-store"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid deployment config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render deployment config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid deployment config: {0}")]
    Invalid(String),
}

impl DeploymentConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Every address must be set, and the three components must be distinct
    /// from each other and from the owner.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("owner", self.owner),
            ("coin", self.coin),
            ("registry", self.registry),
            ("store", self.store),
        ];
        if let Some((name, _)) = named.iter().find(|(_, address)| address.is_null()) {
            return Err(ConfigError::Invalid(format!("{name} address is unset")));
        }
        let distinct: BTreeSet<Address> = named.iter().map(|(_, address)| *address).collect();
        if distinct.len() != named.len() {
            return Err(ConfigError::Invalid(
                "owner, coin, registry and store addresses must all differ".into(),
            ));
        }
        Ok(())
    }
}
