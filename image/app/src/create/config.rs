/*++

Licensed under the Apache-2.0 license.

File Name:

   config.rs

Abstract:

    File contains utilities for parsing configuration files

--*/

use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Key Configuration
///
/// Paths are relative to the directory holding the configuration file.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct KeyConfig {
    /// Firmware RSA private key PEM
    pub firmware_priv_key: String,

    /// Kernel RSA private key PEM
    pub kernel_priv_key: String,

    /// Processed kernel public key; derived from `kernel_priv_key` if absent
    pub kernel_pub_key: Option<String>,
}

/// Load Key Configuration from file
pub(crate) fn load_key_config(path: &Path) -> anyhow::Result<KeyConfig> {
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read the config file {}", path.display()))?;

    let config: KeyConfig = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    Ok(config)
}
