use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::draw::fair::GROUP_COOLDOWN_WINDOW;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Nombre de tirages avant qu'un niveau redevienne éligible.
    pub group_cooldown: usize,
    /// Nombre de gagnants par défaut d'une session.
    pub session_size: usize,
    /// Séparateur des fichiers CSV importés.
    pub delimiter: char,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            group_cooldown: GROUP_COOLDOWN_WINDOW,
            session_size: 10,
            delimiter: ';',
        }
    }
}

impl DrawConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("Séparateur CSV non ASCII : '{}'", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }
}

/// Charge la configuration depuis un fichier JSON, ou les valeurs par défaut.
pub fn load_config(path: Option<&Path>) -> Result<DrawConfig> {
    let Some(path) = path else {
        return Ok(DrawConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire la configuration {:?}", path))?;
    let config: DrawConfig = serde_json::from_str(&json)
        .with_context(|| format!("Configuration invalide {:?}", path))?;
    log::info!("Configuration chargée depuis {}", path.display());
    Ok(config)
}
