use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EmergenceError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmergenceConfig {
    /// Fixed seed for the stream generator; entropy when absent.
    pub rng_seed: Option<u64>,
    /// Streamed apps between two network-analysis refreshes.
    pub stream_refresh_every: u32,
    pub journal_capacity: usize,
    pub start_ms: u64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        EmergenceConfig {
            rng_seed: None,
            stream_refresh_every: 10,
            journal_capacity: 256,
            start_ms: 0,
        }
    }
}

impl EmergenceConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EmergenceError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: EmergenceConfig = serde_json::from_str(raw)?;
        config.stream_refresh_every = config.stream_refresh_every.max(1);
        config.journal_capacity = config.journal_capacity.max(1);
        Ok(config)
    }

    pub fn seeded(seed: u64) -> Self {
        EmergenceConfig {
            rng_seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn make_rng(&self) -> ChaCha8Rng {
        match self.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}
