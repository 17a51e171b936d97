//! Persisted best score
//!
//! A single number that only ever goes up. Stored in LocalStorage in the
//! browser; tests and native runs keep it in memory.

use serde::{Deserialize, Serialize};

use crate::platform::{ScoreStore, StoreError};

/// The record as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BestScore {
    pub score: u64,
}

impl BestScore {
    pub fn new(score: u64) -> Self {
        Self { score }
    }

    /// Fold in a finished run. Returns true if it beat the record.
    pub fn record(&mut self, score: u64) -> bool {
        if score > self.score {
            self.score = score;
            true
        } else {
            false
        }
    }
}

/// Best score held in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    best: BestScore,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_best(score: u64) -> Self {
        Self {
            best: BestScore::new(score),
            writes: 0,
        }
    }

    /// How many times the record was saved
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ScoreStore for MemoryStore {
    fn load_best(&self) -> Result<u64, StoreError> {
        Ok(self.best.score)
    }

    fn save_best(&mut self, score: u64) -> Result<(), StoreError> {
        self.best.record(score);
        self.writes += 1;
        Ok(())
    }
}

/// Best score in the browser's LocalStorage
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    const STORAGE_KEY: &'static str = "neon_drive_best";

    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(StoreError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl ScoreStore for LocalStore {
    fn load_best(&self) -> Result<u64, StoreError> {
        let storage = Self::storage()?;
        match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                let best: BestScore = serde_json::from_str(&json)?;
                log::info!("Loaded best score {}", best.score);
                Ok(best.score)
            }
            Ok(None) => {
                log::info!("No best score found, starting fresh");
                Ok(0)
            }
            Err(_) => Err(StoreError::Unavailable),
        }
    }

    fn save_best(&mut self, score: u64) -> Result<(), StoreError> {
        let storage = Self::storage()?;
        let json = serde_json::to_string(&BestScore::new(score))?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| StoreError::Write(format!("{:?}", e)))?;
        log::info!("Best score saved ({})", score);
        Ok(())
    }
}
