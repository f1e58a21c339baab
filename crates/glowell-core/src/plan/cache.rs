//! Memoization of successful plans keyed by intake and settings.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::generate::{GenerateError, GenerateOutcome, Generator};
use crate::config::GenerateConfig;
use crate::intake::{self, Intake};

/// Bounded FIFO cache of successful generation outcomes.
///
/// A hit returns the outcome as first generated, including its original
/// `generatedAt`. Rejected and blocked outcomes are never stored.
#[derive(Debug)]
pub struct PlanCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, GenerateOutcome>,
    order: VecDeque<String>,
}

impl PlanCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Hex SHA-256 over the JSON encoding of the normalized intake and the
    /// settings that shape output.
    pub fn key_for(intake: &Intake, config: &GenerateConfig) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(&(intake, config))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Return the cached outcome for `raw` or generate and store it.
    pub fn get_or_generate(
        &self,
        generator: &Generator,
        raw: &Value,
        now: DateTime<Utc>,
    ) -> Result<GenerateOutcome, GenerateError> {
        let intake = intake::normalize(raw);
        let key = Self::key_for(&intake, generator.config())?;

        if let Some(hit) = self.lock().entries.get(&key) {
            tracing::debug!(key = %&key[..12], "plan cache hit");
            return Ok(hit.clone());
        }

        let outcome = generator.generate_intake_at(&intake, now)?;
        if outcome.is_success() && self.capacity > 0 {
            let mut state = self.lock();
            if !state.entries.contains_key(&key) {
                while state.order.len() >= self.capacity {
                    if let Some(oldest) = state.order.pop_front() {
                        state.entries.remove(&oldest);
                    }
                }
                state.order.push_back(key.clone());
                state.entries.insert(key, outcome.clone());
            }
        }
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
