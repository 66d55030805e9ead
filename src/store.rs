//! Local cache of the last-entered planner inputs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::{PlannerError, PlannerInputs};
use crate::inputs::{InputsPayload, apply_payload};

/// Cached inputs older than this are ignored.
pub const FRESHNESS_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct StoredInputs {
    #[serde(flatten)]
    inputs: InputsPayload,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ParameterCache {
    path: PathBuf,
}

impl ParameterCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached inputs merged over `defaults`, or `defaults` itself when the
    /// cache is missing, unreadable, invalid, or older than [`FRESHNESS_DAYS`].
    pub fn load(&self, defaults: &PlannerInputs, now: DateTime<Utc>) -> PlannerInputs {
        let payload = match self.read_fresh(now) {
            Ok(Some(payload)) => payload,
            Ok(None) => return defaults.clone(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring unreadable input cache");
                return defaults.clone();
            }
        };

        match apply_payload(defaults.clone(), payload) {
            Ok(inputs) => inputs,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring invalid cached inputs");
                defaults.clone()
            }
        }
    }

    pub fn save(&self, inputs: &PlannerInputs, now: DateTime<Utc>) -> Result<(), PlannerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let stored = StoredInputs {
            inputs: InputsPayload::from(inputs),
            timestamp: Some(now),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        debug!(path = %self.path.display(), "saved inputs to cache");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PlannerError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn read_fresh(&self, now: DateTime<Utc>) -> Result<Option<InputsPayload>, PlannerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let stored: StoredInputs = serde_json::from_str(&raw)?;
        if let Some(saved_at) = stored.timestamp {
            if saved_at < now - Duration::days(FRESHNESS_DAYS) {
                info!(%saved_at, "cached inputs are stale; using defaults");
                return Ok(None);
            }
        }
        Ok(Some(stored.inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CalculationMode;

    fn temp_cache(name: &str) -> ParameterCache {
        let path = std::env::temp_dir().join(format!(
            "swp-planner-{}-{name}.json",
            std::process::id()
        ));
        let cache = ParameterCache::new(path);
        cache.clear().expect("clear stale test file");
        cache
    }

    fn edited_inputs() -> PlannerInputs {
        let mut inputs = PlannerInputs::default();
        inputs.params.current_age = 35;
        inputs.params.expected_return = 12.0;
        inputs.calculation_mode = CalculationMode::CalculateIncome;
        inputs.target_end_corpus = 50_000_000.0;
        inputs
    }

    #[test]
    fn missing_cache_returns_defaults() {
        let cache = temp_cache("missing");
        let defaults = PlannerInputs::default();
        assert_eq!(cache.load(&defaults, Utc::now()), defaults);
    }

    #[test]
    fn saved_inputs_load_back_within_window() {
        let cache = temp_cache("fresh");
        let now = Utc::now();
        let inputs = edited_inputs();

        cache.save(&inputs, now).expect("save");
        let loaded = cache.load(&PlannerInputs::default(), now + Duration::days(29));
        assert_eq!(loaded, inputs);
        cache.clear().expect("clear");
    }

    #[test]
    fn stale_cache_falls_back_to_defaults() {
        let cache = temp_cache("stale");
        let now = Utc::now();
        cache.save(&edited_inputs(), now).expect("save");

        let defaults = PlannerInputs::default();
        let loaded = cache.load(&defaults, now + Duration::days(FRESHNESS_DAYS + 1));
        assert_eq!(loaded, defaults);
        cache.clear().expect("clear");
    }

    #[test]
    fn partial_cache_keeps_defaults_for_missing_fields() {
        let cache = temp_cache("partial");
        fs::write(cache.path(), r#"{"currentAge": 40, "targetEndCorpus": "2,00,00,000"}"#)
            .expect("write cache");

        let loaded = cache.load(&PlannerInputs::default(), Utc::now());
        assert_eq!(loaded.params.current_age, 40);
        assert_eq!(loaded.target_end_corpus, 20_000_000.0);
        assert_eq!(loaded.params.end_age, PlannerInputs::default().params.end_age);
        cache.clear().expect("clear");
    }

    #[test]
    fn corrupt_or_invalid_cache_falls_back_to_defaults() {
        let cache = temp_cache("corrupt");
        let defaults = PlannerInputs::default();

        fs::write(cache.path(), "{not json").expect("write cache");
        assert_eq!(cache.load(&defaults, Utc::now()), defaults);

        fs::write(cache.path(), r#"{"expectedReturn": -250}"#).expect("write cache");
        assert_eq!(cache.load(&defaults, Utc::now()), defaults);
        cache.clear().expect("clear");
    }

    #[test]
    fn clear_is_idempotent() {
        let cache = temp_cache("clear");
        cache.save(&edited_inputs(), Utc::now()).expect("save");
        assert!(cache.path().exists());
        cache.clear().expect("first clear");
        cache.clear().expect("second clear");
        assert!(!cache.path().exists());
    }
}
