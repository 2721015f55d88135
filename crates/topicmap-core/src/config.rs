//! Run configuration: clustering thresholds, gap cutoffs and priority
//! weights. Loaded once, validated before any computation, then passed
//! immutably into each engine so concurrent runs never interfere.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Weights of the recommendation priority formula. Defaults are equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub entity: f64,
    pub intent: f64,
    pub serp: f64,
    pub cluster: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self { entity: 0.25, intent: 0.25, serp: 0.25, cluster: 0.25 }
    }
}

/// Immutable configuration for one analysis run.
///
/// - `t_core`: cosine threshold for core-topic agglomeration
/// - `t_sub`/`t_micro`: entity-Jaccard thresholds for the two inner passes
/// - `e_min`/`i_min`: coverage scores below which a micro topic draws an
///   UPDATE_PAGE recommendation
/// - `l_min`: shared-entity count at which unlinked siblings draw an
///   INTERNAL_LINK recommendation
/// - `max_entities_per_page`: cap applied by ingestion collaborators; kept
///   here so one config object describes the whole run
/// - `manual_hierarchy`: optional parent-label -> child-labels override,
///   attached verbatim to the exported summary (never fed back into
///   clustering)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub t_core: f64,
    pub t_sub: f64,
    pub t_micro: f64,
    pub e_min: f64,
    pub i_min: f64,
    pub l_min: usize,
    pub weights: PriorityWeights,
    pub max_entities_per_page: usize,
    pub manual_hierarchy: BTreeMap<String, Vec<String>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            t_core: 0.3,
            t_sub: 0.5,
            t_micro: 0.7,
            e_min: 0.5,
            i_min: 0.3,
            l_min: 3,
            weights: PriorityWeights::default(),
            max_entities_per_page: 50,
            manual_hierarchy: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load from `config.toml` + `config.<env>.toml` + `APP_*` env vars,
    /// then validate. The `analysis` table holds the fields above.
    pub fn load() -> anyhow::Result<Self> {
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        // Absent `analysis` table means defaults, not an error.
        let config: Self = if figment.find_value("analysis").is_ok() {
            figment
                .extract_inner("analysis")
                .map_err(|e| anyhow::anyhow!("Failed to load analysis config: {e}"))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid thresholds/weights before any computation starts.
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.t_core) {
            return Err(Error::Configuration(format!(
                "t_core must lie in [-1, 1], got {}",
                self.t_core
            )));
        }
        for (name, v) in [("t_sub", self.t_sub), ("t_micro", self.t_micro)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Configuration(format!(
                    "{name} must lie in [0, 1], got {v}"
                )));
            }
        }
        if self.t_core >= self.t_sub {
            return Err(Error::Configuration(format!(
                "thresholds must tighten: t_core {} >= t_sub {}",
                self.t_core, self.t_sub
            )));
        }
        if self.t_sub >= self.t_micro {
            return Err(Error::Configuration(format!(
                "thresholds must tighten: t_sub {} >= t_micro {}",
                self.t_sub, self.t_micro
            )));
        }
        for (name, v) in [("e_min", self.e_min), ("i_min", self.i_min)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Configuration(format!(
                    "{name} must lie in [0, 1], got {v}"
                )));
            }
        }
        let w = &self.weights;
        for (name, v) in [
            ("weights.entity", w.entity),
            ("weights.intent", w.intent),
            ("weights.serp", w.serp),
            ("weights.cluster", w.cluster),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Configuration(format!(
                    "{name} must be a non-negative finite number, got {v}"
                )));
            }
        }
        if w.entity + w.intent + w.serp + w.cluster <= 0.0 {
            return Err(Error::Configuration(
                "priority weights must not all be zero".to_string(),
            ));
        }
        if self.max_entities_per_page == 0 {
            return Err(Error::Configuration(
                "max_entities_per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
