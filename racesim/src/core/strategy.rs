use crate::core::track::{CircuitPars, Track};
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One stint of a strategy template. All lap values are fractions of the race distance.
/// * `compound` - Compound run during the stint
/// * `target_lap_fraction` - Ideal lap to end the stint with a pit stop
/// * `pit_window_fraction` - Start and end of the window in which the stop should happen
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StintPlan {
    pub compound: String,
    #[serde(default)]
    pub target_lap_fraction: f64,
    #[serde(default)]
    pub pit_window_fraction: [f64; 2],
}

impl StintPlan {
    /// Returns the pit window fractions with `end >= start`.
    pub fn pit_window(&self) -> (f64, f64) {
        let [start, end] = self.pit_window_fraction;
        (start, end.max(start))
    }
}

/// Reusable pit strategy template.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceStrategy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stints: Vec<StintPlan>,
    #[serde(default)]
    pub recommended_compounds: Vec<String>,
    #[serde(default)]
    pub tyre_wear_expectation: String,
    #[serde(default)]
    pub safety_car_adjustment: HashMap<String, i32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub wear_threshold: Option<f64>,
    #[serde(default)]
    pub max_stops: Option<u32>,
}

/// Circuit supplied mapping to a strategy template.
/// * `template` - Id of the strategy template
/// * `notes` - Free text shown to the player
/// * `stint_offsets` - Lap biases, `stint_<k>` (1-based) for a single stint, `all` for every stint
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StrategyPreset {
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub stint_offsets: HashMap<String, f64>,
}

/// `strategy_presets` block of a circuit record.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CircuitPresetsPars {
    #[serde(default)]
    pub default: Option<StrategyPreset>,
    #[serde(default)]
    pub alternate: Option<StrategyPreset>,
}

/// Circuit specific strategic defaults plus tyre stress information.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitStrategyProfile {
    pub tyre_stress_profile: String,
    pub default: StrategyPreset,
    pub alternate: Option<StrategyPreset>,
}

impl CircuitStrategyProfile {
    /// Returns None for circuits without a usable `strategy_presets` block.
    pub fn from_circuit(circuit: &CircuitPars) -> Option<CircuitStrategyProfile> {
        let presets = circuit.strategy_presets.as_ref()?;
        let default = presets.default.clone()?;
        if default.template.trim().is_empty() {
            return None;
        }

        Some(CircuitStrategyProfile {
            tyre_stress_profile: circuit.tyre_stress_profile.to_owned(),
            default,
            alternate: presets
                .alternate
                .clone()
                .filter(|p| !p.template.trim().is_empty()),
        })
    }

    /// Returns the preset for the given choice. The alternate falls back to the default preset if
    /// the circuit has none.
    pub fn preset(&self, choice: StrategyChoice) -> &StrategyPreset {
        match choice {
            StrategyChoice::Default => &self.default,
            StrategyChoice::Alternate => self.alternate.as_ref().unwrap_or(&self.default),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyChoice {
    Default,
    Alternate,
}

impl Default for StrategyChoice {
    fn default() -> Self {
        StrategyChoice::Default
    }
}

impl FromStr for StrategyChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(StrategyChoice::Default),
            "alternate" | "alt" => Ok(StrategyChoice::Alternate),
            other => Err(format!(
                "unknown strategy choice '{}', expected 'default' or 'alternate'",
                other
            )),
        }
    }
}

/// Lap numbers of a stint's pit window for a concrete race distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StintWindow {
    pub start: u32,
    pub target: u32,
    pub end: u32,
}

/// StrategyPlan is a strategy template resolved for one circuit (template + preset offsets).
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPlan {
    pub strategy: RaceStrategy,
    pub preset: StrategyPreset,
}

impl StrategyPlan {
    pub fn stint_count(&self) -> usize {
        self.strategy.stints.len()
    }

    /// Number of pit stops the plan allows.
    pub fn allowed_stops(&self) -> u32 {
        self.strategy
            .max_stops
            .unwrap_or_else(|| self.stint_count().saturating_sub(1) as u32)
    }

    pub fn compound_for_stint(&self, stint_idx: usize) -> Option<&str> {
        self.strategy
            .stints
            .get(stint_idx)
            .map(|s| s.compound.as_str())
    }

    pub fn starting_compound(&self) -> Option<&str> {
        self.compound_for_stint(0)
    }

    pub fn wear_threshold(&self) -> Option<f64> {
        self.strategy.wear_threshold
    }

    /// Integer lap bias for the given stint from the preset's `stint_offsets`.
    pub fn lap_bias(&self, stint_idx: usize) -> i32 {
        let offsets = &self.preset.stint_offsets;
        let all = offsets.get("all").copied().unwrap_or(0.0);
        let single = offsets
            .get(&format!("stint_{}", stint_idx + 1))
            .copied()
            .unwrap_or(0.0);
        (all + single).round() as i32
    }

    /// Extra lap bias applied while the safety car is out.
    pub fn safety_car_lap_bias(&self) -> i32 {
        self.strategy
            .safety_car_adjustment
            .get("lap_bias")
            .copied()
            .unwrap_or(0)
    }

    /// Returns the pit window of the given stint, or None if the stint does not end with a stop
    /// (the last stint, or an index beyond the plan).
    pub fn stint_window(
        &self,
        stint_idx: usize,
        track: &Track,
        extra_bias: i32,
    ) -> Option<StintWindow> {
        if stint_idx + 1 >= self.stint_count() {
            return None;
        }
        let stint = &self.strategy.stints[stint_idx];
        let bias = self.lap_bias(stint_idx) + extra_bias;
        let laps = track.num_laps as f64;
        let (start_frac, end_frac) = stint.pit_window();

        let shift = |lap: f64| -> u32 {
            let shifted = lap as i64 + bias as i64;
            shifted.clamp(1, track.num_laps.max(1) as i64) as u32
        };

        let start = shift((laps * start_frac).ceil());
        let end = shift((laps * end_frac).floor()).max(start);
        let target = shift((laps * stint.target_lap_fraction).round());

        Some(StintWindow { start, target, end })
    }
}

enum StrategySource {
    File(PathBuf),
    Memory,
}

/// Lazily loaded cache of the reusable strategy templates, keyed by id. The data is read once
/// on first access; a failed read is reported to the caller and retried on the next access.
pub struct StrategyRepository {
    source: StrategySource,
    strategies: Option<HashMap<String, RaceStrategy>>,
}

impl StrategyRepository {
    pub fn from_path(path: &Path) -> StrategyRepository {
        StrategyRepository {
            source: StrategySource::File(path.to_path_buf()),
            strategies: None,
        }
    }

    pub fn from_strategies(strategies: Vec<RaceStrategy>) -> StrategyRepository {
        StrategyRepository {
            source: StrategySource::Memory,
            strategies: Some(strategies.into_iter().map(|s| (s.id.to_owned(), s)).collect()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.strategies.is_some()
    }

    fn ensure_loaded(&mut self) -> SimResult<&HashMap<String, RaceStrategy>> {
        if self.strategies.is_none() {
            let loaded = match &self.source {
                StrategySource::File(path) => read_strategies(path)?,
                StrategySource::Memory => Vec::new(),
            };
            log::debug!("Loaded {} pit strategy templates", loaded.len());
            self.strategies = Some(loaded.into_iter().map(|s| (s.id.to_owned(), s)).collect());
        }

        match &self.strategies {
            Some(strategies) => Ok(strategies),
            None => Err(SimError::InvalidData(
                "strategy repository is empty after loading".to_owned(),
            )),
        }
    }

    pub fn get(&mut self, strategy_id: &str) -> SimResult<Option<&RaceStrategy>> {
        Ok(self.ensure_loaded()?.get(strategy_id))
    }

    /// Returns all templates sorted by id.
    pub fn all_strategies(&mut self) -> SimResult<Vec<&RaceStrategy>> {
        let mut all: Vec<&RaceStrategy> = self.ensure_loaded()?.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    /// Resolves the plan for a circuit. Returns Ok(None) if the circuit has no presets or the
    /// preset references an unknown template, in which case the generic pit logic is used.
    pub fn resolve_plan(
        &mut self,
        circuit: &CircuitPars,
        choice: StrategyChoice,
    ) -> SimResult<Option<StrategyPlan>> {
        let profile = match CircuitStrategyProfile::from_circuit(circuit) {
            Some(profile) => profile,
            None => return Ok(None),
        };
        let preset = profile.preset(choice).clone();

        match self.get(&preset.template)? {
            Some(strategy) => Ok(Some(StrategyPlan {
                strategy: strategy.clone(),
                preset,
            })),
            None => {
                log::warn!(
                    "Strategy template '{}' of circuit '{}' not found, using generic pit window",
                    preset.template,
                    circuit.id
                );
                Ok(None)
            }
        }
    }
}

fn read_strategies(path: &Path) -> SimResult<Vec<RaceStrategy>> {
    let data_load = |reason: String| SimError::DataLoad {
        path: path.display().to_string(),
        reason,
    };

    let fh = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| data_load(e.to_string()))?;
    serde_json::from_reader(&fh).map_err(|e| data_load(e.to_string()))
}
