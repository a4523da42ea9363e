use crate::core::rng::RaceRng;
use crate::core::sim_constants::TyreConsts;
use crate::error::{SimError, SimResult};
use helpers::general::lin_interp_extrap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_COMPOUND: &str = "medium";

/// One point of a degradation curve.
/// * `wear` - Tyre wear in [0, 1]
/// * `pace_penalty` - (s) Lap time loss at that wear level (before scaling)
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct DegradationPoint {
    pub wear: f64,
    pub pace_penalty: f64,
}

/// * `name` - Compound name (soft, medium, hard)
/// * `base_wear_per_lap` - Wear added per lap on a medium stress circuit
/// * `warmup_laps` - Number of laps on a new set during which the warmup penalty applies
/// * `warmup_penalty` - (s) Flat lap time loss while the tyres are warming up
/// * `degradation_curve` - Penalty points sorted ascending by wear
/// * `puncture_risk_wear` - Wear from which on punctures become possible
/// * `puncture_probability` - Probability in [0, 1] of a puncture per lap above that wear
/// * `fresh_bonus` - (s) Peak lap time gain on brand new tyres, fades out over the fresh window
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TyreCompound {
    #[serde(rename = "compound")]
    pub name: String,
    #[serde(default = "default_base_wear")]
    pub base_wear_per_lap: f64,
    #[serde(default = "default_warmup_laps")]
    pub warmup_laps: u32,
    #[serde(default = "default_warmup_penalty")]
    pub warmup_penalty: f64,
    #[serde(default)]
    pub degradation_curve: Vec<DegradationPoint>,
    #[serde(default = "default_puncture_risk_wear")]
    pub puncture_risk_wear: f64,
    #[serde(default)]
    pub puncture_probability: f64,
    #[serde(default)]
    pub fresh_bonus: f64,
}

fn default_base_wear() -> f64 {
    0.03
}

fn default_warmup_laps() -> u32 {
    1
}

fn default_warmup_penalty() -> f64 {
    0.4
}

fn default_puncture_risk_wear() -> f64 {
    1.0
}

impl TyreCompound {
    /// Checks the compound definition. Malformed compounds are rejected at load time instead of
    /// producing wrong penalties in the middle of a race.
    pub fn validate(&self) -> SimResult<()> {
        if self.name.trim().is_empty() {
            return Err(SimError::InvalidData("tyre compound without name".to_owned()));
        }
        if self
            .degradation_curve
            .windows(2)
            .any(|w| w[1].wear < w[0].wear)
        {
            return Err(SimError::InvalidData(format!(
                "degradation curve of compound '{}' is not sorted ascending by wear",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.puncture_probability) {
            return Err(SimError::InvalidData(format!(
                "puncture probability of compound '{}' must be in [0, 1]",
                self.name
            )));
        }
        if self.base_wear_per_lap < 0.0 {
            return Err(SimError::InvalidData(format!(
                "negative base wear for compound '{}'",
                self.name
            )));
        }
        Ok(())
    }

    /// Returns the unscaled degradation penalty at the given wear level. The curve is
    /// interpolated linearly and the last segment's slope is continued beyond the final point.
    pub fn degradation_penalty(&self, wear: f64, empty_curve_penalty: f64) -> f64 {
        let xp: Vec<f64> = self.degradation_curve.iter().map(|p| p.wear).collect();
        let fp: Vec<f64> = self
            .degradation_curve
            .iter()
            .map(|p| p.pace_penalty)
            .collect();

        // without curve the penalty simply grows with wear
        lin_interp_extrap(wear, &xp, &fp).unwrap_or(wear * empty_curve_penalty)
    }
}

/// TyreState tracks the condition of the set a driver is currently running on. Wear and lap
/// counter only change through `add_wear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TyreState {
    compound: String,
    wear: f64,
    laps_on_tyre: u32,
    performance_modifier: f64,
}

impl TyreState {
    pub fn new(compound: &str) -> TyreState {
        TyreState {
            compound: compound.to_lowercase(),
            wear: 0.0,
            laps_on_tyre: 0,
            performance_modifier: 0.0,
        }
    }

    /// Creates a used set, e.g. for tests or for cars starting on scrubbed tyres.
    pub fn with_wear(compound: &str, wear: f64, laps_on_tyre: u32) -> TyreState {
        TyreState {
            wear: wear.clamp(0.0, 1.0),
            laps_on_tyre,
            ..TyreState::new(compound)
        }
    }

    pub fn compound(&self) -> &str {
        &self.compound
    }

    pub fn wear(&self) -> f64 {
        self.wear
    }

    pub fn laps_on_tyre(&self) -> u32 {
        self.laps_on_tyre
    }

    /// Last computed lap time penalty (cached for display).
    pub fn performance_modifier(&self) -> f64 {
        self.performance_modifier
    }

    /// add_wear increments the wear (clamped to [0, 1]) and the lap counter.
    pub fn add_wear(&mut self, wear_delta: f64) {
        self.wear = (self.wear + wear_delta).clamp(0.0, 1.0);
        self.laps_on_tyre += 1;
    }
}

/// TyreModel holds the compound table and computes wear, pace penalties and punctures.
#[derive(Debug, Clone)]
pub struct TyreModel {
    compounds: HashMap<String, TyreCompound>,
    consts: TyreConsts,
}

impl TyreModel {
    pub fn new(compounds: Vec<TyreCompound>, consts: TyreConsts) -> SimResult<TyreModel> {
        let mut table = HashMap::with_capacity(compounds.len());

        for compound in compounds {
            compound.validate()?;
            table.insert(compound.name.to_lowercase(), compound);
        }

        Ok(TyreModel {
            compounds: table,
            consts,
        })
    }

    pub fn consts(&self) -> &TyreConsts {
        &self.consts
    }

    /// Case-insensitive compound lookup.
    pub fn get_compound(&self, name: &str) -> Option<&TyreCompound> {
        self.compounds.get(&name.to_lowercase())
    }

    pub fn is_known_compound(&self, name: &str) -> bool {
        self.get_compound(name).is_some()
    }

    /// Returns the known compound names in alphabetical order.
    pub fn compound_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.compounds.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn stress_multiplier(&self, stress_profile: &str) -> f64 {
        match stress_profile.to_lowercase().as_str() {
            "low" => self.consts.stress_low,
            "medium" => self.consts.stress_medium,
            "high" => self.consts.stress_high,
            _ => 1.0,
        }
    }

    /// update_wear_and_penalty applies one lap of wear and returns (wear_applied,
    /// lap_time_penalty). Unknown compounds are treated as a no-op tyre.
    pub fn update_wear_and_penalty(
        &self,
        tyre_state: &mut TyreState,
        stress_profile: &str,
    ) -> (f64, f64) {
        let compound = match self.get_compound(&tyre_state.compound) {
            Some(compound) => compound,
            None => return (0.0, 0.0),
        };

        let wear_delta = compound.base_wear_per_lap * self.stress_multiplier(stress_profile);
        tyre_state.add_wear(wear_delta);

        let penalty = self.calc_pace_penalty(compound, tyre_state.wear, tyre_state.laps_on_tyre);
        tyre_state.performance_modifier = penalty;

        (wear_delta, penalty)
    }

    /// Returns the lap time penalty of the given state without applying any wear.
    pub fn pace_penalty(&self, tyre_state: &TyreState) -> f64 {
        match self.get_compound(&tyre_state.compound) {
            Some(compound) => {
                self.calc_pace_penalty(compound, tyre_state.wear, tyre_state.laps_on_tyre)
            }
            None => 0.0,
        }
    }

    /// penalty = warmup + max(0, scaled degradation - fresh tyre bonus)
    ///
    /// The fresh tyre bonus fades linearly from `fresh_bonus` at zero wear to nothing at the end
    /// of the fresh window, so it can cancel degradation but never produce a negative penalty.
    fn calc_pace_penalty(&self, compound: &TyreCompound, wear: f64, laps_on_tyre: u32) -> f64 {
        let warmup = if laps_on_tyre <= compound.warmup_laps {
            compound.warmup_penalty
        } else {
            0.0
        };

        let degradation = compound.degradation_penalty(wear, self.consts.empty_curve_penalty)
            * self.consts.pace_penalty_scale;

        let window = self.consts.fresh_tyre_window;
        let fresh = if window > 0.0 && wear < window {
            compound.fresh_bonus * (1.0 - wear / window)
        } else {
            0.0
        };

        warmup + (degradation - fresh).max(0.0)
    }

    /// Returns true if the tyre punctures on this lap. Below the compound's risk wear no random
    /// number is drawn at all.
    pub fn check_random_puncture(&self, tyre_state: &TyreState, rng: &mut RaceRng) -> bool {
        let compound = match self.get_compound(&tyre_state.compound) {
            Some(compound) => compound,
            None => return false,
        };

        if tyre_state.wear < compound.puncture_risk_wear {
            return false;
        }

        rng.percent() < compound.puncture_probability * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(wear: f64, pace_penalty: f64) -> DegradationPoint {
        DegradationPoint { wear, pace_penalty }
    }

    fn soft() -> TyreCompound {
        TyreCompound {
            name: "Soft".to_owned(),
            base_wear_per_lap: 0.05,
            warmup_laps: 1,
            warmup_penalty: 0.3,
            degradation_curve: vec![point(0.0, 0.0), point(0.4, 0.5), point(0.8, 2.0)],
            puncture_risk_wear: 0.95,
            puncture_probability: 0.5,
            fresh_bonus: 0.4,
        }
    }

    fn model() -> TyreModel {
        TyreModel::new(vec![soft()], TyreConsts::default()).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let model = model();
        assert!(model.get_compound("SOFT").is_some());
        assert!(model.get_compound("soft").is_some());
        assert!(model.get_compound("hard").is_none());
    }

    #[test]
    fn stress_profile_scales_wear() {
        let model = model();
        let mut low = TyreState::new("soft");
        let mut high = TyreState::new("soft");
        let mut unknown = TyreState::new("soft");
        let (w_low, _) = model.update_wear_and_penalty(&mut low, "low");
        let (w_high, _) = model.update_wear_and_penalty(&mut high, "HIGH");
        let (w_unknown, _) = model.update_wear_and_penalty(&mut unknown, "extreme");
        assert_abs_diff_eq!(w_low, 0.045, epsilon = 1e-12);
        assert_abs_diff_eq!(w_high, 0.0575, epsilon = 1e-12);
        assert_abs_diff_eq!(w_unknown, 0.05, epsilon = 1e-12);
        assert_eq!(high.laps_on_tyre(), 1);
    }

    #[test]
    fn wear_is_monotonic_and_saturates() {
        let model = model();
        let mut state = TyreState::new("soft");
        let mut prev = 0.0;
        for _ in 0..100 {
            model.update_wear_and_penalty(&mut state, "high");
            assert!(state.wear() >= prev);
            assert!(state.wear() <= 1.0);
            prev = state.wear();
        }
        assert_abs_diff_eq!(state.wear(), 1.0);
        assert_eq!(state.laps_on_tyre(), 100);
    }

    #[test]
    fn warmup_penalty_applies_on_first_lap_only() {
        let model = model();
        let mut state = TyreState::new("soft");
        let (_, first) = model.update_wear_and_penalty(&mut state, "medium");
        // wear 0.05: degradation 0.0625 * 0.6 minus a fresh bonus of 0.3 -> floored at warmup
        assert_abs_diff_eq!(first, 0.3, epsilon = 1e-12);
        let (_, second) = model.update_wear_and_penalty(&mut state, "medium");
        assert!(second < first);
        assert_abs_diff_eq!(state.performance_modifier(), second);
    }

    #[test]
    fn penalty_is_monotonic_beyond_fresh_window() {
        let model = model();
        let mut prev = 0.0;
        for step in 0..=40 {
            let wear = 0.2 + step as f64 * 0.02;
            let state = TyreState::with_wear("soft", wear, 10);
            let penalty = model.pace_penalty(&state);
            assert!(penalty >= prev, "penalty dropped at wear {}", wear);
            prev = penalty;
        }
    }

    #[test]
    fn curve_slope_is_extrapolated() {
        let compound = soft();
        // last segment: 1.5s per 0.4 wear
        assert_abs_diff_eq!(compound.degradation_penalty(1.0, 1.0), 2.75, epsilon = 1e-9);
        assert_abs_diff_eq!(compound.degradation_penalty(0.2, 1.0), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn empty_and_single_point_curves() {
        let mut compound = soft();
        compound.degradation_curve.clear();
        assert_abs_diff_eq!(compound.degradation_penalty(0.5, 1.2), 0.6, epsilon = 1e-12);

        compound.degradation_curve = vec![point(0.5, 0.8)];
        assert_abs_diff_eq!(compound.degradation_penalty(0.1, 1.2), 0.8);
        assert_abs_diff_eq!(compound.degradation_penalty(0.9, 1.2), 0.8);
    }

    #[test]
    fn unsorted_curve_is_rejected() {
        let mut compound = soft();
        compound.degradation_curve = vec![point(0.5, 1.0), point(0.2, 0.5)];
        let res = TyreModel::new(vec![compound], TyreConsts::default());
        assert!(matches!(res, Err(SimError::InvalidData(_))));
    }

    #[test]
    fn unknown_compound_is_a_noop() {
        let model = model();
        let mut state = TyreState::with_wear("intermediate", 0.99, 30);
        let mut rng = RaceRng::new(Some(3));
        assert_eq!(model.update_wear_and_penalty(&mut state, "high"), (0.0, 0.0));
        assert_abs_diff_eq!(state.wear(), 0.99);
        assert_eq!(state.laps_on_tyre(), 30);
        assert!(!model.check_random_puncture(&state, &mut rng));
    }

    #[test]
    fn no_puncture_below_risk_wear_and_no_draw_consumed() {
        let model = model();
        let state = TyreState::with_wear("soft", 0.80, 16);
        let mut rng = RaceRng::new(Some(11));
        let mut reference = rng.clone();
        for _ in 0..500 {
            assert!(!model.check_random_puncture(&state, &mut rng));
        }
        assert_eq!(rng.percent(), reference.percent());
    }

    #[test]
    fn punctures_happen_above_risk_wear() {
        let model = model();
        let state = TyreState::with_wear("soft", 0.97, 20);
        let mut rng = RaceRng::new(Some(5));
        let punctures = (0..1000)
            .filter(|_| model.check_random_puncture(&state, &mut rng))
            .count();
        assert!(punctures > 350 && punctures < 650);
    }
}
