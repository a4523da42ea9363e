use serde::{Deserialize, Serialize};

/// Tunable constants of the tyre model.
/// * `pace_penalty_scale` - Scale applied to the interpolated degradation penalty
/// * `fresh_tyre_window` - Wear range (0..window) over which the fresh tyre bonus fades to zero
/// * `empty_curve_penalty` - (s) Penalty at full wear for compounds without degradation curve
/// * `stress_low`, `stress_medium`, `stress_high` - Wear multipliers per tyre stress profile
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TyreConsts {
    pub pace_penalty_scale: f64,
    pub fresh_tyre_window: f64,
    pub empty_curve_penalty: f64,
    pub stress_low: f64,
    pub stress_medium: f64,
    pub stress_high: f64,
}

impl Default for TyreConsts {
    fn default() -> Self {
        TyreConsts {
            pace_penalty_scale: 0.6,
            fresh_tyre_window: 0.2,
            empty_curve_penalty: 1.0,
            stress_low: 0.9,
            stress_medium: 1.0,
            stress_high: 1.15,
        }
    }
}

/// Tunable constants of the pit strategy engine. Probabilities are given in percent.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PitConsts {
    pub pit_lane_loss: f64,
    pub base_stop_time: f64,
    pub stop_speed_factor: f64,
    pub stop_noise_min: f64,
    pub stop_noise_max: f64,
    pub min_stop_time: f64,
    pub mandatory_stop_penalty: f64,
    pub wear_threshold: f64,
    pub critical_wear_margin: f64,
    pub worn_tyre_probability: f64,
    pub default_max_stops: u32,
    pub generic_window_start: f64,
    pub generic_window_end: f64,
    pub late_window_laps: u32,
    pub window_start_probability: f64,
    pub target_lap_probability: f64,
    pub window_end_probability: f64,
}

impl Default for PitConsts {
    fn default() -> Self {
        PitConsts {
            pit_lane_loss: 20.0,
            base_stop_time: 2.0,
            stop_speed_factor: 5.0,
            stop_noise_min: -0.2,
            stop_noise_max: 0.4,
            min_stop_time: 1.8,
            mandatory_stop_penalty: 0.5,
            wear_threshold: 0.78,
            critical_wear_margin: 0.05,
            worn_tyre_probability: 65.0,
            default_max_stops: 1,
            generic_window_start: 0.25,
            generic_window_end: 0.75,
            late_window_laps: 5,
            window_start_probability: 35.0,
            target_lap_probability: 60.0,
            window_end_probability: 85.0,
        }
    }
}

/// Tunable constants of qualifying. Noise is uniform in +/- the band of the driver's experience.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QualiConsts {
    pub base_time: f64,
    pub qualifying_factor: f64,
    pub team_factor: f64,
    pub noise_veteran: f64,
    pub noise_experienced: f64,
    pub noise_rookie: f64,
}

impl Default for QualiConsts {
    fn default() -> Self {
        QualiConsts {
            base_time: 90.0,
            qualifying_factor: 0.12,
            team_factor: 13.0,
            noise_veteran: 0.15,
            noise_experienced: 0.30,
            noise_rookie: 0.45,
        }
    }
}

/// Tunable constants of the lap loop and the finishing classification. Probabilities are given
/// in percent, times in seconds.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RaceConsts {
    pub lap_time_base: f64,
    pub performance_reference: f64,
    pub performance_lap_factor: f64,
    pub lap_noise: f64,
    pub first_lap_time: f64,
    pub first_lap_grid_gap: f64,
    pub performance_noise: f64,
    pub dnf_lap_gate: f64,
    pub safety_car_chance: f64,
    pub safety_car_band: [f64; 2],
    pub safety_car_overtake_factor: f64,
    pub safety_car_laps: u32,
    pub overtake_chance: f64,
    pub overtake_performance_gap: f64,
    pub overtake_max_gap: f64,
    pub overtake_margin: f64,
    pub incident_chance: f64,
    pub incident_penalty: [f64; 2],
    pub winner_time: f64,
    pub gap_p2_small: [f64; 2],
    pub gap_p2_large: [f64; 2],
    pub gap_p3: [f64; 2],
    pub gap_p4_6: [f64; 2],
    pub gap_p7_10: [f64; 2],
    pub gap_p11_plus: [f64; 2],
    pub lapped_from_position: u32,
    pub lapped_chance: f64,
    pub lapped_penalty: [f64; 2],
}

impl Default for RaceConsts {
    fn default() -> Self {
        RaceConsts {
            lap_time_base: 95.0,
            performance_reference: 85.0,
            performance_lap_factor: 0.35,
            lap_noise: 0.15,
            first_lap_time: 98.0,
            first_lap_grid_gap: 0.25,
            performance_noise: 3.0,
            dnf_lap_gate: 1.5,
            safety_car_chance: 30.0,
            safety_car_band: [0.3, 0.7],
            safety_car_overtake_factor: 0.5,
            safety_car_laps: 3,
            overtake_chance: 15.0,
            overtake_performance_gap: 5.0,
            overtake_max_gap: 3.0,
            overtake_margin: 0.2,
            incident_chance: 8.0,
            incident_penalty: [2.0, 8.0],
            winner_time: 5400.0,
            gap_p2_small: [0.5, 3.0],
            gap_p2_large: [3.0, 8.0],
            gap_p3: [1.0, 5.0],
            gap_p4_6: [2.0, 8.0],
            gap_p7_10: [3.0, 12.0],
            gap_p11_plus: [5.0, 18.0],
            lapped_from_position: 13,
            lapped_chance: 20.0,
            lapped_penalty: [60.0, 95.0],
        }
    }
}

/// SimConstants bundles all tunable constants of the simulation. Every field has a default, so a
/// constants file only needs to list the values it wants to change.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SimConstants {
    pub tyre: TyreConsts,
    pub pit: PitConsts,
    pub quali: QualiConsts,
    pub race: RaceConsts,
}
