use crate::core::strategy::CircuitPresetsPars;
use serde::{Deserialize, Serialize};

/// * `id` - Circuit identifier, e.g. monza
/// * `name` - Display name
/// * `location` - City / country
/// * `length_km` - (km) Lap length
/// * `num_laps` - Race distance in laps
/// * `notes` - Free text description, used to classify the track type
/// * `weather_factor` - Optional factor (<= 1.0) for circuits with unsettled weather
/// * `tyre_stress_profile` - low, medium or high
/// * `strategy_presets` - Optional default and alternate pit strategy presets
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CircuitPars {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub length_km: f64,
    pub num_laps: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub weather_factor: Option<f64>,
    #[serde(default = "default_stress_profile")]
    pub tyre_stress_profile: String,
    #[serde(default)]
    pub strategy_presets: Option<CircuitPresetsPars>,
}

fn default_stress_profile() -> String {
    "medium".to_owned()
}

const STREET_KEYWORDS: [&str; 4] = ["street", "monaco", "tight", "city"];
const POWER_KEYWORDS: [&str; 6] = [
    "high-speed",
    "high speed",
    "power",
    "straight",
    "slipstream",
    "temple of speed",
];
const AERO_KEYWORDS: [&str; 4] = ["downforce", "aero", "technical", "sweeping"];

/// Keyword based classification of a circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackTraits {
    pub street: bool,
    pub power: bool,
    pub aero: bool,
}

impl TrackTraits {
    pub fn classify(circuit: &CircuitPars) -> TrackTraits {
        let text = format!("{} {}", circuit.name, circuit.notes).to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        TrackTraits {
            street: has_any(&STREET_KEYWORDS),
            power: has_any(&POWER_KEYWORDS),
            aero: has_any(&AERO_KEYWORDS),
        }
    }
}

/// Track contains the circuit data together with the values derived from it once per race.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub location: String,
    pub length_km: f64,
    pub num_laps: u32,
    pub notes: String,
    pub weather_factor: f64,
    pub tyre_stress_profile: String,
    pub traits: TrackTraits,
}

impl Track {
    pub fn new(circuit: &CircuitPars) -> Track {
        Track {
            id: circuit.id.to_owned(),
            name: circuit.name.to_owned(),
            location: circuit.location.to_owned(),
            length_km: circuit.length_km,
            num_laps: circuit.num_laps,
            notes: circuit.notes.to_owned(),
            weather_factor: circuit.weather_factor.unwrap_or(1.0),
            tyre_stress_profile: circuit.tyre_stress_profile.to_owned(),
            traits: TrackTraits::classify(circuit),
        }
    }

    /// Multiplier for the lap time noise. Circuits with a weather factor below 1.0 produce a
    /// wider spread of lap times.
    pub fn lap_noise_multiplier(&self) -> f64 {
        (2.0 - self.weather_factor).clamp(1.0, 2.0)
    }

    /// Returns the lap numbers of the window [start_frac, end_frac] of the race distance.
    /// start is rounded up, end rounded down, and end is never before start.
    pub fn lap_window(&self, start_frac: f64, end_frac: f64) -> (u32, u32) {
        let laps = self.num_laps as f64;
        let start = ((laps * start_frac).ceil() as u32).max(1);
        let end = ((laps * end_frac).floor() as u32).max(start);
        (start, end)
    }
}
