//! Performance scoring: converts raw driver and car attributes into qualifying times, race pace
//! scores and reliability outcomes. All functions are free of shared state; randomness is passed
//! in explicitly.

use crate::core::car::{TeamPars, DEFAULT_ATTRIBUTE};
use crate::core::driver::DriverPars;
use crate::core::rng::RaceRng;
use crate::core::sim_constants::{QualiConsts, RaceConsts};
use crate::core::track::Track;

pub const DNF_REASONS: [&str; 5] = [
    "Engine failure",
    "Gearbox issue",
    "Crash",
    "Suspension failure",
    "Brake failure",
];

const ROOKIE_DNF_MALUS: f64 = 3.0;
const ROOKIE_EXPERIENCE: f64 = 70.0;

/// Weighted sum of the nine car attributes, the weights sum up to 1.0.
pub fn team_overall_score(team: &TeamPars) -> f64 {
    team.aero * 0.20
        + team.power * 0.18
        + team.grip * 0.15
        + team.tyre_grip * 0.12
        + team.suspension * 0.10
        + team.brakes * 0.08
        + team.weight * 0.07
        + team.fuel_efficiency * 0.05
        + team.wear * 0.05
}

pub fn driver_overall_score(driver: &DriverPars) -> f64 {
    driver.pace * 0.40 + driver.qualifying * 0.30 + driver.racecraft * 0.20 + driver.experience * 0.10
}

/// Overtaking factor of a track: street circuits 0.3, high-speed circuits 1.2, everything else
/// (including tracks matching both) 0.7. Higher values mean easier overtaking.
pub fn track_overtaking_difficulty(track: &Track) -> f64 {
    match (track.traits.street, track.traits.power) {
        (true, false) => 0.3,
        (false, true) => 1.2,
        _ => 0.7,
    }
}

/// Adds half of the deviation of the attribute that matters most on this track type. Only the
/// first matching category applies: power, then grip (street), then aero.
pub fn track_specific_modifier(team_score: f64, team: &TeamPars, track: &Track) -> f64 {
    let traits = &track.traits;
    let delta = if traits.power {
        team.power - DEFAULT_ATTRIBUTE
    } else if traits.street {
        team.grip - DEFAULT_ATTRIBUTE
    } else if traits.aero {
        team.aero - DEFAULT_ATTRIBUTE
    } else {
        0.0
    };
    team_score + delta * 0.5
}

/// Qualifying noise amplitude, shrinking with experience.
pub fn qualifying_noise(driver: &DriverPars, consts: &QualiConsts) -> f64 {
    if driver.experience > 85.0 {
        consts.noise_veteran
    } else if driver.experience > 65.0 {
        consts.noise_experienced
    } else {
        consts.noise_rookie
    }
}

/// Returns the qualifying lap time in seconds, lower is better.
pub fn simulate_qualifying(
    driver: &DriverPars,
    team: &TeamPars,
    track: &Track,
    consts: &QualiConsts,
    rng: &mut RaceRng,
) -> f64 {
    let team_score = track_specific_modifier(team_overall_score(team), team, track);
    let noise = qualifying_noise(driver, consts);

    consts.base_time - driver.qualifying * consts.qualifying_factor - team_score * consts.team_factor
        + rng.uniform(-noise, noise)
}

/// Base chance in percent of a mechanical or driver failure when the check is triggered.
pub fn dnf_chance(driver: &DriverPars, team: &TeamPars) -> f64 {
    let mut chance = (1.0 - team.reliability) * 100.0;
    if driver.experience < ROOKIE_EXPERIENCE {
        chance += ROOKIE_DNF_MALUS;
    }
    chance
}

/// Rolls a DNF check, returns (is_dnf, reason).
pub fn simulate_dnf(
    driver: &DriverPars,
    team: &TeamPars,
    rng: &mut RaceRng,
) -> (bool, Option<String>) {
    if rng.percent() < dnf_chance(driver, team) {
        let reason = rng
            .choose(&DNF_REASONS)
            .copied()
            .unwrap_or(DNF_REASONS[0])
            .to_owned();
        (true, Some(reason))
    } else {
        (false, None)
    }
}

/// Fixed per-race performance score of a driver/car pairing, including a random form component.
pub fn race_performance(
    driver: &DriverPars,
    team: &TeamPars,
    consts: &RaceConsts,
    rng: &mut RaceRng,
) -> f64 {
    driver.pace * 0.28
        + driver.racecraft * 0.18
        + driver.experience * 0.12
        + team_overall_score(team) * 100.0 * 0.38
        + team.tyre_wear * 100.0 * 0.04
        + rng.uniform(-consts.performance_noise, consts.performance_noise)
}

/// Expected race lap time for a performance score, without noise or tyre effects.
pub fn base_lap_time(race_performance: f64, consts: &RaceConsts) -> f64 {
    consts.lap_time_base
        - (race_performance - consts.performance_reference) * consts.performance_lap_factor
}
