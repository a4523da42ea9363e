//! Pit strategy engine: decides once per lap, independently for every running driver, whether
//! the car comes in, which compound it gets and how much time the stop costs.

use crate::core::car::TeamPars;
use crate::core::rng::RaceRng;
use crate::core::sim_constants::PitConsts;
use crate::core::state_handler::DriverRaceState;
use crate::core::strategy::{StintWindow, StrategyPlan};
use crate::core::tireset::{TyreModel, TyreState};
use crate::core::track::Track;

/// A completed pit stop.
#[derive(Debug, Clone, PartialEq)]
pub struct PitEvent {
    pub driver_name: String,
    pub from_position: u32,
    pub duration: f64,
    pub compound: String,
    pub mandatory: bool,
}

impl PitEvent {
    pub fn describe(&self) -> String {
        let text = format!(
            "{} pits from P{} ({:.1}s stop) onto {}",
            self.driver_name, self.from_position, self.duration, self.compound
        );
        if self.mandatory {
            format!("MANDATORY: {}", text)
        } else {
            text
        }
    }
}

/// Stationary time of a stop: max(min, base + (1 - pit_stop_speed) * factor + noise).
pub fn calc_pit_stop_time(team: &TeamPars, consts: &PitConsts, rng: &mut RaceRng) -> f64 {
    let t = consts.base_stop_time
        + (1.0 - team.pit_stop_speed) * consts.stop_speed_factor
        + rng.uniform(consts.stop_noise_min, consts.stop_noise_max);
    t.max(consts.min_stop_time)
}

/// Context shared by all decisions of one lap.
pub struct PitContext<'a> {
    pub lap: u32,
    pub track: &'a Track,
    pub plan: Option<&'a StrategyPlan>,
    pub tyre_model: &'a TyreModel,
    pub consts: &'a PitConsts,
    pub safety_car: bool,
}

/// Pit window of the driver's current stint. Without a (still running) plan the generic window
/// in the middle of the race is used and there is no target lap.
fn current_window(
    state: &DriverRaceState,
    plan: Option<&StrategyPlan>,
    ctx: &PitContext,
) -> (StintWindow, bool) {
    if let Some(plan) = plan {
        let sc_bias = if ctx.safety_car {
            plan.safety_car_lap_bias()
        } else {
            0
        };
        if let Some(window) = plan.stint_window(state.strategy_stint_index, ctx.track, sc_bias) {
            return (window, true);
        }
    }

    let (start, end) = ctx
        .track
        .lap_window(ctx.consts.generic_window_start, ctx.consts.generic_window_end);
    (
        StintWindow {
            start,
            target: start,
            end,
        },
        false,
    )
}

fn base_probability(lap: u32, window: &StintWindow, from_plan: bool, consts: &PitConsts) -> f64 {
    if from_plan {
        if lap >= window.end {
            consts.window_end_probability
        } else if lap >= window.target {
            consts.target_lap_probability
        } else if lap >= window.start {
            consts.window_start_probability
        } else {
            0.0
        }
    } else if lap >= window.start && lap <= window.end {
        let window_len = (window.end - window.start + 1) as f64;
        let prob = 100.0 / window_len;
        if window.end - lap < consts.late_window_laps {
            prob * 2.0
        } else {
            prob
        }
    } else {
        0.0
    }
}

/// Runs the pit decision for every running driver. Returns the stops made this lap in grid
/// order of `states`.
pub fn apply_pit_strategy(
    states: &mut [DriverRaceState],
    ctx: &PitContext,
    rng: &mut RaceRng,
) -> Vec<PitEvent> {
    let mut events = vec![];

    for state in states.iter_mut().filter(|s| s.is_running()) {
        let own_plan = state.strategy_plan.clone();
        let plan = own_plan.as_deref().or(ctx.plan);

        let forced = state.force_pit_on_lap == Some(ctx.lap);
        let wear_threshold = plan
            .and_then(|p| p.wear_threshold())
            .unwrap_or(ctx.consts.wear_threshold);
        let wear = state.tyre_state.wear();
        let critical = wear >= wear_threshold + ctx.consts.critical_wear_margin;

        let stops_left = state.stops_remaining(plan, ctx.consts.default_max_stops) > 0;
        let plan_done = state.plan_completed(plan);
        let (window, from_plan) = current_window(state, plan, ctx);
        // first lap past the window without a stop inside it
        let mandatory = !forced
            && stops_left
            && !plan_done
            && ctx.lap > window.end
            && state.last_pit_lap.map_or(true, |l| l < window.start);

        // deferral skips the draw but never a forced or mandatory stop
        if !forced && !mandatory && state.defer_pit_laps > 0 {
            state.defer_pit_laps -= 1;
            continue;
        }

        if !stops_left && !forced && !critical {
            continue;
        }

        let probability = if forced || mandatory || critical {
            100.0
        } else {
            let prob = base_probability(ctx.lap, &window, from_plan, ctx.consts);
            if wear >= wear_threshold {
                prob.max(ctx.consts.worn_tyre_probability)
            } else {
                prob
            }
        };

        let pits = if probability >= 100.0 {
            true
        } else if probability > 0.0 {
            rng.chance_pct(probability)
        } else {
            false
        };

        if pits {
            events.push(perform_pit_stop(state, plan, mandatory, ctx, rng));
        }
    }

    events
}

fn perform_pit_stop(
    state: &mut DriverRaceState,
    plan: Option<&StrategyPlan>,
    mandatory: bool,
    ctx: &PitContext,
    rng: &mut RaceRng,
) -> PitEvent {
    state.pit_stops += 1;
    state.force_pit_on_lap = None;
    state.defer_pit_laps = 0;

    let mut duration = calc_pit_stop_time(&state.team, ctx.consts, rng);
    if mandatory {
        duration += ctx.consts.mandatory_stop_penalty;
    }
    state.pit_time_loss += ctx.consts.pit_lane_loss + duration;

    let mut compound = state.tyre_state.compound().to_owned();
    if let Some(plan) = plan {
        if let Some(next) = plan.compound_for_stint(state.strategy_stint_index + 1) {
            state.strategy_stint_index += 1;
            compound = next.to_owned();
        }
    }
    if let Some(override_compound) = state.next_compound_override.take() {
        if ctx.tyre_model.is_known_compound(&override_compound) {
            compound = override_compound;
        } else {
            log::warn!(
                "Ignoring unknown compound override '{}' for {}",
                override_compound,
                state.driver_name
            );
        }
    }

    state.tyre_state = TyreState::new(&compound);
    state.last_pit_lap = Some(ctx.lap);

    PitEvent {
        driver_name: state.driver_name.to_owned(),
        from_position: state.current_position,
        duration,
        compound: state.tyre_state.compound().to_owned(),
        mandatory,
    }
}
