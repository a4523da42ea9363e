use crate::core::car::TeamPars;
use crate::core::driver::DriverPars;
use crate::core::performance::{
    base_lap_time, race_performance, simulate_dnf, simulate_qualifying,
    track_overtaking_difficulty, DNF_REASONS,
};
use crate::core::pit_strategy::{apply_pit_strategy, PitContext};
use crate::core::rng::RaceRng;
use crate::core::sim_constants::SimConstants;
use crate::core::state_handler::{DriverRaceState, DriverStatus};
use crate::core::strategy::StrategyPlan;
use crate::core::tireset::{TyreModel, TyreState, DEFAULT_COMPOUND};
use crate::core::track::Track;
use crate::error::{SimError, SimResult};
use crate::interfaces::lap_interface::{LapReport, PitCommand, StandingEntry};
use crate::post::race_result::{RaceResultRecord, RaceResults};
use helpers::general::{argsort, SortOrder};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

const MAX_DEFER_LAPS: u32 = 5;

/// A driver taking part in a race together with the car it drives.
#[derive(Debug, Clone)]
pub struct RaceEntry {
    pub driver: DriverPars,
    pub team: TeamPars,
    pub is_controlled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    Green,
    SafetyCar,
    Chequered,
}

impl Default for FlagState {
    fn default() -> Self {
        FlagState::Green
    }
}

/// Race runs qualifying on creation and is then advanced lap by lap. Positions are never stored
/// authoritatively, they are recomputed from the total race times after every lap.
#[derive(Debug)]
pub struct Race {
    pub track: Track,
    consts: SimConstants,
    tyre_model: TyreModel,
    plan: Option<Rc<StrategyPlan>>,
    rng: RaceRng,
    states: Vec<DriverRaceState>,
    pub cur_lap: u32,
    pub flag_state: FlagState,
    safety_car_lap: Option<u32>,
    overtaking_difficulty: f64,
    fast_forwarded: bool,
}

impl Race {
    pub fn new(
        track: Track,
        entries: &[RaceEntry],
        plan: Option<StrategyPlan>,
        tyre_model: TyreModel,
        consts: SimConstants,
        seed: Option<u64>,
    ) -> Race {
        let mut rng = RaceRng::new(seed);
        let plan = plan.map(Rc::new);

        // qualifying, ties keep the entry order
        let quali_times: Vec<f64> = entries
            .iter()
            .map(|e| simulate_qualifying(&e.driver, &e.team, &track, &consts.quali, &mut rng))
            .collect();
        let grid_order = argsort(&quali_times, SortOrder::Ascending);

        let starting_compound = plan
            .as_ref()
            .and_then(|p| p.starting_compound())
            .unwrap_or(DEFAULT_COMPOUND)
            .to_owned();

        let mut states = Vec::with_capacity(entries.len());
        for (grid_idx, &entry_idx) in grid_order.iter().enumerate() {
            let entry = &entries[entry_idx];
            let performance = race_performance(&entry.driver, &entry.team, &consts.race, &mut rng);

            states.push(DriverRaceState::new(
                Rc::new(entry.driver.clone()),
                Rc::new(entry.team.clone()),
                quali_times[entry_idx],
                grid_idx as u32 + 1,
                performance,
                plan.clone(),
                TyreState::new(&starting_compound),
                entry.is_controlled,
            ));
        }

        let safety_car_lap = if rng.chance_pct(consts.race.safety_car_chance) {
            let band = consts.race.safety_car_band;
            let (first, last) = track.lap_window(band[0], band[1]);
            Some(rng.int_inclusive(first, last))
        } else {
            None
        };

        if let Some(pole) = states.first() {
            log::info!(
                "Qualifying at {}: {} on pole with {:.3}s",
                track.name,
                pole.driver_name,
                pole.qualifying_time
            );
        }

        Race {
            overtaking_difficulty: track_overtaking_difficulty(&track),
            track,
            consts,
            tyre_model,
            plan,
            rng,
            states,
            cur_lap: 0,
            flag_state: FlagState::Green,
            safety_car_lap,
            fast_forwarded: false,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHODS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// Simulates the next lap. Returns None once all laps are done or the race was fast-forwarded.
    pub fn advance_lap(&mut self) -> Option<LapReport> {
        if self.is_finished() {
            return None;
        }
        self.cur_lap += 1;
        let lap = self.cur_lap;

        let mut events = vec![];
        // positions already stated by overtake events, and drivers whose drop the pit explains
        let mut claimed: HashMap<String, u32> = HashMap::new();
        let mut pitted: HashSet<String> = HashSet::new();
        let prev_positions: Vec<u32> = self.states.iter().map(|s| s.current_position).collect();

        self.handle_safety_car(lap, &mut events);
        self.handle_retirements(lap, &mut events);
        self.calc_lap_times(lap);
        self.handle_overtakes(&mut events, &mut claimed);
        self.handle_incidents(lap, &mut events);

        let pit_events = {
            let ctx = PitContext {
                lap,
                track: &self.track,
                plan: self.plan.as_deref(),
                tyre_model: &self.tyre_model,
                consts: &self.consts.pit,
                safety_car: self.flag_state == FlagState::SafetyCar,
            };
            apply_pit_strategy(&mut self.states, &ctx, &mut self.rng)
        };
        for pit_event in pit_events {
            events.push(pit_event.describe());
            pitted.insert(pit_event.driver_name);
        }

        self.update_positions();

        // every position change not yet stated gets exactly one event
        for (state, &prev) in self.states.iter().zip(prev_positions.iter()) {
            if !state.is_running() {
                continue;
            }
            let reference = claimed.get(&state.driver_name).copied().unwrap_or(prev);
            let cur = state.current_position;
            if cur < reference {
                events.push(format!("{} moves up to P{}", state.driver_name, cur));
            } else if cur > reference && !pitted.contains(&state.driver_name) {
                events.push(format!("{} drops to P{}", state.driver_name, cur));
            }
        }

        if lap >= self.track.num_laps {
            self.flag_state = FlagState::Chequered;
        }

        Some(self.lap_report(events))
    }

    /// Skips the remaining laps. The finishing order then follows the race performance ranking
    /// instead of the race times. Cannot be undone.
    pub fn fast_forward(&mut self) {
        if !self.fast_forwarded {
            log::info!("Fast-forwarding from lap {}", self.cur_lap);
            self.fast_forwarded = true;
        }
    }

    /// Applies a player intervention. Rejected commands leave the race untouched.
    pub fn apply_command(&mut self, driver_name: &str, command: PitCommand) -> SimResult<()> {
        if self.is_finished() {
            return Err(SimError::InvalidCommand("the race is already over".to_owned()));
        }
        let next_lap = self.cur_lap + 1;
        let tyre_model = &self.tyre_model;

        let state = self
            .states
            .iter_mut()
            .find(|s| s.driver_name == driver_name)
            .ok_or_else(|| SimError::InvalidCommand(format!("unknown driver {}", driver_name)))?;

        if !state.is_controlled {
            return Err(SimError::InvalidCommand(format!(
                "{} is not controlled by the player",
                driver_name
            )));
        }
        if !state.is_running() {
            return Err(SimError::InvalidCommand(format!(
                "{} is no longer running",
                driver_name
            )));
        }

        match command {
            PitCommand::ForcePit => state.force_pit_on_lap = Some(next_lap),
            PitCommand::DeferPit(laps) => {
                if !(1..=MAX_DEFER_LAPS).contains(&laps) {
                    return Err(SimError::InvalidCommand(format!(
                        "pit stops can be deferred by 1 to {} laps, got {}",
                        MAX_DEFER_LAPS, laps
                    )));
                }
                state.defer_pit_laps = laps;
            }
            PitCommand::NextCompound(compound) => {
                if !tyre_model.is_known_compound(&compound) {
                    return Err(SimError::InvalidCommand(format!(
                        "unknown compound {}, available: {}",
                        compound,
                        tyre_model.compound_names().join(", ")
                    )));
                }
                state.next_compound_override = Some(compound.to_lowercase());
            }
        }
        Ok(())
    }

    /// Consumes the race and produces the final classification.
    pub fn finish(mut self) -> RaceResults {
        let mut order = self.running_order();
        if self.fast_forwarded {
            let perfs: Vec<f64> = order.iter().map(|&i| self.states[i].race_performance).collect();
            order = argsort(&perfs, SortOrder::Descending)
                .into_iter()
                .map(|k| order[k])
                .collect();
        }

        let finish_times = self.calc_finishing_times(order.len());
        let mut records = Vec::with_capacity(self.states.len());

        for (k, &idx) in order.iter().enumerate() {
            let state = &mut self.states[idx];
            let position = k as u32 + 1;
            state.finish(position);
            records.push(result_record(state, Some(position), finish_times[k]));
        }
        for idx in self.retired_order() {
            let state = &self.states[idx];
            records.push(result_record(state, None, state.total_race_time));
        }

        if let Some(winner) = records.first().filter(|r| r.position.is_some()) {
            log::info!("{} wins at {}", winner.driver_name, self.track.name);
        }

        RaceResults {
            circuit_id: self.track.id.to_owned(),
            circuit_name: self.track.name.to_owned(),
            location: self.track.location.to_owned(),
            num_laps: self.track.num_laps,
            safety_car_lap: self.safety_car_lap.filter(|&l| l <= self.cur_lap),
            fast_forwarded: self.fast_forwarded,
            records,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // LAP PHASES ----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn handle_safety_car(&mut self, lap: u32, events: &mut Vec<String>) {
        match (self.flag_state, self.safety_car_lap) {
            (FlagState::Green, Some(sc_lap)) if sc_lap == lap => {
                self.flag_state = FlagState::SafetyCar;
                self.overtaking_difficulty *= self.consts.race.safety_car_overtake_factor;
                events.push(format!("SAFETY CAR deployed on lap {}", lap));
                log::info!("Safety car deployed on lap {}", lap);
            }
            (FlagState::SafetyCar, Some(sc_lap)) if lap >= sc_lap + self.consts.race.safety_car_laps => {
                self.flag_state = FlagState::Green;
                events.push("Safety car in, racing resumes".to_owned());
            }
            _ => {}
        }
    }

    fn handle_retirements(&mut self, lap: u32, events: &mut Vec<String>) {
        for state in self.states.iter_mut().filter(|s| s.is_running()) {
            let mut reason = None;

            if self.rng.chance_pct(self.consts.race.dnf_lap_gate) {
                let (is_dnf, dnf_reason) = simulate_dnf(&state.driver, &state.team, &mut self.rng);
                if is_dnf {
                    reason = dnf_reason.or_else(|| Some(DNF_REASONS[0].to_owned()));
                }
            }
            if reason.is_none()
                && self
                    .tyre_model
                    .check_random_puncture(&state.tyre_state, &mut self.rng)
            {
                reason = Some("Puncture".to_owned());
            }

            if let Some(reason) = reason {
                let position = state.current_position;
                state.update_total_race_time();
                if state.retire(&reason, lap) {
                    log::debug!("{} out on lap {}: {}", state.driver_name, lap, reason);
                    events.push(format!(
                        "{} retires from P{}: {}",
                        state.driver_name, position, reason
                    ));
                }
            }
        }
    }

    fn calc_lap_times(&mut self, lap: u32) {
        let consts = &self.consts.race;
        let noise = consts.lap_noise * self.track.lap_noise_multiplier();

        for state in self.states.iter_mut().filter(|s| s.is_running()) {
            let (_, tyre_penalty) = self
                .tyre_model
                .update_wear_and_penalty(&mut state.tyre_state, &self.track.tyre_stress_profile);

            // lap 1 only spreads the field out in grid order
            let lap_time = if lap == 1 {
                consts.first_lap_time + (state.grid_position - 1) as f64 * consts.first_lap_grid_gap
            } else {
                base_lap_time(state.race_performance, consts)
                    + self.rng.uniform(-noise, noise)
                    + tyre_penalty
            };
            state.add_lap_time(lap_time);
        }
    }

    /// At most one overtake per lap. The pass is executed by moving time from the attacker to
    /// the defender, the new order follows from the re-sort.
    fn handle_overtakes(&mut self, events: &mut Vec<String>, claimed: &mut HashMap<String, u32>) {
        let consts = &self.consts.race;
        if !self
            .rng
            .chance_pct(consts.overtake_chance * self.overtaking_difficulty)
        {
            return;
        }

        let order = self.running_order();
        let candidates: Vec<(usize, usize, f64)> = order
            .windows(2)
            .filter_map(|pair| {
                let ahead = &self.states[pair[0]];
                let behind = &self.states[pair[1]];
                let gap = race_time(behind) - race_time(ahead);
                if behind.race_performance - ahead.race_performance > consts.overtake_performance_gap
                    && gap < consts.overtake_max_gap
                {
                    Some((pair[0], pair[1], gap))
                } else {
                    None
                }
            })
            .collect();

        let (ahead, behind, gap) = match self.rng.choose(&candidates) {
            Some(&candidate) => candidate,
            None => return,
        };

        let shift = gap.max(0.0) / 2.0 + consts.overtake_margin;
        self.states[behind].cumulative_time -= shift;
        self.states[ahead].cumulative_time += shift;

        let position = order.iter().position(|&i| i == ahead).unwrap_or(0) as u32 + 1;
        events.push(format!(
            "{} overtakes {} for P{}",
            self.states[behind].driver_name, self.states[ahead].driver_name, position
        ));
        claimed.insert(self.states[behind].driver_name.to_owned(), position);
        claimed.insert(self.states[ahead].driver_name.to_owned(), position + 1);
    }

    fn handle_incidents(&mut self, lap: u32, events: &mut Vec<String>) {
        let consts = &self.consts.race;
        if !self.rng.chance_pct(consts.incident_chance) {
            return;
        }

        let running: Vec<usize> = (0..self.states.len())
            .filter(|&i| self.states[i].is_running())
            .collect();
        if running.is_empty() {
            return;
        }

        let idx = running[self.rng.index(running.len())];
        let penalty = self
            .rng
            .uniform(consts.incident_penalty[0], consts.incident_penalty[1]);

        let state = &mut self.states[idx];
        state.cumulative_time += penalty;
        state.incident = Some(format!("Incident on lap {}", lap));
        events.push(format!(
            "{} has an incident and loses {:.1}s",
            state.driver_name, penalty
        ));
    }

    fn update_positions(&mut self) {
        for state in self.states.iter_mut().filter(|s| s.is_running()) {
            state.update_total_race_time();
        }
        let order = self.running_order();
        for (k, &idx) in order.iter().enumerate() {
            self.states[idx].current_position = k as u32 + 1;
        }
    }

    fn calc_finishing_times(&mut self, no_finishers: usize) -> Vec<f64> {
        let consts = &self.consts.race;
        let mut times = Vec::with_capacity(no_finishers);
        let mut t = consts.winner_time;

        for position in 1..=no_finishers as u32 {
            if position > 1 {
                let band = match position {
                    2 => {
                        if self.rng.chance_pct(50.0) {
                            consts.gap_p2_small
                        } else {
                            consts.gap_p2_large
                        }
                    }
                    3 => consts.gap_p3,
                    4..=6 => consts.gap_p4_6,
                    7..=10 => consts.gap_p7_10,
                    _ => consts.gap_p11_plus,
                };
                t += self.rng.uniform(band[0], band[1]);

                if position >= consts.lapped_from_position
                    && self.rng.chance_pct(consts.lapped_chance)
                {
                    t += self
                        .rng
                        .uniform(consts.lapped_penalty[0], consts.lapped_penalty[1]);
                }
            }
            times.push(t);
        }
        times
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn is_finished(&self) -> bool {
        self.fast_forwarded || self.cur_lap >= self.track.num_laps
    }

    pub fn is_fast_forwarded(&self) -> bool {
        self.fast_forwarded
    }

    pub fn safety_car_lap(&self) -> Option<u32> {
        self.safety_car_lap
    }

    pub fn overtaking_difficulty(&self) -> f64 {
        self.overtaking_difficulty
    }

    /// Driver states in grid order.
    pub fn driver_states(&self) -> &[DriverRaceState] {
        &self.states
    }

    /// Indices of running drivers sorted by race time, ties keep the current order.
    fn running_order(&self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.states.len())
            .filter(|&i| self.states[i].is_running())
            .collect();
        idxs.sort_by_key(|&i| self.states[i].current_position);

        let times: Vec<f64> = idxs.iter().map(|&i| race_time(&self.states[i])).collect();
        argsort(&times, SortOrder::Ascending)
            .into_iter()
            .map(|k| idxs[k])
            .collect()
    }

    /// Indices of retired drivers, latest retirement first, then grid order.
    fn retired_order(&self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.states.len())
            .filter(|&i| self.states[i].status() == DriverStatus::Dnf)
            .collect();
        idxs.sort_by_key(|&i| {
            let s = &self.states[i];
            (Reverse(s.retired_on_lap()), s.grid_position)
        });
        idxs
    }

    fn lap_report(&self, events: Vec<String>) -> LapReport {
        let order = self.running_order();
        let leader_time = order
            .first()
            .map(|&i| self.states[i].total_race_time)
            .unwrap_or(0.0);

        let mut standings: Vec<StandingEntry> = order
            .iter()
            .map(|&i| {
                let s = &self.states[i];
                standing_entry(s, Some(s.current_position), s.total_race_time - leader_time)
            })
            .collect();
        standings.extend(
            self.retired_order()
                .into_iter()
                .map(|i| standing_entry(&self.states[i], None, 0.0)),
        );

        LapReport {
            lap: self.cur_lap,
            total_laps: self.track.num_laps,
            safety_car: self.flag_state == FlagState::SafetyCar,
            events,
            standings,
        }
    }
}

fn race_time(state: &DriverRaceState) -> f64 {
    state.cumulative_time + state.pit_time_loss
}

fn standing_entry(state: &DriverRaceState, position: Option<u32>, gap: f64) -> StandingEntry {
    StandingEntry {
        position,
        driver_name: state.driver_name.to_owned(),
        team_name: state.team.name.to_owned(),
        gap_to_leader: gap,
        compound: state.tyre_state.compound().to_owned(),
        tyre_wear: state.tyre_state.wear(),
        pit_stops: state.pit_stops,
        status: state.status(),
        is_controlled: state.is_controlled,
    }
}

fn result_record(state: &DriverRaceState, position: Option<u32>, total_time: f64) -> RaceResultRecord {
    RaceResultRecord {
        driver_name: state.driver_name.to_owned(),
        team: state.team.name.to_owned(),
        position,
        grid_position: state.grid_position,
        total_time,
        lap_time: state.avg_lap(),
        best_lap: state.best_lap(),
        performance_score: state.race_performance,
        incident: state.incident.to_owned(),
        driver_stats: (*state.driver).clone(),
        status: state.status(),
        pit_stops: state.pit_stops,
        lap_times: state.lap_times.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sim_constants::TyreConsts;
    use crate::core::tireset::{DegradationPoint, TyreCompound};
    use crate::core::track::CircuitPars;
    use approx::assert_abs_diff_eq;

    fn track(num_laps: u32) -> Track {
        Track::new(&CircuitPars {
            id: "testring".to_owned(),
            name: "Test Ring".to_owned(),
            location: "Nowhere".to_owned(),
            length_km: 4.5,
            num_laps,
            notes: String::new(),
            weather_factor: None,
            tyre_stress_profile: "medium".to_owned(),
            strategy_presets: None,
        })
    }

    fn tyre_model() -> TyreModel {
        let compound = |name: &str, wear: f64| TyreCompound {
            name: name.to_owned(),
            base_wear_per_lap: wear,
            warmup_laps: 1,
            warmup_penalty: 0.3,
            degradation_curve: vec![
                DegradationPoint { wear: 0.0, pace_penalty: 0.0 },
                DegradationPoint { wear: 0.5, pace_penalty: 0.6 },
                DegradationPoint { wear: 1.0, pace_penalty: 2.5 },
            ],
            puncture_risk_wear: 0.97,
            puncture_probability: 0.02,
            fresh_bonus: 0.2,
        };
        TyreModel::new(
            vec![
                compound("soft", 0.04),
                compound("medium", 0.03),
                compound("hard", 0.02),
            ],
            TyreConsts::default(),
        )
        .unwrap()
    }

    fn entries(n: usize, reliability: f64) -> Vec<RaceEntry> {
        (0..n)
            .map(|i| {
                let mut driver = DriverPars::new(&format!("Driver {}", i + 1), "Team");
                driver.pace = 70.0 + i as f64;
                driver.qualifying = 70.0 + i as f64;
                let mut team = TeamPars::new(&format!("Team {}", i / 2));
                team.reliability = reliability;
                RaceEntry {
                    driver,
                    team,
                    is_controlled: i == 0,
                }
            })
            .collect()
    }

    fn race(n: usize, laps: u32, reliability: f64, seed: u64) -> Race {
        Race::new(
            track(laps),
            &entries(n, reliability),
            None,
            tyre_model(),
            SimConstants::default(),
            Some(seed),
        )
    }

    #[test]
    fn positions_stay_a_permutation() {
        let mut race = race(20, 40, 0.95, 42);
        let grid_size = race.driver_states().len();

        while let Some(report) = race.advance_lap() {
            let mut positions: Vec<u32> = race
                .driver_states()
                .iter()
                .filter(|s| s.is_running())
                .map(|s| s.current_position)
                .collect();
            positions.sort_unstable();
            let expected: Vec<u32> = (1..=positions.len() as u32).collect();
            assert_eq!(positions, expected, "lap {}", report.lap);
            assert_eq!(report.standings.len(), grid_size);
        }
        assert_eq!(race.cur_lap, 40);
        assert_eq!(race.flag_state, FlagState::Chequered);
    }

    #[test]
    fn same_seed_same_race() {
        let run = |seed| {
            let mut race = race(10, 20, 0.9, seed);
            let mut events = vec![];
            while let Some(report) = race.advance_lap() {
                events.extend(report.events);
            }
            (events, race.finish())
        };
        let (events_a, res_a) = run(7);
        let (events_b, res_b) = run(7);
        assert_eq!(events_a, events_b);
        assert_eq!(res_a.records, res_b.records);
    }

    #[test]
    fn finishing_times_chain_from_winner() {
        let mut race = race_with_reliable_field();
        while race.advance_lap().is_some() {}
        let res = race.finish();

        let times: Vec<f64> = res.finishers().map(|r| r.total_time).collect();
        assert_eq!(times[0], 5400.0);
        assert!(times.windows(2).all(|w| w[1] > w[0]));

        let positions: Vec<Option<u32>> = res.records.iter().map(|r| r.position).collect();
        let expected: Vec<Option<u32>> = (1..=12).map(Some).collect();
        assert_eq!(positions, expected);
        // mandatory stop after the generic window
        assert!(res.records.iter().all(|r| r.pit_stops >= 1));
    }

    fn race_with_reliable_field() -> Race {
        race(12, 15, 1.0, 11)
    }

    #[test]
    fn commands_are_validated() {
        let mut race = race_with_reliable_field();

        assert!(race.apply_command("Driver 2", PitCommand::ForcePit).is_err());
        assert!(race.apply_command("Nobody", PitCommand::ForcePit).is_err());
        assert!(race.apply_command("Driver 1", PitCommand::DeferPit(0)).is_err());
        assert!(race.apply_command("Driver 1", PitCommand::DeferPit(6)).is_err());
        assert!(race
            .apply_command("Driver 1", PitCommand::NextCompound("wet".to_owned()))
            .is_err());

        race.apply_command("Driver 1", PitCommand::NextCompound("HARD".to_owned()))
            .unwrap();
        race.apply_command("Driver 1", PitCommand::ForcePit).unwrap();

        let report = race.advance_lap().unwrap();
        assert!(report
            .events
            .iter()
            .any(|e| e.starts_with("Driver 1 pits from")));

        let state = race
            .driver_states()
            .iter()
            .find(|s| s.driver_name == "Driver 1")
            .unwrap();
        assert_eq!(state.pit_stops, 1);
        assert_eq!(state.tyre_state.compound(), "hard");
        assert!(state.next_compound_override.is_none());
    }

    #[test]
    fn fast_forward_ranks_by_performance() {
        let mut race = race_with_reliable_field();
        race.advance_lap();
        race.fast_forward();
        assert!(race.is_fast_forwarded());
        assert!(race.advance_lap().is_none());
        assert!(race.apply_command("Driver 1", PitCommand::ForcePit).is_err());

        let mut perfs: Vec<(String, f64)> = race
            .driver_states()
            .iter()
            .map(|s| (s.driver_name.to_owned(), s.race_performance))
            .collect();
        perfs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let res = race.finish();
        assert!(res.fast_forwarded);
        let order: Vec<&str> = res.records.iter().map(|r| r.driver_name.as_str()).collect();
        let expected: Vec<&str> = perfs.iter().map(|p| p.0.as_str()).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn empty_field_is_a_valid_race() {
        let mut race = race(0, 5, 0.9, 1);
        while race.advance_lap().is_some() {}
        let res = race.finish();
        assert!(res.records.is_empty());
    }

    #[test]
    fn safety_car_is_deployed_once_and_slows_overtaking() {
        let mut deployments = 0;

        for seed in 0..40 {
            let mut race = race(10, 40, 1.0, seed);
            let base_difficulty = race.overtaking_difficulty();
            let sc_lap = race.safety_car_lap();
            let mut deployed_events = 0;

            if let Some(sc_lap) = sc_lap {
                assert!((12..=28).contains(&sc_lap), "seed {} lap {}", seed, sc_lap);
                deployments += 1;
            }

            while let Some(report) = race.advance_lap() {
                deployed_events += report
                    .events
                    .iter()
                    .filter(|e| e.starts_with("SAFETY CAR deployed"))
                    .count();

                match sc_lap {
                    Some(sc) if report.lap >= sc => {
                        // the reduction stays after the safety car came in
                        assert_abs_diff_eq!(race.overtaking_difficulty(), base_difficulty * 0.5);
                        assert_eq!(report.safety_car, report.lap < sc + 3, "lap {}", report.lap);
                    }
                    _ => {
                        assert_abs_diff_eq!(race.overtaking_difficulty(), base_difficulty);
                        assert!(!report.safety_car);
                    }
                }
            }

            assert_eq!(deployed_events, usize::from(sc_lap.is_some()), "seed {}", seed);
        }

        assert!(deployments > 0);
    }

    fn racing_entries(n: usize) -> Vec<RaceEntry> {
        // fast cars qualify badly, so the field has to pass each other on track
        (0..n)
            .map(|i| {
                let fast = i % 2 == 0;
                let mut driver = DriverPars::new(&format!("Car {:02}", i + 1), "Team");
                driver.pace = if fast { 99.0 } else { 60.0 };
                driver.racecraft = if fast { 99.0 } else { 60.0 };
                driver.qualifying = if fast { 40.0 } else { 95.0 };
                let mut team = TeamPars::new(&format!("Team {}", i));
                team.reliability = 0.97;
                RaceEntry {
                    driver,
                    team,
                    is_controlled: false,
                }
            })
            .collect()
    }

    /// Position the event claims for the driver: the overtake target for the attacker, one
    /// behind it for the defender, or the generic move.
    fn stated_position(events: &[String], name: &str) -> (Option<u32>, usize) {
        let mut stated = None;
        let mut generic = 0;
        let attacker = format!("{} overtakes ", name);
        let defender = format!(" overtakes {} for P", name);
        let moves = [format!("{} moves up to P", name), format!("{} drops to P", name)];

        for event in events.iter() {
            if event.starts_with(&attacker) {
                stated = event.rsplit("for P").next().and_then(|p| p.parse().ok());
            } else if let Some(idx) = event.find(&defender) {
                stated = event[idx + defender.len()..].parse::<u32>().ok().map(|p| p + 1);
            } else if let Some(prefix) = moves.iter().find(|m| event.starts_with(m.as_str())) {
                stated = event[prefix.len()..].parse().ok();
                generic += 1;
            }
        }
        (stated, generic)
    }

    #[test]
    fn every_position_change_is_reported_once() {
        let mut consts = SimConstants::default();
        consts.race.overtake_chance = 1000.0;
        consts.race.performance_lap_factor = 0.0;

        let mut overtakes = 0;
        for seed in 0..20 {
            let mut race = Race::new(
                track(30),
                &racing_entries(16),
                None,
                tyre_model(),
                consts.clone(),
                Some(seed),
            );

            loop {
                let prev: HashMap<String, u32> = race
                    .driver_states()
                    .iter()
                    .filter(|s| s.is_running())
                    .map(|s| (s.driver_name.to_owned(), s.current_position))
                    .collect();
                let report = match race.advance_lap() {
                    Some(report) => report,
                    None => break,
                };
                overtakes += report.events.iter().filter(|e| e.contains(" overtakes ")).count();

                for entry in report.running() {
                    let name = entry.driver_name.as_str();
                    let cur = entry.position.unwrap();
                    let pitted = report
                        .events
                        .iter()
                        .any(|e| e.contains(&format!("{} pits from", name)));
                    let (stated, generic) = stated_position(&report.events, name);

                    assert!(generic <= 1, "{} reported twice on lap {}", name, report.lap);
                    if stated == Some(cur) {
                        continue;
                    }
                    // only a pit stop may leave a drop unstated
                    let reference = stated.unwrap_or(prev[name]);
                    assert!(
                        pitted && cur > reference || cur == reference,
                        "seed {} lap {}: {} at P{} stated {:?}, events {:?}",
                        seed,
                        report.lap,
                        name,
                        cur,
                        stated,
                        report.events
                    );
                }
            }
        }

        assert!(overtakes > 0);
    }
}
