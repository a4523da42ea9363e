use crate::core::car::TeamPars;
use crate::core::driver::DriverPars;
use crate::core::strategy::StrategyPlan;
use crate::core::tireset::TyreState;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    Running,
    #[serde(rename = "DNF")]
    Dnf,
    Finished,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Running => "Running",
            DriverStatus::Dnf => "DNF",
            DriverStatus::Finished => "Finished",
        }
    }
}

/// DriverRaceState holds everything that changes for one driver during a race. It is created at
/// race start, owned by the race and dropped once the results are produced.
///
/// Status transitions: Running -> DNF or Running -> Finished. Both targets are terminal.
#[derive(Debug)]
pub struct DriverRaceState {
    pub driver_name: String,
    pub driver: Rc<DriverPars>,
    pub team: Rc<TeamPars>,
    pub qualifying_time: f64,
    pub grid_position: u32,
    pub current_position: u32,
    pub final_position: Option<u32>,
    status: DriverStatus,
    pub incident: Option<String>,
    pub race_performance: f64,
    pub cumulative_time: f64,
    pub pit_time_loss: f64,
    pub total_race_time: f64,
    pub strategy_plan: Option<Rc<StrategyPlan>>,
    pub strategy_stint_index: usize,
    pub tyre_state: TyreState,
    pub pit_stops: u32,
    pub force_pit_on_lap: Option<u32>,
    pub defer_pit_laps: u32,
    pub next_compound_override: Option<String>,
    pub last_pit_lap: Option<u32>,
    pub is_controlled: bool,
    pub lap_times: Vec<f64>,
    retired_on_lap: Option<u32>,
}

impl DriverRaceState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: Rc<DriverPars>,
        team: Rc<TeamPars>,
        qualifying_time: f64,
        grid_position: u32,
        race_performance: f64,
        strategy_plan: Option<Rc<StrategyPlan>>,
        tyre_state: TyreState,
        is_controlled: bool,
    ) -> DriverRaceState {
        DriverRaceState {
            driver_name: driver.name.to_owned(),
            driver,
            team,
            qualifying_time,
            grid_position,
            current_position: grid_position,
            final_position: None,
            status: DriverStatus::Running,
            incident: None,
            race_performance,
            cumulative_time: 0.0,
            pit_time_loss: 0.0,
            total_race_time: 0.0,
            strategy_plan,
            strategy_stint_index: 0,
            tyre_state,
            pit_stops: 0,
            force_pit_on_lap: None,
            defer_pit_laps: 0,
            next_compound_override: None,
            last_pit_lap: None,
            is_controlled,
            lap_times: Vec::new(),
            retired_on_lap: None,
        }
    }

    pub fn status(&self) -> DriverStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == DriverStatus::Running
    }

    pub fn retired_on_lap(&self) -> Option<u32> {
        self.retired_on_lap
    }

    /// Moves a running driver to DNF. Returns false (and changes nothing) if the driver is not
    /// running anymore.
    pub fn retire(&mut self, reason: &str, lap: u32) -> bool {
        if self.status != DriverStatus::Running {
            return false;
        }
        self.status = DriverStatus::Dnf;
        self.incident = Some(reason.to_owned());
        self.retired_on_lap = Some(lap);
        self.final_position = None;
        true
    }

    /// Moves a running driver to Finished with the given classification.
    pub fn finish(&mut self, position: u32) -> bool {
        if self.status != DriverStatus::Running {
            return false;
        }
        self.status = DriverStatus::Finished;
        self.final_position = Some(position);
        true
    }

    pub fn update_total_race_time(&mut self) {
        self.total_race_time = self.cumulative_time + self.pit_time_loss;
    }

    /// Records a completed lap.
    pub fn add_lap_time(&mut self, lap_time: f64) {
        self.cumulative_time += lap_time;
        self.lap_times.push(lap_time);
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.lap_times.iter().copied().reduce(f64::min)
    }

    pub fn avg_lap(&self) -> Option<f64> {
        if self.lap_times.is_empty() {
            None
        } else {
            Some(self.lap_times.iter().sum::<f64>() / self.lap_times.len() as f64)
        }
    }

    /// Remaining pit stops allowed by the driver's plan (or `default_max_stops` without plan).
    pub fn stops_remaining(&self, plan: Option<&StrategyPlan>, default_max_stops: u32) -> u32 {
        let allowed = plan
            .map(|p| p.allowed_stops())
            .unwrap_or(default_max_stops);
        allowed.saturating_sub(self.pit_stops)
    }

    /// True once every stop of the plan has been made.
    pub fn plan_completed(&self, plan: Option<&StrategyPlan>) -> bool {
        match plan {
            Some(plan) => self.strategy_stint_index + 1 >= plan.stint_count(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DriverRaceState {
        DriverRaceState::new(
            Rc::new(DriverPars::new("Test Driver", "Test")),
            Rc::new(TeamPars::new("Test")),
            80.0,
            3,
            85.0,
            None,
            TyreState::new("medium"),
            false,
        )
    }

    #[test]
    fn dnf_is_terminal() {
        let mut s = state();
        assert!(s.retire("Gearbox issue", 12));
        assert_eq!(s.status(), DriverStatus::Dnf);
        assert!(!s.retire("Crash", 13));
        assert!(!s.finish(1));
        assert_eq!(s.status(), DriverStatus::Dnf);
        assert_eq!(s.incident.as_deref(), Some("Gearbox issue"));
        assert_eq!(s.retired_on_lap(), Some(12));
    }

    #[test]
    fn lap_bookkeeping() {
        let mut s = state();
        s.add_lap_time(95.0);
        s.add_lap_time(93.0);
        s.pit_time_loss = 22.5;
        s.update_total_race_time();
        assert_eq!(s.total_race_time, 210.5);
        assert_eq!(s.best_lap(), Some(93.0));
        assert_eq!(s.avg_lap(), Some(94.0));
        assert_eq!(s.stops_remaining(None, 1), 1);
        s.pit_stops = 1;
        assert_eq!(s.stops_remaining(None, 1), 0);
    }
}
