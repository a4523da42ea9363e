use crate::core::state_handler::DriverStatus;
use crate::error::SimResult;
use std::fmt;

/// One row of the standings table published after every lap.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingEntry {
    pub position: Option<u32>,
    pub driver_name: String,
    pub team_name: String,
    pub gap_to_leader: f64,
    pub compound: String,
    pub tyre_wear: f64,
    pub pit_stops: u32,
    pub status: DriverStatus,
    pub is_controlled: bool,
}

/// LapReport is the narration side channel of a race: the events of one lap plus the standings
/// after it. Running drivers come first in position order, retired drivers at the end.
#[derive(Debug, Clone, Default)]
pub struct LapReport {
    pub lap: u32,
    pub total_laps: u32,
    pub safety_car: bool,
    pub events: Vec<String>,
    pub standings: Vec<StandingEntry>,
}

impl LapReport {
    pub fn running(&self) -> impl Iterator<Item = &StandingEntry> {
        self.standings
            .iter()
            .filter(|e| e.status == DriverStatus::Running)
    }

    pub fn leader(&self) -> Option<&StandingEntry> {
        self.running().next()
    }
}

impl fmt::Display for LapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lap {}/{}", self.lap, self.total_laps)?;
        if self.safety_car {
            write!(f, " [SC]")?;
        }
        writeln!(f)?;
        for event in self.events.iter() {
            writeln!(f, "  - {}", event)?;
        }
        for entry in self.standings.iter() {
            match entry.position {
                Some(pos) => write!(f, "  P{:<3}", pos)?,
                None => write!(f, "  {:<4}", entry.status.as_str())?,
            }
            let marker = if entry.is_controlled { "*" } else { " " };
            writeln!(
                f,
                "{}{:<22} {:<18} +{:>7.3}s  {:<6} {:>3.0}%  stops {}",
                marker,
                entry.driver_name,
                entry.team_name,
                entry.gap_to_leader,
                entry.compound,
                entry.tyre_wear * 100.0,
                entry.pit_stops
            )?;
        }
        Ok(())
    }
}

/// Player interventions. Only drivers flagged as controlled accept them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PitCommand {
    /// Pit at the end of the next lap.
    ForcePit,
    /// Skip the pit decision for 1 to 5 laps.
    DeferPit(u32),
    /// Compound to fit at the next stop.
    NextCompound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LapDecision {
    Continue,
    FastForward,
    Commands(Vec<(String, PitCommand)>),
}

/// LapController is consulted after every lap of an interactive race (never in auto mode). The
/// CLI implements it with blocking stdin reads.
pub trait LapController {
    fn on_lap(&mut self, report: &LapReport) -> LapDecision;

    /// Called with the outcome of every command returned from `on_lap`.
    fn on_command_result(&mut self, _driver_name: &str, _result: &SimResult<()>) {}
}

/// Controller that never intervenes.
pub struct ContinueController;

impl LapController for ContinueController {
    fn on_lap(&mut self, _report: &LapReport) -> LapDecision {
        LapDecision::Continue
    }
}
