use crate::core::driver::DriverPars;
use crate::core::state_handler::DriverStatus;
use crate::post::race_result::RaceResults;
use crate::pre::read_sim_pars::GameData;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Prize money by finishing position, P11 and below earn the last entry. DNFs earn nothing.
pub const PRIZE_MONEY: [i64; 11] = [
    500_000, 350_000, 250_000, 180_000, 140_000, 110_000, 90_000, 70_000, 50_000, 30_000, 10_000,
];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CircuitRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// One classified driver of a past race.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryResult {
    pub position: Option<u32>,
    pub driver: String,
    pub team: String,
    pub total_time: f64,
    pub best_lap: Option<f64>,
    pub performance_score: f64,
    pub incident: Option<String>,
    pub status: DriverStatus,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceHistoryEntry {
    pub circuit: CircuitRef,
    pub results: Vec<HistoryResult>,
}

/// SaveState is the persisted player progress.
///
/// * `selected_team` - Team the player manages
/// * `drivers` - The player's drivers, they replace data entries of the same name
/// * `money` - Accumulated prize money
/// * `team_stats` - Upgraded car attributes of the selected team
/// * `races` - Race history, oldest first
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SaveState {
    #[serde(rename = "selectedTeam", default)]
    pub selected_team: Option<String>,
    #[serde(default)]
    pub drivers: Vec<DriverPars>,
    #[serde(default)]
    pub money: i64,
    #[serde(rename = "teamStats", default)]
    pub team_stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub races: Vec<RaceHistoryEntry>,
}

impl SaveState {
    /// Reads the save file. A missing or empty file is a fresh game.
    pub fn load(filepath: &Path) -> anyhow::Result<SaveState> {
        let is_empty = match std::fs::metadata(filepath) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if is_empty {
            log::info!("No save game at {}, starting fresh", filepath.display());
            return Ok(SaveState::default());
        }

        let fh = OpenOptions::new()
            .read(true)
            .open(filepath)
            .context(format!("Failed to open save file {}!", filepath.display()))?;
        let save = serde_json::from_reader(&fh)
            .context(format!("Failed to parse save file {}!", filepath.display()))?;
        Ok(save)
    }

    /// Writes the save file as pretty printed JSON, replacing the old content.
    pub fn save(&self, filepath: &Path) -> anyhow::Result<()> {
        let fh = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(filepath)
            .context(format!("Failed to create save file {}!", filepath.display()))?;
        let mut writer = BufWriter::new(fh);
        serde_json::to_writer_pretty(&mut writer, self)
            .context(format!("Failed to write save file {}!", filepath.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn player_driver_names(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name.to_owned()).collect()
    }

    pub fn completed_circuits(&self) -> HashSet<&str> {
        self.races.iter().map(|r| r.circuit.id.as_str()).collect()
    }

    /// Appends a race to the history, finishers by position and DNFs last.
    pub fn append_race(&mut self, results: &RaceResults) {
        let mut entries: Vec<HistoryResult> = results
            .records
            .iter()
            .map(|r| HistoryResult {
                position: r.position,
                driver: r.driver_name.to_owned(),
                team: r.team.to_owned(),
                total_time: r.total_time,
                best_lap: r.best_lap,
                performance_score: r.performance_score,
                incident: r.incident.to_owned(),
                status: r.status,
            })
            .collect();
        entries.sort_by_key(|e| (e.position.is_none(), e.position));

        self.races.push(RaceHistoryEntry {
            circuit: CircuitRef {
                id: results.circuit_id.to_owned(),
                name: results.circuit_name.to_owned(),
                location: results.location.to_owned(),
            },
            results: entries,
        });
    }

    /// Credits the prize money of the player's drivers and returns the amount earned.
    pub fn credit_prize_money(&mut self, results: &RaceResults) -> i64 {
        let earned: i64 = self
            .drivers
            .iter()
            .filter_map(|d| results.get(&d.name))
            .map(|r| prize_for_position(r.position))
            .sum();
        self.money += earned;
        earned
    }

    /// Merges the save into the static data: the player's drivers replace or extend the driver
    /// pool and the upgraded stats overwrite the selected team's attributes.
    pub fn apply_to(&self, data: &mut GameData) {
        for driver in self.drivers.iter() {
            match data.drivers.iter_mut().find(|d| d.name == driver.name) {
                Some(existing) => *existing = driver.clone(),
                None => data.drivers.push(driver.clone()),
            }
        }

        let team_name = match &self.selected_team {
            Some(name) => name,
            None => return,
        };
        match data.teams.iter_mut().find(|t| t.matches_name(team_name)) {
            Some(team) => {
                for (key, value) in self.team_stats.iter() {
                    if !team.set_attribute(key, *value) {
                        log::warn!("Ignoring unknown team stat '{}' in save game", key);
                    }
                }
            }
            None => log::warn!("Selected team '{}' not found in team data", team_name),
        }
    }
}

pub fn prize_for_position(position: Option<u32>) -> i64 {
    match position {
        Some(p) if p >= 1 => PRIZE_MONEY[(p as usize - 1).min(PRIZE_MONEY.len() - 1)],
        _ => 0,
    }
}
