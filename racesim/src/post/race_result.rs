use crate::core::driver::DriverPars;
use crate::core::state_handler::DriverStatus;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// RaceResultRecord is the per-driver outcome of a race.
///
/// * `position` - Final classification, None for DNF
/// * `total_time` - (s) Race time for finishers, time at retirement for DNFs
/// * `lap_time` - (s) Average lap time
/// * `best_lap` - (s) Fastest lap
/// * `performance_score` - Fixed per-race performance score
/// * `incident` - DNF reason or last incident of the race
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceResultRecord {
    pub driver_name: String,
    pub team: String,
    pub position: Option<u32>,
    pub grid_position: u32,
    pub total_time: f64,
    pub lap_time: Option<f64>,
    pub best_lap: Option<f64>,
    pub performance_score: f64,
    pub incident: Option<String>,
    pub driver_stats: DriverPars,
    pub status: DriverStatus,
    pub pit_stops: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lap_times: Vec<f64>,
}

/// RaceResults holds the records of one race in classification order: finishers by position,
/// then DNFs.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResults {
    pub circuit_id: String,
    pub circuit_name: String,
    pub location: String,
    pub num_laps: u32,
    pub safety_car_lap: Option<u32>,
    pub fast_forwarded: bool,
    pub records: Vec<RaceResultRecord>,
}

impl RaceResults {
    pub fn get(&self, driver_name: &str) -> Option<&RaceResultRecord> {
        self.records.iter().find(|r| r.driver_name == driver_name)
    }

    /// Map view keyed by driver name.
    pub fn by_driver(&self) -> HashMap<&str, &RaceResultRecord> {
        self.records
            .iter()
            .map(|r| (r.driver_name.as_str(), r))
            .collect()
    }

    pub fn winner(&self) -> Option<&RaceResultRecord> {
        self.records.iter().find(|r| r.position == Some(1))
    }

    pub fn finishers(&self) -> impl Iterator<Item = &RaceResultRecord> {
        self.records.iter().filter(|r| r.status == DriverStatus::Finished)
    }

    pub fn dnfs(&self) -> impl Iterator<Item = &RaceResultRecord> {
        self.records.iter().filter(|r| r.status == DriverStatus::Dnf)
    }

    /// print_classification prints the final classification to the console output.
    pub fn print_classification(&self) {
        println!("{}", self);
    }

    /// write_lap_times_csv writes one row per lap and one column per driver (classification
    /// order). Retired drivers have empty cells after their last lap.
    pub fn write_lap_times_csv(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .context(format!("Failed to create output directory {}!", dir.display()))?;
            }
        }

        let mut wtr = csv::Writer::from_path(path)
            .context(format!("Failed to create lap time file {}!", path.display()))?;

        let mut header = vec!["lap".to_owned()];
        header.extend(self.records.iter().map(|r| r.driver_name.to_owned()));
        wtr.write_record(&header)?;

        let max_laps = self.records.iter().map(|r| r.lap_times.len()).max().unwrap_or(0);
        for lap in 0..max_laps {
            let mut row = vec![(lap + 1).to_string()];
            row.extend(self.records.iter().map(|r| {
                r.lap_times
                    .get(lap)
                    .map(|t| format!("{:.3}", t))
                    .unwrap_or_default()
            }));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl fmt::Display for RaceResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let winner_time = self.winner().map(|r| r.total_time);

        writeln!(
            f,
            "RESULT: {} ({}), {} laps{}",
            self.circuit_name,
            self.location,
            self.num_laps,
            if self.fast_forwarded { ", fast-forwarded" } else { "" }
        )?;
        writeln!(
            f,
            "{:<4} {:<22} {:<18} {:>12} {:>9} {:>5} {:>6}  {}",
            "Pos", "Driver", "Team", "Time/Gap", "Best", "Stops", "Grid", "Notes"
        )?;

        for r in self.records.iter() {
            let pos = match r.position {
                Some(p) => format!("P{}", p),
                None => "DNF".to_owned(),
            };
            let time = match (r.position, winner_time) {
                (Some(1), _) => format_race_time(r.total_time),
                (Some(_), Some(wt)) => format_gap(r.total_time - wt),
                _ => "-".to_owned(),
            };
            let best = r
                .best_lap
                .map(|t| format!("{:.3}", t))
                .unwrap_or_else(|| "-".to_owned());
            let grid_delta = match r.position {
                Some(p) => format!("{:+}", r.grid_position as i64 - p as i64),
                None => String::new(),
            };
            writeln!(
                f,
                "{:<4} {:<22} {:<18} {:>12} {:>9} {:>5} {:>6}  {}",
                pos,
                r.driver_name,
                r.team,
                time,
                best,
                r.pit_stops,
                grid_delta,
                r.incident.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

/// Formats a gap as `+12.345s` below one minute and `+1:02.345` above.
pub fn format_gap(gap: f64) -> String {
    if gap < 60.0 {
        format!("+{:.3}s", gap)
    } else {
        let minutes = (gap / 60.0).floor();
        format!("+{}:{:06.3}", minutes as u32, gap - minutes * 60.0)
    }
}

/// Formats an absolute race time as `h:mm:ss.sss`.
pub fn format_race_time(t: f64) -> String {
    let hours = (t / 3600.0).floor();
    let minutes = ((t - hours * 3600.0) / 60.0).floor();
    let seconds = t - hours * 3600.0 - minutes * 60.0;
    format!("{}:{:02}:{:06.3}", hours as u32, minutes as u32, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, position: Option<u32>, total_time: f64) -> RaceResultRecord {
        RaceResultRecord {
            driver_name: name.to_owned(),
            team: "Test".to_owned(),
            position,
            grid_position: 2,
            total_time,
            lap_time: Some(92.0),
            best_lap: Some(91.2),
            performance_score: 84.0,
            incident: if position.is_none() {
                Some("Crash".to_owned())
            } else {
                None
            },
            driver_stats: DriverPars::new(name, "Test"),
            status: if position.is_some() {
                DriverStatus::Finished
            } else {
                DriverStatus::Dnf
            },
            pit_stops: 1,
            lap_times: vec![92.0, 91.2],
        }
    }

    fn results() -> RaceResults {
        RaceResults {
            circuit_id: "monza".to_owned(),
            circuit_name: "Monza".to_owned(),
            location: "Italy".to_owned(),
            num_laps: 2,
            safety_car_lap: None,
            fast_forwarded: false,
            records: vec![
                record("A", Some(1), 5400.0),
                record("B", Some(2), 5402.5),
                record("C", None, 1200.0),
            ],
        }
    }

    #[test]
    fn gap_formatting() {
        assert_eq!(format_gap(1.5), "+1.500s");
        assert_eq!(format_gap(62.345), "+1:02.345");
        assert_eq!(format_race_time(5400.0), "1:30:00.000");
    }

    #[test]
    fn lookups() {
        let res = results();
        assert_eq!(res.winner().map(|r| r.driver_name.as_str()), Some("A"));
        assert_eq!(res.finishers().count(), 2);
        assert_eq!(res.dnfs().count(), 1);
        assert_eq!(res.by_driver()["B"].position, Some(2));
        let table = res.to_string();
        assert!(table.contains("+2.500s"));
        assert!(table.contains("DNF"));
    }

    #[test]
    fn serde_keeps_status_and_positions() {
        let res = results();
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"DNF\""));
        let back: RaceResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back.records, res.records);
    }
}
