use crate::core::car::TeamPars;
use crate::core::driver::DriverPars;
use crate::core::sim_constants::SimConstants;
use crate::core::strategy::StrategyRepository;
use crate::core::tireset::{TyreCompound, TyreModel};
use crate::core::track::CircuitPars;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const CIRCUITS_FILE: &str = "circuits.json";
pub const DRIVERS_FILE: &str = "drivers.json";
pub const TEAMS_FILE: &str = "teams.json";
pub const TYRES_FILE: &str = "tyres.json";
pub const STRATEGIES_FILE: &str = "pit_strategies.json";
pub const SIM_CONSTANTS_FILE: &str = "sim_constants.json";

/// GameData holds all static content of the game. Driver and team entries may be overridden by
/// the save game afterwards.
#[derive(Debug, Clone)]
pub struct GameData {
    pub circuits: Vec<CircuitPars>,
    pub drivers: Vec<DriverPars>,
    pub teams: Vec<TeamPars>,
    pub tyre_model: TyreModel,
    pub sim_consts: SimConstants,
    pub strategies_path: PathBuf,
}

impl GameData {
    pub fn find_circuit(&self, circuit_id: &str) -> Option<&CircuitPars> {
        self.circuits
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(circuit_id))
    }

    pub fn find_driver(&self, name: &str) -> Option<&DriverPars> {
        self.drivers.iter().find(|d| d.name == name)
    }

    /// Looks a team up by name or alias.
    pub fn find_team(&self, name: &str) -> Option<&TeamPars> {
        self.teams.iter().find(|t| t.matches_name(name))
    }

    pub fn driver_names(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name.to_owned()).collect()
    }

    /// Creates a lazily loading repository for the pit strategy templates.
    pub fn strategy_repository(&self) -> StrategyRepository {
        StrategyRepository::from_path(&self.strategies_path)
    }
}

fn read_json<T: DeserializeOwned>(filepath: &Path, kind: &str) -> anyhow::Result<T> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open {} file {}!",
            kind,
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse {} file {}!",
        kind,
        filepath.display()
    ))?;
    Ok(pars)
}

pub fn read_circuits(filepath: &Path) -> anyhow::Result<Vec<CircuitPars>> {
    read_json(filepath, "circuit")
}

pub fn read_drivers(filepath: &Path) -> anyhow::Result<Vec<DriverPars>> {
    read_json(filepath, "driver")
}

pub fn read_teams(filepath: &Path) -> anyhow::Result<Vec<TeamPars>> {
    read_json(filepath, "team")
}

/// Reads the compound table. Malformed compounds (e.g. an unsorted degradation curve) are
/// rejected here rather than producing wrong penalties mid-race.
pub fn read_tyre_compounds(filepath: &Path) -> anyhow::Result<Vec<TyreCompound>> {
    let compounds: Vec<TyreCompound> = read_json(filepath, "tyre compound")?;
    for compound in compounds.iter() {
        compound
            .validate()
            .context(format!("Invalid tyre compound in {}!", filepath.display()))?;
    }
    Ok(compounds)
}

/// Read simulation constants from a JSON file. Missing fields keep their defaults.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    read_json(filepath, "simulation constants")
}

/// read_game_data reads all static content from `data_dir`. The constants file is optional,
/// `consts_path` takes precedence over the one in the data directory.
pub fn read_game_data(data_dir: &Path, consts_path: Option<&Path>) -> anyhow::Result<GameData> {
    let circuits = read_circuits(&data_dir.join(CIRCUITS_FILE))?;
    let drivers = read_drivers(&data_dir.join(DRIVERS_FILE))?;
    let teams = read_teams(&data_dir.join(TEAMS_FILE))?;
    let compounds = read_tyre_compounds(&data_dir.join(TYRES_FILE))?;

    let default_consts_path = data_dir.join(SIM_CONSTANTS_FILE);
    let sim_consts = match consts_path {
        Some(path) => read_sim_constants(path)?,
        None if default_consts_path.exists() => read_sim_constants(&default_consts_path)?,
        None => SimConstants::default(),
    };

    let tyre_model = TyreModel::new(compounds, sim_consts.tyre.clone())?;

    log::info!(
        "Loaded {} circuits, {} drivers, {} teams and {} tyre compounds from {}",
        circuits.len(),
        drivers.len(),
        teams.len(),
        tyre_model.compound_names().len(),
        data_dir.display()
    );

    Ok(GameData {
        circuits,
        drivers,
        teams,
        tyre_model,
        sim_consts,
        strategies_path: data_dir.join(STRATEGIES_FILE),
    })
}
