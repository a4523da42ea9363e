use crate::core::car::TeamPars;
use crate::core::race::{Race, RaceEntry};
use crate::core::strategy::{StrategyChoice, StrategyRepository};
use crate::core::track::Track;
use crate::error::{SimError, SimResult};
use crate::interfaces::lap_interface::{LapController, LapDecision, LapReport};
use crate::post::race_result::RaceResults;
use crate::pre::read_sim_pars::GameData;
use flume::Sender;

/// Options of a single race.
///
/// * `auto_mode` - Never consult the lap controller
/// * `strategy_choice` - Strategy preset of the circuit
/// * `seed` - Makes all random draws of the race reproducible
/// * `controlled_drivers` - Drivers that accept player pit commands
#[derive(Debug, Clone, Default)]
pub struct RaceOptions {
    pub auto_mode: bool,
    pub strategy_choice: StrategyChoice,
    pub seed: Option<u64>,
    pub controlled_drivers: Vec<String>,
}

/// Resolves the drivers of a race. Unknown drivers are skipped, drivers whose team is missing in
/// the data get a synthesized team.
pub fn build_entries(
    data: &GameData,
    driver_names: Option<&[String]>,
    controlled_drivers: &[String],
) -> Vec<RaceEntry> {
    let names = match driver_names {
        Some(names) if !names.is_empty() => names.to_vec(),
        _ => data.driver_names(),
    };

    let mut entries = Vec::with_capacity(names.len());
    for name in names.iter() {
        let driver = match data.find_driver(name) {
            Some(driver) => driver,
            None => {
                log::warn!("Driver '{}' not found, skipping", name);
                continue;
            }
        };
        let team = match data.find_team(&driver.team) {
            Some(team) => team.clone(),
            None => {
                log::warn!(
                    "Team '{}' of {} not found, using a default team profile",
                    driver.team,
                    driver.name
                );
                TeamPars::synthesized(&driver.team)
            }
        };
        entries.push(RaceEntry {
            driver: driver.clone(),
            team,
            is_controlled: controlled_drivers.iter().any(|c| c == name),
        });
    }
    entries
}

/// simulate_race sets up a race on the basis of the game data, simulates it lap by lap and
/// returns the results for post-processing. The lap reports are passed to the controller
/// (interactive races) and sent through `tx` if a sender was inserted.
pub fn simulate_race(
    data: &GameData,
    strategies: &mut StrategyRepository,
    circuit_id: &str,
    driver_names: Option<&[String]>,
    options: &RaceOptions,
    mut controller: Option<&mut dyn LapController>,
    tx: Option<&Sender<LapReport>>,
) -> SimResult<RaceResults> {
    let circuit = data
        .find_circuit(circuit_id)
        .ok_or_else(|| SimError::CircuitNotFound {
            id: circuit_id.to_owned(),
        })?;

    let plan = strategies.resolve_plan(circuit, options.strategy_choice)?;
    match &plan {
        Some(plan) => log::info!(
            "Strategy for {}: {} ({} stints)",
            circuit.name,
            plan.strategy.name,
            plan.stint_count()
        ),
        None => log::info!("No strategy plan for {}, using generic pit window", circuit.name),
    }

    let entries = build_entries(data, driver_names, &options.controlled_drivers);
    let mut race = Race::new(
        Track::new(circuit),
        &entries,
        plan,
        data.tyre_model.clone(),
        data.sim_consts.clone(),
        options.seed,
    );

    while let Some(report) = race.advance_lap() {
        if let Some(tx) = tx {
            // a dropped receiver only means nobody listens anymore
            if tx.send(report.clone()).is_err() {
                log::debug!("Lap report receiver disconnected");
            }
        }

        if options.auto_mode {
            continue;
        }
        if let Some(controller) = controller.as_mut() {
            match controller.on_lap(&report) {
                LapDecision::Continue => {}
                LapDecision::FastForward => race.fast_forward(),
                LapDecision::Commands(commands) => {
                    for (driver_name, command) in commands {
                        let result = race.apply_command(&driver_name, command);
                        controller.on_command_result(&driver_name, &result);
                    }
                }
            }
        }
    }

    Ok(race.finish())
}
