use anyhow::Context;
use clap::Parser;
use racesim::core::handle_race::{simulate_race, RaceOptions};
use racesim::core::strategy::StrategyRepository;
use racesim::error::SimResult;
use racesim::interfaces::lap_interface::{LapController, LapDecision, LapReport, PitCommand};
use racesim::post::race_result::RaceResults;
use racesim::post::save_game::SaveState;
use racesim::pre::read_sim_pars::{read_game_data, GameData};
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Instant;

/// Interactive lap controller reading player commands from stdin.
struct StdinController {
    controlled: Vec<String>,
    eof: bool,
}

impl StdinController {
    fn new(controlled: Vec<String>) -> StdinController {
        StdinController {
            controlled,
            eof: false,
        }
    }

    fn print_help(&self) {
        println!("  [Enter] next lap | f fast-forward | p <no> force pit | d <no> <laps> defer pit");
        println!("  c <no> <compound> next compound | h help");
        for (i, name) in self.controlled.iter().enumerate() {
            println!("  {}: {}", i + 1, name);
        }
    }

    fn driver_by_no(&self, no: &str) -> Option<String> {
        let idx: usize = no.parse().ok()?;
        self.controlled.get(idx.checked_sub(1)?).cloned()
    }

    /// Parses one input line. Err contains the message shown to the player.
    fn parse_command(&self, line: &str) -> Result<(String, PitCommand), String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let driver = parts
            .get(1)
            .and_then(|no| self.driver_by_no(no))
            .ok_or_else(|| format!("Expected a driver number between 1 and {}", self.controlled.len()))?;

        match (parts[0], parts.get(2)) {
            ("p", None) => Ok((driver, PitCommand::ForcePit)),
            ("d", Some(laps)) => laps
                .parse()
                .map(|laps| (driver, PitCommand::DeferPit(laps)))
                .map_err(|_| format!("'{}' is not a number of laps", laps)),
            ("c", Some(compound)) => Ok((driver, PitCommand::NextCompound(compound.to_string()))),
            _ => Err(format!("Unknown command '{}', h for help", line.trim())),
        }
    }
}

impl LapController for StdinController {
    fn on_lap(&mut self, report: &LapReport) -> LapDecision {
        print!("{}", report);
        if self.eof {
            return LapDecision::Continue;
        }

        let stdin = io::stdin();
        let mut commands = vec![];
        loop {
            print!("> ");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => {
                    self.eof = true;
                    break;
                }
                Ok(_) => {}
            }

            match line.trim() {
                "" => break,
                "f" => return LapDecision::FastForward,
                "h" => self.print_help(),
                cmd if self.controlled.is_empty() => {
                    println!("No controlled drivers, ignoring '{}'", cmd)
                }
                cmd => match self.parse_command(cmd) {
                    Ok(command) => commands.push(command),
                    Err(msg) => println!("{}", msg),
                },
            }
        }

        if commands.is_empty() {
            LapDecision::Continue
        } else {
            LapDecision::Commands(commands)
        }
    }

    fn on_command_result(&mut self, driver_name: &str, result: &SimResult<()>) {
        match result {
            Ok(()) => println!("  Command for {} accepted", driver_name),
            Err(e) => println!("  {}", e),
        }
    }
}

fn select_circuit(opts: &SimOpts, data: &GameData, save: &SaveState) -> anyhow::Result<String> {
    if let Some(circuit) = &opts.circuit {
        return Ok(circuit.to_owned());
    }
    let completed = save.completed_circuits();
    data.circuits
        .iter()
        .find(|c| !completed.contains(c.id.as_str()))
        .map(|c| c.id.to_owned())
        .context("All circuits have been raced, pass --circuit to race one again!")
}

fn print_batch_summary(results: &[RaceResults]) {
    let mut wins: BTreeMap<&str, u32> = BTreeMap::new();
    let mut podiums: BTreeMap<&str, u32> = BTreeMap::new();
    let mut no_dnfs = 0;

    for res in results.iter() {
        for rec in res.records.iter() {
            if rec.position == Some(1) {
                *wins.entry(rec.driver_name.as_str()).or_insert(0) += 1;
            }
            if matches!(rec.position, Some(p) if p <= 3) {
                *podiums.entry(rec.driver_name.as_str()).or_insert(0) += 1;
            }
        }
        no_dnfs += res.dnfs().count();
    }

    let mut wins: Vec<(&str, u32)> = wins.into_iter().collect();
    wins.sort_by(|a, b| b.1.cmp(&a.1));

    println!("RESULT: {} races simulated", results.len());
    for (driver, count) in wins.iter() {
        println!(
            "  {:<22} wins {:>4}  podiums {:>4}",
            driver,
            count,
            podiums.get(driver).copied().unwrap_or(0)
        );
    }
    println!(
        "  Average DNFs per race: {:.2}",
        no_dnfs as f64 / results.len().max(1) as f64
    );
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    let sim_opts: SimOpts = SimOpts::parse();

    let default_level = if sim_opts.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut data = read_game_data(&sim_opts.data_dir, sim_opts.consts_path.as_deref())?;
    let mut save = SaveState::load(&sim_opts.save_file)?;
    save.apply_to(&mut data);

    let circuit_id = select_circuit(&sim_opts, &data, &save)?;
    let driver_names = if sim_opts.drivers.is_empty() {
        None
    } else {
        Some(sim_opts.drivers.as_slice())
    };
    let controlled = if sim_opts.controlled.is_empty() {
        save.player_driver_names()
    } else {
        sim_opts.controlled.to_owned()
    };

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.is_batch() {
        println!(
            "INFO: Simulating {} races at {} in parallel...",
            sim_opts.no_sim_runs, circuit_id
        );
        let t_start = Instant::now();

        let strategies: Vec<_> = data
            .strategy_repository()
            .all_strategies()?
            .into_iter()
            .cloned()
            .collect();

        let results: Vec<RaceResults> = (0..sim_opts.no_sim_runs)
            .into_par_iter()
            .map(|run| {
                let options = RaceOptions {
                    auto_mode: true,
                    strategy_choice: sim_opts.strategy,
                    seed: sim_opts.seed.map(|s| s.wrapping_add(run as u64)),
                    controlled_drivers: vec![],
                };
                let mut repo = StrategyRepository::from_strategies(strategies.clone());
                simulate_race(&data, &mut repo, &circuit_id, driver_names, &options, None, None)
            })
            .collect::<SimResult<Vec<_>>>()?;

        println!("INFO: Execution time: {}ms", t_start.elapsed().as_millis());
        print_batch_summary(&results);
        return Ok(());
    }

    let options = RaceOptions {
        auto_mode: sim_opts.auto,
        strategy_choice: sim_opts.strategy,
        seed: sim_opts.seed,
        controlled_drivers: controlled.to_owned(),
    };
    let mut repo = data.strategy_repository();

    let results = if sim_opts.auto {
        // narration is printed by a separate thread while the race runs headless
        let (tx, rx) = flume::unbounded::<LapReport>();
        let printer = thread::spawn(move || {
            for report in rx.iter() {
                print!("{}", report);
            }
        });
        let results = simulate_race(&data, &mut repo, &circuit_id, driver_names, &options, None, Some(&tx));
        drop(tx);
        let _ = printer.join();
        results?
    } else {
        let mut controller = StdinController::new(controlled);
        controller.print_help();
        simulate_race(
            &data,
            &mut repo,
            &circuit_id,
            driver_names,
            &options,
            Some(&mut controller),
            None,
        )?
    };

    // POST-PROCESSING -----------------------------------------------------------------------------
    results.print_classification();

    if let Some(path) = &sim_opts.export_laps {
        results.write_lap_times_csv(path)?;
        println!("INFO: Lap times written to {}", path.display());
    }

    if !sim_opts.no_save {
        let earned = save.credit_prize_money(&results);
        save.append_race(&results);
        save.save(&sim_opts.save_file)?;
        println!(
            "INFO: Earned ${} (balance ${}), progress saved to {}",
            earned,
            save.money,
            sim_opts.save_file.display()
        );
    }

    Ok(())
}
