use crate::core::strategy::StrategyChoice;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "f1manager",
    about = "A turn-based racing management game with a lap-by-lap race simulation"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Run without pausing after each lap (no player input is read)
    #[clap(short, long)]
    pub auto: bool,

    /// Do not write the results into the save file
    #[clap(long)]
    pub no_save: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Circuit id to race on, e.g. monza (default: first circuit not raced yet)
    #[clap(short, long)]
    pub circuit: Option<String>,

    /// Comma separated list of drivers taking part (default: all drivers)
    #[clap(long, use_value_delimiter = true)]
    pub drivers: Vec<String>,

    /// Comma separated list of drivers the player controls (default: drivers of the save game)
    #[clap(long, use_value_delimiter = true)]
    pub controlled: Vec<String>,

    /// Seed for reproducible races
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Strategy preset of the circuit: default or alternate
    #[clap(long, default_value = "default")]
    pub strategy: StrategyChoice,

    /// Set number of headless simulation runs (values > 1 imply --auto and --no-save)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Directory containing the game data files
    #[clap(long, default_value = "input/parameters")]
    pub data_dir: PathBuf,

    /// Save game file
    #[clap(long, default_value = "save_data.json")]
    pub save_file: PathBuf,

    /// Simulation constants file overriding the one in the data directory
    #[clap(long)]
    pub consts_path: Option<PathBuf>,

    /// Write the lap times of the race to this CSV file
    #[clap(long)]
    pub export_laps: Option<PathBuf>,
}

impl SimOpts {
    pub fn is_batch(&self) -> bool {
        self.no_sim_runs > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_choice() {
        let opts = SimOpts::parse_from([
            "f1manager",
            "--circuit",
            "monza",
            "--drivers",
            "Max Verstappen,Lando Norris",
            "--strategy",
            "alternate",
            "-n",
            "8",
            "--seed",
            "5",
        ]);
        assert_eq!(opts.circuit.as_deref(), Some("monza"));
        assert_eq!(opts.drivers, vec!["Max Verstappen", "Lando Norris"]);
        assert_eq!(opts.strategy, StrategyChoice::Alternate);
        assert_eq!(opts.seed, Some(5));
        assert!(opts.is_batch());
        assert!(!opts.auto);
    }
}
