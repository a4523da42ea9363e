use approx::assert_relative_eq;
use racesim::core::driver::DriverPars;
use racesim::core::handle_race::{simulate_race, RaceOptions};
use racesim::post::save_game::SaveState;
use racesim::pre::read_sim_pars::read_game_data;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("input")
        .join("parameters")
}

#[test]
fn race_results_survive_the_save_file() {
    let mut data = read_game_data(&data_dir(), None).unwrap();

    let mut upgraded = DriverPars::new("Lando Norris", "McLaren");
    upgraded.pace = 99.0;
    let mut save = SaveState {
        selected_team: Some("McLaren".to_owned()),
        drivers: vec![upgraded, DriverPars::new("Oscar Piastri", "McLaren")],
        money: 0,
        team_stats: BTreeMap::from([("aero".to_owned(), 0.99), ("budget".to_owned(), 1.0)]),
        races: vec![],
    };
    save.apply_to(&mut data);

    assert_eq!(data.find_driver("Lando Norris").map(|d| d.pace), Some(99.0));
    assert_eq!(data.find_team("McLaren").map(|t| t.aero), Some(0.99));

    let mut repo = data.strategy_repository();
    let options = RaceOptions {
        auto_mode: true,
        seed: Some(99),
        controlled_drivers: save.player_driver_names(),
        ..RaceOptions::default()
    };
    let results = simulate_race(&data, &mut repo, "spa", None, &options, None, None).unwrap();

    save.credit_prize_money(&results);
    save.append_race(&results);

    let path = std::env::temp_dir().join(format!("f1manager_it_{}.json", std::process::id()));
    save.save(&path).unwrap();
    let loaded = SaveState::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.money, save.money);
    assert!(loaded.completed_circuits().contains("spa"));

    let history = &loaded.races[0];
    assert_eq!(history.circuit.name, "Circuit de Spa-Francorchamps");
    assert_eq!(history.results.len(), results.records.len());
    for entry in history.results.iter() {
        let record = results.get(&entry.driver).unwrap();
        assert_eq!(entry.position, record.position);
        assert_relative_eq!(entry.total_time, record.total_time, epsilon = 1e-9);
        assert_eq!(entry.incident, record.incident);
    }
}
