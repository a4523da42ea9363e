pub mod car;
pub mod driver;
pub mod handle_race;
pub mod performance;
pub mod pit_strategy;
pub mod race;
pub mod rng;
pub mod sim_constants;
pub mod state_handler;
pub mod strategy;
pub mod tireset;
pub mod track;
