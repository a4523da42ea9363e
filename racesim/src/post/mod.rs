pub mod race_result;
pub mod save_game;
