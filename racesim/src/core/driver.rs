use serde::{Deserialize, Serialize};

/// * `name` - Driver name, e.g. Valtteri Bottas
/// * `team` - Name of the team the driver races for
/// * `pace` - Raw race pace (0-100)
/// * `racecraft` - Wheel-to-wheel ability (0-100)
/// * `qualifying` - One-lap pace (0-100)
/// * `experience` - Experience level (0-100), reduces qualifying scatter
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverPars {
    pub name: String,
    #[serde(default)]
    pub team: String,
    #[serde(default = "default_rating")]
    pub pace: f64,
    #[serde(default = "default_rating")]
    pub racecraft: f64,
    #[serde(default = "default_rating")]
    pub qualifying: f64,
    #[serde(default = "default_rating")]
    pub experience: f64,
}

fn default_rating() -> f64 {
    80.0
}

impl DriverPars {
    /// Creates a driver with all ratings at their default of 80.
    pub fn new(name: &str, team: &str) -> DriverPars {
        DriverPars {
            name: name.to_owned(),
            team: team.to_owned(),
            pace: default_rating(),
            racecraft: default_rating(),
            qualifying: default_rating(),
            experience: default_rating(),
        }
    }
}
