use serde::{Deserialize, Serialize};

/// Car and team parameters. All performance attributes are fractions, roughly 0.80 - 1.00, and
/// default to 0.90 if missing in the data.
/// * `name` - Team name
/// * `aliases` - Alternative names drivers may reference the team by (e.g. "Red Bull")
/// * `aero`, `power`, `grip`, `tyre_grip`, `suspension`, `brakes`, `weight`,
/// `fuel_efficiency`, `wear` - Car performance attributes
/// * `reliability` - Probability of surviving a mechanical check
/// * `pit_stop_speed` - Pit crew quality, 1.0 is the fastest possible crew
/// * `tyre_wear` - Tyre management ability of the car
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TeamPars {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_attr")]
    pub aero: f64,
    #[serde(default = "default_attr")]
    pub power: f64,
    #[serde(default = "default_attr")]
    pub grip: f64,
    #[serde(default = "default_attr")]
    pub tyre_grip: f64,
    #[serde(default = "default_attr")]
    pub suspension: f64,
    #[serde(default = "default_attr")]
    pub brakes: f64,
    #[serde(default = "default_attr")]
    pub weight: f64,
    #[serde(default = "default_attr")]
    pub fuel_efficiency: f64,
    #[serde(default = "default_attr")]
    pub wear: f64,
    #[serde(default = "default_attr")]
    pub reliability: f64,
    #[serde(default = "default_attr")]
    pub pit_stop_speed: f64,
    #[serde(default = "default_attr")]
    pub tyre_wear: f64,
}

pub const DEFAULT_ATTRIBUTE: f64 = 0.90;
const SYNTHESIZED_ATTRIBUTE: f64 = 0.85;

fn default_attr() -> f64 {
    DEFAULT_ATTRIBUTE
}

impl TeamPars {
    /// Creates a team with every attribute at the data default.
    pub fn new(name: &str) -> TeamPars {
        TeamPars {
            name: name.to_owned(),
            aliases: Vec::new(),
            aero: DEFAULT_ATTRIBUTE,
            power: DEFAULT_ATTRIBUTE,
            grip: DEFAULT_ATTRIBUTE,
            tyre_grip: DEFAULT_ATTRIBUTE,
            suspension: DEFAULT_ATTRIBUTE,
            brakes: DEFAULT_ATTRIBUTE,
            weight: DEFAULT_ATTRIBUTE,
            fuel_efficiency: DEFAULT_ATTRIBUTE,
            wear: DEFAULT_ATTRIBUTE,
            reliability: DEFAULT_ATTRIBUTE,
            pit_stop_speed: DEFAULT_ATTRIBUTE,
            tyre_wear: DEFAULT_ATTRIBUTE,
        }
    }

    /// Conservative profile used for drivers whose team has no entry in the data.
    pub fn synthesized(name: &str) -> TeamPars {
        TeamPars {
            aero: SYNTHESIZED_ATTRIBUTE,
            power: SYNTHESIZED_ATTRIBUTE,
            grip: SYNTHESIZED_ATTRIBUTE,
            tyre_grip: SYNTHESIZED_ATTRIBUTE,
            suspension: SYNTHESIZED_ATTRIBUTE,
            brakes: SYNTHESIZED_ATTRIBUTE,
            weight: SYNTHESIZED_ATTRIBUTE,
            fuel_efficiency: SYNTHESIZED_ATTRIBUTE,
            wear: SYNTHESIZED_ATTRIBUTE,
            reliability: DEFAULT_ATTRIBUTE,
            pit_stop_speed: SYNTHESIZED_ATTRIBUTE,
            tyre_wear: SYNTHESIZED_ATTRIBUTE,
            ..TeamPars::new(name)
        }
    }

    /// Returns true if the given name is the team's name or one of its aliases.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Overwrites a single attribute by its data key (used for upgraded stats from the save
    /// file). Returns false for unknown keys.
    pub fn set_attribute(&mut self, key: &str, value: f64) -> bool {
        let slot = match key {
            "aero" => &mut self.aero,
            "power" => &mut self.power,
            "grip" => &mut self.grip,
            "tyre_grip" => &mut self.tyre_grip,
            "suspension" => &mut self.suspension,
            "brakes" => &mut self.brakes,
            "weight" => &mut self.weight,
            "fuel_efficiency" => &mut self.fuel_efficiency,
            "wear" => &mut self.wear,
            "reliability" => &mut self.reliability,
            "pit_stop_speed" => &mut self.pit_stop_speed,
            "tyre_wear" => &mut self.tyre_wear,
            _ => return false,
        };
        *slot = value.clamp(0.0, 1.0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_default_to_baseline() {
        let team: TeamPars = serde_json::from_str(r#"{"name": "Williams", "aero": 0.87}"#).unwrap();
        assert_eq!(team.aero, 0.87);
        assert_eq!(team.power, DEFAULT_ATTRIBUTE);
        assert_eq!(team.pit_stop_speed, DEFAULT_ATTRIBUTE);
    }

    #[test]
    fn aliases_and_attribute_overrides() {
        let mut team = TeamPars::new("Oracle Red Bull Racing");
        team.aliases.push("Red Bull".to_owned());
        assert!(team.matches_name("red bull"));
        assert!(!team.matches_name("Ferrari"));
        assert!(team.set_attribute("power", 1.2));
        assert_eq!(team.power, 1.0);
        assert!(!team.set_attribute("budget", 0.5));
    }
}
