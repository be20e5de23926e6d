//! Map configuration — the static city and connection tables.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub cities: Vec<CityConfig>,
    pub connections: Vec<(String, String)>,
}

impl MapConfig {
    /// Load from the data/ directory.
    /// In tests, use MapConfig::default_demo().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/map/cities.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: MapConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// The demo network: eight Pakistani cities, nine connections.
    pub fn default_demo() -> Self {
        let city = |name: &str, x: f64, y: f64| CityConfig {
            name: name.into(),
            x,
            y,
        };
        let edge = |a: &str, b: &str| (a.to_string(), b.to_string());
        Self {
            cities: vec![
                city("Karachi", 20.0, 85.0),
                city("Hyderabad", 28.0, 78.0),
                city("Sukkur", 35.0, 65.0),
                city("Quetta", 15.0, 55.0),
                city("Multan", 50.0, 50.0),
                city("Lahore", 70.0, 40.0),
                city("Islamabad", 60.0, 20.0),
                city("Peshawar", 50.0, 15.0),
            ],
            connections: vec![
                edge("Karachi", "Hyderabad"),
                edge("Hyderabad", "Sukkur"),
                edge("Sukkur", "Multan"),
                edge("Sukkur", "Quetta"),
                edge("Quetta", "Multan"),
                edge("Multan", "Lahore"),
                edge("Lahore", "Islamabad"),
                edge("Multan", "Islamabad"),
                edge("Islamabad", "Peshawar"),
            ],
        }
    }
}
