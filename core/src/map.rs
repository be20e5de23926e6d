//! The transport graph — cities with display coordinates and the
//! undirected connection list between them.
//!
//! The map is built once at startup and never mutated. Coordinates are
//! percentages of the viewport (0–100, origin top-left); the render sink
//! scales them to pixels.

use crate::{
    config::MapConfig,
    error::{TrackError, TrackResult},
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug)]
pub struct CityMap {
    cities: Vec<City>,
    index: HashMap<String, usize>,
    connections: Vec<(String, String)>,
}

impl CityMap {
    /// Build and validate a map. Every connection must reference two known
    /// cities and city names must be unique.
    pub fn new(cities: Vec<City>, connections: Vec<(String, String)>) -> TrackResult<Self> {
        let mut index = HashMap::with_capacity(cities.len());
        for (i, city) in cities.iter().enumerate() {
            if index.insert(city.name.clone(), i).is_some() {
                return Err(TrackError::DuplicateCity {
                    name: city.name.clone(),
                });
            }
        }
        for (a, b) in &connections {
            for name in [a, b] {
                if !index.contains_key(name) {
                    return Err(TrackError::UnknownCity { name: name.clone() });
                }
            }
        }
        Ok(Self {
            cities,
            index,
            connections,
        })
    }

    pub fn from_config(config: &MapConfig) -> TrackResult<Self> {
        let cities = config
            .cities
            .iter()
            .map(|c| City {
                name: c.name.clone(),
                x: c.x,
                y: c.y,
            })
            .collect();
        Self::new(cities, config.connections.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn city(&self, name: &str) -> Option<&City> {
        self.index.get(name).map(|&i| &self.cities[i])
    }

    /// Like city(), but an unknown name is an error. For path members,
    /// which are known to exist by construction.
    pub fn require(&self, name: &str) -> TrackResult<&City> {
        self.city(name).ok_or_else(|| TrackError::UnknownCity {
            name: name.to_string(),
        })
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn connections(&self) -> &[(String, String)] {
        &self.connections
    }

    /// Neighbors of a city, symmetric over the undirected connection list.
    /// Order follows the connection table, so BFS expansion is stable.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let mut out = Vec::new();
        for (a, b) in &self.connections {
            if a == name {
                out.push(b.as_str());
            }
            if b == name {
                out.push(a.as_str());
            }
        }
        out
    }
}
