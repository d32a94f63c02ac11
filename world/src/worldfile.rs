//! Declarative world construction.
//!
//! A world is described by a [`WorldSpec`] (plain serde data, usually read
//! from a JSON file) and wired into a live [`Location`] graph by
//! [`World::build`], which validates names, exit destinations, and the
//! starting location before anything goes live.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::Character;
use crate::location::Location;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("duplicate location name '{0}'")]
    DuplicateLocation(String),
    #[error("exit '{exit}' from '{from}' leads to unknown location '{to}'")]
    UnknownDestination { from: String, exit: String, to: String },
    #[error("starting location '{0}' does not exist")]
    UnknownStart(String),
    #[error("failed to read world file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse world file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Declarative description of a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSpec {
    /// Name of the location new characters appear at.
    pub start: String,
    pub locations: Vec<LocationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: Vec<ExitSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSpec {
    pub name: String,
    pub to: String,
}

/// A built world. Owns every location strongly; everything else in the
/// graph is weak references.
pub struct World {
    locations: IndexMap<String, Rc<Location>>,
    start: Rc<Location>,
}

impl World {
    /// Wires a [`WorldSpec`] into a live location graph.
    pub fn build(spec: &WorldSpec) -> Result<Self, WorldError> {
        let mut locations: IndexMap<String, Rc<Location>> = IndexMap::new();
        for location in &spec.locations {
            if locations.contains_key(&location.name) {
                return Err(WorldError::DuplicateLocation(location.name.clone()));
            }
            locations.insert(
                location.name.clone(),
                Location::new(&location.name, &location.description),
            );
        }
        for location in &spec.locations {
            if let Some(from) = locations.get(&location.name) {
                for exit in &location.exits {
                    let destination =
                        locations.get(&exit.to).ok_or_else(|| WorldError::UnknownDestination {
                            from: location.name.clone(),
                            exit: exit.name.clone(),
                            to: exit.to.clone(),
                        })?;
                    from.add_exit(&exit.name, destination);
                }
            }
        }
        let start = locations
            .get(&spec.start)
            .cloned()
            .ok_or_else(|| WorldError::UnknownStart(spec.start.clone()))?;
        info!("world built: {} locations, starting at {}", locations.len(), start.name());
        Ok(Self { locations, start })
    }

    /// Reads and builds a JSON world file.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let text = fs::read_to_string(path)?;
        let spec: WorldSpec = serde_json::from_str(&text)?;
        Self::build(&spec)
    }

    /// The location new characters appear at.
    pub fn start(&self) -> &Rc<Location> {
        &self.start
    }

    pub fn location(&self, name: &str) -> Option<&Rc<Location>> {
        self.locations.get(name)
    }

    /// Location names, in declaration order.
    pub fn location_names(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    /// Creates a character at the starting location.
    pub fn spawn(&self, name: &str) -> Rc<Character> {
        Character::spawn(name, &self.start)
    }
}

/// The world used when no file is given: three locations around a fountain
/// square.
pub fn demo_spec() -> WorldSpec {
    WorldSpec {
        start: "Fountain Square".to_string(),
        locations: vec![
            LocationSpec {
                name: "Fountain Square".to_string(),
                description: "A broad plaza around a dry stone fountain.".to_string(),
                exits: vec![
                    ExitSpec {
                        name: "north".to_string(),
                        to: "Old Library".to_string(),
                    },
                    ExitSpec {
                        name: "east".to_string(),
                        to: "Market Row".to_string(),
                    },
                ],
            },
            LocationSpec {
                name: "Old Library".to_string(),
                description: "Shelves lean together under a cracked skylight.".to_string(),
                exits: vec![ExitSpec {
                    name: "south".to_string(),
                    to: "Fountain Square".to_string(),
                }],
            },
            LocationSpec {
                name: "Market Row".to_string(),
                description: "Empty stalls and the smell of old spice.".to_string(),
                exits: vec![ExitSpec {
                    name: "west".to_string(),
                    to: "Fountain Square".to_string(),
                }],
            },
        ],
    }
}
