//! Encounter definition schema

use super::unit::UnitDef;
use crate::error::{Error, Result};
use combatsim_core::{Encounter, SimConfig, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Definition of an encounter: who fights, who acts, who must die
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDef {
    pub name: String,
    /// Unit driven by the rotation
    pub player: UnitId,
    /// Primary target; its death ends the run
    pub target: UnitId,
    pub units: Vec<UnitDef>,
    /// Settings overriding the defaults
    #[serde(default)]
    pub config: SimConfig,
}

impl EncounterDef {
    /// Validate the unit list and build the runtime encounter
    pub fn to_encounter(&self) -> Result<Encounter> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id) {
                return Err(Error::DuplicateDefinition(format!(
                    "unit {} in encounter '{}'",
                    unit.id, self.name
                )));
            }
        }
        for (role, id) in [("player", self.player), ("target", self.target)] {
            if !seen.contains(&id) {
                return Err(Error::UnknownUnit {
                    role,
                    unit: id,
                    encounter: self.name.clone(),
                });
            }
        }

        Ok(Encounter {
            units: self.units.iter().map(UnitDef::to_unit).collect(),
            player: self.player,
            target: self.target,
        })
    }
}
