//! RON script loader

use crate::error::{Error, Result};
use crate::schema::EncounterDef;
use combatsim_core::{
    AuraDefinition, Encounter, ItemDefinition, PriorityRotation, RotationCatalog, SpellBook,
    SpellDefinition, SpellEffect, SpellId, StaticData,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loaded combat data
#[derive(Debug, Default, Clone)]
pub struct GameData {
    /// Spells, auras and items
    pub book: SpellBook,
    /// Priority rotations in load order
    pub rotations: Vec<PriorityRotation>,
    /// The encounter, if any file defined one
    pub encounter: Option<EncounterDef>,
}

impl GameData {
    /// Create empty game data
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a rotation by name
    pub fn get_rotation(&self, name: &str) -> Option<&PriorityRotation> {
        self.rotations.iter().find(|r| r.name == name)
    }

    /// Catalog with every loaded rotation registered under its name
    pub fn catalog(&self) -> RotationCatalog {
        let mut catalog = RotationCatalog::new();
        for rotation in &self.rotations {
            catalog.register_priority(rotation.clone());
        }
        catalog
    }

    /// Build the runtime encounter
    pub fn encounter(&self) -> Result<Encounter> {
        self.encounter
            .as_ref()
            .ok_or(Error::NoEncounter)?
            .to_encounter()
    }

    /// Check that every cross reference resolves
    ///
    /// Spell effects must name known auras and spells, rotations must name
    /// known spells, and encounter units must equip known items.
    pub fn validate(&self) -> Result<()> {
        for spell in self.book.spells.values() {
            for effect in &spell.effects {
                match effect {
                    SpellEffect::ApplyAura { aura, .. }
                    | SpellEffect::Proc { aura, .. }
                    | SpellEffect::ConsumeAura { aura, .. } => {
                        self.book.aura(*aura)?;
                    }
                    SpellEffect::ResetCooldown { spell } => {
                        self.book.spell(*spell)?;
                    }
                    _ => {}
                }
            }
        }

        for rotation in &self.rotations {
            for entry in &rotation.entries {
                self.book.spell(entry.spell)?;
            }
        }

        if let Some(encounter) = &self.encounter {
            for unit in &encounter.units {
                for item in &unit.items {
                    self.book.item(*item)?;
                }
            }
            encounter.to_encounter()?;
        }
        Ok(())
    }
}

/// One script file; every section is optional
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScriptFile {
    spells: Vec<SpellDefinition>,
    auras: Vec<AuraDefinition>,
    items: Vec<ItemDefinition>,
    rotations: Vec<PriorityRotation>,
    encounter: Option<EncounterDef>,
}

/// Loader for RON combat scripts
///
/// Definitions accumulate across files; defining the same id twice is an
/// error regardless of which file it came from.
pub struct Loader {
    data: GameData,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            data: GameData::new(),
        }
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loading script");
        self.load_str(&content)
    }

    /// Load definitions from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file: ScriptFile = ron::from_str(content)?;

        for spell in file.spells {
            if self.data.book.spells.contains_key(&spell.id) {
                return Err(Error::DuplicateDefinition(spell.id.to_string()));
            }
            self.data.book.insert_spell(spell);
        }

        for aura in file.auras {
            if self.data.book.auras.contains_key(&aura.id) {
                return Err(Error::DuplicateDefinition(format!("aura {}", aura.id)));
            }
            self.data.book.insert_aura(aura);
        }

        for item in file.items {
            if self.data.book.items.contains_key(&item.id) {
                return Err(Error::DuplicateDefinition(item.id.to_string()));
            }
            self.data.book.insert_item(item);
        }

        for rotation in file.rotations {
            if self.data.get_rotation(&rotation.name).is_some() {
                return Err(Error::DuplicateDefinition(format!(
                    "rotation '{}'",
                    rotation.name
                )));
            }
            self.data.rotations.push(rotation);
        }

        if let Some(encounter) = file.encounter {
            if let Some(existing) = &self.data.encounter {
                return Err(Error::DuplicateDefinition(format!(
                    "encounter '{}' (already loaded '{}')",
                    encounter.name, existing.name
                )));
            }
            self.data.encounter = Some(encounter);
        }

        Ok(())
    }

    /// Load all RON files from a directory
    ///
    /// Entries are visited in file-name order so that duplicate errors are
    /// reported the same way on every platform.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading and return the validated data
    pub fn finish(self) -> Result<GameData> {
        self.data.validate()?;
        Ok(self.data)
    }

    /// Get the current data (for inspection during loading)
    pub fn data(&self) -> &GameData {
        &self.data
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
