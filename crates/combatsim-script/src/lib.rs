//! Combatsim Script - RON loader for combat data
//!
//! Loads simulation content from RON files:
//! - Spell, aura and item definitions
//! - Priority rotations with conditions
//! - Encounter definitions (units, player, primary target, config overrides)
//!
//! Every file is a struct with optional `spells`, `auras`, `items`,
//! `rotations` and `encounter` sections:
//!
//! ```
//! use combatsim_script::Loader;
//!
//! let mut loader = Loader::new();
//! loader
//!     .load_str(r#"(spells: [(id: 1, name: "Strike", effects: [Damage(base: 100.0)])])"#)
//!     .unwrap();
//! let data = loader.finish().unwrap();
//! assert_eq!(data.book.spells.len(), 1);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{GameData, Loader};
pub use schema::{EncounterDef, PoolDef, UnitDef};
