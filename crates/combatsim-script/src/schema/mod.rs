//! Schema definitions for RON scripts
//!
//! Spells, auras, items and priority rotations deserialize straight into
//! the core types. Only encounters need a file-level shape of their own.

pub mod encounter;
pub mod unit;

pub use encounter::EncounterDef;
pub use unit::{PoolDef, UnitDef};
