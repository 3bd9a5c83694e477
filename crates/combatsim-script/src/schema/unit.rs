//! Unit definition schema

use combatsim_core::{ItemId, Position, ResourceKind, ResourcePool, Unit, UnitId, UnitKind, UnitStats};
use serde::{Deserialize, Serialize};

/// A resource pool as written in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDef {
    pub kind: ResourceKind,
    pub max: f64,
    /// Starting value; defaults to `max`
    #[serde(default)]
    pub current: Option<f64>,
    /// Natural regeneration per second
    #[serde(default)]
    pub regen_per_sec: f64,
}

impl PoolDef {
    pub fn to_pool(&self) -> ResourcePool {
        ResourcePool::new(self.current.unwrap_or(self.max), self.max).with_regen(self.regen_per_sec)
    }
}

/// Definition of a unit taking part in an encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    #[serde(default)]
    pub resources: Vec<PoolDef>,
    /// Base stats before items and auras
    #[serde(default)]
    pub stats: UnitStats,
    #[serde(default)]
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub position: Position,
}

impl UnitDef {
    /// Create a unit definition with no resources
    pub fn new(id: UnitId, name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            resources: Vec::new(),
            stats: UnitStats::default(),
            items: Vec::new(),
            position: Position::default(),
        }
    }

    /// Build the runtime unit
    ///
    /// Item stats are folded in later, when the unit joins a simulation.
    pub fn to_unit(&self) -> Unit {
        let mut unit = Unit::new(self.id, self.name.clone(), self.kind)
            .with_stats(self.stats)
            .with_position(self.position);
        for pool in &self.resources {
            unit = unit.with_resource(pool.kind, pool.to_pool());
        }
        for item in &self.items {
            unit = unit.with_item(*item);
        }
        unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_def_ron() {
        let ron_str = r#"
        (
            id: 1,
            name: "Rogue",
            kind: Player,
            resources: [
                (kind: Health, max: 20000.0),
                (kind: Energy, max: 100.0, current: Some(40.0), regen_per_sec: 10.0),
            ],
            stats: (attack_power: 3000.0, crit_pct: 25.0),
            items: [7],
        )
        "#;

        let def: UnitDef = ron::from_str(ron_str).unwrap();
        let unit = def.to_unit();
        assert_eq!(unit.id, UnitId(1));
        assert_eq!(unit.health(), 20000.0);
        assert_eq!(unit.resource(ResourceKind::Energy), 40.0);
        assert_eq!(unit.resources[&ResourceKind::Energy].regen_per_sec, 10.0);
        assert_eq!(unit.stats.attack_power, 3000.0);
        assert_eq!(unit.items, vec![ItemId(7)]);
    }
}
