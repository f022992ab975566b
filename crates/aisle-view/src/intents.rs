//! Mutation intents emitted to the collaborators that own the data
//!
//! The view never edits its input collections. Committed gestures become
//! intents; the owner applies them and feeds the new state back in.

use aisle_core::{EntityId, FloorPoint, ObjectKind, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    ObjectCreate {
        kind: ObjectKind,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
    },
    ObjectUpdate {
        id: EntityId,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
    },
    ObjectRemove {
        id: EntityId,
    },
    SensorUpdate {
        id: EntityId,
        position: Vec3,
        rotation: Vec3,
    },
    SensorRemove {
        id: EntityId,
    },
    RegionCreate {
        name: String,
        vertices: Vec<FloorPoint>,
    },
    RegionUpdate {
        id: EntityId,
        vertices: Vec<FloorPoint>,
        name: String,
    },
    RegionRemove {
        id: EntityId,
    },
    SelectionChanged {
        object: Option<EntityId>,
        sensor: Option<EntityId>,
        region: Option<EntityId>,
    },
    HoveredRegion {
        id: Option<EntityId>,
    },
    /// Ask the detail-view collaborator to open a region
    OpenRegionDetail {
        id: EntityId,
    },
}

impl Intent {
    /// Whether this intent asks a collaborator to change stored data
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Intent::SelectionChanged { .. } | Intent::HoveredRegion { .. } | Intent::OpenRegionDetail { .. }
        )
    }
}

/// Queue of intents that the host drains after each event
pub struct IntentBus {
    intents: Vec<Intent>,
}

impl Default for IntentBus {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentBus {
    pub fn new() -> Self {
        Self { intents: Vec::new() }
    }

    pub fn push(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    /// Take every pending intent, oldest first
    pub fn drain(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }

    pub fn pending(&self) -> &[Intent] {
        &self.intents
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain() {
        let mut bus = IntentBus::new();
        assert!(bus.is_empty());

        bus.push(Intent::ObjectRemove { id: "o1".into() });
        bus.push(Intent::HoveredRegion { id: None });
        assert_eq!(bus.len(), 2);

        let intents = bus.drain();
        assert_eq!(intents.len(), 2);
        assert!(intents[0].is_mutation());
        assert!(!intents[1].is_mutation());
        assert!(bus.is_empty());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_intent_json_shape() {
        let intent = Intent::RegionUpdate {
            id: "r1".into(),
            vertices: vec![FloorPoint::new(1.0, 2.0)],
            name: "Front".into(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["intent"], "region_update");
        assert_eq!(json["id"], "r1");
        assert_eq!(json["vertices"][0]["z"], 2.0);
    }
}
