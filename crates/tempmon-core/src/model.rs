//! Model snapshot host
//!
//! A JSON export of a model's property database, object bounds and level
//! structure, served through the same host capabilities a live viewer
//! provides.
//!
//! ```json
//! {
//!   "attributes": [{ "id": 1, "name": "Type Name" }],
//!   "objects": [
//!     { "db_id": 7, "properties": [{ "attribute_id": 1, "value": "Junction Box" }],
//!       "bounds": [0, 0, 0, 1, 1, 1] }
//!   ],
//!   "levels": [
//!     { "name": "Level 1", "rooms": [{ "name": "Office", "bounds": [0, 0, 0, 4, 4, 3] }] }
//!   ]
//! }
//! ```
//!
//! Missing `bounds` means the object has no geometry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::device::DbId;
use crate::geometry::BoundingBox;
use crate::host::{HostError, LevelSelector, LevelStructure, PropertyDatabase, Room, SpatialIndex};
use crate::locator::{evaluate, AttributeDef, Property, PropertyEnumerator, PropertyQuery, QueryOutcome};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid model snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Object {0} appears more than once")]
    DuplicateObject(DbId),
    #[error("Object {db_id} references unknown attribute {attribute_id}")]
    UnknownAttribute { db_id: DbId, attribute_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub db_id: DbId,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`
    #[serde(default)]
    pub bounds: Option<[f64; 6]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub name: String,
    #[serde(default)]
    pub bounds: Option<[f64; 6]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
}

/// Serialized form of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub levels: Vec<LevelRecord>,
}

fn to_bounds(flat: Option<[f64; 6]>) -> BoundingBox {
    flat.map(BoundingBox::from_flat).unwrap_or(BoundingBox::EMPTY)
}

/// Loaded model answering host capability calls
#[derive(Debug)]
pub struct SnapshotModel {
    attributes: Vec<AttributeDef>,
    objects: BTreeMap<DbId, ObjectRecord>,
    levels: Vec<LevelRecord>,
    selected_level: RwLock<Option<String>>,
}

impl SnapshotModel {
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, ModelError> {
        let attribute_ids: HashSet<u32> = snapshot.attributes.iter().map(|a| a.id).collect();
        let mut objects = BTreeMap::new();
        for object in snapshot.objects {
            if let Some(property) = object
                .properties
                .iter()
                .find(|p| !attribute_ids.contains(&p.attribute_id))
            {
                return Err(ModelError::UnknownAttribute {
                    db_id: object.db_id,
                    attribute_id: property.attribute_id,
                });
            }
            let db_id = object.db_id;
            if objects.insert(db_id, object).is_some() {
                return Err(ModelError::DuplicateObject(db_id));
            }
        }

        Ok(Self {
            attributes: snapshot.attributes,
            objects,
            levels: snapshot.levels,
            selected_level: RwLock::new(None),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            objects = model.objects.len(),
            attributes = model.attributes.len(),
            levels = model.levels.len(),
            "Loaded model snapshot"
        );
        Ok(model)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn level_names(&self) -> Vec<String> {
        self.levels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn selected_level(&self) -> Option<String> {
        self.selected_level
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl PropertyEnumerator for SnapshotModel {
    fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    fn object_ids(&self) -> Vec<DbId> {
        self.objects.keys().copied().collect()
    }

    fn object_properties(&self, db_id: DbId) -> &[Property] {
        self.objects
            .get(&db_id)
            .map(|o| o.properties.as_slice())
            .unwrap_or(&[])
    }
}

#[async_trait]
impl PropertyDatabase for SnapshotModel {
    async fn execute(&self, query: &PropertyQuery) -> Result<QueryOutcome, HostError> {
        Ok(evaluate(self, query))
    }
}

#[async_trait]
impl SpatialIndex for SnapshotModel {
    async fn node_box(&self, db_id: DbId) -> Result<BoundingBox, HostError> {
        Ok(self
            .objects
            .get(&db_id)
            .map(|o| to_bounds(o.bounds))
            .unwrap_or(BoundingBox::EMPTY))
    }
}

#[async_trait]
impl LevelStructure for SnapshotModel {
    async fn rooms_on_level(&self, level: &str) -> Result<Vec<Room>, HostError> {
        let rooms = self
            .levels
            .iter()
            .find(|l| l.name == level)
            .map(|l| {
                l.rooms
                    .iter()
                    .map(|r| Room {
                        name: r.name.clone(),
                        bounds: to_bounds(r.bounds),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rooms)
    }
}

#[async_trait]
impl LevelSelector for SnapshotModel {
    async fn select_level(&self, level: &str) -> Result<bool, HostError> {
        if !self.levels.iter().any(|l| l.name == level) {
            debug!(level = %level, "Unknown level");
            return Ok(false);
        }
        *self
            .selected_level
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(level.to_string());
        debug!(level = %level, "Level selected");
        Ok(true)
    }
}
