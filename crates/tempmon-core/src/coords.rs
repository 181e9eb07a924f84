//! Object id to world position

use std::sync::Arc;
use tracing::trace;

use crate::device::DbId;
use crate::geometry::Point3;
use crate::host::{HostError, SpatialIndex};

/// Places a sensor on the floor of an object, centered in its footprint
#[derive(Clone)]
pub struct CoordinateResolver {
    spatial: Arc<dyn SpatialIndex>,
}

impl CoordinateResolver {
    pub fn new(spatial: Arc<dyn SpatialIndex>) -> Self {
        Self { spatial }
    }

    /// `None` when the object has no usable geometry
    pub async fn resolve(&self, db_id: DbId) -> Result<Option<Point3>, HostError> {
        let bounds = self.spatial.node_box(db_id).await?;
        if bounds.is_unbounded() {
            trace!(db_id = %db_id, "Object has no geometry");
            return Ok(None);
        }

        let position = bounds.base_center();
        if !position.is_finite() {
            trace!(db_id = %db_id, "Object bounds are not finite");
            return Ok(None);
        }
        Ok(Some(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Index(HashMap<DbId, BoundingBox>);

    #[async_trait]
    impl SpatialIndex for Index {
        async fn node_box(&self, db_id: DbId) -> Result<BoundingBox, HostError> {
            Ok(self.0.get(&db_id).copied().unwrap_or(BoundingBox::EMPTY))
        }
    }

    fn resolver() -> CoordinateResolver {
        let mut boxes = HashMap::new();
        boxes.insert(DbId(1), BoundingBox::from_flat([0.0, 0.0, 0.0, 2.0, 4.0, 3.0]));
        boxes.insert(DbId(2), BoundingBox::EMPTY);
        boxes.insert(
            DbId(3),
            BoundingBox::from_flat([0.0, f64::NEG_INFINITY, 0.0, 1.0, 1.0, 1.0]),
        );
        CoordinateResolver::new(Arc::new(Index(boxes)))
    }

    #[tokio::test]
    async fn test_resolve_base_center() {
        let position = resolver().resolve(DbId(1)).await.unwrap();
        assert_eq!(position, Some(Point3::new(1.0, 2.0, 0.0)));
    }

    #[tokio::test]
    async fn test_resolve_unbounded_is_none() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(DbId(2)).await.unwrap(), None);
        assert_eq!(resolver.resolve(DbId(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_non_finite_is_none() {
        assert_eq!(resolver().resolve(DbId(3)).await.unwrap(), None);
    }
}
