use geoprovider_core::models::clone_table_structure;
use geoprovider_core::{
    Envelope, FeatureId, FeatureRow, FeatureTable, Geometry, GeometryFactory, ProviderError,
    Result,
};
use rstar::{RTree, RTreeObject, SelectionFunction, AABB};
use std::collections::BTreeMap;

/// Envelope entry in the R-tree
#[derive(Debug, Clone, PartialEq)]
struct IndexedFeature {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Selects entries whose envelope intersects a query box
struct IntersectingEnvelope(Envelope);

impl SelectionFunction<IndexedFeature> for IntersectingEnvelope {
    fn should_unpack_parent(&self, envelope: &AABB<[f64; 2]>) -> bool {
        self.0.intersects(&Envelope::from(*envelope))
    }

    fn should_unpack_leaf(&self, leaf: &IndexedFeature) -> bool {
        self.0.intersects(&Envelope::from(leaf.envelope))
    }
}

/// Rows keyed by id plus an R-tree of their envelopes
///
/// Rows without a geometry, or with a geometry that has no coordinates,
/// are stored but never indexed, so view and intersection queries skip
/// them. Returned geometries are restamped with the caller's factory.
#[derive(Debug)]
pub struct FeatureStore {
    schema: FeatureTable,
    rows: BTreeMap<FeatureId, FeatureRow>,
    tree: RTree<IndexedFeature>,
}

impl FeatureStore {
    /// Create an empty store whose rows follow `schema`'s columns
    pub fn new(schema: &FeatureTable) -> Self {
        let mut schema = schema.clone();
        schema.clear();
        Self { schema, rows: BTreeMap::new(), tree: RTree::new() }
    }

    /// Build a store from a populated table, bulk loading the index
    pub fn from_table(table: FeatureTable) -> Result<Self> {
        let mut store = Self::new(&table);
        let mut indexed = Vec::new();

        for row in table.into_rows() {
            store.check_width(&row)?;
            if let Some(entry) = index_entry(&row) {
                indexed.push(entry);
            }
            if store.rows.insert(row.id, row).is_some() {
                return Err(ProviderError::SchemaMismatch {
                    reason: "duplicate feature id in source table".to_string(),
                });
            }
        }

        store.tree = RTree::bulk_load(indexed);
        Ok(store)
    }

    /// Insert a row, replacing any existing row with the same id
    pub fn insert(&mut self, row: FeatureRow) -> Result<()> {
        self.check_width(&row)?;

        if let Some(previous) = self.rows.remove(&row.id) {
            tracing::warn!(id = %row.id, "replacing existing feature");
            if let Some(entry) = index_entry(&previous) {
                self.tree.remove(&entry);
            }
        }

        if let Some(entry) = index_entry(&row) {
            self.tree.insert(entry);
        }
        self.rows.insert(row.id, row);
        Ok(())
    }

    /// Remove a row by id
    pub fn remove(&mut self, id: FeatureId) -> Option<FeatureRow> {
        let row = self.rows.remove(&id)?;
        if let Some(entry) = index_entry(&row) {
            self.tree.remove(&entry);
        }
        Some(row)
    }

    fn check_width(&self, row: &FeatureRow) -> Result<()> {
        if row.values.len() != self.schema.columns().len() {
            return Err(ProviderError::SchemaMismatch {
                reason: format!(
                    "row {} has {} values, schema has {} columns",
                    row.id,
                    row.values.len(),
                    self.schema.columns().len()
                ),
            });
        }
        Ok(())
    }

    /// Empty table describing the stored rows
    pub fn schema(&self) -> &FeatureTable {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: FeatureId) -> Option<&FeatureRow> {
        self.rows.get(&id)
    }

    /// Envelope of all indexed geometries
    pub fn extents(&self) -> Option<Envelope> {
        if self.tree.size() == 0 {
            return None;
        }
        Some(Envelope::from(self.tree.root().envelope()))
    }

    /// Ids whose envelope intersects `bbox`, ascending
    pub fn ids_in(&self, bbox: &Envelope) -> Vec<FeatureId> {
        let mut ids: Vec<FeatureId> = self
            .tree
            .locate_with_selection_function(IntersectingEnvelope(*bbox))
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Rows whose envelope intersects `bbox`, ascending by id
    fn rows_in(&self, bbox: &Envelope) -> impl Iterator<Item = &FeatureRow> {
        self.ids_in(bbox).into_iter().filter_map(move |id| self.rows.get(&id))
    }

    /// Geometries whose envelope intersects `bbox`, ascending by id
    pub fn geometries_in(&self, bbox: &Envelope, factory: &GeometryFactory) -> Vec<Geometry> {
        self.rows_in(bbox)
            .filter_map(|row| row.geometry.as_ref())
            .map(|geometry| factory.restamp(geometry))
            .collect()
    }

    pub fn geometry_by_id(&self, id: FeatureId, factory: &GeometryFactory) -> Result<Geometry> {
        self.rows
            .get(&id)
            .and_then(|row| row.geometry.as_ref())
            .map(|geometry| factory.restamp(geometry))
            .ok_or_else(|| ProviderError::not_found(id))
    }

    pub fn feature_by_id(&self, id: FeatureId, factory: &GeometryFactory) -> Result<FeatureRow> {
        let row = self.rows.get(&id).ok_or_else(|| ProviderError::not_found(id))?;
        Ok(FeatureRow::new(
            row.id,
            row.geometry.as_ref().map(|geometry| factory.restamp(geometry)),
            row.values.clone(),
        ))
    }

    /// Append every row whose geometry intersects `geometry` to `result`
    ///
    /// Candidates come from the index, then get an exact `geo` test.
    pub fn intersecting(
        &self,
        geometry: &Geometry,
        factory: &GeometryFactory,
        result: &mut FeatureTable,
    ) -> Result<usize> {
        let Some(bbox) = geometry.envelope() else {
            return Ok(0);
        };

        let mut appended = 0;
        for row in self.rows_in(&bbox) {
            if let Some(candidate) = &row.geometry {
                if candidate.intersects(geometry) {
                    self.append_to(row, factory, result)?;
                    appended += 1;
                }
            }
        }
        Ok(appended)
    }

    /// Append every row whose envelope intersects `bbox` to `result`
    pub fn intersecting_envelope(
        &self,
        bbox: &Envelope,
        factory: &GeometryFactory,
        result: &mut FeatureTable,
    ) -> Result<usize> {
        let mut appended = 0;
        for row in self.rows_in(bbox) {
            self.append_to(row, factory, result)?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Copy `row` into `result`, matching values by column name
    ///
    /// A result table without columns and rows first receives this store's
    /// column structure.
    fn append_to(
        &self,
        row: &FeatureRow,
        factory: &GeometryFactory,
        result: &mut FeatureTable,
    ) -> Result<()> {
        if result.columns().is_empty() && result.is_empty() {
            for column in clone_table_structure(&self.schema).columns() {
                result.add_column(column.clone())?;
            }
        }

        let values = result
            .columns()
            .iter()
            .map(|column| {
                self.schema.value(row, &column.name).cloned().unwrap_or(serde_json::Value::Null)
            })
            .collect();

        result.add_row(FeatureRow::new(
            row.id,
            row.geometry.as_ref().map(|geometry| factory.restamp(geometry)),
            values,
        ))
    }
}

fn index_entry(row: &FeatureRow) -> Option<IndexedFeature> {
    let envelope = row.geometry.as_ref()?.envelope()?;
    Some(IndexedFeature { id: row.id, envelope: envelope.to_aabb() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoprovider_core::{Column, ColumnType};
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> FeatureTable {
        FeatureTable::new("places")
            .with_column(Column::new("name", ColumnType::Text))
            .with_column(Column::new("population", ColumnType::Integer))
    }

    fn store_with_points() -> (FeatureStore, GeometryFactory) {
        let factory = GeometryFactory::new(4326);
        let mut store = FeatureStore::new(&schema());
        let places = [(1, "north", 0.0, 10.0), (2, "center", 0.0, 0.0), (3, "east", 10.0, 0.0)];
        for (id, name, x, y) in places {
            store
                .insert(FeatureRow::new(
                    FeatureId(id),
                    Some(factory.point(x, y)),
                    vec![json!(name), json!(id * 100)],
                ))
                .unwrap();
        }
        (store, factory)
    }

    #[test]
    fn test_ids_in_sorted() {
        let (store, _) = store_with_points();
        let ids = store.ids_in(&Envelope::new(-1.0, -1.0, 11.0, 1.0));
        assert_eq!(ids, vec![FeatureId(2), FeatureId(3)]);
    }

    #[test]
    fn test_extents() {
        let (store, _) = store_with_points();
        assert_eq!(store.extents(), Some(Envelope::new(0.0, 0.0, 10.0, 10.0)));

        let empty = FeatureStore::new(&schema());
        assert_eq!(empty.extents(), None);
    }

    #[test]
    fn test_insert_replaces_and_reindexes() {
        let (mut store, factory) = store_with_points();
        store
            .insert(FeatureRow::new(
                FeatureId(2),
                Some(factory.point(50.0, 50.0)),
                vec![json!("moved"), json!(0)],
            ))
            .unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.ids_in(&Envelope::new(-1.0, -1.0, 1.0, 1.0)).is_empty());
        assert_eq!(store.ids_in(&Envelope::new(49.0, 49.0, 51.0, 51.0)), vec![FeatureId(2)]);
    }

    #[test]
    fn test_remove_unindexes() {
        let (mut store, _) = store_with_points();
        assert!(store.remove(FeatureId(1)).is_some());
        assert!(store.remove(FeatureId(1)).is_none());
        assert!(store.ids_in(&Envelope::new(-1.0, 9.0, 1.0, 11.0)).is_empty());
    }

    #[test]
    fn test_insert_rejects_wrong_width() {
        let (mut store, _) = store_with_points();
        let err = store.insert(FeatureRow::new(FeatureId(9), None, vec![json!("x")])).unwrap_err();
        assert!(matches!(err, ProviderError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_rows_without_geometry_are_not_indexed() {
        let (mut store, _) = store_with_points();
        store
            .insert(FeatureRow::new(FeatureId(4), None, vec![json!("nowhere"), json!(0)]))
            .unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.ids_in(&Envelope::new(-100.0, -100.0, 100.0, 100.0)).len(), 3);
    }

    #[test]
    fn test_geometries_restamped_with_factory() {
        let (store, _) = store_with_points();
        let mercator = GeometryFactory::new(3857);
        let geometries = store.geometries_in(&Envelope::new(-1.0, -1.0, 1.0, 1.0), &mercator);

        assert_eq!(geometries.len(), 1);
        assert_eq!(geometries[0].srid(), 3857);
    }

    #[test]
    fn test_intersecting_fills_empty_result_schema() {
        let (store, factory) = store_with_points();
        let area = factory.polygon(vec![vec![
            [-1.0, -1.0],
            [1.0, -1.0],
            [1.0, 11.0],
            [-1.0, 11.0],
            [-1.0, -1.0],
        ]]);
        let mut result = FeatureTable::new("result");

        let count = store.intersecting(&area, &factory, &mut result).unwrap();

        assert_eq!(count, 2);
        assert_eq!(result.columns().len(), 2);
        let row = result.row_by_id(FeatureId(1)).unwrap();
        assert_eq!(result.value(row, "name"), Some(&json!("north")));
    }

    #[test]
    fn test_intersecting_maps_by_column_name() {
        let (store, factory) = store_with_points();
        let mut result = FeatureTable::new("result")
            .with_column(Column::new("population", ColumnType::Integer))
            .with_column(Column::new("label", ColumnType::Text));

        store
            .intersecting_envelope(&Envelope::new(9.0, -1.0, 11.0, 1.0), &factory, &mut result)
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.rows()[0].values, vec![json!(300), serde_json::Value::Null]);
    }

    #[test]
    fn test_from_table_bulk_loads() {
        let factory = GeometryFactory::new(0);
        let mut table = schema();
        for i in 0..50u64 {
            table
                .add_row(FeatureRow::new(
                    FeatureId(i),
                    Some(factory.point(i as f64, i as f64)),
                    vec![json!(format!("p{}", i)), json!(i)],
                ))
                .unwrap();
        }

        let store = FeatureStore::from_table(table).unwrap();
        assert_eq!(store.len(), 50);
        assert_eq!(store.schema().len(), 0);
        assert_eq!(store.ids_in(&Envelope::new(10.0, 10.0, 12.0, 12.0)).len(), 3);
    }

    proptest! {
        #[test]
        fn prop_ids_in_matches_linear_scan(
            points in proptest::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 0..60),
            corners in (-120.0f64..120.0, -120.0f64..120.0, -120.0f64..120.0, -120.0f64..120.0),
        ) {
            let factory = GeometryFactory::new(4326);
            let mut table = schema();
            for (i, (x, y)) in points.iter().enumerate() {
                table
                    .add_row(FeatureRow::new(
                        FeatureId(i as u64),
                        Some(factory.point(*x, *y)),
                        vec![json!("p"), json!(i)],
                    ))
                    .unwrap();
            }
            let store = FeatureStore::from_table(table).unwrap();
            let bbox = Envelope::new(corners.0, corners.1, corners.2, corners.3);

            let expected: Vec<FeatureId> = points
                .iter()
                .enumerate()
                .filter(|(_, (x, y))| bbox.contains_point(*x, *y))
                .map(|(i, _)| FeatureId(i as u64))
                .collect();
            prop_assert_eq!(store.ids_in(&bbox), expected);
        }
    }
}
