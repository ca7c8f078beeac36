//! Placement model: the ordered list of leaf instances composing the
//! output canvas.
//!
//! Sequence position is z-order (index 0 = bottom, last = topmost).
//! Instance ids are unique for the lifetime of the model. A
//! `source_id` may stop resolving after a re-detection renumbers leaf
//! bounds; no operation here fails for that, resolution is deferred to
//! rendering, where unresolvable instances are skipped.

use serde::{Deserialize, Serialize};

/// Smallest scale an instance may reach; edits below this are clamped.
pub const MIN_SCALE: f64 = 0.01;

/// Position offset applied to a duplicated instance, in output pixels.
pub const DUPLICATE_OFFSET: f64 = 24.0;

/// Transform of one placed leaf in output space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafTransform {
    /// Horizontal position of the leaf center, in output pixels.
    pub x: f64,
    /// Vertical position of the leaf center, in output pixels.
    pub y: f64,
    /// Rotation in degrees, normalized into `[0, 360)`.
    pub rotation: f64,
    /// Uniform scale factor, always positive.
    pub scale: f64,
    /// Mirror across the local vertical axis.
    pub flip_x: bool,
    /// Mirror across the local horizontal axis.
    pub flip_y: bool,
}

impl LeafTransform {
    /// Identity transform at the given position.
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
            scale: 1.0,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Normalize rotation into `[0, 360)` and clamp scale positive.
    fn normalized(mut self) -> Self {
        self.rotation = self.rotation.rem_euclid(360.0);
        self.scale = self.scale.max(MIN_SCALE);
        self
    }
}

impl Default for LeafTransform {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

/// Partial transform edit: only the present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPatch {
    /// New horizontal position.
    pub x: Option<f64>,
    /// New vertical position.
    pub y: Option<f64>,
    /// New rotation in degrees (wrapped into `[0, 360)`).
    pub rotation: Option<f64>,
    /// New uniform scale (clamped to at least [`MIN_SCALE`]).
    pub scale: Option<f64>,
    /// New horizontal flip state.
    pub flip_x: Option<bool>,
    /// New vertical flip state.
    pub flip_y: Option<bool>,
}

/// One leaf instance placed into the output composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedLeaf {
    /// Instance id, unique for the lifetime of the placement model.
    pub id: u64,
    /// Id of the detected leaf this instance draws
    /// ([`LeafBounds::id`](crate::types::LeafBounds)); may be dangling.
    pub source_id: u32,
    /// Placement transform.
    pub transform: LeafTransform,
}

/// Ordered collection of placed leaves with transform editing.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PlacementModel {
    next_id: u64,
    instances: Vec<PlacedLeaf>,
}

impl PlacementModel {
    /// Create an empty model.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            instances: Vec::new(),
        }
    }

    /// Placed instances in z-order, bottom first.
    #[must_use]
    pub fn instances(&self) -> &[PlacedLeaf] {
        &self.instances
    }

    /// Number of placed instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if nothing is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Look up an instance by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&PlacedLeaf> {
        self.instances.iter().find(|p| p.id == id)
    }

    /// Place a new instance on top of the stack and return its id.
    ///
    /// The source id is not validated here; an instance whose source no
    /// longer resolves is skipped at render time.
    pub fn add_instance(&mut self, source_id: u32, transform: LeafTransform) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.instances.push(PlacedLeaf {
            id,
            source_id,
            transform: transform.normalized(),
        });
        id
    }

    /// Place all given leaves in one pass on a deterministic grid.
    ///
    /// The grid has `columns = ceil(sqrt(n))` columns and a spacing of
    /// `output_size / (columns + 1)`; the instance at row `r`, column
    /// `c` (row-major over the input order) lands at
    /// `(spacing * (c + 1), spacing * (r + 1))` with an identity
    /// transform. Returns the new instance ids in input order.
    pub fn add_bulk(&mut self, leaf_ids: &[u32], output_size: u32) -> Vec<u64> {
        let columns = grid_columns(leaf_ids.len());
        if columns == 0 {
            return Vec::new();
        }
        #[expect(clippy::cast_precision_loss)]
        let spacing = f64::from(output_size) / (columns as f64 + 1.0);

        leaf_ids
            .iter()
            .enumerate()
            .map(|(i, &source_id)| {
                #[expect(clippy::cast_precision_loss)]
                let col = (i % columns) as f64;
                #[expect(clippy::cast_precision_loss)]
                let row = (i / columns) as f64;
                self.add_instance(
                    source_id,
                    LeafTransform::at(spacing * (col + 1.0), spacing * (row + 1.0)),
                )
            })
            .collect()
    }

    /// Merge a partial transform into an existing instance.
    ///
    /// Rotation is wrapped into `[0, 360)` and scale clamped positive;
    /// no other validation. Returns `false` if no instance has this id.
    pub fn update_instance(&mut self, id: u64, patch: &TransformPatch) -> bool {
        let Some(placed) = self.instances.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        let t = &mut placed.transform;
        if let Some(x) = patch.x {
            t.x = x;
        }
        if let Some(y) = patch.y {
            t.y = y;
        }
        if let Some(rotation) = patch.rotation {
            t.rotation = rotation;
        }
        if let Some(scale) = patch.scale {
            t.scale = scale;
        }
        if let Some(flip_x) = patch.flip_x {
            t.flip_x = flip_x;
        }
        if let Some(flip_y) = patch.flip_y {
            t.flip_y = flip_y;
        }
        *t = t.normalized();
        true
    }

    /// Remove an instance. Returns `false` if no instance has this id.
    pub fn remove_instance(&mut self, id: u64) -> bool {
        let before = self.instances.len();
        self.instances.retain(|p| p.id != id);
        self.instances.len() != before
    }

    /// Clone an instance with a fresh id, offset by
    /// [`DUPLICATE_OFFSET`] on both axes, placed on top of the stack.
    pub fn duplicate_instance(&mut self, id: u64) -> Option<u64> {
        let original = *self.get(id)?;
        let mut transform = original.transform;
        transform.x += DUPLICATE_OFFSET;
        transform.y += DUPLICATE_OFFSET;
        Some(self.add_instance(original.source_id, transform))
    }

    /// Remove every instance. Instance ids are not reused afterwards.
    pub fn clear_all(&mut self) {
        self.instances.clear();
    }
}

/// Number of grid columns for bulk placement: `ceil(sqrt(n))`.
#[must_use]
fn grid_columns(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    // Integer search avoids float sqrt edge cases near perfect squares.
    let mut columns = 1;
    while columns * columns < n {
        columns += 1;
    }
    columns
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn grid_columns_is_ceil_sqrt() {
        assert_eq!(grid_columns(0), 0);
        assert_eq!(grid_columns(1), 1);
        assert_eq!(grid_columns(2), 2);
        assert_eq!(grid_columns(4), 2);
        assert_eq!(grid_columns(5), 3);
        assert_eq!(grid_columns(9), 3);
        assert_eq!(grid_columns(10), 4);
    }

    #[test]
    fn add_instance_appends_topmost_with_fresh_ids() {
        let mut model = PlacementModel::new();
        let a = model.add_instance(7, LeafTransform::at(1.0, 2.0));
        let b = model.add_instance(7, LeafTransform::at(3.0, 4.0));
        assert_ne!(a, b);
        assert_eq!(model.len(), 2);
        assert_eq!(model.instances()[1].id, b);
    }

    #[test]
    fn add_instance_normalizes_transform() {
        let mut model = PlacementModel::new();
        let id = model.add_instance(
            0,
            LeafTransform {
                rotation: 540.0,
                scale: -2.0,
                ..LeafTransform::at(0.0, 0.0)
            },
        );
        let placed = model.get(id).unwrap();
        assert!((placed.transform.rotation - 180.0).abs() < f64::EPSILON);
        assert!((placed.transform.scale - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn bulk_placement_single_leaf_centers_on_half() {
        // N=1: columns=1, spacing=size/2, position (spacing, spacing).
        let mut model = PlacementModel::new();
        model.add_bulk(&[0], 100);
        let t = model.instances()[0].transform;
        assert!((t.x - 50.0).abs() < f64::EPSILON);
        assert!((t.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bulk_placement_four_leaves_on_two_columns() {
        // N=4: columns=2, spacing=300/3=100.
        let mut model = PlacementModel::new();
        model.add_bulk(&[0, 1, 2, 3], 300);
        let expected = [
            (100.0, 100.0),
            (200.0, 100.0),
            (100.0, 200.0),
            (200.0, 200.0),
        ];
        for (placed, (x, y)) in model.instances().iter().zip(expected) {
            assert!((placed.transform.x - x).abs() < f64::EPSILON);
            assert!((placed.transform.y - y).abs() < f64::EPSILON);
            assert!((placed.transform.scale - 1.0).abs() < f64::EPSILON);
            assert!(placed.transform.rotation.abs() < f64::EPSILON);
            assert!(!placed.transform.flip_x && !placed.transform.flip_y);
        }
    }

    #[test]
    fn bulk_placement_five_leaves_on_three_columns() {
        // N=5: columns=3, spacing=400/4=100; fifth lands at row 1, col 1.
        let mut model = PlacementModel::new();
        model.add_bulk(&[0, 1, 2, 3, 4], 400);
        let expected = [
            (100.0, 100.0),
            (200.0, 100.0),
            (300.0, 100.0),
            (100.0, 200.0),
            (200.0, 200.0),
        ];
        for (placed, (x, y)) in model.instances().iter().zip(expected) {
            assert!((placed.transform.x - x).abs() < f64::EPSILON, "{placed:?}");
            assert!((placed.transform.y - y).abs() < f64::EPSILON, "{placed:?}");
        }
    }

    #[test]
    fn bulk_placement_nine_leaves_fills_three_rows() {
        // N=9: columns=3, spacing=200/4=50; last lands at (150, 150).
        let mut model = PlacementModel::new();
        let ids = model.add_bulk(&[0, 1, 2, 3, 4, 5, 6, 7, 8], 200);
        assert_eq!(ids.len(), 9);
        let last = model.instances()[8].transform;
        assert!((last.x - 150.0).abs() < f64::EPSILON);
        assert!((last.y - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bulk_placement_of_nothing_places_nothing() {
        let mut model = PlacementModel::new();
        assert!(model.add_bulk(&[], 512).is_empty());
        assert!(model.is_empty());
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut model = PlacementModel::new();
        let id = model.add_instance(3, LeafTransform::at(10.0, 20.0));

        let updated = model.update_instance(
            id,
            &TransformPatch {
                rotation: Some(-90.0),
                flip_x: Some(true),
                ..TransformPatch::default()
            },
        );
        assert!(updated);

        let t = model.get(id).unwrap().transform;
        assert!((t.x - 10.0).abs() < f64::EPSILON);
        assert!((t.y - 20.0).abs() < f64::EPSILON);
        assert!((t.rotation - 270.0).abs() < f64::EPSILON);
        assert!((t.scale - 1.0).abs() < f64::EPSILON);
        assert!(t.flip_x);
        assert!(!t.flip_y);
    }

    #[test]
    fn update_clamps_nonpositive_scale() {
        let mut model = PlacementModel::new();
        let id = model.add_instance(0, LeafTransform::default());
        model.update_instance(
            id,
            &TransformPatch {
                scale: Some(0.0),
                ..TransformPatch::default()
            },
        );
        assert!((model.get(id).unwrap().transform.scale - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn update_unknown_id_is_a_noop() {
        let mut model = PlacementModel::new();
        assert!(!model.update_instance(42, &TransformPatch::default()));
    }

    #[test]
    fn remove_and_clear() {
        let mut model = PlacementModel::new();
        let a = model.add_instance(0, LeafTransform::default());
        let b = model.add_instance(1, LeafTransform::default());

        assert!(model.remove_instance(a));
        assert!(!model.remove_instance(a));
        assert_eq!(model.len(), 1);
        assert_eq!(model.instances()[0].id, b);

        model.clear_all();
        assert!(model.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut model = PlacementModel::new();
        let a = model.add_instance(0, LeafTransform::default());
        model.clear_all();
        let b = model.add_instance(0, LeafTransform::default());
        assert!(b > a);
    }

    #[test]
    fn duplicate_offsets_position_and_keeps_source() {
        let mut model = PlacementModel::new();
        let id = model.add_instance(
            5,
            LeafTransform {
                rotation: 45.0,
                ..LeafTransform::at(100.0, 100.0)
            },
        );
        let copy_id = model.duplicate_instance(id).unwrap();
        assert_ne!(copy_id, id);

        let copy = model.get(copy_id).unwrap();
        assert_eq!(copy.source_id, 5);
        assert!((copy.transform.x - (100.0 + DUPLICATE_OFFSET)).abs() < f64::EPSILON);
        assert!((copy.transform.y - (100.0 + DUPLICATE_OFFSET)).abs() < f64::EPSILON);
        assert!((copy.transform.rotation - 45.0).abs() < f64::EPSILON);
        // Topmost in z-order.
        assert_eq!(model.instances().last().unwrap().id, copy_id);
    }

    #[test]
    fn duplicate_unknown_id_returns_none() {
        let mut model = PlacementModel::new();
        assert!(model.duplicate_instance(9).is_none());
    }

    #[test]
    fn placement_model_serde_round_trip() {
        let mut model = PlacementModel::new();
        model.add_instance(1, LeafTransform::at(5.0, 6.0));
        model.add_instance(
            2,
            LeafTransform {
                flip_y: true,
                ..LeafTransform::at(7.0, 8.0)
            },
        );

        let json = serde_json::to_string(&model).unwrap();
        let restored: PlacementModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.instances(), model.instances());
    }
}
