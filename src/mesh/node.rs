#[cfg(feature = "json_export")]
use json::{array, JsonValue};
use nalgebra::Point2;

/// A point in 2D space.
/// Groups of 8 nodes describe `Quad8`s; 3 nodes describe their sides.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub coords: Point2<f64>,
    /// Id of the element whose refinement created this node (`None` for nodes read from a mesh file)
    pub parent_elem: Option<usize>,
}

impl Node {
    pub fn new(id: usize, coords: Point2<f64>) -> Self {
        Self {
            id,
            coords,
            parent_elem: None,
        }
    }

    pub(crate) fn refined(id: usize, coords: Point2<f64>, parent_elem: usize) -> Self {
        Self {
            id,
            coords,
            parent_elem: Some(parent_elem),
        }
    }

    /// Produce a Json Array of this Node's coordinates
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        array![self.coords.x, self.coords.y]
    }
}
