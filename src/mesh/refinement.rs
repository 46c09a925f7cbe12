use super::elem::RefinementProvider;
use nalgebra::{DMatrix, Point2};
use smallvec::SmallVec;
use std::fmt;

/// Exact description of a node produced by refinement: the global ids of the parent nodes it is
/// interpolated from, paired with the bits of their coefficients (sorted by node id)
///
/// Refinements of neighboring elements describe the nodes on their shared side with identical combinations
pub(crate) type NodeCombination = SmallVec<[(usize, u64); 8]>;

/// Positions of a child element's nodes computed from the positions of its parent's nodes
pub fn child_node_points<E: RefinementProvider>(
    elem: &E,
    child: usize,
    parent_points: &[Point2<f64>],
) -> Vec<Point2<f64>> {
    let n = elem.n_nodes();
    assert_eq!(
        parent_points.len(),
        n,
        "{} requires {} parent points; cannot embed {}!",
        elem.elem_type(),
        n,
        parent_points.len()
    );

    let embedding = DMatrix::from_fn(n, n, |child_node, parent_node| {
        elem.embedding_matrix(child, child_node, parent_node)
    });
    let parent_coords = DMatrix::from_fn(n, 2, |parent_node, dim| parent_points[parent_node][dim]);
    let child_coords = embedding * parent_coords;

    (0..n)
        .map(|child_node| Point2::new(child_coords[(child_node, 0)], child_coords[(child_node, 1)]))
        .collect()
}

pub(crate) fn node_combination<E: RefinementProvider>(
    elem: &E,
    child: usize,
    child_node: usize,
) -> NodeCombination {
    let mut combination: NodeCombination = (0..elem.n_nodes())
        .map(|parent_node| {
            (
                elem.node_id(parent_node),
                elem.embedding_matrix(child, child_node, parent_node),
            )
        })
        .filter(|(_, coefficient)| *coefficient != 0.0)
        .map(|(node_id, coefficient)| (node_id, coefficient.to_bits()))
        .collect();

    combination.sort_unstable();
    combination
}

/// Node combinations and positions for every node of every child of `elem`
pub(crate) fn embed_children<E: RefinementProvider>(
    elem: &E,
    parent_points: &[Point2<f64>],
) -> Vec<Vec<(NodeCombination, Point2<f64>)>> {
    (0..elem.n_children())
        .map(|child| {
            child_node_points(elem, child, parent_points)
                .into_iter()
                .enumerate()
                .map(|(child_node, point)| (node_combination(elem, child, child_node), point))
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinementError {
    Disabled,
    ElemDoesntExist(usize),
    ElemHasChildren(usize),
    DoubleRefinement(usize),
}

impl fmt::Display for RefinementError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "Adaptive refinement is disabled; Cannot refine!"),
            Self::ElemDoesntExist(elem_id) => {
                write!(f, "Quad8 {} does not exist; Cannot refine!", elem_id)
            }
            Self::ElemHasChildren(elem_id) => write!(
                f,
                "Quad8 {} already has children; Cannot refine!",
                elem_id
            ),
            Self::DoubleRefinement(elem_id) => write!(
                f,
                "Multiple refinements were specified for Quad8 {}; Cannot refine!",
                elem_id
            ),
        }
    }
}

impl std::error::Error for RefinementError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::elem::quad8::Quad8;
    use approx::assert_relative_eq;

    fn unit_square() -> (Quad8, Vec<Point2<f64>>) {
        let quad = Quad8::new(0, [0, 1, 2, 3, 4, 5, 6, 7], None);
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.5),
            Point2::new(0.5, 1.0),
            Point2::new(0.0, 0.5),
        ];
        (quad, points)
    }

    #[test]
    fn child_points_of_unit_square() {
        let (quad, points) = unit_square();
        let child_2 = child_node_points(&quad, 2, &points);

        assert_relative_eq!(child_2[0].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(child_2[0].y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(child_2[2].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(child_2[2].y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(child_2[4].x, 0.75, epsilon = 1e-12);
        assert_relative_eq!(child_2[4].y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(child_2[7].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(child_2[7].y, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn curved_sides_are_followed() {
        let (quad, mut points) = unit_square();
        // bow the bottom side downwards
        points[4] = Point2::new(0.5, -0.25);

        let child_0 = child_node_points(&quad, 0, &points);
        // quarter point of the bottom parabola
        assert_relative_eq!(child_0[4].x, 0.25, epsilon = 1e-12);
        assert_relative_eq!(child_0[4].y, -0.1875, epsilon = 1e-12);
    }

    #[test]
    fn corner_combinations_are_parent_nodes() {
        let (quad, _) = unit_square();
        for c in 0..4 {
            let combination = node_combination(&quad, c, c);
            assert_eq!(combination.len(), 1);
            assert_eq!(combination[0], (c, 1.0f64.to_bits()));
        }
    }

    #[test]
    fn shared_centers_have_equal_combinations() {
        let (quad, _) = unit_square();
        let center = node_combination(&quad, 0, 2);
        assert_eq!(center.len(), 8);
        assert_eq!(node_combination(&quad, 1, 3), center);
        assert_eq!(node_combination(&quad, 2, 0), center);
        assert_eq!(node_combination(&quad, 3, 1), center);
    }

    #[test]
    fn embed_all_children() {
        let (quad, points) = unit_square();
        let children = embed_children(&quad, &points);
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|nodes| nodes.len() == 8));
    }

    #[test]
    fn refinement_error_messages() {
        assert_eq!(
            RefinementError::ElemHasChildren(3).to_string(),
            "Quad8 3 already has children; Cannot refine!"
        );
        assert_eq!(
            RefinementError::DoubleRefinement(1).to_string(),
            "Multiple refinements were specified for Quad8 1; Cannot refine!"
        );
    }

    #[test]
    #[should_panic]
    fn wrong_number_of_parent_points() {
        let (quad, points) = unit_square();
        child_node_points(&quad, 0, &points[0..4]);
    }
}
