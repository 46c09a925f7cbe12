/// The 3-node quadratic line used as the side of a `Quad8`
pub mod edge3;
/// Connectivity conventions of external plotting and interchange tools
pub mod io_package;
/// The 8-node serendipity quadrilateral
pub mod quad8;

use io_package::{ConnectivityError, IoPackage};
use std::fmt;

/// Key used to match sides of neighboring elements
pub type ElemKey = usize;

/// The family of an element. Each variant carries its own fixed topology tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElemType {
    Edge2,
    Edge3,
    Tri3,
    Tri6,
    Quad4,
    Quad8,
    Quad9,
}

impl ElemType {
    /// Topological dimension
    pub fn dim(&self) -> usize {
        match self {
            Self::Edge2 | Self::Edge3 => 1,
            Self::Tri3 | Self::Tri6 | Self::Quad4 | Self::Quad8 | Self::Quad9 => 2,
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Edge2 => "EDGE2",
            Self::Edge3 => "EDGE3",
            Self::Tri3 => "TRI3",
            Self::Tri6 => "TRI6",
            Self::Quad4 => "QUAD4",
            Self::Quad8 => "QUAD8",
            Self::Quad9 => "QUAD9",
        };
        write!(f, "{}", name)
    }
}

/// Polynomial order of an element's geometric mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Order {
    Constant,
    First,
    Second,
    Third,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant => write!(f, "CONSTANT"),
            Self::First => write!(f, "FIRST"),
            Self::Second => write!(f, "SECOND"),
            Self::Third => write!(f, "THIRD"),
        }
    }
}

/// Fixed shape information about an element variant
///
/// The counts never depend on the node data of a particular instance
pub trait TopologyDescriptor {
    fn elem_type(&self) -> ElemType;

    fn n_nodes(&self) -> usize;

    fn n_sides(&self) -> usize;

    /// Number of children produced by isotropic refinement
    fn n_children(&self) -> usize;

    /// Number of sub-elements used when the element is written with linear connectivity
    fn n_sub_elem(&self) -> usize;

    fn default_order(&self) -> Order;

    /// Global ids of the element's nodes in local order
    fn node_ids(&self) -> &[usize];

    /// Global id of the `i`th local node
    fn node_id(&self, i: usize) -> usize {
        assert!(
            i < self.n_nodes(),
            "{} has {} nodes; cannot access local node {}!",
            self.elem_type(),
            self.n_nodes(),
            i
        );
        self.node_ids()[i]
    }

    /// Id of the element this one was refined from (a lookup-only relation)
    fn parent_id(&self) -> Option<usize>;
}

/// Construction of sides and neighbor keys from the element's node numbering
pub trait SideResolver: TopologyDescriptor {
    /// The lower-dimensional element describing one side
    type Side: TopologyDescriptor;

    /// Build a new, independently owned element for side `i`
    fn build_side(&self, i: usize) -> Self::Side;

    /// A (not necessarily unique) key associated with side `s`. Elements sharing a side produce the same key
    fn key(&self, s: usize) -> ElemKey;

    /// Number of vertices adjacent to the second-order node `n`
    fn n_second_order_adjacent_vertices(&self, n: usize) -> usize;

    /// Local index of the `v`th vertex adjacent to the second-order node `n`
    fn second_order_adjacent_vertex(&self, n: usize, v: usize) -> usize;

    /// Write the node ids of sub-element `sub_elem` into `conn` using the conventions of `format`
    ///
    /// `conn` is left untouched if the format is not supported
    fn connectivity(
        &self,
        sub_elem: usize,
        format: IoPackage,
        conn: &mut Vec<usize>,
    ) -> Result<(), ConnectivityError>;
}

/// Coefficients mapping parent node data onto child node data during h-refinement
pub trait RefinementProvider: TopologyDescriptor {
    /// Weight of `parent_node` in the value of node `child_node` on child `child`
    fn embedding_matrix(&self, child: usize, child_node: usize, parent_node: usize) -> f64;

    /// Interpolate nodal values of this element onto the nodes of one of its children
    fn embed_nodal_values(&self, child: usize, parent_values: &[f64]) -> Vec<f64> {
        assert_eq!(
            parent_values.len(),
            self.n_nodes(),
            "{} requires {} nodal values; cannot embed {}!",
            self.elem_type(),
            self.n_nodes(),
            parent_values.len()
        );

        (0..self.n_nodes())
            .map(|child_node| {
                parent_values
                    .iter()
                    .enumerate()
                    .map(|(parent_node, value)| {
                        self.embedding_matrix(child, child_node, parent_node) * value
                    })
                    .sum()
            })
            .collect()
    }
}

/// Neighbor key derived from a single global node
///
/// Two elements sharing a side share the node this is computed from, so their keys always collide
pub fn compute_key(node_id: usize) -> ElemKey {
    node_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elem_type_dims() {
        assert_eq!(ElemType::Edge3.dim(), 1);
        assert_eq!(ElemType::Quad8.dim(), 2);
        assert_eq!(ElemType::Quad8.to_string(), "QUAD8");
    }

    #[test]
    fn order_ranking() {
        assert!(Order::Second > Order::First);
        assert_eq!(Order::Second.to_string(), "SECOND");
    }

    #[test]
    fn key_depends_on_node_only() {
        assert_eq!(compute_key(14), compute_key(14));
        assert_ne!(compute_key(14), compute_key(15));
    }
}
