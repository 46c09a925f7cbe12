use super::{ElemType, Order, TopologyDescriptor};
use std::fmt;

/// A quadratic line between two corner `Node`s
///
/// ## Layout
/// ```text
///    0 *-----*-----* 1
///            2
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge3 {
    nodes: [usize; 3],
    parent: Option<usize>,
}

impl Edge3 {
    /// Construct a new line from its two corner nodes and the node between them
    pub fn new(nodes: [usize; 3], parent: Option<usize>) -> Self {
        Self { nodes, parent }
    }

    /// Global ids of the two corner nodes
    pub fn corners(&self) -> [usize; 2] {
        [self.nodes[0], self.nodes[1]]
    }

    /// Global id of the mid-edge node
    pub fn mid_node(&self) -> usize {
        self.nodes[2]
    }

    /// Do both lines describe the same geometric side (regardless of direction)
    pub fn matches(&self, other: &Self) -> bool {
        let [a0, a1] = self.corners();
        let [b0, b1] = other.corners();

        self.mid_node() == other.mid_node() && ((a0 == b0 && a1 == b1) || (a0 == b1 && a1 == b0))
    }
}

impl TopologyDescriptor for Edge3 {
    fn elem_type(&self) -> ElemType {
        ElemType::Edge3
    }

    fn n_nodes(&self) -> usize {
        3
    }

    fn n_sides(&self) -> usize {
        2
    }

    fn n_children(&self) -> usize {
        2
    }

    fn n_sub_elem(&self) -> usize {
        2
    }

    fn default_order(&self) -> Order {
        Order::Second
    }

    fn node_ids(&self) -> &[usize] {
        &self.nodes
    }

    fn parent_id(&self) -> Option<usize> {
        self.parent
    }
}

impl fmt::Display for Edge3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: [{}, {}, {}]",
            self.elem_type(),
            self.nodes[0],
            self.nodes[1],
            self.nodes[2]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_direction() {
        let forward = Edge3::new([1, 4, 8], None);
        let backward = Edge3::new([4, 1, 8], None);
        assert!(forward.matches(&backward));
        assert!(backward.matches(&forward));
    }

    #[test]
    fn different_mid_nodes_dont_match() {
        let a = Edge3::new([1, 4, 8], None);
        let b = Edge3::new([1, 4, 9], None);
        assert!(!a.matches(&b));
    }

    #[test]
    fn different_corners_dont_match() {
        let a = Edge3::new([1, 4, 8], None);
        let b = Edge3::new([1, 5, 8], None);
        assert!(!a.matches(&b));
    }

    #[test]
    fn topology() {
        let edge = Edge3::new([10, 11, 14], None);
        assert_eq!(edge.n_nodes(), 3);
        assert_eq!(edge.node_id(2), 14);
        assert_eq!(edge.default_order(), Order::Second);
        assert_eq!(edge.to_string(), "EDGE3: [10, 11, 14]");
    }

    #[test]
    #[should_panic]
    fn node_out_of_range() {
        Edge3::new([0, 1, 2], None).node_id(3);
    }
}
