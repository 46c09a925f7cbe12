use super::{
    compute_key,
    edge3::Edge3,
    io_package::{ConnectivityError, IoPackage},
    ElemKey, ElemType, Order, RefinementProvider, SideResolver, TopologyDescriptor,
};
#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use smallvec::SmallVec;
use std::fmt;

/// Local node indices of each side: `[corner, corner, mid-edge node]`
pub const SIDE_NODES: [[usize; 3]; 4] = [[0, 1, 4], [1, 2, 5], [2, 3, 6], [3, 0, 7]];

/// Corner vertices adjacent to each mid-edge node (indexed by `n - 4`)
const SECOND_ORDER_ADJACENT_VERTICES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

// Tecplot has no quadratic quads: four degenerate corner triangles and one interior quad
const TECPLOT_SUB_ELEMS: [[usize; 4]; 5] = [
    [0, 4, 7, 7],
    [4, 1, 5, 5],
    [5, 2, 6, 6],
    [7, 6, 3, 3],
    [4, 5, 6, 7],
];

const CORNER_NODES: [usize; 4] = [0, 1, 2, 3];

// VTK_QUADRATIC_QUAD uses the native ordering
const VTK_QUADRATIC_QUAD: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Child node coefficients: `QUAD8_EMBEDDING[child][child_node][parent_node]`
///
/// Child `c` contains parent vertex `c` and keeps the parent's orientation. Each row holds the
/// serendipity shape functions of the parent evaluated at one child node, so each row sums to 1.
#[rustfmt::skip]
pub const QUAD8_EMBEDDING: [[[f64; 8]; 8]; 4] = [
    // child 0
    [
        //   0        1        2        3        4       5       6       7
        [ 1.0,     0.0,     0.0,     0.0,     0.0,    0.0,    0.0,    0.0  ], // 0
        [ 0.0,     0.0,     0.0,     0.0,     1.0,    0.0,    0.0,    0.0  ], // 1
        [-0.25,   -0.25,   -0.25,   -0.25,    0.5,    0.5,    0.5,    0.5  ], // 2
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    0.0,    0.0,    1.0  ], // 3
        [ 0.375,  -0.125,   0.0,     0.0,     0.75,   0.0,    0.0,    0.0  ], // 4
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.75,   0.375,  0.25,   0.375], // 5
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.375,  0.25,   0.375,  0.75 ], // 6
        [ 0.375,   0.0,     0.0,    -0.125,   0.0,    0.0,    0.0,    0.75 ], // 7
    ],
    // child 1
    [
        [ 0.0,     0.0,     0.0,     0.0,     1.0,    0.0,    0.0,    0.0  ], // 0
        [ 0.0,     1.0,     0.0,     0.0,     0.0,    0.0,    0.0,    0.0  ], // 1
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    1.0,    0.0,    0.0  ], // 2
        [-0.25,   -0.25,   -0.25,   -0.25,    0.5,    0.5,    0.5,    0.5  ], // 3
        [-0.125,   0.375,   0.0,     0.0,     0.75,   0.0,    0.0,    0.0  ], // 4
        [ 0.0,     0.375,  -0.125,   0.0,     0.0,    0.75,   0.0,    0.0  ], // 5
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.375,  0.75,   0.375,  0.25 ], // 6
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.75,   0.375,  0.25,   0.375], // 7
    ],
    // child 2
    [
        [-0.25,   -0.25,   -0.25,   -0.25,    0.5,    0.5,    0.5,    0.5  ], // 0
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    1.0,    0.0,    0.0  ], // 1
        [ 0.0,     0.0,     1.0,     0.0,     0.0,    0.0,    0.0,    0.0  ], // 2
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    0.0,    1.0,    0.0  ], // 3
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.375,  0.75,   0.375,  0.25 ], // 4
        [ 0.0,    -0.125,   0.375,   0.0,     0.0,    0.75,   0.0,    0.0  ], // 5
        [ 0.0,     0.0,     0.375,  -0.125,   0.0,    0.0,    0.75,   0.0  ], // 6
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.25,   0.375,  0.75,   0.375], // 7
    ],
    // child 3
    [
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    0.0,    0.0,    1.0  ], // 0
        [-0.25,   -0.25,   -0.25,   -0.25,    0.5,    0.5,    0.5,    0.5  ], // 1
        [ 0.0,     0.0,     0.0,     0.0,     0.0,    0.0,    1.0,    0.0  ], // 2
        [ 0.0,     0.0,     0.0,     1.0,     0.0,    0.0,    0.0,    0.0  ], // 3
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.375,  0.25,   0.375,  0.75 ], // 4
        [-0.1875, -0.1875, -0.1875, -0.1875,  0.25,   0.375,  0.75,   0.375], // 5
        [ 0.0,     0.0,    -0.125,   0.375,   0.0,    0.0,    0.75,   0.0  ], // 6
        [-0.125,   0.0,     0.0,     0.375,   0.0,    0.0,    0.0,    0.75 ], // 7
    ],
];

/// `Quad8`s are 8-node serendipity quadrilaterals: 4 corner `Node`s and 4 mid-edge `Node`s, with no interior `Node`
///
/// `Quad8`s keep track of:
/// * The global ids of their `Node`s (the `Node`s themselves are owned by the `Mesh`)
/// * The id of their parent (if produced by h-refinement)
/// * The ids of their children (if h-refined)
///
/// ## Layout
/// ```text
///        3     6     2
///        o-----o-----o
///        |           |
///        |           |
///      7 o           o 5
///        |           |
///        |           |
///        o-----o-----o
///        0     4     1
/// ```
/// Side `s` runs from corner `s` to corner `(s + 1) % 4` through mid-edge node `s + 4`
///
/// ## h-Refinement
/// Isotropic refinement produces four children, numbered by the parent corner they contain:
/// ```text
///     3 ----------- 6 ----------- 2
///     |             |             |
///     |      3      |      2      |
///     |             |             |
///     7 ----------- * ----------- 5
///     |             |             |
///     |      0      |      1      |
///     |             |             |
///     0 ----------- 4 ----------- 1
/// ```
#[derive(Debug, Clone)]
pub struct Quad8 {
    pub id: usize,
    nodes: [usize; 8],
    parent: Option<usize>,
    children: Option<SmallVec<[usize; 4]>>,
}

impl Quad8 {
    /// Construct a new Quad8 from its global node ids (in local order) and an optional parent
    pub fn new(id: usize, nodes: [usize; 8], parent: Option<usize>) -> Self {
        Self {
            id,
            nodes,
            parent,
            children: None,
        }
    }

    /// Global ids of the four corner nodes
    pub fn corner_ids(&self) -> [usize; 4] {
        [self.nodes[0], self.nodes[1], self.nodes[2], self.nodes[3]]
    }

    /// Returns a vector of ids for this Quad8's children. Returns `None` if it has not been refined.
    pub fn child_ids(&self) -> Option<SmallVec<[usize; 4]>> {
        self.children.clone()
    }

    /// Has this `Quad8` been h-Refined
    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }

    pub(crate) fn set_children(&mut self, child_ids: SmallVec<[usize; 4]>) {
        assert!(
            self.children.is_none(),
            "Quad8 {} already has children; cannot set children to {:?}!",
            self.id,
            child_ids
        );
        assert_eq!(
            child_ids.len(),
            self.n_children(),
            "Quad8 {} requires {} children!",
            self.id,
            self.n_children()
        );
        self.children = Some(child_ids);
    }

    /// Produce a Json Object that describes this Quad8
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "id": self.id,
            "parent": self.parent,
            "active": self.children.is_none(),
            "node_ids": JsonValue::from(self.nodes.to_vec()),
            "children": JsonValue::from(
                match &self.children {
                    Some(ids) => ids.to_vec(),
                    None => Vec::new(),
                }
            )
        }
    }

    fn assert_side(&self, s: usize) {
        assert!(
            s < self.n_sides(),
            "Quad8 {} has {} sides; cannot access side {}!",
            self.id,
            self.n_sides(),
            s
        );
    }
}

impl TopologyDescriptor for Quad8 {
    fn elem_type(&self) -> ElemType {
        ElemType::Quad8
    }

    fn n_nodes(&self) -> usize {
        8
    }

    fn n_sides(&self) -> usize {
        4
    }

    fn n_children(&self) -> usize {
        4
    }

    fn n_sub_elem(&self) -> usize {
        5
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

impl SideResolver for Quad8 {
    type Side = Edge3;

    fn build_side(&self, i: usize) -> Edge3 {
        self.assert_side(i);
        Edge3::new(SIDE_NODES[i].map(|local| self.nodes[local]), None)
    }

    // the mid-edge node is shared by exactly the elements on either side of an edge
    fn key(&self, s: usize) -> ElemKey {
        self.assert_side(s);
        compute_key(self.nodes[SIDE_NODES[s][2]])
    }

    fn n_second_order_adjacent_vertices(&self, n: usize) -> usize {
        assert!(
            (4..8).contains(&n),
            "Quad8 second-order nodes are numbered 4 through 7; {} is not a second-order node!",
            n
        );
        2
    }

    fn second_order_adjacent_vertex(&self, n: usize, v: usize) -> usize {
        assert!(
            (4..8).contains(&n),
            "Quad8 second-order nodes are numbered 4 through 7; {} is not a second-order node!",
            n
        );
        assert!(
            v < 2,
            "Second-order node {} has 2 adjacent vertices; cannot access vertex {}!",
            n,
            v
        );
        SECOND_ORDER_ADJACENT_VERTICES[n - 4][v]
    }

    fn connectivity(
        &self,
        sub_elem: usize,
        format: IoPackage,
        conn: &mut Vec<usize>,
    ) -> Result<(), ConnectivityError> {
        assert!(
            sub_elem < self.n_sub_elem(),
            "Quad8 {} has {} sub-elements; cannot write connectivity of sub-element {}!",
            self.id,
            self.n_sub_elem(),
            sub_elem
        );

        let local_nodes: &[usize] = match format {
            IoPackage::Tecplot => &TECPLOT_SUB_ELEMS[sub_elem],
            IoPackage::Gmv => &CORNER_NODES,
            IoPackage::Vtk => &VTK_QUADRATIC_QUAD,
            unsupported => return Err(ConnectivityError::UnsupportedFormat(unsupported)),
        };
        let offset = usize::from(format.one_based());

        conn.clear();
        conn.extend(local_nodes.iter().map(|local| self.nodes[*local] + offset));

        Ok(())
    }
}

impl RefinementProvider for Quad8 {
    fn embedding_matrix(&self, child: usize, child_node: usize, parent_node: usize) -> f64 {
        assert!(
            child < 4 && child_node < 8 && parent_node < 8,
            "Quad8 embedding matrix is 4x8x8; cannot access entry ({}, {}, {})!",
            child,
            child_node,
            parent_node
        );
        QUAD8_EMBEDDING[child][child_node][parent_node]
    }
}

impl fmt::Display for Quad8 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Quad8 {} \t nodes: {:?}", self.id, self.nodes)?;
        if let Some(parent_id) = self.parent {
            write!(f, " \t parent: {}", parent_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_quad() -> Quad8 {
        Quad8::new(0, [10, 11, 12, 13, 14, 15, 16, 17], None)
    }

    // reference coordinates of the parent nodes
    const REF_POINTS: [[f64; 2]; 8] = [
        [-1.0, -1.0],
        [1.0, -1.0],
        [1.0, 1.0],
        [-1.0, 1.0],
        [0.0, -1.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [-1.0, 0.0],
    ];

    #[test]
    fn topology_constants() {
        for quad in [
            sample_quad(),
            Quad8::new(7, [0, 1, 2, 3, 4, 5, 6, 7], Some(3)),
        ] {
            assert_eq!(quad.elem_type(), ElemType::Quad8);
            assert_eq!(quad.n_nodes(), 8);
            assert_eq!(quad.n_sides(), 4);
            assert_eq!(quad.n_children(), 4);
            assert_eq!(quad.n_sub_elem(), 5);
            assert_eq!(quad.default_order(), Order::Second);
        }
    }

    #[test]
    fn corners_precede_mid_nodes() {
        let quad = sample_quad();
        assert_eq!(quad.corner_ids(), [10, 11, 12, 13]);
        assert_eq!(&quad.node_ids()[0..4], &quad.corner_ids());
    }

    #[test]
    fn build_sides() {
        let quad = sample_quad();

        let side_0 = quad.build_side(0);
        assert_eq!(side_0.node_ids(), &[10, 11, 14]);
        assert_eq!(side_0.elem_type(), ElemType::Edge3);

        for (s, expected) in [[10, 11, 14], [11, 12, 15], [12, 13, 16], [13, 10, 17]]
            .iter()
            .enumerate()
        {
            let side = quad.build_side(s);
            assert_eq!(side.node_ids(), expected);
            assert_eq!(side.n_nodes(), 3);
            assert_eq!(side.default_order(), Order::Second);
        }
    }

    #[test]
    fn build_side_leaves_parent_unchanged() {
        let quad = sample_quad();
        let side_a = quad.build_side(2);
        let side_b = quad.build_side(2);
        drop(side_a);

        assert_eq!(side_b.node_ids(), &[12, 13, 16]);
        assert_eq!(side_b.parent_id(), None);
        assert_eq!(quad.node_ids(), &[10, 11, 12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn keys_use_mid_nodes() {
        let quad = sample_quad();
        assert_eq!(quad.key(0), compute_key(14));

        for s0 in 0..4 {
            for s1 in (s0 + 1)..4 {
                assert_ne!(quad.key(s0), quad.key(s1));
            }
        }
    }

    #[test]
    fn shared_side_keys_collide() {
        // two unit quads sharing the edge between nodes 1 and 4 (through node 8)
        let left = Quad8::new(0, [0, 1, 4, 3, 6, 8, 10, 12], None);
        let right = Quad8::new(1, [1, 2, 5, 4, 7, 9, 11, 8], None);

        assert_eq!(left.key(1), right.key(3));
        assert!(left.build_side(1).matches(&right.build_side(3)));
    }

    #[test]
    fn second_order_adjacency() {
        let quad = sample_quad();
        for n in 4..8 {
            assert_eq!(quad.n_second_order_adjacent_vertices(n), 2);
            assert_eq!(quad.second_order_adjacent_vertex(n, 0), n - 4);
            assert_eq!(quad.second_order_adjacent_vertex(n, 1), (n - 3) % 4);
        }
    }

    #[test]
    fn side_table_matches_adjacency() {
        let quad = sample_quad();
        for [c0, c1, mid] in SIDE_NODES {
            assert_eq!(quad.second_order_adjacent_vertex(mid, 0), c0);
            assert_eq!(quad.second_order_adjacent_vertex(mid, 1), c1);
        }
    }

    #[test]
    fn tecplot_connectivity() {
        let quad = sample_quad();
        let mut conn = Vec::new();

        quad.connectivity(0, IoPackage::Tecplot, &mut conn).unwrap();
        assert_eq!(conn, vec![11, 15, 18, 18]);

        quad.connectivity(4, IoPackage::Tecplot, &mut conn).unwrap();
        assert_eq!(conn, vec![15, 16, 17, 18]);
    }

    #[test]
    fn vtk_and_gmv_connectivity() {
        let quad = sample_quad();
        let mut conn = Vec::new();

        quad.connectivity(0, IoPackage::Vtk, &mut conn).unwrap();
        assert_eq!(conn, vec![10, 11, 12, 13, 14, 15, 16, 17]);

        quad.connectivity(0, IoPackage::Gmv, &mut conn).unwrap();
        assert_eq!(conn, vec![11, 12, 13, 14]);
    }

    #[test]
    fn unsupported_connectivity() {
        let quad = sample_quad();
        let mut conn = vec![1, 2, 3];

        assert_eq!(
            quad.connectivity(0, IoPackage::Gmsh, &mut conn),
            Err(ConnectivityError::UnsupportedFormat(IoPackage::Gmsh))
        );
        assert_eq!(conn, vec![1, 2, 3]);
    }

    #[test]
    fn embedding_rows_are_affine() {
        let quad = sample_quad();
        for c in 0..4 {
            for j in 0..8 {
                let sum: f64 = (0..8).map(|p| quad.embedding_matrix(c, j, p)).sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn embedding_places_child_nodes() {
        let quad = sample_quad();

        for c in 0..4 {
            // child c shares parent corner c, and sits in that quadrant of the reference square
            let center = [REF_POINTS[c][0] / 2.0, REF_POINTS[c][1] / 2.0];
            let x = quad.embed_nodal_values(c, &REF_POINTS.map(|p| p[0]));
            let y = quad.embed_nodal_values(c, &REF_POINTS.map(|p| p[1]));

            for j in 0..8 {
                assert_relative_eq!(x[j], center[0] + REF_POINTS[j][0] / 2.0, epsilon = 1e-12);
                assert_relative_eq!(y[j], center[1] + REF_POINTS[j][1] / 2.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn embedding_reproduces_serendipity_fields() {
        let quad = sample_quad();
        // x^2 * y lies in the serendipity space
        let field = |[x, y]: [f64; 2]| x * x * y + 2.0 * x - y * y;
        let parent_values = REF_POINTS.map(field);

        for c in 0..4 {
            let child_values = quad.embed_nodal_values(c, &parent_values);
            let center = [REF_POINTS[c][0] / 2.0, REF_POINTS[c][1] / 2.0];

            for (j, value) in child_values.iter().enumerate() {
                let child_point = [
                    center[0] + REF_POINTS[j][0] / 2.0,
                    center[1] + REF_POINTS[j][1] / 2.0,
                ];
                assert_relative_eq!(*value, field(child_point), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn children_keep_parent_corners() {
        let quad = sample_quad();
        for c in 0..4 {
            assert_eq!(quad.embedding_matrix(c, c, c), 1.0);
        }
    }

    #[test]
    #[should_panic]
    fn build_side_out_of_range() {
        sample_quad().build_side(4);
    }

    #[test]
    #[should_panic]
    fn key_out_of_range() {
        sample_quad().key(4);
    }

    #[test]
    #[should_panic]
    fn corner_is_not_second_order() {
        sample_quad().second_order_adjacent_vertex(3, 0);
    }

    #[test]
    #[should_panic]
    fn third_adjacent_vertex() {
        sample_quad().second_order_adjacent_vertex(5, 2);
    }

    #[test]
    #[should_panic]
    fn sub_elem_out_of_range() {
        let mut conn = Vec::new();
        let _ = sample_quad().connectivity(5, IoPackage::Tecplot, &mut conn);
    }

    #[test]
    #[should_panic]
    fn embedding_child_out_of_range() {
        sample_quad().embedding_matrix(4, 0, 0);
    }

    #[test]
    #[should_panic]
    fn double_set_children() {
        let mut quad = sample_quad();
        quad.set_children(SmallVec::from_slice(&[1, 2, 3, 4]));
        quad.set_children(SmallVec::from_slice(&[5, 6, 7, 8]));
    }

    #[cfg(feature = "json_export")]
    #[test]
    fn quad_to_json() {
        let mut quad = Quad8::new(2, [10, 11, 12, 13, 14, 15, 16, 17], Some(0));
        quad.set_children(SmallVec::from_slice(&[3, 4, 5, 6]));

        let quad_json = quad.to_json();
        assert_eq!(quad_json["id"].as_usize(), Some(2));
        assert_eq!(quad_json["parent"].as_usize(), Some(0));
        assert_eq!(quad_json["active"].as_bool(), Some(false));
        assert_eq!(quad_json["node_ids"].members().count(), 8);
        assert_eq!(quad_json["children"][3].as_usize(), Some(6));
    }
}
