/// Element topology descriptions: `Quad8` and its `Edge3` sides
pub mod elem;
/// A Point in 2D space
pub mod node;
/// Structures and Functions to facilitate isotropic h-refinement through embedding matrices
pub mod refinement;

use crate::config::LibConfig;
use elem::{
    edge3::Edge3,
    io_package::{ConnectivityError, IoPackage},
    quad8::Quad8,
    ElemKey, RefinementProvider, SideResolver, TopologyDescriptor,
};
use node::Node;
use refinement::{
    child_node_points, embed_children, node_combination, NodeCombination, RefinementError,
};

use json::JsonValue;
use nalgebra::Point2;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::read_to_string;
use std::io::{Error, ErrorKind};

#[cfg(feature = "json_export")]
use json::object;
#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::BufWriter;

/// Information used to define the geometric structure and refinement state of a 2D Quad8 Mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub elems: Vec<Quad8>,
    pub config: LibConfig,
    // nodes created by refinement, so that siblings and neighbors share them
    refined_nodes: BTreeMap<NodeCombination, usize>,
}

impl Mesh {
    /// Construct a completely empty Mesh
    pub fn blank() -> Self {
        Self {
            nodes: Vec::new(),
            elems: Vec::new(),
            config: LibConfig::default(),
            refined_nodes: BTreeMap::new(),
        }
    }

    /// Replace the Mesh's [LibConfig]
    pub fn with_config(mut self, config: LibConfig) -> Self {
        self.config = config;
        self
    }

    /// Construct a Mesh from a JSON file with the following format
    ///
    /// The following describes a two element mesh. `Elem`s list their corner nodes counter-clockwise,
    /// followed by the mid-edge nodes of sides (0, 1), (1, 2), (2, 3) and (3, 0):
    /// ```text
    ///     3      10      4      11      5
    /// 1.0 *-------*-------*-------*-------*
    ///     |               |               |
    ///  12 *               * 8             * 9
    ///     |               |               |
    /// 0.0 *-------*-------*-------*-------*
    ///  y  0       6       1       7       2
    ///  x 0.0             1.0             2.0
    /// ```
    ///
    /// mesh.json
    /// ```JSON
    /// {
    ///     "Nodes": [
    ///         [0.0, 0.0], [1.0, 0.0], [2.0, 0.0],
    ///         [0.0, 1.0], [1.0, 1.0], [2.0, 1.0],
    ///         [0.5, 0.0], [1.5, 0.0], [1.0, 0.5], [2.0, 0.5],
    ///         [0.5, 1.0], [1.5, 1.0], [0.0, 0.5]
    ///     ],
    ///     "Elems": [
    ///         { "node_ids": [0, 1, 4, 3, 6, 8, 10, 12] },
    ///         { "node_ids": [1, 2, 5, 4, 7, 9, 11, 8] }
    ///     ]
    /// }
    /// ```
    ///
    /// `Elem`s may also specify a `"parent"` id and an ordered `"children"` list (as written by
    /// [Mesh::export_to_json]), and the file may carry a `"Config"` object (see [LibConfig]).
    /// Children without a `"children"` list on their parent are taken in id order.
    /// Children whose nodes don't sit where their parent's refinement would place them are rejected.
    pub fn from_file(path: impl AsRef<str>) -> std::io::Result<Self> {
        let mesh_file_contents = read_to_string(path.as_ref())?;
        let mesh_file_json = json::parse(&mesh_file_contents).map_err(|err| {
            invalid_data(format!("Unable to parse Mesh File as JSON: {}", err))
        })?;

        let mesh = Self::from_json(&mesh_file_json)?;
        log::debug!(
            "Read Mesh with {} Nodes and {} Quad8s from {}",
            mesh.nodes.len(),
            mesh.elems.len(),
            path.as_ref()
        );

        Ok(mesh)
    }

    /// Construct a Mesh from an already parsed JSON object (see [Mesh::from_file] for the format)
    pub fn from_json(mesh_json: &JsonValue) -> std::io::Result<Self> {
        let points = parse_node_information(mesh_json)?;
        let elem_information = parse_elem_information(mesh_json, points.len())?;

        let config = if mesh_json["Config"].is_null() {
            LibConfig::default()
        } else {
            LibConfig::from_json(&mesh_json["Config"])
                .map_err(|err| invalid_data(err.to_string()))?
        };

        let nodes = points
            .iter()
            .enumerate()
            .map(|(node_id, point)| Node::new(node_id, *point))
            .collect();

        let mut elems: Vec<Quad8> = elem_information
            .iter()
            .enumerate()
            .map(|(elem_id, (node_ids, parent, _))| Quad8::new(elem_id, *node_ids, *parent))
            .collect();

        // reciprocate parent connections (in id order unless the parent lists its children)
        let mut child_lists: BTreeMap<usize, SmallVec<[usize; 4]>> = BTreeMap::new();
        for elem in elems.iter() {
            if let Some(parent_id) = elem.parent_id() {
                if parent_id >= elems.len() || parent_id == elem.id {
                    return Err(invalid_data(format!(
                        "Elem {} has an invalid parent ({})!",
                        elem.id, parent_id
                    )));
                }
                child_lists.entry(parent_id).or_default().push(elem.id);
            }
        }
        for (parent_id, (_, _, listed_children)) in elem_information.iter().enumerate() {
            if let Some(listed_children) = listed_children {
                let mut sorted_children = listed_children.clone();
                sorted_children.sort_unstable();
                if child_lists.get(&parent_id) != Some(&sorted_children) {
                    return Err(invalid_data(format!(
                        "Elem {}'s children {:?} don't match the Elems naming it as their parent!",
                        parent_id, listed_children
                    )));
                }
                child_lists.insert(parent_id, listed_children.clone());
            }
        }
        for (parent_id, child_ids) in child_lists {
            if child_ids.len() != elems[parent_id].n_children() {
                return Err(invalid_data(format!(
                    "Elem {} has {} children; expected {}!",
                    parent_id,
                    child_ids.len(),
                    elems[parent_id].n_children()
                )));
            }
            elems[parent_id].set_children(child_ids);
        }

        let mut mesh = Self {
            nodes,
            elems,
            config,
            ..Self::blank()
        };
        mesh.rebuild_refined_nodes()?;

        Ok(mesh)
    }

    /// Print the mesh to a JSON file specified by path.
    #[cfg(feature = "json_export")]
    pub fn export_to_json(&self, path: impl AsRef<str>) -> std::io::Result<()> {
        let f = File::create(path.as_ref())?;
        let mut w = BufWriter::new(&f);

        self.to_json().write_pretty(&mut w, 4)?;

        Ok(())
    }

    /// Produce the JSON object written by [Mesh::export_to_json]
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "Config": self.config.to_json(),
            "Nodes": JsonValue::from(self.nodes.iter().map(|node| node.to_json()).collect::<Vec<_>>()),
            "Elems": JsonValue::from(self.elems.iter().map(|elem| elem.to_json()).collect::<Vec<_>>()),
        }
    }

    // ----------------------------------------------------------------------------------------------------
    // General Data Retrieval
    // ----------------------------------------------------------------------------------------------------

    /// Iterate over the `Quad8`s which have not been refined
    pub fn active_elems(&self) -> impl Iterator<Item = &Quad8> + '_ {
        self.elems.iter().filter(|elem| !elem.has_children())
    }

    /// Get the eight [Point2]s composing a [Quad8] (in local node order)
    pub fn elem_points(&self, elem_id: usize) -> Vec<Point2<f64>> {
        assert!(
            elem_id < self.elems.len(),
            "Quad8 {} doesn't exist; cannot retrieve its points!",
            elem_id
        );
        self.elems[elem_id]
            .node_ids()
            .iter()
            .map(|node_id| self.nodes[*node_id].coords)
            .collect()
    }

    // ----------------------------------------------------------------------------------------------------
    // Neighbor resolution
    // ----------------------------------------------------------------------------------------------------

    /// Find the conforming neighbor of each side of every active `Quad8`
    ///
    /// Candidate pairs are grouped by their side keys, then confirmed by comparing the sides' nodes exactly.
    /// The result is indexed by Elem ID; refined Elems have no neighbors.
    pub fn find_neighbors(&self) -> Vec<[Option<usize>; 4]> {
        let side_keys: Vec<(ElemKey, usize, usize)> = self
            .elems
            .par_iter()
            .filter(|elem| !elem.has_children())
            .flat_map(|elem| {
                (0..elem.n_sides())
                    .map(|s| (elem.key(s), elem.id, s))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut candidates: BTreeMap<ElemKey, SmallVec<[(usize, usize); 2]>> = BTreeMap::new();
        for (key, elem_id, side) in side_keys {
            candidates.entry(key).or_default().push((elem_id, side));
        }

        let mut neighbors = vec![[None; 4]; self.elems.len()];
        for (key, sides) in candidates {
            if sides.len() > 2 {
                log::warn!(
                    "{} sides share key {}; only exact matches will be paired",
                    sides.len(),
                    key
                );
            }

            for (a, &(elem_a, side_a)) in sides.iter().enumerate() {
                let built_a = self.elems[elem_a].build_side(side_a);

                for &(elem_b, side_b) in sides.iter().skip(a + 1) {
                    if neighbors[elem_a][side_a].is_some() || neighbors[elem_b][side_b].is_some() {
                        continue;
                    }

                    if built_a.matches(&self.elems[elem_b].build_side(side_b)) {
                        neighbors[elem_a][side_a] = Some(elem_b);
                        neighbors[elem_b][side_b] = Some(elem_a);
                    } else {
                        log::warn!(
                            "Key {} is shared by Quad8 {} (side {}) and Quad8 {} (side {}), but their sides don't match",
                            key,
                            elem_a,
                            side_a,
                            elem_b,
                            side_b
                        );
                    }
                }
            }
        }

        neighbors
    }

    /// Build the sides of active `Quad8`s which have no conforming neighbor
    ///
    /// Returns `(elem_id, side_index, side)` for each. This includes the outer boundary of the Mesh, and
    /// sides along which neighboring Elems have been refined to different levels.
    pub fn boundary_sides(&self) -> Vec<(usize, usize, Edge3)> {
        let neighbors = self.find_neighbors();

        self.active_elems()
            .flat_map(|elem| {
                let elem_neighbors = neighbors[elem.id];
                (0..elem.n_sides())
                    .filter(move |s| elem_neighbors[*s].is_none())
                    .map(move |s| {
                        let side = elem.build_side(s);
                        log::trace!("Quad8 {} side {} is unmatched: {}", elem.id, s, side);
                        (elem.id, s, side)
                    })
            })
            .collect()
    }

    // ----------------------------------------------------------------------------------------------------
    // Output
    // ----------------------------------------------------------------------------------------------------

    /// Connectivity lists of every active `Quad8` in the conventions of an external tool
    ///
    /// Tools that write linear sub-elements get one list per sub-element
    pub fn connectivity(&self, format: IoPackage) -> Result<Vec<Vec<usize>>, ConnectivityError> {
        let mut lists = Vec::new();

        for elem in self.active_elems() {
            let num_lists = if format.writes_sub_elems() {
                elem.n_sub_elem()
            } else {
                1
            };

            for sub_elem in 0..num_lists {
                let mut conn = Vec::with_capacity(elem.n_nodes());
                elem.connectivity(sub_elem, format, &mut conn)?;
                lists.push(conn);
            }
        }

        Ok(lists)
    }

    // ----------------------------------------------------------------------------------------------------
    // h-refinement methods
    // ----------------------------------------------------------------------------------------------------

    /// Look up an entry of a `Quad8`'s embedding matrix. Fails if refinement is disabled
    pub fn embedding_matrix(
        &self,
        elem_id: usize,
        child: usize,
        child_node: usize,
        parent_node: usize,
    ) -> Result<f64, RefinementError> {
        if !self.config.refinement_enabled {
            return Err(RefinementError::Disabled);
        }
        let elem = self
            .elems
            .get(elem_id)
            .ok_or(RefinementError::ElemDoesntExist(elem_id))?;

        Ok(elem.embedding_matrix(child, child_node, parent_node))
    }

    /// Refine every active `Quad8` in the Mesh
    pub fn global_refinement(&mut self) -> Result<(), RefinementError> {
        self.refine_elems(self.active_elems().map(|elem| elem.id).collect())
    }

    /// Refine a list of `Quad8`s by their ID
    ///
    /// Each Elem is split into four children. Child nodes are interpolated from the parent's nodes through its
    /// embedding matrix, so curved (quadratic) sides are preserved.
    pub fn refine_elems(&mut self, elem_ids: Vec<usize>) -> Result<(), RefinementError> {
        if !self.config.refinement_enabled {
            return Err(RefinementError::Disabled);
        }

        let mut to_refine: BTreeSet<usize> = BTreeSet::new();
        for elem_id in elem_ids {
            if elem_id >= self.elems.len() {
                return Err(RefinementError::ElemDoesntExist(elem_id));
            }
            if self.elems[elem_id].has_children() {
                return Err(RefinementError::ElemHasChildren(elem_id));
            }
            if !to_refine.insert(elem_id) {
                return Err(RefinementError::DoubleRefinement(elem_id));
            }
        }
        let to_refine: Vec<usize> = to_refine.into_iter().collect();

        // child nodes of each Elem only depend on its own nodes
        let embedded: Vec<(usize, Vec<Vec<(NodeCombination, Point2<f64>)>>)> = to_refine
            .par_iter()
            .map(|&elem_id| {
                (
                    elem_id,
                    embed_children(&self.elems[elem_id], &self.elem_points(elem_id)),
                )
            })
            .collect();

        for (parent_id, children) in embedded {
            let mut child_ids: SmallVec<[usize; 4]> = SmallVec::new();

            for child_nodes in children {
                let mut node_ids = [0; 8];
                for (child_node, (combination, point)) in child_nodes.into_iter().enumerate() {
                    node_ids[child_node] = self.node_for(combination, point, parent_id);
                }

                let child_id = self.elems.len();
                self.elems.push(Quad8::new(child_id, node_ids, Some(parent_id)));
                child_ids.push(child_id);
            }

            log::debug!("Refined Quad8 {} into {:?}", parent_id, child_ids);
            self.elems[parent_id].set_children(child_ids);
        }

        Ok(())
    }

    // find the node described by a combination of parent nodes, creating it if needed
    fn node_for(&mut self, combination: NodeCombination, point: Point2<f64>, parent_id: usize) -> usize {
        if combination.len() == 1 {
            return combination[0].0;
        }

        let nodes = &mut self.nodes;
        *self.refined_nodes.entry(combination).or_insert_with(|| {
            let node_id = nodes.len();
            nodes.push(Node::refined(node_id, point, parent_id));
            node_id
        })
    }

    // recover the combinations of nodes created by earlier refinements (after reading a Mesh file)
    fn rebuild_refined_nodes(&mut self) -> std::io::Result<()> {
        let mut refined = Vec::new();

        for parent in self.elems.iter().filter(|elem| elem.has_children()) {
            let parent_points = self.elem_points(parent.id);

            for (child, child_id) in parent.child_ids().into_iter().flatten().enumerate() {
                let child_elem = &self.elems[child_id];
                if child_elem.corner_ids()[child] != parent.corner_ids()[child] {
                    return Err(invalid_data(format!(
                        "Elem {} can't be child {} of Elem {}; it doesn't share corner {}!",
                        child_id, child, parent.id, child
                    )));
                }

                let expected_points = child_node_points(parent, child, &parent_points);
                for (child_node, expected) in expected_points.iter().enumerate() {
                    let node_id = child_elem.node_id(child_node);
                    if !same_location(&self.nodes[node_id].coords, expected) {
                        return Err(invalid_data(format!(
                            "Node {} of Elem {} doesn't match child {} of Elem {}!",
                            node_id, child_id, child, parent.id
                        )));
                    }

                    let combination = node_combination(parent, child, child_node);
                    if combination.len() > 1 {
                        refined.push((combination, node_id, parent.id));
                    } else if combination[0].0 != node_id {
                        return Err(invalid_data(format!(
                            "Node {} of Elem {} should be Node {} of its parent!",
                            node_id, child_id, combination[0].0
                        )));
                    }
                }
            }
        }

        for (combination, node_id, parent_id) in refined {
            self.nodes[node_id].parent_elem = Some(parent_id);
            self.refined_nodes.insert(combination, node_id);
        }

        Ok(())
    }
}

const LOCATION_TOLERANCE: f64 = 1e-9;

fn same_location(point: &Point2<f64>, expected: &Point2<f64>) -> bool {
    (point - expected).norm() <= LOCATION_TOLERANCE * (1.0 + expected.coords.norm())
}

fn invalid_data(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, msg.into())
}

// node ids, parent id, and the ordered list of children (if any)
type ElemInformation = ([usize; 8], Option<usize>, Option<SmallVec<[usize; 4]>>);

fn parse_elem_information(
    mesh_file_json: &JsonValue,
    num_nodes: usize,
) -> std::io::Result<Vec<ElemInformation>> {
    if !mesh_file_json["Elems"].is_array() {
        return Err(invalid_data("Elems must be an Array!"));
    }

    mesh_file_json["Elems"]
        .members()
        .enumerate()
        .map(|(elem_id, json_elem)| {
            if !json_elem["node_ids"].is_array() || json_elem["node_ids"].members().count() != 8 {
                return Err(invalid_data(format!(
                    "Elem {} must have an Array of 8 node_ids!",
                    elem_id
                )));
            }

            let mut node_ids = [0; 8];
            for (i, node_id_json) in json_elem["node_ids"].members().enumerate() {
                node_ids[i] = match node_id_json.as_usize() {
                    Some(node_id) if node_id < num_nodes => node_id,
                    _ => {
                        return Err(invalid_data(format!(
                            "Elem {}'s node_ids must be integers smaller than the total number of nodes!",
                            elem_id
                        )))
                    }
                };
            }
            if node_ids.iter().collect::<BTreeSet<_>>().len() != node_ids.len() {
                return Err(invalid_data(format!(
                    "Elem {}'s node_ids should have 8 unique values!",
                    elem_id
                )));
            }

            let parent = if json_elem["parent"].is_null() {
                None
            } else {
                Some(json_elem["parent"].as_usize().ok_or_else(|| {
                    invalid_data(format!("Elem {}'s parent must be an integer!", elem_id))
                })?)
            };

            let children = match &json_elem["children"] {
                JsonValue::Null => None,
                JsonValue::Array(child_ids) if child_ids.is_empty() => None,
                JsonValue::Array(child_ids) => Some(
                    child_ids
                        .iter()
                        .map(|child_id| {
                            child_id.as_usize().ok_or_else(|| {
                                invalid_data(format!("Elem {}'s children must be integers!", elem_id))
                            })
                        })
                        .collect::<std::io::Result<SmallVec<[usize; 4]>>>()?,
                ),
                _ => {
                    return Err(invalid_data(format!(
                        "Elem {}'s children must be an Array!",
                        elem_id
                    )))
                }
            };

            Ok((node_ids, parent, children))
        })
        .collect()
}

fn parse_node_information(mesh_file_json: &JsonValue) -> std::io::Result<Vec<Point2<f64>>> {
    if !mesh_file_json["Nodes"].is_array() {
        return Err(invalid_data("Nodes must be an Array!"));
    }

    mesh_file_json["Nodes"]
        .members()
        .map(|json_node_point| {
            if !json_node_point.is_array() || json_node_point.members().count() != 2 {
                return Err(invalid_data("Nodes must be arrays of length 2!"));
            }

            match (json_node_point[0].as_f64(), json_node_point[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Point2::new(x, y)),
                _ => Err(invalid_data("Nodes must be composed of numerical values!")),
            }
        })
        .collect()
}
