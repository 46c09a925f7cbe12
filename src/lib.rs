//! Second-order serendipity quadrilaterals (`Quad8`) for 2D Finite Element meshes
//!
//! The crate describes the topology of the 8-node quad (its sides, side keys, connectivity for external
//! plotting tools, and the embedding matrix used by adaptive refinement) along with a small [`Mesh`]
//! container that exercises those descriptions during neighbor finding and h-refinement.

extern crate json;
extern crate nalgebra;
extern crate smallvec;

/// Library-wide runtime configuration
pub mod config;
/// The geometric structure of a 2D Quad8 Mesh
pub mod mesh;

pub use config::{ConfigError, LibConfig};
pub use mesh::elem::{
    compute_key,
    edge3::Edge3,
    io_package::{ConnectivityError, IoPackage},
    quad8::Quad8,
    ElemType, Order, RefinementProvider, SideResolver, TopologyDescriptor,
};
pub use mesh::{node::Node, refinement::RefinementError, Mesh};
