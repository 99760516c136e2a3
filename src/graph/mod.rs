// SPDX-License-Identifier: MIT

//! Flow graph data model and file loading

pub mod loader;
pub mod types;

pub use loader::{FlowDefinition, FlowLoader};
pub use types::{Edge, FlowGraph, Node, Position};
