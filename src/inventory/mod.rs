//! Hierarchical host/group inventory: parsing, export and rendering.
//!
//! The accepted format is the YAML inventory layout: top-level keys are group
//! names, and each group may carry `hosts`, `vars` and `children` blocks.
//!
//! ```yaml
//! all:
//!   hosts:
//!     bastion:
//!   children:
//!     web:
//!       hosts:
//!         web01: { ansible_host: 10.0.1.10 }
//!       vars:
//!         http_port: 80
//! ```
//!
//! Every top-level group is an implicit child of `all`, which is synthesized
//! when the document does not declare it.

mod export;
mod graph;
mod parser;
mod resolve;

pub use export::export;
pub use graph::render_graph;
pub use parser::parse;
