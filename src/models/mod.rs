//! Domain models for the FTL control surface.
//!
//! # Core Concepts
//!
//! ## Inventory
//!
//! - [`InventoryModel`]: The parsed host/group hierarchy, with a flattened
//!   membership index computed once per parse. Replaced wholesale on reload.
//! - [`Host`] / [`Group`]: Named targets and their variables. Groups reference
//!   hosts and child groups by name; the model owns every record.
//!
//! ## Process State
//!
//! - [`Session`]: A caller-scoped bucket of [`Activity`] history and key/value
//!   data, keyed by an opaque token.
//! - [`TaskRecord`]: One externally executed module run, appended to the task
//!   log after the execution engine reports back.
//! - [`SecretMetadata`]: What is known about a credential without its value.
//!
//! ## Output
//!
//! - [`Playbook`]: A declarative document synthesized from the task log,
//!   grouped into [`Play`]s of contiguous [`Step`]s per host target.

mod inventory;
mod playbook;
mod secret;
mod session;
mod task;

pub use inventory::*;
pub use playbook::*;
pub use secret::*;
pub use session::*;
pub use task::*;
