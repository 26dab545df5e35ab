//! The three-level reconciliation engine: `ObjectEngine` drives a single
//! object, `PhaseEngine` sequences objects within a phase, `RevisionEngine`
//! sequences phases within a revision (spec.md §4.2, §4.4, §4.5).
pub mod client;
mod error;
mod object_engine;
mod phase_engine;
mod revision_engine;

pub use error::Error;
pub use object_engine::ObjectEngine;
pub use phase_engine::PhaseEngine;
pub use revision_engine::RevisionEngine;
