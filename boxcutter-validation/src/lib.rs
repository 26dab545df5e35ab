//! Static and dry-run preflight validation for objects, phases and
//! revisions, run before `boxcutter-engine` writes anything.
mod classify;
mod dry_run;
mod object;
mod phase;
mod revision;
mod scope;

pub use classify::classify;
pub use dry_run::DryRunApply;
pub use object::ObjectValidator;
pub use phase::PhaseValidator;
pub use revision::RevisionValidator;
pub use scope::{NamespaceScopeResolver, NoOpScopeResolver};
