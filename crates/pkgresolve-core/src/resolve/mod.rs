//! The resolution engine proper: candidate generation and filtering (`provider`) feeding a
//! hand-rolled backtracking solver and its per-environment outer driver (`resolver`).
//!
//! This is deliberately not built atop a SAT/CDCL-style dependency solver: the preference
//! function that picks which identifier to expand next (see [`resolver`]) needs to be an
//! explicit, inspectable step, which fits a resolvelib-shaped provider/reporter loop much more
//! directly than a unit-propagation engine exposes. See DESIGN.md.

mod provider;
mod resolver;

pub use provider::Provider;
pub use resolver::{resolve_environment, ResolvedEnvironment};
