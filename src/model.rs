//! Local records the sync engines read and reconcile.
//!
//! `deployment` covers the LTI binding itself (deployment, service endpoints, line items),
//! `identity` the local users, course roles, and their links to LMS identifiers, and
//! `assessment` the gradable items together with their released marks.

/// Assessments and released marks.
pub mod assessment;
/// Deployments, service endpoints, and line items.
pub mod deployment;
/// Users, course roles, and external user links.
pub mod identity;

pub use assessment::*;
pub use deployment::*;
pub use identity::*;
