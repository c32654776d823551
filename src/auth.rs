//! Identifiers, scope sets, and access-token models shared by every sync component.

pub mod id;
pub mod scope;
pub mod token;

pub use id::*;
pub use scope::*;
pub use token::{access::*, secret::*};
