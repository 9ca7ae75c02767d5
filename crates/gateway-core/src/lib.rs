//! Agent gateway core library
//!
//! Pure, I/O-free building blocks shared by the gateway binary:
//!
//! - [`Operation`] / [`Parameter`]: one allow-listed, parameterized application call
//! - [`RouteCatalog`]: the validated, immutable allow-list of operations
//! - [`resolve`]: binds untrusted arguments into an operation's templates
//!
//! Nothing in this crate performs network calls; the catalog is the security
//! boundary and is built once at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod operation;
mod resolve;

pub use catalog::{CatalogError, RouteCatalog};
pub use operation::{HttpMethod, Operation, Parameter, ParameterLocation, placeholders};
pub use resolve::{ResolutionError, ResolvedRequest, resolve};
