//! Filter engine: facet derivation and selection application.

pub mod apply;
pub mod facets;

pub use apply::apply_filters;
pub use facets::derive_facets;
