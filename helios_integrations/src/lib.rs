//! Concrete vendor adapters implementing the `VendorAdapter` capability set.

pub mod adapters;

pub use adapters::default_registry;
