//! ECMA-335 metadata access for `.winmd` files.
//!
//! Layered bottom up: the physical structures ([`cor20`], [`root`],
//! [`streams`], [`tables`], [`signatures`]), the decoded interop facts
//! ([`attributes`]), the owned [`model`], the [`loader`] that folds one
//! into the other, and the [`index`] the rest of the crate queries.

pub mod attributes;
pub mod cor20;
pub mod index;
pub mod loader;
pub mod model;
pub mod root;
pub mod signatures;
pub mod streams;
pub mod tables;
/// Metadata token types and decoding.
pub mod token;
