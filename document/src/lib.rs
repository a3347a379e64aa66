#![deny(rust_2018_idioms)]

//! An element tree for XML fragments, and the handler that builds it
//! from a stream of tokens.

mod builder;
mod element;

pub use builder::{DefaultElementFactory, DomBuilder, ElementFactory};
pub use element::{Element, Node};
pub use string_slab::Name;
