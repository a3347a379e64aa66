#![deny(rust_2018_idioms)]

//! Resumable XML processing for streams of fragments.
//!
//! Bytes arrive in chunks of any size. The [`Parser`] turns them into
//! tokens for a [`Handler`], carrying partial tokens from one chunk to
//! the next. [`DomBuilder`] is the handler that assembles the tokens
//! into [`Element`] trees.
//!
//! ```
//! use stanza::{DomBuilder, DEFAULT_PARSER};
//!
//! let mut builder = DomBuilder::new();
//! DEFAULT_PARSER.parse(&mut builder, b"<iq type='get'><query xmlns='jabber:iq:")?;
//! DEFAULT_PARSER.parse(&mut builder, b"roster'/></iq>")?;
//!
//! let iq = builder.pop_element().expect("a completed element");
//! assert_eq!(iq.attribute("type"), Some("get"));
//! assert_eq!(iq.xmlns_at(&["iq", "query"]), Some("jabber:iq:roster"));
//! # Ok::<(), stanza::Error>(())
//! ```

pub use document::{DefaultElementFactory, DomBuilder, Element, ElementFactory, Name, Node};
pub use formatter::{escape, unescape, Formatter};
pub use parser::{
    decode_entity, Checkpoint, Entity, EntityError, Error, EventLog, Handler, Limits, Parser,
    Result,
};
pub use token::{Attribute, Event};

#[macro_use]
mod macros;

/// A parser with the default [`Limits`].
///
/// A `Parser` holds no session state, so this one instance can serve
/// any number of sessions at once.
pub static DEFAULT_PARSER: Parser = Parser::new();

/// Parses a complete document, returning every top-level element.
///
/// Input that ends inside an element is not an error; the unfinished
/// element is simply not returned.
pub fn parse_str(input: &str) -> Result<Vec<Element>> {
    let mut builder = DomBuilder::new();
    DEFAULT_PARSER.parse_str(&mut builder, input)?;
    Ok(builder.take_elements())
}
