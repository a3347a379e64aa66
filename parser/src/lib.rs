#![deny(rust_2018_idioms)]

//! A resumable XML tokenizer for streams of fragments.
//!
//! Input arrives in chunks of any size, possibly splitting a tag, a
//! reference or even a UTF-8 sequence. The [`Parser`] walks each chunk
//! one character at a time and reports complete tokens to a
//! [`Handler`]. Everything needed to continue with the next chunk is
//! kept in a [`Checkpoint`] that the handler stores between calls, so
//! one `Parser` can serve any number of independent sessions.
//!
//! ```
//! use stanza_parser::{Event, EventLog, Parser};
//!
//! let parser = Parser::new();
//! let mut log = EventLog::new();
//!
//! parser.parse(&mut log, b"<mess")?;
//! parser.parse(&mut log, b"age/>")?;
//!
//! assert_eq!(
//!     log.events(),
//!     [
//!         Event::StartElement {
//!             name: "message".into(),
//!             attributes: vec![],
//!         },
//!         Event::EndElement("message".into()),
//!     ],
//! );
//! # Ok::<(), stanza_parser::Error>(())
//! ```

use snafu::{ensure, ResultExt, Snafu};
use std::{fmt, mem, str};
use tracing::{debug, warn};
use xml_str::CharExt;

pub use token::{Attribute, Event};

mod checkpoint;
mod reference;

pub use checkpoint::Checkpoint;
use checkpoint::{Quote, State, Target};
pub use reference::{decode_entity, Entity, EntityError};

const COMMENT_OPEN: &str = "<!--";
const COMMENT_MIN: &str = "<!---->";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_MIN: &str = "<![CDATA[]]>";
const PI_MIN: &str = "<??>";

/// Receives tokens in document order.
pub trait Handler {
    /// A start tag, with every attribute value fully decoded. A
    /// self-closing tag is reported as a start followed by an end.
    fn start_element(&mut self, name: &str, attributes: &[Attribute]);

    /// Decoded character data. Text is reported in one piece when the
    /// next tag begins, however the input was split.
    fn element_cdata(&mut self, text: &str);

    /// An end tag. Whether it matches the open element is for the
    /// handler to decide.
    fn end_element(&mut self, name: &str);

    /// A comment, CDATA section, declaration or processing
    /// instruction, exactly as it appeared.
    fn other_xml(&mut self, markup: &str) {
        let _ = markup;
    }

    /// Malformed input. Called at most once per session.
    fn error(&mut self, error: &Error);

    /// Stores the session at the end of a call.
    fn checkpoint(&mut self, checkpoint: Checkpoint);

    /// Returns the session stored by the previous call, if any.
    fn restore(&mut self) -> Option<Checkpoint>;
}

/// Bounds on token sizes, so that untrusted input cannot grow a
/// session without limit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_name_len: usize,
    pub max_attributes: usize,
    pub max_attribute_value_len: usize,
    pub max_cdata_len: usize,
    /// Including the `&` and `;`
    pub max_entity_len: usize,
    pub max_markup_len: usize,
}

impl Limits {
    pub const DEFAULT: Self = Self {
        max_name_len: 1024,
        max_attributes: 50,
        max_attribute_value_len: 10 * 1024,
        max_cdata_len: 1024 * 1024,
        max_entity_len: 16,
        max_markup_len: 1024 * 1024,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Limit {
    NameLength,
    Attributes,
    AttributeValueLength,
    CDataLength,
    EntityLength,
    MarkupLength,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NameLength => "name length",
            Self::Attributes => "attribute count",
            Self::AttributeValueLength => "attribute value length",
            Self::CDataLength => "character data length",
            Self::EntityLength => "reference length",
            Self::MarkupLength => "markup length",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expected {
    NameStart,
    TagContinuation,
    Equals,
    Quote,
    AttributeValue,
    TagEnd,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NameStart => "the start of a name",
            Self::TagContinuation => "whitespace, an attribute, `/` or `>`",
            Self::Equals => "`=`",
            Self::Quote => "a single or double quote",
            Self::AttributeValue => "attribute value text or the closing quote",
            Self::TagEnd => "`>`",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display(
        "The character {:?} at byte {} is not allowed in XML",
        character,
        location,
    ))]
    InvalidChar { character: char, location: usize },

    #[snafu(display(
        "The {} bytes of input data, starting at byte {}, was not UTF-8",
        length,
        location,
    ))]
    InputNotUtf8 { location: usize, length: usize },

    #[snafu(display(
        "Expected {} at byte {}, but found {:?}",
        expected,
        location,
        character,
    ))]
    UnexpectedChar {
        character: char,
        expected: Expected,
        location: usize,
    },

    #[snafu(display("Malformed reference ending at byte {}", location))]
    InvalidEntity {
        source: EntityError,
        location: usize,
    },

    #[snafu(display("The attribute {:?} is repeated at byte {}", name, location))]
    DuplicateAttribute { name: String, location: usize },

    #[snafu(display("The {} limit was exceeded at byte {}", limit, location))]
    LimitExceeded { limit: Limit, location: usize },

    #[snafu(display("The session already failed and cannot be resumed"))]
    SessionFailed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The tokenizer. It only holds configuration; all session state lives
/// in the [`Checkpoint`] kept by the handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Parser {
    limits: Limits,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub const fn new() -> Self {
        Self::with_limits(Limits::DEFAULT)
    }

    pub const fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Feeds the next chunk of a session.
    ///
    /// Partial tokens at the end of the chunk are saved and completed
    /// by a later call. To process a window of a larger buffer, pass a
    /// slice of it.
    ///
    /// On malformed input the handler's [`Handler::error`] is called,
    /// the session is marked failed and the error is returned. Every
    /// later call for that session returns [`Error::SessionFailed`]
    /// without reporting anything.
    pub fn parse<H>(&self, handler: &mut H, input: &[u8]) -> Result<()>
    where
        H: Handler + ?Sized,
    {
        let mut checkpoint = match handler.restore() {
            Some(checkpoint) => {
                debug!(
                    offset = checkpoint.offset,
                    state = ?checkpoint.state,
                    "resuming session"
                );
                checkpoint
            }
            None => Checkpoint::new(),
        };

        if checkpoint.is_failed() {
            handler.checkpoint(checkpoint);
            return SessionFailedSnafu.fail();
        }

        let result = Session {
            limits: &self.limits,
            cp: &mut checkpoint,
            handler: &mut *handler,
        }
        .feed(input);

        if let Err(error) = &result {
            warn!(%error, "malformed input");
            checkpoint.fail();
            handler.error(error);
        }

        handler.checkpoint(checkpoint);
        result
    }

    pub fn parse_str<H>(&self, handler: &mut H, input: &str) -> Result<()>
    where
        H: Handler + ?Sized,
    {
        self.parse(handler, input.as_bytes())
    }
}

struct Session<'a, H: ?Sized> {
    limits: &'a Limits,
    cp: &'a mut Checkpoint,
    handler: &'a mut H,
}

impl<H> Session<'_, H>
where
    H: Handler + ?Sized,
{
    fn feed(&mut self, input: &[u8]) -> Result<()> {
        let input = self.complete_dangling(input)?;

        match str::from_utf8(input) {
            Ok(s) => self.feed_str(s),
            Err(e) => {
                let (valid, rest) = input.split_at(e.valid_up_to());

                // SAFETY: `valid_up_to` bytes were just checked
                let valid = unsafe { str::from_utf8_unchecked(valid) };
                self.feed_str(valid)?;

                match e.error_len() {
                    Some(length) => InputNotUtf8Snafu {
                        location: self.cp.offset,
                        length,
                    }
                    .fail(),
                    None => {
                        self.cp.dangling.extend_from_slice(rest);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Finishes a UTF-8 sequence left over from the previous chunk,
    /// returning the rest of the input.
    fn complete_dangling<'i>(&mut self, mut input: &'i [u8]) -> Result<&'i [u8]> {
        while !self.cp.dangling.is_empty() {
            let Some((&b, rest)) = input.split_first() else {
                break;
            };
            input = rest;
            self.cp.dangling.push(b);

            match str::from_utf8(&self.cp.dangling) {
                Ok(s) => {
                    let c = s.chars().next();
                    self.cp.dangling.clear();
                    if let Some(c) = c {
                        self.feed_char(c)?;
                    }
                }
                Err(e) => {
                    if let Some(length) = e.error_len() {
                        return InputNotUtf8Snafu {
                            location: self.cp.offset,
                            length,
                        }
                        .fail();
                    }
                }
            }
        }

        Ok(input)
    }

    fn feed_str(&mut self, s: &str) -> Result<()> {
        s.chars().try_for_each(|c| self.feed_char(c))
    }

    fn feed_char(&mut self, c: char) -> Result<()> {
        self.step(c)?;
        self.cp.offset += c.len_utf8();
        Ok(())
    }

    fn step(&mut self, c: char) -> Result<()> {
        use State::*;

        let location = self.cp.offset;
        ensure!(
            c.is_xml_char(),
            InvalidCharSnafu {
                character: c,
                location
            }
        );

        match self.cp.state {
            Content => match c {
                '<' => {
                    self.flush_text();
                    self.cp.state = TagOpen;
                }
                '&' => self.begin_reference(Target::Text),
                c => push_limited(
                    &mut self.cp.text,
                    c,
                    self.limits.max_cdata_len,
                    Limit::CDataLength,
                    location,
                )?,
            },

            TagOpen => match c {
                '/' => self.cp.state = EndTagName,
                '!' => self.begin_markup("<!", CommentOrSpecial),
                '?' => self.begin_markup("<?", ProcessingInstruction),
                c if c.is_name_start_char() => {
                    self.push_name(c)?;
                    self.cp.state = TagName;
                }
                c => return self.unexpected(c, Expected::NameStart),
            },

            TagName => match c {
                c if c.is_name_char() => self.push_name(c)?,
                c if c.is_xml_space() => self.cp.state = InTag,
                '/' => self.cp.state = SelfClosingOrEnd,
                '>' => self.finish_start_tag(false),
                c => return self.unexpected(c, Expected::TagContinuation),
            },

            InTag => match c {
                c if c.is_xml_space() => {}
                '/' => self.cp.state = SelfClosingOrEnd,
                '>' => self.finish_start_tag(false),
                c if c.is_name_start_char() => {
                    self.push_attribute_name(c)?;
                    self.cp.state = AttrName;
                }
                c => return self.unexpected(c, Expected::TagContinuation),
            },

            AttrName => match c {
                c if c.is_name_char() => self.push_attribute_name(c)?,
                c if c.is_xml_space() => self.cp.state = AfterAttrName,
                '=' => self.cp.state = AttrEquals,
                c => return self.unexpected(c, Expected::Equals),
            },

            AfterAttrName => match c {
                c if c.is_xml_space() => {}
                '=' => self.cp.state = AttrEquals,
                c => return self.unexpected(c, Expected::Equals),
            },

            AttrEquals => match Quote::from_char(c) {
                Some(quote) => self.cp.state = AttrValue(quote),
                None if c.is_xml_space() => {}
                None => return self.unexpected(c, Expected::Quote),
            },

            AttrValue(quote) => match c {
                c if c == quote.to_char() => {
                    self.finish_attribute()?;
                    self.cp.state = InTag;
                }
                '<' => return self.unexpected(c, Expected::AttributeValue),
                '&' => self.begin_reference(Target::AttributeValue(quote)),
                c => push_limited(
                    &mut self.cp.value,
                    c,
                    self.limits.max_attribute_value_len,
                    Limit::AttributeValueLength,
                    location,
                )?,
            },

            SelfClosingOrEnd => match c {
                '>' => self.finish_start_tag(true),
                c => return self.unexpected(c, Expected::TagEnd),
            },

            EndTagName if self.cp.name.is_empty() => match c {
                c if c.is_name_start_char() => self.push_name(c)?,
                c => return self.unexpected(c, Expected::NameStart),
            },

            EndTagName => match c {
                c if c.is_name_char() => self.push_name(c)?,
                c if c.is_xml_space() => self.cp.state = EndTagTrailing,
                '>' => self.finish_end_tag(),
                c => return self.unexpected(c, Expected::TagEnd),
            },

            EndTagTrailing => match c {
                c if c.is_xml_space() => {}
                '>' => self.finish_end_tag(),
                c => return self.unexpected(c, Expected::TagEnd),
            },

            CommentOrSpecial => self.classify_markup(c)?,

            Comment => {
                self.push_markup(c)?;
                self.finish_markup_if(COMMENT_MIN.len(), "-->");
            }

            CData => {
                self.push_markup(c)?;
                self.finish_markup_if(CDATA_MIN.len(), "]]>");
            }

            ProcessingInstruction => {
                self.push_markup(c)?;
                self.finish_markup_if(PI_MIN.len(), "?>");
            }

            Declaration => self.declaration(c)?,

            Reference(target) => self.reference(c, target)?,

            State::Error => return SessionFailedSnafu.fail(),
        }

        Ok(())
    }

    fn unexpected(&self, character: char, expected: Expected) -> Result<()> {
        UnexpectedCharSnafu {
            character,
            expected,
            location: self.cp.offset,
        }
        .fail()
    }

    fn push_name(&mut self, c: char) -> Result<()> {
        push_limited(
            &mut self.cp.name,
            c,
            self.limits.max_name_len,
            Limit::NameLength,
            self.cp.offset,
        )
    }

    fn push_attribute_name(&mut self, c: char) -> Result<()> {
        push_limited(
            &mut self.cp.attribute_name,
            c,
            self.limits.max_name_len,
            Limit::NameLength,
            self.cp.offset,
        )
    }

    fn push_markup(&mut self, c: char) -> Result<()> {
        push_limited(
            &mut self.cp.markup,
            c,
            self.limits.max_markup_len,
            Limit::MarkupLength,
            self.cp.offset,
        )
    }

    fn flush_text(&mut self) {
        if !self.cp.text.is_empty() {
            self.handler.element_cdata(&self.cp.text);
            self.cp.text.clear();
        }
    }

    fn finish_start_tag(&mut self, self_closing: bool) {
        self.handler
            .start_element(&self.cp.name, &self.cp.attributes);
        if self_closing {
            self.handler.end_element(&self.cp.name);
        }

        self.cp.name.clear();
        self.cp.attributes.clear();
        self.cp.state = State::Content;
    }

    fn finish_end_tag(&mut self) {
        self.handler.end_element(&self.cp.name);

        self.cp.name.clear();
        self.cp.state = State::Content;
    }

    fn finish_attribute(&mut self) -> Result<()> {
        let location = self.cp.offset;
        let cp = &mut *self.cp;

        ensure!(
            !cp.attributes.iter().any(|a| a.name == cp.attribute_name),
            DuplicateAttributeSnafu {
                name: cp.attribute_name.as_str(),
                location,
            }
        );
        ensure!(
            cp.attributes.len() < self.limits.max_attributes,
            LimitExceededSnafu {
                limit: Limit::Attributes,
                location,
            }
        );

        let attribute = cp.take_attribute();
        cp.attributes.push(attribute);
        Ok(())
    }

    fn begin_markup(&mut self, open: &str, state: State) {
        self.cp.markup.clear();
        self.cp.markup.push_str(open);
        self.cp.state = state;
    }

    /// After `<!` the markup could still become a comment or CDATA
    /// section; anything else is a declaration.
    fn classify_markup(&mut self, c: char) -> Result<()> {
        self.push_markup(c)?;

        let markup = self.cp.markup.as_str();
        if markup == COMMENT_OPEN {
            self.cp.state = State::Comment;
        } else if markup == CDATA_OPEN {
            self.cp.state = State::CData;
        } else if !COMMENT_OPEN.starts_with(markup) && !CDATA_OPEN.starts_with(markup) {
            let prefix_len = markup.len() - c.len_utf8();
            self.cp.markup.truncate(prefix_len);
            self.cp.depth = self.cp.markup.matches('[').count();
            self.cp.state = State::Declaration;
            return self.declaration(c);
        }

        Ok(())
    }

    fn declaration(&mut self, c: char) -> Result<()> {
        self.push_markup(c)?;

        match c {
            '[' => self.cp.depth += 1,
            ']' => self.cp.depth = self.cp.depth.saturating_sub(1),
            '>' if self.cp.depth == 0 => self.finish_markup(),
            _ => {}
        }

        Ok(())
    }

    fn finish_markup_if(&mut self, min_len: usize, close: &str) {
        if self.cp.markup.len() >= min_len && self.cp.markup.ends_with(close) {
            self.finish_markup();
        }
    }

    fn finish_markup(&mut self) {
        self.handler.other_xml(&self.cp.markup);

        self.cp.markup.clear();
        self.cp.depth = 0;
        self.cp.state = State::Content;
    }

    fn begin_reference(&mut self, target: Target) {
        self.cp.entity.clear();
        self.cp.entity.push('&');
        self.cp.state = State::Reference(target);
    }

    fn reference(&mut self, c: char, target: Target) -> Result<()> {
        let location = self.cp.offset;

        match c {
            ';' => {
                let cp = &mut *self.cp;
                cp.entity.push(';');

                let entity = decode_entity(&cp.entity).context(InvalidEntitySnafu { location })?;

                let (buf, max, limit) = match target {
                    Target::Text => (&mut cp.text, self.limits.max_cdata_len, Limit::CDataLength),
                    Target::AttributeValue(_) => (
                        &mut cp.value,
                        self.limits.max_attribute_value_len,
                        Limit::AttributeValueLength,
                    ),
                };
                ensure!(
                    buf.len() + entity.text_len() <= max,
                    LimitExceededSnafu { limit, location }
                );
                entity.push_to(buf);

                cp.entity.clear();
                cp.state = match target {
                    Target::Text => State::Content,
                    Target::AttributeValue(quote) => State::AttrValue(quote),
                };
                Ok(())
            }

            c if c == '#' || c.is_name_char() => push_limited(
                &mut self.cp.entity,
                c,
                // Leave room for the semicolon
                self.limits.max_entity_len.saturating_sub(1),
                Limit::EntityLength,
                location,
            ),

            _ => Err(Error::InvalidEntity {
                source: EntityError::Unterminated {
                    span: self.cp.entity.clone(),
                },
                location,
            }),
        }
    }
}

fn push_limited(
    buf: &mut String,
    c: char,
    max: usize,
    limit: Limit,
    location: usize,
) -> Result<()> {
    ensure!(
        buf.len() + c.len_utf8() <= max,
        LimitExceededSnafu { limit, location }
    );
    buf.push(c);
    Ok(())
}

/// A handler that records every token as an owned [`Event`] and keeps
/// its own session.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    session: Option<Checkpoint>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// The stored session, once anything has been parsed.
    pub fn session(&self) -> Option<&Checkpoint> {
        self.session.as_ref()
    }
}

impl Handler for EventLog {
    fn start_element(&mut self, name: &str, attributes: &[Attribute]) {
        self.events.push(Event::start(name, attributes.iter().cloned()));
    }

    fn element_cdata(&mut self, text: &str) {
        self.events.push(Event::CharData(text.into()));
    }

    fn end_element(&mut self, name: &str) {
        self.events.push(Event::EndElement(name.into()));
    }

    fn other_xml(&mut self, markup: &str) {
        self.events.push(Event::OtherMarkup(markup.into()));
    }

    fn error(&mut self, error: &Error) {
        self.events.push(Event::Error(error.to_string()));
    }

    fn checkpoint(&mut self, checkpoint: Checkpoint) {
        self.session = Some(checkpoint);
    }

    fn restore(&mut self) -> Option<Checkpoint> {
        self.session.take()
    }
}
