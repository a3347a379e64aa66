use token::Attribute;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Quote {
    Single,
    Double,
}

impl Quote {
    pub(crate) fn from_char(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Self::Single),
            '"' => Some(Self::Double),
            _ => None,
        }
    }

    pub(crate) fn to_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// Where the decoded text of a reference ends up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Text,
    AttributeValue(Quote),
}

// Every state is a resumption point: the input may end after any
// character, and the next chunk picks up from here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum State {
    /// Between tags
    #[default]
    Content,
    /// Seen `<`
    TagOpen,
    TagName,
    /// Inside a start tag, expecting an attribute, `/` or `>`
    InTag,
    AttrName,
    /// Whitespace after an attribute name
    AfterAttrName,
    /// Seen `=`, expecting a quote
    AttrEquals,
    AttrValue(Quote),
    /// Seen `/` inside a start tag
    SelfClosingOrEnd,
    /// Seen `</`
    EndTagName,
    EndTagTrailing,
    /// Seen `<!`, not yet known to be a comment, CDATA or declaration
    CommentOrSpecial,
    Comment,
    CData,
    Declaration,
    ProcessingInstruction,
    Reference(Target),
    Error,
}

/// Everything needed to resume a parsing session on the next chunk.
///
/// The parser holds no state of its own between calls. It receives
/// this record from [`Handler::restore`](crate::Handler::restore) and
/// hands the updated one to
/// [`Handler::checkpoint`](crate::Handler::checkpoint) before
/// returning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub(crate) state: State,
    /// Element name of the tag being read
    pub(crate) name: String,
    pub(crate) attribute_name: String,
    pub(crate) value: String,
    pub(crate) attributes: Vec<Attribute>,
    /// Character data not yet emitted
    pub(crate) text: String,
    /// A comment, CDATA section, declaration or processing
    /// instruction, delimiters included
    pub(crate) markup: String,
    /// A reference from its `&` onward
    pub(crate) entity: String,
    /// `[` nesting inside a declaration
    pub(crate) depth: usize,
    /// The start of a UTF-8 sequence cut off by the end of the chunk
    pub(crate) dangling: Vec<u8>,
    pub(crate) offset: usize,
}

impl Checkpoint {
    /// A session that has not seen any input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes consumed by the session so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True once malformed input has been seen. A failed session
    /// never produces more events.
    pub fn is_failed(&self) -> bool {
        self.state == State::Error
    }

    /// True when the input so far ended cleanly between tags, with no
    /// partial token or unflushed text.
    pub fn is_at_rest(&self) -> bool {
        self.state == State::Content && self.text.is_empty() && self.dangling.is_empty()
    }

    /// Character data that will be reported once the next tag starts.
    pub fn pending_text(&self) -> &str {
        &self.text
    }

    pub(crate) fn fail(&mut self) {
        *self = Self {
            state: State::Error,
            offset: self.offset,
            ..Self::default()
        };
    }

    pub(crate) fn take_attribute(&mut self) -> Attribute {
        Attribute {
            name: std::mem::take(&mut self.attribute_name),
            value: std::mem::take(&mut self.value),
        }
    }
}
