use formatter::escape;
use std::{cmp::Ordering, fmt};
use string_slab::Name;
use util::XMLNS;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Node {
    Element(Element),
    /// Decoded character data
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Element(_) => None,
            Node::Text(t) => Some(t),
        }
    }

    /// Like `to_string`, but text longer than two characters is
    /// replaced by its size so that payloads stay out of logs.
    pub fn render_secure(&self) -> String {
        Secure(self).to_string()
    }

    fn write_to(&self, f: &mut impl fmt::Write, secure: bool) -> fmt::Result {
        match self {
            Node::Element(e) => e.write_to(f, secure),
            Node::Text(t) if secure && t.chars().count() > 2 => {
                write!(f, "CData size: {}", t.chars().count())
            }
            Node::Text(t) => f.write_str(&escape(t)),
        }
    }

    fn write_pretty(&self, f: &mut impl fmt::Write) -> fmt::Result {
        match self {
            Node::Element(e) => e.write_pretty(f),
            Node::Text(t) => f.write_str(&escape(t)),
        }
    }
}

impl From<Element> for Node {
    fn from(other: Element) -> Self {
        Node::Element(other)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false)
    }
}

struct Secure<'a>(&'a Node);

impl fmt::Display for Secure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_to(f, true)
    }
}

/// One XML element.
///
/// Attribute keys are unique and keep their insertion order; so do
/// children. The `xmlns` attribute and the element's own namespace are
/// the same value, kept in sync by every setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: Name,
    attributes: Vec<(Name, String)>,
    children: Vec<Node>,
    xmlns: Option<Name>,
    /// Inherited from the enclosing element when this one has no
    /// namespace of its own
    default_xmlns: Option<Name>,
}

impl Element {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            xmlns: None,
            default_xmlns: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<Name>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.add_child(child);
        self
    }

    pub fn with_cdata(mut self, text: impl Into<String>) -> Self {
        self.set_cdata(text);
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<Name>) {
        self.name = name.into();
    }

    // ----------

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Adds or replaces an attribute. Setting `xmlns` also sets the
    /// element's namespace.
    pub fn set_attribute(&mut self, key: impl Into<Name>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        if key == XMLNS {
            self.xmlns = Some(Name::from(value.as_str()));
        }
        self.put_attribute(key, value);
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let i = self.attributes.iter().position(|(k, _)| k == key)?;

        if key == XMLNS {
            self.xmlns = None;
        }
        Some(self.attributes.remove(i).1)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn put_attribute(&mut self, key: Name, value: String) {
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    // ----------

    pub fn add_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn add_children(&mut self, children: impl IntoIterator<Item = Element>) {
        self.children
            .extend(children.into_iter().map(Node::Element));
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(Node::as_element)
    }

    /// The first child element with this name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name() == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name() == name => Some(e),
            _ => None,
        })
    }

    /// The first child element with this name and effective namespace.
    /// Without a namespace this is [`Element::child`].
    pub fn child_with_xmlns(&self, name: &str, xmlns: Option<&str>) -> Option<&Element> {
        match xmlns {
            None => self.child(name),
            Some(ns) => self
                .child_elements()
                .find(|e| e.name() == name && e.xmlns() == Some(ns)),
        }
    }

    /// Removes the first child equal to `child`.
    pub fn remove_child(&mut self, child: &Element) -> bool {
        match self
            .children
            .iter()
            .position(|n| n.as_element() == Some(child))
        {
            Some(i) => {
                self.children.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn find_child_by(&self, mut predicate: impl FnMut(&Element) -> bool) -> Option<&Element> {
        self.child_elements().find(|e| predicate(*e))
    }

    pub fn find_children<'a>(
        &'a self,
        mut predicate: impl FnMut(&Element) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| predicate(*e))
    }

    pub fn map_children<R>(&self, f: impl FnMut(&Element) -> R) -> Vec<R> {
        self.child_elements().map(f).collect()
    }

    /// The child elements of the element at `path`, or `None` when
    /// nothing is there.
    pub fn children_at<S>(&self, path: &[S]) -> Option<Vec<&Element>>
    where
        S: AsRef<str>,
    {
        Some(self.find_child(path)?.child_elements().collect())
    }

    // ----------

    /// Walks a path of element names. The first segment names this
    /// element; an empty leading segment (from `/a/b`) is skipped.
    pub fn find_child<S>(&self, path: &[S]) -> Option<&Element>
    where
        S: AsRef<str>,
    {
        let path = match path.split_first() {
            Some((first, rest)) if first.as_ref().is_empty() => rest,
            _ => path,
        };

        let (first, rest) = path.split_first()?;
        if first.as_ref() != self.name() {
            return None;
        }

        rest.iter()
            .try_fold(self, |e, segment| e.child(segment.as_ref()))
    }

    /// [`Element::find_child`] with a `/`-separated path.
    pub fn find_child_path(&self, path: &str) -> Option<&Element> {
        let segments: Vec<_> = path.split('/').collect();
        self.find_child(&segments)
    }

    pub fn child_cdata<S>(&self, path: &[S]) -> Option<String>
    where
        S: AsRef<str>,
    {
        self.find_child(path)?.cdata()
    }

    pub fn attribute_at<S>(&self, path: &[S], key: &str) -> Option<&str>
    where
        S: AsRef<str>,
    {
        self.find_child(path)?.attribute(key)
    }

    pub fn xmlns_at<S>(&self, path: &[S]) -> Option<&str>
    where
        S: AsRef<str>,
    {
        self.find_child(path)?.xmlns()
    }

    // ----------

    /// All direct text children, joined. `None` when there are none.
    pub fn cdata(&self) -> Option<String> {
        let mut texts = self
            .children
            .iter()
            .filter_map(Node::as_text)
            .peekable();
        texts.peek()?;
        Some(texts.collect())
    }

    /// Replaces the first text child, or adds one.
    pub fn set_cdata(&mut self, text: impl Into<String>) {
        let text = text.into();

        match self.children.iter_mut().find_map(|n| match n {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }) {
            Some(t) => *t = text,
            None => self.children.push(Node::Text(text)),
        }
    }

    /// Extends the last child when it is text, otherwise adds a new
    /// text child.
    pub fn append_cdata(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(Node::Text(t)) => t.push_str(text),
            _ => self.children.push(Node::Text(text.into())),
        }
    }

    // ----------

    /// The effective namespace: this element's own, otherwise the
    /// inherited one.
    pub fn xmlns(&self) -> Option<&str> {
        self.xmlns_name().map(Name::as_str)
    }

    pub fn explicit_xmlns(&self) -> Option<&str> {
        self.xmlns.as_deref()
    }

    /// Sets the namespace and the `xmlns` attribute.
    pub fn set_xmlns(&mut self, xmlns: impl Into<Name>) {
        let xmlns = xmlns.into();
        self.put_attribute(Name::from(XMLNS), xmlns.to_string());
        self.xmlns = Some(xmlns);
    }

    /// Removes the namespace and the `xmlns` attribute.
    pub fn clear_xmlns(&mut self) {
        self.remove_attribute(XMLNS);
        self.xmlns = None;
    }

    pub fn default_xmlns(&self) -> Option<&str> {
        self.default_xmlns.as_deref()
    }

    pub fn set_default_xmlns(&mut self, xmlns: impl Into<Name>) {
        self.default_xmlns = Some(xmlns.into());
    }

    pub(crate) fn xmlns_name(&self) -> Option<&Name> {
        self.xmlns.as_ref().or(self.default_xmlns.as_ref())
    }

    // ----------

    /// Like `to_string`, but text longer than two characters is
    /// replaced by its size so that payloads stay out of logs.
    pub fn render_secure(&self) -> String {
        let mut s = String::new();
        // Writing to a `String` cannot fail
        let _ = self.write_to(&mut s, true);
        s
    }

    /// Renders every element tag on a line of its own.
    pub fn render_pretty(&self) -> String {
        let mut s = String::new();
        let _ = self.write_pretty(&mut s);
        s
    }

    /// The children as [`Element::render_pretty`] writes them, or `None`
    /// when there are no children.
    pub fn children_pretty(&self) -> Option<String> {
        if self.children.is_empty() {
            return None;
        }

        let mut s = String::new();
        for child in &self.children {
            let _ = child.write_pretty(&mut s);
        }
        Some(s)
    }

    /// The start tag with this element's own text but none of its child
    /// elements.
    pub fn render_without_children(&self) -> String {
        let mut s = String::new();
        let _ = self.write_without_children(&mut s);
        s
    }

    fn write_start(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (k, v) in &self.attributes {
            write!(f, r#" {}="{}""#, k, escape(v))?;
        }
        Ok(())
    }

    fn write_to(&self, f: &mut impl fmt::Write, secure: bool) -> fmt::Result {
        self.write_start(f)?;

        if self.children.is_empty() {
            return f.write_str("/>");
        }

        f.write_str(">")?;
        for child in &self.children {
            child.write_to(f, secure)?;
        }
        write!(f, "</{}>", self.name)
    }

    fn write_pretty(&self, f: &mut impl fmt::Write) -> fmt::Result {
        self.write_start(f)?;

        if self.children.is_empty() {
            return f.write_str("/>\n");
        }

        f.write_str(">\n")?;
        for child in &self.children {
            child.write_pretty(f)?;
        }
        writeln!(f, "</{}>", self.name)
    }

    fn write_without_children(&self, f: &mut impl fmt::Write) -> fmt::Result {
        self.write_start(f)?;

        match self.cdata() {
            Some(text) => write!(f, ">{}</{}>", escape(&text), self.name),
            None => f.write_str("/>"),
        }
    }
}

/// Elements order by [`Element::render_without_children`] first, then
/// by their children.
impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Self) -> Ordering {
        self.render_without_children()
            .cmp(&other.render_without_children())
            .then_with(|| self.children.cmp(&other.children))
            .then_with(|| self.default_xmlns.cmp(&other.default_xmlns))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false)
    }
}
