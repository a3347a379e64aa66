use hashbrown::HashMap;
use parser::{Attribute, Checkpoint, Handler};
use std::collections::{vec_deque, VecDeque};
use string_slab::{Interner, Name};
use tracing::{debug, trace, warn};
use util::{QName, XMLNS};

use crate::Element;

/// Names beyond this many distinct entries are not kept for sharing;
/// the pool starts over instead.
const NAME_POOL_LIMIT: usize = 1024;

/// Creates the element for each start tag before the builder applies
/// its attributes and namespace.
pub trait ElementFactory {
    fn element(&mut self, name: Name) -> Element;
}

/// Creates plain [`Element`]s.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultElementFactory;

impl ElementFactory for DefaultElementFactory {
    fn element(&mut self, name: Name) -> Element {
        Element::new(name)
    }
}

impl<F> ElementFactory for F
where
    F: FnMut(Name) -> Element,
{
    fn element(&mut self, name: Name) -> Element {
        self(name)
    }
}

#[derive(Debug)]
struct Open {
    element: Element,
    /// The name exactly as it appeared in the start tag
    qualified: Name,
    /// Length of the namespace undo log before this element's
    /// declarations were recorded
    undo_mark: usize,
}

/// Builds element trees from the tokens of one parsing session.
///
/// Each top-level element is queued once its end tag arrives; the
/// queue is drained in arrival order no matter how many chunks it took
/// to complete an element.
///
/// ```
/// use stanza_document::DomBuilder;
/// use parser::Parser;
///
/// let parser = Parser::new();
/// let mut builder = DomBuilder::new();
///
/// parser.parse_str(&mut builder, "<message><bo")?;
/// parser.parse_str(&mut builder, "dy>hi</body></message>")?;
///
/// let message = builder.pop_element().expect("a completed root");
/// assert_eq!(message.child_cdata(&["message", "body"]).as_deref(), Some("hi"));
/// # Ok::<(), parser::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct DomBuilder<F = DefaultElementFactory> {
    factory: F,
    names: Interner,
    stack: Vec<Open>,
    // In-scope prefix bindings. Each element's declarations are undone
    // when it closes.
    namespaces: HashMap<String, Name>,
    undo: Vec<(String, Option<Name>)>,
    roots: VecDeque<Element>,
    session: Option<Checkpoint>,
    error: Option<parser::Error>,
}

impl DomBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F> DomBuilder<F> {
    /// A builder whose elements are created by `factory`.
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            names: Interner::default(),
            stack: Vec::new(),
            namespaces: HashMap::new(),
            undo: Vec::new(),
            roots: VecDeque::new(),
            session: None,
            error: None,
        }
    }

    /// Completed top-level elements, oldest first.
    pub fn parsed_elements(&self) -> vec_deque::Iter<'_, Element> {
        self.roots.iter()
    }

    /// Removes the oldest completed top-level element.
    pub fn pop_element(&mut self) -> Option<Element> {
        self.roots.pop_front()
    }

    pub fn take_elements(&mut self) -> Vec<Element> {
        self.roots.drain(..).collect()
    }

    /// The first malformed-input error of the session, if any.
    pub fn error(&self) -> Option<&parser::Error> {
        self.error.as_ref()
    }

    /// Number of elements started but not yet ended.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Starts a new session, discarding partial elements and any error.
    /// Completed elements stay queued.
    pub fn reset(&mut self) {
        self.names.clear();
        self.stack.clear();
        self.namespaces.clear();
        self.undo.clear();
        self.session = None;
        self.error = None;
    }

    /// Number of distinct names currently kept for sharing.
    pub fn interned_names(&self) -> usize {
        self.names.len()
    }

    fn intern(&mut self, s: &str) -> Name {
        if self.names.len() >= NAME_POOL_LIMIT {
            debug!(limit = NAME_POOL_LIMIT, "name pool full, starting over");
            self.names.clear();
        }
        self.names.intern(s)
    }

    fn complete(&mut self, element: Element) {
        debug!(name = %element.name(), queued = self.roots.len() + 1, "completed element");
        self.roots.push_back(element);

        if self.stack.is_empty() {
            self.names.clear();
        }
    }

    fn unwind(&mut self, undo_mark: usize) {
        for (prefix, previous) in self.undo.drain(undo_mark..).rev() {
            match previous {
                Some(uri) => {
                    self.namespaces.insert(prefix, uri);
                }
                None => {
                    self.namespaces.remove(&prefix);
                }
            }
        }
    }
}

impl<F> Handler for DomBuilder<F>
where
    F: ElementFactory,
{
    fn start_element(&mut self, name: &str, attributes: &[Attribute]) {
        trace!(name, attributes = attributes.len(), "start element");

        // Declarations first: an element may use a prefix it declares
        let undo_mark = self.undo.len();
        for a in attributes {
            if let Some(prefix) = QName::parse(&a.name).namespace_declaration() {
                let uri = Name::from(a.value.as_str());
                let previous = self.namespaces.insert(prefix.to_owned(), uri);
                self.undo.push((prefix.to_owned(), previous));
            }
        }

        let qualified = self.intern(name);
        let qname = QName::parse(name);
        let resolved = qname
            .prefix
            .and_then(|prefix| self.namespaces.get(prefix))
            .cloned();

        let local = match resolved {
            Some(_) => self.intern(qname.local_part),
            None => qualified.clone(),
        };
        let mut element = self.factory.element(local);

        for a in attributes {
            if QName::parse(&a.name).is_default_namespace_declaration() {
                element.set_xmlns(a.value.as_str());
            } else {
                element.set_attribute(self.intern(&a.name), a.value.as_str());
            }
        }

        if let (Some(uri), Some(prefix)) = (resolved, qname.prefix) {
            element.remove_attribute(&format!("{}:{}", XMLNS, prefix));
            element.set_xmlns(uri);
        }

        if element.explicit_xmlns().is_none() {
            let inherited = self.stack.last().and_then(|p| p.element.xmlns_name());
            if let Some(inherited) = inherited.cloned() {
                element.set_default_xmlns(inherited);
            }
        }

        self.stack.push(Open {
            element,
            qualified,
            undo_mark,
        });
    }

    fn element_cdata(&mut self, text: &str) {
        trace!(len = text.len(), "text");

        match self.stack.last_mut() {
            Some(open) => open.element.append_cdata(text),
            None => trace!("ignoring text outside of any element"),
        }
    }

    fn end_element(&mut self, name: &str) {
        trace!(name, "end element");

        let Some(open) = self.stack.pop() else {
            warn!(name, "end tag without a start tag");
            let name = self.intern(name);
            let element = self.factory.element(name);
            self.complete(element);
            return;
        };

        if open.qualified != *name {
            warn!(expected = %open.qualified, found = name, "mismatched end tag");
        }

        self.unwind(open.undo_mark);

        match self.stack.last_mut() {
            Some(parent) => parent.element.add_child(open.element),
            None => self.complete(open.element),
        }
    }

    fn other_xml(&mut self, markup: &str) {
        trace!(len = markup.len(), "other markup");
    }

    fn error(&mut self, error: &parser::Error) {
        debug!(%error, depth = self.stack.len(), "session failed");

        if self.error.is_none() {
            self.error = Some(error.clone());
        }
    }

    fn checkpoint(&mut self, checkpoint: Checkpoint) {
        self.session = Some(checkpoint);
    }

    fn restore(&mut self) -> Option<Checkpoint> {
        self.session.take()
    }
}
