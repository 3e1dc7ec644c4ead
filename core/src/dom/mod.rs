pub mod parse;

use crate::selector::locate;

/// Index into the page's element arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// CSS positioning scheme of an element. Only the distinction between
/// `static` and the anchored schemes matters for marker placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssPosition {
    Static,
    Relative,
    Absolute,
    Fixed,
}

impl CssPosition {
    pub const fn as_str(self) -> &'static str {
        match self {
            CssPosition::Static => "static",
            CssPosition::Relative => "relative",
            CssPosition::Absolute => "absolute",
            CssPosition::Fixed => "fixed",
        }
    }

    /// Extracts the position declaration from an inline style string.
    pub fn from_style(style: &str) -> Self {
        for decl in style.split(';') {
            let mut parts = decl.splitn(2, ':');
            let prop = parts.next().unwrap_or("").trim();
            if !prop.eq_ignore_ascii_case("position") {
                continue;
            }
            return match parts.next().unwrap_or("").trim().to_ascii_lowercase().as_str() {
                "relative" => CssPosition::Relative,
                "absolute" => CssPosition::Absolute,
                "fixed" => CssPosition::Fixed,
                _ => CssPosition::Static,
            };
        }
        CssPosition::Static
    }

    /// Whether a child marker anchored to this element stays attached to it.
    pub fn anchors_children(self) -> bool {
        !matches!(self, CssPosition::Static)
    }
}

/// One element in the page tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id_attr: Option<String>,
    pub name_attr: Option<String>,
    pub classes: Vec<String>,
    pub position: CssPosition,
    /// Current form value for input/textarea elements.
    pub value: Option<String>,
    /// Direct text content.
    pub text: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Inserted by the synchronizer rather than parsed from markup.
    pub synthetic: bool,
    /// For marker icons: the id of the finding the marker belongs to.
    pub finding_ref: Option<String>,
    detached: bool,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id_attr: None,
            name_attr: None,
            classes: Vec::new(),
            position: CssPosition::Static,
            value: None,
            text: String::new(),
            parent: None,
            children: Vec::new(),
            synthetic: false,
            finding_ref: None,
            detached: false,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn first_class(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }

    /// Whether the element accepts a replayed payload value.
    pub fn is_text_entry(&self) -> bool {
        self.tag == "input" || self.tag == "textarea"
    }
}

/// Scroll request recorded by a jump. The page host is expected to consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollIntent {
    pub target: NodeId,
    pub smooth: bool,
    pub centered: bool,
}

/// A parsed page: element arena plus the page URL it was loaded from.
///
/// Detached nodes stay in the arena (ids remain stable) but are skipped by
/// traversal, so removal never invalidates outstanding `NodeId`s.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    nodes: Vec<Element>,
    root: NodeId,
    body: Option<NodeId>,
    pub scroll: Option<ScrollIntent>,
}

impl Page {
    pub(crate) fn from_arena(url: &str, nodes: Vec<Element>, root: NodeId) -> Self {
        let body = nodes
            .iter()
            .position(|el| el.tag == "body" && !el.detached)
            .map(NodeId);
        Self {
            url: url.to_string(),
            nodes,
            root,
            body,
            scroll: None,
        }
    }

    /// Parses an HTML document into a page model. `url` is the address the
    /// document was served from; it determines the page key.
    pub fn parse(html: &str, url: &str) -> Self {
        parse::parse_document(html, url)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Insertion root for synthetic overlay nodes.
    pub fn body(&self) -> NodeId {
        self.body.unwrap_or(self.root)
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0]
    }

    /// Live elements in document order (pre-order walk from the root).
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let el = self.element(id);
            if el.detached {
                continue;
            }
            out.push(id);
            for &child in el.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let el = self.element_mut(id);
        if !el.has_class(class) {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self.element_mut(id).classes.retain(|c| c != class);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).has_class(class)
    }

    /// Appends a synthetic element (marker icon, tooltip) under `parent`.
    pub fn append_synthetic(&mut self, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let mut el = Element::new(tag);
        el.text = text.to_string();
        el.synthetic = true;
        el.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(el);
        self.element_mut(parent).children.push(id);
        id
    }

    /// Removes a node (and implicitly its subtree) from the document.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.element(id).parent {
            self.element_mut(parent).children.retain(|&c| c != id);
        }
        let el = self.element_mut(id);
        el.detached = true;
        el.parent = None;
    }

    pub fn is_detached(&self, id: NodeId) -> bool {
        self.element(id).detached
    }

    /// True when `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.element(id).parent;
        }
        false
    }

    /// First document-order match for the selector, or `None`. Unresolvable
    /// and malformed selectors both yield `None`; a miss is never an error.
    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        locate::query(self, selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        locate::query_all(self, selector)
    }
}
