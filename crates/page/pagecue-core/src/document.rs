//! Host document abstraction and an in-memory implementation.
//!
//! The core never touches a real DOM. Adapters implement [`Document`] over
//! whatever tree they own (the wasm adapter wraps `web_sys`); tests and
//! headless simulation use [`MemoryDocument`].
//!
//! Every mutator must tolerate detached or unknown elements: timers can fire
//! after the element they target has left the document, and such writes are
//! silently dropped.

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Viewport};
use crate::ids::ElementId;
use crate::selector::{Matchable, Selector};

/// Host document seen by the core.
pub trait Document: 'static {
    /// All attached elements matching `selector`, in document order.
    fn query_all(&self, selector: &Selector) -> Vec<ElementId>;
    /// Attached descendants of `root` matching `selector`, in document order.
    fn query_within(&self, root: ElementId, selector: &Selector) -> Vec<ElementId>;
    /// Every attached descendant of `root`, in document order.
    fn descendants(&self, root: ElementId) -> Vec<ElementId>;
    fn by_id(&self, id: &str) -> Option<ElementId>;
    fn matches(&self, el: ElementId, selector: &Selector) -> bool;
    fn parent(&self, el: ElementId) -> Option<ElementId>;
    fn dom_id(&self, el: ElementId) -> Option<String>;
    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;
    fn has_class(&self, el: ElementId, class: &str) -> bool;
    fn add_class(&mut self, el: ElementId, class: &str);
    fn remove_class(&mut self, el: ElementId, class: &str);
    fn text(&self, el: ElementId) -> Option<String>;
    fn set_text(&mut self, el: ElementId, text: &str);
    fn set_html(&mut self, el: ElementId, html: &str);
    fn set_inline_width(&mut self, el: ElementId, width: &str);
    /// Document-space bounds, `None` if unknown or detached.
    fn bounds(&self, el: ElementId) -> Option<Rect>;
    fn is_attached(&self, el: ElementId) -> bool;
    /// Detach `el` and its subtree.
    fn remove(&mut self, el: ElementId);
    fn body(&self) -> Option<ElementId>;
    fn set_scroll_lock(&mut self, locked: bool);

    /// Nearest inclusive ancestor of `el` matching `selector`.
    fn closest(&self, el: ElementId, selector: &Selector) -> Option<ElementId> {
        let mut cur = Some(el);
        while let Some(e) = cur {
            if self.matches(e, selector) {
                return Some(e);
            }
            cur = self.parent(e);
        }
        None
    }
}

/// Declarative description of an element subtree, used to build
/// [`MemoryDocument`]s in tests and from JSON page fixtures.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attrs: Vec<(String, String)>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bounds: Rect,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// A page: viewport plus the children of `<body>`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageSpec {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    dom_id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    text: String,
    html: Option<String>,
    inline_width: Option<String>,
    bounds: Rect,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attached: bool,
    text_writes: usize,
}

impl Matchable for Node {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn dom_id(&self) -> Option<&str> {
        self.dom_id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        if name == "id" {
            return self.dom_id.as_deref();
        }
        if name == "class" {
            return None;
        }
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory document tree. Element 0 is always `<body>`.
#[derive(Clone, Debug)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    scroll_locked: bool,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let body = Node {
            tag: "body".to_string(),
            dom_id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
            text: String::new(),
            html: None,
            inline_width: None,
            bounds: Rect::default(),
            parent: None,
            children: Vec::new(),
            attached: true,
            text_writes: 0,
        };
        Self {
            nodes: vec![body],
            scroll_locked: false,
        }
    }

    /// Build a document whose body holds `page.elements`; returns the page viewport too.
    pub fn from_page(page: &PageSpec) -> (Self, Viewport) {
        let mut doc = Self::new();
        let body = ElementId(0);
        for spec in &page.elements {
            doc.append(body, spec.clone());
        }
        (doc, page.viewport)
    }

    /// Append `spec` (and its children) under `parent`. Returns the new element.
    pub fn append(&mut self, parent: ElementId, spec: ElementSpec) -> ElementId {
        let id = ElementId(self.nodes.len() as u32);
        let attached = self.node(parent).map(|p| p.attached).unwrap_or(false);
        self.nodes.push(Node {
            tag: spec.tag.to_ascii_lowercase(),
            dom_id: spec.id,
            classes: spec.classes,
            attrs: spec.attrs,
            text: spec.text,
            html: None,
            inline_width: None,
            bounds: spec.bounds,
            parent: Some(parent),
            children: Vec::new(),
            attached,
            text_writes: 0,
        });
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        for child in spec.children {
            self.append(id, child);
        }
        id
    }

    pub fn set_bounds(&mut self, el: ElementId, bounds: Rect) {
        if let Some(n) = self.node_mut(el) {
            n.bounds = bounds;
        }
    }

    pub fn classes(&self, el: ElementId) -> &[String] {
        self.node(el).map(|n| n.classes.as_slice()).unwrap_or(&[])
    }

    pub fn html(&self, el: ElementId) -> Option<&str> {
        self.node(el).and_then(|n| n.html.as_deref())
    }

    pub fn inline_width(&self, el: ElementId) -> Option<&str> {
        self.node(el).and_then(|n| n.inline_width.as_deref())
    }

    /// Number of `set_text` writes that reached `el`.
    pub fn text_writes(&self, el: ElementId) -> usize {
        self.node(el).map(|n| n.text_writes).unwrap_or(0)
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.0 as usize)
    }

    fn node_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(el.0 as usize)
    }

    fn live(&self, el: ElementId) -> Option<&Node> {
        self.node(el).filter(|n| n.attached)
    }

    fn live_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.node_mut(el).filter(|n| n.attached)
    }

    fn collect_matching(&self, root: ElementId, selector: &Selector, out: &mut Vec<ElementId>) {
        let Some(node) = self.live(root) else {
            return;
        };
        for &child in &node.children {
            if let Some(c) = self.live(child) {
                if selector.matches(c) {
                    out.push(child);
                }
                self.collect_matching(child, selector, out);
            }
        }
    }
}

impl Document for MemoryDocument {
    fn query_all(&self, selector: &Selector) -> Vec<ElementId> {
        let mut out = Vec::new();
        if let Some(body) = self.live(ElementId(0)) {
            if selector.matches(body) {
                out.push(ElementId(0));
            }
        }
        self.collect_matching(ElementId(0), selector, &mut out);
        out
    }

    fn query_within(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_matching(root, selector, &mut out);
        out
    }

    fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = match self.live(root) {
            Some(n) => n.children.iter().rev().copied().collect::<Vec<_>>(),
            None => return out,
        };
        while let Some(e) = stack.pop() {
            if let Some(n) = self.live(e) {
                out.push(e);
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    fn by_id(&self, id: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .position(|n| n.attached && n.dom_id.as_deref() == Some(id))
            .map(|i| ElementId(i as u32))
    }

    fn matches(&self, el: ElementId, selector: &Selector) -> bool {
        self.live(el).map(|n| selector.matches(n)).unwrap_or(false)
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.live(el).and_then(|n| n.parent)
    }

    fn dom_id(&self, el: ElementId) -> Option<String> {
        self.node(el).and_then(|n| n.dom_id.clone())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.node(el)
            .and_then(|n| n.attribute(name))
            .map(str::to_string)
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.node(el).map(|n| n.has_class(class)).unwrap_or(false)
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(n) = self.live_mut(el) {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(n) = self.live_mut(el) {
            n.classes.retain(|c| c != class);
        }
    }

    fn text(&self, el: ElementId) -> Option<String> {
        self.node(el).map(|n| n.text.clone())
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(n) = self.live_mut(el) {
            n.text = text.to_string();
            n.text_writes += 1;
        }
    }

    fn set_html(&mut self, el: ElementId, html: &str) {
        if let Some(n) = self.live_mut(el) {
            n.html = Some(html.to_string());
        }
    }

    fn set_inline_width(&mut self, el: ElementId, width: &str) {
        if let Some(n) = self.live_mut(el) {
            n.inline_width = Some(width.to_string());
        }
    }

    fn bounds(&self, el: ElementId) -> Option<Rect> {
        self.live(el).map(|n| n.bounds)
    }

    fn is_attached(&self, el: ElementId) -> bool {
        self.live(el).is_some()
    }

    fn remove(&mut self, el: ElementId) {
        // body stays
        if el.0 == 0 {
            return;
        }
        let mut stack = vec![el];
        while let Some(e) = stack.pop() {
            if let Some(n) = self.node_mut(e) {
                n.attached = false;
                stack.extend(n.children.iter().copied());
            }
        }
    }

    fn body(&self) -> Option<ElementId> {
        Some(ElementId(0))
    }

    fn set_scroll_lock(&mut self, locked: bool) {
        self.scroll_locked = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryDocument, ElementId, ElementId, ElementId) {
        let mut doc = MemoryDocument::new();
        let section = doc.append(ElementId(0), ElementSpec::new("section").id("cards"));
        let a = doc.append(section, ElementSpec::new("div").class("card"));
        let b = doc.append(
            section,
            ElementSpec::new("div")
                .class("card")
                .child(ElementSpec::new("span").class("card")),
        );
        (doc, section, a, b)
    }

    #[test]
    fn query_is_document_order() {
        let (doc, section, a, b) = sample();
        let sel = Selector::parse(".card").unwrap();
        let all = doc.query_all(&sel);
        assert_eq!(all.len(), 3);
        assert_eq!(&all[..2], &[a, b]);
        assert_eq!(doc.query_within(section, &sel), all);
        assert_eq!(doc.query_within(b, &sel).len(), 1);
        assert_eq!(doc.by_id("cards"), Some(section));
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let (mut doc, section, a, b) = sample();
        let desc = doc.descendants(section);
        assert_eq!(desc.len(), 3);
        assert_eq!(&desc[..2], &[a, b]);
        assert!(doc.descendants(a).is_empty());
        doc.remove(b);
        assert_eq!(doc.descendants(section), vec![a]);
        assert!(doc.descendants(b).is_empty());
    }

    #[test]
    fn removed_subtree_is_invisible_and_inert() {
        let (mut doc, section, a, b) = sample();
        let sel = Selector::parse(".card").unwrap();
        doc.remove(b);
        assert_eq!(doc.query_all(&sel), vec![a]);
        assert!(!doc.is_attached(b));
        doc.add_class(b, "visible");
        doc.set_text(b, "x");
        assert!(!doc.has_class(b, "visible"));
        assert_eq!(doc.text_writes(b), 0);

        doc.remove(section);
        assert!(doc.query_all(&sel).is_empty());
        assert_eq!(doc.by_id("cards"), None);
    }

    #[test]
    fn closest_walks_ancestors() {
        let (doc, section, _a, b) = sample();
        let span = doc.query_within(b, &Selector::parse("span").unwrap())[0];
        let sel = Selector::parse("section").unwrap();
        assert_eq!(doc.closest(span, &sel), Some(section));
        assert_eq!(doc.closest(span, &Selector::parse("#nope").unwrap()), None);
    }

    #[test]
    fn classes_are_a_set() {
        let (mut doc, _, a, _) = sample();
        doc.add_class(a, "visible");
        doc.add_class(a, "visible");
        assert_eq!(doc.classes(a), &["card".to_string(), "visible".to_string()]);
        doc.remove_class(a, "visible");
        assert_eq!(doc.classes(a), &["card".to_string()]);
    }

    #[test]
    fn page_spec_from_json() {
        let json = r#"{
            "viewport": { "width": 800, "height": 600 },
            "elements": [
                { "tag": "nav", "id": "navbar" },
                { "classes": ["stat-card"], "attrs": [["data-counter", "150"]],
                  "bounds": { "x": 0, "y": 900, "width": 200, "height": 100 } }
            ]
        }"#;
        let page: PageSpec = serde_json::from_str(json).unwrap();
        let (doc, vp) = MemoryDocument::from_page(&page);
        assert_eq!(vp.height, 600.0);
        let card = doc.query_all(&Selector::parse("[data-counter]").unwrap())[0];
        assert_eq!(doc.attribute(card, "data-counter").as_deref(), Some("150"));
        assert_eq!(doc.bounds(card).map(|r| r.y), Some(900.0));
        assert!(doc.by_id("navbar").is_some());
    }
}
