//! [`Document`] over the live browser DOM.
//!
//! Elements are given stable [`ElementId`]s on first sight by stamping a
//! `data-cue-id` attribute and keeping a handle in an arena.

use std::cell::RefCell;

use pagecue_core::{Document, ElementId, Rect, Selector};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, NodeList, Window};

const ID_ATTR: &str = "data-cue-id";

pub struct DomDocument {
    window: Window,
    document: web_sys::Document,
    elements: RefCell<Vec<Element>>,
}

impl DomDocument {
    pub fn new(window: Window, document: web_sys::Document) -> Self {
        Self {
            window,
            document,
            elements: RefCell::new(Vec::new()),
        }
    }

    /// Id for `el`, registering it on first use.
    pub fn id_of(&self, el: &Element) -> ElementId {
        if let Some(id) = el
            .get_attribute(ID_ATTR)
            .and_then(|raw| raw.parse::<u32>().ok())
        {
            let known = self.elements.borrow().get(id as usize).cloned();
            if known.is_some_and(|k| k == *el) {
                return ElementId(id);
            }
        }
        let mut elements = self.elements.borrow_mut();
        let id = elements.len() as u32;
        elements.push(el.clone());
        let _ = el.set_attribute(ID_ATTR, &id.to_string());
        ElementId(id)
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow().get(id.0 as usize).cloned()
    }

    fn html(&self, id: ElementId) -> Option<HtmlElement> {
        self.element(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn collect(&self, list: NodeList) -> Vec<ElementId> {
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|el| self.id_of(&el))
            .collect()
    }
}

impl Document for DomDocument {
    fn query_all(&self, selector: &Selector) -> Vec<ElementId> {
        match self.document.query_selector_all(selector.as_str()) {
            Ok(list) => self.collect(list),
            Err(_) => Vec::new(),
        }
    }

    fn query_within(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.element(root)
            .and_then(|el| el.query_selector_all(selector.as_str()).ok())
            .map(|list| self.collect(list))
            .unwrap_or_default()
    }

    fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        self.element(root)
            .and_then(|el| el.query_selector_all("*").ok())
            .map(|list| self.collect(list))
            .unwrap_or_default()
    }

    fn by_id(&self, id: &str) -> Option<ElementId> {
        self.document.get_element_by_id(id).map(|el| self.id_of(&el))
    }

    fn matches(&self, el: ElementId, selector: &Selector) -> bool {
        self.element(el)
            .is_some_and(|e| e.matches(selector.as_str()).unwrap_or(false))
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.element(el)?
            .parent_element()
            .map(|p| self.id_of(&p))
    }

    fn dom_id(&self, el: ElementId) -> Option<String> {
        self.element(el).map(|e| e.id()).filter(|id| !id.is_empty())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.element(el)?.get_attribute(name)
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.element(el)
            .is_some_and(|e| e.class_list().contains(class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(e) = self.element(el) {
            let _ = e.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(e) = self.element(el) {
            let _ = e.class_list().remove_1(class);
        }
    }

    fn text(&self, el: ElementId) -> Option<String> {
        self.element(el)?.text_content()
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(e) = self.element(el) {
            e.set_text_content(Some(text));
        }
    }

    fn set_html(&mut self, el: ElementId, html: &str) {
        if let Some(e) = self.element(el) {
            e.set_inner_html(html);
        }
    }

    fn set_inline_width(&mut self, el: ElementId, width: &str) {
        if let Some(e) = self.html(el) {
            let _ = e.style().set_property("width", width);
        }
    }

    fn bounds(&self, el: ElementId) -> Option<Rect> {
        let e = self.element(el).filter(|e| e.is_connected())?;
        let r = e.get_bounding_client_rect();
        let sx = self.window.scroll_x().unwrap_or(0.0);
        let sy = self.window.scroll_y().unwrap_or(0.0);
        Some(Rect::new(r.x() + sx, r.y() + sy, r.width(), r.height()))
    }

    fn is_attached(&self, el: ElementId) -> bool {
        self.element(el).is_some_and(|e| e.is_connected())
    }

    fn remove(&mut self, el: ElementId) {
        if let Some(e) = self.element(el) {
            e.remove();
        }
    }

    fn body(&self) -> Option<ElementId> {
        self.document.body().map(|b| self.id_of(&b))
    }

    fn set_scroll_lock(&mut self, locked: bool) {
        let Some(body) = self.document.body() else {
            return;
        };
        let style = body.style();
        let _ = if locked {
            style.set_property("overflow", "hidden")
        } else {
            style.remove_property("overflow").map(|_| ())
        };
    }
}
