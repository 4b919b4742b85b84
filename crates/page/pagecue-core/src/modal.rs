//! Modal dialogs: open/close by DOM id with a last-opened-first-closed stack.
//!
//! The body scroll lock is engaged while any modal is open and released when
//! the last one closes. Unknown ids are silent no-ops.

use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::selector::Selector;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalConfig {
    pub selector: String,
    pub close_selector: String,
    pub active_class: String,
    /// Suffix of the id of the element that receives injected content.
    pub body_suffix: String,
    pub close_key: String,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            selector: ".modal".to_string(),
            close_selector: ".modal-close".to_string(),
            active_class: "active".to_string(),
            body_suffix: "Body".to_string(),
            close_key: "Escape".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ModalStack {
    active_class: String,
    body_suffix: String,
    /// Open modal ids, oldest first.
    open: IndexSet<String>,
}

impl ModalStack {
    pub fn new(cfg: &ModalConfig) -> Self {
        Self {
            active_class: cfg.active_class.clone(),
            body_suffix: cfg.body_suffix.clone(),
            open: IndexSet::new(),
        }
    }

    /// Open the modal with DOM id `id`, optionally replacing its body HTML.
    /// Re-opening an open modal moves it to the top. Returns false when no
    /// such element exists.
    pub fn open<D: Document>(&mut self, doc: &mut D, id: &str, content: Option<&str>) -> bool {
        let Some(modal) = doc.by_id(id) else {
            debug!("modal `{id}` not found");
            return false;
        };
        if let Some(html) = content.filter(|c| !c.is_empty()) {
            let body = Selector::parse(&format!("[id$=\"{}\"]", self.body_suffix))
                .ok()
                .and_then(|sel| doc.query_within(modal, &sel).into_iter().next());
            if let Some(body) = body {
                doc.set_html(body, html);
            }
        }
        doc.add_class(modal, &self.active_class);
        self.open.shift_remove(id);
        self.open.insert(id.to_string());
        doc.set_scroll_lock(true);
        true
    }

    /// Close the modal with DOM id `id`. Returns false when no such element exists.
    pub fn close<D: Document>(&mut self, doc: &mut D, id: &str) -> bool {
        let Some(modal) = doc.by_id(id) else {
            debug!("modal `{id}` not found");
            return false;
        };
        doc.remove_class(modal, &self.active_class);
        self.open.shift_remove(id);
        if self.open.is_empty() {
            doc.set_scroll_lock(false);
        }
        true
    }

    /// Close the most recently opened modal.
    pub fn close_top<D: Document>(&mut self, doc: &mut D) -> Option<String> {
        let top = self.open.last().cloned()?;
        if !self.close(doc, &top) {
            // element vanished while open; drop it so the stack can drain
            self.open.shift_remove(&top);
            if self.open.is_empty() {
                doc.set_scroll_lock(false);
            }
        }
        Some(top)
    }

    pub fn top(&self) -> Option<&str> {
        self.open.last().map(String::as_str)
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.contains(id)
    }

    pub fn open_ids(&self) -> impl Iterator<Item = &str> {
        self.open.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Close everything without touching the document.
    pub fn clear(&mut self) {
        self.open.clear();
    }
}
