//! What timer and observer callbacks act on: the document plus an outbox of
//! requests only the host can carry out (navigation, native scrolling).

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::ids::ElementId;

/// Side effects the core asks the host to perform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostRequest {
    /// Leave the page for `href`.
    Navigate { href: String },
    /// Smoothly scroll `element` to the top of the viewport.
    ScrollIntoView { element: ElementId },
}

#[derive(Debug)]
pub struct Stage<D: Document> {
    pub document: D,
    requests: Vec<HostRequest>,
}

impl<D: Document> Stage<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            requests: Vec::new(),
        }
    }

    pub fn request(&mut self, req: HostRequest) {
        self.requests.push(req);
    }

    pub fn pending_requests(&self) -> &[HostRequest] {
        &self.requests
    }

    /// Take all queued requests in the order they were made.
    pub fn drain_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }
}
