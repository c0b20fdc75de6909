//! Observable labeling state.
//!
//! [`ModelStore`] is the single owner of [`ModelState`]. Every change
//! replaces the shared snapshot and sends it to all live subscribers, so a
//! snapshot a subscriber holds never changes under it.

use crate::document::{Document, DocumentStatus};
use crate::error::ErrorInfo;
use crate::label::{DocumentLabels, Label, LabelValueCandidate, RegionOrders};
use crate::schema::SchemaStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Everything the labeling surface renders from.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    pub schema: SchemaStore,
    /// Labels of the documents loaded so far, by document name.
    pub labels: DocumentLabels,
    /// Reading order per document name.
    pub orders: HashMap<String, RegionOrders>,
    /// Values of the current selection, offered to the label menu.
    pub candidates: Vec<LabelValueCandidate>,
    /// Last failed operation.
    pub label_error: Option<ErrorInfo>,
    pub hide_inline_menu: bool,
    pub documents: Vec<Document>,
    pub current_document: Option<Document>,
}

impl ModelState {
    pub fn document(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// Labels of `document`; empty when none are loaded.
    pub fn document_labels(&self, document: &str) -> &[Label] {
        self.labels.get(document).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn current_document_name(&self) -> Option<&str> {
        self.current_document.as_ref().map(|d| d.name.as_str())
    }

    /// Apply `update` to the listed document and to the current document
    /// when it has the same name.
    pub fn update_document(&mut self, name: &str, update: impl Fn(&mut Document)) {
        if let Some(document) = self.documents.iter_mut().find(|d| d.name == name) {
            update(document);
        }
        if let Some(current) = self.current_document.as_mut().filter(|d| d.name == name) {
            update(current);
        }
    }

    pub fn set_labeling_status(&mut self, name: &str, status: Option<DocumentStatus>) {
        self.update_document(name, |d| d.states.labeling_status = status);
    }

    pub fn set_analyzing_status(&mut self, name: &str, status: Option<DocumentStatus>) {
        self.update_document(name, |d| d.states.analyzing_status = status);
    }
}

/// Owner of the labeling state.
#[derive(Debug, Default)]
pub struct ModelStore {
    state: Arc<ModelState>,
    subscribers: Vec<Sender<Arc<ModelState>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ModelState) -> Self {
        Self {
            state: Arc::new(state),
            subscribers: Vec::new(),
        }
    }

    /// The current snapshot.
    pub fn state(&self) -> Arc<ModelState> {
        Arc::clone(&self.state)
    }

    /// Receive every future snapshot. The current one is sent immediately.
    pub fn subscribe(&mut self) -> Receiver<Arc<ModelState>> {
        let (sender, receiver) = channel();
        if sender.send(self.state()).is_ok() {
            self.subscribers.push(sender);
        }
        receiver
    }

    /// Mutate the state and publish the new snapshot.
    pub fn update(&mut self, update: impl FnOnce(&mut ModelState)) {
        update(Arc::make_mut(&mut self.state));
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.state();
        self.subscribers
            .retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
