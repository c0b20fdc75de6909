//! The labeling service: interaction, assignment and schema edits wired to
//! persistence and the observable state.
//!
//! Every mutating operation computes its result from the current snapshot,
//! awaits the writes, and only then publishes the new state. A failed
//! operation leaves the state as it was and records the error in
//! [`ModelState::label_error`].

use crate::analysis::AnalyzeResult;
use crate::assets::AssetService;
use crate::assign;
use crate::config::LabelingConfig;
use crate::document::{Document, DocumentLoader, DocumentStatus, PageCanvas};
use crate::error::{LabelResult, invariant};
use crate::feature::FeatureId;
use crate::feature_store::FeatureStore;
use crate::input::{KeyEvent, PointerEvent};
use crate::interaction::{InteractionEngine, InteractionEvent};
use crate::label::{DocumentLabels, Label, LabelValueCandidate};
use crate::schema::{Field, FieldLocation, FieldType, HeaderType, SchemaStore, TableType};
use crate::schema_mutation::{self, SchemaChange};
use crate::storage::Storage;
use crate::store::{ModelState, ModelStore};
use futures::future::try_join_all;
use kurbo::Size;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

fn current_document(state: &ModelState) -> LabelResult<&Document> {
    state
        .current_document
        .as_ref()
        .ok_or_else(|| invariant("no document is open"))
}

pub struct LabelingService<S, L> {
    assets: AssetService<S>,
    loader: L,
    config: LabelingConfig,
    store: ModelStore,
    features: FeatureStore,
    interaction: InteractionEngine,
    analyses: HashMap<String, AnalyzeResult>,
    canvas: Option<PageCanvas>,
}

impl<S: Storage, L: DocumentLoader> LabelingService<S, L> {
    pub fn new(storage: S, loader: L, config: LabelingConfig) -> Self {
        Self {
            assets: AssetService::new(storage),
            loader,
            interaction: InteractionEngine::new(config.clone()),
            config,
            store: ModelStore::new(),
            features: FeatureStore::default(),
            analyses: HashMap::new(),
            canvas: None,
        }
    }

    pub fn assets(&self) -> &AssetService<S> {
        &self.assets
    }

    pub fn state(&self) -> Arc<ModelState> {
        self.store.state()
    }

    pub fn subscribe(&mut self) -> Receiver<Arc<ModelState>> {
        self.store.subscribe()
    }

    pub fn features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn interaction(&self) -> &InteractionEngine {
        &self.interaction
    }

    /// The rendered current page.
    pub fn canvas(&self) -> Option<&PageCanvas> {
        self.canvas.as_ref()
    }

    fn settle<T>(&mut self, result: LabelResult<T>) -> LabelResult<T> {
        if let Err(error) = &result {
            if !error.is_validation() {
                log::error!("{}: {}", error.name(), error);
            }
            let info = error.to_info();
            self.store.update(|state| state.label_error = Some(info));
        }
        result
    }

    pub fn clear_label_error(&mut self) {
        self.store.update(|state| state.label_error = None);
    }

    // Documents

    /// List stored documents, load their metadata and the schema.
    pub async fn initialize(&mut self) -> LabelResult<()> {
        let result = self.load_workspace().await;
        self.settle(result)
    }

    async fn load_workspace(&mut self) -> LabelResult<()> {
        let stored = self.assets.list_documents().await?;
        let metas =
            try_join_all(stored.iter().map(|d| self.loader.load_document_meta(&d.raw))).await?;
        let documents: Vec<Document> = stored
            .into_iter()
            .zip(metas)
            .map(|(stored, meta)| {
                let mut document = Document::new(stored.raw, meta);
                if stored.analyzed {
                    document.states.analyzing_status = Some(DocumentStatus::Analyzed);
                }
                if stored.labeled {
                    document.states.labeling_status = Some(DocumentStatus::Labeled);
                }
                document
            })
            .collect();
        let schema = self.assets.load_schema().await?.unwrap_or_default();

        log::info!(
            "Loaded {} documents and {} fields",
            documents.len(),
            schema.fields().len()
        );
        self.store.update(|state| {
            state.documents = documents;
            state.schema = schema;
        });
        Ok(())
    }

    /// Open a document on its current page, loading its labels and analysis
    /// on first use.
    pub async fn set_current_document(&mut self, name: &str) -> LabelResult<()> {
        let result = self.open_document(name).await;
        self.settle(result)
    }

    async fn open_document(&mut self, name: &str) -> LabelResult<()> {
        let state = self.store.state();
        let document = state
            .document(name)
            .cloned()
            .ok_or_else(|| invariant(format!("document {name} does not exist")))?;

        let labels = if state.labels.contains_key(name) {
            None
        } else {
            Some(self.assets.load_labels(name).await?)
        };
        let analysis = if self.analyses.contains_key(name) {
            None
        } else {
            self.assets.load_analysis(name).await?
        };

        let orders = analysis.as_ref().map(|r| r.analyze_result.region_orders());
        if let Some(response) = analysis {
            self.analyses.insert(name.to_string(), response.analyze_result);
        }
        self.store.update(|state| {
            if let Some(labels) = labels {
                state.labels.insert(name.to_string(), labels);
            }
            if let Some(orders) = orders {
                state.orders.insert(name.to_string(), orders);
                state.set_analyzing_status(name, Some(DocumentStatus::Analyzed));
            }
            state.current_document = state.document(name).cloned();
        });
        log::debug!("Opened {}", name);
        self.show_page(document.current_page).await
    }

    /// Render another page of the current document.
    pub async fn set_current_page(&mut self, page: u32) -> LabelResult<()> {
        let result = self.show_page(page).await;
        self.settle(result)
    }

    async fn show_page(&mut self, page: u32) -> LabelResult<()> {
        let state = self.store.state();
        let document = current_document(&state)?;
        if !document.has_page(page) {
            return Err(invariant(format!("{} has no page {page}", document.name)));
        }
        let canvas = self.loader.load_document_page(&document.raw(), page).await?;

        self.interaction
            .set_page(&mut self.features, page, canvas.size(), canvas.angle);
        self.features.clear();
        if let Some(analyzed) = self.analyses.get(&document.name).and_then(|a| a.page(page)) {
            self.features
                .load_analysis_page(analyzed, self.config.show_ocr_proposals);
        }
        self.features
            .load_labels(state.document_labels(&document.name), page);

        let name = document.name.clone();
        self.store.update(|state| {
            state.update_document(&name, |d| d.current_page = page);
            state.candidates.clear();
        });
        self.canvas = Some(canvas);
        Ok(())
    }

    /// Delete a document and everything stored for it.
    pub async fn delete_document(&mut self, name: &str) -> LabelResult<()> {
        let result = self.assets.delete_document(name).await;
        self.settle(result)?;

        let was_current = self.state().current_document_name() == Some(name);
        self.analyses.remove(name);
        self.store.update(|state| {
            state.documents.retain(|d| d.name != name);
            state.labels.remove(name);
            state.orders.remove(name);
            if was_current {
                state.current_document = None;
                state.candidates.clear();
            }
        });
        if was_current {
            self.interaction.clear_selection(&mut self.features);
            self.features.clear();
            self.canvas = None;
        }
        Ok(())
    }

    // Interaction

    pub fn set_viewport(&mut self, viewport: Size) {
        self.interaction.set_viewport(viewport);
    }

    pub fn set_draw_region_mode(&mut self, enabled: bool) {
        self.interaction
            .set_draw_region_mode(&mut self.features, enabled);
    }

    pub fn highlight_label(&mut self, label_name: Option<&str>) {
        self.features.highlight_label(label_name);
    }

    pub fn set_hide_inline_menu(&mut self, hide: bool) {
        self.store.update(|state| state.hide_inline_menu = hide);
    }

    /// Replace the label value candidates directly.
    pub fn set_label_value_candidates(&mut self, candidates: Vec<LabelValueCandidate>) {
        self.store.update(|state| state.candidates = candidates);
    }

    /// Feed a pointer event through the interaction engine and apply what it
    /// produced: selections become candidates, and reshaped labeled regions
    /// update their stored labels.
    pub async fn handle_pointer(&mut self, event: &PointerEvent) -> LabelResult<Vec<InteractionEvent>> {
        let events = self.interaction.handle_pointer(&mut self.features, event);
        for event in &events {
            match event {
                InteractionEvent::SelectionFinished(summary) => {
                    let candidates = summary.candidates.clone();
                    let hide = summary.menu.is_none();
                    self.store.update(|state| {
                        state.candidates = candidates;
                        state.hide_inline_menu = hide;
                    });
                }
                InteractionEvent::GeometryChanged(changes) => {
                    for change in changes {
                        self.update_label(&change.label, &change.old, &change.new)
                            .await?;
                    }
                }
                InteractionEvent::RegionDrawn { .. } => {}
            }
        }
        Ok(events)
    }

    pub fn handle_key(&mut self, event: &KeyEvent) {
        self.interaction.handle_key(&mut self.features, event);
    }

    /// Remove an uncommitted drawn region, updating the candidates when it
    /// was selected.
    pub fn delete_drawn_region(&mut self, id: FeatureId) {
        if let Some(candidates) = self.interaction.delete_drawn_region(&mut self.features, id) {
            self.store.update(|state| state.candidates = candidates);
        }
    }

    // Labels

    async fn commit_labels(&mut self, document: &str, labels: Vec<Label>) -> LabelResult<()> {
        self.assets.save_labels(document, &labels).await?;
        let status = (!labels.is_empty()).then_some(DocumentStatus::Labeled);
        self.store.update(|state| {
            state.set_labeling_status(document, status);
            state.labels.insert(document.to_string(), labels);
        });
        if self.state().current_document_name() == Some(document) {
            self.refresh_label_features();
        }
        Ok(())
    }

    fn refresh_label_features(&mut self) {
        let state = self.store.state();
        let Some(document) = state.current_document.as_ref() else {
            return;
        };
        self.interaction.clear_selection(&mut self.features);
        self.features
            .load_labels(state.document_labels(&document.name), document.current_page);
    }

    /// Assign the current candidates to `label_path` in the open document.
    pub async fn assign_label(&mut self, label_path: &str) -> LabelResult<()> {
        let result = self.try_assign_label(label_path).await;
        self.settle(result)
    }

    async fn try_assign_label(&mut self, label_path: &str) -> LabelResult<()> {
        let state = self.store.state();
        let document = current_document(&state)?.name.clone();
        let Some(labels) = assign::assign_label(
            label_path,
            &state.candidates,
            &state.schema,
            state.document_labels(&document),
            state.orders.get(&document),
        )?
        else {
            return Ok(());
        };
        self.commit_labels(&document, labels).await?;
        self.store.update(|state| {
            state.candidates.clear();
            state.hide_inline_menu = true;
        });
        Ok(())
    }

    /// Replace the boxes of one value after its region was reshaped.
    pub async fn update_label(
        &mut self,
        label_path: &str,
        old: &LabelValueCandidate,
        new: &LabelValueCandidate,
    ) -> LabelResult<()> {
        let result = self.try_update_label(label_path, old, new).await;
        self.settle(result)
    }

    async fn try_update_label(
        &mut self,
        label_path: &str,
        old: &LabelValueCandidate,
        new: &LabelValueCandidate,
    ) -> LabelResult<()> {
        let state = self.store.state();
        let document = current_document(&state)?.name.clone();
        match assign::update_label(state.document_labels(&document), label_path, old, new) {
            Some(labels) => self.commit_labels(&document, labels).await,
            None => Ok(()),
        }
    }

    /// Drop every label under a top-level field in the open document.
    pub async fn delete_label_by_field(&mut self, field_key: &str) -> LabelResult<()> {
        let result = self
            .edit_current_labels(|labels| assign::delete_label_by_field(labels, field_key))
            .await;
        self.settle(result)
    }

    /// Drop one label in the open document.
    pub async fn delete_label_by_label(&mut self, label_path: &str) -> LabelResult<()> {
        let result = self
            .edit_current_labels(|labels| assign::delete_label_by_label(labels, label_path))
            .await;
        self.settle(result)
    }

    /// Replace all labels of a table in the open document.
    pub async fn update_table_label(&mut self, table_key: &str, table_labels: Vec<Label>) -> LabelResult<()> {
        let result = self
            .edit_current_labels(|labels| assign::update_table_label(labels, table_key, table_labels))
            .await;
        self.settle(result)
    }

    async fn edit_current_labels(&mut self, edit: impl FnOnce(&[Label]) -> Vec<Label>) -> LabelResult<()> {
        let state = self.store.state();
        let document = current_document(&state)?.name.clone();
        let labels = edit(state.document_labels(&document));
        self.commit_labels(&document, labels).await
    }

    // Schema

    async fn commit_schema(&mut self, schema: SchemaStore) -> LabelResult<()> {
        self.assets.save_schema(&schema).await?;
        self.store.update(|state| state.schema = schema);
        Ok(())
    }

    /// Labels of every listed document: loaded ones from memory, the rest
    /// from storage.
    async fn all_labels(&self, state: &ModelState) -> LabelResult<DocumentLabels> {
        let missing: Vec<&str> = state
            .documents
            .iter()
            .map(|d| d.name.as_str())
            .filter(|name| !state.labels.contains_key(*name))
            .collect();
        let mut all = self.assets.load_all_labels(missing).await?;
        all.extend(state.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(all)
    }

    async fn commit_schema_change(&mut self, change: SchemaChange) -> LabelResult<()> {
        futures::try_join!(
            self.assets.save_schema(&change.schema),
            self.assets.save_all_labels(&change.changed_labels),
        )?;

        let current = self.state().current_document_name().map(str::to_string);
        let refresh = current.is_some_and(|name| change.changed_labels.contains_key(&name));
        log::info!(
            "Schema updated, labels rewritten in {} documents",
            change.changed_labels.len()
        );
        self.store.update(|state| {
            state.schema = change.schema;
            for (document, labels) in change.changed_labels {
                let status = (!labels.is_empty()).then_some(DocumentStatus::Labeled);
                state.set_labeling_status(&document, status);
                state.labels.insert(document, labels);
            }
        });
        if refresh {
            self.refresh_label_features();
        }
        Ok(())
    }

    pub async fn add_field(&mut self, field: Field) -> LabelResult<()> {
        let result = schema_mutation::add_field(&self.state().schema, field);
        let result = match result {
            Ok(schema) => self.commit_schema(schema).await,
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    pub async fn add_table_field(
        &mut self,
        key: &str,
        table_type: TableType,
        header_type: HeaderType,
    ) -> LabelResult<()> {
        let result = schema_mutation::add_table_field(&self.state().schema, key, table_type, header_type);
        let result = match result {
            Ok(schema) => self.commit_schema(schema).await,
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    pub async fn insert_table_field(
        &mut self,
        table_key: &str,
        field_key: &str,
        index: usize,
        location: FieldLocation,
    ) -> LabelResult<()> {
        let result = schema_mutation::insert_table_field(
            &self.state().schema,
            table_key,
            field_key,
            index,
            location,
        );
        let result = match result {
            Ok(schema) => self.commit_schema(schema).await,
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    pub async fn switch_field_sub_type(&mut self, field_key: &str, new_type: FieldType) -> LabelResult<()> {
        let result = schema_mutation::switch_field_sub_type(&self.state().schema, field_key, new_type);
        let result = match result {
            Ok(schema) => self.commit_schema(schema).await,
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    pub async fn switch_table_field_sub_type(
        &mut self,
        table_key: &str,
        field_key: &str,
        new_type: FieldType,
    ) -> LabelResult<()> {
        let result = schema_mutation::switch_table_field_sub_type(
            &self.state().schema,
            table_key,
            field_key,
            new_type,
        );
        let result = match result {
            Ok(Some(schema)) => self.commit_schema(schema).await,
            Ok(None) => Ok(()),
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    pub async fn update_fields_order(&mut self, fields: Vec<Field>) -> LabelResult<()> {
        let result = schema_mutation::update_fields_order(&self.state().schema, fields);
        let result = match result {
            Ok(schema) => self.commit_schema(schema).await,
            Err(error) => Err(error),
        };
        self.settle(result)
    }

    /// Run a cascading schema edit over the labels of every document.
    async fn cascade(
        &mut self,
        edit: impl FnOnce(&SchemaStore, &DocumentLabels) -> LabelResult<SchemaChange>,
    ) -> LabelResult<()> {
        let state = self.store.state();
        let all = self.all_labels(&state).await?;
        let change = edit(&state.schema, &all)?;
        self.commit_schema_change(change).await
    }

    pub async fn rename_field(&mut self, field_key: &str, new_name: &str) -> LabelResult<()> {
        let result = self
            .cascade(|schema, labels| schema_mutation::rename_field(schema, labels, field_key, new_name))
            .await;
        self.settle(result)
    }

    pub async fn rename_table_field(
        &mut self,
        table_key: &str,
        field_key: &str,
        new_name: &str,
        location: FieldLocation,
    ) -> LabelResult<()> {
        let result = self
            .cascade(|schema, labels| {
                schema_mutation::rename_table_field(schema, labels, table_key, field_key, new_name, location)
            })
            .await;
        self.settle(result)
    }

    pub async fn delete_field(&mut self, field_key: &str) -> LabelResult<()> {
        let result = self
            .cascade(|schema, labels| schema_mutation::delete_field(schema, labels, field_key))
            .await;
        self.settle(result)
    }

    pub async fn delete_table_field(
        &mut self,
        table_key: &str,
        field_key: &str,
        location: FieldLocation,
    ) -> LabelResult<()> {
        let result = self
            .cascade(|schema, labels| {
                schema_mutation::delete_table_field(schema, labels, table_key, field_key, location)
            })
            .await;
        self.settle(result)
    }

    /// Remove the stored schema and reset to an empty one.
    pub async fn delete_schema(&mut self) -> LabelResult<()> {
        let result = self.assets.delete_schema().await;
        self.settle(result)?;
        self.store.update(|state| state.schema = SchemaStore::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzeResponse;
    use crate::analysis::fixtures::sample_result;
    use crate::assign::fixtures::schema;
    use crate::document::{DocumentMeta, RawDocument};
    use crate::error::LabelError;
    use crate::feature_store::Layer;
    use crate::geometry::Polygon;
    use crate::input::MouseButton;
    use crate::label::LabelValue;
    use crate::storage::{BoxFuture, MemoryStorage, StorageError, StorageResult};
    use kurbo::{Point, Rect};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct PageLoader;

    impl DocumentLoader for PageLoader {
        fn load_document_meta(&self, _document: &RawDocument) -> BoxFuture<'_, StorageResult<DocumentMeta>> {
            Box::pin(async {
                Ok(DocumentMeta {
                    num_pages: 2,
                    thumbnail: String::new(),
                })
            })
        }

        fn load_document_page(
            &self,
            document: &RawDocument,
            page: u32,
        ) -> BoxFuture<'_, StorageResult<PageCanvas>> {
            let image_url = format!("{}#page={}", document.url, page);
            Box::pin(async move {
                Ok(PageCanvas {
                    image_url,
                    width: 1000.0,
                    height: 1000.0,
                    angle: 0.0,
                })
            })
        }
    }

    /// Memory storage whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_writes: AtomicBool,
    }

    impl FlakyStorage {
        fn refuse<'a>(&'a self) -> Option<BoxFuture<'a, StorageResult<()>>> {
            self.fail_writes
                .load(Ordering::SeqCst)
                .then(|| -> BoxFuture<'a, StorageResult<()>> {
                    Box::pin(async { Err(StorageError::Io("disk full".into())) })
                })
        }
    }

    impl Storage for FlakyStorage {
        fn read_text(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<Option<String>>> {
            self.inner.read_text(path, ignore_not_found)
        }

        fn read_binary(
            &self,
            path: &str,
            ignore_not_found: bool,
        ) -> BoxFuture<'_, StorageResult<Option<Vec<u8>>>> {
            self.inner.read_binary(path, ignore_not_found)
        }

        fn write_text(&self, path: &str, contents: &str) -> BoxFuture<'_, StorageResult<()>> {
            self.refuse()
                .unwrap_or_else(|| self.inner.write_text(path, contents))
        }

        fn write_binary(&self, path: &str, contents: &[u8]) -> BoxFuture<'_, StorageResult<()>> {
            self.refuse()
                .unwrap_or_else(|| self.inner.write_binary(path, contents))
        }

        fn delete_file(&self, path: &str, ignore_not_found: bool) -> BoxFuture<'_, StorageResult<()>> {
            self.refuse()
                .unwrap_or_else(|| self.inner.delete_file(path, ignore_not_found))
        }

        fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            self.inner.list_files()
        }

        fn file_exists(&self, path: &str) -> BoxFuture<'_, StorageResult<bool>> {
            self.inner.file_exists(path)
        }
    }

    fn stored_label(path: &str, top: f64) -> Label {
        Label {
            label: path.to_string(),
            value: vec![LabelValue {
                page: 1,
                text: "x".into(),
                bounding_boxes: vec![Polygon::from_rect(Rect::new(0.6, top, 0.7, top + 0.05))],
            }],
            label_type: None,
        }
    }

    type Service = LabelingService<Arc<FlakyStorage>, PageLoader>;

    /// `a.pdf` is analyzed and unlabeled, `b.pdf` has labels on disk.
    fn workspace() -> (Service, Arc<FlakyStorage>) {
        let storage = Arc::new(FlakyStorage::default());
        let assets = AssetService::new(Arc::clone(&storage));
        pollster::block_on(async {
            for name in ["a.pdf", "b.pdf"] {
                assets.storage().write_binary(name, b"%PDF").await.unwrap();
            }
            assets.save_schema(&schema()).await.unwrap();
            let response = AnalyzeResponse {
                status: Some("succeeded".into()),
                analyze_result: sample_result(),
            };
            assets.save_analysis("a.pdf", &response).await.unwrap();
            assets
                .save_labels("b.pdf", &[stored_label("Name", 0.6), stored_label("Items/0/Description", 0.7)])
                .await
                .unwrap();
        });

        let mut service = LabelingService::new(Arc::clone(&storage), PageLoader, LabelingConfig::default());
        service.set_viewport(Size::new(1000.0, 1000.0));
        pollster::block_on(service.initialize()).unwrap();
        (service, storage)
    }

    fn click(service: &mut Service, x: f64, y: f64) {
        let position = Point::new(x, y);
        let button = MouseButton::Left;
        pollster::block_on(async {
            service.handle_pointer(&PointerEvent::Down { position, button }).await.unwrap();
            service.handle_pointer(&PointerEvent::Up { position, button }).await.unwrap();
        });
    }

    #[test]
    fn test_initialize_lists_documents_and_schema() {
        let (service, _) = workspace();
        let state = service.state();
        assert_eq!(state.documents.len(), 2);
        let a = state.document("a.pdf").unwrap();
        assert_eq!(a.states.analyzing_status, Some(DocumentStatus::Analyzed));
        assert!(a.states.labeling_status.is_none());
        assert_eq!(
            state.document("b.pdf").unwrap().states.labeling_status,
            Some(DocumentStatus::Labeled)
        );
        assert_eq!(state.schema.fields().len(), 5);
        assert!(state.current_document.is_none());
    }

    #[test]
    fn test_click_and_assign_persists_then_publishes() {
        let (mut service, storage) = workspace();
        let updates = service.subscribe();
        pollster::block_on(service.set_current_document("a.pdf")).unwrap();
        assert_eq!(service.features().len(Layer::Text), 3);
        assert_eq!(service.canvas().unwrap().image_url, "a.pdf#page=1");

        click(&mut service, 350.0, 320.0);
        assert_eq!(service.state().candidates.len(), 1);
        assert_eq!(service.state().candidates[0].text, "42.00");

        pollster::block_on(service.assign_label("Name")).unwrap();
        let state = service.state();
        assert_eq!(state.document_labels("a.pdf").len(), 1);
        assert_eq!(state.document_labels("a.pdf")[0].value[0].text, "42.00");
        assert!(state.candidates.is_empty());
        assert_eq!(
            state.current_document.as_ref().unwrap().states.labeling_status,
            Some(DocumentStatus::Labeled)
        );
        assert_eq!(service.features().len(Layer::Label), 1);
        assert!(service.interaction().selection().is_empty());

        let stored = pollster::block_on(AssetService::new(Arc::clone(&storage)).load_labels("a.pdf")).unwrap();
        assert_eq!(stored, state.document_labels("a.pdf"));
        assert!(updates.try_iter().count() > 3);
    }

    #[test]
    fn test_rejected_assignment_records_error() {
        let (mut service, _) = workspace();
        pollster::block_on(service.set_current_document("a.pdf")).unwrap();
        click(&mut service, 150.0, 320.0);

        let result = pollster::block_on(service.assign_label("Agree"));
        assert!(matches!(result, Err(LabelError::IncompatibleFieldType { .. })));
        let state = service.state();
        assert_eq!(state.label_error.as_ref().unwrap().name, "Invalid field type");
        assert!(state.document_labels("a.pdf").is_empty());
        assert_eq!(state.candidates.len(), 1);

        service.clear_label_error();
        assert!(service.state().label_error.is_none());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let (mut service, storage) = workspace();
        pollster::block_on(service.set_current_document("a.pdf")).unwrap();
        click(&mut service, 350.0, 320.0);

        storage.fail_writes.store(true, Ordering::SeqCst);
        let result = pollster::block_on(service.assign_label("Name"));
        assert!(matches!(result, Err(LabelError::Storage(StorageError::Io(_)))));
        let state = service.state();
        assert!(state.document_labels("a.pdf").is_empty());
        assert_eq!(state.label_error.as_ref().unwrap().name, "IoError");
        assert_eq!(state.candidates.len(), 1);

        let result = pollster::block_on(service.rename_field("Name", "FullName"));
        assert!(result.is_err());
        assert!(service.state().schema.field("Name").is_some());
    }

    #[test]
    fn test_rename_field_rewrites_unloaded_documents() {
        let (mut service, storage) = workspace();
        pollster::block_on(async {
            service.set_current_document("a.pdf").await.unwrap();
            service
                .set_label_value_candidates(vec![LabelValueCandidate {
                    bounding_boxes: vec![Polygon::from_rect(Rect::new(0.1, 0.1, 0.2, 0.15))],
                    page: 1,
                    text: "Invoice".into(),
                    category: crate::feature::FeatureCategory::Text,
                    already_assigned_label: None,
                }]);
            service.assign_label("Name").await.unwrap();
            service.rename_field("Name", "Title").await.unwrap();
        });

        let assets = AssetService::new(Arc::clone(&storage));
        let all = pollster::block_on(assets.load_all_labels(["a.pdf", "b.pdf"])).unwrap();
        assert_eq!(all["a.pdf"][0].label, "Title");
        assert_eq!(all["b.pdf"][0].label, "Title");
        assert_eq!(all["b.pdf"][1].label, "Items/0/Description");

        let state = service.state();
        assert!(state.schema.field("Title").is_some());
        assert_eq!(state.document_labels("b.pdf")[0].label, "Title");
        let label_feature = service.features().features(Layer::Label).next().unwrap();
        assert_eq!(label_feature.assigned_label.as_deref(), Some("Title"));

        let fields = pollster::block_on(assets.load_schema()).unwrap().unwrap();
        assert_eq!(fields.fields()[0].field_key, "Title");
    }

    #[test]
    fn test_delete_table_cascades_to_stored_labels() {
        let (mut service, storage) = workspace();
        pollster::block_on(service.delete_field("Items")).unwrap();

        let assets = AssetService::new(Arc::clone(&storage));
        let labels = pollster::block_on(assets.load_labels("b.pdf")).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label, "Name");
        let schema = pollster::block_on(assets.load_schema()).unwrap().unwrap();
        assert!(schema.definition("Items_object").is_none());
        assert!(service.state().schema.field("Items").is_none());
    }

    #[test]
    fn test_schema_edits_persist() {
        let (mut service, storage) = workspace();
        pollster::block_on(async {
            service
                .add_table_field("Lines", TableType::Dynamic, HeaderType::Column)
                .await
                .unwrap();
            service
                .insert_table_field("Lines", "Price", 2, FieldLocation::Definition)
                .await
                .unwrap();
            service
                .switch_table_field_sub_type("Lines", "Price", FieldType::Number)
                .await
                .unwrap();
        });
        let schema = pollster::block_on(AssetService::new(Arc::clone(&storage)).load_schema())
            .unwrap()
            .unwrap();
        assert_eq!(schema.resolve_leaf_type("Lines/0/Price"), Some(FieldType::Number));
        assert_eq!(service.state().schema.fields(), schema.fields());

        let result = pollster::block_on(service.add_field(Field::primitive("Lines", FieldType::String)));
        assert!(matches!(result, Err(LabelError::DuplicateField(_))));
        assert_eq!(service.state().label_error.as_ref().unwrap().name, "Duplicate field");
    }

    #[test]
    fn test_page_navigation() {
        let (mut service, _) = workspace();
        pollster::block_on(service.set_current_document("b.pdf")).unwrap();
        assert_eq!(service.features().len(Layer::Label), 2);
        assert_eq!(service.features().len(Layer::Text), 0);

        pollster::block_on(service.set_current_page(2)).unwrap();
        let state = service.state();
        assert_eq!(state.current_document.as_ref().unwrap().current_page, 2);
        assert_eq!(state.document("b.pdf").unwrap().current_page, 2);
        assert_eq!(service.features().len(Layer::Label), 0);
        assert_eq!(service.interaction().page(), 2);

        let result = pollster::block_on(service.set_current_page(3));
        assert!(matches!(result, Err(LabelError::Invariant(_))));
        assert_eq!(service.state().label_error.as_ref().unwrap().name, "InvariantViolation");

        pollster::block_on(service.delete_document("b.pdf")).unwrap();
        let state = service.state();
        assert!(state.current_document.is_none());
        assert_eq!(state.documents.len(), 1);
        assert!(service.canvas().is_none());
    }
}
