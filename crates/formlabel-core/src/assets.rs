//! Persisted artifacts: the field schema, per-document labels and analysis
//! results, mapped onto a [`Storage`] backend.

use crate::analysis::AnalyzeResponse;
use crate::document::{RawDocument, is_supported_file};
use crate::error::LabelResult;
use crate::label::{DocumentLabels, Label};
use crate::schema::{Definitions, Field, SchemaStore};
use crate::storage::{Storage, StorageError, StorageResult};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

pub const FIELDS_FILE: &str = "fields.json";
pub const LABEL_FILE_EXTENSION: &str = ".labels.json";
pub const OCR_FILE_EXTENSION: &str = ".ocr.json";
pub const FIELDS_SCHEMA: &str =
    "https://schema.cognitiveservices.azure.com/formrecognizer/2021-03-01/fields.json";
pub const LABELS_SCHEMA: &str =
    "https://schema.cognitiveservices.azure.com/formrecognizer/2021-03-01/labels.json";

pub fn label_file_name(document: &str) -> String {
    format!("{document}{LABEL_FILE_EXTENSION}")
}

pub fn ocr_file_name(document: &str) -> String {
    format!("{document}{OCR_FILE_EXTENSION}")
}

/// `fields.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsFile {
    #[serde(rename = "$schema", default = "fields_schema")]
    pub schema: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub definitions: Definitions,
}

fn fields_schema() -> String {
    FIELDS_SCHEMA.to_string()
}

impl FieldsFile {
    pub fn from_schema(schema: &SchemaStore) -> Self {
        Self {
            schema: FIELDS_SCHEMA.to_string(),
            fields: schema.fields().to_vec(),
            definitions: schema.definitions().clone(),
        }
    }
}

/// `<document>.labels.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsFile {
    #[serde(rename = "$schema", default = "labels_schema")]
    pub schema: String,
    pub document: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

fn labels_schema() -> String {
    LABELS_SCHEMA.to_string()
}

impl LabelsFile {
    pub fn new(document: &str, labels: &[Label]) -> Self {
        Self {
            schema: LABELS_SCHEMA.to_string(),
            document: document.to_string(),
            labels: labels.to_vec(),
        }
    }
}

/// A document file found in storage, with what else is stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub raw: RawDocument,
    pub analyzed: bool,
    pub labeled: bool,
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> StorageResult<T> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(format!("{}: {}", path, e)))
}

fn encode<T: Serialize>(path: &str, value: &T) -> StorageResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| StorageError::Serialization(format!("{}: {}", path, e)))
}

/// Reads and writes labeling artifacts.
pub struct AssetService<S> {
    storage: S,
}

impl<S: Storage> AssetService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the schema, or `None` when no schema has been saved yet.
    pub async fn load_schema(&self) -> LabelResult<Option<SchemaStore>> {
        let Some(text) = self.storage.read_text(FIELDS_FILE, true).await? else {
            return Ok(None);
        };
        let file: FieldsFile = decode(FIELDS_FILE, &text)?;
        log::debug!("Loaded {} fields", file.fields.len());
        Ok(Some(SchemaStore::new(file.fields, file.definitions)))
    }

    pub async fn save_schema(&self, schema: &SchemaStore) -> LabelResult<()> {
        let text = encode(FIELDS_FILE, &FieldsFile::from_schema(schema))?;
        self.storage.write_text(FIELDS_FILE, &text).await?;
        Ok(())
    }

    pub async fn delete_schema(&self) -> LabelResult<()> {
        self.storage.delete_file(FIELDS_FILE, true).await?;
        Ok(())
    }

    /// Labels of one document. A missing label file means no labels.
    pub async fn load_labels(&self, document: &str) -> LabelResult<Vec<Label>> {
        let path = label_file_name(document);
        match self.storage.read_text(&path, true).await? {
            Some(text) => Ok(decode::<LabelsFile>(&path, &text)?.labels),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_labels(&self, document: &str, labels: &[Label]) -> LabelResult<()> {
        let path = label_file_name(document);
        let text = encode(&path, &LabelsFile::new(document, labels))?;
        self.storage.write_text(&path, &text).await?;
        Ok(())
    }

    /// Labels of every named document, read concurrently.
    pub async fn load_all_labels<I, D>(&self, documents: I) -> LabelResult<DocumentLabels>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<str>,
    {
        let reads = documents.into_iter().map(|document| async move {
            let labels = self.load_labels(document.as_ref()).await?;
            LabelResult::Ok((document.as_ref().to_string(), labels))
        });
        Ok(try_join_all(reads).await?.into_iter().collect())
    }

    /// Write the label files of several documents concurrently.
    pub async fn save_all_labels(&self, labels: &DocumentLabels) -> LabelResult<()> {
        let writes = labels
            .iter()
            .map(|(document, document_labels)| self.save_labels(document, document_labels));
        try_join_all(writes).await?;
        Ok(())
    }

    pub async fn load_analysis(&self, document: &str) -> LabelResult<Option<AnalyzeResponse>> {
        let path = ocr_file_name(document);
        match self.storage.read_text(&path, true).await? {
            Some(text) => Ok(Some(decode(&path, &text)?)),
            None => Ok(None),
        }
    }

    pub async fn save_analysis(&self, document: &str, response: &AnalyzeResponse) -> LabelResult<()> {
        let path = ocr_file_name(document);
        let text = encode(&path, response)?;
        self.storage.write_text(&path, &text).await?;
        Ok(())
    }

    /// Every supported document file, with whether analysis and labels exist.
    pub async fn list_documents(&self) -> LabelResult<Vec<StoredDocument>> {
        let mut files = self.storage.list_files().await?;
        files.sort();
        Ok(files
            .iter()
            .filter(|path| is_supported_file(path))
            .map(|path| StoredDocument {
                raw: RawDocument::from_path(path),
                analyzed: files.contains(&ocr_file_name(path)),
                labeled: files.contains(&label_file_name(path)),
            })
            .collect())
    }

    /// Delete a document with its analysis and label files.
    pub async fn delete_document(&self, document: &str) -> LabelResult<()> {
        self.storage.delete_file(document, false).await?;
        self.storage.delete_file(&ocr_file_name(document), true).await?;
        self.storage.delete_file(&label_file_name(document), true).await?;
        log::info!("Deleted document {}", document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::fixtures::schema;
    use crate::error::LabelError;
    use crate::geometry::Polygon;
    use crate::label::LabelValue;
    use crate::storage::MemoryStorage;
    use kurbo::Rect;

    fn label(path: &str) -> Label {
        Label {
            label: path.to_string(),
            value: vec![LabelValue {
                page: 1,
                text: "42".into(),
                bounding_boxes: vec![Polygon::from_rect(Rect::new(0.1, 0.1, 0.2, 0.2))],
            }],
            label_type: None,
        }
    }

    #[test]
    fn test_schema_round_trip_keeps_tables() {
        pollster::block_on(async {
            let assets = AssetService::new(MemoryStorage::new());
            assert!(assets.load_schema().await.unwrap().is_none());

            assets.save_schema(&schema()).await.unwrap();
            let text = assets.storage().read_text(FIELDS_FILE, false).await.unwrap().unwrap();
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(json["$schema"], FIELDS_SCHEMA);
            assert_eq!(json["fields"][4]["fields"][0]["fieldType"], "Summary_object");
            assert_eq!(json["definitions"]["Items_object"]["fieldType"], "object");

            let loaded = assets.load_schema().await.unwrap().unwrap();
            assert_eq!(loaded.fields(), schema().fields());
            assert_eq!(loaded.definitions(), schema().definitions());
        });
    }

    #[test]
    fn test_labels_file_shape() {
        pollster::block_on(async {
            let assets = AssetService::new(MemoryStorage::new());
            assert!(assets.load_labels("a.pdf").await.unwrap().is_empty());

            assets.save_labels("a.pdf", &[label("Name")]).await.unwrap();
            let text = assets
                .storage()
                .read_text("a.pdf.labels.json", false)
                .await
                .unwrap()
                .unwrap();
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(json["$schema"], LABELS_SCHEMA);
            assert_eq!(json["document"], "a.pdf");
            assert_eq!(json["labels"][0]["value"][0]["boundingBoxes"][0][2], 0.2);
            assert!(json["labels"][0].get("labelType").is_none());
        });
    }

    #[test]
    fn test_all_labels_and_listing() {
        pollster::block_on(async {
            let assets = AssetService::new(MemoryStorage::new());
            for name in ["a.pdf", "b.png", "notes.txt"] {
                assets.storage().write_binary(name, b"doc").await.unwrap();
            }
            let mut batch = DocumentLabels::new();
            batch.insert("a.pdf".into(), vec![label("Name")]);
            batch.insert("b.png".into(), vec![label("Sign"), label("Agree")]);
            assets.save_all_labels(&batch).await.unwrap();
            assets
                .storage()
                .write_text(&ocr_file_name("b.png"), "{\"analyzeResult\":{}}")
                .await
                .unwrap();

            let all = assets.load_all_labels(["a.pdf", "b.png", "c.pdf"]).await.unwrap();
            assert_eq!(all["a.pdf"].len(), 1);
            assert_eq!(all["b.png"].len(), 2);
            assert!(all["c.pdf"].is_empty());

            let listed = assets.list_documents().await.unwrap();
            let names: Vec<_> = listed.iter().map(|d| d.raw.name.as_str()).collect();
            assert_eq!(names, vec!["a.pdf", "b.png"]);
            assert!(listed[0].labeled && !listed[0].analyzed);
            assert!(listed[1].labeled && listed[1].analyzed);
            assert!(assets.load_analysis("b.png").await.unwrap().is_some());

            assets.delete_document("b.png").await.unwrap();
            assert_eq!(assets.list_documents().await.unwrap().len(), 1);
            assert!(assets.load_labels("b.png").await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        pollster::block_on(async {
            let assets = AssetService::new(MemoryStorage::new());
            assets.storage().write_text(FIELDS_FILE, "{not json").await.unwrap();
            match assets.load_schema().await {
                Err(LabelError::Storage(StorageError::Serialization(message))) => {
                    assert!(message.starts_with(FIELDS_FILE));
                }
                other => panic!("unexpected {other:?}"),
            }
        });
    }
}
