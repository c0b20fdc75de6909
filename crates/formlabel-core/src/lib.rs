//! FormLabel Core Library
//!
//! Region interaction, field schema and label assignment for labeling
//! analyzed document pages.

pub mod analysis;
pub mod assets;
pub mod assign;
pub mod camera;
pub mod config;
pub mod document;
pub mod error;
pub mod feature;
pub mod feature_store;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod label;
pub mod modify;
pub mod schema;
pub mod schema_mutation;
pub mod selection;
pub mod service;
pub mod snap;
pub mod storage;
pub mod store;
pub mod tools;

pub use analysis::{AnalyzeResponse, AnalyzeResult, AnalyzedPage};
pub use assets::AssetService;
pub use camera::Camera;
pub use config::{LabelingConfig, MenuLayout};
pub use document::{Document, DocumentLoader, DocumentStatus, PageCanvas, RawDocument};
pub use error::{ErrorInfo, LabelError, LabelResult, SchemaError};
pub use feature::{Feature, FeatureCategory, FeatureId};
pub use feature_store::{FeatureStore, Layer};
pub use geometry::Polygon;
pub use input::{Key, KeyEvent, MouseButton, PointerEvent};
pub use interaction::{InteractionEngine, InteractionEvent, InteractionState, SelectionSummary};
pub use label::{DocumentLabels, Label, LabelType, LabelValue, LabelValueCandidate, RegionOrders};
pub use modify::GeometryChange;
pub use schema::{Field, FieldFormat, FieldKind, FieldLocation, FieldType, HeaderType, SchemaStore, TableType};
pub use schema_mutation::SchemaChange;
pub use selection::SelectionSet;
pub use service::LabelingService;
pub use storage::{FileStorage, MemoryStorage, QueuedStorage, Storage, StorageError, StorageResult};
pub use store::{ModelState, ModelStore};
