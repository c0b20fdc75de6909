//! Field schema: fields, table definitions and field colors.

use crate::error::SchemaError;
use crate::label::split_label_path;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Primitive and container field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Date,
    Time,
    SelectionMark,
    Signature,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::SelectionMark => "selectionMark",
            FieldType::Signature => "signature",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, FieldType::Array | FieldType::Object)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "selectionMark" => FieldType::SelectionMark,
            "signature" => FieldType::Signature,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            _ => return Err(()),
        })
    }
}

/// Value format hint attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldFormat {
    #[default]
    #[serde(rename = "not-specified")]
    NotSpecified,
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "decimal-commas")]
    DecimalCommas,
    #[serde(rename = "no-whitespaces")]
    NoWhitespaces,
    #[serde(rename = "alphanumeric")]
    Alphanumeric,
    #[serde(rename = "dmy")]
    Dmy,
    #[serde(rename = "mdy")]
    Mdy,
    #[serde(rename = "ymd")]
    Ymd,
}

/// Orientation of a fixed table's header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationHint {
    Horizontal,
    Vertical,
}

/// Table flavour chosen when creating a table field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    /// Rows are added freely; Array of a row Definition.
    Dynamic,
    /// Named rows or columns; Object of Definition references.
    Fixed,
}

/// Which header a fixed table is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderType {
    Column,
    Row,
}

/// Where a table sub-field lives: on the table field or in its Definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLocation {
    Field,
    Definition,
}

impl FieldLocation {
    /// Label path segment addressed by this location.
    pub fn path_segment(self) -> usize {
        match self {
            FieldLocation::Field => 1,
            FieldLocation::Definition => 2,
        }
    }
}

/// The shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A leaf value. Never `Array` or `Object`.
    Primitive(FieldType),
    /// Dynamic table: rows of the named Definition.
    Array { item_type: String },
    /// Fixed table: named header fields, each referencing a Definition.
    Object {
        fields: Vec<Field>,
        visualization_hint: Option<VisualizationHint>,
    },
    /// Header field of a fixed table, typed by a Definition name.
    Reference(String),
}

/// One named, typed schema slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct Field {
    pub field_key: String,
    pub kind: FieldKind,
    pub field_format: FieldFormat,
}

impl Field {
    pub fn primitive(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_key: key.into(),
            kind: FieldKind::Primitive(field_type),
            field_format: FieldFormat::NotSpecified,
        }
    }

    pub fn reference(key: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            field_key: key.into(),
            kind: FieldKind::Reference(definition.into()),
            field_format: FieldFormat::NotSpecified,
        }
    }

    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            FieldKind::Primitive(t) => *t,
            FieldKind::Array { .. } => FieldType::Array,
            FieldKind::Object { .. } | FieldKind::Reference(_) => FieldType::Object,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, FieldKind::Array { .. } | FieldKind::Object { .. })
    }

    /// Definition names this table's cells are typed by, in first-use order.
    pub fn definition_names(&self) -> Vec<String> {
        match &self.kind {
            FieldKind::Array { item_type } => vec![item_type.clone()],
            FieldKind::Object { fields, .. } => {
                let mut names: Vec<String> = Vec::new();
                for child in fields {
                    if let FieldKind::Reference(name) = &child.kind {
                        if !names.contains(name) {
                            names.push(name.clone());
                        }
                    }
                }
                names
            }
            _ => Vec::new(),
        }
    }

    /// The Definition used for new cells: `itemType`, or the first header's type.
    pub fn primary_definition(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Array { item_type } => Some(item_type),
            FieldKind::Object { fields, .. } => fields.iter().find_map(|f| match &f.kind {
                FieldKind::Reference(name) => Some(name.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// On-disk field shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    field_key: String,
    field_type: String,
    #[serde(default)]
    field_format: FieldFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visualization_hint: Option<VisualizationHint>,
}

impl TryFrom<RawField> for Field {
    type Error = SchemaError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let kind = match raw.field_type.parse::<FieldType>() {
            Ok(FieldType::Array) => FieldKind::Array {
                item_type: raw
                    .item_type
                    .ok_or_else(|| SchemaError::MissingItemType(raw.field_key.clone()))?,
            },
            Ok(FieldType::Object) => FieldKind::Object {
                fields: raw
                    .fields
                    .ok_or_else(|| SchemaError::MissingFields(raw.field_key.clone()))?,
                visualization_hint: raw.visualization_hint,
            },
            Ok(primitive) => FieldKind::Primitive(primitive),
            Err(()) => FieldKind::Reference(raw.field_type),
        };
        Ok(Field {
            field_key: raw.field_key,
            kind,
            field_format: raw.field_format,
        })
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        let mut raw = RawField {
            field_key: field.field_key,
            field_type: String::new(),
            field_format: field.field_format,
            item_type: None,
            fields: None,
            visualization_hint: None,
        };
        match field.kind {
            FieldKind::Primitive(t) => raw.field_type = t.as_str().to_string(),
            FieldKind::Array { item_type } => {
                raw.field_type = FieldType::Array.as_str().to_string();
                raw.item_type = Some(item_type);
            }
            FieldKind::Object {
                fields,
                visualization_hint,
            } => {
                raw.field_type = FieldType::Object.as_str().to_string();
                raw.fields = Some(fields);
                raw.visualization_hint = visualization_hint;
            }
            FieldKind::Reference(name) => raw.field_type = name,
        }
        raw
    }
}

/// Reusable field list serving as a table's row or column template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub field_key: String,
    #[serde(default = "object_type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub field_format: FieldFormat,
    pub fields: Vec<Field>,
}

fn object_type() -> FieldType {
    FieldType::Object
}

impl Definition {
    pub fn new(key: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            field_key: key.into(),
            field_type: FieldType::Object,
            field_format: FieldFormat::NotSpecified,
            fields,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_key == key)
    }
}

pub type Definitions = BTreeMap<String, Definition>;

/// Serializable RGBA color for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl FieldColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#rrggbb` form used by the label pane.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for FieldColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<FieldColor> for Color {
    fn from(color: FieldColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

const PALETTE: [(u8, u8, u8); 10] = [
    (0x1f, 0x77, 0xb4),
    (0xff, 0x7f, 0x0e),
    (0x2c, 0xa0, 0x2c),
    (0xd6, 0x27, 0x28),
    (0x94, 0x67, 0xbd),
    (0x8c, 0x56, 0x4b),
    (0xe3, 0x77, 0xc2),
    (0x7f, 0x7f, 0x7f),
    (0xbc, 0xbd, 0x22),
    (0x17, 0xbe, 0xcf),
];

/// Ordered field-key to color map.
///
/// Colors follow field lifecycle: assigned on add, carried on rename,
/// dropped on delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldColors {
    entries: Vec<(String, FieldColor)>,
}

impl FieldColors {
    pub fn get(&self, key: &str) -> Option<FieldColor> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }

    /// Give `key` the next palette color unless it already has one.
    pub fn assign(&mut self, key: &str) -> FieldColor {
        if let Some(color) = self.get(key) {
            return color;
        }
        let (r, g, b) = PALETTE[self.entries.len() % PALETTE.len()];
        let color = FieldColor::from(Color::from_rgba8(r, g, b, 255));
        self.entries.push((key.to_string(), color));
        color
    }

    pub fn rename(&mut self, key: &str, new_key: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.0 = new_key.to_string();
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldColor)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }
}

/// The schema: ordered top-level fields, table definitions and colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaStore {
    fields: Vec<Field>,
    definitions: Definitions,
    colors: FieldColors,
}

impl SchemaStore {
    /// Build a schema, assigning colors to every top-level field.
    pub fn new(fields: Vec<Field>, definitions: Definitions) -> Self {
        let mut colors = FieldColors::default();
        for field in &fields {
            colors.assign(&field.field_key);
        }
        Self {
            fields,
            definitions,
            colors,
        }
    }

    pub fn with_colors(fields: Vec<Field>, definitions: Definitions, colors: FieldColors) -> Self {
        Self {
            fields,
            definitions,
            colors,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn colors(&self) -> &FieldColors {
        &self.colors
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_key == key)
    }

    pub fn field_index(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.field_key == key)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Resolve the leaf field type a label path points at.
    ///
    /// `key` resolves to a top-level primitive field. `table/row/cell`
    /// resolves through the table: dynamic tables take a numeric row index,
    /// fixed tables a header field key, and `cell` names a Definition field.
    pub fn resolve_leaf_type(&self, label_path: &str) -> Option<FieldType> {
        let segments = split_label_path(label_path);
        let field = self.field(segments.first()?)?;
        match (&field.kind, segments.len()) {
            (FieldKind::Primitive(t), 1) => Some(*t),
            (FieldKind::Array { item_type }, 3) => {
                segments[1].parse::<usize>().ok()?;
                let cell = self.definition(item_type)?.field(&segments[2])?;
                Some(cell.field_type())
            }
            (FieldKind::Object { fields, .. }, 3) => {
                let header = fields.iter().find(|f| f.field_key == segments[1])?;
                let FieldKind::Reference(name) = &header.kind else {
                    return None;
                };
                let cell = self.definition(name)?.field(&segments[2])?;
                Some(cell.field_type())
            }
            _ => None,
        }
    }

    /// Whether a label path resolves to an existing field (and Definition).
    pub fn resolves(&self, label_path: &str) -> bool {
        self.resolve_leaf_type(label_path).is_some()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Field>, &mut Definitions, &mut FieldColors) {
        (&mut self.fields, &mut self.definitions, &mut self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS_JSON: &str = r#"[
        {"fieldKey": "Name", "fieldType": "string", "fieldFormat": "not-specified"},
        {"fieldKey": "Items", "fieldType": "array", "fieldFormat": "not-specified", "itemType": "Items_object"},
        {"fieldKey": "Summary", "fieldType": "object", "fieldFormat": "not-specified",
         "fields": [
            {"fieldKey": "ROW1", "fieldType": "Summary_object", "fieldFormat": "not-specified"},
            {"fieldKey": "ROW2", "fieldType": "Summary_object", "fieldFormat": "not-specified"}
         ],
         "visualizationHint": "vertical"}
    ]"#;

    fn sample() -> SchemaStore {
        let fields: Vec<Field> = serde_json::from_str(FIELDS_JSON).unwrap();
        let mut definitions = Definitions::new();
        definitions.insert(
            "Items_object".into(),
            Definition::new(
                "Items_object",
                vec![
                    Field::primitive("Description", FieldType::String),
                    Field::primitive("Amount", FieldType::Number),
                ],
            ),
        );
        definitions.insert(
            "Summary_object".into(),
            Definition::new(
                "Summary_object",
                vec![
                    Field::primitive("COLUMN1", FieldType::String),
                    Field::primitive("COLUMN2", FieldType::Date),
                ],
            ),
        );
        SchemaStore::new(fields, definitions)
    }

    #[test]
    fn test_decode_kinds() {
        let schema = sample();
        assert_eq!(schema.field("Name").unwrap().field_type(), FieldType::String);
        assert!(matches!(
            &schema.field("Items").unwrap().kind,
            FieldKind::Array { item_type } if item_type == "Items_object"
        ));
        let summary = schema.field("Summary").unwrap();
        assert_eq!(summary.field_type(), FieldType::Object);
        assert_eq!(summary.definition_names(), vec!["Summary_object".to_string()]);
        assert_eq!(summary.primary_definition(), Some("Summary_object"));
    }

    #[test]
    fn test_encode_preserves_shape() {
        let fields: Vec<Field> = serde_json::from_str(FIELDS_JSON).unwrap();
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value[1]["itemType"], "Items_object");
        assert_eq!(value[2]["visualizationHint"], "vertical");
        assert_eq!(value[2]["fields"][0]["fieldType"], "Summary_object");
        assert!(value[0].get("itemType").is_none());
    }

    #[test]
    fn test_array_without_item_type_is_rejected() {
        let result: Result<Field, _> =
            serde_json::from_str(r#"{"fieldKey": "T", "fieldType": "array"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_leaf_type() {
        let schema = sample();
        assert_eq!(schema.resolve_leaf_type("Name"), Some(FieldType::String));
        assert_eq!(schema.resolve_leaf_type("Items/0/Amount"), Some(FieldType::Number));
        assert_eq!(schema.resolve_leaf_type("Items/x/Amount"), None);
        assert_eq!(schema.resolve_leaf_type("Summary/ROW2/COLUMN2"), Some(FieldType::Date));
        assert_eq!(schema.resolve_leaf_type("Summary/ROW3/COLUMN2"), None);
        assert_eq!(schema.resolve_leaf_type("Items"), None);
        assert_eq!(schema.resolve_leaf_type("Missing"), None);
    }

    #[test]
    fn test_colors_follow_fields() {
        let mut colors = FieldColors::default();
        let a = colors.assign("A");
        let b = colors.assign("B");
        assert_ne!(a, b);
        assert_eq!(colors.assign("A"), a);

        colors.rename("A", "C");
        assert_eq!(colors.get("C"), Some(a));
        assert_eq!(colors.get("A"), None);

        colors.remove("C");
        assert_eq!(colors.iter().count(), 1);
        assert_eq!(FieldColor::new(0x1f, 0x77, 0xb4, 255).to_hex(), "#1f77b4");
    }
}
