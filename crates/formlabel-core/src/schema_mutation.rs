//! Schema edits and the label cascades they imply.
//!
//! Every operation works on a copy: it takes the current schema (and, for
//! renames and deletes, the labels of every document) and returns the new
//! schema together with the label lists that changed. Nothing is applied
//! until the caller has persisted the result.

use crate::error::{LabelError, LabelResult, invariant};
use crate::label::{DocumentLabels, Label, field_key_of, path_segment, replace_path_segment};
use crate::schema::{
    Definition, Field, FieldKind, FieldLocation, FieldType, HeaderType, SchemaStore, TableType,
    VisualizationHint,
};

/// Outcome of a cascading schema edit.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaChange {
    pub schema: SchemaStore,
    /// New label lists of the documents that had matching labels.
    pub changed_labels: DocumentLabels,
}

/// Name of the Definition backing the table `field_key`.
pub fn definition_name(field_key: &str) -> String {
    format!("{field_key}_object")
}

enum Rewrite {
    Keep,
    Replace(String),
    Drop,
}

/// Apply `rewrite` to every label path. Only documents with at least one
/// replaced or dropped label are returned.
fn cascade(labels: &DocumentLabels, rewrite: impl Fn(&str) -> Rewrite) -> DocumentLabels {
    let mut changed = DocumentLabels::new();
    for (document, document_labels) in labels {
        let mut touched = false;
        let mut updated = Vec::with_capacity(document_labels.len());
        for label in document_labels {
            match rewrite(&label.label) {
                Rewrite::Keep => updated.push(label.clone()),
                Rewrite::Replace(path) => {
                    touched = true;
                    updated.push(Label {
                        label: path,
                        ..label.clone()
                    });
                }
                Rewrite::Drop => touched = true,
            }
        }
        if touched {
            changed.insert(document.clone(), updated);
        }
    }
    changed
}

fn table_cell_matches(path: &str, table_key: &str, field_key: &str, location: FieldLocation) -> bool {
    field_key_of(path) == table_key
        && path_segment(path, location.path_segment()).as_deref() == Some(field_key)
}

fn require_field<'a>(schema: &'a SchemaStore, key: &str) -> LabelResult<&'a Field> {
    schema
        .field(key)
        .ok_or_else(|| invariant(format!("field {key} does not exist")))
}

fn require_table<'a>(schema: &'a SchemaStore, key: &str) -> LabelResult<&'a Field> {
    require_field(schema, key)?;
    schema
        .field(key)
        .filter(|field| field.is_table())
        .ok_or_else(|| invariant(format!("field {key} is not a table")))
}

fn require_leaf_type(field_type: FieldType) -> LabelResult<()> {
    if field_type.is_container() {
        return Err(invariant(format!("{field_type} is not a cell type")));
    }
    Ok(())
}

fn field_mut<'a>(fields: &'a mut [Field], key: &str) -> LabelResult<&'a mut Field> {
    fields
        .iter_mut()
        .find(|field| field.field_key == key)
        .ok_or_else(|| invariant(format!("field {key} does not exist")))
}

/// Header fields of a fixed table.
fn header_fields_mut<'a>(fields: &'a mut [Field], table_key: &str) -> LabelResult<&'a mut Vec<Field>> {
    let table = field_mut(fields, table_key)?;
    match &mut table.kind {
        FieldKind::Object { fields, .. } => Ok(fields),
        _ => Err(invariant(format!("table {table_key} has no header fields"))),
    }
}

/// Every Definition the table uses. Fails when one of them is missing.
fn table_definitions(schema: &SchemaStore, table: &Field) -> LabelResult<Vec<String>> {
    let names = table.definition_names();
    if names.is_empty() {
        return Err(invariant(format!("table {} has no definition", table.field_key)));
    }
    if let Some(missing) = names.iter().find(|name| schema.definition(name).is_none()) {
        return Err(invariant(format!(
            "definition {missing} of table {} does not exist",
            table.field_key
        )));
    }
    Ok(names)
}

/// Append a field.
pub fn add_field(schema: &SchemaStore, field: Field) -> LabelResult<SchemaStore> {
    if schema.field(&field.field_key).is_some() {
        return Err(LabelError::DuplicateField(field.field_key));
    }
    match &field.kind {
        FieldKind::Reference(_) => {
            return Err(invariant(format!(
                "{} references a definition outside a table",
                field.field_key
            )));
        }
        FieldKind::Array { .. } | FieldKind::Object { .. } => {
            table_definitions(schema, &field)?;
        }
        FieldKind::Primitive(_) => {}
    }

    let mut next = schema.clone();
    let (fields, _, colors) = next.parts_mut();
    colors.assign(&field.field_key);
    log::debug!("Adding field {}", field.field_key);
    fields.push(field);
    Ok(next)
}

/// Create a table field with its Definition.
///
/// Dynamic tables get two columns. Fixed tables get two header fields on
/// the table and two cell fields in the Definition, oriented by
/// `header_type`. `header_type` is ignored for dynamic tables.
pub fn add_table_field(
    schema: &SchemaStore,
    key: &str,
    table_type: TableType,
    header_type: HeaderType,
) -> LabelResult<SchemaStore> {
    let object_name = definition_name(key);
    if schema.field(key).is_some() {
        return Err(LabelError::DuplicateField(key.to_string()));
    }
    if schema.definition(&object_name).is_some() {
        return Err(LabelError::DuplicateField(object_name));
    }

    let strings = |a: &str, b: &str| {
        vec![
            Field::primitive(a, FieldType::String),
            Field::primitive(b, FieldType::String),
        ]
    };
    let references = |a: &str, b: &str| {
        vec![
            Field::reference(a, object_name.as_str()),
            Field::reference(b, object_name.as_str()),
        ]
    };

    let (kind, cells) = match (table_type, header_type) {
        (TableType::Dynamic, _) => (
            FieldKind::Array {
                item_type: object_name.clone(),
            },
            strings("COLUMN1", "COLUMN2"),
        ),
        (TableType::Fixed, HeaderType::Column) => (
            FieldKind::Object {
                fields: references("ROW1", "ROW2"),
                visualization_hint: Some(VisualizationHint::Vertical),
            },
            strings("COLUMN1", "COLUMN2"),
        ),
        (TableType::Fixed, HeaderType::Row) => (
            FieldKind::Object {
                fields: references("COLUMN1", "COLUMN2"),
                visualization_hint: Some(VisualizationHint::Horizontal),
            },
            strings("ROW1", "ROW2"),
        ),
    };

    let mut next = schema.clone();
    let (fields, definitions, colors) = next.parts_mut();
    definitions.insert(object_name.clone(), Definition::new(object_name.as_str(), cells));
    colors.assign(key);
    fields.push(Field {
        field_key: key.to_string(),
        kind,
        field_format: Default::default(),
    });
    log::debug!("Adding {:?} table {}", table_type, key);
    Ok(next)
}

/// Insert a header field (on a fixed table) or a string cell field (in
/// every Definition the table uses) at `index`.
pub fn insert_table_field(
    schema: &SchemaStore,
    table_key: &str,
    field_key: &str,
    index: usize,
    location: FieldLocation,
) -> LabelResult<SchemaStore> {
    let table = require_table(schema, table_key)?;
    let names = table_definitions(schema, table)?;
    let object_name = names[0].clone();

    let mut next = schema.clone();
    let (fields, definitions, _) = next.parts_mut();
    match location {
        FieldLocation::Field => {
            let headers = header_fields_mut(fields, table_key)?;
            if headers.iter().any(|f| f.field_key == field_key) {
                return Err(LabelError::DuplicateField(field_key.to_string()));
            }
            let at = index.min(headers.len());
            headers.insert(at, Field::reference(field_key, object_name));
        }
        FieldLocation::Definition => {
            if names
                .iter()
                .filter_map(|name| definitions.get(name))
                .any(|definition| definition.field(field_key).is_some())
            {
                return Err(LabelError::DuplicateField(field_key.to_string()));
            }
            for name in names.iter() {
                let Some(definition) = definitions.get_mut(name) else { continue };
                let at = index.min(definition.fields.len());
                definition
                    .fields
                    .insert(at, Field::primitive(field_key, FieldType::String));
            }
        }
    }
    log::debug!("Inserted {} into table {} at {}", field_key, table_key, index);
    Ok(next)
}

/// Rename a top-level field and every label under it.
///
/// Tables also move their Definition to `<new_name>_object`.
pub fn rename_field(
    schema: &SchemaStore,
    labels: &DocumentLabels,
    field_key: &str,
    new_name: &str,
) -> LabelResult<SchemaChange> {
    let field = require_field(schema, field_key)?;
    if new_name != field_key && schema.field(new_name).is_some() {
        return Err(LabelError::DuplicateField(new_name.to_string()));
    }

    let mut next = schema.clone();
    if field.is_table() {
        let old_names = table_definitions(schema, field)?;
        let object_name = definition_name(new_name);
        if !old_names.contains(&object_name) && schema.definition(&object_name).is_some() {
            return Err(LabelError::DuplicateField(object_name));
        }

        let (fields, definitions, _) = next.parts_mut();
        let template = definitions.get(&old_names[0]).cloned();
        for name in &old_names {
            definitions.remove(name);
        }
        if let Some(mut definition) = template {
            definition.field_key = object_name.clone();
            definitions.insert(object_name.clone(), definition);
        }

        match &mut field_mut(fields, field_key)?.kind {
            FieldKind::Array { item_type } => *item_type = object_name,
            FieldKind::Object { fields, .. } => {
                for header in fields {
                    if let FieldKind::Reference(name) = &mut header.kind {
                        *name = object_name.clone();
                    }
                }
            }
            _ => {}
        }
    }

    let (fields, _, colors) = next.parts_mut();
    field_mut(fields, field_key)?.field_key = new_name.to_string();
    colors.rename(field_key, new_name);

    let changed_labels = cascade(labels, |path| {
        if field_key_of(path) == field_key {
            Rewrite::Replace(replace_path_segment(path, 0, new_name))
        } else {
            Rewrite::Keep
        }
    });
    log::debug!(
        "Renaming {} to {} touches {} documents",
        field_key,
        new_name,
        changed_labels.len()
    );
    Ok(SchemaChange {
        schema: next,
        changed_labels,
    })
}

/// Rename a header field or a Definition cell field of a table.
pub fn rename_table_field(
    schema: &SchemaStore,
    labels: &DocumentLabels,
    table_key: &str,
    field_key: &str,
    new_name: &str,
    location: FieldLocation,
) -> LabelResult<SchemaChange> {
    let table = require_table(schema, table_key)?;
    let names = table_definitions(schema, table)?;

    let mut next = schema.clone();
    let (fields, definitions, _) = next.parts_mut();
    match location {
        FieldLocation::Field => {
            let headers = header_fields_mut(fields, table_key)?;
            if new_name != field_key && headers.iter().any(|f| f.field_key == new_name) {
                return Err(LabelError::DuplicateField(new_name.to_string()));
            }
            field_mut(headers, field_key)?.field_key = new_name.to_string();
        }
        FieldLocation::Definition => {
            let mut renamed = false;
            for name in names.iter() {
                let Some(definition) = definitions.get_mut(name) else { continue };
                if new_name != field_key && definition.field(new_name).is_some() {
                    return Err(LabelError::DuplicateField(new_name.to_string()));
                }
                if let Some(cell) = definition.fields.iter_mut().find(|f| f.field_key == field_key) {
                    cell.field_key = new_name.to_string();
                    renamed = true;
                }
            }
            if !renamed {
                return Err(invariant(format!(
                    "table {table_key} has no cell field {field_key}"
                )));
            }
        }
    }

    let segment = location.path_segment();
    let changed_labels = cascade(labels, |path| {
        if table_cell_matches(path, table_key, field_key, location) {
            Rewrite::Replace(replace_path_segment(path, segment, new_name))
        } else {
            Rewrite::Keep
        }
    });
    log::debug!(
        "Renaming {}/{} to {} touches {} documents",
        table_key,
        field_key,
        new_name,
        changed_labels.len()
    );
    Ok(SchemaChange {
        schema: next,
        changed_labels,
    })
}

/// Remove a field, its Definitions, its color and every label under it.
pub fn delete_field(
    schema: &SchemaStore,
    labels: &DocumentLabels,
    field_key: &str,
) -> LabelResult<SchemaChange> {
    let field = require_field(schema, field_key)?;
    let owned = field.definition_names();

    let mut next = schema.clone();
    let (fields, definitions, colors) = next.parts_mut();
    fields.retain(|f| f.field_key != field_key);
    for name in &owned {
        definitions.remove(name);
    }
    colors.remove(field_key);

    let changed_labels = cascade(labels, |path| {
        if field_key_of(path) == field_key {
            Rewrite::Drop
        } else {
            Rewrite::Keep
        }
    });
    log::debug!(
        "Deleting {} drops {} definitions and touches {} documents",
        field_key,
        owned.len(),
        changed_labels.len()
    );
    Ok(SchemaChange {
        schema: next,
        changed_labels,
    })
}

/// Remove a header field or a Definition cell field of a table, with the
/// labels addressing it.
pub fn delete_table_field(
    schema: &SchemaStore,
    labels: &DocumentLabels,
    table_key: &str,
    field_key: &str,
    location: FieldLocation,
) -> LabelResult<SchemaChange> {
    let table = require_table(schema, table_key)?;
    let names = table_definitions(schema, table)?;

    let mut next = schema.clone();
    let (fields, definitions, _) = next.parts_mut();
    match location {
        FieldLocation::Field => {
            header_fields_mut(fields, table_key)?.retain(|f| f.field_key != field_key);
        }
        FieldLocation::Definition => {
            for name in names.iter() {
                let Some(definition) = definitions.get_mut(name) else { continue };
                definition.fields.retain(|f| f.field_key != field_key);
            }
        }
    }

    let changed_labels = cascade(labels, |path| {
        if table_cell_matches(path, table_key, field_key, location) {
            Rewrite::Drop
        } else {
            Rewrite::Keep
        }
    });
    Ok(SchemaChange {
        schema: next,
        changed_labels,
    })
}

/// Change the type of a standalone primitive field.
pub fn switch_field_sub_type(
    schema: &SchemaStore,
    field_key: &str,
    new_type: FieldType,
) -> LabelResult<SchemaStore> {
    require_leaf_type(new_type)?;
    let mut next = schema.clone();
    let (fields, _, _) = next.parts_mut();
    let field = field_mut(fields, field_key)?;
    match &mut field.kind {
        FieldKind::Primitive(field_type) => *field_type = new_type,
        _ => return Err(invariant(format!("field {field_key} is not a primitive field"))),
    }
    Ok(next)
}

/// Change the type of a table's cell field in every Definition the table
/// uses. Returns `None` when the field already has `new_type`.
pub fn switch_table_field_sub_type(
    schema: &SchemaStore,
    table_key: &str,
    field_key: &str,
    new_type: FieldType,
) -> LabelResult<Option<SchemaStore>> {
    require_leaf_type(new_type)?;
    let table = require_table(schema, table_key)?;
    let names = table_definitions(schema, table)?;
    let current = schema
        .definition(&names[0])
        .and_then(|definition| definition.field(field_key))
        .ok_or_else(|| invariant(format!("table {table_key} has no cell field {field_key}")))?;
    if current.field_type() == new_type {
        return Ok(None);
    }

    let mut next = schema.clone();
    let (_, definitions, _) = next.parts_mut();
    for name in names.iter() {
        let Some(definition) = definitions.get_mut(name) else { continue };
        for cell in definition.fields.iter_mut().filter(|f| f.field_key == field_key) {
            cell.kind = FieldKind::Primitive(new_type);
        }
    }
    Ok(Some(next))
}

/// Replace the field list with a reordering of the same fields.
pub fn update_fields_order(schema: &SchemaStore, reordered: Vec<Field>) -> LabelResult<SchemaStore> {
    let mut current: Vec<&str> = schema.fields().iter().map(|f| f.field_key.as_str()).collect();
    let mut proposed: Vec<&str> = reordered.iter().map(|f| f.field_key.as_str()).collect();
    current.sort_unstable();
    proposed.sort_unstable();
    if current != proposed {
        return Err(invariant("reordered fields differ from the schema fields"));
    }

    let mut next = schema.clone();
    let (fields, _, _) = next.parts_mut();
    *fields = reordered;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::fixtures::schema;
    use crate::geometry::Polygon;
    use crate::label::LabelValue;
    use kurbo::Rect;

    fn label(path: &str) -> Label {
        Label {
            label: path.to_string(),
            value: vec![LabelValue {
                page: 1,
                text: path.to_string(),
                bounding_boxes: vec![Polygon::from_rect(Rect::new(0.1, 0.1, 0.2, 0.2))],
            }],
            label_type: None,
        }
    }

    fn documents(entries: Vec<(&str, Vec<&str>)>) -> DocumentLabels {
        entries
            .into_iter()
            .map(|(name, paths)| (name.to_string(), paths.into_iter().map(label).collect()))
            .collect()
    }

    fn paths(labels: &[Label]) -> Vec<&str> {
        labels.iter().map(|l| l.label.as_str()).collect()
    }

    #[test]
    fn test_rename_field_across_documents() {
        let all = documents(vec![
            ("doc1", vec!["Name", "Sign"]),
            ("doc2", vec!["Name"]),
            ("doc3", vec!["Agree"]),
        ]);
        let change = rename_field(&schema(), &all, "Name", "FullName").unwrap();

        assert_eq!(change.changed_labels.len(), 2);
        assert_eq!(paths(&change.changed_labels["doc1"]), vec!["FullName", "Sign"]);
        assert_eq!(paths(&change.changed_labels["doc2"]), vec!["FullName"]);
        assert!(!change.changed_labels.contains_key("doc3"));

        assert!(change.schema.field("Name").is_none());
        assert_eq!(change.schema.field_index("FullName"), Some(0));
        assert_eq!(change.schema.colors().get("FullName"), schema().colors().get("Name"));
        assert!(change.schema.colors().get("Name").is_none());
    }

    #[test]
    fn test_rename_encodes_new_segment() {
        let all = documents(vec![("doc1", vec!["Name"])]);
        let change = rename_field(&schema(), &all, "Name", "Name/Alias").unwrap();
        assert_eq!(paths(&change.changed_labels["doc1"]), vec!["Name%2FAlias"]);
        assert!(change.schema.resolves("Name%2FAlias"));
    }

    #[test]
    fn test_rename_to_existing_field_fails() {
        let result = rename_field(&schema(), &DocumentLabels::new(), "Name", "Sign");
        assert!(matches!(result, Err(LabelError::DuplicateField(key)) if key == "Sign"));
    }

    #[test]
    fn test_rename_table_moves_definition() {
        let all = documents(vec![("doc1", vec!["Summary/ROW1/COLUMN2", "Items/0/Description"])]);
        let change = rename_field(&schema(), &all, "Summary", "Totals").unwrap();

        assert!(change.schema.definition("Summary_object").is_none());
        let definition = change.schema.definition("Totals_object").unwrap();
        assert_eq!(definition.field_key, "Totals_object");
        assert_eq!(
            change.schema.field("Totals").unwrap().definition_names(),
            vec!["Totals_object".to_string()]
        );
        assert_eq!(
            paths(&change.changed_labels["doc1"]),
            vec!["Totals/ROW1/COLUMN2", "Items/0/Description"]
        );
        assert!(change.schema.resolves("Totals/ROW1/COLUMN2"));

        let change = rename_field(&schema(), &all, "Items", "Lines").unwrap();
        assert!(change.schema.resolves("Lines/0/Checked"));
        assert!(change.schema.definition("Items_object").is_none());
    }

    #[test]
    fn test_delete_dynamic_table_cascades() {
        let all = documents(vec![
            ("doc1", vec!["Items/0/Description", "Name", "Items/1/Checked"]),
            ("doc2", vec!["Sign"]),
        ]);
        let change = delete_field(&schema(), &all, "Items").unwrap();

        assert!(change.schema.field("Items").is_none());
        assert!(change.schema.definition("Items_object").is_none());
        assert!(change.schema.definition("Summary_object").is_some());
        assert!(change.schema.colors().get("Items").is_none());
        assert_eq!(change.changed_labels.len(), 1);
        assert_eq!(paths(&change.changed_labels["doc1"]), vec!["Name"]);
    }

    #[test]
    fn test_delete_missing_field_is_invariant_error() {
        let result = delete_field(&schema(), &DocumentLabels::new(), "Nope");
        assert!(matches!(result, Err(LabelError::Invariant(_))));
    }

    #[test]
    fn test_table_constructions() {
        let dynamic = add_table_field(&schema(), "Rows", TableType::Dynamic, HeaderType::Column).unwrap();
        let rows = dynamic.field("Rows").unwrap();
        assert_eq!(
            rows.kind,
            FieldKind::Array {
                item_type: "Rows_object".into()
            }
        );
        assert!(dynamic.resolves("Rows/0/COLUMN2"));
        assert!(dynamic.colors().get("Rows").is_some());

        let column = add_table_field(&schema(), "Grid", TableType::Fixed, HeaderType::Column).unwrap();
        let FieldKind::Object {
            fields,
            visualization_hint,
        } = &column.field("Grid").unwrap().kind
        else {
            panic!("expected a fixed table");
        };
        assert_eq!(*visualization_hint, Some(VisualizationHint::Vertical));
        assert_eq!(fields[0], Field::reference("ROW1", "Grid_object"));
        assert!(column.resolves("Grid/ROW2/COLUMN1"));

        let row = add_table_field(&schema(), "Grid", TableType::Fixed, HeaderType::Row).unwrap();
        assert!(row.resolves("Grid/COLUMN1/ROW2"));
        assert!(!row.resolves("Grid/ROW1/COLUMN1"));

        let duplicate = add_table_field(&schema(), "Items", TableType::Dynamic, HeaderType::Row);
        assert!(matches!(duplicate, Err(LabelError::DuplicateField(_))));
    }

    #[test]
    fn test_insert_table_field() {
        let header = insert_table_field(&schema(), "Summary", "ROW3", 1, FieldLocation::Field).unwrap();
        let FieldKind::Object { fields, .. } = &header.field("Summary").unwrap().kind else {
            panic!("expected a fixed table");
        };
        let keys: Vec<_> = fields.iter().map(|f| f.field_key.as_str()).collect();
        assert_eq!(keys, vec!["ROW1", "ROW3", "ROW2"]);
        assert!(header.resolves("Summary/ROW3/COLUMN1"));

        let cell = insert_table_field(&schema(), "Items", "Price", 9, FieldLocation::Definition).unwrap();
        let definition = cell.definition("Items_object").unwrap();
        assert_eq!(definition.fields.last().unwrap().field_key, "Price");
        assert!(cell.resolves("Items/3/Price"));

        let dynamic_header = insert_table_field(&schema(), "Items", "X", 0, FieldLocation::Field);
        assert!(matches!(dynamic_header, Err(LabelError::Invariant(_))));
    }

    #[test]
    fn test_rename_and_delete_table_fields() {
        let all = documents(vec![(
            "doc1",
            vec!["Summary/ROW1/COLUMN1", "Summary/ROW2/COLUMN1", "Items/0/COLUMN1"],
        )]);

        let renamed = rename_table_field(
            &schema(),
            &all,
            "Summary",
            "ROW1",
            "First",
            FieldLocation::Field,
        )
        .unwrap();
        assert_eq!(
            paths(&renamed.changed_labels["doc1"]),
            vec!["Summary/First/COLUMN1", "Summary/ROW2/COLUMN1", "Items/0/COLUMN1"]
        );
        assert!(renamed.schema.resolves("Summary/First/COLUMN1"));

        let renamed = rename_table_field(
            &schema(),
            &all,
            "Summary",
            "COLUMN1",
            "Amount",
            FieldLocation::Definition,
        )
        .unwrap();
        assert_eq!(
            paths(&renamed.changed_labels["doc1"]),
            vec!["Summary/ROW1/Amount", "Summary/ROW2/Amount", "Items/0/COLUMN1"]
        );
        assert!(renamed.schema.resolves("Summary/ROW2/Amount"));

        let deleted = delete_table_field(&schema(), &all, "Summary", "ROW2", FieldLocation::Field).unwrap();
        assert_eq!(
            paths(&deleted.changed_labels["doc1"]),
            vec!["Summary/ROW1/COLUMN1", "Items/0/COLUMN1"]
        );
        assert!(!deleted.schema.resolves("Summary/ROW2/COLUMN1"));

        let deleted =
            delete_table_field(&schema(), &all, "Summary", "COLUMN1", FieldLocation::Definition).unwrap();
        assert_eq!(paths(&deleted.changed_labels["doc1"]), vec!["Items/0/COLUMN1"]);
        assert!(deleted.schema.resolves("Summary/ROW1/COLUMN2"));
    }

    #[test]
    fn test_switch_sub_types() {
        let switched = switch_field_sub_type(&schema(), "Name", FieldType::Date).unwrap();
        assert_eq!(switched.resolve_leaf_type("Name"), Some(FieldType::Date));
        assert!(switch_field_sub_type(&schema(), "Items", FieldType::Date).is_err());
        assert!(switch_field_sub_type(&schema(), "Name", FieldType::Array).is_err());

        let unchanged =
            switch_table_field_sub_type(&schema(), "Summary", "COLUMN1", FieldType::String).unwrap();
        assert!(unchanged.is_none());

        let mut base = add_table_field(&schema(), "Other", TableType::Dynamic, HeaderType::Column).unwrap();
        base = switch_table_field_sub_type(&base, "Summary", "COLUMN1", FieldType::Number)
            .unwrap()
            .unwrap();
        assert_eq!(base.resolve_leaf_type("Summary/ROW2/COLUMN1"), Some(FieldType::Number));
        assert_eq!(base.resolve_leaf_type("Other/0/COLUMN1"), Some(FieldType::String));
    }

    #[test]
    fn test_add_field_and_reorder() {
        let added = add_field(&schema(), Field::primitive("Total", FieldType::Number)).unwrap();
        assert_eq!(added.fields().last().unwrap().field_key, "Total");
        assert!(added.colors().get("Total").is_some());
        assert!(matches!(
            add_field(&added, Field::primitive("Total", FieldType::String)),
            Err(LabelError::DuplicateField(_))
        ));

        let mut reversed = added.fields().to_vec();
        reversed.reverse();
        let reordered = update_fields_order(&added, reversed).unwrap();
        assert_eq!(reordered.field_index("Total"), Some(0));

        let truncated = added.fields()[1..].to_vec();
        assert!(update_fields_order(&added, truncated).is_err());
    }
}
