//! Label assignment: turning selected candidates into stored label values.
//!
//! Every function here is pure. It takes a document's current labels and
//! returns the labels to persist; callers apply the result only after the
//! write succeeded.

use crate::error::{LabelError, LabelResult, invariant};
use crate::feature::FeatureCategory;
use crate::label::{
    Label, LabelType, LabelValue, LabelValueCandidate, RegionOrders, field_key_of, sort_values,
};
use crate::schema::{FieldType, SchemaStore};
use crate::selection::supported_field_types;

/// Drop candidates whose bounding-box list repeats an earlier one.
pub fn dedupe_candidates(candidates: &[LabelValueCandidate]) -> Vec<LabelValueCandidate> {
    let mut unique: Vec<LabelValueCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique
            .iter()
            .any(|kept| kept.bounding_boxes == candidate.bounding_boxes)
        {
            unique.push(candidate.clone());
        }
    }
    unique
}

/// Check every candidate category against the field type the path resolves to.
pub fn validate_assignment(
    label_path: &str,
    candidates: &[LabelValueCandidate],
    schema: &SchemaStore,
) -> LabelResult<FieldType> {
    let field_type = schema
        .resolve_leaf_type(label_path)
        .ok_or_else(|| invariant(format!("label path {label_path} does not resolve to a field")))?;

    if let Some(bad) = candidates
        .iter()
        .find(|c| !supported_field_types(c.category).contains(&field_type))
    {
        log::warn!(
            "Rejected {:?} value for {} of type {}",
            bad.category,
            label_path,
            field_type
        );
        return Err(LabelError::IncompatibleFieldType {
            label: label_path.to_string(),
            field_type,
            category: bad.category,
        });
    }
    Ok(field_type)
}

/// Assign candidates to the label at `label_path`.
///
/// Returns the document's new label list, or `None` when there is nothing
/// to assign. Values equal to a candidate are first taken away from every
/// label on the candidates' page, so a region only ever belongs to one label.
pub fn assign_label(
    label_path: &str,
    candidates: &[LabelValueCandidate],
    schema: &SchemaStore,
    labels: &[Label],
    orders: Option<&RegionOrders>,
) -> LabelResult<Option<Vec<Label>>> {
    let unique = dedupe_candidates(candidates);
    let Some(first) = unique.first() else {
        return Ok(None);
    };
    let field_type = validate_assignment(label_path, &unique, schema)?;

    let page = first.page;
    if let Some(existing_page) = labels
        .iter()
        .find(|l| l.label == label_path)
        .and_then(Label::page)
    {
        if existing_page != page {
            log::warn!(
                "Rejected cross-page assignment to {}: page {} vs {}",
                label_path,
                existing_page,
                page
            );
            return Err(LabelError::CrossPage {
                label: label_path.to_string(),
                existing_page,
                page,
            });
        }
    }

    let mut document_labels: Vec<Label> = labels
        .iter()
        .map(|label| {
            let value = label
                .value
                .iter()
                .filter(|v| {
                    v.page != page
                        || !unique
                            .iter()
                            .any(|c| c.bounding_boxes == v.bounding_boxes)
                })
                .cloned()
                .collect();
            Label { value, ..label.clone() }
        })
        .collect();

    let mut values: Vec<LabelValue> = unique.iter().map(LabelValue::from).collect();
    let single_region = unique.len() == 1 && first.category == FeatureCategory::DrawnRegion;

    match document_labels.iter().position(|l| l.label == label_path) {
        None => {
            if !single_region {
                sort_values(&mut values, orders);
            }
            document_labels.push(Label {
                label: label_path.to_string(),
                value: values,
                label_type: single_region.then_some(LabelType::Region),
            });
        }
        Some(index) => {
            let label = &mut document_labels[index];
            if single_region {
                label.value = values;
                label.label_type = Some(LabelType::Region);
            } else if matches!(field_type, FieldType::Signature | FieldType::SelectionMark) {
                label.value = values;
            } else if label.is_region() {
                sort_values(&mut values, orders);
                label.value = values;
                label.label_type = None;
            } else {
                label.value.extend(values);
                sort_values(&mut label.value, orders);
            }
        }
    }

    document_labels.retain(|l| !l.value.is_empty());
    log::info!(
        "Assigned {} value(s) to {} on page {}",
        unique.len(),
        label_path,
        page
    );
    Ok(Some(document_labels))
}

/// Replace the boxes of the value matching `old` after a geometry edit.
///
/// Returns `None` when the document has no label at `label_path`.
pub fn update_label(
    labels: &[Label],
    label_path: &str,
    old: &LabelValueCandidate,
    new: &LabelValueCandidate,
) -> Option<Vec<Label>> {
    labels.iter().position(|l| l.label == label_path)?;
    Some(
        labels
            .iter()
            .map(|label| {
                if label.label != label_path {
                    return label.clone();
                }
                let mut label = label.clone();
                for value in label
                    .value
                    .iter_mut()
                    .filter(|v| v.bounding_boxes == old.bounding_boxes)
                {
                    value.bounding_boxes = new.bounding_boxes.clone();
                }
                label
            })
            .collect(),
    )
}

/// Drop every label under the top-level field `field_key`.
pub fn delete_label_by_field(labels: &[Label], field_key: &str) -> Vec<Label> {
    labels
        .iter()
        .filter(|l| field_key_of(&l.label) != field_key)
        .cloned()
        .collect()
}

/// Drop the label at exactly `label_path`.
pub fn delete_label_by_label(labels: &[Label], label_path: &str) -> Vec<Label> {
    labels
        .iter()
        .filter(|l| l.label != label_path)
        .cloned()
        .collect()
}

/// Replace all labels of a table field with `table_labels`.
pub fn update_table_label(labels: &[Label], table_key: &str, table_labels: Vec<Label>) -> Vec<Label> {
    let mut updated = delete_label_by_field(labels, table_key);
    updated.extend(table_labels);
    updated
}
