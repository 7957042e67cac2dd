//! Grouping of raw field rows into diagrams.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::model::{Code, Diagram, Field, RawRow, BOX_COUNT, FIELD_NUMBERS};

/// How strictly a row group must match the four-box shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingPolicy {
    /// Exactly four distinct field numbers 1..=4.
    #[default]
    Strict,
    /// One to four distinct field numbers within 1..=4.
    Lenient,
}

/// Options for building a [`DiagramStore`] from unfiltered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Only rows from this dataset are grouped.
    pub target_dataset: String,
    pub policy: GroupingPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            target_dataset: "target".into(),
            policy: GroupingPolicy::Strict,
        }
    }
}

impl StoreOptions {
    /// Whether a row takes part in grouping at all.
    pub fn accepts(&self, row: &RawRow) -> bool {
        row.dataset == self.target_dataset && row.code.parse::<Code>().is_ok()
    }
}

/// Diagrams keyed by `"{student_id}_{class_id}_{text_name}"`, in id order.
#[derive(Debug, Clone, Default)]
pub struct DiagramStore {
    diagrams: BTreeMap<String, Diagram>,
}

/// Result of grouping rows without aborting on the first bad group.
#[derive(Debug, Clone)]
pub struct GroupingOutcome {
    pub store: DiagramStore,
    /// One `MalformedRow` per rejected group.
    pub failures: Vec<ScoringError>,
    /// Rows dropped by the dataset/code filter.
    pub filtered_rows: usize,
}

impl DiagramStore {
    /// Group rows, collecting malformed groups as failures.
    pub fn from_rows(rows: &[RawRow], options: &StoreOptions) -> GroupingOutcome {
        let mut groups: BTreeMap<String, Vec<&RawRow>> = BTreeMap::new();
        let mut filtered_rows = 0usize;
        for row in rows {
            if options.accepts(row) {
                groups.entry(row.diagram_id()).or_default().push(row);
            } else {
                filtered_rows += 1;
            }
        }

        let mut diagrams = BTreeMap::new();
        let mut failures = Vec::new();
        for (id, group) in groups {
            match build_diagram(&id, &group, options.policy) {
                Ok(diagram) => {
                    diagrams.insert(id, diagram);
                }
                Err(e) => {
                    tracing::warn!("skipping diagram {id}: {e}");
                    failures.push(e);
                }
            }
        }

        tracing::debug!(
            diagrams = diagrams.len(),
            failures = failures.len(),
            filtered_rows,
            "grouped rows into diagrams"
        );

        GroupingOutcome {
            store: DiagramStore { diagrams },
            failures,
            filtered_rows,
        }
    }

    /// Group rows, failing on the first malformed group.
    pub fn try_from_rows(rows: &[RawRow], options: &StoreOptions) -> Result<Self, ScoringError> {
        let outcome = Self::from_rows(rows, options);
        match outcome.failures.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(outcome.store),
        }
    }

    /// Build a store from already validated diagrams.
    pub fn from_diagrams(diagrams: impl IntoIterator<Item = Diagram>) -> Self {
        Self {
            diagrams: diagrams.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Diagram> {
        self.diagrams.get(id)
    }

    pub fn len(&self) -> usize {
        self.diagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagrams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagram> {
        self.diagrams.values()
    }

    /// All diagram ids in stable order.
    pub fn ids(&self) -> Vec<String> {
        self.diagrams.keys().cloned().collect()
    }

    /// Distinct source texts.
    pub fn texts(&self) -> BTreeSet<&str> {
        self.diagrams.values().map(|d| d.text_name.as_str()).collect()
    }
}

fn build_diagram(id: &str, rows: &[&RawRow], policy: GroupingPolicy) -> Result<Diagram, ScoringError> {
    let malformed = |reason: String| ScoringError::MalformedRow {
        diagram_id: id.to_string(),
        reason,
    };

    let mut fields: Vec<Field> = Vec::with_capacity(rows.len());
    for row in rows {
        if !FIELD_NUMBERS.contains(&row.field_number) {
            return Err(malformed(format!(
                "field number {} is outside 1..={BOX_COUNT}",
                row.field_number
            )));
        }
        if fields.iter().any(|f| f.field_number == row.field_number) {
            return Err(malformed(format!(
                "field number {} appears more than once",
                row.field_number
            )));
        }
        let code = row.code.parse::<Code>().map_err(malformed)?;
        fields.push(Field {
            text: row.text.clone(),
            field_number: row.field_number,
            link_number: row.link_number,
            code,
        });
    }

    if policy == GroupingPolicy::Strict && fields.len() != BOX_COUNT {
        let present: Vec<String> = fields.iter().map(|f| f.field_number.to_string()).collect();
        return Err(malformed(format!(
            "expected {BOX_COUNT} fields, found {} ({})",
            fields.len(),
            present.join(", ")
        )));
    }

    fields.sort_by_key(|f| f.field_number);

    // Every row of a group shares these keys.
    let first = rows[0];
    Ok(Diagram {
        id: id.to_string(),
        student_id: first.student_id.clone(),
        class_id: first.class_id.clone(),
        text_name: first.text_name.clone(),
        dataset: first.dataset.clone(),
        fields,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn row(
        student: &str,
        text: &str,
        field: u8,
        link: Option<u8>,
        code: &str,
    ) -> RawRow {
        RawRow {
            student_id: student.into(),
            class_id: "3A".into(),
            text_name: text.into(),
            field_number: field,
            link_number: link,
            text: format!("answer {student} {field}"),
            code: code.into(),
            dataset: "target".into(),
        }
    }

    pub(crate) fn full_diagram_rows(student: &str, text: &str) -> Vec<RawRow> {
        vec![
            row(student, text, 1, Some(1), "good"),
            row(student, text, 2, Some(1), "good"),
            row(student, text, 3, Some(3), "commission"),
            row(student, text, 4, Some(4), "good"),
        ]
    }

    #[test]
    fn groups_rows_by_composite_key() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.extend(full_diagram_rows("2", "Beton"));
        rows.extend(full_diagram_rows("1", "Suez"));

        let store = DiagramStore::try_from_rows(&rows, &StoreOptions::default()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.ids(), vec!["1_3A_Beton", "1_3A_Suez", "2_3A_Beton"]);
        let d = store.get("1_3A_Suez").unwrap();
        assert_eq!(d.fields.len(), 4);
        assert_eq!(d.field(3).unwrap().code, Code::Commission);
    }

    #[test]
    fn filters_other_datasets_and_codes() {
        let mut rows = full_diagram_rows("1", "Beton");
        let mut other = row("9", "Beton", 1, Some(1), "good");
        other.dataset = "pilot".into();
        rows.push(other);
        rows.push(row("1", "Beton", 4, None, "o"));

        let outcome = DiagramStore::from_rows(&rows, &StoreOptions::default());
        assert_eq!(outcome.filtered_rows, 2);
        assert_eq!(outcome.store.len(), 1);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn strict_policy_rejects_incomplete_diagram() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.pop();
        let err = DiagramStore::try_from_rows(&rows, &StoreOptions::default()).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedRow { .. }));
        assert!(err.to_string().contains("expected 4 fields, found 3"));
    }

    #[test]
    fn lenient_policy_accepts_incomplete_diagram() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.remove(1);
        let options = StoreOptions {
            policy: GroupingPolicy::Lenient,
            ..Default::default()
        };
        let store = DiagramStore::try_from_rows(&rows, &options).unwrap();
        let d = store.get("1_3A_Beton").unwrap();
        assert_eq!(d.fields.len(), 3);
        assert!(d.field(2).is_none());
    }

    #[test]
    fn duplicate_and_out_of_range_fields_always_fail() {
        let options = StoreOptions {
            policy: GroupingPolicy::Lenient,
            ..Default::default()
        };

        let mut rows = full_diagram_rows("1", "Beton");
        rows[1].field_number = 1;
        let err = DiagramStore::try_from_rows(&rows, &options).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let mut rows = full_diagram_rows("1", "Beton");
        rows[3].field_number = 5;
        let err = DiagramStore::try_from_rows(&rows, &options).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn bad_group_does_not_abort_others() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.extend(full_diagram_rows("2", "Beton").into_iter().take(2));

        let outcome = DiagramStore::from_rows(&rows, &StoreOptions::default());
        assert_eq!(outcome.store.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].item_id(), Some("2_3A_Beton"));
    }

    #[test]
    fn fields_sorted_regardless_of_row_order() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.reverse();
        let store = DiagramStore::try_from_rows(&rows, &StoreOptions::default()).unwrap();
        let numbers: Vec<u8> = store
            .get("1_3A_Beton")
            .unwrap()
            .fields
            .iter()
            .map(|f| f.field_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
