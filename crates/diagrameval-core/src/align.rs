//! Alignment of model responses with human-coded fields.

use serde::{Deserialize, Serialize};

use crate::confusion::{classify_extraction, classify_position, ConfusionLabel};
use crate::error::ScoringError;
use crate::model::{
    link_number, Code, CorrectPosition, Diagram, Extraction, ModelResponse, PositionCode,
};

/// One field's human code next to the model's, with agreement and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub dataset: String,
    pub diagram_id: String,
    pub field_text: String,
    pub human_code: Code,
    pub model_code: Extraction,
    pub extraction_agreement: bool,
    pub extraction_label: ConfusionLabel,
    pub field_number: u8,
    #[serde(with = "link_number")]
    pub link_number: Option<u8>,
    pub position_code: PositionCode,
    pub model_position_code: PositionCode,
    pub model_correct_position: CorrectPosition,
    /// `None` outside the Position scope (human good and model agreed).
    pub position_code_agreement: Option<bool>,
    pub position_code_label: Option<ConfusionLabel>,
    /// The model named the field the student linked to.
    pub position_agreement: bool,
}

impl ComparisonRow {
    /// Whether this row is scored on the Position dimension.
    pub fn in_position_scope(&self) -> bool {
        self.position_code_label.is_some()
    }
}

/// One comparison row per field of `diagram`, in field order.
pub fn align(diagram: &Diagram, response: &ModelResponse) -> Result<Vec<ComparisonRow>, ScoringError> {
    let mut rows = Vec::with_capacity(diagram.fields.len());
    for field in &diagram.fields {
        let model_box = response
            .get(field.field_number)
            .ok_or_else(|| ScoringError::Alignment {
                diagram_id: diagram.id.clone(),
                field_number: field.field_number,
            })?;

        let extraction_label = classify_extraction(&diagram.id, field.code, model_box.extraction)?;
        let position_code = field.position_code();

        let (position_code_agreement, position_code_label) =
            if field.code == Code::Good && model_box.extraction == Extraction::Good {
                let label = classify_position(&diagram.id, position_code, model_box.position)?;
                (Some(label.is_agreement()), Some(label))
            } else {
                (None, None)
            };

        rows.push(ComparisonRow {
            dataset: diagram.dataset.clone(),
            diagram_id: diagram.id.clone(),
            field_text: field.text.clone(),
            human_code: field.code,
            model_code: model_box.extraction,
            extraction_agreement: extraction_label.is_agreement(),
            extraction_label,
            field_number: field.field_number,
            link_number: field.link_number,
            position_code,
            model_position_code: model_box.position,
            model_correct_position: model_box.correct_position,
            position_code_agreement,
            position_code_label,
            position_agreement: CorrectPosition::from(field.link_number)
                == model_box.correct_position,
        });
    }
    Ok(rows)
}
