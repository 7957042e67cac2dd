//! Reference diagrams and worked examples for the prompt.

use std::collections::BTreeMap;

use crate::error::ScoringError;
use crate::model::{
    CorrectPosition, Diagram, Extraction, ModelResponse, ReferenceDiagram, ReferenceTemplate,
    ResponseBox, FIELD_NUMBERS,
};
use crate::setting::ExperimentSetting;
use crate::store::DiagramStore;

/// Builds prompt payloads from per-text reference templates.
#[derive(Debug, Clone, Default)]
pub struct PromptPayloadBuilder {
    templates: BTreeMap<String, ReferenceTemplate>,
}

impl PromptPayloadBuilder {
    pub fn new(templates: BTreeMap<String, ReferenceTemplate>) -> Self {
        Self { templates }
    }

    pub fn template(&self, text_name: &str) -> Result<&ReferenceTemplate, ScoringError> {
        self.templates
            .get(text_name)
            .ok_or_else(|| ScoringError::UnknownText(text_name.to_string()))
    }

    /// Raw source text the students read.
    pub fn source_text(&self, text_name: &str) -> Result<&str, ScoringError> {
        Ok(self.template(text_name)?.text.as_str())
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Project a diagram onto its text's template.
    ///
    /// The source text is never part of the result. `Truth` is kept only when
    /// the setting gives the model the reference diagram.
    pub fn build_reference(
        &self,
        diagram: &Diagram,
        setting: &ExperimentSetting,
    ) -> Result<ReferenceDiagram, ScoringError> {
        let template = self.template(&diagram.text_name)?;
        let mut reference = ReferenceDiagram {
            boxes: template.boxes.clone(),
        };

        if !setting.truth_given {
            for b in reference.boxes.iter_mut() {
                b.truth = None;
            }
        }

        for field in &diagram.fields {
            if let Some(b) = reference.get_mut(field.field_number) {
                b.student_response = Some(field.text.clone());
            }
        }

        Ok(reference)
    }

    /// Reference inputs and desired outputs for the given example diagrams.
    pub fn build_examples(
        &self,
        store: &DiagramStore,
        example_ids: &[String],
        setting: &ExperimentSetting,
    ) -> Result<(Vec<ReferenceDiagram>, Vec<ModelResponse>), ScoringError> {
        let mut inputs = Vec::with_capacity(example_ids.len());
        let mut outputs = Vec::with_capacity(example_ids.len());
        for id in example_ids {
            let diagram = store
                .get(id)
                .ok_or_else(|| ScoringError::UnknownDiagram(id.clone()))?;
            inputs.push(self.build_reference(diagram, setting)?);
            outputs.push(desired_output(diagram));
        }
        Ok((inputs, outputs))
    }
}

/// The response a perfect coder would give for a diagram.
///
/// Boxes without a student field get [`ResponseBox::SENTINEL`]; all four
/// boxes are always present.
pub fn desired_output(diagram: &Diagram) -> ModelResponse {
    let mut response = ModelResponse::default();
    for n in FIELD_NUMBERS {
        let value = match diagram.field(n) {
            Some(field) => ResponseBox {
                extraction: Extraction::from(field.code),
                position: field.position_code(),
                correct_position: CorrectPosition::from(field.link_number),
            },
            None => ResponseBox::SENTINEL,
        };
        response.set(n, value);
    }
    response
}

/// The `# Input` block for the evaluated diagram.
pub fn render_input(reference: &ReferenceDiagram) -> Result<String, serde_json::Error> {
    Ok(format!("# Input\n{}", serde_json::to_string_pretty(reference)?))
}

/// The `# Examples` block, or an empty string when there are none.
pub fn render_examples(
    inputs: &[ReferenceDiagram],
    outputs: &[ModelResponse],
) -> Result<String, serde_json::Error> {
    if inputs.is_empty() {
        return Ok(String::new());
    }

    let mut blocks = Vec::with_capacity(inputs.len());
    for (i, (input, output)) in inputs.iter().zip(outputs).enumerate() {
        blocks.push(format!(
            "## Example {}\nInput:\n{}\n\nDesired Output:\n{}",
            i + 1,
            serde_json::to_string_pretty(input)?,
            serde_json::to_string_pretty(output)?,
        ));
    }
    Ok(format!("# Examples\n{}", blocks.join("\n\n")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{PositionCode, ReferenceBox};
    use crate::setting::builtin_settings;
    use crate::store::tests::{full_diagram_rows, row};
    use crate::store::{GroupingPolicy, StoreOptions};

    pub(crate) fn beton_template() -> ReferenceTemplate {
        let truth = |s: &str| ReferenceBox {
            truth: Some(s.to_string()),
            student_response: None,
        };
        ReferenceTemplate {
            text: "Concrete hardens because ...".into(),
            boxes: [
                truth("cement and water"),
                truth("hydration"),
                truth("crystals form"),
                truth("concrete hardens"),
            ],
        }
    }

    pub(crate) fn builder() -> PromptPayloadBuilder {
        let mut templates = BTreeMap::new();
        templates.insert("Beton".to_string(), beton_template());
        PromptPayloadBuilder::new(templates)
    }

    fn store() -> DiagramStore {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.extend(full_diagram_rows("2", "Beton"));
        rows.push(row("3", "Beton", 1, Some(2), "good"));
        rows.push(row("3", "Beton", 4, Some(4), "commission"));
        let options = StoreOptions {
            policy: GroupingPolicy::Lenient,
            ..Default::default()
        };
        DiagramStore::try_from_rows(&rows, &options).unwrap()
    }

    #[test]
    fn reference_without_truth_has_no_truth() {
        let setting = &builtin_settings()[0];
        assert!(!setting.truth_given);
        let store = store();
        let reference = builder()
            .build_reference(store.get("1_3A_Beton").unwrap(), setting)
            .unwrap();
        assert!(reference.boxes.iter().all(|b| b.truth.is_none()));
        assert_eq!(
            reference.get(2).unwrap().student_response.as_deref(),
            Some("answer 1 2")
        );
        let json = serde_json::to_string(&reference).unwrap();
        assert!(!json.contains("Concrete hardens"));
        assert!(!json.contains("Truth"));
    }

    #[test]
    fn reference_with_truth_keeps_template_truth() {
        let setting = builtin_settings()
            .into_iter()
            .find(|s| s.truth_given)
            .unwrap();
        let store = store();
        let reference = builder()
            .build_reference(store.get("1_3A_Beton").unwrap(), &setting)
            .unwrap();
        let template = beton_template();
        for (b, t) in reference.boxes.iter().zip(template.boxes.iter()) {
            assert_eq!(b.truth, t.truth);
        }
    }

    #[test]
    fn unknown_text_is_an_error() {
        let mut diagram = store().get("1_3A_Beton").unwrap().clone();
        diagram.text_name = "Suez".into();
        let err = builder()
            .build_reference(&diagram, &builtin_settings()[0])
            .unwrap_err();
        assert_eq!(err, ScoringError::UnknownText("Suez".into()));
    }

    #[test]
    fn desired_output_follows_position_rule() {
        let store = store();
        let output = desired_output(store.get("1_3A_Beton").unwrap());
        let b1 = output.get(1).unwrap();
        assert_eq!(b1.extraction, Extraction::Good);
        assert_eq!(b1.position, PositionCode::LinksSelf);
        let b2 = output.get(2).unwrap();
        assert_eq!(b2.position, PositionCode::LinksElsewhere);
        assert_eq!(b2.correct_position, CorrectPosition::Field(1));
        let b3 = output.get(3).unwrap();
        assert_eq!(b3.extraction, Extraction::Commission);
        assert_eq!(b3.position, PositionCode::NotApplicable);
    }

    #[test]
    fn desired_output_fills_sentinels_for_missing_fields() {
        let store = store();
        let output = desired_output(store.get("3_3A_Beton").unwrap());
        assert!(output.boxes.iter().all(Option::is_some));
        assert_eq!(output.get(2), Some(&ResponseBox::SENTINEL));
        assert_eq!(output.get(3), Some(&ResponseBox::SENTINEL));
        assert_eq!(output.get(1).unwrap().position, PositionCode::LinksElsewhere);
    }

    #[test]
    fn examples_render_numbered_blocks() {
        let store = store();
        let setting = &builtin_settings()[1];
        let ids = vec!["1_3A_Beton".to_string(), "2_3A_Beton".to_string()];
        let (inputs, outputs) = builder().build_examples(&store, &ids, setting).unwrap();
        assert_eq!(inputs.len(), 2);
        let text = render_examples(&inputs, &outputs).unwrap();
        assert!(text.starts_with("# Examples\n## Example 1\nInput:\n"));
        assert!(text.contains("## Example 2"));
        assert!(text.contains("Desired Output:"));
        assert_eq!(render_examples(&[], &[]).unwrap(), "");
    }

    #[test]
    fn examples_reject_unknown_ids() {
        let err = builder()
            .build_examples(&store(), &["9_3A_Beton".to_string()], &builtin_settings()[1])
            .unwrap_err();
        assert_eq!(err, ScoringError::UnknownDiagram("9_3A_Beton".into()));
    }
}
