//! Core data model types for diagrameval.
//!
//! Student answers arrive as one row per coded field. Rows are grouped into
//! four-box diagrams, projected onto per-text reference templates, and
//! compared against the four-box structure a model returns.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Number of boxes in every diagram.
pub const BOX_COUNT: usize = 4;

/// Valid field numbers, in box order.
pub const FIELD_NUMBERS: [u8; BOX_COUNT] = [1, 2, 3, 4];

/// Human code for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Code {
    #[serde(alias = "g")]
    Good,
    #[serde(alias = "c")]
    Commission,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Good => write!(f, "good"),
            Code::Commission => write!(f, "commission"),
        }
    }
}

impl FromStr for Code {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "good" | "g" => Ok(Code::Good),
            "commission" | "c" => Ok(Code::Commission),
            other => Err(format!("unknown code: {other}")),
        }
    }
}

/// Model's content code for one box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extraction {
    #[serde(alias = "g")]
    Good,
    #[serde(alias = "c")]
    Commission,
    #[serde(alias = "o")]
    None,
}

impl From<Code> for Extraction {
    fn from(code: Code) -> Self {
        match code {
            Code::Good => Extraction::Good,
            Code::Commission => Extraction::Commission,
        }
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Good => write!(f, "good"),
            Extraction::Commission => write!(f, "commission"),
            Extraction::None => write!(f, "none"),
        }
    }
}

/// Structural code: does the field link to itself?
///
/// Serialized as the integers `0`, `1`, `2` or the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionCode {
    /// `0`: the field links to another box.
    LinksElsewhere,
    /// `1`: the field links to its own box.
    LinksSelf,
    /// `2`: not applicable, the field is a commission error.
    NotApplicable,
    Unknown,
}

impl PositionCode {
    /// Position code implied by a human-coded field.
    pub fn derive(code: Code, field_number: u8, link_number: Option<u8>) -> Self {
        match code {
            Code::Commission => PositionCode::NotApplicable,
            Code::Good if link_number == Some(field_number) => PositionCode::LinksSelf,
            Code::Good => PositionCode::LinksElsewhere,
        }
    }

    pub fn as_number(self) -> Option<u8> {
        match self {
            PositionCode::LinksElsewhere => Some(0),
            PositionCode::LinksSelf => Some(1),
            PositionCode::NotApplicable => Some(2),
            PositionCode::Unknown => None,
        }
    }

    fn from_number(n: i64) -> Option<Self> {
        match n {
            0 => Some(PositionCode::LinksElsewhere),
            1 => Some(PositionCode::LinksSelf),
            2 => Some(PositionCode::NotApplicable),
            9 => Some(PositionCode::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for PositionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_number() {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "unknown"),
        }
    }
}

impl Serialize for PositionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u8(n),
            None => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for PositionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<NumberOrText>::deserialize(deserializer)?;
        match raw {
            None => Ok(PositionCode::Unknown),
            Some(raw) => match raw.as_number() {
                Some(n) => PositionCode::from_number(n)
                    .ok_or_else(|| de::Error::custom(format!("invalid position code: {n}"))),
                None if raw.is_unknown() => Ok(PositionCode::Unknown),
                None => Err(de::Error::custom(format!("invalid position code: {raw}"))),
            },
        }
    }
}

/// Model's claim about which field a box should link to.
///
/// Serialized as a field number or the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectPosition {
    Field(u8),
    Unknown,
}

impl CorrectPosition {
    pub fn field_number(self) -> Option<u8> {
        match self {
            CorrectPosition::Field(n) => Some(n),
            CorrectPosition::Unknown => None,
        }
    }
}

impl From<Option<u8>> for CorrectPosition {
    fn from(link: Option<u8>) -> Self {
        link.map_or(CorrectPosition::Unknown, CorrectPosition::Field)
    }
}

impl fmt::Display for CorrectPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectPosition::Field(n) => write!(f, "{n}"),
            CorrectPosition::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for CorrectPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CorrectPosition::Field(n) => serializer.serialize_u8(*n),
            CorrectPosition::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for CorrectPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let link = link_number::deserialize(deserializer)?;
        Ok(CorrectPosition::from(link))
    }
}

/// Loosely typed scalar as it appears in spreadsheets and model output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn as_number(&self) -> Option<i64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            NumberOrText::Float(_) => None,
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, NumberOrText::Text(s) if matches!(s.trim().to_lowercase().as_str(), "unknown" | "none" | "" | "nan"))
    }

    fn into_text(self) -> String {
        match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Float(f) if f.fract() == 0.0 => (f as i64).to_string(),
            NumberOrText::Float(f) => f.to_string(),
            NumberOrText::Text(s) => s,
        }
    }
}

impl fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOrText::Number(n) => write!(f, "{n}"),
            NumberOrText::Float(x) => write!(f, "{x}"),
            NumberOrText::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Serde helpers for an optional field number written as `"none"` when absent.
pub mod link_number {
    use super::*;

    pub fn serialize<S: Serializer>(link: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        match link {
            Some(n) => serializer.serialize_u8(*n),
            None => serializer.serialize_str("none"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
        let raw = Option::<NumberOrText>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match raw.as_number() {
            Some(n) if (1..=BOX_COUNT as i64).contains(&n) => Ok(Some(n as u8)),
            Some(9) => Ok(None),
            Some(n) => Err(de::Error::custom(format!("field number out of range: {n}"))),
            None if raw.is_unknown() => Ok(None),
            None => Err(de::Error::custom(format!("invalid field number: {raw}"))),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(NumberOrText::deserialize(deserializer)?.into_text())
}

fn field_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = NumberOrText::deserialize(deserializer)?;
    raw.as_number()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| de::Error::custom(format!("invalid field number: {raw}")))
}

/// One input row as produced by the tabular loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(deserialize_with = "string_or_number")]
    pub student_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub class_id: String,
    pub text_name: String,
    /// Range is checked during grouping, not parsing.
    #[serde(deserialize_with = "field_number")]
    pub field_number: u8,
    #[serde(with = "link_number", default)]
    pub link_number: Option<u8>,
    #[serde(default)]
    pub text: String,
    /// Raw code; rows with codes other than good/commission are filtered out.
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub dataset: String,
}

impl RawRow {
    /// Composite diagram identifier for this row.
    pub fn diagram_id(&self) -> String {
        diagram_id(&self.student_id, &self.class_id, &self.text_name)
    }

    /// Participant identifier (student within class).
    pub fn participant_id(&self) -> String {
        format!("{}_{}", self.student_id, self.class_id)
    }
}

/// Build the composite `"{student_id}_{class_id}_{text_name}"` identifier.
pub fn diagram_id(student_id: &str, class_id: &str, text_name: &str) -> String {
    format!("{student_id}_{class_id}_{text_name}")
}

/// One coded student answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub text: String,
    pub field_number: u8,
    #[serde(with = "link_number")]
    pub link_number: Option<u8>,
    pub code: Code,
}

impl Field {
    pub fn position_code(&self) -> PositionCode {
        PositionCode::derive(self.code, self.field_number, self.link_number)
    }
}

/// The coded fields of one student's answer to one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub text_name: String,
    pub dataset: String,
    /// Sorted by field number; numbers are unique and within 1..=4.
    pub fields: Vec<Field>,
}

impl Diagram {
    pub fn field(&self, field_number: u8) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_number == field_number)
    }
}

/// Serialized shape shared by every four-box structure: `{"Box_1": .., "Box_4": ..}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
struct BoxesWire<T> {
    #[serde(rename = "Box_1", default)]
    box_1: T,
    #[serde(rename = "Box_2", default)]
    box_2: T,
    #[serde(rename = "Box_3", default)]
    box_3: T,
    #[serde(rename = "Box_4", default)]
    box_4: T,
}

impl<T> From<[T; BOX_COUNT]> for BoxesWire<T> {
    fn from(boxes: [T; BOX_COUNT]) -> Self {
        let [box_1, box_2, box_3, box_4] = boxes;
        Self {
            box_1,
            box_2,
            box_3,
            box_4,
        }
    }
}

impl<T> From<BoxesWire<T>> for [T; BOX_COUNT] {
    fn from(wire: BoxesWire<T>) -> Self {
        [wire.box_1, wire.box_2, wire.box_3, wire.box_4]
    }
}

fn box_index(field_number: u8) -> Option<usize> {
    FIELD_NUMBERS.iter().position(|&n| n == field_number)
}

/// One box of a reference diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBox {
    /// Ground-truth content of the box.
    #[serde(rename = "Truth", default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<String>,
    #[serde(
        rename = "Student Response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub student_response: Option<String>,
}

/// Per-text reference template, including the raw source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TemplateWire", into = "TemplateWire")]
pub struct ReferenceTemplate {
    pub text: String,
    pub boxes: [ReferenceBox; BOX_COUNT],
}

#[derive(Clone, Serialize, Deserialize)]
struct TemplateWire {
    #[serde(default)]
    text: String,
    #[serde(flatten)]
    boxes: BoxesWire<ReferenceBox>,
}

impl From<TemplateWire> for ReferenceTemplate {
    fn from(wire: TemplateWire) -> Self {
        Self {
            text: wire.text,
            boxes: wire.boxes.into(),
        }
    }
}

impl From<ReferenceTemplate> for TemplateWire {
    fn from(template: ReferenceTemplate) -> Self {
        Self {
            text: template.text,
            boxes: template.boxes.into(),
        }
    }
}

/// Reference diagram as sent to the model: four boxes, no source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoxesWire<ReferenceBox>", into = "BoxesWire<ReferenceBox>")]
pub struct ReferenceDiagram {
    pub boxes: [ReferenceBox; BOX_COUNT],
}

impl From<BoxesWire<ReferenceBox>> for ReferenceDiagram {
    fn from(wire: BoxesWire<ReferenceBox>) -> Self {
        Self { boxes: wire.into() }
    }
}

impl From<ReferenceDiagram> for BoxesWire<ReferenceBox> {
    fn from(diagram: ReferenceDiagram) -> Self {
        diagram.boxes.into()
    }
}

impl ReferenceDiagram {
    pub fn get(&self, field_number: u8) -> Option<&ReferenceBox> {
        box_index(field_number).map(|i| &self.boxes[i])
    }

    pub fn get_mut(&mut self, field_number: u8) -> Option<&mut ReferenceBox> {
        box_index(field_number).map(|i| &mut self.boxes[i])
    }
}

/// One box of a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBox {
    #[serde(rename = "Extraction")]
    pub extraction: Extraction,
    #[serde(rename = "Position")]
    pub position: PositionCode,
    #[serde(rename = "Correct Position")]
    pub correct_position: CorrectPosition,
}

impl ResponseBox {
    /// Filler for a box with no student field.
    pub const SENTINEL: ResponseBox = ResponseBox {
        extraction: Extraction::None,
        position: PositionCode::Unknown,
        correct_position: CorrectPosition::Unknown,
    };
}

/// Structured model output for one diagram.
///
/// A box is `None` when the model omitted it entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BoxesWire<Option<ResponseBox>>",
    into = "BoxesWire<Option<ResponseBox>>"
)]
pub struct ModelResponse {
    pub boxes: [Option<ResponseBox>; BOX_COUNT],
}

impl From<BoxesWire<Option<ResponseBox>>> for ModelResponse {
    fn from(wire: BoxesWire<Option<ResponseBox>>) -> Self {
        Self { boxes: wire.into() }
    }
}

impl From<ModelResponse> for BoxesWire<Option<ResponseBox>> {
    fn from(response: ModelResponse) -> Self {
        response.boxes.into()
    }
}

impl ModelResponse {
    pub fn get(&self, field_number: u8) -> Option<&ResponseBox> {
        box_index(field_number).and_then(|i| self.boxes[i].as_ref())
    }

    pub fn set(&mut self, field_number: u8, value: ResponseBox) {
        if let Some(i) = box_index(field_number) {
            self.boxes[i] = Some(value);
        }
    }
}
