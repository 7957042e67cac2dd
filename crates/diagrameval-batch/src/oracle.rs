//! Offline responder that answers requests from the human codes.
//!
//! With `flip_rate = 0` every response agrees with the ground truth. A
//! positive rate flips that share of extraction codes, and of self-link
//! positions among boxes still coded good, drawing from an RNG seeded per
//! diagram so repeated runs produce the same file.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use diagrameval_core::model::{
    CorrectPosition, Diagram, Extraction, ModelResponse, PositionCode, ResponseBox, FIELD_NUMBERS,
};
use diagrameval_core::request::EvaluationRequest;
use diagrameval_core::sampler::derive_seed;
use diagrameval_core::store::DiagramStore;

use crate::responses::{ResponseRecord, TokenUsage};

/// Rough characters-per-token ratio for usage estimates.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleResponder {
    flip_rate: f64,
    seed: u64,
}

impl Default for OracleResponder {
    fn default() -> Self {
        Self::new(0.0, 0)
    }
}

impl OracleResponder {
    /// `flip_rate` is clamped to `[0, 1]`.
    pub fn new(flip_rate: f64, seed: u64) -> Self {
        let flip_rate = if flip_rate.is_nan() {
            0.0
        } else {
            flip_rate.clamp(0.0, 1.0)
        };
        Self { flip_rate, seed }
    }

    pub fn flip_rate(&self) -> f64 {
        self.flip_rate
    }

    /// Response for one diagram. Boxes without a field get the sentinel.
    pub fn respond_to(&self, diagram: &Diagram) -> ModelResponse {
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, &diagram.id));
        let mut response = ModelResponse::default();

        for n in FIELD_NUMBERS {
            let Some(field) = diagram.field(n) else {
                response.set(n, ResponseBox::SENTINEL);
                continue;
            };

            let mut extraction = Extraction::from(field.code);
            if rng.gen_bool(self.flip_rate) {
                extraction = match extraction {
                    Extraction::Good => Extraction::Commission,
                    _ => Extraction::Good,
                };
            }

            let value = match extraction {
                Extraction::Good => {
                    let links_self = field.link_number == Some(n);
                    if rng.gen_bool(self.flip_rate) {
                        if links_self {
                            ResponseBox {
                                extraction,
                                position: PositionCode::LinksElsewhere,
                                correct_position: CorrectPosition::Unknown,
                            }
                        } else {
                            ResponseBox {
                                extraction,
                                position: PositionCode::LinksSelf,
                                correct_position: CorrectPosition::Field(n),
                            }
                        }
                    } else {
                        ResponseBox {
                            extraction,
                            position: if links_self {
                                PositionCode::LinksSelf
                            } else {
                                PositionCode::LinksElsewhere
                            },
                            correct_position: field.link_number.into(),
                        }
                    }
                }
                _ => ResponseBox {
                    extraction,
                    position: PositionCode::NotApplicable,
                    correct_position: field.link_number.into(),
                },
            };
            response.set(n, value);
        }

        response
    }

    /// Answer every request whose diagram is in the store.
    ///
    /// Requests for unknown diagrams are skipped with a warning.
    pub fn respond(&self, store: &DiagramStore, requests: &[EvaluationRequest]) -> Vec<ResponseRecord> {
        let mut records = Vec::with_capacity(requests.len());

        for request in requests {
            let Some(diagram) = request.diagram_id().and_then(|id| store.get(id)) else {
                tracing::warn!(custom_id = %request.custom_id, "no diagram for request, skipping");
                continue;
            };

            let response = self.respond_to(diagram);
            let prompt_chars: usize = request
                .body
                .messages
                .iter()
                .map(|m| m.content.chars().count())
                .sum();
            let completion_chars = serde_json::to_string(&response)
                .map(|s| s.chars().count())
                .unwrap_or_default();

            records.push(ResponseRecord {
                diagram_id: diagram.id.clone(),
                response,
                usage: TokenUsage {
                    prompt_tokens: (prompt_chars / CHARS_PER_TOKEN) as u64,
                    completion_tokens: (completion_chars / CHARS_PER_TOKEN) as u64,
                },
            });
        }

        tracing::debug!(count = records.len(), flip_rate = self.flip_rate, "oracle responded");
        records
    }
}
