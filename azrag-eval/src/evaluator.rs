//! LLM-as-judge scoring of one chat reply against the rubric set

use crate::parser::{parse_evaluation, ParsedEvaluation};
use crate::rubric::{render_prompt, Metric, PromptInputs};
use azrag_core::{
    AzragError, AzragResult, ChatMessage, ChatModel, ChatReply, ContextItem, ErrorContext,
    ResponseSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// System turn placed before every rubric prompt
pub const EVALUATOR_SYSTEM_PROMPT: &str =
    "You are an AI assistant evaluating the quality of answers.";

/// How the judge is asked to answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Free text ending in `thoughts:` / `stars:` lines, parsed by marker
    #[default]
    FreeText,
    /// A `{thoughts, stars}` object constrained by a declared schema
    Structured,
}

/// One metric's verdict on one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub metric: Metric,
    pub thoughts: String,
    /// Unvalidated rating text; `None` when the judge gave none
    pub rating: Option<String>,
    /// Best-effort integer reading of `rating`
    pub stars: Option<u8>,
    pub in_range: bool,
    /// The judge's reply exactly as received
    pub raw: String,
}

impl EvaluationRecord {
    fn from_parsed(metric: Metric, parsed: ParsedEvaluation, raw: String) -> Self {
        Self {
            metric,
            stars: parsed.stars(),
            in_range: parsed.in_range(metric),
            thoughts: parsed.thoughts,
            rating: parsed.rating,
            raw,
        }
    }

    pub fn rating_text(&self) -> &str {
        self.rating
            .as_deref()
            .unwrap_or(crate::parser::MISSING_RATING)
    }
}

/// `Source {n} - {content}` lines, numbered from 1
pub fn format_sources(context: &[ContextItem]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, item)| format!("Source {} - {}", i + 1, item.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rating_schema() -> ResponseSchema {
    ResponseSchema {
        name: "evaluation".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "thoughts": { "type": "string" },
                "stars": { "type": "integer" }
            },
            "required": ["thoughts", "stars"],
            "additionalProperties": false
        }),
    }
}

pub struct Evaluator {
    chat: Arc<dyn ChatModel>,
    mode: EvaluationMode,
    metrics: Vec<Metric>,
}

impl Evaluator {
    /// Free-text judging over [`Metric::default_set`]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            mode: EvaluationMode::default(),
            metrics: Metric::default_set().to_vec(),
        }
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    /// Messages sent to the judge for one metric
    pub fn messages(
        &self,
        metric: Metric,
        question: &str,
        reply: &ChatReply,
        ground_truth: &str,
    ) -> Vec<ChatMessage> {
        let context = format_sources(&reply.context);
        let inputs = PromptInputs {
            question,
            context: &context,
            answer: &reply.response,
            ground_truth: if metric.uses_ground_truth() {
                ground_truth
            } else {
                ""
            },
        };

        vec![
            ChatMessage::system(EVALUATOR_SYSTEM_PROMPT),
            ChatMessage::user(render_prompt(metric.template(), &inputs)),
        ]
    }

    /// Score one metric
    pub async fn evaluate_metric(
        &self,
        metric: Metric,
        question: &str,
        reply: &ChatReply,
        ground_truth: &str,
    ) -> AzragResult<EvaluationRecord> {
        let messages = self.messages(metric, question, reply, ground_truth);

        let record = match self.mode {
            EvaluationMode::FreeText => {
                let raw = self.chat.chat(&messages).await?;
                EvaluationRecord::from_parsed(metric, parse_evaluation(&raw), raw)
            }
            EvaluationMode::Structured => {
                let value = self.chat.chat_structured(&messages, &rating_schema()).await?;
                structured_record(metric, value)?
            }
        };

        debug!(
            metric = %metric,
            rating = record.rating_text(),
            "Metric evaluated"
        );
        Ok(record)
    }

    /// Score every configured metric, one after another
    pub async fn evaluate(
        &self,
        question: &str,
        ground_truth: &str,
        reply: &ChatReply,
    ) -> AzragResult<Vec<EvaluationRecord>> {
        let mut records = Vec::with_capacity(self.metrics.len());
        for metric in &self.metrics {
            records.push(
                self.evaluate_metric(*metric, question, reply, ground_truth)
                    .await?,
            );
        }

        info!(
            metrics = records.len(),
            judge = self.chat.model_name(),
            "Answer evaluated"
        );
        Ok(records)
    }
}

fn structured_record(metric: Metric, value: Value) -> AzragResult<EvaluationRecord> {
    let missing = |field: &str| AzragError::Evaluation {
        message: format!("Structured evaluation is missing '{}'", field),
        metric: Some(metric.label().to_string()),
        context: ErrorContext::new("evaluator").with_operation("evaluate_metric"),
    };

    let thoughts = value
        .get("thoughts")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("thoughts"))?
        .trim()
        .to_string();
    let stars = value.get("stars").ok_or_else(|| missing("stars"))?;
    let rating = match stars {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    let parsed = ParsedEvaluation {
        thoughts,
        rating: Some(rating),
    };
    Ok(EvaluationRecord::from_parsed(metric, parsed, value.to_string()))
}
