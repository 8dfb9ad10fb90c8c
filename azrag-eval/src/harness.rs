//! Replays test questions through a chat backend and judges each reply

use crate::evaluator::{EvaluationRecord, Evaluator};
use crate::report;
use async_trait::async_trait;
use azrag_core::{AzragError, AzragResult, ChatReply, ErrorContext};
use azrag_rag::ChatPipeline;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// One entry of the questions file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestQuestion {
    pub question: String,
    pub ground_truth: String,
}

/// Read `[{question, ground_truth}]` from a JSON file
pub fn load_questions<P: AsRef<Path>>(path: P) -> AzragResult<Vec<TestQuestion>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| AzragError::Evaluation {
        message: format!("Failed to read questions file {}: {}", path.display(), e),
        metric: None,
        context: ErrorContext::new("harness")
            .with_operation("load_questions")
            .with_suggestion("Pass --questions with the path of a JSON file"),
    })?;
    let questions: Vec<TestQuestion> = serde_json::from_str(&content)?;
    info!(count = questions.len(), path = %path.display(), "Loaded questions");
    Ok(questions)
}

/// Where answers under evaluation come from
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, question: &str) -> AzragResult<ChatReply>;

    fn describe(&self) -> String;
}

/// A running chat endpoint reached over HTTP
pub struct HttpChatBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpChatBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, question: &str) -> AzragResult<ChatReply> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&serde_json::json!({ "user_input": question }))
            .send()
            .await
            .map_err(|e| AzragError::Network {
                message: format!("Chat API request failed: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("harness")
                    .with_operation("call_chat_api")
                    .with_metadata("api_url", &self.api_url)
                    .with_suggestion("Start the server with 'azrag-web' or use --in-process"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(AzragError::Service {
                status: status.as_u16(),
                message,
                context: ErrorContext::new("harness").with_operation("call_chat_api"),
            });
        }

        response.json::<ChatReply>().await.map_err(|e| AzragError::Internal {
            message: format!("Chat API returned an unexpected body: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("harness").with_operation("call_chat_api"),
        })
    }

    fn describe(&self) -> String {
        self.api_url.clone()
    }
}

/// The pipeline run in this process, no server needed
pub struct PipelineBackend {
    pipeline: Arc<ChatPipeline>,
}

impl PipelineBackend {
    pub fn new(pipeline: Arc<ChatPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl ChatBackend for PipelineBackend {
    async fn ask(&self, question: &str) -> AzragResult<ChatReply> {
        self.pipeline.respond(question).await
    }

    fn describe(&self) -> String {
        "in-process pipeline".to_string()
    }
}

/// Everything produced for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEvaluation {
    pub question: String,
    pub ground_truth: String,
    pub reply: ChatReply,
    pub evaluations: Vec<EvaluationRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct HarnessOptions {
    /// Wait for Enter between questions
    pub pause: bool,
    /// Print the coloured report to stdout
    pub print_report: bool,
    /// Write all results as JSON here when done
    pub output: Option<PathBuf>,
}

pub struct EvaluationHarness {
    backend: Arc<dyn ChatBackend>,
    evaluator: Evaluator,
    options: HarnessOptions,
}

impl EvaluationHarness {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        evaluator: Evaluator,
        options: HarnessOptions,
    ) -> Self {
        Self {
            backend,
            evaluator,
            options,
        }
    }

    /// Ask and judge one question
    pub async fn evaluate_question(&self, item: &TestQuestion) -> AzragResult<QuestionEvaluation> {
        info!(question = %item.question, backend = %self.backend.describe(), "Evaluating");

        let reply = self.backend.ask(&item.question).await?;
        let evaluations = self
            .evaluator
            .evaluate(&item.question, &item.ground_truth, &reply)
            .await?;

        Ok(QuestionEvaluation {
            question: item.question.clone(),
            ground_truth: item.ground_truth.clone(),
            reply,
            evaluations,
        })
    }

    /// Run every question in order; the first failure stops the run
    pub async fn run(&self, questions: &[TestQuestion]) -> AzragResult<Vec<QuestionEvaluation>> {
        let mut results = Vec::with_capacity(questions.len());

        for (i, item) in questions.iter().enumerate() {
            if self.options.print_report {
                println!(
                    "\n{} {}",
                    console::style("Evaluating:").cyan(),
                    item.question
                );
            }

            let result = match self.evaluate_question(item).await {
                Ok(result) => result,
                Err(e) => {
                    self.save_partial(&results);
                    return Err(e);
                }
            };
            if self.options.print_report {
                print!("{}", report::render_question(&result));
            }
            results.push(result);

            if self.options.pause && i + 1 < questions.len() {
                wait_for_enter().await?;
            }
        }

        if self.options.print_report && !results.is_empty() {
            print!("{}", report::render_overall(&results));
        }

        if let Some(path) = &self.options.output {
            write_results(path, &results)?;
        }

        Ok(results)
    }

    /// Keep what finished before a failure; the failure itself stays the reported error
    fn save_partial(&self, results: &[QuestionEvaluation]) {
        let Some(path) = &self.options.output else {
            return;
        };
        if results.is_empty() {
            return;
        }
        match write_results(path, results) {
            Ok(()) => warn!(
                completed = results.len(),
                path = %path.display(),
                "Run stopped early, partial results written"
            ),
            Err(e) => warn!(error = %e, "Failed to write partial results"),
        }
    }
}

/// Save results as pretty-printed JSON
pub fn write_results(path: &Path, results: &[QuestionEvaluation]) -> AzragResult<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), count = results.len(), "Wrote evaluation results");
    Ok(())
}

async fn wait_for_enter() -> AzragResult<()> {
    println!(
        "\n{}",
        console::style("Press Enter to continue to the next question...").yellow()
    );
    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        warn!("stdin closed, continuing without pausing");
    }
    Ok(())
}
