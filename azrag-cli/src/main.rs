//! Azrag CLI - ask, search, manage the index and evaluate answers from the terminal

use anyhow::{bail, Context, Result};
use azrag_azure::{AzureOpenAiClient, AzureSearchClient};
use azrag_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, AppConfig,
    ChatMessage, EmbeddingModel, LogFormat, LoggingConfig, SearchConfig, SearchProfile,
    SearchRequest,
};
use azrag_eval::{
    load_questions, ChatBackend, EvaluationHarness, EvaluationMode, Evaluator, HarnessOptions,
    HttpChatBackend, Metric, PipelineBackend,
};
use azrag_rag::ChatPipeline;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

const STREAM_SYSTEM_PROMPT: &str = "You are a helpful AI assistant";

#[derive(Parser, Debug)]
#[command(name = "azrag")]
#[command(about = "Retrieval-augmented chat over Azure OpenAI and Azure AI Search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this TOML file instead of the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, default_value = "compact", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question with the full pipeline
    Ask {
        question: String,

        /// Print the reply as JSON, as the /chat endpoint returns it
        #[arg(long)]
        json: bool,
    },

    /// Run one query directly against the index
    Search {
        query: String,

        #[arg(long, value_enum, default_value_t = SearchMode::Hybrid)]
        mode: SearchMode,

        /// TOML search profile (text_fields, vector_fields, select, top, k_nearest_neighbors,
        /// filter); replaces --mode
        #[arg(long, conflicts_with = "mode")]
        profile: Option<PathBuf>,

        /// Number of results
        #[arg(long)]
        top: Option<usize>,

        /// OData filter expression
        #[arg(long)]
        filter: Option<String>,
    },

    /// Manage the search index
    Index {
        #[command(subcommand)]
        action: IndexCommand,
    },

    /// Score answers from the chat endpoint with the rubric evaluator
    Evaluate {
        /// JSON file of {question, ground_truth} items
        #[arg(long)]
        questions: Option<PathBuf>,

        /// Chat endpoint to evaluate
        #[arg(long, conflicts_with = "in_process")]
        api_url: Option<String>,

        /// Run the pipeline in this process instead of calling an endpoint
        #[arg(long)]
        in_process: bool,

        /// Do not wait for Enter between questions
        #[arg(long)]
        no_pause: bool,

        /// Write all results to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Ask the judge for schema-constrained ratings
        #[arg(long)]
        structured: bool,

        /// Also score the "don't know" metric
        #[arg(long)]
        include_dont_know: bool,
    },

    /// Inspect or initialize configuration
    Config {
        /// Print the effective configuration with secrets masked
        #[arg(long)]
        show: bool,

        /// Check the configuration for missing values
        #[arg(long)]
        validate: bool,

        /// Write a configuration file template here
        #[arg(long)]
        init: Option<PathBuf>,
    },

    /// Stream a plain chat completion token by token
    Stream { question: String },
}

#[derive(Subcommand, Debug)]
enum IndexCommand {
    /// Create the index unless it already exists
    Create {
        /// Vector field dimensions
        #[arg(long)]
        dimensions: Option<usize>,
    },

    /// Upload documents from a JSON array, embedding content when no vector is given
    Upload { documents: PathBuf },

    /// Delete documents by key
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearchMode {
    Hybrid,
    Text,
    Vector,
}

/// How a direct query picks its fields
#[derive(Debug)]
enum QuerySelection {
    Mode(SearchMode),
    Profile(SearchProfile),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        format: cli.log_format,
        ..LoggingConfig::with_level(&cli.log_level)
    };
    init_logging(&logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting azrag CLI v{}", env!("CARGO_PKG_VERSION"));

    let path = cli.config.as_deref();
    match cli.command {
        Commands::Ask { question, json } => handle_ask(&load_config(path)?, &question, json).await,
        Commands::Search {
            query,
            mode,
            profile,
            top,
            filter,
        } => {
            let selection = match profile {
                Some(profile) => QuerySelection::Profile(load_profile(&profile)?),
                None => QuerySelection::Mode(mode),
            };
            handle_search(&load_config(path)?, &query, selection, top, filter).await
        }
        Commands::Index { action } => handle_index(&load_config(path)?, action).await,
        Commands::Evaluate {
            questions,
            api_url,
            in_process,
            no_pause,
            output,
            structured,
            include_dont_know,
        } => {
            let options = EvaluateOptions {
                questions,
                api_url,
                in_process,
                pause: !no_pause,
                output,
                structured,
                include_dont_know,
            };
            handle_evaluate(&load_config(path)?, options).await
        }
        Commands::Stream { question } => handle_stream(&load_config(path)?, &question).await,
        Commands::Config {
            show,
            validate,
            init,
        } => handle_config(path, show, validate, init),
    }
}

/// Configuration from `--config`, otherwise from the environment; both are validated
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            AppConfig::from_file(path)?
        }
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

async fn handle_ask(config: &AppConfig, question: &str, json: bool) -> Result<()> {
    log_operation_start!("ask", question = %question);

    let pipeline = ChatPipeline::from_config(config)?;
    let reply = pipeline.respond(question).await.map_err(|e| {
        log_operation_error!("ask", e);
        e
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.response);
        if !reply.context.is_empty() {
            println!("\n{}", style("Sources:").bold());
            for item in &reply.context {
                println!("  - {}", style(&item.filename).cyan());
            }
        }
    }

    log_operation_success!("ask", sources = reply.context.len());
    Ok(())
}

/// Request for one direct query; embeds the query unless the mode is text only
async fn build_search_request(
    embedder: &dyn EmbeddingModel,
    search: &SearchConfig,
    query: &str,
    mode: SearchMode,
    top: usize,
    filter: Option<String>,
) -> Result<SearchRequest> {
    let request = match mode {
        SearchMode::Text => SearchRequest::text(query, top),
        SearchMode::Vector => {
            SearchRequest::vector(embedder.embed(query).await?, &search.vector_field, top)
        }
        SearchMode::Hybrid => SearchRequest::hybrid(
            query,
            embedder.embed(query).await?,
            &search.vector_field,
            top,
        ),
    };

    let request = request.with_select(&[&search.key_field, &search.content_field]);
    Ok(match filter {
        Some(filter) => request.with_filter(filter),
        None => request,
    })
}

fn load_profile(path: &Path) -> Result<SearchProfile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid search profile {}", path.display()))
}

/// Request from a profile; `--top` and `--filter` override it, and only vector fields embed
async fn build_profile_request(
    embedder: &dyn EmbeddingModel,
    query: &str,
    mut profile: SearchProfile,
    top: Option<usize>,
    filter: Option<String>,
) -> Result<SearchRequest> {
    if let Some(top) = top {
        profile.top = top;
    }
    if filter.is_some() {
        profile.filter = filter;
    }

    let vector = if profile.vector_fields.is_empty() {
        None
    } else {
        Some(embedder.embed(query).await?)
    };
    Ok(SearchRequest::from_profile(query, vector, &profile)?)
}

async fn handle_search(
    config: &AppConfig,
    query: &str,
    selection: QuerySelection,
    top: Option<usize>,
    filter: Option<String>,
) -> Result<()> {
    let openai = AzureOpenAiClient::new(config.openai.clone())?;
    let search = AzureSearchClient::new(config.search.clone())?;

    let request = match selection {
        QuerySelection::Mode(mode) => {
            let top = top.unwrap_or(config.rag.top_k);
            build_search_request(&openai, &config.search, query, mode, top, filter).await?
        }
        QuerySelection::Profile(profile) => {
            build_profile_request(&openai, query, profile, top, filter).await?
        }
    };
    let results = search.query(&request).await?;

    if results.is_empty() {
        println!("{}", style("No results").yellow());
    }
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            style(&result.id).cyan().bold(),
            style(format!("(score {:.4})", result.score)).dim()
        );
        println!("   {}", result.content);
    }
    Ok(())
}

async fn handle_index(config: &AppConfig, action: IndexCommand) -> Result<()> {
    let search = AzureSearchClient::new(config.search.clone())?;

    match action {
        IndexCommand::Create { dimensions } => {
            if search.create_index_if_missing(dimensions).await? {
                println!("{} {}", style("Created index").green(), config.search.index);
            } else {
                println!("Index {} already exists", config.search.index);
            }
        }
        IndexCommand::Upload { documents } => {
            let text = std::fs::read_to_string(&documents)
                .with_context(|| format!("Failed to read {}", documents.display()))?;
            let documents = parse_documents(&text)?;

            let openai = AzureOpenAiClient::new(config.openai.clone())?;
            let documents = embed_missing_vectors(&openai, &config.search, documents).await?;
            let results = search.upload_documents(documents).await?;
            print_indexing_results("Uploaded", &results);
        }
        IndexCommand::Delete { ids } => {
            let results = search.delete_documents(&ids).await?;
            print_indexing_results("Deleted", &results);
        }
    }
    Ok(())
}

fn parse_documents(text: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(text).context("Documents file is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("Documents file must contain a JSON array of objects");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(doc) => Ok(doc),
            _ => bail!("Document {} is not a JSON object", i),
        })
        .collect()
}

/// Fill the vector field from the content field wherever it is absent
async fn embed_missing_vectors(
    embedder: &dyn EmbeddingModel,
    search: &SearchConfig,
    mut documents: Vec<Map<String, Value>>,
) -> Result<Vec<Map<String, Value>>> {
    for doc in documents.iter_mut() {
        if doc.contains_key(&search.vector_field) {
            continue;
        }
        let Some(content) = doc.get(&search.content_field).and_then(Value::as_str) else {
            continue;
        };
        let vector = embedder.embed(content).await?;
        doc.insert(search.vector_field.clone(), serde_json::json!(vector));
    }
    Ok(documents)
}

fn print_indexing_results(verb: &str, results: &[azrag_azure::IndexingResult]) {
    let succeeded = results.iter().filter(|r| r.succeeded).count();
    println!(
        "{} {}/{} documents",
        style(verb).green(),
        succeeded,
        results.len()
    );
    for failed in results.iter().filter(|r| !r.succeeded) {
        println!(
            "  {} {}: {}",
            style("failed").red(),
            failed.key,
            failed.error_message.as_deref().unwrap_or("unknown error")
        );
    }
}

struct EvaluateOptions {
    questions: Option<PathBuf>,
    api_url: Option<String>,
    in_process: bool,
    pause: bool,
    output: Option<PathBuf>,
    structured: bool,
    include_dont_know: bool,
}

fn evaluation_metrics(include_dont_know: bool) -> Vec<Metric> {
    if include_dont_know {
        Metric::all().to_vec()
    } else {
        Metric::default_set().to_vec()
    }
}

async fn handle_evaluate(config: &AppConfig, options: EvaluateOptions) -> Result<()> {
    let questions_path = options
        .questions
        .unwrap_or_else(|| PathBuf::from(&config.evaluation.questions_path));
    let questions = load_questions(&questions_path)?;

    let backend: Arc<dyn ChatBackend> = if options.in_process {
        Arc::new(PipelineBackend::new(Arc::new(ChatPipeline::from_config(
            config,
        )?)))
    } else {
        let api_url = options
            .api_url
            .unwrap_or_else(|| config.evaluation.api_url.clone());
        Arc::new(HttpChatBackend::new(api_url))
    };

    let mode = if options.structured || config.evaluation.structured_output {
        EvaluationMode::Structured
    } else {
        EvaluationMode::FreeText
    };

    let judge = Arc::new(AzureOpenAiClient::new(config.openai.clone())?);
    let evaluator = Evaluator::new(judge)
        .with_mode(mode)
        .with_metrics(evaluation_metrics(options.include_dont_know));

    log_operation_start!("evaluate", questions = questions.len(), backend = %backend.describe());

    let harness = EvaluationHarness::new(
        backend,
        evaluator,
        HarnessOptions {
            pause: options.pause,
            print_report: true,
            output: options.output.clone(),
        },
    );
    let results = harness.run(&questions).await.map_err(|e| {
        log_operation_error!("evaluate", e);
        e
    })?;

    if let Some(output) = &options.output {
        println!("\nResults written to {}", output.display());
    }
    log_operation_success!("evaluate", questions = results.len());
    Ok(())
}

async fn handle_stream(config: &AppConfig, question: &str) -> Result<()> {
    let openai = AzureOpenAiClient::new(config.openai.clone())?;
    let messages = vec![
        ChatMessage::system(STREAM_SYSTEM_PROMPT),
        ChatMessage::user(question),
    ];

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(delta) = rx.recv().await {
            print!("{}", delta);
            let _ = stdout.flush();
        }
    });

    let full_response = openai.chat_stream(&messages, tx).await?;
    printer.await?;
    println!("\n");

    info!(chars = full_response.len(), "Streaming completed");
    Ok(())
}

fn handle_config(
    path: Option<&Path>,
    show: bool,
    validate: bool,
    init: Option<PathBuf>,
) -> Result<()> {
    if let Some(target) = init {
        if target.exists() {
            bail!("{} already exists", target.display());
        }
        AppConfig::template().save_to_file(&target)?;
        println!("{} {}", style("Configuration written to").green(), target.display());
        println!("Fill in the endpoints and keys, then pass it with --config.");
    }

    if show || validate {
        let config = match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                println!("{} {}", style("Configuration is invalid:").red(), e);
                return Err(e);
            }
        };

        if validate {
            println!("{}", style("Configuration is valid").green());
        }
        if show {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azrag_core::{async_trait, AzragResult};

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingModel for LengthEmbedder {
        async fn embed(&self, text: &str) -> AzragResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    fn search_config() -> SearchConfig {
        AppConfig::template().search
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["azrag", "ask", "What is my plan?", "--json"]).unwrap();
        match cli.command {
            Commands::Ask { question, json } => {
                assert_eq!(question, "What is my plan?");
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_parse_search_mode() {
        let cli = Cli::try_parse_from([
            "azrag", "search", "dental", "--mode", "vector", "--top", "5", "--log-format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { mode, top, .. } => {
                assert_eq!(mode, SearchMode::Vector);
                assert_eq!(top, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_parse_evaluate_flags() {
        let cli = Cli::try_parse_from([
            "azrag",
            "evaluate",
            "--in-process",
            "--no-pause",
            "--include-dont-know",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                in_process,
                no_pause,
                include_dont_know,
                api_url,
                ..
            } => {
                assert!(in_process && no_pause && include_dont_know);
                assert!(api_url.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from([
            "azrag",
            "evaluate",
            "--in-process",
            "--api-url",
            "http://localhost:5000/chat"
        ])
        .is_err());
    }

    #[test]
    fn test_index_delete_needs_ids() {
        assert!(Cli::try_parse_from(["azrag", "index", "delete"]).is_err());
        let cli = Cli::try_parse_from(["azrag", "index", "delete", "a", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Index {
                action: IndexCommand::Delete { ref ids }
            } if ids == &["a", "b"]
        ));
    }

    #[test]
    fn test_profile_conflicts_with_mode() {
        let cli =
            Cli::try_parse_from(["azrag", "search", "dental", "--profile", "p.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search { profile: Some(_), .. }
        ));

        assert!(Cli::try_parse_from([
            "azrag", "search", "dental", "--profile", "p.toml", "--mode", "text"
        ])
        .is_err());
    }

    #[test]
    fn test_load_profile_fills_defaults() {
        let dir = std::env::temp_dir().join(format!("azrag-profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("profile.toml");
        std::fs::write(
            &path,
            "text_fields = [\"content\", \"title\"]\nselect = [\"id\", \"content\"]\ntop = 5\n",
        )
        .unwrap();

        let profile = load_profile(&path).unwrap();
        assert_eq!(profile.text_fields, vec!["content", "title"]);
        assert!(profile.vector_fields.is_empty());
        assert_eq!(profile.top, 5);
        assert_eq!(profile.k_nearest_neighbors, azrag_core::DEFAULT_TOP_K);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_profile_request() {
        let profile = SearchProfile {
            text_fields: vec!["content".to_string()],
            vector_fields: vec!["contentVector".to_string()],
            select: vec!["id".to_string(), "content".to_string()],
            top: 5,
            k_nearest_neighbors: 10,
            filter: Some("category eq 'benefits'".to_string()),
        };

        let request =
            build_profile_request(&LengthEmbedder, "dental", profile.clone(), Some(2), None)
                .await
                .unwrap();
        assert!(request.is_hybrid());
        assert_eq!(request.top, 2);
        assert_eq!(request.vector_queries[0].vector, vec![6.0, 1.0]);
        assert_eq!(request.vector_queries[0].k_nearest_neighbors, 10);
        assert_eq!(request.filter.as_deref(), Some("category eq 'benefits'"));

        let text_only = SearchProfile {
            vector_fields: Vec::new(),
            ..profile
        };
        let request = build_profile_request(&LengthEmbedder, "dental", text_only, None, None)
            .await
            .unwrap();
        assert!(request.vector_queries.is_empty());
        assert_eq!(request.top, 5);

        assert!(
            build_profile_request(&LengthEmbedder, "dental", SearchProfile::default(), None, None)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_metric_selection() {
        assert!(!evaluation_metrics(false).contains(&Metric::DontKnow));
        assert!(evaluation_metrics(true).contains(&Metric::DontKnow));
    }

    #[test]
    fn test_parse_documents_rejects_non_objects() {
        assert_eq!(parse_documents(r#"[{"id":"a"}]"#).unwrap().len(), 1);
        assert!(parse_documents(r#"{"id":"a"}"#).is_err());
        assert!(parse_documents(r#"[{"id":"a"}, 3]"#).is_err());
    }

    #[tokio::test]
    async fn test_embed_missing_vectors_keeps_existing() {
        let search = search_config();
        let documents = parse_documents(&format!(
            r#"[
                {{"id": "a", "{content}": "four"}},
                {{"id": "b", "{content}": "kept", "{vector}": [9.0]}},
                {{"id": "c"}}
            ]"#,
            content = search.content_field,
            vector = search.vector_field
        ))
        .unwrap();

        let documents = embed_missing_vectors(&LengthEmbedder, &search, documents)
            .await
            .unwrap();

        assert_eq!(documents[0][&search.vector_field], serde_json::json!([4.0, 1.0]));
        assert_eq!(documents[1][&search.vector_field], serde_json::json!([9.0]));
        assert!(!documents[2].contains_key(&search.vector_field));
    }

    #[tokio::test]
    async fn test_text_search_skips_embedding() {
        let search = search_config();
        let request = build_search_request(
            &LengthEmbedder,
            &search,
            "dental",
            SearchMode::Text,
            4,
            Some("category eq 'benefits'".to_string()),
        )
        .await
        .unwrap();

        assert!(request.vector_queries.is_empty());
        assert_eq!(request.top, 4);
        assert_eq!(request.filter.as_deref(), Some("category eq 'benefits'"));

        let request =
            build_search_request(&LengthEmbedder, &search, "dental", SearchMode::Hybrid, 4, None)
                .await
                .unwrap();
        assert!(request.is_hybrid());
    }
}
