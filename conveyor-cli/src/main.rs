//! Command-line entry point for the conveyor pipeline.

mod generate;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use conveyor::analyzer::{ClaudeAnalyzer, ErrorAnalyzer, NoOpAnalyzer, RuleBasedAnalyzer};
use conveyor::core::QueryParams;
use conveyor::observability::TracingObserver;
use conveyor::pipeline::{Pipeline, PipelineConfig};
use conveyor::sinks::{JsonlSink, MemorySink, RecordShape, Sink, WriteMode};
use conveyor::sources::{
    CsvSource, ElasticsearchAuth, ElasticsearchConfig, ElasticsearchSource, JsonlSource, Source,
};

#[derive(Debug, Parser)]
#[command(name = "conveyor", version, about = "Move records from a source to a sink")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a pipeline from a source into a sink.
    Run(RunArgs),
    /// Generate synthetic test data.
    Generate(generate::GenerateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Jsonl,
    Csv,
    Elasticsearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    Jsonl,
    Memory,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Type of data source.
    #[arg(long, value_enum)]
    source: SourceKind,

    /// Type of data sink.
    #[arg(long, value_enum)]
    sink: SinkKind,

    /// Input file path (jsonl and csv sources).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Field (jsonl) or column (csv) holding the record id.
    #[arg(long, default_value = "id")]
    id_field: String,

    /// Field (jsonl) or column (csv) holding the record content.
    #[arg(long, default_value = "content")]
    content_field: String,

    /// Elasticsearch search URL (e.g. http://host:9200/index/_search).
    #[arg(long)]
    es_url: Option<String>,

    /// Elasticsearch username (basic auth).
    #[arg(long)]
    es_user: Option<String>,

    /// Elasticsearch password (basic auth).
    #[arg(long)]
    es_pass: Option<String>,

    /// Elasticsearch API key.
    #[arg(long, env = "ES_API_KEY")]
    api_key: Option<String>,

    /// Scroll batch size.
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Output file path (jsonl sink).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Append to the output file instead of overwriting it.
    #[arg(long)]
    append: bool,

    /// Merge record ids into object payloads instead of nesting content.
    #[arg(long)]
    flat: bool,

    /// Select every record, ignoring time bounds.
    #[arg(long)]
    match_all: bool,

    /// Inclusive lower time bound for the source query.
    #[arg(long)]
    gte: Option<String>,

    /// Inclusive upper time bound for the source query.
    #[arg(long)]
    lte: Option<String>,

    /// Stop after this many records.
    #[arg(long)]
    limit: Option<u64>,

    /// Number of worker threads (1 = inline execution).
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Bounded work-queue capacity for parallel execution.
    #[arg(long, default_value_t = 1024)]
    queue_capacity: usize,

    /// Pipeline identifier carried in logs.
    #[arg(long, default_value = "default")]
    pipeline_id: String,

    /// Enable AI-powered error analysis (requires ANTHROPIC_API_KEY).
    #[arg(long, conflicts_with = "simple_errors")]
    ai_errors: bool,

    /// Enable rule-based error suggestions (no API required).
    #[arg(long)]
    simple_errors: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_source(args: &RunArgs) -> anyhow::Result<Box<dyn Source>> {
    match args.source {
        SourceKind::Jsonl => {
            let input = args
                .input
                .as_ref()
                .context("--input is required for the jsonl source")?;
            Ok(Box::new(JsonlSource::with_fields(
                input,
                &args.id_field,
                &args.content_field,
            )))
        }
        SourceKind::Csv => {
            let input = args
                .input
                .as_ref()
                .context("--input is required for the csv source")?;
            Ok(Box::new(CsvSource::with_columns(
                input,
                &args.id_field,
                &args.content_field,
            )))
        }
        SourceKind::Elasticsearch => {
            let url = args
                .es_url
                .as_ref()
                .context("--es-url is required for the elasticsearch source")?;
            let auth = match (&args.api_key, &args.es_user, &args.es_pass) {
                (Some(key), _, _) => ElasticsearchAuth::ApiKey(key.clone()),
                (None, Some(user), Some(pass)) => ElasticsearchAuth::Basic {
                    user: user.clone(),
                    password: pass.clone(),
                },
                _ => bail!("elasticsearch needs --api-key or both --es-user and --es-pass"),
            };
            let config = ElasticsearchConfig::new(url, auth).with_batch_size(args.batch_size);
            Ok(Box::new(ElasticsearchSource::new(config)))
        }
    }
}

fn build_sink(args: &RunArgs) -> anyhow::Result<Arc<dyn Sink>> {
    match args.sink {
        SinkKind::Jsonl => {
            let output = args
                .output
                .as_ref()
                .context("--output is required for the jsonl sink")?;
            let mode = if args.append {
                WriteMode::Append
            } else {
                WriteMode::Overwrite
            };
            let shape = if args.flat {
                RecordShape::Flat
            } else {
                RecordShape::Wrapped
            };
            let sink = JsonlSink::with_options(output, mode, shape)
                .with_context(|| format!("opening {}", output.display()))?;
            Ok(Arc::new(sink))
        }
        SinkKind::Memory => Ok(Arc::new(MemorySink::new())),
    }
}

fn build_analyzer(args: &RunArgs) -> Arc<dyn ErrorAnalyzer> {
    if args.ai_errors {
        Arc::new(ClaudeAnalyzer::from_env())
    } else if args.simple_errors {
        Arc::new(RuleBasedAnalyzer::new())
    } else {
        Arc::new(NoOpAnalyzer)
    }
}

fn build_query_params(args: &RunArgs) -> Option<QueryParams> {
    if !args.match_all && args.gte.is_none() && args.lte.is_none() && args.limit.is_none() {
        return None;
    }

    let mut params = QueryParams::new();
    if args.match_all {
        params = params.with_match_all();
    }
    if let Some(gte) = &args.gte {
        params = params.with_gte(gte);
    }
    if let Some(lte) = &args.lte {
        params = params.with_lte(lte);
    }
    if let Some(limit) = args.limit {
        params = params.with_limit(limit);
    }
    Some(params)
}

fn run_pipeline(args: &RunArgs) -> anyhow::Result<()> {
    let source = build_source(args)?;
    let sink = build_sink(args)?;
    let analyzer = build_analyzer(args);
    let params = build_query_params(args);

    let config = PipelineConfig::new()
        .with_workers(args.workers)
        .with_queue_capacity(args.queue_capacity)
        .with_pipeline_id(&args.pipeline_id);

    let mut pipeline = Pipeline::new(source, sink, config)
        .with_analyzer(analyzer)
        .with_observer(Arc::new(TracingObserver));

    let started_at = chrono::Utc::now();
    let clock = Instant::now();
    let stats = pipeline.run(params.as_ref()).context("pipeline run failed")?;
    pipeline.cleanup().context("pipeline cleanup failed")?;

    info!("pipeline summary");
    println!("------------------------------------------------------------");
    println!("PIPELINE SUMMARY");
    println!("started:  {}", started_at.to_rfc3339());
    println!("source:   {:?}", args.source);
    println!("sink:     {:?}", args.sink);
    println!("inserted: {}", stats.inserted);
    println!("skipped:  {}", stats.skipped);
    println!("errors:   {}", stats.errors);
    println!("elapsed:  {:.2?}", clock.elapsed());
    println!("------------------------------------------------------------");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_pipeline(&args),
        Command::Generate(args) => generate::run(&args),
    }
}
