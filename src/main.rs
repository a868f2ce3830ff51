use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tokenfit::chunker::DEFAULT_PAYLOAD_CEILING;
use tokenfit::{
    ChunkStats, ContextAssembler, ContextConfig, DEFAULT_EMBEDDING_MODEL, HeuristicCounter,
    MergeConfig, Message, PropertyListing, Record, SearchAnalytics, SearchMatch, Segmenter,
    SegmenterConfig, StrategyKind, TiktokenCounter, TokenCounter, VariationRun, WindowConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "tokenfit",
    about = "Fit records, chat history and retrieved passages into token budgets"
)]
struct Cli {
    /// Model or encoding whose tokenizer does the counting
    #[arg(long, global = true, default_value = DEFAULT_EMBEDDING_MODEL)]
    model: String,

    /// Estimate tokens as bytes / 4 instead of loading a tokenizer
    #[arg(long, global = true, default_value_t = false)]
    heuristic: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a record (or array of records) into upload-ready chunks
    Segment(SegmentArgs),
    /// Prune a message history to a token budget
    Optimize(OptimizeArgs),
    /// Deduplicate query variations and assign per-variation thresholds
    Plan(PlanArgs),
    /// Merge search results from several query variations
    Merge(MergeArgs),
    /// Build the prompt context for one question
    Assemble(AssembleArgs),
    /// Count tokens in raw text
    Count(InputArg),
}

#[derive(Args, Debug)]
struct InputArg {
    /// Input file; stdin when omitted or "-"
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SegmentArgs {
    #[command(flatten)]
    input: InputArg,

    #[arg(long, default_value_t = tokenfit::DEFAULT_MAX_TOKENS)]
    max_tokens: usize,

    /// Tokens reserved for JSON structure and position keys
    #[arg(long, default_value_t = tokenfit::chunker::DEFAULT_OVERHEAD)]
    overhead: usize,

    #[arg(long, value_enum, default_value_t = Strategy::Greedy)]
    strategy: Strategy,

    /// Prefix for generated upload ids
    #[arg(long, default_value = "property")]
    id_prefix: String,

    /// Payload size limit of the vector store, in bytes
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_CEILING)]
    byte_ceiling: usize,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    #[command(flatten)]
    input: InputArg,

    #[arg(long, default_value_t = tokenfit::window::DEFAULT_HISTORY_TOKENS)]
    max_tokens: usize,

    /// Tokens already taken by the system prompt and context
    #[arg(long, default_value_t = 0)]
    reserved_overhead: usize,
}

#[derive(Args, Debug)]
struct MergeArgs {
    #[command(flatten)]
    input: InputArg,

    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f32,

    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_PENALTY_PER_VARIATION)]
    penalty: f32,

    /// Query variations searched per question, original included
    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_MAX_VARIATIONS)]
    max_variations: usize,

    /// Include score and category analytics in the output
    #[arg(long, default_value_t = false)]
    analytics: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArg,

    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f32,

    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_MAX_VARIATIONS)]
    max_variations: usize,
}

#[derive(Args, Debug)]
struct AssembleArgs {
    #[command(flatten)]
    input: InputArg,

    #[arg(long, default_value_t = tokenfit::window::DEFAULT_HISTORY_TOKENS)]
    max_tokens: usize,

    /// Budget for retrieved passages
    #[arg(long, default_value_t = tokenfit::context::DEFAULT_CONTEXT_TOKENS)]
    context_tokens: usize,

    #[arg(long, default_value_t = tokenfit::context::DEFAULT_TOP_K)]
    top_k: usize,

    #[arg(long, default_value_t = tokenfit::retrieval::DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Strategy {
    Greedy,
    Halving,
    RecursiveHalving,
}

impl From<Strategy> for StrategyKind {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Greedy => StrategyKind::Greedy,
            Strategy::Halving => StrategyKind::Halving,
            Strategy::RecursiveHalving => StrategyKind::RecursiveHalving,
        }
    }
}

/// Listings are accepted as-is; anything else must be a generic record
#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentInput {
    Listing(PropertyListing),
    Record(Record),
    Many(Vec<SegmentInput>),
}

impl SegmentInput {
    fn into_records(self, out: &mut Vec<Record>) {
        match self {
            SegmentInput::Listing(listing) => out.push(listing.into()),
            SegmentInput::Record(record) => out.push(record),
            SegmentInput::Many(items) => {
                for item in items {
                    item.into_records(out);
                }
            }
        }
    }
}

/// Either one run per query variation or an already tagged flat list
#[derive(Deserialize)]
#[serde(untagged)]
enum MergeInput {
    Runs(Vec<VariationRun>),
    Matches(Vec<SearchMatch>),
}

#[derive(Serialize)]
struct UploadChunk<'a> {
    id: String,
    fingerprint: String,
    metadata: &'a serde_json::Map<String, serde_json::Value>,
    token_count: usize,
    over_budget: bool,
}

#[derive(Deserialize)]
struct AssembleInput {
    #[serde(default)]
    system_prompt: String,
    query: String,
    #[serde(default)]
    history: Vec<Message>,
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tokenfit=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let counter = load_counter(&cli)?;

    match cli.command {
        Command::Segment(args) => run_segment(args, counter.as_ref()),
        Command::Optimize(args) => run_optimize(args, counter.as_ref()),
        Command::Plan(args) => run_plan(args),
        Command::Merge(args) => run_merge(args),
        Command::Assemble(args) => run_assemble(args, counter.as_ref()),
        Command::Count(input) => {
            let text = read_input(&input)?;
            print_json(&serde_json::json!({
                "tokenizer": if cli.heuristic { "heuristic" } else { cli.model.as_str() },
                "tokens": counter.count(&text),
                "bytes": text.len(),
            }))
        }
    }
}

fn load_counter(cli: &Cli) -> Result<Box<dyn TokenCounter>> {
    if cli.heuristic {
        return Ok(Box::new(HeuristicCounter));
    }
    let counter = TiktokenCounter::for_model(&cli.model)
        .with_context(|| format!("failed to load tokenizer for {}", cli.model))?;
    tracing::debug!(tokenizer = counter.name(), "tokenizer loaded");
    Ok(Box::new(counter))
}

fn run_segment(args: SegmentArgs, counter: &dyn TokenCounter) -> Result<()> {
    let raw = read_input(&args.input)?;
    let input: SegmentInput =
        serde_json::from_str(&raw).context("input is not a record, listing or array of them")?;
    let mut records = Vec::new();
    input.into_records(&mut records);

    let config = SegmenterConfig {
        max_tokens: args.max_tokens,
        overhead: args.overhead,
        strategy: args.strategy.into(),
        ..SegmenterConfig::default()
    };
    let segmenter = Segmenter::with_config(counter, config);
    let now = Utc::now();

    let mut output = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let chunks = segmenter
            .segment(record)
            .with_context(|| format!("failed to segment record {i}"))?;
        let stats = ChunkStats::from_chunks(&chunks, args.byte_ceiling);
        if !stats.all_within_limits() {
            tracing::warn!(
                record = i,
                over_budget = stats.over_budget,
                over_ceiling = stats.over_ceiling.len(),
                "record has chunks over limits"
            );
        }

        let uploads: Vec<UploadChunk> = chunks
            .iter()
            .map(|chunk| UploadChunk {
                id: chunk.upload_id(&args.id_prefix, i, now),
                fingerprint: chunk.fingerprint(),
                metadata: chunk.upload_metadata(),
                token_count: chunk.metadata.token_count,
                over_budget: chunk.metadata.over_budget,
            })
            .collect();

        output.push(serde_json::json!({ "chunks": uploads, "stats": stats }));
    }

    tracing::info!(records = records.len(), "segmentation complete");
    print_json(&output)
}

fn run_optimize(args: OptimizeArgs, counter: &dyn TokenCounter) -> Result<()> {
    let raw = read_input(&args.input)?;
    let messages: Vec<Message> =
        serde_json::from_str(&raw).context("input is not an array of messages")?;

    let config = WindowConfig {
        max_tokens: args.max_tokens,
        reserved_overhead: args.reserved_overhead,
    };
    let kept = config.optimize(&messages, counter);

    tracing::info!(
        before = messages.len(),
        after = kept.len(),
        budget = config.budget(),
        "history optimized"
    );
    print_json(&kept)
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let raw = read_input(&args.input)?;
    let variations: Vec<String> = serde_json::from_str(&raw)
        .context("input is not an array of queries, original query first")?;

    let config = MergeConfig {
        similarity_threshold: args.threshold,
        max_variations: args.max_variations,
        ..MergeConfig::default()
    };
    print_json(&config.plan(variations))
}

fn run_merge(args: MergeArgs) -> Result<()> {
    let raw = read_input(&args.input)?;
    let input: MergeInput = serde_json::from_str(&raw)
        .context("input is not an array of search matches or variation runs")?;

    let config = MergeConfig {
        similarity_threshold: args.threshold,
        penalty_per_variation: args.penalty,
        max_variations: args.max_variations,
        ..MergeConfig::default()
    };
    let merged = match input {
        MergeInput::Runs(runs) => config.merge_runs(runs),
        MergeInput::Matches(matches) => config.merge(matches),
    };

    if args.analytics {
        let analytics = SearchAnalytics::from_matches(&merged);
        print_json(&serde_json::json!({ "matches": merged, "analytics": analytics }))
    } else {
        print_json(&merged)
    }
}

fn run_assemble(args: AssembleArgs, counter: &dyn TokenCounter) -> Result<()> {
    let raw = read_input(&args.input)?;
    let input: AssembleInput =
        serde_json::from_str(&raw).context("input is not an assemble request")?;

    let config = ContextConfig {
        max_tokens: args.max_tokens,
        context_tokens: args.context_tokens,
        top_k: args.top_k,
        similarity_threshold: args.threshold,
    };
    let assembled = ContextAssembler::with_config(counter, config).assemble(
        &input.system_prompt,
        &input.query,
        &input.history,
        &input.matches,
    );

    tracing::info!(total_tokens = assembled.usage.total, "context assembled");
    print_json(&assembled)
}

fn read_input(arg: &InputArg) -> Result<String> {
    match arg.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}
