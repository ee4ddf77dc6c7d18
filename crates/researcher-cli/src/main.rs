//! Researcher - CLI front end.
//!
//! Thin I/O loop over the research pipeline: single-query or interactive,
//! full pipeline by default, `--quick` for researcher-only, `--stream` to
//! watch the agent work. All logic lives in the `researcher` library.

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use researcher::{
    ChatMessage, LogLookupTool, OllamaClient, ResearchLog, ResearchPipeline, Role, RunConfig,
    SearchNewsTool, SearchWebTool, ToolRegistry,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "researcher")]
#[command(about = "Agentic web research with cited answers", long_about = None)]
struct Cli {
    /// Research query (leave empty for interactive mode)
    query: Vec<String>,

    /// Ollama model name (default: llama3.2 or OLLAMA_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature 0-1
    #[arg(short, long, default_value_t = 0.2)]
    temperature: f64,

    /// Ollama API base URL (for remote Ollama)
    #[arg(long)]
    base_url: Option<String>,

    /// Skip fact-check and formatter (researcher only, faster)
    #[arg(short, long)]
    quick: bool,

    /// Stream the research process (agent steps and final answer);
    /// researcher only, no fact-check pipeline
    #[arg(short, long)]
    stream: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::from_env();
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    config.temperature = cli.temperature;

    let pipeline = build_pipeline(&config);

    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        interactive(&pipeline, &cli).await
    } else {
        run_query(&pipeline, &cli, &query).await
    }
}

fn build_pipeline(config: &RunConfig) -> ResearchPipeline {
    let llm = Arc::new(OllamaClient::from_config(config));
    let log = Arc::new(ResearchLog::file(&config.log_path));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(LogLookupTool::new(log.clone())));
    registry.register(Arc::new(SearchWebTool::new()));
    registry.register(Arc::new(SearchNewsTool::new()));

    ResearchPipeline::new(llm, Arc::new(registry), log)
}

async fn interactive(pipeline: &ResearchPipeline, cli: &Cli) -> Result<()> {
    println!("Researcher - type your query and press Enter. Type 'quit' or 'exit' to stop.\n");
    if !cli.quick && !cli.stream {
        println!("Mode: researcher -> fact-check -> formatter (full pipeline). Use -q for quick, -s to stream.\n");
    }

    let stdin = io::stdin();
    loop {
        print!("Query: ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        run_query(pipeline, cli, query).await?;
        println!("{}", "-".repeat(50));
    }
    Ok(())
}

async fn run_query(pipeline: &ResearchPipeline, cli: &Cli, query: &str) -> Result<()> {
    if cli.stream {
        return stream_query(pipeline, query).await;
    }

    if cli.quick {
        println!("\nResearching...\n");
    } else {
        println!("\nResearching, fact-checking, formatting...\n");
    }

    let result = if cli.quick {
        pipeline.quick(query).await
    } else {
        pipeline.research(query).await
    };

    match result {
        Ok(answer) => {
            println!("Answer:\n");
            println!("{}", make_links_clickable(&answer));
        }
        Err(e) => {
            eprintln!("{} {:#}", "Research failed:".red().bold(), e);
        }
    }
    Ok(())
}

/// Stream mode: show agent steps as they happen. Direct mode logs here in
/// the front end, since the pipeline never sees the final answer.
async fn stream_query(pipeline: &ResearchPipeline, query: &str) -> Result<()> {
    println!("\nResearching...\n");

    let started = Instant::now();
    let mut last_answer: Option<String> = None;

    let mut updates = pipeline.stream(query);
    while let Some(message) = updates.next().await {
        render_update(&message, &mut last_answer);
    }

    let elapsed = started.elapsed().as_secs_f64();
    if let Some(answer) = last_answer {
        if let Err(e) = pipeline.log().append(query, &answer, elapsed, None) {
            eprintln!("{} {:#}", "(log skipped)".dimmed(), e);
        }
    }
    Ok(())
}

fn render_update(message: &ChatMessage, last_answer: &mut Option<String>) {
    if !message.tool_calls.is_empty() {
        let names: Vec<&str> = message.tool_calls.iter().map(|tc| tc.name.as_str()).collect();
        println!("{}\n", format!("[Tool calls: {}]", names.join(", ")).dimmed());
        return;
    }
    match message.role {
        Role::Assistant if message.has_content() => {
            *last_answer = Some(message.content.clone());
            println!("{}\n", make_links_clickable(&message.content));
        }
        Role::Tool => {
            // Tool output is model fodder, not user output; show a summary.
            let first_line = message.content.lines().next().unwrap_or("");
            println!("{}\n", format!("  -> {}", first_line).dimmed());
        }
        _ => {}
    }
}

/// Convert markdown links `[text](url)` to OSC 8 terminal hyperlinks.
fn make_links_clickable(text: &str) -> String {
    let pattern = regex::Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("static pattern");
    pattern
        .replace_all(text, "\x1b]8;;$2\x1b\\[$1]\x1b]8;;\x1b\\")
        .into_owned()
}
