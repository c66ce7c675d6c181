use anyhow::Result;
use bi_agent::chart::{chart_spec, compute_kpis};
use bi_agent::execution::table_to_json;
use bi_agent::models::DEFAULT_MODEL_ID;
use bi_agent::report::ReportContext;
use bi_agent::sources::{local_id, DEFAULT_SOURCE_ID};
use bi_agent::{BiAssistant, Session, Settings, SourceRegistry, TurnRecord};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bi-agent")]
#[command(about = "Ask business questions against enterprise data sources")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        question: String,

        #[command(flatten)]
        selection: Selection,

        /// Write the result table as CSV to this path
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Print the turn as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Interactive session; enter a number to ask a suggested follow-up
    Chat {
        #[command(flatten)]
        selection: Selection,
    },
    /// List data sources
    Sources,
    /// List generative models
    Models,
    /// Print the schema used to ground generation for a source
    Schema {
        #[arg(default_value = DEFAULT_SOURCE_ID)]
        source: String,
    },
}

#[derive(clap::Args)]
struct Selection {
    /// Source id, e.g. `salesforce` or `local_salesforce`
    #[arg(short, long)]
    source: Option<String>,

    /// Model id or label
    #[arg(short, long, default_value = DEFAULT_MODEL_ID)]
    model: String,
}

impl Selection {
    /// Validate the source id up front; the pipeline would silently fall back otherwise.
    fn source_id(&self, settings: &Settings) -> Result<String> {
        let id = match &self.source {
            Some(id) => id.clone(),
            // Without credentials the live default can only fail, so start offline.
            None if settings.access_token.is_none() => local_id(DEFAULT_SOURCE_ID),
            None => DEFAULT_SOURCE_ID.to_string(),
        };
        let registry = SourceRegistry::new();
        let source = registry.resolve(&id)?;
        if !source.is_local() && settings.access_token.is_none() {
            let offline = registry.offline_counterpart(&source.id)?;
            warn!("{} needs GCP_ACCESS_TOKEN; `--source {}` works without it", source.id, offline.id);
        }
        Ok(source.id.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Ask { question, selection, csv_out, json } => {
            let source = selection.source_id(&settings)?;
            let assistant = BiAssistant::from_settings(&settings);
            let mut session = Session::new();
            let turn = assistant.submit(&mut session, &question, &selection.model, &source).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&turn_json(&turn)?)?);
            } else {
                print_turn(&turn)?;
            }
            if let Some(path) = csv_out {
                write_csv(&turn, &path)?;
            }
        }
        Command::Chat { selection } => {
            let source = selection.source_id(&settings)?;
            let assistant = BiAssistant::from_settings(&settings);
            chat(&assistant, &source, &selection.model).await?;
        }
        Command::Sources => {
            let registry = SourceRegistry::new();
            println!("Live sources:");
            for source in registry.live_sources() {
                println!("  {:<18} {}  {}", source.id, source.display_label(), source.description);
            }
            println!("\nLocal sources (bundled data, no credentials needed):");
            for source in registry.local_sources() {
                println!("  {:<18} {}  {}", source.id, source.display_label(), source.description);
            }
        }
        Command::Models => {
            for model in bi_agent::models::ModelRegistry::new().all() {
                let marker = if model.id == DEFAULT_MODEL_ID { "*" } else { " " };
                println!("{} {:<22} {}  {}", marker, model.id, model.label, model.description);
            }
        }
        Command::Schema { source } => {
            let descriptor = SourceRegistry::new().resolve(&source)?;
            let schemas = bi_agent::schema::SchemaProvider::from_settings(&settings);
            println!("{}", schemas.describe(descriptor.base_id()));
        }
    }

    Ok(())
}

async fn chat(assistant: &BiAssistant, source: &str, model: &str) -> Result<()> {
    let mut session = Session::new();
    info!("Chat session {} on {}", session.id(), source);
    println!("Ask a question (`clear` resets the conversation, `quit` exits).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        let question = match input {
            "" => continue,
            "quit" | "exit" => break,
            "clear" => {
                session.clear();
                println!("Conversation cleared.");
                continue;
            }
            _ => match input.parse::<usize>() {
                Ok(n) if n >= 1 && n <= session.followups().len() => session.followups()[n - 1].clone(),
                _ => input.to_string(),
            },
        };

        let turn = assistant.submit(&mut session, &question, model, source).await;
        print_turn(&turn)?;
    }
    Ok(())
}

fn print_turn(turn: &TurnRecord) -> Result<()> {
    println!(
        "\n🤖 {} ({}, {} in {}ms)",
        turn.provenance.source_label,
        turn.provenance.model_label(),
        turn.engine,
        turn.execution_time_ms
    );
    println!("{}", turn.agent_text());
    println!("\nSQL:\n{}", turn.plan.sql);

    if let Some(df) = turn.table() {
        println!("\n{}", df);
        if let Some(spec) = chart_spec(&turn.plan, df) {
            println!("Chart: {} of {} by {}", spec.chart_type, spec.y, spec.x);
        }
        let kpis = compute_kpis(df)?;
        let line: Vec<String> = kpis.iter().map(|k| format!("{}: {}", k.label, k.value)).collect();
        println!("{}", line.join("  |  "));
    }

    if !turn.plan.followups.is_empty() {
        println!("\nFollow-ups:");
        for (i, q) in turn.plan.followups.iter().enumerate() {
            println!("  {}. {}", i + 1, q);
        }
    }
    Ok(())
}

fn turn_json(turn: &TurnRecord) -> Result<serde_json::Value> {
    let (rows, chart, kpis) = match turn.table() {
        Some(df) => (
            table_to_json(df)?,
            serde_json::to_value(chart_spec(&turn.plan, df))?,
            serde_json::to_value(compute_kpis(df)?)?,
        ),
        None => (serde_json::Value::Null, serde_json::Value::Null, serde_json::json!([])),
    };
    Ok(serde_json::json!({
        "question": turn.question,
        "plan": turn.plan,
        "provenance": turn.provenance,
        "rows": rows,
        "chart": chart,
        "kpis": kpis,
        "engine": turn.engine,
        "execution_time_ms": turn.execution_time_ms,
        "execution_error": turn.execution_error.as_ref().map(|e| e.to_string()),
        "timestamp": turn.timestamp.to_rfc3339(),
    }))
}

fn write_csv(turn: &TurnRecord, path: &Path) -> Result<()> {
    let report = ReportContext::from_turn(turn);
    if report.table.is_none() {
        anyhow::bail!("No table to export for this turn");
    }
    let target = if path.is_dir() { path.join(report.data_file_name()) } else { path.to_path_buf() };
    std::fs::write(&target, report.to_csv()?)?;
    info!("Wrote {}", target.display());
    Ok(())
}
