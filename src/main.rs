use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gamerec::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Find games similar to a reference game
#[derive(Parser, Debug)]
#[command(name = "gamerec")]
#[command(about = "Similar-game recommendations from a catalog snapshot", long_about = None)]
struct Cli {
    /// Catalog snapshot (JSON)
    #[arg(long, default_value = "./catalog.json")]
    catalog: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vector index: flat or hnsw
    #[arg(long, default_value = "hnsw")]
    index: IndexKind,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank similar games for one or more reference ids
    Rank(RankArgs),
    /// List the rarest values of a facet
    Rarity {
        #[arg(long)]
        facet: FacetKind,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Reference item id (repeatable)
    #[arg(long = "id", required = true)]
    ids: Vec<ItemId>,

    #[arg(long, default_value_t = 10)]
    top_k: usize,

    #[arg(long)]
    include_self: bool,

    /// Attach overlap explanations
    #[arg(long)]
    explain: bool,

    /// Boost facets whose shared values are rare
    #[arg(long)]
    rarity: bool,

    /// Relax the request step by step until something matches
    #[arg(long)]
    fallback: bool,

    /// Comma-separated allow-list of ids
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<ItemId>>,

    /// Constraint document, e.g. '{"players": {"exact": 4}}'
    #[arg(long)]
    constraints: Option<String>,

    /// Required values, e.g. '{"categories": ["Fantasy"]}'
    #[arg(long)]
    require: Option<String>,

    /// Excluded values, same shape as --require
    #[arg(long)]
    exclude: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RankResult {
    Ranked(RankOutcome),
    Failed { reference: ItemId, error: String },
}

#[derive(Serialize)]
struct RareValue {
    value: String,
    weight: f64,
}

impl RankArgs {
    fn request(&self, reference: ItemId) -> anyhow::Result<RankRequest> {
        let mut request = RankRequest::new(reference)
            .top_k(self.top_k)
            .include_self(self.include_self)
            .explain(self.explain)
            .use_rarity(self.rarity);
        if let Some(allow) = &self.allow {
            request = request.allowed(allow.iter().copied());
        }
        if let Some(json) = &self.constraints {
            request = request.constraints(ConstraintSpec::from_json(json)?);
        }
        if let Some(json) = &self.require {
            request = request.required(parse_filter(json).context("invalid --require")?);
        }
        if let Some(json) = &self.exclude {
            request = request.excluded(parse_filter(json).context("invalid --exclude")?);
        }
        request.validate()?;
        Ok(request)
    }
}

fn parse_filter(json: &str) -> anyhow::Result<FeatureValueFilter> {
    Ok(serde_json::from_str(json)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting gamerec v{}", env!("CARGO_PKG_VERSION"));
    info!("Catalog: {:?}", cli.catalog);

    let ranker = gamerec::open(&cli.catalog, cli.config.as_deref(), cli.index)
        .with_context(|| format!("failed to open catalog {}", cli.catalog.display()))?;
    let ranker = Arc::new(ranker);

    match cli.command {
        Command::Rank(args) => {
            let mut handles = Vec::with_capacity(args.ids.len());
            for &reference in &args.ids {
                let request = args.request(reference)?;
                let ranker = ranker.clone();
                let fallback = args.fallback;
                handles.push(tokio::task::spawn_blocking(move || {
                    let outcome = if fallback {
                        ranker.rank_with_fallback(&request)
                    } else {
                        ranker.rank(&request)
                    };
                    match outcome {
                        Ok(outcome) => RankResult::Ranked(outcome),
                        Err(e) => RankResult::Failed {
                            reference,
                            error: e.to_string(),
                        },
                    }
                }));
            }

            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                results.push(handle.await.context("ranking task panicked")?);
            }
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Rarity { facet, limit } => {
            let table = tokio::task::spawn_blocking({
                let ranker = ranker.clone();
                move || ranker.rarity_table()
            })
            .await
            .context("rarity task panicked")??;

            let values: Vec<RareValue> = table
                .rarest(facet, limit)
                .into_iter()
                .map(|(value, weight)| RareValue { value, weight })
                .collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
    }

    Ok(())
}
