use anyhow::Context;
use clap::{Parser, Subcommand};
use lodestone_indexer::config::Settings;
use lodestone_indexer::github::session::GithubSession;
use lodestone_indexer::index::{engine::IndexingEngine, store::IndexStore};
use lodestone_indexer::search::engine::SearchEngine;
use std::path::PathBuf;
use std::process;

/// Index GitHub repositories locally and search them by keyword.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory containing the .lodestone.db database file
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Optional TOML settings file overriding indexer/search defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GitHub API token (falls back to the GITHUB_TOKEN environment variable)
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl, fetch, and index one repository
    Index {
        /// Repository owner (user or organization)
        owner: String,
        /// Repository name
        name: String,
        /// Branch to index (defaults to the repository's default branch)
        #[arg(long)]
        branch: Option<String>,
    },
    /// List indexed repositories
    List {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Delete an indexed repository and all of its files
    Delete {
        /// Repository id as shown by `list`
        repository_id: i64,
    },
    /// Search indexed files by keyword
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Restrict to one repository ("owner/name" or bare name)
        #[arg(long)]
        repo: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show store statistics
    Status,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match args.command {
        Commands::Index {
            owner,
            name,
            branch,
        } => {
            let token = args
                .token
                .or_else(|| std::env::var("GITHUB_TOKEN").ok())
                .context("a GitHub token is required: pass --token or set GITHUB_TOKEN")?;

            let config = settings.indexer;
            let session =
                GithubSession::authenticate(reqwest::Client::new(), &config.api_base, &token)
                    .await?;
            println!("Authenticated as {}", session.identity().login);

            let store = IndexStore::open(&args.base_dir).await?;
            let engine = IndexingEngine::new(store, config);
            let outcome = engine
                .index_repository(&session, &owner, &name, branch.as_deref())
                .await?;

            println!(
                "Indexed {owner}/{name}: {} files ({} skipped, {} failed), repository id {}",
                outcome.files_indexed,
                outcome.files_skipped,
                outcome.files_failed,
                outcome.repository_id
            );
            Ok(())
        }
        Commands::List { format } => {
            let store = IndexStore::open(&args.base_dir).await?;
            let repositories = store.list_repositories().await?;

            match format {
                OutputFormat::Json => {
                    let rows = repositories
                        .iter()
                        .map(|repo| {
                            let mut row = serde_json::to_value(repo)?;
                            row["url"] = serde_json::Value::String(repo.url());
                            Ok(row)
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                OutputFormat::Summary => {
                    println!("Indexed repositories: {}", repositories.len());
                    for repo in repositories {
                        println!(
                            "  [{}] {}/{}@{} | {} files | indexed {} | {}",
                            repo.id,
                            repo.owner,
                            repo.name,
                            repo.branch,
                            repo.file_count,
                            repo.indexed_at.format("%Y-%m-%d %H:%M"),
                            repo.url()
                        );
                        if let Some(description) = &repo.description {
                            println!("      {description}");
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Delete { repository_id } => {
            let store = IndexStore::open(&args.base_dir).await?;
            match store.get_repository(repository_id).await? {
                Some(repo) => {
                    store.delete_repository(repository_id).await?;
                    println!(
                        "Deleted {}/{}@{} and its files",
                        repo.owner, repo.name, repo.branch
                    );
                }
                None => println!("No repository with id {repository_id}"),
            }
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            repo,
            format,
        } => {
            let store = IndexStore::open(&args.base_dir).await?;
            let engine = SearchEngine::new(store, settings.search);
            let results = engine.search(&query, limit, repo.as_deref()).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} results:", results.len());
                    for result in results {
                        println!(
                            "  {:.1} | {} | {} | {}",
                            result.score, result.repository, result.file_path, result.url
                        );
                        for line in result.excerpt.lines().take(3) {
                            println!("      {line}");
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Status => {
            let store = IndexStore::open(&args.base_dir).await?;
            let stats = store.stats().await?;
            println!("Index status");
            println!("  Repositories: {}", stats.repositories);
            println!("  Files: {}", stats.files);
            println!(
                "  Stored content: {:.2} MB",
                stats.content_bytes as f64 / 1_048_576.0
            );
            Ok(())
        }
    }
}
