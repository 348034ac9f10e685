use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use synapse::config::{ConfigError, DEFAULT_CONFIG_FILE, Settings, SourceDescriptor};
use synapse::note::{note_content, note_path, wiki_link};
use synapse::ris::{DEFAULT_OUTPUT_FILE, import_file};
use synapse::session::Session;
use synapse::trigger::{extract_query, replace_trigger};
use synapse::{Item, QueryResult};
use tracing::info;

/// Search bibliographic metadata collections with fuzzy AND/OR queries.
#[derive(Parser)]
#[command(name = "synapse", version, about)]
struct Cli {
    /// Settings file (JSON). Created on first write.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the active sources and run a query. No query lists everything.
    Search {
        query: Option<String>,

        #[command(flatten)]
        sources: SourceArgs,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage registered metadata sources.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Convert a RIS export into a collection file and register it.
    ImportRis {
        file: PathBuf,

        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        out: PathBuf,
    },

    /// Render the note for one search hit.
    Note {
        query: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// 1-based hit number, counted across collections.
        #[arg(long, default_value_t = 1)]
        pick: usize,

        /// Write the note under this directory unless it already exists.
        #[arg(long)]
        vault: Option<PathBuf>,
    },

    /// Extract the query typed after `@@`, or replace the trigger with a link.
    Trigger {
        line: String,

        #[arg(long)]
        link: Option<String>,
    },
}

#[derive(Subcommand)]
enum SourcesAction {
    List,
    Add { locator: String },
    Remove { locator: String },
    Enable { locator: String },
    Disable { locator: String },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Extra source for this run (URL or path). Repeatable.
    #[arg(long = "source")]
    extra: Vec<String>,

    /// Skip the built-in default source.
    #[arg(long)]
    no_default_source: bool,
}

impl SourceArgs {
    fn apply(&self, settings: &mut Settings) {
        if self.no_default_source {
            settings.enable_default_source = false;
        }
        settings
            .sources
            .extend(self.extra.iter().map(|s| SourceDescriptor::new(s.trim())));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synapse=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            sources,
            json,
        } => {
            let session = open_session(&cli.config, &sources)?;
            let results = session.query(query.as_deref().unwrap_or_default()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("{}", session.active_line(&results));
                print_results(&results);
            }
        }
        Commands::Sources { action } => manage_sources(&cli.config, action)?,
        Commands::ImportRis { file, out } => {
            let count = import_file(&file, &out)?;
            let mut settings = Settings::read(&cli.config)?;
            match settings.add_source(&out.to_string_lossy()) {
                Ok(()) => settings.save(&cli.config)?,
                Err(ConfigError::DuplicateSource(_)) => {}
                Err(e) => return Err(e.into()),
            }
            println!("imported {count} references into {}", out.display());
        }
        Commands::Note {
            query,
            sources,
            pick,
            vault,
        } => {
            let session = open_session(&cli.config, &sources)?;
            let results = session.query(&query).await;
            let Some(item) = nth_hit(&results, pick) else {
                return Err(format!("no hit #{pick} for query {query:?}").into());
            };
            let path = note_path(item);
            if let Some(vault) = vault {
                write_note(&vault.join(&path), item)?;
            } else {
                println!("{path}\n");
                print!("{}", note_content(item));
            }
            println!("{}", wiki_link(&path));
        }
        Commands::Trigger { line, link } => match link {
            Some(link) => println!("{}", replace_trigger(&line, &link)),
            None => {
                let Some(query) = extract_query(&line) else {
                    return Err("no @@ trigger on line".into());
                };
                println!("{query}");
            }
        },
    }
    Ok(())
}

fn open_session(config: &Path, sources: &SourceArgs) -> Result<Session, Box<dyn std::error::Error>> {
    let mut settings = Settings::load(config)?;
    sources.apply(&mut settings);
    Ok(Session::new(settings)?)
}

fn manage_sources(config: &Path, action: SourcesAction) -> Result<(), ConfigError> {
    let mut settings = Settings::read(config)?;
    match action {
        SourcesAction::List => {
            let default_state = if settings.enable_default_source { "on " } else { "off" };
            println!("[{default_state}] {} (default)", settings.default_source_url);
            for source in &settings.sources {
                let state = if source.enabled { "on " } else { "off" };
                println!("[{state}] {}", source.url);
            }
            return Ok(());
        }
        SourcesAction::Add { locator } => settings.add_source(&locator)?,
        SourcesAction::Remove { locator } => {
            settings.remove_source(&locator)?;
        }
        SourcesAction::Enable { locator } => settings.set_enabled(&locator, true)?,
        SourcesAction::Disable { locator } => settings.set_enabled(&locator, false)?,
    }
    settings.save(config)
}

fn print_results(results: &[QueryResult]) {
    let mut n = 0;
    for result in results {
        println!(
            "\n{} ({}): {} hit(s)",
            result.collection_name,
            result.designator,
            result.items.len()
        );
        for item in &result.items {
            n += 1;
            println!(
                "  [{n}] {} | {} | {}",
                item.title.as_deref().unwrap_or("Untitled"),
                item.author.as_deref().unwrap_or("Unknown Author"),
                item.date.as_deref().unwrap_or("No Date"),
            );
        }
    }
}

fn nth_hit(results: &[QueryResult], pick: usize) -> Option<&Item> {
    results
        .iter()
        .flat_map(|r| &r.items)
        .nth(pick.checked_sub(1)?)
}

fn write_note(path: &Path, item: &Item) -> std::io::Result<()> {
    if path.exists() {
        info!(path = %path.display(), "note already exists");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, note_content(item))?;
    info!(path = %path.display(), "note created");
    Ok(())
}
