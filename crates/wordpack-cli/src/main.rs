//! wordpack CLI - Command-line interface for the word pack catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wordpack_core::{CatalogStore, GroupFetcher, PackId, WordPackConfig};
use wordpack_fetch::{DirGroupFetcher, HttpGroupFetcher};
use wordpack_service::{split_group_text, PopulationService, SelectionService};
use wordpack_store::SqliteStore;

/// wordpack - Lazily populated word pack catalog
#[derive(Parser)]
#[command(name = "wordpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: user config dir, then ./wordpack.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the catalog and seed the default packs
    Init,

    /// List word packs
    Packs {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the words stored for a pack
    Words {
        /// Pack id
        pack: PackId,
    },

    /// Pick random words, fetching a group if a pack is still empty
    Pick {
        /// Candidate pack ids (all packs if none given)
        packs: Vec<PackId>,

        /// Number of words to pick
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Top up default packs with remote groups
    Prefetch {
        /// Only this pack (all default packs if not specified)
        #[arg(long)]
        pack: Option<PackId>,

        /// Target number of local groups (default from config)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Import a word list file (one word per line) as a new pack
    Import {
        /// File to import
        path: PathBuf,

        /// Pack name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete an imported pack and its words
    Delete {
        /// Pack id
        pack: PackId,
    },

    /// Clear the catalog and seed fresh default packs
    Reset,
}

type Population = PopulationService<SqliteStore, dyn GroupFetcher>;

/// Store and services wired together.
struct Catalog {
    store: Arc<SqliteStore>,
    population: Arc<Population>,
    selection: SelectionService<SqliteStore, dyn GroupFetcher>,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let builder = FmtSubscriber::builder().with_target(false);
    let installed = match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
        }
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish()),
    };
    installed.ok();
}

fn load_config(cli: &Cli) -> Result<WordPackConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => WordPackConfig::load(path)?,
        None => WordPackConfig::load_default()?,
    };
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    Ok(config)
}

fn open_catalog(config: &WordPackConfig) -> Result<Catalog, Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(&config.database.path, &config.database)?);

    let fetcher: Arc<dyn GroupFetcher> = match &config.remote.local_dir {
        Some(dir) => {
            info!("Serving groups from {}", dir.display());
            Arc::new(DirGroupFetcher::new(dir))
        }
        None => Arc::new(HttpGroupFetcher::from_config(&config.remote)),
    };

    Ok(Catalog::new(store, fetcher))
}

impl Catalog {
    fn new(store: Arc<SqliteStore>, fetcher: Arc<dyn GroupFetcher>) -> Self {
        let population = Arc::new(PopulationService::new(store.clone(), fetcher));
        let selection = SelectionService::new(store.clone(), population.clone());

        Self {
            store,
            population,
            selection,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    let catalog = open_catalog(&config)?;
    catalog.store.initialize().await?;

    match cli.command {
        Commands::Init => {
            println!(
                "Initialized catalog at: {}",
                config.database.path.display()
            );
            if config.population.prefetch_on_start {
                prefetch(&catalog, None, config.population.max_local_groups).await?;
            }
        }
        Commands::Packs { json } => {
            list_packs(&catalog, json).await?;
        }
        Commands::Words { pack } => {
            list_words(&catalog, pack).await?;
        }
        Commands::Pick { packs, count } => {
            pick(&catalog, packs, count).await?;
        }
        Commands::Prefetch { pack, max } => {
            let max = max.unwrap_or(config.population.max_local_groups);
            prefetch(&catalog, pack, max).await?;
        }
        Commands::Import { path, name } => {
            import(&catalog, &path, name).await?;
        }
        Commands::Delete { pack } => {
            catalog.store.delete_file_word_pack(pack).await?;
            println!("Deleted pack {}", pack);
        }
        Commands::Reset => {
            catalog.store.clear().await?;
            catalog.store.initialize().await?;
            println!("Catalog reset");
        }
    }

    Ok(())
}

async fn list_packs(catalog: &Catalog, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let infos = catalog.store.list_pack_infos().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("{:>5}  {:<8}  {:>7}  name", "id", "type", "words");
    for info in infos {
        let kind = if info.is_default { "default" } else { "file" };
        println!(
            "{:>5}  {:<8}  {:>7}  {}",
            info.id, kind, info.word_count, info.name
        );
    }
    Ok(())
}

async fn list_words(catalog: &Catalog, pack: PackId) -> Result<(), Box<dyn std::error::Error>> {
    // Fails with not-found for unknown ids.
    catalog.store.get_pack(pack).await?;

    for word in catalog.store.list_words(pack).await? {
        match word.group_index {
            Some(group) => println!("{}\t{}\t(group {})", word.index, word.word, group),
            None => println!("{}\t{}", word.index, word.word),
        }
    }
    Ok(())
}

async fn pick(
    catalog: &Catalog,
    packs: Vec<PackId>,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let candidates = if packs.is_empty() {
        catalog
            .store
            .list_packs()
            .await?
            .iter()
            .map(|p| p.id)
            .collect()
    } else {
        packs
    };

    for _ in 0..count {
        match catalog.selection.pick_word(&candidates).await {
            Some(word) => println!("{}", word.word),
            None => return Err("no word available right now; try again later".into()),
        }
    }
    Ok(())
}

async fn prefetch(
    catalog: &Catalog,
    pack: Option<PackId>,
    max: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = match pack {
        Some(id) => {
            let pack = catalog.store.get_pack(id).await?;
            let label = pack.name.clone();
            vec![(label, catalog.population.prefetch_groups(&pack, max).await?)]
        }
        None => catalog
            .population
            .prefetch_all(max)
            .await?
            .into_iter()
            .map(|(language, report)| (language.to_string(), report))
            .collect(),
    };

    for (label, report) in reports {
        println!(
            "{}: {} group(s) merged, {} failed",
            label,
            report.merged.len(),
            report.failed.len()
        );
        for (group, reason) in &report.failed {
            eprintln!("  group {}: {}", group, reason);
        }
    }
    Ok(())
}

/// Import a word list file. Lines are trimmed and blank lines skipped
/// before the words reach the store, which keeps them verbatim.
async fn import(
    catalog: &Catalog,
    path: &Path,
    name: Option<String>,
) -> Result<PackId, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let words = split_group_text(&content);

    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });

    let id = catalog.store.add_file_word_pack(&name, &words).await?;
    println!("Imported {} word(s) as pack {} ({})", words.len(), id, name);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordpack_fetch::StaticGroupFetcher;

    async fn test_catalog() -> Catalog {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        store.initialize().await.unwrap();
        Catalog::new(store, Arc::new(StaticGroupFetcher::new()))
    }

    #[tokio::test]
    async fn test_import_trims_lines() {
        let catalog = test_catalog().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("animals.txt");
        fs::write(&path, " cat \n\n dog\r\n").unwrap();

        let id = import(&catalog, &path, None).await.unwrap();

        let pack = catalog.store.get_pack(id).await.unwrap();
        assert_eq!(pack.name, "animals.txt");
        let words: Vec<String> = catalog
            .store
            .list_words(id)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.word)
            .collect();
        assert_eq!(words, vec!["cat", "dog"]);
    }

    #[tokio::test]
    async fn test_pick_without_words_is_error() {
        let catalog = test_catalog().await;
        let id = catalog
            .store
            .add_file_word_pack("empty.txt", &[])
            .await
            .unwrap();

        assert!(pick(&catalog, vec![id], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_pick_from_file_pack() {
        let catalog = test_catalog().await;
        let id = catalog
            .store
            .add_file_word_pack("one.txt", &["solo".to_string()])
            .await
            .unwrap();

        assert!(pick(&catalog, vec![id], 3).await.is_ok());
    }
}
