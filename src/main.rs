//! didicat CLI: peer directory and federated search filters.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;

use didicat::config::DidicatConfig;
use didicat::engine::Engine;
use didicat::filter::{NodeFilter, SearchRequest};
use didicat::paths::DidicatPaths;
use didicat::peers::{PeerKind, PeerReference};

#[derive(Parser)]
#[command(name = "didicat", version, about = "Federated catalog search filter")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/didicat/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the triple store. Overrides the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show store info and triple counts.
    Info,

    /// Manage known peers.
    Peer {
        #[command(subcommand)]
        action: PeerAction,
    },

    /// Probe every peer with a search and store who qualified under a new filter key.
    Search {
        /// Search parameters as `key=value`, forwarded verbatim to peers.
        params: Vec<String>,
    },

    /// Inspect stored filters.
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration.
    Show,
}

#[derive(Subcommand)]
enum PeerAction {
    /// Register a peer.
    Add {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Base URL of the peer.
        url: String,
    },
    /// List registered peers.
    List,
    /// Remove a peer by identifier.
    Remove {
        #[arg(long, value_enum)]
        kind: KindArg,
        id: String,
    },
}

#[derive(Subcommand)]
enum FilterAction {
    /// Show which peers a filter key forwards to.
    Show {
        key: String,
        /// Further search parameters as `key=value`.
        params: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Kitten,
    Friend,
}

impl From<KindArg> for PeerKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Kitten => PeerKind::Kitten,
            KindArg::Friend => PeerKind::Friend,
        }
    }
}

fn load_config(cli: &Cli, paths: &DidicatPaths) -> Result<DidicatConfig> {
    let path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = DidicatConfig::load_or_default(&path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if config.data_dir.is_none() {
        config.data_dir = Some(paths.data_dir.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = DidicatPaths::resolve()?;

    match &cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => {
                let path = cli.config.clone().unwrap_or_else(|| paths.config_file());
                if path.exists() && !force {
                    miette::bail!(
                        "config already exists at {} (use --force to overwrite)",
                        path.display()
                    );
                }
                let config = DidicatConfig {
                    data_dir: Some(cli.data_dir.clone().unwrap_or_else(|| paths.data_dir.clone())),
                    ..Default::default()
                };
                config.save(&path)?;
                println!("Wrote {}", path.display());
            }
            ConfigAction::Show => {
                let config = load_config(&cli, &paths)?;
                let rendered = toml::to_string_pretty(&config)
                    .map_err(|e| miette::miette!("failed to render config: {e}"))?;
                print!("{rendered}");
            }
        },

        Commands::Info => {
            let engine = Engine::new(load_config(&cli, &paths)?)?;
            println!("{}", engine.info()?);
        }

        Commands::Peer { action } => {
            let engine = Engine::new(load_config(&cli, &paths)?)?;
            match action {
                PeerAction::Add { kind, url } => {
                    let id = engine.add_peer((*kind).into(), url)?;
                    println!("{id}");
                }
                PeerAction::List => {
                    let peers = engine.peers()?;
                    if peers.is_empty() {
                        println!("No peers registered.");
                    }
                    for peer in peers {
                        println!(
                            "{:<7} {:<22} {}",
                            peer.kind,
                            peer.id,
                            peer.url.as_deref().unwrap_or("-")
                        );
                    }
                }
                PeerAction::Remove { kind, id } => {
                    engine.remove_peer((*kind).into(), id)?;
                    println!("Removed {id}");
                }
            }
        }

        Commands::Search { params } => {
            let engine = Engine::new(load_config(&cli, &paths)?)?;
            let request = SearchRequest::from_pairs(params.iter().map(String::as_str));
            let key = engine.filter().make_filter_key(&request)?;
            println!("filter_key={key}");

            let keyed = request.with_filter_key(&key);
            let filter = engine.filter();
            let nodes = filter.qualifying_peers(&keyed)?;
            for url in &nodes.kittens {
                println!("  kitten {url}");
            }
            for url in &nodes.friends {
                println!("  friend {url}");
            }
        }

        Commands::Filter { action } => match action {
            FilterAction::Show { key, params } => {
                let engine = Engine::new(load_config(&cli, &paths)?)?;
                if engine.filter_record(key)?.is_none() {
                    miette::bail!("no filter stored under key {key}");
                }
                let request =
                    SearchRequest::from_pairs(params.iter().map(String::as_str)).with_filter_key(key);
                let filter = engine.filter();
                for peer in engine.peers()? {
                    let Some(url) = peer.url else { continue };
                    let reference = PeerReference { url, kind: peer.kind };
                    let contact = match peer.kind {
                        PeerKind::Kitten => filter.contact_kitten(&request, &reference)?,
                        PeerKind::Friend => filter.contact_friend(&request, &reference)?,
                    };
                    let mark = if contact { "contact" } else { "skip" };
                    println!("{mark:<8} {:<7} {}", reference.kind, reference.url);
                }
            }
        },
    }

    Ok(())
}
