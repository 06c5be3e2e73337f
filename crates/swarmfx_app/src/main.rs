// SPDX-License-Identifier: MIT OR Apache-2.0
//! `swarmfx` - headless host for swarm lighting-effect graphs.
//!
//! Lists and inspects template documents, plays them over a frame range and
//! re-exports subgraphs. The interactive editor and the LED hardware are
//! outside this binary; it drives the graph the same way they would.

mod config;
mod host;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, CONFIG_FILE_NAME};
use host::{HeadlessScene, Host};
use std::path::PathBuf;
use swarmfx_graph::document::{self, Document};
use swarmfx_graph::template::TemplateCatalogue;
use swarmfx_graph::{Graph, ResourcePools};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "swarmfx")]
#[command(about = "Swarm lighting-effect graph host", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./swarmfx.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory, overrides the configuration
    #[arg(long, global = true)]
    templates: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List the template catalogue
    Templates,

    /// Summarize a document
    Inspect {
        /// Document path, or a template name
        file: String,
    },

    /// Play a document over the configured frame range
    Run {
        /// Document path, or a template name
        file: String,

        /// First frame, overrides the configuration
        #[arg(long)]
        start: Option<i32>,

        /// Last frame, overrides the configuration
        #[arg(long)]
        end: Option<i32>,
    },

    /// Import a document and re-export the subgraph of one node
    Export {
        /// Document path, or a template name
        file: String,

        /// Name of the node to export
        #[arg(long)]
        root: String,

        /// Output path
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());

    let filter = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| AppConfig::default().log_filter);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = config
        .context("Failed to load configuration")
        .and_then(|mut config| {
            if let Some(dir) = cli.templates {
                config.template_dir = dir;
            }
            run(cli.command, &config, cli.config)
        });

    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &AppConfig, config_path: Option<PathBuf>) -> Result<()> {
    let catalogue = TemplateCatalogue::new(&config.template_dir);

    match command {
        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            if path.exists() && !force {
                bail!("{} already exists", path.display());
            }
            AppConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        Commands::Templates => {
            let entries = catalogue.entries()?;
            if entries.is_empty() {
                tracing::info!("No templates in {:?}", catalogue.dir());
            }
            for entry in entries {
                println!("{}\t{}", entry.name, entry.path.display());
            }
        }
        Commands::Inspect { file } => {
            let doc = open_document(&catalogue, &file)?;
            println!("root: {}", doc.root);
            println!("version: {} ({})", doc.version, doc.tree_type);
            for node in &doc.nodes {
                let ramp = if node.color_ramp.is_some() { " +ramp" } else { "" };
                println!(
                    "  {} [{:?}] {} properties{ramp}",
                    node.name,
                    node.kind,
                    node.properties.len()
                );
            }
            println!("{} nodes, {} links", doc.nodes.len(), doc.links.len());
        }
        Commands::Run { file, start, end } => {
            let doc = open_document(&catalogue, &file)?;
            let mut host = Host::new("Scene");
            host.sampler = HeadlessScene::from_config(&config.scene);
            host.import(&doc, config.template_margin)?;

            let mut frames = config.frames();
            if start.is_some() || end.is_some() {
                frames = start.unwrap_or(config.frame_start)..=end.unwrap_or(config.frame_end);
            }
            if frames.is_empty() {
                bail!("Empty frame range {frames:?}");
            }

            for frame in frames {
                let report = host.tick(frame);
                for (name, signal) in &report.signals {
                    let [r, g, b, a] = signal.color;
                    let state = if report.activity.get(name).copied().unwrap_or(false) {
                        "on"
                    } else {
                        "off"
                    };
                    println!(
                        "{:>5} {name:<16} {state:<3} rgba({r:.3}, {g:.3}, {b:.3}, {a:.3}) x {:.3}",
                        report.frame, signal.intensity
                    );
                }
            }
            host.teardown();
        }
        Commands::Export { file, root, out } => {
            let doc = open_document(&catalogue, &file)?;
            let mut graph = Graph::new("Export");
            let mut pools = ResourcePools::new();
            let created = document::import(&mut graph, &mut pools, &doc)?;
            let Some(&node) = created.get(&root) else {
                bail!("No node named '{root}' in {file}");
            };
            let exported = document::export(&graph, &pools, node)?;
            exported
                .save(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            tracing::info!("Wrote {} nodes to {}", exported.nodes.len(), out.display());
        }
    }

    Ok(())
}

/// Load a document from a path, falling back to a catalogue lookup by name
fn open_document(catalogue: &TemplateCatalogue, file: &str) -> Result<Document> {
    let path = PathBuf::from(file);
    if path.is_file() {
        return Document::load(&path).with_context(|| format!("Failed to load {file}"));
    }
    Ok(catalogue.load(file)?)
}
