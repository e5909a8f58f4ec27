use clap::{Parser, Subcommand};
use coin_archive::dictionary::Dictionary;
use coin_archive::{config, details, folders, output, scan, server, terms, thumbnails};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coin-archive")]
#[command(about = "Web gallery for a folder-organized coin collection")]
#[command(long_about = "\
Web gallery for a folder-organized coin collection

Your filesystem is the data source. Folders are categories, series, years,
coins and subtypes; details.json files hold each coin's attributes.

Collection structure:

  images/
  ├── order.json                 # Display order for the browser (optional)
  ├── about.json                 # About page content (optional)
  └── מחזור/                      # Category
      └── שקל חדש/                # Series (first image here = series image)
          └── 1994/               # Year
              └── שקל/            # Coin
                  ├── details.json
                  ├── 01.jpg      # Loose images
                  └── חנוכה/      # Subtype folder (own images, own details.json)

Folder names are translated through folder_map.json; unknown names are shown
as they are. Run 'coin-archive translate' to fill in missing terms.

Run 'coin-archive gen-config' to generate a documented coins.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing = defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Collection root (overrides images_dir)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Thumbnail root (overrides thumbnails_dir)
    #[arg(long, global = true)]
    thumbnails: Option<PathBuf>,

    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the gallery over HTTP
    Serve {
        /// Listen address (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides server.port and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the collection as the gallery sees it
    Scan {
        /// Print the JSON payload served at /api/data instead
        #[arg(long)]
        json: bool,
    },
    /// Generate thumbnails for every image
    Thumbnails {
        /// Regenerate even when thumbnails are up to date
        #[arg(long)]
        force: bool,
    },
    /// Merge shared attributes into details.json files from a rules file
    PushDetails {
        /// TOML file with [[rule]] entries
        rules: PathBuf,
        /// Show which files would change without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Prompt for translations of terms missing from the dictionary
    Translate,
    /// Add .gitkeep to collection folders without files
    SecureFolders,
    /// Print a stock coins.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Serve { host, port } => {
            let mut archive = load_archive(&cli)?;
            archive.apply_port_override(std::env::var("PORT").ok().as_deref())?;
            if let Some(host) = host {
                archive.server.host = host.clone();
            }
            if let Some(port) = port {
                archive.server.port = *port;
            }
            let addr = (archive.server.host.as_str(), archive.server.port);
            let server = server::Server::bind(addr, server::AppState::from_config(&archive))?;
            println!("Serving on http://{}", server.local_addr()?);
            server.serve()?;
        }
        Command::Scan { json } => {
            let options = scan::ScanOptions::from_config(&load_archive(&cli)?);
            let collection = scan::scan(&options)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&collection.payload())?);
            } else {
                output::print_scan_output(&collection, &options.images_root);
            }
        }
        Command::Thumbnails { force } => {
            let archive = load_archive(&cli)?;
            init_thread_pool(&archive.processing);
            let job = thumbnails::ThumbnailJob::from_config(&archive, *force);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_thumbnail_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = thumbnails::generate_thumbnails(&job, Some(tx));
            let _ = printer.join();
            output::print_thumbnail_summary(&result?);
        }
        Command::PushDetails { rules, dry_run } => {
            let archive = load_archive(&cli)?;
            let rules = details::load_rules(rules)?;
            let report = details::push_details(&archive.images_root(), &rules.rules, *dry_run)?;
            output::print_push_report(&report);
        }
        Command::Translate => {
            let options = scan::ScanOptions::from_config(&load_archive(&cli)?);
            let found = terms::gather_terms(&options)?;
            let mut dictionary = Dictionary::load(&options.dictionary_path);
            let report = terms::prompt_missing(
                &found,
                &mut dictionary,
                &options.dictionary_path,
                io::stdin().lock(),
                io::stdout(),
            )?;
            output::print_prompt_report(&report);
        }
        Command::SecureFolders => {
            let root = load_archive(&cli)?.images_root();
            let secured = folders::secure_empty_folders(&root)?;
            output::print_secured(&secured, &root);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `coins.toml` and apply the global path flags on top.
fn load_archive(cli: &Cli) -> Result<config::ArchiveConfig, config::ConfigError> {
    let mut archive = config::load_config(&cli.config)?;
    if let Some(images) = &cli.images {
        archive.images_dir = images.to_string_lossy().into_owned();
    }
    if let Some(thumbnails) = &cli.thumbnails {
        archive.thumbnails_dir = thumbnails.to_string_lossy().into_owned();
    }
    archive.validate()?;
    Ok(archive)
}

/// Install the log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
