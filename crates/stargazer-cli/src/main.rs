use anyhow::Context;
use clap::Parser;
use stargazer_api::{GitHubClient, ReachabilityMonitor};
use stargazer_cache::KvStore;
use stargazer_core::{
    Completion, Config, FavoritesSource, ListEngine, RemoteSource, RepositoryRecord,
    RequestStatus, Row, TimeWindow,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stargazer")]
#[command(version, about = "The most starred new GitHub repositories, in your terminal", long_about = None)]
struct Cli {
    /// GitHub token (overrides GITHUB_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Time window: day, week or month
    #[arg(long, short, global = true)]
    window: Option<TimeWindow>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print trending repositories without starting the TUI
    List {
        /// Number of pages to load (10 repositories each)
        #[arg(long, short, default_value_t = 1)]
        pages: u32,

        /// Only show repositories whose name contains this text
        #[arg(long, short)]
        filter: Option<String>,
    },
    /// Print saved favorites
    Favorites,
    /// Write the current settings (including --token and --window) to the config file
    Init,
}

fn init_logging(to_file: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stargazer=info".into());

    if to_file {
        // The TUI owns the terminal, so logs go to a file
        let log_path = Config::log_path()?;
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.is_none())?;

    let mut config = Config::load()?;
    if let Some(token) = cli.token {
        config.github.token = Some(token);
    }
    let window = cli.window.unwrap_or(config.ui.default_window);

    if let Some(Commands::Init) = cli.command {
        config.ui.default_window = window;
        config.save()?;
        println!("Wrote {}", Config::config_path()?.display());
        return Ok(());
    }

    let db_path = config.favorites_db_path()?;
    let store = Arc::new(
        KvStore::open(&db_path)
            .with_context(|| format!("Failed to open favorites at {}", db_path.display()))?,
    );
    let favorites = Arc::new(FavoritesSource::new(store));

    match cli.command {
        Some(Commands::Favorites) => {
            let items = favorites.load()?;
            if items.is_empty() {
                println!("No favorites yet. Press 'f' on a repository in the TUI to add one.");
            }
            for record in &items {
                print_record(record, true);
            }
        }
        Some(Commands::List { pages, filter }) => {
            let (mut engine, mut completions) = build_engine(&config, favorites, window);
            tracing::info!("Listing {} page(s) for {}", pages, window);

            engine.start();
            settle(&mut engine, &mut completions).await?;
            for _ in 1..pages {
                if !engine.has_more() {
                    break;
                }
                engine.load_more();
                settle(&mut engine, &mut completions).await?;
            }

            if let Some(text) = filter {
                engine.set_filter_text(text);
            }
            print_rows(&engine)?;
        }
        // Written before the store was opened
        Some(Commands::Init) => {}
        None => {
            let (engine, completions) = build_engine(&config, favorites, window);

            let (reach_tx, reach_rx) = mpsc::unbounded_channel();
            let monitor = ReachabilityMonitor::new(
                config.github.api_url.clone(),
                config.network.reachability_interval(),
            );
            let monitor_handle = monitor.spawn(reach_tx);

            tracing::info!("Starting TUI ({})", window);
            let app = stargazer_tui::App::new(engine);
            let result =
                stargazer_tui::run_tui(app, completions, reach_rx, config.ui.mouse_enabled).await;

            monitor_handle.abort();
            result?;
        }
    }

    Ok(())
}

fn build_engine(
    config: &Config,
    favorites: Arc<FavoritesSource>,
    window: TimeWindow,
) -> (ListEngine, UnboundedReceiver<Completion>) {
    let client = GitHubClient::with_base_url(
        config.github.token.clone(),
        config.github.api_url.clone(),
        config.network.timeout(),
    );
    let remote = Arc::new(RemoteSource::with_client(client));
    ListEngine::new(remote, favorites, window)
}

/// Apply completions until the pending page has landed
async fn settle(
    engine: &mut ListEngine,
    completions: &mut UnboundedReceiver<Completion>,
) -> anyhow::Result<()> {
    while engine.request_status() == RequestStatus::Loading {
        let completion = completions
            .recv()
            .await
            .context("List engine stopped before the page arrived")?;
        engine.apply(completion);
    }

    // Pick up a favorites snapshot that is already waiting
    while let Ok(completion) = completions.try_recv() {
        engine.apply(completion);
    }
    Ok(())
}

fn print_rows(engine: &ListEngine) -> anyhow::Result<()> {
    for row in engine.rows() {
        match row {
            Row::Data(data) => print_record(&data.record, data.is_favorite),
            Row::Loading => println!("  … more available, use --pages to load them"),
            Row::Empty(kind) if kind.is_error() => {
                anyhow::bail!("{}. {}", kind.title(), kind.hint());
            }
            Row::Empty(kind) => println!("{}", kind.title()),
        }
    }

    if engine.request_status() == RequestStatus::Failed && engine.has_data_rows() {
        eprintln!("Warning: the last page failed to load, the list may be incomplete");
    }
    Ok(())
}

fn print_record(record: &RepositoryRecord, is_favorite: bool) {
    let marker = if is_favorite { "★" } else { " " };
    let language = record.language.as_deref().unwrap_or("-");
    let description = record.description.as_deref().unwrap_or("");
    println!(
        "{} {:>7}  {:<40}  {:<12}  {}",
        marker,
        record.star_count,
        record.full_name(),
        language,
        description
    );
}
