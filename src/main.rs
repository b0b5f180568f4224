use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_mentor::clock::{Clock, SystemClock};
use photo_mentor::config::Config;
use photo_mentor::gemini::{GeminiClient, ModelCatalog, VisionModel};
use photo_mentor::mentor::Mentor;
use photo_mentor::store::{HistoryStore, JournalStore};
use photo_mentor::{api, challenge};

#[derive(Parser)]
#[command(name = "photo-mentor")]
#[command(about = "A peaceful corner for photography lovers: EXIF-aware mentoring and daily challenges")]
struct Cli {
    /// Directory holding the challenge history and journal
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server
    Serve {
        /// Port for the dashboard and HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Print today's challenge
    Challenge,
    /// Print the last seven days of challenge successes
    History,
    /// Read or write the learning journal
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },
    /// List models that can review photos
    Models,
}

#[derive(Subcommand)]
enum JournalAction {
    /// Append a note
    Add { text: String },
    /// Print the whole journal
    Show,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "photo_mentor=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let app = match config
        .require_api_key()
        .and_then(|key| GeminiClient::with_base_url(key, &config.gemini_url))
    {
        Ok(client) => {
            tracing::info!(data_dir = %config.data_dir().display(), "Using data directory");
            api::create_router(Mentor::new(&config, Arc::new(client)))
        }
        Err(e) => {
            tracing::error!("Cannot start the dashboard: {}", e);
            api::create_halted_router(e.to_string())
        }
    };

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Photo Mentor listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?.with_data_dir(cli.data_dir);

    match cli.command.unwrap_or(Commands::Serve { port: 3000 }) {
        Commands::Serve { port } => serve(config, port).await?,
        Commands::Challenge => {
            let today = challenge::challenge_for(SystemClock.today());
            println!("🎯 {}", today.title);
            println!("{}", today.description);
        }
        Commands::History => {
            let history = HistoryStore::in_dir(config.data_dir()).load();
            let calendar = history.calendar(SystemClock.today());
            let strip: Vec<_> = calendar.days.iter().map(|d| d.label.as_str()).collect();
            println!("{}", strip.join(" "));
            println!("Total achievements: {}", calendar.total);
        }
        Commands::Journal { action } => {
            let journal = JournalStore::in_dir(config.data_dir());
            match action {
                JournalAction::Add { text } => {
                    journal.append(&text, SystemClock.now())?;
                    println!("Note saved!");
                }
                JournalAction::Show => match journal.read()? {
                    Some(content) => print!("{}", content),
                    None => println!("The journal is empty."),
                },
            }
        }
        Commands::Models => {
            let key = config.require_api_key()?;
            let client = GeminiClient::with_base_url(key, &config.gemini_url)?;
            let catalog = ModelCatalog::new(config.default_model.clone());
            let model: &dyn VisionModel = &client;
            for name in catalog.models(model).await {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
