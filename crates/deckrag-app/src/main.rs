//! deckrag binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install tracing (stderr, so the transcript on stdout stays clean)
//! 3. Open the feedback database and the slide index snapshot
//! 4. Wire the OpenAI-compatible embedder and completion client into a
//!    conversation session
//! 5. Run the requested command: interactive chat, one-shot question,
//!    index build, or feedback review

mod cli;
mod console;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use deckrag_chat::{ConversationSession, OpenAiCompletion, TurnOutcome};
use deckrag_core::config::DeckConfig;
use deckrag_core::error::DeckError;
use deckrag_storage::{Database, FeedbackRepository};
use deckrag_vector::{OpenAiEmbedding, SlideIndex, SlideSearch, SlideText};

use cli::{data_file, expand_home, CliArgs, Command};
use console::ConsoleInput;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match DeckConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (DeckConfig::default(), Some(e)),
    };
    args.apply_overrides(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting deckrag v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Configuration not loaded, using defaults"
        ),
    }

    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    match args.command() {
        Command::Feedback { session_id, limit } => {
            let repo = open_feedback(&data_dir, &config)?;
            let rows = repo.history_for_session(&session_id, limit)?;
            print!("{}", console::render_feedback_rows(&session_id, &rows));
        }
        Command::Index { slides } => build_index(&slides, &data_dir, &config).await?,
        Command::Ask { question } => {
            let session = build_session(&data_dir, &config)?;
            let reply = session.ask_once(&question.join(" ")).await?;
            println!("{}", console::render_answer(&reply));
        }
        Command::Chat => {
            let session = build_session(&data_dir, &config)?;
            run_chat(session).await?;
        }
    }

    Ok(())
}

fn open_feedback(data_dir: &Path, config: &DeckConfig) -> AppResult<FeedbackRepository> {
    let db_path = data_file(data_dir, &config.feedback.db_file);
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "Feedback database opened");
    Ok(FeedbackRepository::new(Arc::new(db)))
}

/// Load the slide snapshot, or start empty when none has been built yet.
fn load_index(data_dir: &Path, config: &DeckConfig) -> AppResult<SlideIndex> {
    let index_path = data_file(data_dir, &config.retrieval.index_file);
    match SlideIndex::load_snapshot(&index_path) {
        Ok(index) => Ok(index),
        Err(DeckError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %index_path.display(),
                "No slide index found; run `deckrag index` first. Answering without slides"
            );
            Ok(SlideIndex::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn build_session(data_dir: &Path, config: &DeckConfig) -> AppResult<ConversationSession> {
    let api_key = config.llm.resolve_api_key()?;

    let index = load_index(data_dir, config)?;
    let embedder = OpenAiEmbedding::new(&config.llm, api_key.clone())?;
    let store = SlideSearch::new(index, embedder);
    store.verify_dimensions()?;
    let store = Arc::new(store);
    let completion = Arc::new(OpenAiCompletion::new(&config.llm, api_key)?);
    let feedback = Arc::new(open_feedback(data_dir, config)?);

    Ok(ConversationSession::new(config, store, completion, feedback))
}

async fn build_index(slides_path: &Path, data_dir: &Path, config: &DeckConfig) -> AppResult<()> {
    let content = std::fs::read_to_string(slides_path)?;
    let slides: Vec<SlideText> = serde_json::from_str(&content)?;
    tracing::info!(path = %slides_path.display(), slides = slides.len(), "Slide texts read");

    let api_key = config.llm.resolve_api_key()?;
    let embedder = OpenAiEmbedding::new(&config.llm, api_key)?;
    let index = SlideIndex::build(&embedder, slides).await?;

    let index_path = data_file(data_dir, &config.retrieval.index_file);
    index.save_snapshot(&index_path)?;
    println!("{} slides indexées dans {}", index.len(), index_path.display());
    Ok(())
}

async fn run_chat(mut session: ConversationSession) -> AppResult<()> {
    println!("{}", console::banner(session.session_id()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", console::PROMPT);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match ConsoleInput::parse(&line) {
            ConsoleInput::Quit => {
                println!("Au revoir!");
                break;
            }
            ConsoleInput::NewConversation => {
                session.reset();
                println!("Nouvelle conversation démarrée ({})", session.session_id());
            }
            ConsoleInput::Utterance(text) => match session.handle(&text).await {
                Ok(TurnOutcome::Ignored) => {}
                Ok(TurnOutcome::Confirmed { feedback_id }) => {
                    if let Some(message) = console::render_confirmation(feedback_id) {
                        println!("\n{}", message);
                    }
                }
                Ok(TurnOutcome::Answered(reply)) => println!("{}", console::render_turn(&reply)),
                Err(e) => {
                    tracing::error!(session_id = %session.session_id(), error = %e, "Turn failed");
                    println!(
                        "\nErreur: {}. La conversation n'a pas été modifiée, vous pouvez réessayer.",
                        e
                    );
                }
            },
        }
    }

    Ok(())
}
