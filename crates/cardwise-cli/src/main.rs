//! Cardwise CLI
//!
//! Command-line front end for the Cardwise scheduling engine. Operates on a
//! JSON deck file holding cards, memory states, and the review log.

mod deck_file;
mod study;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cardwise_core::{
    Card, CardStore, EngineConfig, InMemoryStore, Locale, Rating, ReviewService, StrategyKind,
};

use crate::deck_file::DeckFile;

/// Cardwise - spaced repetition from the terminal
#[derive(Parser)]
#[command(name = "cardwise")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schedule and study flashcards with spaced repetition")]
#[command(long_about = "Cardwise schedules flashcards with an interval-multiplier (SM-2) or forgetting-curve (FSRS) strategy.\n\nEngine settings are read from CARDWISE_* environment variables; flags override them.")]
struct Cli {
    /// Deck file (defaults to the platform data directory)
    #[arg(long, global = true)]
    deck_file: Option<PathBuf>,

    /// Learner whose schedule is used
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    /// Scheduling strategy: interval_multiplier (sm2) or forgetting_curve (fsrs)
    #[arg(long, global = true)]
    strategy: Option<StrategyKind>,

    /// Interval label language: en or pt-BR
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a card
    Add {
        /// Prompt side
        front: String,
        /// Answer side
        back: String,
        /// Deck to add the card to
        #[arg(long, default_value = "default")]
        deck: String,
    },

    /// Show how many cards are due and list them
    Due {
        /// Restrict to one deck
        #[arg(long)]
        deck: Option<String>,
    },

    /// Show the interval each rating would produce for a card
    Preview {
        /// Card id
        card: String,
    },

    /// Apply a rating (1-4 or again/hard/good/easy) to a card
    Review {
        /// Card id
        card: String,
        /// Rating
        rating: Rating,
        /// Time spent on the card in milliseconds
        #[arg(long, default_value = "0")]
        time_ms: u64,
    },

    /// Study due and new cards interactively
    Study {
        /// Restrict to one deck
        #[arg(long)]
        deck: Option<String>,
    },

    /// Clamp or reset invalid stored scheduling parameters
    Repair,

    /// Print the label for one or more day counts
    Format {
        /// Day counts
        #[arg(required = true)]
        days: Vec<u32>,
    },
}

/// Loaded deck plus the engine bound to it
struct Workspace {
    deck: DeckFile,
    store: Arc<InMemoryStore>,
    service: ReviewService<Arc<InMemoryStore>>,
    owner: String,
}

impl Workspace {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let deck = match &cli.deck_file {
            Some(path) => DeckFile::new(path),
            None => DeckFile::default_location()?,
        };

        let mut config = EngineConfig::from_env()?;
        if let Some(strategy) = cli.strategy {
            config = config.with_strategy(strategy);
        }
        if let Some(locale) = cli.locale {
            config = config.with_locale(locale);
        }

        let store = Arc::new(deck.load()?);
        let service = ReviewService::new(store.clone(), config).with_recorder(store.clone());
        tracing::debug!(
            path = %deck.path().display(),
            strategy = %service.strategy().kind(),
            "Opened deck"
        );

        Ok(Self {
            deck,
            store,
            service,
            owner: cli.owner.clone(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.deck.save(&self.store)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Format { days } => run_format(&cli, days),
        Commands::Add { front, back, deck } => run_add(&Workspace::open(&cli)?, front, back, deck),
        Commands::Due { deck } => run_due(&Workspace::open(&cli)?, deck.as_deref()),
        Commands::Preview { card } => run_preview(&Workspace::open(&cli)?, card),
        Commands::Review {
            card,
            rating,
            time_ms,
        } => run_review(&Workspace::open(&cli)?, card, *rating, *time_ms),
        Commands::Study { deck } => run_study(&Workspace::open(&cli)?, deck.as_deref()),
        Commands::Repair => run_repair(&Workspace::open(&cli)?),
    }
}

/// Run format command
fn run_format(cli: &Cli, days: &[u32]) -> anyhow::Result<()> {
    let locale = match cli.locale {
        Some(locale) => locale,
        None => EngineConfig::from_env()?.locale,
    };
    for &n in days {
        println!("{:>6}  {}", n, cardwise_core::format_interval_in(n, locale));
    }
    Ok(())
}

/// Run add command
fn run_add(ws: &Workspace, front: &str, back: &str, deck: &str) -> anyhow::Result<()> {
    let card = Card {
        id: Uuid::new_v4().to_string(),
        deck_id: deck.to_string(),
        owner_id: ws.owner.clone(),
        front: front.to_string(),
        back: back.to_string(),
        created_at: Utc::now(),
    };
    let id = card.id.clone();
    ws.store.insert_card(card)?;
    ws.save()?;

    println!("{} {}", "Added".green().bold(), id);
    Ok(())
}

/// Run due command
fn run_due(ws: &Workspace, deck: Option<&str>) -> anyhow::Result<()> {
    let now = Utc::now();
    let total = ws.service.count_due_at(&ws.owner, deck, now)?;
    let reviews = ws.store.query_due(&ws.owner, deck, now, usize::MAX)?;
    let fresh = ws.store.query_new(&ws.owner, deck, usize::MAX)?;

    println!("{}", "=== Cardwise Due Cards ===".cyan().bold());
    println!();
    println!("{}: {}", "Due Now".white().bold(), total);
    println!("{}: {}", "Reviews".white().bold(), reviews.len());
    println!("{}: {}", "New".white().bold(), fresh.len());

    if reviews.is_empty() && fresh.is_empty() {
        println!();
        println!("{}", "Nothing to study.".dimmed());
        return Ok(());
    }

    println!();
    for entry in &reviews {
        println!(
            "  {} {:<12} {} {}",
            entry.id().dimmed(),
            entry.state.lifecycle_state.to_string().yellow(),
            entry.card.front,
            overdue_label(ws, entry.state.due_at, now).dimmed()
        );
    }
    for entry in &fresh {
        println!(
            "  {} {:<12} {}",
            entry.id().dimmed(),
            "new".green(),
            entry.card.front
        );
    }
    Ok(())
}

fn overdue_label(ws: &Workspace, due_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - due_at).num_days().max(0) as u32;
    if days == 0 {
        "(due today)".to_string()
    } else {
        format!("(overdue {})", ws.service.format_interval(days))
    }
}

/// Run preview command
fn run_preview(ws: &Workspace, card_id: &str) -> anyhow::Result<()> {
    let preview = ws.service.preview_intervals(&ws.owner, card_id)?;

    if let Some(card) = ws.store.card(card_id)? {
        println!("{}", card.front.bold());
    }
    for (rating, days) in preview.iter() {
        println!(
            "  {} {:<5} {}",
            rating.as_i32().to_string().cyan(),
            rating.as_str(),
            ws.service.format_interval(days)
        );
    }
    Ok(())
}

/// Run review command
fn run_review(ws: &Workspace, card_id: &str, rating: Rating, time_ms: u64) -> anyhow::Result<()> {
    let receipt = ws.service.review(&ws.owner, card_id, rating, time_ms)?;
    ws.save()?;

    println!(
        "{} {} as {}",
        "Reviewed".green().bold(),
        card_id,
        rating.as_str().cyan()
    );
    println!(
        "{}: {} ({})",
        "Next Review".white().bold(),
        ws.service.format_interval(receipt.interval_days),
        receipt.due_at.format("%Y-%m-%d %H:%M")
    );
    println!("{}: {}", "State".white().bold(), receipt.state.lifecycle_state);
    Ok(())
}

/// Run study command
fn run_study(ws: &Workspace, deck: Option<&str>) -> anyhow::Result<()> {
    let session = ws.service.start_session(&ws.owner, deck)?;
    if session.is_finished() {
        println!("{}", "Nothing to study right now.".dimmed());
        return Ok(());
    }

    println!("{}", "=== Cardwise Study Session ===".cyan().bold());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let result = study::run_session(&ws.service, session, stdin.lock(), &mut stdout);
    ws.save()?;
    let summary = result?;

    println!();
    println!("{}", "=== Session Summary ===".cyan().bold());
    println!("{}: {}", "Cards Studied".white().bold(), summary.cards_studied);
    println!("{}: {}", "Recalled".white().bold(), summary.cards_correct);
    println!("{}: {:.0}%", "Accuracy".white().bold(), summary.accuracy() * 100.0);
    if summary.attempts_exhausted > 0 {
        println!(
            "{}: {}",
            "Out of Attempts".white().bold(),
            summary.attempts_exhausted.to_string().red()
        );
    }
    if summary.abandoned {
        println!(
            "{}",
            format!("Stopped early with {} cards left.", summary.cards_remaining).yellow()
        );
    }
    Ok(())
}

/// Run repair command
fn run_repair(ws: &Workspace) -> anyhow::Result<()> {
    let report = ws.service.repair_memory_states(&ws.owner)?;
    if report.repaired > 0 {
        ws.save()?;
    }

    println!("{}", "=== Cardwise Repair ===".cyan().bold());
    println!();
    println!("{}: {}", "Rows Scanned".white().bold(), report.scanned);
    println!("{}: {}", "Rows Repaired".white().bold(), report.repaired);
    for fix in &report.corrections {
        println!(
            "  {} {} {} -> {}",
            fix.card_id.dimmed(),
            fix.correction.field.to_string().yellow(),
            fix.correction.found,
            fix.correction.replaced_with
        );
    }
    Ok(())
}
