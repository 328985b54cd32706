//! Recite CLI
//!
//! Command-line interface agent hooks invoke to record, cite, and hand
//! off session knowledge. Stdout carries payloads hooks feed back into
//! agent context; everything diagnostic goes to stderr.

use std::io::{self, Read};
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use recite_core::{
    render_glyph, AttemptOutcome, Category, Config, Handoff, HandoffContext, HandoffPatch,
    HandoffStatus, HandoffStore, LessonPatch, LessonStore, ListFilter, NewHandoff, NewLesson,
    Phase, Scope, Source, TodoItem, TranscriptScanner,
};

/// Recite - session memory for coding agents
#[derive(Parser)]
#[command(name = "recite")]
#[command(author = "Sam Valladares")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lesson and handoff records for coding-agent sessions")]
#[command(
    long_about = "Recite persists lessons and handoff records across coding-agent sessions.\n\nRecords live in plain Markdown block files under a locked store; hooks call\nthis binary to record, cite, inject, and scan transcripts."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a project lesson
    Add {
        /// Short headline
        title: String,
        /// Body text
        content: String,
        /// Kind of knowledge (pattern, correction, decision, gotcha, preference)
        #[arg(long)]
        category: Option<Category>,
        /// Opt the lesson out of automatic promotion
        #[arg(long)]
        no_promote: bool,
        /// Record even when a near-duplicate title exists
        #[arg(long)]
        force: bool,
    },

    /// Record a system lesson (shared across projects)
    AddSystem {
        /// Short headline
        title: String,
        /// Body text
        content: String,
        /// Kind of knowledge (pattern, correction, decision, gotcha, preference)
        #[arg(long)]
        category: Option<Category>,
        /// Opt the lesson out of automatic promotion
        #[arg(long)]
        no_promote: bool,
        /// Record even when a near-duplicate title exists
        #[arg(long)]
        force: bool,
    },

    /// Record a project lesson attributed to the agent
    AddAi {
        /// Short headline
        title: String,
        /// Body text
        content: String,
        /// Kind of knowledge (pattern, correction, decision, gotcha, preference)
        #[arg(long)]
        category: Option<Category>,
        /// Opt the lesson out of automatic promotion
        #[arg(long)]
        no_promote: bool,
        /// Record even when a near-duplicate title exists
        #[arg(long)]
        force: bool,
    },

    /// Cite a lesson, reinforcing its rating
    Cite {
        /// Lesson id (L### or S###)
        id: String,
    },

    /// Edit fields on an existing lesson
    Edit {
        /// Lesson id
        id: String,
        /// New headline
        #[arg(long)]
        title: Option<String>,
        /// New body text
        #[arg(long)]
        content: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<Category>,
        /// Re-enable automatic promotion
        #[arg(long, conflicts_with = "no_promote")]
        promote: bool,
        /// Disable automatic promotion
        #[arg(long)]
        no_promote: bool,
    },

    /// Delete a lesson outright
    Delete {
        /// Lesson id
        id: String,
    },

    /// List lessons with optional filters
    List {
        /// Restrict to one scope (project or system)
        #[arg(long)]
        scope: Option<Scope>,
        /// Restrict to one category
        #[arg(long)]
        category: Option<Category>,
        /// Case-insensitive substring over title and content
        #[arg(long)]
        search: Option<String>,
        /// Show only lessons past the stale-age threshold
        #[arg(long)]
        stale: bool,
    },

    /// Print the top-rated lessons as a hook injection payload
    Inject {
        /// Maximum lessons to include
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Run one decay pass over both scope files
    Decay,

    /// Promote a project lesson to system scope
    Promote {
        /// Lesson id (L###)
        id: String,
    },

    /// Show record statistics
    Stats,

    /// Manage handoff records
    Handoff {
        #[command(subcommand)]
        command: HandoffCommands,
    },

    /// Scan a session transcript for citations and directives
    Scan {
        /// Path to the JSONL transcript
        transcript: PathBuf,
    },
}

#[derive(Subcommand)]
enum HandoffCommands {
    /// Record a new handoff
    Add {
        /// Short headline
        title: String,
        /// Free-form description of the work
        description: String,
        /// Agent or person holding the work
        #[arg(long)]
        agent: Option<String>,
        /// Stage of the work (research, planning, implementing, review)
        #[arg(long)]
        phase: Option<Phase>,
    },

    /// Show one handoff in full
    Show {
        /// Handoff id, stem, or unique title fragment
        id: String,
    },

    /// Patch fields on a handoff
    Update {
        /// Handoff id, stem, or unique title fragment
        id: String,
        /// New status (not_started, in_progress, blocked, ready_for_review)
        #[arg(long)]
        status: Option<HandoffStatus>,
        /// New phase
        #[arg(long)]
        phase: Option<Phase>,
        /// New holder
        #[arg(long)]
        agent: Option<String>,
        /// Replace the next-steps note
        #[arg(long)]
        next: Option<String>,
        /// Replace the resume checkpoint
        #[arg(long)]
        checkpoint: Option<String>,
        /// Replace related record ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        refs: Option<Vec<String>>,
        /// Replace blocking handoff ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        blocked_by: Option<Vec<String>>,
    },

    /// Append an attempt record
    Tried {
        /// Handoff id, stem, or unique title fragment
        id: String,
        /// How the attempt ended (success, fail, partial)
        outcome: AttemptOutcome,
        /// What was tried
        description: String,
    },

    /// Attach a structured context payload (JSON argument, or stdin)
    Context {
        /// Handoff id, stem, or unique title fragment
        id: String,
        /// Context JSON; read from stdin when omitted
        json: Option<String>,
    },

    /// Mark a handoff completed (terminal, idempotent)
    Complete {
        /// Handoff id, stem, or unique title fragment
        id: String,
    },

    /// Move old completed handoffs to the archive file
    Archive,

    /// Delete a handoff outright
    Delete {
        /// Handoff id, stem, or unique title fragment
        id: String,
    },

    /// List handoffs
    List {
        /// Include the archive file
        #[arg(long)]
        all: bool,
    },

    /// Print the active retention view as a hook injection payload
    Inject,

    /// Mirror an agent todo list into a handoff (JSON argument, or stdin)
    SyncTodos {
        /// Handoff id, stem, or unique title fragment
        id: String,
        /// Todo list JSON; read from stdin when omitted
        json: Option<String>,
    },

    /// Emit a handoff's steps as an agent todo list
    InjectTodos {
        /// Handoff id, stem, or unique title fragment
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging to stderr; stdout is reserved for hook payloads
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    if let Err(e) = dispatch(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Add {
            title,
            content,
            category,
            no_promote,
            force,
        } => run_add(Scope::Project, Source::User, title, content, category, no_promote, force),
        Commands::AddSystem {
            title,
            content,
            category,
            no_promote,
            force,
        } => run_add(Scope::System, Source::User, title, content, category, no_promote, force),
        Commands::AddAi {
            title,
            content,
            category,
            no_promote,
            force,
        } => run_add(Scope::Project, Source::Ai, title, content, category, no_promote, force),
        Commands::Cite { id } => run_cite(&id),
        Commands::Edit {
            id,
            title,
            content,
            category,
            promote,
            no_promote,
        } => run_edit(&id, title, content, category, promote, no_promote),
        Commands::Delete { id } => run_delete(&id),
        Commands::List {
            scope,
            category,
            search,
            stale,
        } => run_list(scope, category, search, stale),
        Commands::Inject { limit } => run_inject(limit),
        Commands::Decay => run_decay(),
        Commands::Promote { id } => run_promote(&id),
        Commands::Stats => run_stats(),
        Commands::Handoff { command } => match command {
            HandoffCommands::Add {
                title,
                description,
                agent,
                phase,
            } => run_handoff_add(title, description, agent, phase),
            HandoffCommands::Show { id } => run_handoff_show(&id),
            HandoffCommands::Update {
                id,
                status,
                phase,
                agent,
                next,
                checkpoint,
                refs,
                blocked_by,
            } => run_handoff_update(&id, status, phase, agent, next, checkpoint, refs, blocked_by),
            HandoffCommands::Tried {
                id,
                outcome,
                description,
            } => run_handoff_tried(&id, outcome, &description),
            HandoffCommands::Context { id, json } => run_handoff_context(&id, json),
            HandoffCommands::Complete { id } => run_handoff_complete(&id),
            HandoffCommands::Archive => run_handoff_archive(),
            HandoffCommands::Delete { id } => run_handoff_delete(&id),
            HandoffCommands::List { all } => run_handoff_list(all),
            HandoffCommands::Inject => run_handoff_inject(),
            HandoffCommands::SyncTodos { id, json } => run_sync_todos(&id, json),
            HandoffCommands::InjectTodos { id } => run_inject_todos(&id),
        },
        Commands::Scan { transcript } => run_scan(&transcript),
    }
}

// ============================================================================
// LESSON COMMANDS
// ============================================================================

/// Run add / add-system / add-ai
fn run_add(
    scope: Scope,
    source: Source,
    title: String,
    content: String,
    category: Option<Category>,
    no_promote: bool,
    force: bool,
) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);

    let new = NewLesson {
        title,
        content,
        category: category.unwrap_or_default(),
        source,
        promotable: !no_promote,
    };
    let lesson = store.add(new, scope, force)?;

    println!(
        "{} [{}] {} {}",
        "Recorded".green().bold(),
        lesson.id,
        lesson.title,
        format!("({})", lesson.category).dimmed()
    );

    Ok(())
}

/// Run cite command
fn run_cite(id: &str) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let outcome = store.cite(id)?;

    println!(
        "{} [{}] {} {}",
        "Cited".green().bold(),
        outcome.lesson.id,
        render_glyph(outcome.lesson.uses, outcome.lesson.velocity),
        outcome.lesson.title,
    );
    if let Some(system_id) = outcome.promoted_to {
        println!(
            "{} [{}]",
            "Promoted to system scope as".yellow().bold(),
            system_id
        );
    }

    Ok(())
}

/// Run edit command
fn run_edit(
    id: &str,
    title: Option<String>,
    content: Option<String>,
    category: Option<Category>,
    promote: bool,
    no_promote: bool,
) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);

    let promotable = if promote {
        Some(true)
    } else if no_promote {
        Some(false)
    } else {
        None
    };
    let patch = LessonPatch {
        title,
        content,
        category,
        promotable,
    };
    let lesson = store.edit(id, patch)?;

    println!("{} [{}] {}", "Updated".green().bold(), lesson.id, lesson.title);

    Ok(())
}

/// Run delete command
fn run_delete(id: &str) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let lesson = store.delete(id)?;

    println!("{} [{}] {}", "Deleted".red().bold(), lesson.id, lesson.title);

    Ok(())
}

/// Run list command
fn run_list(
    scope: Option<Scope>,
    category: Option<Category>,
    search: Option<String>,
    stale: bool,
) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let filter = ListFilter {
        scope,
        category,
        search,
        stale_only: stale,
    };
    let lessons = store.list(&filter)?;

    println!("{}", "=== Lessons ===".cyan().bold());
    println!();

    if lessons.is_empty() {
        println!("{}", "No lessons found.".dimmed());
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let stale_days = store.config().stale_days;

    for lesson in &lessons {
        let marker = if lesson.is_stale(today, stale_days) {
            " stale".yellow()
        } else {
            "".normal()
        };
        println!(
            "[{}] {} {}{}",
            lesson.id,
            render_glyph(lesson.uses, lesson.velocity),
            lesson.title.white().bold(),
            marker,
        );
        println!(
            "  {}",
            format!(
                "{} | uses {} | last {} | {}",
                lesson.category,
                lesson.uses,
                lesson.last,
                truncate(&lesson.content, 60)
            )
            .dimmed()
        );
    }

    println!();
    println!("{} lessons", lessons.len());

    Ok(())
}

/// Run inject command - prints the payload hooks feed into agent context
fn run_inject(limit: usize) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let report = store.inject(limit)?;

    print!("{}", report.to_markdown());

    Ok(())
}

/// Run decay command
fn run_decay() -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let report = store.decay()?;

    println!("{}", "=== Recite Decay ===".cyan().bold());
    println!();

    if report.vacation {
        println!("{}", "Vacation gap detected; scores left untouched.".yellow());
        return Ok(());
    }

    println!("{}: {}", "Records Decayed".white().bold(), report.decayed);
    println!("{}: {}", "Records Evicted".white().bold(), report.evicted);

    Ok(())
}

/// Run promote command
fn run_promote(id: &str) -> anyhow::Result<()> {
    let store = LessonStore::new(Config::from_env()?);
    let lesson = store.promote(id)?;

    println!(
        "{} [{}] {}",
        "Promoted to system scope as".green().bold(),
        lesson.id,
        lesson.title
    );

    Ok(())
}

/// Run stats command
fn run_stats() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = LessonStore::new(config.clone());
    let stats = store.stats()?;

    println!("{}", "=== Recite Statistics ===".cyan().bold());
    println!();

    println!("{}: {}", "Project Lessons".white().bold(), stats.project_count);
    println!("{}: {}", "System Lessons".white().bold(), stats.system_count);
    println!("{}: {}", "Total Uses".white().bold(), stats.total_uses);
    println!("{}: ~{} tokens", "Injection Footprint".white().bold(), stats.total_tokens);
    println!("{}: {}", "Stale Lessons".white().bold(), stats.stale_count);
    if stats.raw_blocks > 0 {
        println!("{}: {}", "Unparsed Blocks".yellow().bold(), stats.raw_blocks);
    }

    let handoffs = HandoffStore::new(config);
    let live = handoffs.list()?;
    let open = live.iter().filter(|h| !h.is_completed()).count();
    println!("{}: {} ({} open)", "Handoffs".white().bold(), live.len(), open);

    Ok(())
}

// ============================================================================
// HANDOFF COMMANDS
// ============================================================================

/// Run handoff add command
fn run_handoff_add(
    title: String,
    description: String,
    agent: Option<String>,
    phase: Option<Phase>,
) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let handoff = store.add(NewHandoff {
        title,
        description,
        agent,
        phase,
    })?;

    println!("{} [{}] {}", "Recorded".green().bold(), handoff.id, handoff.title);

    Ok(())
}

/// Run handoff show command
fn run_handoff_show(id: &str) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let handoff = store.get(id)?;
    print_handoff(&handoff);
    Ok(())
}

/// Run handoff update command
#[allow(clippy::too_many_arguments)]
fn run_handoff_update(
    id: &str,
    status: Option<HandoffStatus>,
    phase: Option<Phase>,
    agent: Option<String>,
    next: Option<String>,
    checkpoint: Option<String>,
    refs: Option<Vec<String>>,
    blocked_by: Option<Vec<String>>,
) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let patch = HandoffPatch {
        status,
        phase,
        agent,
        next_steps: next,
        checkpoint,
        refs,
        blocked_by,
    };
    let handoff = store.update(id, patch)?;

    println!(
        "{} [{}] {} {}",
        "Updated".green().bold(),
        handoff.id,
        handoff.title,
        format!("({} / {})", handoff.status, handoff.phase).dimmed()
    );

    Ok(())
}

/// Run handoff tried command
fn run_handoff_tried(id: &str, outcome: AttemptOutcome, description: &str) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let handoff = store.tried(id, outcome, description)?;

    println!(
        "{} [{}] {} {}",
        "Recorded attempt".green().bold(),
        handoff.id,
        colored_outcome(outcome),
        truncate(description, 60),
    );

    Ok(())
}

/// Run handoff context command - attach a structured JSON payload
fn run_handoff_context(id: &str, json: Option<String>) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);

    let text = read_json_input(json)?;
    let context: HandoffContext = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Invalid context JSON: {}", e))?;
    let handoff = store.attach_context(id, context)?;

    println!("{} [{}]", "Attached context to".green().bold(), handoff.id);

    Ok(())
}

/// Run handoff complete command
fn run_handoff_complete(id: &str) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let handoff = store.complete(id)?;

    println!("{} [{}] {}", "Completed".green().bold(), handoff.id, handoff.title);

    Ok(())
}

/// Run handoff archive command
fn run_handoff_archive() -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let moved = store.archive()?;

    println!(
        "Archived {} completed handoffs",
        moved.to_string().green().bold()
    );

    Ok(())
}

/// Run handoff delete command
fn run_handoff_delete(id: &str) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let handoff = store.delete(id)?;

    println!("{} [{}] {}", "Deleted".red().bold(), handoff.id, handoff.title);

    Ok(())
}

/// Run handoff list command
fn run_handoff_list(all: bool) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let live = store.list()?;

    println!("{}", "=== Handoffs ===".cyan().bold());
    println!();

    if live.is_empty() {
        println!("{}", "No handoffs recorded.".dimmed());
    }
    for handoff in &live {
        print_handoff_line(handoff);
    }

    if all {
        let archived = store.list_archive()?;
        if !archived.is_empty() {
            println!();
            println!("{}", "=== Archived ===".cyan().bold());
            println!();
            for handoff in &archived {
                print_handoff_line(handoff);
            }
        }
    }

    Ok(())
}

/// Run handoff inject command - prints the retention view payload
fn run_handoff_inject() -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let report = store.inject()?;

    print!("{}", report.to_markdown());

    Ok(())
}

/// Run handoff sync-todos command
fn run_sync_todos(id: &str, json: Option<String>) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);

    let text = read_json_input(json)?;
    let items: Vec<TodoItem> = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Invalid todo JSON: {}", e))?;
    let handoff = store.sync_todos(id, &items)?;

    println!(
        "{} {} todos into [{}]",
        "Synced".green().bold(),
        items.len(),
        handoff.id
    );
    if !handoff.checkpoint.is_empty() {
        println!(
            "  {}",
            format!("checkpoint: {}", truncate(&handoff.checkpoint, 70)).dimmed()
        );
    }
    if !handoff.next_steps.is_empty() {
        println!(
            "  {}",
            format!("next: {}", truncate(&handoff.next_steps, 70)).dimmed()
        );
    }

    Ok(())
}

/// Run handoff inject-todos command - emits the todo list as JSON on stdout
fn run_inject_todos(id: &str) -> anyhow::Result<()> {
    let store = HandoffStore::new(Config::from_env()?);
    let items = store.inject_todos(id)?;

    println!("{}", serde_json::to_string(&items)?);

    Ok(())
}

// ============================================================================
// TRANSCRIPT SCAN
// ============================================================================

/// Run scan command
fn run_scan(transcript: &PathBuf) -> anyhow::Result<()> {
    let scanner = TranscriptScanner::new(Config::from_env()?);
    let report = scanner.scan(transcript)?;

    println!("{}", "=== Transcript Scan ===".cyan().bold());
    println!();

    if report.full_scan {
        println!("{}", "No checkpoint found; scanned the whole transcript.".dimmed());
    }
    if report.corrupt_checkpoint {
        println!(
            "{}",
            "Checkpoint was unreadable; extraction skipped, checkpoint re-anchored.".yellow()
        );
    }

    println!("{}: {}", "Events".white().bold(), report.events);
    println!("{}: {}", "Citations Applied".white().bold(), report.cited);
    println!("{}: {}", "Unknown Citations".white().bold(), report.unknown_citations);
    println!("{}: {}", "Directives Applied".white().bold(), report.directives_applied);
    if report.directives_failed > 0 {
        println!("{}: {}", "Directives Failed".yellow().bold(), report.directives_failed);
    }
    if report.promotions > 0 {
        println!("{}: {}", "Promotions".green().bold(), report.promotions);
    }
    if report.orphans_removed > 0 {
        println!(
            "{}: {}",
            "Orphan Checkpoints Removed".white().bold(),
            report.orphans_removed
        );
    }

    Ok(())
}

// ============================================================================
// DISPLAY HELPERS
// ============================================================================

/// Print a handoff in full detail
fn print_handoff(handoff: &Handoff) {
    println!("{}", format!("=== Handoff {} ===", handoff.id).cyan().bold());
    println!();

    println!("{}: {}", "Title".white().bold(), handoff.title);
    println!("{}: {}", "Status".white().bold(), colored_status(handoff.status));
    println!("{}: {}", "Phase".white().bold(), handoff.phase);
    println!("{}: {}", "Agent".white().bold(), handoff.agent);
    println!(
        "{}: {} (updated {})",
        "Created".white().bold(),
        handoff.created,
        handoff.updated
    );
    println!();
    println!("{}", handoff.description);

    if !handoff.refs.is_empty() {
        println!("{}: {}", "Refs".white().bold(), handoff.refs.join(", "));
    }
    if !handoff.blocked_by.is_empty() {
        println!("{}: {}", "Blocked by".yellow().bold(), handoff.blocked_by.join(", "));
    }
    if !handoff.checkpoint.is_empty() {
        println!("{}: {}", "Checkpoint".white().bold(), handoff.checkpoint);
    }
    if !handoff.next_steps.is_empty() {
        println!("{}: {}", "Next steps".white().bold(), handoff.next_steps);
    }

    if !handoff.tried.is_empty() {
        println!();
        println!("{}", "Attempts:".white().bold());
        for attempt in &handoff.tried {
            println!("  {} {}", colored_outcome(attempt.outcome), attempt.description);
        }
    }

    if let Some(context) = &handoff.context {
        println!();
        println!("{}", "Context:".white().bold());
        if !context.summary.is_empty() {
            println!("  {}", context.summary);
        }
        print_context_list("Critical files", &context.critical_files);
        print_context_list("Recent changes", &context.recent_changes);
        print_context_list("Learnings", &context.learnings);
        print_context_list("Blockers", &context.blockers);
    }
}

/// Print a one-line handoff summary
fn print_handoff_line(handoff: &Handoff) {
    println!(
        "[{}] {} {} {}",
        handoff.id,
        colored_status(handoff.status),
        handoff.title.white().bold(),
        format!("({}, updated {})", handoff.phase, handoff.updated).dimmed(),
    );
    if !handoff.next_steps.is_empty() {
        println!(
            "  {}",
            format!("next: {}", truncate(&handoff.next_steps, 70)).dimmed()
        );
    }
}

/// Print one labeled context list, skipping empty ones
fn print_context_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {}:", label.dimmed());
    for item in items {
        println!("    - {}", item);
    }
}

/// Color a status by how much attention it needs
fn colored_status(status: HandoffStatus) -> ColoredString {
    match status {
        HandoffStatus::NotStarted => status.to_string().white(),
        HandoffStatus::InProgress => status.to_string().cyan(),
        HandoffStatus::Blocked => status.to_string().red(),
        HandoffStatus::ReadyForReview => status.to_string().yellow(),
        HandoffStatus::Completed => status.to_string().green(),
    }
}

/// Color an attempt outcome
fn colored_outcome(outcome: AttemptOutcome) -> ColoredString {
    match outcome {
        AttemptOutcome::Success => outcome.to_string().green(),
        AttemptOutcome::Fail => outcome.to_string().red(),
        AttemptOutcome::Partial => outcome.to_string().yellow(),
    }
}

/// Read a JSON payload from the argument, or stdin when absent
fn read_json_input(json: Option<String>) -> anyhow::Result<String> {
    match json {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
