//! TERMRACE - terminal IT-term typing race
//!
//! Type the term. Or find one with the letter. Keep the combo alive.

mod app;
mod tui;

use app::App;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use termrace::config::GameConfig;
use termrace::game::dictionary::parse_terms;
use termrace::storage::Storage;
use termrace::{
    BuiltinTerms, Clock, DictionaryEntry, DictionaryProvider, EntryFilter, GameSession, RngSource,
    SessionArbitrator, SystemClock, TermDictionary,
};
use tui::Tui;

fn main() -> io::Result<()> {
    let config = GameConfig::load().unwrap_or_else(|e| {
        eprintln!("config: {} (using defaults)", e);
        GameConfig::default()
    });

    if let Ok(dir) = Storage::data_dir() {
        if let Err(e) = termrace::logging::init_file_logging(&dir.join("termrace.log"), &config.log_filter) {
            eprintln!("logging disabled: {}", e);
        }
    }

    let storage = open_storage(&config);
    let dictionary = load_dictionary(&config, storage.as_ref()).map_err(io::Error::other)?;

    let session_id = format!("{}-{}", config.player_name, SystemClock.now_ms());
    let session = GameSession::new(
        Arc::new(dictionary),
        Box::new(RngSource::from_entropy()),
        Arc::new(SystemClock),
    );
    let mut arbitrator = SessionArbitrator::new(session_id.clone(), session, config.player_name.clone());
    // The log gets its own connection; `storage` stays free for the summary row
    if storage.is_some() {
        match Storage::open(config.database_path.as_deref()) {
            Ok(log) => arbitrator = arbitrator.with_log(Box::new(log)),
            Err(e) => tracing::warn!(error = %e, "submission log unavailable"),
        }
    }

    let mut app = App::new(arbitrator, &config);

    let mut terminal = Tui::new()?;
    terminal.enter()?;
    app.start();

    let result = run(&mut terminal, &mut app);

    // Quitting mid-session still closes it
    app.end_session();
    if let Some(storage) = &storage {
        let summary = app.summary();
        if let Err(e) = storage.record_session(&session_id, app.player(), &summary, SystemClock.now_ms()) {
            tracing::warn!(error = %e, "failed to record session");
        }
    }

    // Terminal cleanup happens automatically via Tui::drop
    result
}

/// Main event loop
fn run(terminal: &mut Tui, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_secs(1);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| tui::render(frame, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.quit(),
                        KeyCode::Enter => app.on_submit(),
                        KeyCode::Tab => app.on_pass(),
                        KeyCode::Backspace => app.on_backspace(),
                        KeyCode::Char(c) if !c.is_control() => app.on_char(c),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Open the database, seeding the built-in terms on first run.
/// Play continues without persistence if this fails.
fn open_storage(config: &GameConfig) -> Option<Storage> {
    let mut storage = match Storage::open(config.database_path.as_deref()) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::warn!(error = %e, "storage unavailable, playing without persistence");
            return None;
        }
    };

    match storage.term_count() {
        Ok(0) => {
            let seeded = BuiltinTerms
                .entries(&EntryFilter::all())
                .and_then(|terms| storage.seed_terms(&terms));
            if let Err(e) = seeded {
                tracing::warn!(error = %e, "failed to seed terms");
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to count terms"),
    }
    Some(storage)
}

/// Stored (or built-in) terms plus the optional extra term file.
/// Stored terms win when a word appears in both.
fn load_dictionary(config: &GameConfig, storage: Option<&Storage>) -> Result<TermDictionary, termrace::GameError> {
    let provider: &dyn DictionaryProvider = match storage {
        Some(storage) => storage,
        None => &BuiltinTerms,
    };
    let mut entries = provider.entries(&EntryFilter::all())?;

    if let Some(path) = &config.terms_path {
        let last_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
        match read_extra_terms(path, last_id) {
            Ok(extra) => {
                tracing::info!(path = %path.display(), count = extra.len(), "loaded extra terms");
                entries.extend(extra);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring extra terms"),
        }
    }

    let dictionary = TermDictionary::from_entries(entries);
    if dictionary.is_empty() {
        return Err(termrace::GameError::DictionaryExhausted);
    }
    Ok(dictionary)
}

fn read_extra_terms(path: &Path, id_offset: i64) -> Result<Vec<DictionaryEntry>, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    let mut extra = parse_terms(&data)?;
    for entry in &mut extra {
        entry.id += id_offset;
    }
    Ok(extra)
}
