use std::{
    fs::{self, File},
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use pagemark::anchor::SurfaceDimensions;
use pagemark::assignment::{Assignment, AssignmentQueue};
use pagemark::event_source::{EventSource, TerminalEventSource};
use pagemark::navigation::{RenderOutcome, RenderRequest};
use pagemark::session::{Effect, ReviewSession};
use pagemark::store::MemoryStore;
use pagemark::ui::{self, UiState};

/// US letter at 72 dpi, the stub renderer's base surface
const BASE_PAGE_WIDTH: f64 = 612.0;
const BASE_PAGE_HEIGHT: f64 = 792.0;

#[derive(Parser)]
#[command(name = "pagemark", version, about = "Review and annotate paginated documents")]
struct Args {
    /// Directory of assignment PDF files (named `Student_Title.pdf`)
    #[arg(long)]
    assignments_dir: Option<PathBuf>,

    /// Page count the stub renderer reports for each assignment
    #[arg(long, default_value_t = 8)]
    pages: u32,

    /// Import annotations from a JSON export before starting
    #[arg(long)]
    import: Option<PathBuf>,

    /// Export annotations to this JSON file on exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "pagemark.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {}", args.log_file.display()))?,
    )?;

    let (request_tx, request_rx) = flume::unbounded();
    let (outcome_tx, outcome_rx) = flume::unbounded();
    spawn_stub_renderer(request_rx, outcome_tx);

    let assignments = discover_assignments(args.assignments_dir.as_deref(), args.pages)?;
    info!("starting with {} assignment(s)", assignments.len());

    let mut session = ReviewSession::new(
        request_tx,
        Box::new(MemoryStore::new()),
        AssignmentQueue::new(assignments),
    );
    session.activate_current_assignment();

    if let Some(path) = &args.import {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let imported = session.import_annotations(&json)?;
        info!("imported {imported} annotations from {}", path.display());
    }

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(
        &mut terminal,
        &mut session,
        &outcome_rx,
        &mut TerminalEventSource,
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(path) = &args.export {
        let json = session.export_annotations()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("exported annotations to {}", path.display());
    }

    result
}

/// Stand-in for the external page renderer: answers every request with the
/// base surface scaled by the requested zoom, after a short raster delay so
/// the in-flight zoom guard is observable interactively.
fn spawn_stub_renderer(
    requests: flume::Receiver<RenderRequest>,
    outcomes: flume::Sender<RenderOutcome>,
) {
    thread::spawn(move || {
        while let Ok(request) = requests.recv() {
            thread::sleep(Duration::from_millis(40));
            let scale = f64::from(request.scale);
            let outcome = RenderOutcome {
                ticket: request.ticket,
                page: request.page,
                generation: request.generation,
                result: Ok(SurfaceDimensions::new(
                    BASE_PAGE_WIDTH * scale,
                    BASE_PAGE_HEIGHT * scale,
                )),
            };
            if outcomes.send(outcome).is_err() {
                break;
            }
        }
    });
}

/// Build the review queue from a folder of PDF files, sorted by filename the
/// way the backend lists them. Without a folder, fall back to one demo
/// assignment so the tool starts into something usable.
fn discover_assignments(dir: Option<&Path>, pages: u32) -> Result<Vec<Assignment>> {
    let Some(dir) = dir else {
        return Ok(vec![Assignment::from_filename(
            "Sample_Demo Document.pdf",
            pages,
        )]);
    };
    let mut names: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read assignments dir {}", dir.display()))?
        .filter_map(|entry| {
            let name = entry.ok()?.file_name().to_str()?.to_string();
            name.to_lowercase().ends_with(".pdf").then_some(name)
        })
        .collect();
    names.sort();
    Ok(names
        .iter()
        .map(|name| Assignment::from_filename(name, pages))
        .collect())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut ReviewSession,
    settlements: &flume::Receiver<RenderOutcome>,
    events: &mut dyn EventSource,
) -> Result<()> {
    let mut ui_state = UiState::new();
    loop {
        while let Ok(outcome) = settlements.try_recv() {
            session.render_settled(outcome);
        }

        for effect in session.drain_effects() {
            match effect {
                Effect::ScrollToPage(page) => ui_state.request_scroll_to(page),
                Effect::PageError { page, message } => ui_state.set_page_error(page, message),
                Effect::DocumentLoaded => ui_state.clear_page_errors(),
                Effect::Quit => return Ok(()),
            }
        }

        terminal.draw(|frame| ui::draw(frame, session, &mut ui_state))?;

        if events.poll(Duration::from_millis(50))? {
            match events.read()? {
                Event::Mouse(mouse) => handle_mouse(session, &ui_state, mouse),
                other => session.handle_event(&other),
            }
        }
    }
}

fn handle_mouse(session: &mut ReviewSession, ui_state: &UiState, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if session.view().is_overview() {
                if let Some(page) = ui_state.page_at(mouse.column, mouse.row) {
                    session.page_clicked(page);
                }
            } else if let Some((id, on_delete)) = ui_state.annotation_at(mouse.column, mouse.row) {
                if on_delete {
                    session.annotation_delete_clicked(&id);
                } else {
                    session.annotation_pressed(&id);
                }
            } else if let Some((_, pixel)) =
                ui_state.surface_pixel_at(mouse.column, mouse.row, session)
            {
                if let Err(err) = session.annotate_at(pixel) {
                    warn!("cannot annotate here: {err}");
                }
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if let Some((id, _)) = ui_state.annotation_at(mouse.column, mouse.row) {
                session.annotation_edit_requested(&id);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some((_, pixel)) = ui_state.surface_pixel_at(mouse.column, mouse.row, session) {
                session.pointer_dragged(pixel);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => session.pointer_released(),
        _ => {}
    }
}
