//! Terminal front end for the review session
//!
//! Immediate-mode rendering of the two view modes plus the hit-test data the
//! mouse handler needs: every draw records where page tiles, the focused
//! surface, and annotation markers ended up on screen.

use std::collections::HashMap;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::anchor::{PixelPoint, SurfaceDimensions};
use crate::editor::InputSession;
use crate::session::ReviewSession;
use crate::view_state::ViewMode;

const GRID_COLUMNS: u16 = 4;
const TILE_HEIGHT: u16 = 6;
const INPUT_WIDTH: u16 = 34;
const INPUT_HEIGHT: u16 = 3;

/// Marker glyph that doubles as the delete control of an annotation.
const DELETE_GLYPH: char = '\u{00d7}';

/// Per-frame layout bookkeeping for hit-testing and scrolling.
#[derive(Debug, Default)]
pub struct UiState {
    overview_scroll: u16,
    pending_scroll: Option<u32>,
    page_tiles: Vec<(u32, Rect)>,
    focused_surface: Option<(u32, Rect)>,
    annotation_markers: Vec<(String, Rect)>,
    page_errors: HashMap<u32, String>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_scroll_to(&mut self, page: u32) {
        self.pending_scroll = Some(page);
    }

    pub fn set_page_error(&mut self, page: u32, message: String) {
        self.page_errors.insert(page, message);
    }

    pub fn clear_page_errors(&mut self) {
        self.page_errors.clear();
    }

    /// Which overview tile sits under the pointer.
    pub fn page_at(&self, column: u16, row: u16) -> Option<u32> {
        let position = Position::new(column, row);
        self.page_tiles
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(page, _)| *page)
    }

    /// Which annotation marker sits under the pointer, and whether the hit
    /// landed on its delete glyph.
    pub fn annotation_at(&self, column: u16, row: u16) -> Option<(String, bool)> {
        let position = Position::new(column, row);
        self.annotation_markers
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(id, rect)| (id.clone(), column == rect.x))
    }

    /// Translate a pointer position inside the focused surface into surface
    /// pixels, using the page's current rendered dimensions.
    pub fn surface_pixel_at(
        &self,
        column: u16,
        row: u16,
        session: &ReviewSession,
    ) -> Option<(u32, PixelPoint)> {
        let (page, inner) = self.focused_surface?;
        if !inner.contains(Position::new(column, row)) {
            return None;
        }
        let dims = session.registry().dimensions(page)?;
        let fx = f64::from(column - inner.x) / f64::from(inner.width.max(1));
        let fy = f64::from(row - inner.y) / f64::from(inner.height.max(1));
        Some((page, PixelPoint::new(fx * dims.width_px, fy * dims.height_px)))
    }
}

pub fn draw(frame: &mut Frame, session: &ReviewSession, ui: &mut UiState) {
    ui.page_tiles.clear();
    ui.annotation_markers.clear();
    ui.focused_surface = None;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, session, chunks[0]);

    if !session.view().has_document() {
        draw_empty_state(frame, chunks[1]);
    } else {
        match session.mode() {
            ViewMode::Overview { highlighted_page } => {
                draw_overview(frame, session, ui, chunks[1], highlighted_page);
            }
            ViewMode::Focused { page } => {
                draw_focused(frame, session, ui, chunks[1], page);
            }
        }
    }

    draw_footer(frame, session, chunks[2]);
}

fn draw_header(frame: &mut Frame, session: &ReviewSession, area: Rect) {
    let (title_line, mode_line) = match session.assignments().current() {
        Some(assignment) => {
            let grade = assignment
                .grade
                .as_deref()
                .map(|g| format!(", grade {g}"))
                .unwrap_or_default();
            let title = format!(
                " {} - {} [{}{}]  ({})",
                assignment.student_name,
                assignment.title,
                assignment.status.as_str(),
                grade,
                session.assignments().position_label(),
            );
            let mode = match session.mode() {
                ViewMode::Overview { highlighted_page } => format!(
                    " Overview - page {highlighted_page} selected, Enter to focus"
                ),
                ViewMode::Focused { .. } => format!(
                    " {}",
                    session.page_info().unwrap_or_default()
                ),
            };
            (title, mode)
        }
        None => (" No assignment loaded".to_string(), String::new()),
    };

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            title_line,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(mode_line, Style::default().fg(Color::Cyan))),
    ])
    .block(Block::default().borders(Borders::BOTTOM));

    frame.render_widget(header, area);
}

fn draw_empty_state(frame: &mut Frame, area: Rect) {
    let prompt = Paragraph::new("No document loaded.\nPoint --assignments-dir at a folder of PDF files to get started.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(prompt, area);
}

fn draw_overview(
    frame: &mut Frame,
    session: &ReviewSession,
    ui: &mut UiState,
    area: Rect,
    highlighted_page: u32,
) {
    let total_pages = session.view().total_pages();
    let tile_width = (area.width / GRID_COLUMNS).max(10);
    let visible_rows = (area.height / TILE_HEIGHT).max(1);

    if let Some(target) = ui.pending_scroll.take() {
        let target_row = ((target - 1) / u32::from(GRID_COLUMNS)) as u16;
        if target_row < ui.overview_scroll {
            ui.overview_scroll = target_row;
        } else if target_row >= ui.overview_scroll + visible_rows {
            ui.overview_scroll = target_row - visible_rows + 1;
        }
    }

    for page in 1..=total_pages {
        let index = page - 1;
        let grid_row = (index / u32::from(GRID_COLUMNS)) as u16;
        let grid_col = (index % u32::from(GRID_COLUMNS)) as u16;
        if grid_row < ui.overview_scroll || grid_row >= ui.overview_scroll + visible_rows {
            continue;
        }
        let tile = Rect::new(
            area.x + grid_col * tile_width,
            area.y + (grid_row - ui.overview_scroll) * TILE_HEIGHT,
            tile_width.min(area.width.saturating_sub(grid_col * tile_width)),
            TILE_HEIGHT.min(area.height.saturating_sub((grid_row - ui.overview_scroll) * TILE_HEIGHT)),
        );
        if tile.width == 0 || tile.height == 0 {
            continue;
        }
        ui.page_tiles.push((page, tile));

        let highlighted = page == highlighted_page;
        let border_style = if highlighted {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut lines = Vec::new();
        let note_count = session.editor().annotations().for_page(page).len();
        if note_count > 0 {
            lines.push(Line::from(format!(" {note_count} note(s)")));
        }
        if let Some(error) = ui.page_errors.get(&page) {
            lines.push(Line::from(Span::styled(
                format!(" render failed: {error}"),
                Style::default().fg(Color::Red),
            )));
        }

        let block = Block::default()
            .title(format!(" Page {page} "))
            .borders(Borders::ALL)
            .border_style(border_style);
        frame.render_widget(Paragraph::new(lines).block(block), tile);
    }
}

fn draw_focused(
    frame: &mut Frame,
    session: &ReviewSession,
    ui: &mut UiState,
    area: Rect,
    page: u32,
) {
    // Focused mode shows one page; a scroll request is satisfied trivially.
    ui.pending_scroll = None;

    let block = Block::default()
        .title(format!(" Page {page} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = ui.page_errors.get(&page) {
        let placeholder = Paragraph::new(format!("Could not render this page: {error}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, inner);
        return;
    }

    let Some(dims) = session.registry().dimensions(page) else {
        let waiting = Paragraph::new("Rendering...")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(waiting, inner);
        return;
    };
    ui.focused_surface = Some((page, inner));

    for placement in session.placements_for_page(page) {
        let (col, row) = pixel_to_cell(placement.pixel, dims, inner);
        let first_line = placement.text.lines().next().unwrap_or("");
        let label = format!("{DELETE_GLYPH} {first_line}");
        let max_width = u16::try_from(label.chars().count())
            .unwrap_or(u16::MAX)
            .min(inner.right().saturating_sub(col));
        if max_width == 0 {
            continue;
        }
        let marker_area = Rect::new(col, row, max_width, 1);
        let style = if placement.dragging {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Black).bg(Color::LightYellow)
        };
        let shown: String = label.chars().take(usize::from(max_width)).collect();
        frame.render_widget(Paragraph::new(shown).style(style), marker_area);
        ui.annotation_markers.push((placement.id, marker_area));
    }

    if let Some(input) = session.input() {
        draw_input(frame, session, input, dims, inner);
    }
}

fn draw_input(
    frame: &mut Frame,
    session: &ReviewSession,
    input: &InputSession,
    dims: SurfaceDimensions,
    inner: Rect,
) {
    let pixel = match input {
        InputSession::Create { anchor, .. } => anchor.resolve(dims),
        InputSession::Edit { id, .. } => {
            let Some(annotation) = session.editor().annotations().get(id) else {
                return;
            };
            annotation.anchor.resolve(dims)
        }
    };
    let (col, row) = pixel_to_cell(pixel, dims, inner);
    let popup = Rect::new(
        col.min(inner.right().saturating_sub(INPUT_WIDTH)),
        row.min(inner.bottom().saturating_sub(INPUT_HEIGHT)),
        INPUT_WIDTH.min(inner.width),
        INPUT_HEIGHT.min(inner.height),
    );

    frame.render_widget(Clear, popup);
    let text = format!("{}\u{258f}", input.buffer());
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" note (Enter saves, Esc cancels) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(widget, popup);
}

fn draw_footer(frame: &mut Frame, session: &ReviewSession, area: Rect) {
    let hints = if session.input().is_some() {
        " Enter save | Shift+Enter newline | Esc cancel"
    } else if session.view().is_overview() {
        " arrows move | Enter focus | [ ] assignment | r reviewed | q quit"
    } else {
        " \u{2190}\u{2192} page | +/- zoom | click annotate | right-click edit | Esc overview | q quit"
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn pixel_to_cell(pixel: PixelPoint, dims: SurfaceDimensions, inner: Rect) -> (u16, u16) {
    let fx = (pixel.x / dims.width_px).clamp(0.0, 1.0);
    let fy = (pixel.y / dims.height_px).clamp(0.0, 1.0);
    let col = inner.x + (fx * f64::from(inner.width.saturating_sub(1))).round() as u16;
    let row = inner.y + (fy * f64::from(inner.height.saturating_sub(1))).round() as u16;
    (col, row)
}
