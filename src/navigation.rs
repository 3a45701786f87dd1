//! Page and zoom command gating
//!
//! Translates page/zoom commands into state-machine transitions and
//! re-render requests for the external renderer, enforcing the
//! at-most-one-in-flight zoom re-render policy.

use anyhow::Result;
use log::{debug, warn};

use crate::anchor::SurfaceDimensions;
use crate::view_state::ViewStateMachine;

/// Zoom scale for the focused page.
#[derive(Debug, Clone, Copy)]
pub struct Zoom {
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Scale change per zoom command step
    pub const STEP: f32 = 0.2;
    /// Minimum allowed scale - below this the page is not usefully visible
    pub const MIN_SCALE: f32 = 0.25;

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    /// Apply a delta to the scale. Returns whether the clamped scale
    /// actually changed.
    pub fn apply_delta(&mut self, delta: f32) -> bool {
        let next = Self::clamp_factor(self.factor + delta);
        if (next - self.factor).abs() < f32::EPSILON {
            return false;
        }
        self.factor = next;
        true
    }

    /// Clamp factor to the valid range, handling NaN/Inf.
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.max(Self::MIN_SCALE)
        }
    }
}

/// Identifies one render request so a late settlement can be matched to it.
pub type RenderTicket = u64;

/// Asynchronous redraw request handed to the external renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub ticket: RenderTicket,
    pub page: u32,
    pub scale: f32,
    pub generation: u64,
}

/// Settlement of a previously issued render request.
#[derive(Debug)]
pub struct RenderOutcome {
    pub ticket: RenderTicket,
    pub page: u32,
    pub generation: u64,
    pub result: Result<SurfaceDimensions>,
}

/// Gates page/zoom commands under the view-state machine and owns the
/// render-request side of the renderer channel.
///
/// At most one zoom-triggered re-render may be in flight at a time; a zoom
/// command arriving while one is outstanding is dropped outright, never
/// queued, so the surface is not torn mid-redraw. Initial page mounts go
/// through the same ticket mechanism but are not guarded: the original
/// behavior only serializes zoom re-renders.
pub struct NavigationController {
    zoom: Zoom,
    render_tx: flume::Sender<RenderRequest>,
    next_ticket: RenderTicket,
    zoom_render_in_flight: Option<RenderTicket>,
    generation: u64,
}

impl NavigationController {
    pub fn new(render_tx: flume::Sender<RenderRequest>) -> Self {
        Self {
            zoom: Zoom::default(),
            render_tx,
            next_ticket: 0,
            zoom_render_in_flight: None,
            generation: 0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    pub fn zoom_render_in_flight(&self) -> bool {
        self.zoom_render_in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move the focused page by `delta`. Rejected outside focused mode or
    /// when the target would leave `[1, total_pages]` - no wrap here, unlike
    /// the overview highlight.
    pub fn change_page(&mut self, view: &mut ViewStateMachine, delta: i64) -> bool {
        let Some(page) = view.focused_page() else {
            debug!("change_page({delta}) rejected: not in focused mode");
            return false;
        };
        let new_page = i64::from(page) + delta;
        if new_page < 1 || new_page > i64::from(view.total_pages()) {
            debug!("change_page({delta}) rejected: page {new_page} out of range");
            return false;
        }
        view.update_focused_page(new_page as u32)
    }

    /// Apply a zoom delta and re-render the focused page at the new scale.
    ///
    /// The scale and any page/zoom labels update synchronously; only the
    /// redraw itself is asynchronous. Returns `false` without touching state
    /// when not focused, when a zoom re-render is still in flight, or when
    /// the clamped scale would not change.
    pub fn change_zoom(&mut self, view: &ViewStateMachine, delta: f32) -> bool {
        let Some(page) = view.focused_page() else {
            debug!("change_zoom({delta}) rejected: not in focused mode");
            return false;
        };
        if self.zoom_render_in_flight.is_some() {
            debug!("change_zoom({delta}) rejected: re-render already in flight");
            return false;
        }
        if !self.zoom.apply_delta(delta) {
            return false;
        }
        if let Some(ticket) = self.issue_request(page) {
            self.zoom_render_in_flight = Some(ticket);
        }
        true
    }

    /// Request an initial render of a page at the current scale, e.g. on
    /// document mount. Not subject to the zoom guard.
    pub fn request_render(&mut self, page: u32) -> Option<RenderTicket> {
        self.issue_request(page)
    }

    /// Feed back a settlement from the renderer. Returns `true` when the
    /// outcome belongs to the current generation and should be applied;
    /// stale settlements only clear nothing and are dropped.
    pub fn render_settled(&mut self, outcome: &RenderOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                "dropping stale render settlement for page {} (generation {} != {})",
                outcome.page, outcome.generation, self.generation
            );
            return false;
        }
        if self.zoom_render_in_flight == Some(outcome.ticket) {
            self.zoom_render_in_flight = None;
        }
        true
    }

    /// Invalidate every outstanding request, e.g. when the assignment is
    /// switched out under them. Pending settlements from the old generation
    /// will be dropped by [`render_settled`](Self::render_settled).
    pub fn bump_generation(&mut self) {
        self.generation += 1;
        self.zoom_render_in_flight = None;
    }

    /// Reset the scale for a freshly loaded document.
    pub fn reset_zoom(&mut self) {
        self.zoom = Zoom::default();
    }

    /// Label for the page/zoom indicator, available only in focused mode.
    pub fn page_info(&self, view: &ViewStateMachine) -> Option<String> {
        let page = view.focused_page()?;
        Some(format!(
            "Page {page} of {} ({}%)",
            view.total_pages(),
            self.zoom.percent()
        ))
    }

    fn issue_request(&mut self, page: u32) -> Option<RenderTicket> {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let request = RenderRequest {
            ticket,
            page,
            scale: self.zoom.factor(),
            generation: self.generation,
        };
        match self.render_tx.send(request) {
            Ok(()) => Some(ticket),
            Err(err) => {
                warn!("renderer unavailable, dropping request for page {page}: {err}");
                None
            }
        }
    }
}
