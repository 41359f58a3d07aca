//! Stroke capture, forwarding and remote application.
//!
//! The drawer's pointer input becomes [`StrokeEvent`]s that are rendered
//! locally and forwarded. Everyone else renders the strokes the relay
//! forwards. The turn phase decides which direction is live, so a client
//! never renders its own strokes a second time.
//!
//! Strokes carry absolute coordinates. No reordering or deduplication is done
//! here: a lost segment leaves a gap in a line and nothing worse.

use crate::error::ValidationError;
use crate::protocol::StrokeEvent;
use crate::turn::{TurnPhase, TurnStateMachine};

/// Canvas width in pixels.
pub const CANVAS_WIDTH: f64 = 800.0;

/// Canvas height in pixels.
pub const CANVAS_HEIGHT: f64 = 600.0;

/// The eraser paints in the background color.
pub const ERASER_COLOR: &str = "#FFFFFF";

pub const DEFAULT_BRUSH_COLOR: &str = "#000000";

pub const DEFAULT_BRUSH_SIZE: f64 = 3.0;

/// Raster surface the strokes end up on.
pub trait Canvas {
    fn draw_dot(&mut self, x: f64, y: f64, color: &str, size: f64);

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, size: f64);

    /// Wipe to the background color.
    fn clear(&mut self);

    /// Render one stroke.
    fn render(&mut self, stroke: &StrokeEvent) {
        match stroke {
            StrokeEvent::Dot { x, y, color, size } => self.draw_dot(*x, *y, color, *size),
            StrokeEvent::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                size,
            } => self.draw_line(*x1, *y1, *x2, *y2, color, *size),
        }
    }
}

/// Display-list canvas: remembers what was drawn since the last clear.
///
/// Useful headless, and as a replay source for a real raster surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeLog {
    strokes: Vec<StrokeEvent>,
    clears: usize,
}

impl StrokeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strokes drawn since the last clear, oldest first.
    pub fn strokes(&self) -> &[StrokeEvent] {
        &self.strokes
    }

    /// How many times the canvas was wiped.
    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn is_blank(&self) -> bool {
        self.strokes.is_empty()
    }
}

impl Canvas for StrokeLog {
    fn draw_dot(&mut self, x: f64, y: f64, color: &str, size: f64) {
        self.strokes.push(StrokeEvent::Dot {
            x,
            y,
            color: color.to_string(),
            size,
        });
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, size: f64) {
        self.strokes.push(StrokeEvent::Line {
            x1,
            y1,
            x2,
            y2,
            color: color.to_string(),
            size,
        });
    }

    fn clear(&mut self) {
        self.strokes.clear();
        self.clears += 1;
    }
}

/// Current drawing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    color: String,
    size: f64,
    eraser: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: DEFAULT_BRUSH_COLOR.to_string(),
            size: DEFAULT_BRUSH_SIZE,
            eraser: false,
        }
    }
}

impl Brush {
    /// Pick a color. Also switches the eraser off.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStroke`] if `color` is not a hex RGB
    /// string.
    pub fn set_color(&mut self, color: &str) -> Result<(), ValidationError> {
        probe(color, self.size).validate()?;
        self.color = color.to_string();
        self.eraser = false;
        Ok(())
    }

    /// Pick a width in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStroke`] unless `size` is positive.
    pub fn set_size(&mut self, size: f64) -> Result<(), ValidationError> {
        probe(&self.color, size).validate()?;
        self.size = size;
        Ok(())
    }

    /// Flip the eraser and return whether it is now on.
    pub fn toggle_eraser(&mut self) -> bool {
        self.eraser = !self.eraser;
        self.eraser
    }

    pub fn is_eraser(&self) -> bool {
        self.eraser
    }

    /// Color strokes are painted with right now.
    pub fn effective_color(&self) -> &str {
        if self.eraser {
            ERASER_COLOR
        } else {
            &self.color
        }
    }

    pub fn size(&self) -> f64 {
        self.size
    }
}

fn probe(color: &str, size: f64) -> StrokeEvent {
    StrokeEvent::Dot {
        x: 0.0,
        y: 0.0,
        color: color.to_string(),
        size,
    }
}

/// Maps display coordinates onto canvas pixel space.
///
/// The canvas has a fixed pixel size but is usually displayed scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            left: 0.0,
            top: 0.0,
            display_width: CANVAS_WIDTH,
            display_height: CANVAS_HEIGHT,
        }
    }
}

impl CanvasGeometry {
    /// Record where and how large the canvas is displayed.
    #[must_use]
    pub fn with_display_rect(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.left = left;
        self.top = top;
        self.display_width = width;
        self.display_height = height;
        self
    }

    /// Convert a pointer position to canvas pixels.
    ///
    /// A degenerate display size (zero or negative) is treated as unscaled.
    pub fn to_canvas(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        let sx = scale(self.width, self.display_width);
        let sy = scale(self.height, self.display_height);
        ((client_x - self.left) * sx, (client_y - self.top) * sy)
    }
}

fn scale(canvas: f64, display: f64) -> f64 {
    if display > 0.0 && display.is_finite() {
        canvas / display
    } else {
        1.0
    }
}

/// Turns a pointer gesture into strokes: a dot on press, then one line per
/// move from the previous point.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    last: Option<(f64, f64)>,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, brush: &Brush) -> StrokeEvent {
        self.last = Some((x, y));
        StrokeEvent::Dot {
            x,
            y,
            color: brush.effective_color().to_string(),
            size: brush.size(),
        }
    }

    /// `None` unless a gesture is in progress.
    pub fn pointer_move(&mut self, x: f64, y: f64, brush: &Brush) -> Option<StrokeEvent> {
        let (x1, y1) = self.last.replace((x, y))?;
        Some(StrokeEvent::Line {
            x1,
            y1,
            x2: x,
            y2: y,
            color: brush.effective_color().to_string(),
            size: brush.size(),
        })
    }

    /// End the gesture. Also used for pointer-leave and touch-cancel.
    pub fn pointer_up(&mut self) {
        self.last = None;
    }

    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }
}

/// Forwards local strokes and applies remote ones, gated on the turn phase.
#[derive(Debug, Default)]
pub struct DrawRelay<C: Canvas = StrokeLog> {
    canvas: C,
    brush: Brush,
    geometry: CanvasGeometry,
    capture: StrokeCapture,
}

impl<C: Canvas> DrawRelay<C> {
    pub fn new(canvas: C) -> Self {
        Self {
            canvas,
            brush: Brush::default(),
            geometry: CanvasGeometry::default(),
            capture: StrokeCapture::new(),
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn brush_mut(&mut self) -> &mut Brush {
        &mut self.brush
    }

    pub fn set_geometry(&mut self, geometry: CanvasGeometry) {
        self.geometry = geometry;
    }

    /// Render a local stroke and return it for forwarding.
    ///
    /// Returns `None`, leaving the canvas untouched, unless `phase` allows
    /// drawing and the stroke is valid.
    pub fn submit_stroke(&mut self, phase: TurnPhase, stroke: StrokeEvent) -> Option<StrokeEvent> {
        if !phase.can_draw() {
            tracing::debug!(%phase, "local stroke ignored: not the drawer");
            return None;
        }
        if let Err(e) = stroke.validate() {
            tracing::warn!(error = %e, "local stroke rejected");
            return None;
        }
        self.canvas.render(&stroke);
        Some(stroke)
    }

    /// Render a stroke from the relay. Returns `true` if it was drawn.
    pub fn apply_remote_stroke(&mut self, turn: &TurnStateMachine, stroke: &StrokeEvent) -> bool {
        if !turn.accepts_remote_strokes() {
            tracing::debug!(phase = %turn.phase(), "remote stroke ignored");
            return false;
        }
        if let Err(e) = stroke.validate() {
            tracing::warn!(error = %e, "remote stroke rejected");
            return false;
        }
        self.canvas.render(stroke);
        true
    }

    /// Drawer pressed "clear". Returns `true` if a `clear_canvas` frame
    /// should be sent.
    pub fn clear_local(&mut self, phase: TurnPhase) -> bool {
        if !phase.can_draw() {
            tracing::debug!(%phase, "local clear ignored: not the drawer");
            return false;
        }
        self.canvas.clear();
        true
    }

    /// The drawer cleared. Returns `true` if the canvas was wiped.
    pub fn apply_remote_clear(&mut self, turn: &TurnStateMachine) -> bool {
        if !turn.accepts_remote_strokes() {
            tracing::debug!(phase = %turn.phase(), "remote clear ignored");
            return false;
        }
        self.canvas.clear();
        true
    }

    /// Unconditional wipe at a turn boundary. Also abandons any gesture in
    /// progress.
    pub fn wipe(&mut self) {
        self.capture.pointer_up();
        self.canvas.clear();
    }

    /// Pointer pressed at display coordinates.
    pub fn pointer_down(&mut self, phase: TurnPhase, x: f64, y: f64) -> Option<StrokeEvent> {
        if !phase.can_draw() {
            return None;
        }
        let (cx, cy) = self.geometry.to_canvas(x, y);
        let stroke = self.capture.pointer_down(cx, cy, &self.brush);
        self.submit_stroke(phase, stroke)
    }

    /// Pointer moved at display coordinates.
    pub fn pointer_move(&mut self, phase: TurnPhase, x: f64, y: f64) -> Option<StrokeEvent> {
        if !phase.can_draw() {
            self.capture.pointer_up();
            return None;
        }
        let (cx, cy) = self.geometry.to_canvas(x, y);
        let stroke = self.capture.pointer_move(cx, cy, &self.brush)?;
        self.submit_stroke(phase, stroke)
    }

    pub fn pointer_up(&mut self) {
        self.capture.pointer_up();
    }
}
