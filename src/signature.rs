//! The free-hand signature surface.
//!
//! The surface owns a raster of fixed logical resolution, independent of the size it is
//! displayed at. Pointer events arrive in display coordinates and are rescaled per axis
//! before drawing. Strokes are painted immediately, but the surface only reports its
//! content to the owner (through the save callback) when a stroke ends or when it is cleared.

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::payload::ImagePayload;

/// Logical width of the drawing surface in pixels.
pub const SURFACE_WIDTH: u32 = 800;
/// Logical height of the drawing surface in pixels.
pub const SURFACE_HEIGHT: u32 = 320;
/// Stroke width in logical pixels, with round caps and joins.
pub const STROKE_WIDTH: u32 = 3;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Whether a stroke is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    Idle,
    Drawing,
}

/// Where a pointer event comes from, mouse and touch are handled alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
}

/// A pointer event in coordinates local to the displayed surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f32, y: f32) -> Self {
        PointerEvent { kind, x, y }
    }
}

/// The signature surface, reporting every persisted state through `on_save`.
pub struct SignaturePad<F: FnMut(ImagePayload)> {
    canvas: RgbaImage,
    displayed_size: (f32, f32),
    state: PadState,
    pen: Option<(f32, f32)>,
    last_value: ImagePayload,
    on_save: F,
}

impl<F: FnMut(ImagePayload)> SignaturePad<F> {
    /// Creates a blank surface displayed at its logical resolution.
    pub fn new(on_save: F) -> Self {
        SignaturePad {
            canvas: RgbaImage::new(SURFACE_WIDTH, SURFACE_HEIGHT),
            displayed_size: (SURFACE_WIDTH as f32, SURFACE_HEIGHT as f32),
            state: PadState::Idle,
            pen: None,
            last_value: ImagePayload::empty(),
            on_save,
        }
    }

    /// Creates a surface showing a previously saved signature.
    pub fn with_initial_value(initial_value: &ImagePayload, on_save: F) -> Self {
        let mut pad = SignaturePad::new(on_save);
        pad.load(initial_value);
        pad
    }

    /// Sets the size the surface is currently displayed at. Degenerate sizes are ignored.
    pub fn set_displayed_size(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.displayed_size = (width, height);
        }
    }

    pub fn state(&self) -> PadState {
        self.state
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// True when no pixel of the surface has been painted.
    pub fn is_blank(&self) -> bool {
        self.canvas.pixels().all(|pixel| pixel.0[3] == 0)
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event.kind {
            PointerKind::Down => self.pointer_down(event.x, event.y),
            PointerKind::Move => self.pointer_move(event.x, event.y),
            PointerKind::Up | PointerKind::Leave => self.pointer_up(),
        }
    }

    /// Starts a new stroke at the given display coordinates.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.state = PadState::Drawing;
        self.pen = Some(self.to_logical(x, y));
    }

    /// Extends the current stroke and paints it, ignored while idle.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.state != PadState::Drawing {
            return;
        }
        let target = self.to_logical(x, y);
        if let Some(origin) = self.pen {
            self.stroke_segment(origin, target);
        }
        self.pen = Some(target);
    }

    /// Ends the stroke and persists the whole surface, ignored while idle.
    pub fn pointer_up(&mut self) {
        if self.state != PadState::Drawing {
            return;
        }
        self.state = PadState::Idle;
        self.pen = None;

        match ImagePayload::from_png(&self.canvas) {
            Ok(payload) => {
                self.last_value = payload.clone();
                (self.on_save)(payload);
            }
            Err(error) => log::error!("Unable to persist the signature: {}", error),
        }
    }

    /// Erases the surface and reports an empty signature.
    pub fn clear(&mut self) {
        self.erase();
        self.state = PadState::Idle;
        self.pen = None;
        self.last_value = ImagePayload::empty();
        (self.on_save)(ImagePayload::empty());
    }

    /// Shows a signature supplied by the owner. Nothing happens when the value is the one this
    /// surface produced or received last, and the save callback is never invoked from here.
    /// A payload that fails to decode leaves the current content as it is.
    pub fn load(&mut self, value: &ImagePayload) {
        if *value == self.last_value {
            return;
        }
        self.last_value = value.clone();

        if value.is_empty() {
            self.erase();
            return;
        }
        match value.decode() {
            Ok(image) => {
                self.erase();
                imageops::overlay(&mut self.canvas, &image.to_rgba8(), 0, 0);
            }
            Err(error) => log::warn!("Ignoring an unreadable signature: {}", error),
        }
    }

    fn erase(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn to_logical(&self, x: f32, y: f32) -> (f32, f32) {
        let (displayed_width, displayed_height) = self.displayed_size;
        (
            x * (self.canvas.width() as f32 / displayed_width),
            y * (self.canvas.height() as f32 / displayed_height),
        )
    }

    /// Paints a segment by stamping discs along it, which yields round caps and joins.
    fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        let radius = (STROKE_WIDTH / 2) as i32;
        let (delta_x, delta_y) = (to.0 - from.0, to.1 - from.1);
        let steps = delta_x.abs().max(delta_y.abs()).ceil().max(1.0) as u32;

        for step in 0..=steps {
            let progress = step as f32 / steps as f32;
            let center = (
                (from.0 + delta_x * progress).round() as i32,
                (from.1 + delta_y * progress).round() as i32,
            );
            draw_filled_circle_mut(&mut self.canvas, center, radius, INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn recording_pad() -> (
        SignaturePad<impl FnMut(ImagePayload)>,
        Rc<RefCell<Vec<ImagePayload>>>,
    ) {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let sink = saved.clone();
        let pad = SignaturePad::new(move |payload| sink.borrow_mut().push(payload));
        (pad, saved)
    }

    #[test]
    fn a_tap_saves_exactly_once() {
        let (mut pad, saved) = recording_pad();

        pad.pointer_down(10.0, 10.0);
        assert_eq!(pad.state(), PadState::Drawing);
        pad.pointer_up();

        assert_eq!(pad.state(), PadState::Idle);
        assert_eq!(saved.borrow().len(), 1);
        assert!(!saved.borrow()[0].is_empty());
    }

    #[test]
    fn strokes_are_painted_but_only_persisted_at_the_end() {
        let (mut pad, saved) = recording_pad();

        pad.handle(PointerEvent::new(PointerKind::Down, 100.0, 100.0));
        pad.handle(PointerEvent::new(PointerKind::Move, 150.0, 120.0));
        pad.handle(PointerEvent::new(PointerKind::Move, 200.0, 100.0));
        assert!(!pad.is_blank());
        assert!(saved.borrow().is_empty());

        pad.handle(PointerEvent::new(PointerKind::Leave, 200.0, 100.0));
        assert_eq!(saved.borrow().len(), 1);

        let stored = saved.borrow()[0].decode().unwrap().to_rgba8();
        assert_eq!(stored.get_pixel(150, 120), &INK);
    }

    #[test]
    fn moves_and_releases_while_idle_are_ignored() {
        let (mut pad, saved) = recording_pad();

        pad.pointer_move(30.0, 30.0);
        pad.pointer_up();

        assert!(pad.is_blank());
        assert!(saved.borrow().is_empty());
    }

    #[test]
    fn coordinates_follow_the_displayed_size() {
        let (mut pad, _) = recording_pad();
        // Shown at half the logical width and a quarter of the logical height
        pad.set_displayed_size(400.0, 80.0);

        pad.pointer_down(100.0, 20.0);
        pad.pointer_move(101.0, 20.0);
        pad.pointer_up();

        assert_eq!(pad.canvas().get_pixel(200, 80), &INK);
        assert_eq!(pad.canvas().get_pixel(100, 20).0[3], 0);
    }

    #[test]
    fn clearing_reports_an_empty_signature() {
        let (mut pad, saved) = recording_pad();
        pad.pointer_down(5.0, 5.0);
        pad.pointer_move(50.0, 50.0);
        pad.pointer_up();
        saved.borrow_mut().clear();

        pad.clear();

        assert!(pad.is_blank());
        assert_eq!(saved.borrow().as_slice(), &[ImagePayload::empty()]);
    }

    #[test]
    fn loading_an_external_signature_does_not_call_back() {
        let (mut source, saved) = recording_pad();
        source.pointer_down(20.0, 20.0);
        source.pointer_move(60.0, 40.0);
        source.pointer_up();
        let stored = saved.borrow()[0].clone();

        let (mut pad, reloaded) = recording_pad();
        pad.load(&stored);

        assert!(!pad.is_blank());
        assert_eq!(pad.canvas(), source.canvas());
        assert!(reloaded.borrow().is_empty());
    }

    #[test]
    fn its_own_value_coming_back_is_not_repainted() {
        let (mut pad, saved) = recording_pad();
        pad.pointer_down(20.0, 20.0);
        pad.pointer_move(60.0, 40.0);
        pad.pointer_up();
        let own_value = saved.borrow()[0].clone();

        // Draw more without lifting the value into the owner yet
        pad.pointer_down(300.0, 200.0);
        pad.pointer_move(320.0, 210.0);
        let before = pad.canvas().clone();
        pad.load(&own_value);

        assert_eq!(pad.canvas(), &before);
        assert_eq!(saved.borrow().len(), 1);
    }

    #[test]
    fn unreadable_signatures_keep_the_current_drawing() {
        let (mut pad, saved) = recording_pad();
        pad.pointer_down(20.0, 20.0);
        pad.pointer_move(60.0, 40.0);
        pad.pointer_up();
        let before = pad.canvas().clone();

        pad.load(&ImagePayload::from_data_url("data:image/png;base64,AAAA"));

        assert_eq!(pad.canvas(), &before);
        assert_eq!(saved.borrow().len(), 1);
    }

    #[test]
    fn an_emptied_external_value_blanks_the_surface() {
        let (mut pad, saved) = recording_pad();
        pad.pointer_down(20.0, 20.0);
        pad.pointer_move(60.0, 40.0);
        pad.pointer_up();

        pad.load(&ImagePayload::empty());

        assert!(pad.is_blank());
        assert_eq!(saved.borrow().len(), 1);
    }
}
