//! Input Widgets
//!
//! Text entry boxes opened by the ghost. Only the editing state and the
//! events they raise live here; drawing belongs to the windowing backend.
//!
//! Two kinds share one editor:
//! - [`InputWidgetKind::Script`]: sends what was typed as a script and stays
//!   open.
//! - [`InputWidgetKind::NamedEvent`]: reports the text under an event name,
//!   then closes.

use image::Rgba;

use crate::descript::Descript;
use crate::layout::Rect;
use crate::pipeline::{Batch, Request};
use crate::resources::{NAMED_INPUT_SKIN, SCRIPT_INPUT_SKIN};

/// Keys an input widget reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Submit
    Return,
    /// Abandon
    Escape,
    /// Delete before the cursor
    Backspace,
    /// Cursor left
    Left,
    /// Cursor right
    Right,
    /// Anything else (ignored)
    Other,
}

/// What a widget does with its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputWidgetKind {
    /// Script entry
    Script,
    /// Input reported under `event`
    NamedEvent {
        /// Event name or id given by `OpenInputBox`
        event: String,
    },
}

/// One open text entry box
#[derive(Debug, Clone)]
pub struct InputWidget {
    kind: InputWidgetKind,
    text: Vec<char>,
    cursor: usize,
    preedit: String,
    alive: bool,
    color: Rgba<u8>,
    area: Rect,
    drag: Option<(i32, i32)>,
}

impl InputWidget {
    /// Open a widget, taking colour and area from the descript
    #[must_use]
    pub fn new(kind: InputWidgetKind, descript: &Descript) -> Self {
        let channel = |c: &str| {
            let v = descript.get_int(&format!("communicatebox.font.color.{c}"), 0);
            u8::try_from(v.clamp(0, 255)).unwrap_or(0)
        };
        Self {
            kind,
            text: Vec::new(),
            cursor: 0,
            preedit: String::new(),
            alive: true,
            color: Rgba([channel("r"), channel("g"), channel("b"), 0xff]),
            area: Rect::new(
                descript.get_int("communicatebox.x", 0),
                descript.get_int("communicatebox.y", 0),
                descript.get_int("communicatebox.w", 200),
                descript.get_int("communicatebox.h", 20),
            ),
            drag: None,
        }
    }

    /// Widget kind
    #[must_use]
    pub fn kind(&self) -> &InputWidgetKind {
        &self.kind
    }

    /// Skin image for this kind
    #[must_use]
    pub fn skin_file(&self) -> &'static str {
        match self.kind {
            InputWidgetKind::Script => SCRIPT_INPUT_SKIN,
            InputWidgetKind::NamedEvent { .. } => NAMED_INPUT_SKIN,
        }
    }

    /// Committed text
    #[must_use]
    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    /// Cursor index in characters
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Uncommitted IME composition
    #[must_use]
    pub fn preedit(&self) -> &str {
        &self.preedit
    }

    /// Text colour
    #[must_use]
    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    /// Text area within the widget skin, moved by any drag
    #[must_use]
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Whether the widget is still open
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Insert committed text at the cursor
    pub fn input(&mut self, text: &str) {
        for c in text.chars() {
            self.text.insert(self.cursor, c);
            self.cursor += 1;
        }
    }

    /// Replace the IME composition
    pub fn edit(&mut self, text: &str) {
        self.preedit = text.to_string();
    }

    /// Handle a key press, returning any batch to submit
    pub fn key(&mut self, key: Key) -> Option<Batch> {
        match key {
            Key::Return => return self.activate(),
            Key::Escape => return self.cancel(),
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.text.remove(self.cursor);
                }
            }
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
            Key::Other => {}
        }
        None
    }

    /// Submit the current text
    pub fn activate(&mut self) -> Option<Batch> {
        let text = self.text();
        match &self.kind {
            InputWidgetKind::Script => Some(vec![Request::send(text)]),
            InputWidgetKind::NamedEvent { event } => {
                let request = if event.starts_with("On") {
                    Request::notify(event.clone(), vec![text])
                } else {
                    Request::notify("OnUserInput", vec![event.clone(), text])
                };
                self.alive = false;
                Some(vec![request])
            }
        }
    }

    /// Abandon input and close
    pub fn cancel(&mut self) -> Option<Batch> {
        self.alive = false;
        match &self.kind {
            InputWidgetKind::Script => None,
            InputWidgetKind::NamedEvent { event } => Some(vec![Request::notify(
                "OnUserInputCancel",
                vec![event.clone(), "close".to_string()],
            )]),
        }
    }

    /// Primary button pressed at `(x, y)`
    pub fn pointer_press(&mut self, x: i32, y: i32) {
        self.drag = Some((x, y));
    }

    /// Pointer moved to `(x, y)`; drags the widget while pressed
    pub fn pointer_motion(&mut self, x: i32, y: i32) {
        if let Some((ax, ay)) = self.drag {
            self.area.x = self.area.x.saturating_add(x.saturating_sub(ax));
            self.area.y = self.area.y.saturating_add(y.saturating_sub(ay));
            self.drag = Some((x, y));
        }
    }

    /// Primary button released
    pub fn pointer_release(&mut self) {
        self.drag = None;
    }
}
