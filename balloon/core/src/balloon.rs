//! Balloon Window Model
//!
//! One [`Balloon`] per side: the side's [`BalloonLayout`] plus the window
//! state around it (rect, drag offset, visibility, raise-on-talk).
//!
//! Nothing here talks to the network. Operations that must tell the ghost
//! something return the [`Batch`]es to submit and the dispatcher queues them.
//!
//! # Position
//!
//! The ghost addresses a balloon by its displayed position. Internally that is
//! split into `rect` (the ghost's base position) and `offset` (how far the
//! user dragged it), and the window is shown at `rect + offset`.

use crate::layout::{BalloonLayout, Rect};
use crate::pipeline::{Batch, Request};
use crate::resources::Resources;

/// In-progress pointer drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    anchor_x: i32,
    anchor_y: i32,
    start_x: i32,
    start_y: i32,
}

/// One balloon side
#[derive(Debug, Clone)]
pub struct Balloon {
    side: i32,
    layout: BalloonLayout,
    rect: Rect,
    offset_x: i32,
    offset_y: i32,
    visible: bool,
    raise: bool,
    pressed: Option<(i32, i32)>,
    drag: Option<Drag>,
}

impl Balloon {
    /// Hidden balloon with an empty layout
    #[must_use]
    pub fn new(side: i32) -> Self {
        Self {
            side,
            layout: BalloonLayout::new(side),
            rect: Rect::default(),
            offset_x: 0,
            offset_y: 0,
            visible: false,
            raise: false,
            pressed: None,
            drag: None,
        }
    }

    /// Side index
    #[must_use]
    pub fn side(&self) -> i32 {
        self.side
    }

    /// The side's layout
    #[must_use]
    pub fn layout(&self) -> &BalloonLayout {
        &self.layout
    }

    /// Mutable access to the side's layout
    pub fn layout_mut(&mut self) -> &mut BalloonLayout {
        &mut self.layout
    }

    /// Base rect as last reported to the ghost
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Drag offset
    #[must_use]
    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    /// Where the window is displayed
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        (
            self.rect.x.saturating_add(self.offset_x),
            self.rect.y.saturating_add(self.offset_y),
        )
    }

    /// Window visibility
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a raise is waiting for the next frame
    #[must_use]
    pub fn raise_pending(&self) -> bool {
        self.raise
    }

    /// Whether a drag is in progress
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Show the window
    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Hide the window
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Move to a displayed position chosen by the ghost
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.rect.x = x.saturating_sub(self.offset_x);
        self.rect.y = y.saturating_sub(self.offset_y);
    }

    /// `1` selects the direction variant of the skin
    pub fn set_direction(&mut self, direction: i32, res: &Resources) {
        self.layout.set_direction(direction == 1, res);
    }

    /// Ask for the window to be raised with the next frame
    pub fn raise_on_talk(&mut self) {
        self.raise = true;
    }

    /// Consume the pending raise
    pub fn take_raise(&mut self) -> bool {
        std::mem::take(&mut self.raise)
    }

    /// Adopt the size of a freshly drawn surface
    ///
    /// On change, reports the new rect and asks the ghost to re-place the
    /// balloon, as two separate batches.
    pub fn resize(&mut self, w: i32, h: i32) -> Vec<Batch> {
        if self.rect.w == w && self.rect.h == h {
            return Vec::new();
        }
        self.rect.w = w;
        self.rect.h = h;
        let r = self.rect;
        vec![
            vec![Request::execute(
                "UpdateBalloonRect",
                strings(&[self.side, r.x, r.y, r.w, r.h]),
            )],
            vec![Request::execute(
                "ResetBalloonPosition",
                strings(&[self.side]),
            )],
        ]
    }

    /// Start dragging from screen point `(px, py)`
    pub fn begin_drag(&mut self, px: i32, py: i32) {
        let (start_x, start_y) = self.position();
        self.drag = Some(Drag {
            anchor_x: px,
            anchor_y: py,
            start_x,
            start_y,
        });
    }

    /// Follow the pointer to screen point `(px, py)`
    ///
    /// Returns the `UpdateBalloonOffset` batch when the window actually moved.
    pub fn drag_to(&mut self, px: i32, py: i32) -> Option<Batch> {
        let drag = self.drag?;
        let x = drag.start_x.saturating_add(px.saturating_sub(drag.anchor_x));
        let y = drag.start_y.saturating_add(py.saturating_sub(drag.anchor_y));
        if (x, y) == self.position() {
            return None;
        }
        self.offset_x = x.saturating_sub(self.rect.x);
        self.offset_y = y.saturating_sub(self.rect.y);
        Some(vec![Request::execute(
            "UpdateBalloonOffset",
            strings(&[self.side, self.offset_x, self.offset_y]),
        )])
    }

    /// Stop dragging
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Primary button pressed at screen point `(px, py)`
    pub fn pointer_press(&mut self, px: i32, py: i32) {
        self.pressed = Some((px, py));
    }

    /// Pointer moved to balloon point `(x, y)`, screen point `(px, py)`
    ///
    /// Motion with the button held starts or continues a drag. Otherwise the
    /// pointer is hit-tested and an enter event is produced when the span
    /// under it changed.
    pub fn pointer_motion(&mut self, x: i32, y: i32, px: i32, py: i32) -> Option<Batch> {
        if let Some((ax, ay)) = self.pressed {
            if self.drag.is_none() {
                self.begin_drag(ax, ay);
            }
            return self.drag_to(px, py);
        }
        if !self.layout.hit(x, y) {
            return None;
        }

        let content = &self.layout.link().content;
        let name = if content.is_anchor {
            "OnAnchorEnter"
        } else {
            "OnChoiceEnter"
        };
        let args = if content.event.is_empty() {
            Vec::new()
        } else {
            link_args(&content.text, &content.event, &content.args)
        };
        Some(vec![Request::notify(name, args)])
    }

    /// Primary button released
    ///
    /// A release that ends a drag does nothing else. A plain click selects the
    /// span under the pointer.
    pub fn pointer_release(&mut self) -> Option<Batch> {
        let was_pressed = self.pressed.take().is_some();
        if self.drag.take().is_some() || !was_pressed {
            return None;
        }
        self.pointer_click()
    }

    /// Select the span under the pointer
    #[must_use]
    pub fn pointer_click(&self) -> Option<Batch> {
        let link = &self.layout.link().content;
        if link.event.is_empty() {
            return None;
        }
        if link.event.starts_with("On") {
            return Some(vec![Request::notify(link.event.clone(), link.args.clone())]);
        }
        if let Some(script) = link.event.strip_prefix("script:") {
            return Some(vec![Request::send(script)]);
        }

        let (ex, plain) = if link.is_anchor {
            ("OnAnchorSelectEx", "OnAnchorSelect")
        } else {
            ("OnChoiceSelectEx", "OnChoiceSelect")
        };
        Some(vec![
            Request::notify(ex, link_args(&link.text, &link.event, &link.args)),
            Request::notify(plain, vec![link.event.clone()]),
        ])
    }

    /// Wheel turned; positive `dy` is away from the user
    pub fn wheel(&mut self, dy: i32, res: &Resources) {
        self.layout.scroll(-dy, res);
    }
}

fn strings(values: &[i32]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

fn link_args(text: &str, event: &str, rest: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(rest.len() + 2);
    args.push(text.to_string());
    args.push(event.to_string());
    args.extend_from_slice(rest);
    args
}
