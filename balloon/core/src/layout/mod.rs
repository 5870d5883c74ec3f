//! Balloon Layout Engine
//!
//! Turns a stream of formatting directives (append text, open/close a link,
//! move the cursor, start a line) into positioned, word-wrapped, scrollable
//! segments for one balloon side.
//!
//! # Coordinates
//!
//! Everything is stored in unscaled skin pixels. Scaling is applied only when
//! a surface is produced.
//!
//! # Placement
//!
//! Each segment's position is derived from its [`Head`] placement:
//! - absolute x/y: offset from the skin origin
//! - relative x: offset from the previous segment's right edge
//! - relative y: offset from the previous segment's *top*
//!
//! # Skin changes
//!
//! [`BalloonLayout::set_id`] does not move stored rectangles. It replays the
//! previous segments through the normal append path so wrapping is decided
//! again against the new skin's wrap column.
//!
//! The engine is owned by the dispatcher and is never shared across threads.

pub mod link;
pub mod segment;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::command::{Axis, CursorUnit};
use crate::resources::{balloon_skin_file, Resources};

pub use link::{Link, LinkContent};
pub use segment::{
    Attributes, Color, Content, ContentKind, Head, LinkBegin, Placement, PlacementMode, Rect,
    Segment, StyleFlag,
};

/// Extra pixels between lines
pub const LINE_SPACING: i32 = 1;

/// Font reference used for balloon-wide metrics
const DEFAULT_FONT: &str = "default";

/// Largest cursor move, in pixels, a single `SetCursorPosition` may make
pub const MAX_CURSOR_OFFSET: f64 = 100_000.0;

/// Layout state of one balloon side
#[derive(Debug, Clone)]
pub struct BalloonLayout {
    side: i32,
    skin_id: Option<i32>,
    direction: bool,
    scroll: i32,
    shown: bool,
    scale: u32,
    segments: Vec<Segment>,
    origin_x: i32,
    origin_y: i32,
    valid_rect: Rect,
    wrap_column: i32,
    dirty: bool,
    link: Link,
}

impl BalloonLayout {
    /// Empty layout with no skin selected
    #[must_use]
    pub fn new(side: i32) -> Self {
        let mut layout = Self {
            side,
            skin_id: None,
            direction: false,
            scroll: 0,
            shown: false,
            scale: 100,
            segments: Vec::new(),
            origin_x: 0,
            origin_y: 0,
            valid_rect: Rect::default(),
            wrap_column: 0,
            dirty: false,
            link: Link::default(),
        };
        layout.clear(true);
        layout
    }

    /// Side this layout belongs to
    #[must_use]
    pub fn side(&self) -> i32 {
        self.side
    }

    /// Selected (even) skin id
    #[must_use]
    pub fn skin_id(&self) -> Option<i32> {
        self.skin_id
    }

    /// Whether the direction variant is in use
    #[must_use]
    pub fn direction(&self) -> bool {
        self.direction
    }

    /// Current scroll offset in pixels
    #[must_use]
    pub fn scroll_offset(&self) -> i32 {
        self.scroll
    }

    /// Whether the layout has content to show
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Display scale in percent
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Segments in content order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Skin origin
    #[must_use]
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    /// Text area of the skin
    #[must_use]
    pub fn valid_rect(&self) -> Rect {
        self.valid_rect
    }

    /// Column at which text wraps
    #[must_use]
    pub fn wrap_column(&self) -> i32 {
        self.wrap_column
    }

    /// Link span last found under the pointer
    #[must_use]
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Whether something changed since the last [`mark_clean`](Self::mark_clean)
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge the current state as drawn
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Concatenated text of every text segment
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.is_text())
            .map(|s| s.content.data.as_str())
            .collect()
    }

    /// Bottom edge of the lowest segment
    #[must_use]
    pub fn content_height(&self) -> i32 {
        self.segments
            .iter()
            .map(|s| s.position.bottom())
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// Make the content visible
    pub fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.dirty = true;
        }
    }

    /// Hide the content
    pub fn hide(&mut self) {
        if self.shown {
            self.shown = false;
            self.dirty = true;
        }
    }

    /// Change the display scale
    pub fn set_scale(&mut self, scale: u32) {
        if self.scale != scale {
            self.scale = scale;
            self.dirty = true;
        }
    }

    /// Force a redraw on the next tick
    pub fn touch(&mut self) {
        self.dirty = true;
    }

    /// Drop the skin selection
    pub fn unset_skin(&mut self) {
        self.skin_id = None;
        self.dirty = true;
    }

    /// Discard content
    ///
    /// With `initialize`, every segment goes and a fresh one starts at the
    /// origin. Without it, only the newest segment's attributes survive, in a
    /// single segment placed back at the origin.
    pub fn clear(&mut self, initialize: bool) {
        if initialize {
            self.segments.clear();
            self.new_buffer(true);
        } else {
            self.new_buffer(true);
            self.place(Axis::X, 0, true);
            self.place(Axis::Y, 0, true);
            if let Some(last) = self.segments.pop() {
                self.segments.clear();
                self.segments.push(last);
            }
        }
        self.scroll = 0;
        self.link = Link::default();
        self.dirty = true;
    }

    /// Select a skin and re-flow the content for it
    ///
    /// Odd ids are rounded down to their even base. The origin, valid
    /// rectangle and wrap column come from the descript; negative values count
    /// from the far edge of the skin image. A missing skin leaves everything
    /// as it was.
    pub fn set_id(&mut self, id: i32, res: &Resources) {
        let base = (id / 2) * 2;
        let file = balloon_skin_file(self.side, base, self.direction);
        let Some(skin) = res.skins.skin(&file) else {
            warn!(side = self.side, file = %file, "Balloon skin not found");
            return;
        };
        let (width, height) = dimensions(&skin);
        self.skin_id = Some(base);

        let d = &res.descript;
        let from_far_edge = |v: i32, extent: i32, inclusive: bool| {
            if v < 0 || (inclusive && v == 0) {
                v + extent
            } else {
                v
            }
        };

        self.origin_x = from_far_edge(d.get_int("origin.x", 0), width, false);
        self.origin_y = from_far_edge(d.get_int("origin.y", 0), height, false);

        let left = from_far_edge(d.get_int("validrect.left", 0), width, false);
        let top = from_far_edge(d.get_int("validrect.top", 0), height, false);
        let right = from_far_edge(d.get_int("validrect.right", 0), width, true);
        let bottom = from_far_edge(d.get_int("validrect.bottom", 0), height, true);
        self.valid_rect = Rect::new(left, top, right - left, bottom - top);

        self.wrap_column = from_far_edge(d.get_int("wordwrappoint.x", 0), width, true);

        debug!(side = self.side, skin = base, wrap = self.wrap_column, "Skin selected");
        self.reconfigure(res);
        self.dirty = true;
    }

    /// Switch between the base skin and its direction variant
    pub fn set_direction(&mut self, direction: bool, res: &Resources) {
        if self.direction == direction {
            return;
        }
        self.direction = direction;
        if let Some(id) = self.skin_id {
            self.set_id(id, res);
        }
        self.dirty = true;
    }

    /// Rebuild every segment by replaying the previous ones
    fn reconfigure(&mut self, res: &Resources) {
        let previous = std::mem::take(&mut self.segments);
        self.link = Link::default();

        for old in previous {
            if old.head.line_start {
                self.new_buffer(true);
                self.replace_head(old.head.clone());
            } else if old.head.link_begin.is_some() || old.head.link_end {
                self.new_buffer(false);
                self.replace_head(old.head.clone());
            } else {
                let continues = self.segments.last().is_some_and(|last| {
                    last.is_text()
                        && old.is_text()
                        && last.content.attributes == old.content.attributes
                });
                if !continues {
                    self.new_buffer(false);
                    self.calculate_position();
                }
            }

            if let Some(last) = self.segments.last_mut() {
                last.content.attributes = old.content.attributes.clone();
            }
            if old.is_text() {
                let mut buf = [0u8; 4];
                for c in old.content.data.chars() {
                    self.append_text(c.encode_utf8(&mut buf), res);
                }
            }
        }

        if self.segments.is_empty() {
            self.new_buffer(true);
        }
    }

    fn replace_head(&mut self, head: Head) {
        if let Some(last) = self.segments.last_mut() {
            last.head = head;
        }
        self.calculate_position();
    }

    /// Start a new segment
    ///
    /// The first segment anchors absolutely at the origin. Later ones chain to
    /// the previous segment's right edge and inherit its attributes.
    pub fn new_buffer(&mut self, line_start: bool) {
        self.dirty = true;
        let segment = match self.segments.last() {
            None => Segment {
                position: Rect::new(self.origin_x, self.origin_y, 0, 0),
                content: Content::default(),
                head: Head {
                    line_start,
                    x: Placement::absolute(self.origin_x),
                    y: Placement::absolute(self.origin_y),
                    link_begin: None,
                    link_end: false,
                },
            },
            Some(last) => Segment {
                position: Rect::new(last.position.right(), last.position.y, 0, 0),
                content: Content {
                    kind: ContentKind::Undefined,
                    data: String::new(),
                    attributes: last.content.attributes.clone(),
                },
                head: Head {
                    line_start,
                    x: Placement::relative(0),
                    y: Placement::relative(0),
                    link_begin: None,
                    link_end: false,
                },
            },
        };
        self.segments.push(segment);
    }

    /// Resolve the newest segment's position from its placement
    fn calculate_position(&mut self) {
        let (origin_x, origin_y) = (self.origin_x, self.origin_y);
        let n = self.segments.len();
        let previous = if n >= 2 {
            Some(self.segments[n - 2].position)
        } else {
            None
        };
        let Some(last) = self.segments.last_mut() else {
            return;
        };

        match previous {
            None => {
                last.head.x.value = origin_x;
                last.head.y.value = origin_y;
                last.position.x = origin_x;
                last.position.y = origin_y;
            }
            Some(prev) => {
                last.position.x = match last.head.x.mode {
                    PlacementMode::Absolute => origin_x.saturating_add(last.head.x.value),
                    PlacementMode::Relative => prev.right().saturating_add(last.head.x.value),
                };
                last.position.y = match last.head.y.mode {
                    PlacementMode::Absolute => origin_y.saturating_add(last.head.y.value),
                    PlacementMode::Relative => prev.y.saturating_add(last.head.y.value),
                };
            }
        }
    }

    /// Append text, wrapping when the line would pass the wrap column
    ///
    /// Selects skin 0 first if no skin has been chosen yet.
    pub fn append_text(&mut self, text: &str, res: &Resources) {
        if text.is_empty() {
            return;
        }
        if self.skin_id.is_none() {
            self.set_id(0, res);
        }
        self.dirty = true;

        let Some((kind, font)) = self
            .segments
            .last()
            .map(|l| (l.content.kind, l.content.attributes.font.clone()))
        else {
            return;
        };

        match kind {
            ContentKind::Image => {
                self.new_buffer(false);
                self.start_text(text, &font, res);
            }
            ContentKind::Undefined => self.start_text(text, &font, res),
            ContentKind::Text => {
                let joined = match self.segments.last() {
                    Some(last) => format!("{}{text}", last.content.data),
                    None => text.to_string(),
                };
                let (width, _) = res.fonts.measure(&font, &joined);
                if width <= self.wrap_column.saturating_sub(self.origin_x) {
                    if let Some(last) = self.segments.last_mut() {
                        last.content.data = joined;
                        last.position.w = width;
                    }
                } else {
                    self.new_buffer(false);
                    self.set_cursor_position(Axis::X, 0.0, true, CursorUnit::Px, res);
                    self.set_cursor_position(Axis::Y, 1.0, false, CursorUnit::Lh, res);
                    self.start_text(text, &font, res);
                }
            }
        }

        self.scroll_to_bottom(res);
    }

    fn start_text(&mut self, text: &str, font: &str, res: &Resources) {
        if let Some(last) = self.segments.last_mut() {
            last.content.kind = ContentKind::Text;
            last.content.data = text.to_string();
        }
        self.calculate_position();
        let (width, _) = res.fonts.measure(font, text);
        let height = res.fonts.line_height(font);
        if let Some(last) = self.segments.last_mut() {
            last.position.w = width;
            last.position.h = height;
        }
    }

    /// Open a link span
    pub fn append_link_begin(&mut self, is_anchor: bool, event: &str, args: &[String]) {
        self.new_buffer(false);
        if let Some(last) = self.segments.last_mut() {
            last.head.link_begin = Some(LinkBegin {
                is_anchor,
                event: event.to_string(),
                args: args.to_vec(),
            });
        }
    }

    /// Close the open link span
    pub fn append_link_end(&mut self) {
        self.new_buffer(false);
        if let Some(last) = self.segments.last_mut() {
            last.head.link_end = true;
        }
    }

    /// Start a new line segment
    pub fn new_line(&mut self) {
        self.new_buffer(true);
    }

    /// Move the cursor of the newest segment
    ///
    /// `px` values are truncated. `em` multiplies by the width of `"0"` for x
    /// and the line height for y. `lh` uses the line height plus spacing for y.
    /// The result is clamped to [`MAX_CURSOR_OFFSET`] either way.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_cursor_position(
        &mut self,
        axis: Axis,
        value: f64,
        absolute: bool,
        unit: CursorUnit,
        res: &Resources,
    ) {
        let font = self
            .segments
            .last()
            .map_or_else(|| DEFAULT_FONT.to_string(), |l| l.content.attributes.font.clone());
        let digit = f64::from(res.fonts.measure(&font, "0").0);
        let line = f64::from(res.fonts.line_height(&font));

        let px = match (unit, axis) {
            (CursorUnit::Px, _) => value.trunc(),
            (CursorUnit::Em | CursorUnit::Lh, Axis::X) => value * digit,
            (CursorUnit::Em, Axis::Y) => value * line,
            (CursorUnit::Lh, Axis::Y) => value * (line + f64::from(LINE_SPACING)),
        };
        self.place(axis, px.clamp(-MAX_CURSOR_OFFSET, MAX_CURSOR_OFFSET) as i32, absolute);
    }

    fn place(&mut self, axis: Axis, value: i32, absolute: bool) {
        let placement = if absolute {
            Placement::absolute(value)
        } else {
            Placement::relative(value)
        };
        if let Some(last) = self.segments.last_mut() {
            match axis {
                Axis::X => last.head.x = placement,
                Axis::Y => last.head.y = placement,
            }
        }
        self.calculate_position();
        self.dirty = true;
    }

    fn skin_height(&self, res: &Resources) -> Option<i32> {
        let id = self.skin_id?;
        let skin = res
            .skins
            .skin(&balloon_skin_file(self.side, id, self.direction))?;
        Some(dimensions(&skin).1)
    }

    fn scroll_to_bottom(&mut self, res: &Resources) {
        if let Some(height) = self.skin_height(res) {
            self.scroll = self.content_height().saturating_sub(height).max(0);
        }
    }

    /// Scroll by `delta` lines; positive moves toward newer content
    pub fn scroll(&mut self, delta: i32, res: &Resources) {
        let Some(height) = self.skin_height(res) else {
            return;
        };
        let step = res.fonts.line_height(DEFAULT_FONT) + LINE_SPACING;
        self.scroll = self
            .scroll
            .saturating_add(delta.saturating_mul(step))
            .min(self.content_height().saturating_sub(height))
            .max(0);
        self.dirty = true;
    }

    /// Hit-test `(x, y)` in visible balloon coordinates
    ///
    /// Returns `true` when the span under the pointer changed.
    pub fn hit(&mut self, x: i32, y: i32) -> bool {
        let found = link::scan(&self.segments, x, y, self.scroll);
        if found.hit_regions == self.link.hit_regions {
            return false;
        }
        self.link = found;
        self.dirty = true;
        true
    }

    /// Current span rectangles in visible balloon coordinates
    #[must_use]
    pub fn hit_regions(&self) -> Vec<Rect> {
        self.link
            .hit_regions
            .iter()
            .map(|r| Rect::new(r.x, r.y.saturating_sub(self.scroll), r.w, r.h))
            .collect()
    }

    /// Composite the skin and text into a bitmap
    ///
    /// `None` means there is nothing to draw: no skin, hidden, or the skin
    /// image is missing.
    #[must_use]
    pub fn surface(&self, res: &Resources) -> Option<RgbaImage> {
        let id = self.skin_id?;
        if !self.shown {
            return None;
        }
        let file = balloon_skin_file(self.side, id, self.direction);
        let Some(skin) = res.skins.skin(&file) else {
            warn!(side = self.side, file = %file, "Balloon skin not found");
            return None;
        };

        let mut canvas = if self.scale == 100 {
            skin.as_ref().clone()
        } else {
            let (w, h) = skin.dimensions();
            imageops::resize(
                skin.as_ref(),
                (w * self.scale / 100).max(1),
                (h * self.scale / 100).max(1),
                FilterType::Triangle,
            )
        };

        let scale = i64::from(self.scale);
        for segment in self.segments.iter().filter(|s| s.is_text()) {
            if segment.content.data.is_empty() {
                continue;
            }
            let color = resolve_color(segment.content.attributes.color, res);
            let glyphs = res.fonts.render(
                &segment.content.attributes.font,
                &segment.content.data,
                color,
                self.scale,
            );
            let x = i64::from(segment.position.x) * scale / 100;
            let y = (i64::from(segment.position.y) - i64::from(self.scroll)) * scale / 100;
            imageops::overlay(&mut canvas, &glyphs, x, y);
        }
        Some(canvas)
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn dimensions(img: &RgbaImage) -> (i32, i32) {
    (img.width() as i32, img.height() as i32)
}

/// Resolve a colour against the descript
#[must_use]
pub fn resolve_color(color: Color, res: &Resources) -> Rgba<u8> {
    let prefix = match color {
        Color::Rgba(r, g, b, a) => return Rgba([r, g, b, a]),
        Color::Default => "font.color",
        Color::Disable => "disable.font.color",
    };
    let channel = |c: &str| {
        let v = res.descript.get_int(&format!("{prefix}.{c}"), 0);
        u8::try_from(v.clamp(0, 255)).unwrap_or(0)
    };
    Rgba([channel("r"), channel("g"), channel("b"), 0xff])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descript::Descript;
    use crate::resources::{MonospaceFonts, SkinSet};
    use pretty_assertions::assert_eq;

    /// 8x16 cells, 200x100 base skin, 80x100 narrow skin.
    /// Origin (10, 10), wrap column 190 on the base skin (limit 180 = 22 cells).
    fn resources() -> Resources {
        let skins = SkinSet::new()
            .with_blank("balloons0.png", 200, 100)
            .with_blank("balloons1.png", 240, 100)
            .with_blank("balloons2.png", 80, 100);
        let descript = Descript::parse(
            "origin.x,10\norigin.y,10\nwordwrappoint.x,-10\nvalidrect.right,-5\nfont.color.r,200\n",
        );
        Resources::new(Box::new(MonospaceFonts::new(8, 16)), Box::new(skins), descript)
    }

    fn assert_text_pixel(surface: &RgbaImage, x: u32, y: u32) {
        let p = surface.get_pixel(x, y);
        assert_eq!(p[3], 255);
        assert!(p[0].abs_diff(200) <= 1, "red channel {}", p[0]);
        assert_eq!((p[1], p[2]), (0, 0));
    }

    fn texts(layout: &BalloonLayout) -> Vec<&str> {
        layout
            .segments()
            .iter()
            .filter(|s| s.is_text())
            .map(|s| s.content.data.as_str())
            .collect()
    }

    #[test]
    fn test_new_layout_has_single_origin_segment() {
        let layout = BalloonLayout::new(0);
        assert_eq!(layout.segments().len(), 1);
        assert_eq!(layout.skin_id(), None);
        assert!(layout.segments()[0].head.line_start);
        assert_eq!(layout.segments()[0].content.kind, ContentKind::Undefined);
    }

    #[test]
    fn test_first_append_selects_skin_zero() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("Hello", &res);

        assert_eq!(layout.skin_id(), Some(0));
        assert_eq!(layout.origin(), (10, 10));
        assert_eq!(layout.wrap_column(), 190);
        assert_eq!(layout.valid_rect(), Rect::new(0, 0, 195, 100));
        assert_eq!(layout.segments().len(), 1);
        assert_eq!(layout.segments()[0].position, Rect::new(10, 10, 40, 16));
        assert_eq!(texts(&layout), vec!["Hello"]);
    }

    #[test]
    fn test_line_exactly_at_wrap_limit_does_not_wrap() {
        // 10 px cells put the 180 px limit on a cell boundary; the limit is inclusive
        let skins = SkinSet::new().with_blank("balloons0.png", 200, 100);
        let descript = Descript::parse("origin.x,10\norigin.y,10\nwordwrappoint.x,-10\n");
        let res = Resources::new(Box::new(MonospaceFonts::new(10, 16)), Box::new(skins), descript);

        let mut layout = BalloonLayout::new(0);
        layout.append_text(&"A".repeat(17), &res);
        layout.append_text("A", &res);
        assert_eq!(layout.segments().len(), 1);
        assert_eq!(layout.segments()[0].position.right(), 190);

        layout.append_text("B", &res);
        assert_eq!(layout.segments().len(), 2);
        assert_eq!(layout.segments()[1].position, Rect::new(10, 27, 10, 16));
    }

    #[test]
    fn test_text_within_wrap_limit_stays_in_one_segment() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        for _ in 0..22 {
            layout.append_text("A", &res);
        }
        assert_eq!(layout.segments().len(), 1);
        assert_eq!(layout.segments()[0].position.w, 176);
    }

    #[test]
    fn test_text_past_wrap_limit_starts_exactly_one_line() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text(&"A".repeat(22), &res);
        layout.append_text("B", &res);

        assert_eq!(layout.segments().len(), 2);
        let second = &layout.segments()[1];
        assert_eq!(second.head.x, Placement::absolute(0));
        assert_eq!(second.head.y, Placement::relative(16 + LINE_SPACING));
        assert_eq!(second.position, Rect::new(10, 27, 8, 16));
        assert_eq!(second.content.data, "B");
    }

    #[test]
    fn test_relative_y_is_delta_from_previous_top() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("AB", &res);
        layout.new_line();
        layout.set_cursor_position(Axis::Y, 5.0, false, CursorUnit::Px, &res);

        let last = layout.segments().last().unwrap();
        assert!(last.head.line_start);
        assert_eq!(last.position.x, 26);
        assert_eq!(last.position.y, 15);
    }

    #[test]
    fn test_cursor_units() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("x", &res);
        layout.new_line();

        layout.set_cursor_position(Axis::X, 2.0, true, CursorUnit::Em, &res);
        assert_eq!(layout.segments().last().unwrap().head.x, Placement::absolute(16));

        layout.set_cursor_position(Axis::Y, 1.0, true, CursorUnit::Lh, &res);
        assert_eq!(layout.segments().last().unwrap().head.y, Placement::absolute(17));

        layout.set_cursor_position(Axis::Y, 2.0, true, CursorUnit::Em, &res);
        assert_eq!(layout.segments().last().unwrap().head.y, Placement::absolute(32));

        layout.set_cursor_position(Axis::X, 3.7, false, CursorUnit::Px, &res);
        assert_eq!(layout.segments().last().unwrap().head.x, Placement::relative(3));
        assert_eq!(layout.segments().last().unwrap().position.x, 10 + 8 + 3);
    }

    #[test]
    fn test_scroll_offset_stays_clamped() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text(&"A".repeat(22), &res);

        for line in 0..10 {
            layout.append_text(&"B".repeat(22), &res);
            let max = (layout.content_height() - 100).max(0);
            assert_eq!(layout.scroll_offset(), max, "after line {line}");
        }

        let max = layout.content_height() - 100;
        assert!(max > 0);
        for delta in [-1, -3, 2, -100, 100, 1, -1] {
            layout.scroll(delta, &res);
            let s = layout.scroll_offset();
            assert!((0..=max).contains(&s), "scroll {s} outside 0..={max}");
        }
        layout.scroll(-100, &res);
        assert_eq!(layout.scroll_offset(), 0);
        layout.scroll(1, &res);
        assert_eq!(layout.scroll_offset(), 17);

        layout.scroll(i32::MAX, &res);
        assert_eq!(layout.scroll_offset(), max);
        layout.scroll(i32::MIN, &res);
        assert_eq!(layout.scroll_offset(), 0);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("short", &res);
        layout.scroll(5, &res);
        assert_eq!(layout.scroll_offset(), 0);
    }

    #[test]
    fn test_skin_change_preserves_text() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("AB", &res);
        layout.set_id(2, &res);

        assert_eq!(layout.skin_id(), Some(2));
        assert_eq!(layout.text(), "AB");
    }

    #[test]
    fn test_narrow_skin_rewraps_replayed_text() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("ABCDEFGHIJKL", &res);
        assert_eq!(texts(&layout), vec!["ABCDEFGHIJKL"]);

        // 80 wide, wrap at 70, limit 60 = 7 cells
        layout.set_id(3, &res);
        assert_eq!(layout.skin_id(), Some(2));
        assert_eq!(texts(&layout), vec!["ABCDEFG", "HIJKL"]);
        assert_eq!(layout.text(), "ABCDEFGHIJKL");

        layout.set_id(0, &res);
        assert_eq!(texts(&layout), vec!["ABCDEFGHIJKL"]);
    }

    #[test]
    fn test_missing_skin_keeps_previous_selection() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("x", &res);
        layout.set_id(8, &res);
        assert_eq!(layout.skin_id(), Some(0));
    }

    #[test]
    fn test_direction_selects_variant_skin() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("x", &res);
        layout.set_direction(true, &res);

        assert!(layout.direction());
        assert_eq!(layout.skin_id(), Some(0));
        // balloons1.png is 240 wide
        assert_eq!(layout.wrap_column(), 230);
    }

    #[test]
    fn test_soft_clear_keeps_one_segment_at_origin() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text(&"A".repeat(22), &res);
        layout.append_text("B", &res);
        layout.clear(false);

        assert_eq!(layout.segments().len(), 1);
        let only = &layout.segments()[0];
        assert_eq!(only.content.kind, ContentKind::Undefined);
        assert_eq!(only.head.x, Placement::absolute(0));
        assert_eq!(only.head.y, Placement::absolute(0));
        assert_eq!((only.position.x, only.position.y), (10, 10));
        assert_eq!(layout.scroll_offset(), 0);
    }

    #[test]
    fn test_link_hit_reports_span_and_transitions() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("Go ", &res);
        layout.append_link_begin(false, "OnChoice", &["r0".to_string()]);
        layout.append_text("yes", &res);
        layout.append_link_end();
        layout.append_text(" tail", &res);

        assert!(layout.hit(40, 12));
        let link = layout.link();
        assert_eq!(link.content.text, "yes");
        assert_eq!(link.content.event, "OnChoice");
        assert_eq!(link.content.args, vec!["r0".to_string()]);
        assert!(!link.content.is_anchor);
        assert_eq!(layout.hit_regions(), vec![Rect::new(34, 10, 24, 16)]);

        assert!(!layout.hit(41, 13));

        // over text following the span
        assert!(layout.hit(70, 12));
        assert!(!layout.link().is_active());
    }

    #[test]
    fn test_unclosed_link_span_extends_to_end_of_content() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("Q ", &res);
        layout.append_link_begin(true, "http://example.com", &[]);
        layout.append_text("open", &res);
        layout.new_line();
        layout.set_cursor_position(Axis::X, 0.0, true, CursorUnit::Px, &res);
        layout.set_cursor_position(Axis::Y, 1.0, false, CursorUnit::Lh, &res);
        layout.append_text("still", &res);

        // pointer over the second line, far from the opening marker
        assert!(layout.hit(12, 30));
        assert_eq!(layout.link().content.text, "openstill");
        assert!(layout.link().content.is_anchor);

        // pointer outside every segment: nothing reported even though the span is open
        assert!(layout.hit(150, 80));
        assert!(!layout.link().is_active());
    }

    #[test]
    fn test_begin_inside_open_span_merges_runs() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("Go ", &res);
        layout.append_link_begin(false, "first", &["a".to_string()]);
        layout.append_text("AA", &res);
        layout.append_link_begin(false, "second", &["b".to_string()]);
        layout.append_text("BB", &res);
        layout.append_link_end();
        layout.append_text(" tail", &res);

        assert!(layout.hit(40, 12));
        for x in [40, 60] {
            layout.hit(x, 12);
            let link = layout.link();
            assert_eq!(link.content.text, "AABB");
            assert_eq!(link.content.event, "second");
            assert_eq!(link.content.args, vec!["b".to_string()]);
            assert_eq!(
                layout.hit_regions(),
                vec![Rect::new(34, 10, 16, 16), Rect::new(50, 10, 16, 16)]
            );
        }

        assert!(layout.hit(80, 12));
        assert!(!layout.link().is_active());
    }

    #[test]
    fn test_hit_accounts_for_scroll() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        for _ in 0..6 {
            layout.append_text(&"A".repeat(22), &res);
        }
        layout.append_link_begin(false, "OnLast", &[]);
        layout.append_text("Z", &res);
        layout.append_link_end();

        let seg = layout
            .segments()
            .iter()
            .find(|s| s.content.data == "Z")
            .unwrap()
            .position;
        let scroll = layout.scroll_offset();
        assert!(scroll > 0);

        assert!(!layout.hit(seg.x + 1, seg.y + 1 + scroll + 20));
        assert!(layout.hit(seg.x + 1, seg.y - scroll + 1));
        assert_eq!(layout.link().content.event, "OnLast");
    }

    #[test]
    fn test_reconfigure_keeps_link_markers() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_link_begin(true, "OnAnchor", &[]);
        layout.append_text("tap", &res);
        layout.append_link_end();
        layout.set_id(2, &res);

        assert!(layout.segments().iter().any(|s| s.head.link_begin.is_some()));
        assert!(layout.segments().iter().any(|s| s.head.link_end));
        assert_eq!(layout.text(), "tap");
    }

    #[test]
    fn test_surface_requires_shown_skin() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        assert!(layout.surface(&res).is_none());

        layout.append_text("Hi", &res);
        assert!(layout.surface(&res).is_none());

        layout.show();
        let surface = layout.surface(&res).unwrap();
        assert_eq!(surface.dimensions(), (200, 100));
        assert_text_pixel(&surface, 11, 11);
        assert_eq!(surface.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn test_surface_applies_scale() {
        let res = resources();
        let mut layout = BalloonLayout::new(0);
        layout.append_text("Hi", &res);
        layout.show();
        layout.set_scale(200);

        let surface = layout.surface(&res).unwrap();
        assert_eq!(surface.dimensions(), (400, 200));
        assert_text_pixel(&surface, 21, 21);
        assert_eq!(surface.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_explicit_and_disable_colors() {
        let mut res = resources();
        res.descript.set("disable.font.color.g", "128");
        assert_eq!(resolve_color(Color::Rgba(1, 2, 3, 4), &res), Rgba([1, 2, 3, 4]));
        assert_eq!(resolve_color(Color::Disable, &res), Rgba([0, 128, 0, 255]));
        assert_eq!(resolve_color(Color::Default, &res), Rgba([200, 0, 0, 255]));
    }
}
