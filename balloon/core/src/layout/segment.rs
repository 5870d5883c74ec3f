//! Segment data model
//!
//! A balloon's content is an ordered list of [`Segment`]s. Each one carries
//! what to draw ([`Content`]), how it was asked to be placed ([`Head`]), and
//! where it ended up ([`Segment::position`]). Only the layout engine writes
//! positions.

/// Pixel rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl Rect {
    /// Create a rectangle
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Half-open containment test
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }
}

/// What a segment holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentKind {
    /// Nothing yet; the next append decides
    #[default]
    Undefined,
    /// A run of text
    Text,
    /// An inline image
    Image,
}

/// Text colour, resolved at draw time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
    /// Explicit colour
    Rgba(u8, u8, u8, u8),
    /// The skin's `font.color.*`
    #[default]
    Default,
    /// The skin's `disable.font.color.*`
    Disable,
}

/// Tri-state style switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StyleFlag {
    /// Forced on
    On,
    /// Forced off
    Off,
    /// Whatever the skin says
    #[default]
    Default,
}

/// Visual attributes shared by consecutive segments until overridden
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Attributes {
    /// Font path or logical name
    pub font: String,
    /// Explicit font height
    pub height: Option<i32>,
    /// Text colour
    pub color: Color,
    /// Bold
    pub bold: StyleFlag,
    /// Italic
    pub italic: StyleFlag,
    /// Strike-through
    pub strike: StyleFlag,
    /// Underline
    pub underline: StyleFlag,
    /// Superscript
    pub superscript: StyleFlag,
    /// Subscript
    pub subscript: StyleFlag,
    /// Image flows inline with text
    pub inline: bool,
    /// Image ignores transparency
    pub opaque: bool,
    /// Image keeps its own alpha channel
    pub use_own_alpha: bool,
    /// Image does not scroll
    pub fixed: bool,
    /// Image drawn above text
    pub foreground: bool,
    /// Segment marks an embedded protocol marker
    pub protocol_marker: bool,
    /// Clip rectangle
    pub clip: Option<Rect>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            font: "default".to_string(),
            height: None,
            color: Color::Default,
            bold: StyleFlag::Default,
            italic: StyleFlag::Default,
            strike: StyleFlag::Default,
            underline: StyleFlag::Default,
            superscript: StyleFlag::Default,
            subscript: StyleFlag::Default,
            inline: false,
            opaque: false,
            use_own_alpha: false,
            fixed: false,
            foreground: false,
            protocol_marker: false,
            clip: None,
        }
    }
}

/// Segment payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    /// Payload kind
    pub kind: ContentKind,
    /// Text, or image reference
    pub data: String,
    /// Visual attributes
    pub attributes: Attributes,
}

/// Whether a placement value is measured from the origin or the previous segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Offset from the balloon origin
    Absolute,
    /// Offset from the previous segment (right edge for x, top for y)
    Relative,
}

/// Per-axis placement instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Reference point
    pub mode: PlacementMode,
    /// Pixel offset
    pub value: i32,
}

impl Placement {
    /// Absolute placement
    #[must_use]
    pub const fn absolute(value: i32) -> Self {
        Self {
            mode: PlacementMode::Absolute,
            value,
        }
    }

    /// Relative placement
    #[must_use]
    pub const fn relative(value: i32) -> Self {
        Self {
            mode: PlacementMode::Relative,
            value,
        }
    }
}

/// Opening marker of a link span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBegin {
    /// Anchor (`true`) or choice (`false`)
    pub is_anchor: bool,
    /// Event or target raised when selected
    pub event: String,
    /// Extra references
    pub args: Vec<String>,
}

/// Placement and markers attached to a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    /// Segment was started as a new line
    pub line_start: bool,
    /// Horizontal placement
    pub x: Placement,
    /// Vertical placement
    pub y: Placement,
    /// Opens a link span here
    pub link_begin: Option<LinkBegin>,
    /// Closes the open link span here
    pub link_end: bool,
}

/// One positioned content unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Computed rectangle, in unscaled skin pixels
    pub position: Rect,
    /// Payload
    pub content: Content,
    /// Placement and markers
    pub head: Head,
}

impl Segment {
    /// Whether this segment holds text
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.content.kind == ContentKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(10, 20, 5, 4);
        assert!(r.contains(10, 20));
        assert!(r.contains(14, 23));
        assert!(!r.contains(15, 20));
        assert!(!r.contains(10, 24));
        assert!(!Rect::new(0, 0, 0, 0).contains(0, 0));
    }

    #[test]
    fn test_rect_edges_saturate() {
        let r = Rect::new(i32::MAX - 2, i32::MAX - 1, 10, 10);
        assert_eq!(r.right(), i32::MAX);
        assert_eq!(r.bottom(), i32::MAX);
        assert!(r.contains(i32::MAX - 1, i32::MAX - 1));
        assert!(!r.contains(i32::MAX, i32::MAX - 1));
    }

    #[test]
    fn test_default_attributes_use_symbolic_values() {
        let attrs = Attributes::default();
        assert_eq!(attrs.font, "default");
        assert_eq!(attrs.color, Color::Default);
        assert_eq!(attrs.bold, StyleFlag::Default);
    }
}
