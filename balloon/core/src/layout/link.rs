//! Link spans and hit-testing
//!
//! A link span is the run of segments from a `link_begin` marker up to (not
//! including) the next `link_end` marker. [`scan`] walks the segment list
//! once and returns the span under the pointer, if any.
//!
//! A span that is never closed runs to the end of the content. It is still
//! only reported when the pointer is inside it.

use super::segment::{Rect, Segment};

/// What a link span says about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkContent {
    /// Anchor (`true`) or choice (`false`)
    pub is_anchor: bool,
    /// Concatenated text of the span
    pub text: String,
    /// Event or target raised when selected
    pub event: String,
    /// Extra references
    pub args: Vec<String>,
}

/// The span currently under the pointer
///
/// Empty `hit_regions` means "no span".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// Rectangles of every segment in the span, in content coordinates
    pub hit_regions: Vec<Rect>,
    /// Span metadata
    pub content: LinkContent,
}

impl Link {
    /// Whether the pointer is over a span
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.hit_regions.is_empty()
    }
}

/// Find the span containing `(x, y)`
///
/// Segment rectangles are shifted up by `scroll` before testing, so `(x, y)`
/// is in visible balloon coordinates. A begin marker inside an open span
/// takes over its event and arguments, and the span then covers both runs
/// up to the next end marker.
#[must_use]
pub fn scan(segments: &[Segment], x: i32, y: i32, scroll: i32) -> Link {
    let mut link = Link::default();
    let mut in_link = false;
    let mut hit = false;

    for segment in segments {
        if segment.head.link_end && in_link {
            in_link = false;
            if hit {
                return link;
            }
            link = Link::default();
        }

        if let Some(begin) = &segment.head.link_begin {
            // a begin inside an open span retargets it and keeps what was gathered
            link.content.is_anchor = begin.is_anchor;
            link.content.event = begin.event.clone();
            link.content.args = begin.args.clone();
            in_link = true;
        }

        if in_link {
            let p = segment.position;
            link.hit_regions.push(p);
            if segment.is_text() {
                link.content.text.push_str(&segment.content.data);
            }
            hit = hit || Rect::new(p.x, p.y.saturating_sub(scroll), p.w, p.h).contains(x, y);
        }
    }

    if hit {
        link
    } else {
        Link::default()
    }
}
