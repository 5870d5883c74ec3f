//! Resource Services
//!
//! The layout engine never touches fonts or image files directly. It asks
//! two services:
//!
//! - [`FontService`]: text measurement, line height and glyph rendering.
//! - [`SkinSource`]: balloon skin images by file name.
//!
//! Both live on the dispatcher thread, bundled with the balloon's
//! [`Descript`] in [`Resources`]. The headless implementations shipped here
//! ([`MonospaceFonts`], [`FileSkinStore`], [`SkinSet`]) are enough to run the
//! overlay without a windowing backend and to test layout deterministically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthChar;

use crate::descript::Descript;

/// Skin used by the script input widget
pub const SCRIPT_INPUT_SKIN: &str = "balloonc0.png";

/// Skin used by named-event input widgets
pub const NAMED_INPUT_SKIN: &str = "balloonc3.png";

/// Skin id including the direction variant (`-1` stays `-1`)
#[must_use]
pub fn skin_variant(id: i32, direction: bool) -> i32 {
    if id == -1 {
        -1
    } else {
        id + i32::from(direction)
    }
}

/// File name of a balloon skin: `balloon{s|k}{id}.png`
///
/// Side 0 uses the `s` set, every other side the `k` set.
#[must_use]
pub fn balloon_skin_file(side: i32, id: i32, direction: bool) -> String {
    let set = if side == 0 { 's' } else { 'k' };
    format!("balloon{set}{}.png", skin_variant(id, direction))
}

/// Opaque text measurement and rendering
pub trait FontService: Send {
    /// Pixel `(width, height)` of `text` in `font`
    fn measure(&self, font: &str, text: &str) -> (i32, i32);

    /// Line height of `font` in pixels
    fn line_height(&self, font: &str) -> i32;

    /// Render `text` at `scale` percent
    fn render(&self, font: &str, text: &str, color: Rgba<u8>, scale: u32) -> RgbaImage;

    /// Installed font families
    fn families(&self) -> Vec<String>;

    /// Family currently used for the `default` font reference
    fn active_family(&self) -> Option<String>;

    /// Family used when a requested one is not installed
    fn system_default_family(&self) -> String;

    /// Switch the family behind the `default` font reference
    fn set_default_family(&mut self, family: &str);
}

/// Skin image lookup
pub trait SkinSource: Send {
    /// Image for `file`, or `None` if it does not exist
    fn skin(&self, file: &str) -> Option<Arc<RgbaImage>>;

    /// Forget cached images
    fn clear_cache(&self);
}

/// Everything the layout engine reads while laying out or drawing
pub struct Resources {
    /// Text measurement and rendering
    pub fonts: Box<dyn FontService>,
    /// Skin images
    pub skins: Box<dyn SkinSource>,
    /// Balloon key space
    pub descript: Descript,
}

impl Resources {
    /// Bundle the three services
    pub fn new(fonts: Box<dyn FontService>, skins: Box<dyn SkinSource>, descript: Descript) -> Self {
        Self {
            fonts,
            skins,
            descript,
        }
    }
}

/// Fixed-cell font service
///
/// Every terminal column is `cell_width` pixels wide and every line
/// `line_height` tall, whatever the font reference. Rendering draws one solid
/// block per visible glyph.
#[derive(Debug, Clone)]
pub struct MonospaceFonts {
    cell_width: i32,
    line_height: i32,
    families: Vec<String>,
    active: Option<String>,
}

impl MonospaceFonts {
    /// Create a service with the given cell geometry
    #[must_use]
    pub fn new(cell_width: i32, line_height: i32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            line_height: line_height.max(1),
            families: vec!["monospace".to_string()],
            active: None,
        }
    }

    /// Replace the enumerated family list
    #[must_use]
    pub fn with_families(mut self, families: Vec<String>) -> Self {
        if !families.is_empty() {
            self.families = families;
        }
        self
    }

    fn columns(text: &str) -> i32 {
        let cols: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
        i32::try_from(cols).unwrap_or(i32::MAX)
    }
}

impl FontService for MonospaceFonts {
    fn measure(&self, _font: &str, text: &str) -> (i32, i32) {
        (Self::columns(text).saturating_mul(self.cell_width), self.line_height)
    }

    fn line_height(&self, _font: &str) -> i32 {
        self.line_height
    }

    #[allow(clippy::cast_sign_loss)]
    fn render(&self, font: &str, text: &str, color: Rgba<u8>, scale: u32) -> RgbaImage {
        let (w, h) = self.measure(font, text);
        let scaled = |v: i32| (v.max(0) as u32 * scale / 100).max(1);
        let cell = scaled(self.cell_width);
        let mut img = RgbaImage::new(scaled(w), scaled(h));

        let mut column = 0u32;
        for c in text.chars() {
            let span = c.width().unwrap_or(0) as u32;
            if !c.is_whitespace() && span > 0 {
                let x0 = column * cell;
                for x in x0..(x0 + span * cell).min(img.width()) {
                    for y in 0..img.height() {
                        img.put_pixel(x, y, color);
                    }
                }
            }
            column += span;
        }
        img
    }

    fn families(&self) -> Vec<String> {
        self.families.clone()
    }

    fn active_family(&self) -> Option<String> {
        self.active.clone()
    }

    fn system_default_family(&self) -> String {
        self.families
            .first()
            .cloned()
            .unwrap_or_else(|| "monospace".to_string())
    }

    fn set_default_family(&mut self, family: &str) {
        self.active = Some(family.to_string());
    }
}

/// Skins loaded from PNG files in the balloon directory
#[derive(Debug)]
pub struct FileSkinStore {
    dir: PathBuf,
    cache: RefCell<HashMap<String, Option<Arc<RgbaImage>>>>,
}

impl FileSkinStore {
    /// Serve skins from `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Directory skins are read from
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load(&self, file: &str) -> Option<Arc<RgbaImage>> {
        let path = self.dir.join(file);
        match image::open(&path) {
            Ok(img) => {
                debug!(path = ?path, "Skin loaded");
                Some(Arc::new(img.to_rgba8()))
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Skin not available");
                None
            }
        }
    }
}

impl SkinSource for FileSkinStore {
    fn skin(&self, file: &str) -> Option<Arc<RgbaImage>> {
        if let Some(cached) = self.cache.borrow().get(file) {
            return cached.clone();
        }
        let loaded = self.load(file);
        self.cache
            .borrow_mut()
            .insert(file.to_string(), loaded.clone());
        loaded
    }

    fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

/// In-memory skins
#[derive(Debug, Clone, Default)]
pub struct SkinSet {
    images: HashMap<String, Arc<RgbaImage>>,
}

impl SkinSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image under `file`
    pub fn insert(&mut self, file: impl Into<String>, image: RgbaImage) {
        self.images.insert(file.into(), Arc::new(image));
    }

    /// Builder-style registration of a blank skin of the given size
    #[must_use]
    pub fn with_blank(mut self, file: impl Into<String>, width: u32, height: u32) -> Self {
        self.insert(file, RgbaImage::new(width, height));
        self
    }
}

impl SkinSource for SkinSet {
    fn skin(&self, file: &str) -> Option<Arc<RgbaImage>> {
        self.images.get(file).cloned()
    }

    fn clear_cache(&self) {}
}
