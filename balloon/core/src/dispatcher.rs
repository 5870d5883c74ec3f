//! Command Dispatcher
//!
//! The dispatcher owns every balloon, the input widgets and the resource
//! services. Once per tick it:
//!
//! 1. reaps closed input widgets,
//! 2. drains the command queue and applies each command in order,
//! 3. redraws balloons that changed and hands the frames to a [`Presenter`].
//!
//! It never blocks and never fails: malformed commands and commands for sides
//! that were never created are dropped. Anything the ghost must hear about is
//! submitted to the [`SharedContext`] as a batch.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::balloon::Balloon;
use crate::command::{BalloonCommand, Command};
use crate::context::SharedContext;
use crate::layout::Rect;
use crate::pipeline::Batch;
use crate::resources::Resources;
use crate::widgets::{InputWidget, InputWidgetKind, Key};

/// Smallest scale a configuration change may set, in percent
pub const MIN_SCALE: u32 = 10;

/// One redrawn balloon, ready for the windowing backend
#[derive(Debug, Clone)]
pub struct BalloonFrame {
    /// Side index
    pub side: i32,
    /// Screen position of the top-left corner
    pub position: (i32, i32),
    /// Composited bitmap; `None` when there is nothing to draw
    pub surface: Option<RgbaImage>,
    /// Link span under the pointer, in surface pixels
    pub hit_regions: Vec<Rect>,
    /// Window visibility
    pub visible: bool,
    /// Raise the window above others
    pub raise: bool,
}

/// Receives redrawn balloons
///
/// Implemented by the windowing backend.
pub trait Presenter {
    /// Show `frame`
    fn present(&mut self, frame: BalloonFrame);
}

/// Addresses an open input widget
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetId {
    /// The script input widget
    Script,
    /// A named input widget
    Named(String),
}

/// Applies commands to balloons and widgets
pub struct Dispatcher {
    context: Arc<SharedContext>,
    resources: Resources,
    balloons: BTreeMap<i32, Balloon>,
    widgets: HashMap<String, InputWidget>,
    script_widget: Option<InputWidget>,
    scale: u32,
}

impl Dispatcher {
    /// Create a dispatcher with no balloons
    pub fn new(context: Arc<SharedContext>, resources: Resources) -> Self {
        Self {
            context,
            resources,
            balloons: BTreeMap::new(),
            widgets: HashMap::new(),
            script_widget: None,
            scale: 100,
        }
    }

    /// Start at `scale` percent instead of 100
    #[must_use]
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(MIN_SCALE);
        self
    }

    /// Current scale in percent
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Balloon for `side`, if created
    #[must_use]
    pub fn balloon(&self, side: i32) -> Option<&Balloon> {
        self.balloons.get(&side)
    }

    /// Resource services
    #[must_use]
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Open input widget
    #[must_use]
    pub fn widget(&self, id: &WidgetId) -> Option<&InputWidget> {
        match id {
            WidgetId::Script => self.script_widget.as_ref(),
            WidgetId::Named(name) => self.widgets.get(name),
        }
    }

    /// Run one dispatcher tick
    pub fn tick(&mut self, presenter: &mut dyn Presenter) {
        self.reap_widgets();
        for command in self.context.drain_commands() {
            self.apply_command(&command);
        }
        self.render(presenter);
    }

    /// Parse and apply a raw command
    pub fn apply_command(&mut self, command: &Command) {
        match BalloonCommand::parse(command) {
            Some(parsed) => self.apply(parsed),
            None => debug!(command = %command.name, args = ?command.args, "Dropping unknown or malformed command"),
        }
    }

    /// Apply a typed command
    pub fn apply(&mut self, command: BalloonCommand) {
        debug!(command = ?command, "Applying command");
        let res = &self.resources;
        match command {
            BalloonCommand::Create { side } => {
                let balloon = self.balloons.entry(side).or_insert_with(|| {
                    info!(side, "Balloon created");
                    Balloon::new(side)
                });
                balloon.layout_mut().set_scale(self.scale);
            }
            BalloonCommand::Show { side } => self.with_balloon(side, Balloon::show),
            BalloonCommand::Hide { side } => self.with_balloon(side, Balloon::hide),
            BalloonCommand::HideAll => self.balloons.values_mut().for_each(Balloon::hide),
            BalloonCommand::ClearText { side } => {
                self.with_balloon(side, |b| b.layout_mut().clear(false));
            }
            BalloonCommand::ClearTextAll => {
                for b in self.balloons.values_mut() {
                    b.layout_mut().clear(true);
                }
            }
            BalloonCommand::SetBalloonId { side, id } => {
                if let Some(b) = self.balloons.get_mut(&side) {
                    let layout = b.layout_mut();
                    if id == -1 {
                        layout.clear(true);
                        layout.unset_skin();
                        layout.hide();
                    } else {
                        layout.set_id(id, res);
                    }
                }
            }
            BalloonCommand::ResetBalloonId { side: None } => {
                for b in self.balloons.values_mut() {
                    b.layout_mut().set_id(0, res);
                }
            }
            BalloonCommand::ResetBalloonId { side: Some(side) } => {
                if let Some(b) = self.balloons.get_mut(&side) {
                    b.layout_mut().set_id(0, res);
                }
            }
            BalloonCommand::Position { side, x, y } => {
                self.with_balloon(side, |b| b.set_position(x, y));
            }
            BalloonCommand::Direction { side, direction } => {
                if let Some(b) = self.balloons.get_mut(&side) {
                    b.set_direction(direction, res);
                }
            }
            BalloonCommand::AppendText { side, text } => {
                if let Some(b) = self.balloons.get_mut(&side) {
                    let layout = b.layout_mut();
                    layout.append_text(&text, res);
                    layout.show();
                }
            }
            BalloonCommand::AppendLinkBegin {
                side,
                is_anchor,
                event,
                args,
            } => {
                self.with_balloon(side, |b| {
                    b.layout_mut().append_link_begin(is_anchor, &event, &args);
                });
            }
            BalloonCommand::AppendLinkEnd { side } => {
                self.with_balloon(side, |b| b.layout_mut().append_link_end());
            }
            BalloonCommand::SetCursorPosition {
                side,
                axis,
                value,
                absolute,
                unit,
            } => {
                if let Some(b) = self.balloons.get_mut(&side) {
                    b.layout_mut()
                        .set_cursor_position(axis, value, absolute, unit, res);
                }
            }
            BalloonCommand::NewLine { side } => {
                self.with_balloon(side, |b| b.layout_mut().new_line());
            }
            BalloonCommand::ConfigurationChanged { pairs } => {
                for (key, value) in pairs {
                    match key.as_str() {
                        "scale" => self.change_scale(&value),
                        "font" => self.change_font(&value),
                        _ => debug!(key = %key, "Ignoring configuration key"),
                    }
                }
            }
            BalloonCommand::OpenInputBox { id } => {
                let widget = InputWidget::new(
                    InputWidgetKind::NamedEvent { event: id.clone() },
                    &self.resources.descript,
                );
                self.widgets.insert(id, widget);
            }
            BalloonCommand::OpenScriptInputBox => {
                self.script_widget = Some(InputWidget::new(
                    InputWidgetKind::Script,
                    &self.resources.descript,
                ));
            }
            BalloonCommand::ScriptBegin => {
                self.balloons.values_mut().for_each(Balloon::raise_on_talk);
            }
            BalloonCommand::ScriptEnd => {}
        }
    }

    fn with_balloon(&mut self, side: i32, f: impl FnOnce(&mut Balloon)) {
        match self.balloons.get_mut(&side) {
            Some(b) => f(b),
            None => debug!(side, "No balloon for side"),
        }
    }

    fn change_scale(&mut self, value: &str) {
        let Ok(scale) = value.trim().parse::<u32>() else {
            return;
        };
        if scale == self.scale || scale < MIN_SCALE {
            return;
        }
        info!(scale, "Scale changed");
        self.scale = scale;
        self.resources.skins.clear_cache();
        for b in self.balloons.values_mut() {
            b.layout_mut().set_scale(scale);
        }
    }

    fn change_font(&mut self, requested: &str) {
        let fonts = &mut self.resources.fonts;
        let active = fonts.active_family();
        if active.as_deref() == Some(requested) {
            return;
        }
        let family = if fonts.families().iter().any(|f| f == requested) {
            requested.to_string()
        } else {
            fonts.system_default_family()
        };
        if active.as_deref() == Some(family.as_str()) {
            return;
        }
        info!(family = %family, "Default font changed");
        fonts.set_default_family(&family);
        for b in self.balloons.values_mut() {
            b.layout_mut().touch();
        }
    }

    fn reap_widgets(&mut self) {
        self.widgets.retain(|_, w| w.is_alive());
        if self.script_widget.as_ref().is_some_and(|w| !w.is_alive()) {
            self.script_widget = None;
        }
    }

    fn render(&mut self, presenter: &mut dyn Presenter) {
        let scale = i32::try_from(self.scale).unwrap_or(100);
        let mut outbound = Vec::new();

        for balloon in self.balloons.values_mut() {
            if !balloon.layout().is_dirty() && !balloon.raise_pending() {
                continue;
            }
            let surface = balloon.layout().surface(&self.resources);
            if let Some(s) = &surface {
                let w = i32::try_from(s.width()).unwrap_or(i32::MAX);
                let h = i32::try_from(s.height()).unwrap_or(i32::MAX);
                outbound.extend(balloon.resize(w, h));
            }
            let hit_regions = balloon
                .layout()
                .hit_regions()
                .into_iter()
                .map(|r| {
                    Rect::new(
                        r.x.saturating_mul(scale) / 100,
                        r.y.saturating_mul(scale) / 100,
                        r.w.saturating_mul(scale) / 100,
                        r.h.saturating_mul(scale) / 100,
                    )
                })
                .collect();
            presenter.present(BalloonFrame {
                side: balloon.side(),
                position: balloon.position(),
                surface,
                hit_regions,
                visible: balloon.is_visible(),
                raise: balloon.take_raise(),
            });
            balloon.layout_mut().mark_clean();
        }

        for batch in outbound {
            self.context.submit(batch);
        }
    }

    fn to_layout(&self, v: i32) -> i32 {
        let scale = i32::try_from(self.scale).unwrap_or(100).max(1);
        v.saturating_mul(100) / scale
    }

    fn submit(&self, batch: Option<Batch>) {
        if let Some(batch) = batch {
            self.context.submit(batch);
        }
    }

    /// Primary button pressed over `side` at screen point `(px, py)`
    pub fn pointer_press(&mut self, side: i32, px: i32, py: i32) {
        self.with_balloon(side, |b| b.pointer_press(px, py));
    }

    /// Pointer moved over `side` to surface point `(x, y)`, screen point `(px, py)`
    pub fn pointer_motion(&mut self, side: i32, x: i32, y: i32, px: i32, py: i32) {
        let (lx, ly) = (self.to_layout(x), self.to_layout(y));
        let batch = self
            .balloons
            .get_mut(&side)
            .and_then(|b| b.pointer_motion(lx, ly, px, py));
        self.submit(batch);
    }

    /// Primary button released over `side`
    pub fn pointer_release(&mut self, side: i32) {
        let batch = self
            .balloons
            .get_mut(&side)
            .and_then(Balloon::pointer_release);
        self.submit(batch);
    }

    /// Wheel turned over `side`
    pub fn wheel(&mut self, side: i32, dy: i32) {
        if let Some(b) = self.balloons.get_mut(&side) {
            b.wheel(dy, &self.resources);
        }
    }

    fn widget_mut(&mut self, id: &WidgetId) -> Option<&mut InputWidget> {
        match id {
            WidgetId::Script => self.script_widget.as_mut(),
            WidgetId::Named(name) => self.widgets.get_mut(name),
        }
    }

    /// Key pressed in an input widget
    pub fn widget_key(&mut self, id: &WidgetId, key: Key) {
        let batch = self.widget_mut(id).and_then(|w| w.key(key));
        self.submit(batch);
    }

    /// Committed text typed into an input widget
    pub fn widget_input(&mut self, id: &WidgetId, text: &str) {
        if let Some(w) = self.widget_mut(id) {
            w.input(text);
        }
    }

    /// IME composition changed in an input widget
    pub fn widget_edit(&mut self, id: &WidgetId, text: &str) {
        if let Some(w) = self.widget_mut(id) {
            w.edit(text);
        }
    }
}
