//! Balloon Core - Headless Companion Balloon Overlay
//!
//! This crate implements the speech-balloon overlay that a desktop companion
//! ("ghost") process drives: it receives formatting commands over a framed
//! control channel, lays text out inside skinned balloon images, and reports
//! user interaction back to the ghost over a session socket.
//!
//! The windowing backend is not part of this crate. Redrawn balloons are handed
//! to a [`Presenter`] and pointer/keyboard input is fed back through the
//! [`Dispatcher`].
//!
//! # Architecture
//!
//! ```text
//!   ghost stdout ──frames──▶ ┌─────────────────┐
//!                            │ ControlReceiver │──204──▶ ghost stdin
//!                            └────────┬────────┘
//!                                     │ push_command / set_endpoint
//!                                     ▼
//!                            ┌─────────────────┐
//!                            │  SharedContext  │◀──────────────┐
//!                            └───┬─────────┬───┘               │ submit(batch)
//!                  drain_commands│         │next_batches       │
//!                                ▼         ▼                   │
//!                      ┌────────────┐   ┌──────────────────────┴──┐
//!   input events ─────▶│ Dispatcher │   │  NotificationPipeline   │──SSTP──▶ ghost socket
//!                      │  balloons  │   └─────────────────────────┘
//!                      │  widgets   │
//!                      └─────┬──────┘
//!                            │ BalloonFrame
//!                            ▼
//!                        Presenter
//! ```
//!
//! Three actors, one shared structure:
//! - the **receiver** task owns stdin/stdout,
//! - the **pipeline** task owns outbound delivery,
//! - the **dispatcher** owns every balloon, layout and widget and runs on
//!   a fixed tick.
//!
//! # Module Overview
//!
//! - [`transport`]: framing, keyed-text messages, control receiver, session client
//! - [`context`]: the shared queues and scalars
//! - [`command`]: raw and typed dispatcher commands
//! - [`dispatcher`]: command application, rendering tick, input routing
//! - [`balloon`]: per-side window model (position, drag, link events)
//! - [`layout`]: the layout engine (segments, wrapping, scrolling, hit-testing)
//! - [`widgets`]: text input boxes
//! - [`pipeline`]: outbound requests and their ordered delivery
//! - [`resources`]: font and skin services
//! - [`descript`]: the balloon's key/value description file
//! - [`config`]: daemon configuration (TOML + environment)

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod balloon;
pub mod command;
pub mod config;
pub mod context;
pub mod descript;
pub mod dispatcher;
pub mod layout;
pub mod pipeline;
pub mod resources;
pub mod transport;
pub mod widgets;

// Re-exports for convenience
pub use balloon::Balloon;
pub use command::{Axis, BalloonCommand, Command, CursorUnit};
pub use context::{Endpoint, SharedContext};
pub use descript::Descript;
pub use dispatcher::{BalloonFrame, Dispatcher, Presenter, WidgetId};
pub use layout::{BalloonLayout, Link, Rect, Segment};
#[cfg(unix)]
pub use pipeline::NotificationPipeline;
pub use pipeline::{Batch, Method, Request};
pub use resources::{FileSkinStore, FontService, MonospaceFonts, Resources, SkinSet, SkinSource};
pub use transport::{ControlReceiver, TransportError};
#[cfg(unix)]
pub use transport::SessionClient;
pub use widgets::{InputWidget, InputWidgetKind, Key};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, OverlayConfig, OverlayToml,
};
