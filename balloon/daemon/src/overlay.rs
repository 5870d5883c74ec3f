//! Overlay runtime
//!
//! Wires the control receiver, the dispatcher tick and the notification
//! pipeline together around one shared context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use balloon_core::{
    BalloonFrame, ControlReceiver, Descript, Dispatcher, FileSkinStore, FontService,
    MonospaceFonts, NotificationPipeline, OverlayConfig, Presenter, Resources, SessionClient,
    SharedContext, TransportError,
};

const RECEIVER_GRACE: Duration = Duration::from_millis(200);

/// Presenter used when no windowing backend is attached
///
/// Frames are only traced.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    presented: u64,
}

impl HeadlessPresenter {
    /// Number of frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, frame: BalloonFrame) {
        self.presented += 1;
        let size = frame.surface.as_ref().map(|s| (s.width(), s.height()));
        debug!(
            side = frame.side,
            x = frame.position.0,
            y = frame.position.1,
            visible = frame.visible,
            raise = frame.raise,
            size = ?size,
            links = frame.hit_regions.len(),
            "Balloon frame"
        );
    }
}

/// Directory holding `descript.txt` and the skin images
///
/// The ghost's `Initialize` wins over configuration.
pub fn resolve_balloon_dir(working_dir: Option<PathBuf>, config: &OverlayConfig) -> PathBuf {
    working_dir
        .or_else(|| config.balloon_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load the description file, falling back to an empty one
pub fn load_descript(dir: &Path) -> Descript {
    match Descript::load(dir) {
        Ok(descript) => {
            info!(dir = %dir.display(), entries = descript.len(), "Loaded balloon description");
            descript
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "No balloon description, using defaults");
            Descript::default()
        }
    }
}

/// Font and skin services for `dir`
pub fn build_resources(dir: &Path, config: &OverlayConfig) -> Resources {
    let mut fonts = MonospaceFonts::new(config.cell_width, config.line_height)
        .with_families(config.families.clone());
    if let Some(ref family) = config.default_family {
        fonts.set_default_family(family);
    }
    Resources::new(
        Box::new(fonts),
        Box::new(FileSkinStore::new(dir)),
        load_descript(dir),
    )
}

/// Run the overlay until the control channel closes
pub async fn run(config: OverlayConfig) -> Result<()> {
    let ctx = Arc::new(SharedContext::new());

    let receiver = tokio::spawn(
        ControlReceiver::new(tokio::io::stdin(), tokio::io::stdout(), Arc::clone(&ctx)).run(),
    );

    {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received interrupt, initiating shutdown");
                ctx.shutdown();
            }
        });
    }

    if !ctx.wait_until_loaded().await {
        info!("Control channel closed before the ghost was ready");
        return finish_receiver(receiver).await;
    }

    let dir = resolve_balloon_dir(ctx.working_dir(), &config);
    info!(dir = %dir.display(), "Balloon directory");

    let mut dispatcher =
        Dispatcher::new(Arc::clone(&ctx), build_resources(&dir, &config)).with_scale(config.scale);

    let pipeline = tokio::spawn(
        NotificationPipeline::new(
            Arc::clone(&ctx),
            SessionClient::new(config.sender.clone(), config.connect_timeout),
        )
        .run(),
    );

    let mut presenter = HeadlessPresenter::default();
    let mut ticker = interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while ctx.is_alive() {
        ticker.tick().await;
        dispatcher.tick(&mut presenter);
    }
    // commands that arrived with the final frame
    dispatcher.tick(&mut presenter);

    info!(frames = presenter.presented(), "Dispatcher stopped");

    pipeline.await.context("Notification pipeline panicked")?;
    finish_receiver(receiver).await
}

async fn finish_receiver(
    mut receiver: tokio::task::JoinHandle<Result<(), TransportError>>,
) -> Result<()> {
    match tokio::time::timeout(RECEIVER_GRACE, &mut receiver).await {
        Ok(joined) => joined
            .context("Control receiver panicked")?
            .context("Control channel failed"),
        Err(_) => {
            // interrupted while stdin is still open
            debug!("Control receiver still reading, abandoning it");
            receiver.abort();
            Ok(())
        }
    }
}
