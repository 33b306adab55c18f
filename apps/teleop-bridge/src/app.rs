//! Application orchestrator: ticks the controller and keeps the inbound
//! streams in step with the live settings.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use teleop_control::{Presentation, TeleopController, TickInput, TickOutcome, UiHints};
use teleop_protocol::Position;
use teleop_protocol::constants::HAND_JOINT_COUNT;
use teleop_streams::{FrameStream, StreamKind};
use teleop_transport::SocketOptions;

use crate::config::Config;
use crate::network_file::NetworkSource;

const SETTINGS_REFRESH: Duration = Duration::from_secs(1);

/// Runs the bridge until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let mut controller = TeleopController::new(config.controller_config());
    let mut source = NetworkSource::new(config.network.clone(), config.network_file.clone());
    let mut ui = LogPresentation::default();

    let mut camera = FrameStream::new(StreamKind::Camera, SocketOptions::default());
    let mut graph = FrameStream::new(StreamKind::Graph, SocketOptions::default());
    camera.set_enabled(config.camera_enabled);
    graph.set_enabled(config.graph_enabled);

    let opened = controller.open_standard(source.settings(), &mut ui);
    debug!(opened, "startup channels");

    // Without a hand tracker every joint reports the origin.
    let idle_hand = [Position::default(); HAND_JOINT_COUNT];

    let mut ticker = tokio::time::interval(config.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let keepalive_period = controller.keepalive_period();
    let mut keepalive = tokio::time::interval_at(Instant::now() + keepalive_period, keepalive_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refresh = tokio::time::interval(SETTINGS_REFRESH);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(tick_ms = config.tick_period().as_millis() as u64, "bridge ready");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("SIGINT received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let settings = source.settings();
                let input = TickInput {
                    settings,
                    gestures: None,
                    right_hand: &idle_hand,
                    left_hand: &idle_hand,
                    resolution: config.resolution,
                };
                if let TickOutcome::Connected { healthy } = controller.tick(&input, &mut ui).await {
                    debug!(healthy, "connection attempt finished");
                }
                camera.sync(&settings.camera_address(), settings.force_disconnect);
                graph.sync(&settings.graph_address(), settings.force_disconnect);
            }
            _ = keepalive.tick() => {
                let delivered = controller.keepalive().await;
                debug!(delivered, "keep-alive sent");
                log_streams(&[&camera, &graph]);
            }
            _ = refresh.tick() => {
                source.refresh();
            }
        }
    }

    info!("stopping streams and channels...");
    camera.stop();
    graph.stop();
    controller.disconnect(&mut ui);
    Ok(())
}

fn log_streams(streams: &[&FrameStream]) {
    for stream in streams {
        let latest = stream.latest();
        debug!(
            stream = %stream.kind(),
            state = ?stream.state(),
            latest_bytes = latest.as_ref().map_or(0, |f| f.len()),
            "stream status"
        );
    }
}

/// Headless presentation: logs hint changes.
#[derive(Default)]
struct LogPresentation {
    last: Option<UiHints>,
}

impl Presentation for LogPresentation {
    fn apply_hints(&mut self, hints: UiHints) {
        if self.last == Some(hints) {
            return;
        }
        self.last = Some(hints);
        info!(
            indicator = ?hints.indicator,
            menu_visible = hints.menu_visible,
            wrist_tracker = hints.wrist_tracker,
            "ui hints"
        );
    }
}
