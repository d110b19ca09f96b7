//! Websocket session: handshake, inbound queue, frame loop.

use std::time::Duration;

use anyhow::Context;
use client::{Canvas, KindRegistry, TextAlign, World, WorldState};
use futures_util::{SinkExt, StreamExt};
use glam::Vec2;
use protocol::{Codec, Face, JsonCodec};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::config::Config;

/// Canvas that counts draw calls and traces text.
#[derive(Debug, Default)]
pub struct TraceCanvas {
    pub shapes: usize,
    pub texts: usize,
    depth: usize,
}

impl TraceCanvas {
    fn reset(&mut self) {
        self.shapes = 0;
        self.texts = 0;
        self.depth = 0;
    }
}

impl Canvas for TraceCanvas {
    fn save(&mut self) {
        self.depth += 1;
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn translate(&mut self, _offset: Vec2) {}

    fn rotate(&mut self, _angle: f32) {}

    fn set_alpha(&mut self, _alpha: f32) {}

    fn stroke_rect(&mut self, _min: Vec2, _size: Vec2) {
        self.shapes += 1;
    }

    fn fill_rect(&mut self, _min: Vec2, _size: Vec2) {
        self.shapes += 1;
    }

    fn fill_text(&mut self, text: &str, at: Vec2, _size_px: f32, _align: TextAlign) {
        self.texts += 1;
        trace!("text {:?} at ({:.1}, {:.1}) depth {}", text, at.x, at.y, self.depth);
    }
}

/// Milliseconds since `origin`: the session's arrival clock.
fn millis_since(origin: Instant) -> f64 {
    origin.elapsed().as_secs_f64() * 1000.0
}

/// Connect, send the face and render until the server goes away.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let face = Face::new(config.connection.face.clone())?;

    let (ws_stream, _) = connect_async(config.connection.url.as_str())
        .await
        .with_context(|| format!("connecting to {}", config.connection.url))?;
    info!("Connected to {}", config.connection.url);

    let (mut write, mut read) = ws_stream.split();
    write.send(Message::binary(face.to_frame())).await?;
    info!("Joined as {}", face);

    let codec = JsonCodec;
    let mut world = World::new(KindRegistry::with_default_kinds(), config.engine());
    let mut canvas = TraceCanvas::default();

    // Frames received since the last render, with their arrival time.
    let mut inbox: Vec<(f64, Vec<u8>)> = Vec::new();

    let origin = Instant::now();
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.render.fps.max(1)));
    let mut ticker = interval(frame_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        inbox.push((millis_since(origin), text.as_bytes().to_vec()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        inbox.push((millis_since(origin), data.to_vec()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Server closed the connection: {:?}", frame);
                        world.transport_lost();
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        world.transport_lost();
                        break;
                    }
                    None => {
                        world.transport_lost();
                        break;
                    }
                    _ => {}
                }
            }
            _ = ticker.tick() => {
                let elapsed = last_frame.elapsed();
                last_frame = Instant::now();

                for (arrival, frame) in inbox.drain(..) {
                    match codec.decode(&frame) {
                        Ok(message) => world.enqueue(message, arrival),
                        Err(e) => warn!("Dropping undecodable frame: {}", e),
                    }
                }

                let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                if elapsed_ms > config.render.resync_after_ms {
                    debug!("Render stalled for {:.0}ms, skipping interpolation", elapsed_ms);
                    world.request_resync();
                }

                let dt = elapsed.as_secs_f64().min(config.render.max_frame_dt);
                canvas.reset();
                let summary = world.frame(dt, millis_since(origin), &mut canvas);

                let every = config.render.report_every;
                if every > 0 && world.frames() % every == 0 {
                    debug!(
                        "Frame {}: {} entities, {} ticked, {} drawn ({} shapes, {} texts), {} dropped",
                        world.frames(),
                        world.len(),
                        summary.ticked,
                        summary.drawn,
                        canvas.shapes,
                        canvas.texts,
                        summary.dropped
                    );
                }
                if world.state() == WorldState::Closed && world.departed().is_empty() {
                    info!("World closed by server");
                    break;
                }
            }
        }
    }

    if world.state() == WorldState::Disconnected {
        info!("Session ended; {} entities frozen at their last state", world.len());
    }
    Ok(())
}
