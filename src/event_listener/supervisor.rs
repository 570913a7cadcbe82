use super::classifier::classify;
use super::processor::FrameProcessor;
use super::subscription::{ControlFrame, SubscriptionManager};
use crate::config::{FeedConfig, ReconnectPolicy};
use crate::error::ConnectionError;
use crate::types::{IngestStats, InboundFrame};
use crate::utils::batch::process_batch;
use crate::utils::now_millis;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONTROL_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Owns the feed socket: connects, subscribes, dispatches frames and
/// applies the configured [`ReconnectPolicy`] when the socket goes away.
pub struct ConnectionSupervisor {
    feed: FeedConfig,
    processor: Arc<FrameProcessor>,
    subscriptions: SubscriptionManager,
    stats: Arc<IngestStats>,
    state: ConnectionState,
    // 每帧的持久化任务
    in_flight: JoinSet<()>,
    session_frames: u64,
}

impl ConnectionSupervisor {
    pub fn new(feed: FeedConfig, processor: Arc<FrameProcessor>, stats: Arc<IngestStats>) -> Self {
        Self {
            feed,
            processor,
            subscriptions: SubscriptionManager::new(),
            stats,
            state: ConnectionState::Disconnected,
            in_flight: JoinSet::new(),
            session_frames: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Runs until the socket is lost for good.
    ///
    /// Under `Terminate` the first disconnect is returned as an error. Under
    /// `Reconnect` every reconnect, whether after a failed connect or after a
    /// session that opened and dropped, waits out the exponential backoff.
    /// The attempt counter resets only once a session has received a frame,
    /// and the last error is returned after `max_attempts` consecutive failures.
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        let policy = self.feed.reconnect.retry_policy();
        let mut sessions = 0u64;
        // 本次断线期间连续失败的次数
        let mut failures = 0u32;

        loop {
            let url = self.feed.url.clone();
            info!("🌐 Connecting to {}", url);

            let error = match connect(&url).await {
                Ok(stream) => {
                    if sessions > 0 {
                        self.stats.reconnected();
                    }
                    sessions += 1;

                    let outcome = self.run_session(stream).await;
                    self.set_state(ConnectionState::Disconnected);

                    // 收到过数据才算一次健康的会话
                    if self.session_frames > 0 {
                        failures = 0;
                    }

                    match outcome {
                        Ok(()) => {
                            warn!("❌ WebSocket connection closed");
                            ConnectionError::Closed
                        }
                        Err(e) => {
                            error!("🚨 WebSocket error: {}", e);
                            e
                        }
                    }
                }
                Err(e) => {
                    error!("🚨 {}", e);
                    e
                }
            };

            failures += 1;
            if failures >= policy.max_retries {
                if self.feed.reconnect != ReconnectPolicy::Terminate {
                    error!("❌ Giving up after {} consecutive connection failures", failures);
                }
                return Err(error);
            }

            let delay = policy.compute_delay(failures - 1);
            info!(
                "🔁 Reconnect attempt {} of {} in {}ms, {} subscribed mints will be replayed",
                failures + 1,
                policy.max_retries,
                delay.as_millis(),
                self.subscriptions.len()
            );
            sleep(delay).await;
        }
    }

    /// Waits up to `grace` for in-flight persistence tasks and aborts the rest.
    /// Returns `false` if anything had to be aborted.
    pub async fn drain(&mut self, grace: Duration) -> bool {
        if self.in_flight.is_empty() {
            return true;
        }

        info!("⏳ 等待 {} 个写入任务完成...", self.in_flight.len());
        let in_flight = &mut self.in_flight;
        let drained = timeout(grace, async { while in_flight.join_next().await.is_some() {} })
            .await
            .is_ok();

        if !drained {
            warn!("⚠️ Aborting {} unfinished writes after {:?}", self.in_flight.len(), grace);
            self.in_flight.abort_all();
        }
        drained
    }

    async fn run_session(&mut self, stream: FeedStream) -> Result<(), ConnectionError> {
        self.session_frames = 0;
        let (mut write, mut read) = stream.split();
        let (control_tx, mut control_rx) = mpsc::channel::<ControlFrame>(CONTROL_CHANNEL_CAPACITY);

        let mut writer = tokio::spawn(async move {
            while let Some(frame) = control_rx.recv().await {
                let text = match frame.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode control frame {:?}: {}", frame, e);
                        continue;
                    }
                };
                debug!("➡️ {}", text);
                write
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| ConnectionError::Socket(e.to_string()))?;
            }
            let _ = write.close().await;
            Ok::<(), ConnectionError>(())
        });

        self.set_state(ConnectionState::Connected);
        info!("🌐 WebSocket connection opened");
        self.subscribe(&control_tx).await;

        let outcome = loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text, &control_tx).await,
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => self.handle_text(&text, &control_tx).await,
                        Err(_) => {
                            self.stats.decode_failed();
                            warn!("Ignoring non UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!("Feed sent close frame: {:?}", frame);
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(ConnectionError::Socket(e.to_string())),
                    None => break Ok(()),
                },
                result = &mut writer => {
                    break match result {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(e),
                        Err(e) => Err(ConnectionError::Socket(format!("control writer failed: {}", e))),
                    };
                }
            }
        };

        drop(control_tx);
        writer.abort();
        outcome
    }

    /// New-token subscription, then a background replay of every known mint.
    async fn subscribe(&self, control_tx: &mpsc::Sender<ControlFrame>) {
        info!("🔔 订阅新代币事件...");
        for frame in self.subscriptions.initial_frames() {
            if control_tx.send(frame).await.is_err() {
                warn!("Control channel closed before initial subscription");
                return;
            }
        }

        if self.subscriptions.is_empty() {
            return;
        }

        let mints = self.subscriptions.subscribed_mints().to_vec();
        let control_tx = control_tx.clone();
        let batch_size = self.feed.replay_batch_size;
        let delay = Duration::from_millis(self.feed.replay_batch_delay_ms);

        tokio::spawn(async move {
            if let Err(e) = replay_subscriptions(&mints, batch_size, delay, &control_tx).await {
                error!("🚨 {}", e);
            }
        });
    }

    async fn handle_text(&mut self, text: &str, control_tx: &mpsc::Sender<ControlFrame>) {
        self.stats.frame_received();
        self.session_frames += 1;

        let frame = match InboundFrame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.decode_failed();
                warn!("❌ Error processing message: {} ({})", e, truncate(text, 120));
                return;
            }
        };

        let mut classified = classify(&frame, now_millis());
        if classified.is_empty() {
            debug!("Ignoring frame: {}", truncate(text, 120));
            return;
        }

        self.processor.screen(&mut classified);

        if let Some(token) = &classified.creation {
            info!("💎 New token detected: {} ({})", token.name, token.symbol);

            let frames = self.subscriptions.register(&token.mint_address);
            if !frames.is_empty() {
                info!("📈 Subscribing to trades and Raydium liquidity for {}", token.mint_address);
            }
            for frame in frames {
                if control_tx.send(frame).await.is_err() {
                    warn!("Control channel closed, subscription for {} deferred to replay", token.mint_address);
                    break;
                }
            }
            self.stats.set_subscribed_mints(self.subscriptions.len());
        }

        // 回收已完成的任务，避免 JoinSet 无限增长
        while self.in_flight.try_join_next().is_some() {}

        let processor = Arc::clone(&self.processor);
        self.in_flight.spawn(async move {
            processor.process(classified).await;
        });
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.stats.set_connected(state == ConnectionState::Connected);
    }
}

async fn connect(url: &str) -> Result<FeedStream, ConnectionError> {
    let (stream, _) = connect_async(url).await.map_err(|e| ConnectionError::Connect {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(stream)
}

/// Re-sends trade and liquidity subscriptions for `mints` in rate-limited windows.
pub async fn replay_subscriptions(
    mints: &[String],
    batch_size: usize,
    delay: Duration,
    control_tx: &mpsc::Sender<ControlFrame>,
) -> Result<(), ConnectionError> {
    info!("♻️ Replaying subscriptions for {} mints", mints.len());

    process_batch(mints, batch_size, delay, |mint| async move {
        for frame in SubscriptionManager::token_frames(mint) {
            control_tx
                .send(frame)
                .await
                .map_err(|_| ConnectionError::Replay(format!("control channel closed at {}", mint)))?;
        }
        Ok::<(), ConnectionError>(())
    })
    .await?;

    info!("✅ Replayed subscriptions for {} mints", mints.len());
    Ok(())
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
