//! Channel client: consumer handle and the connection driver task.

#![allow(clippy::too_many_lines)]

use async_trait::async_trait;
use brain_core::config::Validatable;
use brain_core::error::{BrainError, NetworkError};
use brain_telemetry::spans::channel_span;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{Instrument, debug, info, warn};

use crate::config::ChannelConfig;
use crate::envelope::Envelope;
use crate::machine::{Action, ChannelMachine, Event};
use crate::state::{ChannelStatus, ConnectionState, ReadyState};
use crate::timer::ReconnectTimer;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type OpenFuture = Pin<Box<dyn Future<Output = Result<WsStream, NetworkError>> + Send>>;

/// Callback trait for channel events.
///
/// Every method defaults to a no-op. Callbacks run on the driver task, one
/// at a time and in frame order.
#[async_trait]
pub trait ChannelCallback: Send + Sync {
    /// Called once per successfully parsed inbound frame.
    async fn on_message(&self, envelope: Envelope) {
        let _ = envelope;
    }

    /// Called once per successful transport establishment.
    ///
    /// `sender` can be used to send subscription frames right away.
    async fn on_connect(&self, sender: &ChannelSender) {
        let _ = sender;
    }

    /// Called once per transport closure.
    async fn on_disconnect(&self) {}

    /// Called on transport-level errors.
    async fn on_error(&self, error: NetworkError) {
        let _ = error;
    }
}

/// Callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

#[async_trait]
impl ChannelCallback for NoopCallback {}

#[derive(Debug)]
enum Command {
    Send(Message),
    Disconnect,
    Reconnect,
}

/// Cloneable outbound side of a channel.
///
/// Frames are only accepted while the channel is connected; sends are
/// fire-and-forget.
#[derive(Clone)]
pub struct ChannelSender {
    channel: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<RwLock<ChannelStatus>>,
}

impl ChannelSender {
    /// Channel name.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Returns whether the channel is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.read().state.is_connected()
    }

    /// Queues a text frame.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), NetworkError> {
        if !self.is_connected() {
            return Err(NetworkError::ConnectionClosed {
                reason: "Not connected".to_string(),
            });
        }

        self.commands
            .send(Command::Send(Message::Text(text.into())))
            .map_err(|_| NetworkError::ConnectionClosed {
                reason: "Channel driver stopped".to_string(),
            })
    }

    /// Serializes `value` as JSON and queues it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), NetworkError> {
        let json = serde_json::to_string(value).map_err(|e| NetworkError::WebSocket {
            reason: format!("Failed to serialize: {e}"),
        })?;
        self.send_text(json)
    }
}

impl std::fmt::Debug for ChannelSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSender")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Consumer handle to a running channel.
///
/// Clones share the same connection. When the last clone is dropped the
/// driver disconnects and exits.
#[derive(Clone)]
pub struct ChannelHandle {
    sender: ChannelSender,
    state_rx: watch::Receiver<ConnectionState>,
    _lifetime: Arc<oneshot::Sender<()>>,
}

impl ChannelHandle {
    /// Channel name.
    #[must_use]
    pub fn channel(&self) -> &str {
        self.sender.channel()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.sender.status.read().state
    }

    /// Current transport ready state.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.state().ready_state()
    }

    /// Returns whether the channel is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    /// Most recently received envelope.
    #[must_use]
    pub fn last_message(&self) -> Option<Envelope> {
        self.sender.status.read().last_message.clone()
    }

    /// Retries scheduled since the last successful connection.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.sender.status.read().reconnect_attempts
    }

    /// Successful connections so far, including reconnections.
    #[must_use]
    pub fn connections(&self) -> u64 {
        self.sender.status.read().connections
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Outbound sender that does not keep the driver alive.
    #[must_use]
    pub fn sender(&self) -> ChannelSender {
        self.sender.clone()
    }

    /// Queues a text frame. Fails when not connected.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), NetworkError> {
        self.sender.send_text(text)
    }

    /// Queues a JSON frame. Fails when not connected.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), NetworkError> {
        self.sender.send_json(value)
    }

    /// Closes the connection and cancels any pending retry.
    ///
    /// Safe to call any number of times.
    pub fn disconnect(&self) {
        let _ = self.sender.commands.send(Command::Disconnect);
    }

    /// Reconnects now, skipping any pending retry delay.
    ///
    /// Also revives a channel closed with [`ChannelHandle::disconnect`].
    pub fn reconnect(&self) {
        let _ = self.sender.commands.send(Command::Reconnect);
    }

    /// Waits until `predicate` holds for the state or `limit` elapses.
    ///
    /// Returns the state that satisfied the predicate.
    pub async fn wait_for(
        &self,
        limit: Duration,
        mut predicate: impl FnMut(ConnectionState) -> bool,
    ) -> Option<ConnectionState> {
        let mut rx = self.state_rx.clone();
        let wait = rx.wait_for(|state| predicate(*state));
        timeout(limit, wait)
            .await
            .ok()
            .and_then(Result::ok)
            .map(|state| *state)
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("channel", &self.channel())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder that spawns the connection driver.
///
/// # Example
///
/// ```no_run
/// use brain_channel::{ChannelClient, ChannelConfig};
///
/// # async fn run() -> Result<(), brain_core::error::BrainError> {
/// let config = ChannelConfig::builder()
///     .base_url("ws://localhost:8000/ws")
///     .channel("signals")
///     .build();
///
/// let handle = ChannelClient::new(config).spawn()?;
/// handle.disconnect();
/// # Ok(())
/// # }
/// ```
pub struct ChannelClient {
    config: ChannelConfig,
    callback: Arc<dyn ChannelCallback>,
}

impl ChannelClient {
    /// Creates a client with a no-op callback.
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            callback: Arc::new(NoopCallback),
        }
    }

    /// Sets the callback for channel events.
    #[must_use]
    pub fn with_callback(mut self, callback: Arc<dyn ChannelCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Validates the configuration and spawns the driver on the current
    /// Tokio runtime. The first connection attempt starts immediately.
    pub fn spawn(self) -> Result<ChannelHandle, BrainError> {
        self.config.validate()?;
        let url = self.config.endpoint_url()?;
        let channel: Arc<str> = Arc::from(self.config.channel.trim().trim_matches('/'));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (lifetime_tx, lifetime_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let status = Arc::new(RwLock::new(ChannelStatus::default()));

        let sender = ChannelSender {
            channel: Arc::clone(&channel),
            commands: command_tx,
            status: Arc::clone(&status),
        };

        let span = channel_span(&channel, &url);
        let driver = Driver {
            machine: ChannelMachine::new(self.config.retry_policy()),
            channel,
            url,
            headers: self.config.headers.clone(),
            connect_timeout: self.config.connect_timeout(),
            status,
            state_tx,
            callback: self.callback,
            sender: sender.clone(),
            commands: command_rx,
            lifetime: lifetime_rx,
            timer: ReconnectTimer::new(),
            opening: None,
            transport: None,
        };
        tokio::spawn(driver.run().instrument(span));

        Ok(ChannelHandle {
            sender,
            state_rx,
            _lifetime: Arc::new(lifetime_tx),
        })
    }
}

enum Wake {
    Command(Command),
    Released,
    Opened(Result<WsStream, NetworkError>),
    Inbound(Option<Result<Message, WsError>>),
    RetryElapsed,
}

struct Driver {
    channel: Arc<str>,
    url: String,
    headers: HashMap<String, String>,
    connect_timeout: Duration,
    machine: ChannelMachine,
    status: Arc<RwLock<ChannelStatus>>,
    state_tx: watch::Sender<ConnectionState>,
    callback: Arc<dyn ChannelCallback>,
    sender: ChannelSender,
    commands: mpsc::UnboundedReceiver<Command>,
    lifetime: oneshot::Receiver<()>,
    timer: ReconnectTimer,
    opening: Option<OpenFuture>,
    transport: Option<WsStream>,
}

impl Driver {
    async fn run(mut self) {
        self.dispatch(Event::Start).await;

        loop {
            let wake = tokio::select! {
                Some(command) = self.commands.recv() => Wake::Command(command),
                _ = &mut self.lifetime => Wake::Released,
                result = poll_opening(&mut self.opening), if self.opening.is_some() => {
                    Wake::Opened(result)
                }
                frame = next_frame(&mut self.transport), if self.transport.is_some() => {
                    Wake::Inbound(frame)
                }
                () = self.timer.elapsed(), if self.timer.is_armed() => Wake::RetryElapsed,
            };

            match wake {
                Wake::Command(Command::Send(message)) => self.send(message).await,
                Wake::Command(Command::Disconnect) => self.dispatch(Event::Disconnect).await,
                Wake::Command(Command::Reconnect) => self.dispatch(Event::Reconnect).await,
                Wake::Released => {
                    debug!("All handles dropped");
                    self.dispatch(Event::Disconnect).await;
                    break;
                }
                Wake::Opened(Ok(stream)) => {
                    self.opening = None;
                    self.transport = Some(stream);
                    self.dispatch(Event::Opened).await;
                }
                Wake::Opened(Err(error)) => {
                    self.opening = None;
                    warn!(error = %error, "Channel connection failed");
                    self.dispatch(Event::OpenFailed(error)).await;
                }
                Wake::Inbound(Some(Ok(message))) => self.on_frame(message).await,
                Wake::Inbound(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)))
                | Wake::Inbound(None) => {
                    self.transport = None;
                    self.dispatch(Event::Closed).await;
                }
                Wake::Inbound(Some(Err(e))) => {
                    warn!(error = %e, "Channel transport error");
                    self.transport = None;
                    self.dispatch(Event::TransportError(NetworkError::WebSocket {
                        reason: e.to_string(),
                    }))
                    .await;
                    self.dispatch(Event::Closed).await;
                }
                Wake::RetryElapsed => self.dispatch(Event::RetryElapsed).await,
            }
        }

        debug!("Channel driver stopped");
    }

    /// Feeds an event through the machine, then performs the resulting
    /// actions. Actions that complete synchronously report back through the
    /// same queue.
    async fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let actions = self.machine.handle(event);
            self.publish_state();

            for action in actions {
                if let Some(follow_up) = self.perform(action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        {
            let mut status = self.status.write();
            status.state = state;
            status.reconnect_attempts = self.machine.attempts();
        }
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    async fn perform(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::OpenTransport => {
                info!(url = %self.url, "Connecting channel");
                self.opening = Some(Box::pin(open_transport(
                    self.url.clone(),
                    self.headers.clone(),
                    self.connect_timeout,
                )));
                None
            }
            Action::CloseTransport => {
                self.opening = None;
                self.release_transport().await;
                Some(Event::Closed)
            }
            Action::ArmRetry(delay) => {
                info!(
                    attempt = self.machine.attempts(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Channel reconnect scheduled"
                );
                self.timer.arm(delay);
                None
            }
            Action::CancelRetry => {
                if self.timer.cancel() {
                    debug!("Pending reconnect cancelled");
                }
                None
            }
            Action::EmitConnected => {
                self.status.write().mark_connected();
                info!(channel = %self.channel, "Channel connected");
                self.callback.on_connect(&self.sender).await;
                None
            }
            Action::EmitDisconnected => {
                info!(channel = %self.channel, "Channel disconnected");
                self.callback.on_disconnect().await;
                None
            }
            Action::EmitMessage(envelope) => {
                self.status.write().last_message = Some(envelope.clone());
                self.callback.on_message(envelope).await;
                None
            }
            Action::EmitError(error) => {
                self.callback.on_error(error).await;
                None
            }
        }
    }

    async fn on_frame(&mut self, message: Message) {
        let parsed = match &message {
            Message::Text(text) => Envelope::parse(text),
            Message::Binary(bytes) => Envelope::parse_bytes(bytes),
            Message::Close(frame) => {
                debug!(frame = ?frame, "Server sent close frame");
                // The peer may never drop its socket; finish our side and treat
                // the channel as closed now.
                self.release_transport().await;
                self.dispatch(Event::Closed).await;
                return;
            }
            // Pings are answered by the protocol layer.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return,
        };

        match parsed {
            Ok(envelope) => {
                debug!(kind = %envelope.kind, "Frame received");
                self.dispatch(Event::Frame(envelope)).await;
            }
            Err(e) => {
                warn!(error = %e, len = message.len(), "Dropping malformed frame");
            }
        }
    }

    /// Drops the transport after a close handshake bounded by the connect
    /// timeout.
    async fn release_transport(&mut self) {
        if let Some(mut stream) = self.transport.take() {
            match timeout(self.connect_timeout, stream.close(None)).await {
                Ok(Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    debug!("Channel transport closed");
                }
                Ok(Err(e)) => debug!(error = %e, "Close handshake failed"),
                Err(_) => debug!("Close handshake timed out"),
            }
        }
    }

    async fn send(&mut self, message: Message) {
        let Some(stream) = self.transport.as_mut() else {
            debug!("Dropping outbound frame, channel not connected");
            return;
        };

        if let Err(e) = stream.send(message).await {
            warn!(error = %e, "Failed to send frame");
            self.dispatch(Event::TransportError(NetworkError::WebSocket {
                reason: e.to_string(),
            }))
            .await;
        }
    }
}

async fn poll_opening(opening: &mut Option<OpenFuture>) -> Result<WsStream, NetworkError> {
    match opening.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(transport: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match transport.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn open_transport(
    url: String,
    headers: HashMap<String, String>,
    connect_timeout: Duration,
) -> Result<WsStream, NetworkError> {
    let invalid = |reason: String| NetworkError::InvalidEndpoint {
        url: url.clone(),
        reason,
    };

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;

    for (name, value) in &headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid(format!("header '{name}': {e}")))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| invalid(format!("header '{name}': {e}")))?;
        request.headers_mut().insert(header_name, header_value);
    }

    let (stream, _response) = timeout(connect_timeout, connect_async(request))
        .await
        .map_err(|_| NetworkError::Timeout {
            timeout_ms: u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX),
        })?
        .map_err(|e| NetworkError::ConnectionFailed {
            reason: e.to_string(),
        })?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_rejects_empty_channel() {
        let config = ChannelConfig::builder()
            .base_url("ws://localhost:8000/ws")
            .build();

        let result = ChannelClient::new(config).spawn();
        assert!(matches!(result, Err(BrainError::Config(_))));
    }

    #[test]
    fn test_spawn_rejects_non_ws_scheme() {
        let config = ChannelConfig::builder()
            .base_url("https://localhost:8000/ws")
            .channel("market-data")
            .build();

        assert!(ChannelClient::new(config).spawn().is_err());
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_open_transport_refused() {
        let result = open_transport(
            format!("ws://127.0.0.1:{}/ws", unused_port()),
            HashMap::new(),
            Duration::from_secs(2),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_transport_rejects_bad_header() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());

        let result =
            open_transport("ws://127.0.0.1:9/ws".to_string(), headers, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(NetworkError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_sender_refuses_when_not_connected() {
        let config = ChannelConfig::builder()
            .base_url(format!("ws://127.0.0.1:{}/ws", unused_port()))
            .channel("signals")
            .reconnect_enabled(false)
            .build();

        let handle = ChannelClient::new(config).spawn().unwrap();
        let result = handle.send_text("hello");
        assert!(matches!(result, Err(NetworkError::ConnectionClosed { .. })));

        handle.disconnect();
        handle.disconnect();
        let closed = handle
            .wait_for(Duration::from_secs(5), |s| s == ConnectionState::Closed)
            .await;
        assert_eq!(closed, Some(ConnectionState::Closed));
    }
}
