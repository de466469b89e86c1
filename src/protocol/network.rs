//! Network protocol runner
//!
//! The runner owns the connection lifecycle: it performs the bootstrap HTTP
//! handshake, keeps a single WebSocket open, updates the shared target from
//! server events, and submits solutions with at most one in flight.
//!
//! All protocol callbacks run on the runner task. Solutions cross from the
//! miner threads into the event loop through a dedicated feeder thread that
//! parks them in the [`SubmitState`] and wakes the loop over a channel, so
//! the WebSocket send path is only ever touched from one task.

use crate::core::{SharedState, ShortHash, Solution, Target};
use crate::error::{Error, Result};
use crate::protocol::messages::{BootstrapResponse, ServerMessage, SubmitBlock};
use crate::protocol::submit::SubmitState;
use futures::{SinkExt, StreamExt};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Protocol event hooks.
///
/// Every operation defaults to a no-op; implementors override the ones they
/// care about. All hooks are invoked on the network runner task.
pub trait MiningEvents: Send + Sync {
    /// A connection was established (or reestablished)
    fn on_connect(&self) {}

    /// The connection dropped; `reconnecting` is true when a reconnect
    /// attempt follows
    fn on_disconnect(&self, _reconnecting: bool) {}

    /// The shared mining target was replaced from the network
    fn on_target(&self, _target: &Target) {}

    /// A solution was broadcast to the node
    fn on_submitted(&self, _solution: &Solution) {}

    /// The node accepted a submission
    fn on_solved(&self, _solution: &Solution, _height: u64, _value: u64) {}

    /// The node rejected a submission
    fn on_rejected(&self, _solution: &Solution, _error: &str) {}
}

/// The all-defaults implementation of [`MiningEvents`]
pub struct NoEvents;

impl MiningEvents for NoEvents {}

/// Options for the network runner
pub struct NetOptions {
    /// Reconnect (bootstrap included) whenever the connection drops
    pub auto_reconnect: bool,

    /// Protocol event hooks
    pub events: Arc<dyn MiningEvents>,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: false,
            events: Arc::new(NoEvents),
        }
    }
}

/// Request a WebSocket endpoint from the bootstrap URL
async fn bootstrap(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!(%url, "Requesting websocket endpoint");

    let response: BootstrapResponse = client.post(url).send().await?.json().await?;

    if response.ok {
        response
            .url
            .ok_or_else(|| Error::invalid_message("bootstrap response without url"))
    } else {
        Err(Error::bootstrap_rejected(
            response.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

/// Apply one inbound text frame to the shared state and submission slot.
///
/// An `Err` here means a single malformed message; the connection stays up.
fn dispatch(
    text: &str,
    state: &SharedState,
    submit: &SubmitState,
    events: &dyn MiningEvents,
) -> Result<()> {
    match ServerMessage::parse(text)? {
        ServerMessage::Reply(reply) => {
            if reply.id != submit.id() as i64 {
                debug!(id = reply.id, "Ignoring reply for stale submission");
                return Ok(());
            }

            let Some(solution) = submit.get() else {
                return Ok(());
            };

            if reply.ok {
                let target = reply.target()?;
                if let Some(block) = reply.block.as_ref() {
                    events.on_solved(&solution, block.height, block.value);
                }
                state.set_target(target);
                events.on_target(&target);
            } else {
                events.on_rejected(&solution, reply.error.as_deref().unwrap_or("unknown error"));
            }

            submit.clear();
        }
        ServerMessage::Hello(hello) => {
            let target = hello.target()?;
            info!(%target, "Received hello");
            state.set_target(target);
            events.on_target(&target);
        }
        ServerMessage::Block(event) => {
            let target = event.target()?;
            info!(%target, "Block found on network");
            state.set_target(target);
            events.on_target(&target);
        }
        ServerMessage::Other => {}
    }

    Ok(())
}

/// Spawn the thread that moves solutions from the shared queue into the
/// submission slot, waking the event loop after each one.
///
/// Exits when the state is stopped or the submit state is shut down.
fn spawn_feeder(
    state: Arc<SharedState>,
    submit: Arc<SubmitState>,
    wake_tx: mpsc::UnboundedSender<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Some(solution) = state.pop_solution() {
            if !submit.set(solution) {
                break;
            }
            if wake_tx.send(()).is_err() {
                break;
            }
        }
    })
}

/// Connect to the node and synchronously set mining targets and submit
/// solutions.
///
/// Blocks until the connection terminates with `auto_reconnect` off, or
/// until [`SharedState::stop`] is observed. The shared state is stopped
/// before returning so miner threads wind down either way.
pub async fn run(bootstrap_url: &str, state: Arc<SharedState>, options: NetOptions) -> Result<()> {
    let client = reqwest::Client::new();
    let submit = Arc::new(SubmitState::new());
    let (wake_tx, mut wake_rx) = mpsc::unbounded_channel();

    let feeder = spawn_feeder(Arc::clone(&state), Arc::clone(&submit), wake_tx);

    let result = connection_loop(
        &client,
        bootstrap_url,
        &state,
        &submit,
        &mut wake_rx,
        &options,
    )
    .await;

    state.stop();
    submit.shutdown();
    let _ = feeder.join();

    result
}

async fn connection_loop(
    client: &reqwest::Client,
    bootstrap_url: &str,
    state: &SharedState,
    submit: &SubmitState,
    wake_rx: &mut mpsc::UnboundedReceiver<()>,
    options: &NetOptions,
) -> Result<()> {
    loop {
        if state.is_stopped() {
            return Ok(());
        }

        let ws_url = bootstrap(client, bootstrap_url).await?;
        info!(url = %ws_url, "Connecting to node");

        let (ws, _response) = connect_async(ws_url.as_str()).await?;
        options.events.on_connect();

        let (mut sink, mut stream) = ws.split();

        let (code, reason) = loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        debug!(%text, "Server message");
                        if let Err(e) = dispatch(&text, state, submit, &*options.events) {
                            warn!(error = %e, "Ignoring malformed server message");
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((0, String::new()));
                    }
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(e)) => break (0, e.to_string()),
                    None => break (0, "connection closed".to_string()),
                },
                wake = wake_rx.recv() => {
                    if state.is_stopped() || wake.is_none() {
                        return Ok(());
                    }
                    if let Some(solution) = submit.get() {
                        let message = SubmitBlock::new(submit.id(), solution.address, solution.nonce);
                        sink.send(Message::Text(serde_json::to_string(&message)?)).await?;
                        options.events.on_submitted(&solution);
                    }
                }
            }

            if state.is_stopped() {
                return Ok(());
            }
        };

        state.unset_target();
        submit.clear();
        options.events.on_disconnect(options.auto_reconnect);

        if !options.auto_reconnect {
            return Err(Error::dropped(code, reason));
        }

        // TODO: exponential backoff; for now the bootstrap is retried immediately
        warn!(code, %reason, "Disconnected, reconnecting");
    }
}

/// Run against a synthetic network: a fixed target is set once and every
/// submission is immediately accepted with a monotonically increasing fake
/// block height. No real connection is opened.
pub async fn run_demo(
    fixed_work: i64,
    state: Arc<SharedState>,
    options: NetOptions,
) -> Result<()> {
    let submit = Arc::new(SubmitState::new());
    let (wake_tx, mut wake_rx) = mpsc::unbounded_channel();

    let feeder = spawn_feeder(Arc::clone(&state), Arc::clone(&submit), wake_tx);

    let target = Target::new(ShortHash::from_str("000000000000")?, fixed_work)?;
    info!(%target, "Demo mode, using synthetic target");

    options.events.on_connect();
    state.set_target(target);
    options.events.on_target(&target);

    let mut height = 1u64;

    while wake_rx.recv().await.is_some() {
        if state.is_stopped() {
            break;
        }

        if let Some(solution) = submit.get() {
            options.events.on_submitted(&solution);
            options.events.on_solved(&solution, height, 25);
            height += 1;
            submit.clear();
        }
    }

    state.stop();
    submit.shutdown();
    let _ = feeder.join();

    Ok(())
}
