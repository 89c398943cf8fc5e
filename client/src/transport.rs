//! Websocket transport for a [`SyncClient`].
//!
//! DESIGN
//! ======
//! One background task owns the socket. It connects, lets the client queue
//! its `join_room`, then pumps frames both ways until the connection drops.
//! After a drop it waits `reconnect_delay` once and starts over; every new
//! connection rejoins and rehydrates from the server's `full_state`.
//!
//! The client sits behind a std mutex shared with the caller. The task only
//! takes the lock between awaits, never across one. Callers mutate the
//! client through [`TransportHandle::with_client`], which wakes the task so
//! queued intents go out promptly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::render::Renderer;
use crate::session::SyncClient;

pub type SharedClient<R> = Arc<Mutex<SyncClient<R>>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),
    #[error("transport task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

/// Owner's side of a running transport.
pub struct TransportHandle<R: Renderer> {
    client: SharedClient<R>,
    wake: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<R: Renderer + Send + 'static> TransportHandle<R> {
    /// Start connecting to `url` in the background.
    #[must_use]
    pub fn spawn(url: impl Into<String>, client: SyncClient<R>) -> Self {
        let client = Arc::new(Mutex::new(client));
        let wake = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(url.into(), client.clone(), wake.clone(), shutdown_rx));
        Self { client, wake, shutdown, task }
    }
}

impl<R: Renderer> TransportHandle<R> {
    /// Run `f` against the client, then flush whatever it queued.
    pub fn with_client<T>(&self, f: impl FnOnce(&mut SyncClient<R>) -> T) -> T {
        let out = f(&mut lock(&self.client));
        self.wake.notify_one();
        out
    }

    #[must_use]
    pub fn client(&self) -> SharedClient<R> {
        self.client.clone()
    }

    /// Close the socket and wait for the task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Task`] if the task panicked.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        if self.shutdown.send(true).is_err() {
            debug!("transport: task already gone");
        }
        self.task.await?;
        Ok(())
    }
}

fn lock<R: Renderer>(client: &SharedClient<R>) -> MutexGuard<'_, SyncClient<R>> {
    client.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shutdown was requested, or the handle is gone.
fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

async fn run<R: Renderer>(
    url: String,
    client: SharedClient<R>,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        lock(&client).on_connecting();

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "transport: connected");
                lock(&client).on_open();
                match connect_and_run(stream, &client, &wake, &mut shutdown).await {
                    Ok(()) => info!(%url, "transport: disconnected"),
                    Err(e) => warn!(%url, error = %e, "transport: connection lost"),
                }
            }
            Err(e) => warn!(%url, error = %e, "transport: connect failed"),
        }

        let delay = {
            let mut guard = lock(&client);
            guard.on_close();
            guard.config().reconnect_delay
        };
        if stopping(&shutdown) {
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
        if stopping(&shutdown) {
            break;
        }
    }
}

/// Pump frames until the socket closes or shutdown is requested.
async fn connect_and_run<R, S>(
    stream: S,
    client: &SharedClient<R>,
    wake: &Notify,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), TransportError>
where
    R: Renderer,
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let (mut sink, mut source) = stream.split();
    flush(&mut sink, client).await?;

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    lock(client).handle_text(text.as_str());
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        lock(client).handle_text(text);
                    }
                    Err(e) => debug!(error = %e, "transport: dropped non-utf8 frame"),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            () = wake.notified() => flush(&mut sink, client).await?,
            _ = shutdown.changed() => {
                sink.send(Message::Close(None)).await?;
                return Ok(());
            }
        }
    }
}

/// Write every queued intent, oldest first.
async fn flush<R, S>(sink: &mut S, client: &SharedClient<R>) -> Result<(), TransportError>
where
    R: Renderer,
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let events = lock(client).drain_outbound();
    if events.is_empty() {
        return Ok(());
    }
    for event in events {
        match event.encode() {
            Ok(text) => sink.feed(Message::text(text)).await?,
            Err(e) => warn!(event = event.event(), error = %e, "transport: failed to encode intent"),
        }
    }
    sink.flush().await?;
    Ok(())
}
