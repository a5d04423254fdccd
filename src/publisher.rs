//! TCP fan-out publisher
//!
//! Every connected client is registered on the hub and receives one JSON
//! record per line. Each client owns a latest-value slot: the hub overwrites
//! it and returns immediately, and the client's writer task sends whatever
//! is newest when the socket is ready. A slow client therefore skips
//! intermediate records without ever holding up the hub or other clients.

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tidewatch_core::{BroadcastHub, Record, Subscriber};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

type Slot = Option<Arc<Record>>;

/// Hub-side half of a client: overwrites the latest-value slot
struct ClientSink {
    label: String,
    slot: watch::Sender<Slot>,
}

impl Subscriber for ClientSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn deliver(&self, record: &Arc<Record>) -> Result<()> {
        self.slot
            .send(Some(Arc::clone(record)))
            .map_err(|_| anyhow!("client writer gone"))
    }
}

pub struct TcpPublisher {
    listener: TcpListener,
    hub: Arc<BroadcastHub>,
}

impl TcpPublisher {
    /// Bind the listener. Clients are only accepted once [`run`](Self::run) is awaited.
    pub async fn bind(bind_address: &str, hub: Arc<BroadcastHub>) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("Failed to bind publisher on {}", bind_address))?;

        info!("TCP publisher listening on {}", listener.local_addr()?);
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until shutdown
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut accepted = 0u64;
        let client_shutdown = shutdown.clone();

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                incoming = self.listener.accept() => match incoming {
                    Ok((stream, addr)) => {
                        accepted += 1;
                        self.attach(stream, addr, client_shutdown.clone());
                    }
                    Err(e) => error!("Error accepting client connection: {}", e),
                },
            }
        }

        info!("TCP publisher stopped ({} clients served)", accepted);
    }

    fn attach(&self, stream: TcpStream, addr: SocketAddr, shutdown: watch::Receiver<bool>) {
        let (slot, latest) = watch::channel(None);
        let id = self.hub.subscribe(Arc::new(ClientSink {
            label: format!("client {}", addr),
            slot,
        }));
        info!("New client connected: {} ({})", addr, id);

        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, latest, shutdown).await {
                debug!("Client {} dropped: {:#}", addr, e);
            }
            hub.unsubscribe(id);
            info!("Client disconnected: {}", addr);
        });
    }
}

/// Write the newest record whenever the slot changes, until the client goes away
async fn serve_client(
    stream: TcpStream,
    mut latest: watch::Receiver<Slot>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let mut discard = [0u8; 256];
    let mut line = Vec::with_capacity(512);

    loop {
        tokio::select! {
            changed = latest.changed() => {
                changed.map_err(|_| anyhow!("unsubscribed"))?;
                let record = latest.borrow_and_update().clone();
                if let Some(record) = record {
                    line.clear();
                    serde_json::to_writer(&mut line, record.as_ref())?;
                    line.push(b'\n');
                    // A client that stops reading must not pin the task past shutdown
                    tokio::select! {
                        written = writer.write_all(&line) => written?,
                        _ = shutdown.changed() => return Ok(()),
                    }
                }
            }
            read = reader.read(&mut discard) => {
                // Clients never send anything meaningful; EOF means they left
                if read? == 0 {
                    return Ok(());
                }
            }
            _ = shutdown.changed() => {
                if let Err(e) = writer.shutdown().await {
                    warn!("Failed to close client stream: {}", e);
                }
                return Ok(());
            }
        }
    }
}
