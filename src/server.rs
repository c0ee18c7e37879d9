//! TCP server for finger connections.
//!
//! Accepts connections and hands each one to its own task running the
//! finger handler. Nothing is shared between connections except the
//! read-only pipeline.

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::protocols::finger;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace};

/// Listen backlog
const BACKLOG: i32 = 1024;

/// Server instance
pub struct Server {
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    connection_limit: Arc<Semaphore>,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Bind the listening socket.
    pub async fn bind(config: &Config, pipeline: Pipeline) -> io::Result<Self> {
        let addr: SocketAddr = tokio::net::lookup_host(config.listen.as_str())
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no address for '{}'", config.listen),
                )
            })?;

        let listener = TcpListener::from_std(create_listener(addr)?)?;
        info!(address = %listener.local_addr()?, "Server listening");

        Ok(Server {
            listener,
            pipeline: Arc::new(pipeline),
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            read_timeout: config.read_timeout,
        })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the runtime shuts down.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            // Wait for a connection slot
            let permit = Arc::clone(&self.connection_limit).acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let pipeline = Arc::clone(&self.pipeline);
                    let read_timeout = self.read_timeout;

                    tokio::spawn(async move {
                        match finger::handle_connection(stream, pipeline, read_timeout).await {
                            Ok(stage) => trace!(peer = %addr, ?stage, "Connection done"),
                            Err(e) => debug!(peer = %addr, error = %e, "Connection error"),
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Create a TCP listener with SO_REUSEADDR so restarts can rebind port 79.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    Ok(socket.into())
}
