//! TCP port liveness helpers.
//!
//! Grading stages start student servers as subprocesses and mock servers
//! in-process, then reuse fixed port ranges across sequential stages. These
//! helpers provide the two synchronization points that make that safe:
//! waiting for a port to be listened on before issuing requests, and
//! waiting for a port to be released before the next stage binds it again.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The port was not observed in the expected state before the deadline.
#[derive(Debug, PartialEq, Eq)]
pub struct PortWaitTimeout {
    pub port: u16,
    pub waited: Duration,
}

impl std::fmt::Display for PortWaitTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "port {} did not reach the expected state within {:?}",
            self.port, self.waited
        )
    }
}

impl std::error::Error for PortWaitTimeout {}

/// Polls until something accepts connections on `port`, or `timeout` elapses.
///
/// A timeout is the caller's cancellation signal: stages convert it into a
/// "server failed to start" grade rather than an error.
pub async fn wait_for_port(port: u16, timeout: Duration) -> Result<(), PortWaitTimeout> {
    let deadline = Instant::now() + timeout;
    loop {
        match TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
            Ok(_) => {
                debug!(port, "port is listened to");
                return Ok(());
            }
            Err(_) if Instant::now() >= deadline => {
                return Err(PortWaitTimeout {
                    port,
                    waited: timeout,
                });
            }
            Err(_) => sleep(POLL_INTERVAL).await,
        }
    }
}

/// Polls until `port` can be bound again, or `timeout` elapses.
///
/// Must be called after tearing down any server so that the next stage can
/// treat acquire/release of a port as atomic.
pub async fn wait_for_port_free(port: u16, timeout: Duration) -> Result<(), PortWaitTimeout> {
    let deadline = Instant::now() + timeout;
    loop {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(listener) => {
                drop(listener);
                debug!(port, "port is free");
                return Ok(());
            }
            Err(_) if Instant::now() >= deadline => {
                return Err(PortWaitTimeout {
                    port,
                    waited: timeout,
                });
            }
            Err(_) => sleep(POLL_INTERVAL).await,
        }
    }
}
