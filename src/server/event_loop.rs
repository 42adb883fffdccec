//! Event Loop
//!
//! The node's single control task. It waits, without a timeout, on whichever
//! of these becomes ready first:
//!
//! - an inbound datagram
//! - an operator console line
//! - completion of a spawned registration task
//! - a shutdown signal
//!
//! Queries are resolved inline since they only read the registry.
//! Registrations are spawned and reaped later, so a slow one never stalls
//! the loop. No per-message failure ends the loop.

use super::console::{render_entries, render_stats, Command, HELP_TEXT};
use super::registration::{RegistrationOutcome, RegistrationServer};
use super::resolution::ResolutionEngine;
use super::transport::{send_message, DatagramTransport};
use crate::error::Result;
use crate::protocol::{Message, MessageCodec, MAX_DATAGRAM_SIZE};
use crate::registry::RegistryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Operator issued `end`
    Command,
    /// Shutdown signal received
    Signal,
}

/// Multiplexes the network socket and the operator console
pub struct EventLoop<R, W> {
    transport: Arc<dyn DatagramTransport>,
    registry: Arc<RegistryStore>,
    registration: RegistrationServer,
    resolution: ResolutionEngine,
    console: Option<Lines<R>>,
    output: W,
    tasks: JoinSet<Result<RegistrationOutcome>>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<R, W> EventLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        transport: Arc<dyn DatagramTransport>,
        registry: Arc<RegistryStore>,
        resolution: ResolutionEngine,
        console: R,
        output: W,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let registration = RegistrationServer::new(registry.clone(), transport.clone());

        Self {
            transport,
            registry,
            registration,
            resolution,
            console: Some(console.lines()),
            output,
            tasks: JoinSet::new(),
            shutdown_rx,
        }
    }

    /// Run until `end` or a shutdown signal
    pub async fn run(mut self) -> LoopExit {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        let exit = loop {
            tokio::select! {
                received = self.transport.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.on_datagram(&buf[..len], from).await,
                    Err(e) => warn!(error = %e, "Failed to receive datagram"),
                },
                line = next_line(&mut self.console) => match line {
                    Ok(Some(line)) => {
                        if let Some(exit) = self.on_command(&line).await {
                            break exit;
                        }
                    }
                    Ok(None) => {
                        info!("Console closed; continuing to serve network traffic");
                        self.console = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Console read failed; console disabled");
                        self.console = None;
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    on_registration_done(joined);
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break LoopExit::Signal;
                }
            }
        };

        // Let in-flight registrations finish replying before the socket goes away
        while let Some(joined) = self.tasks.join_next().await {
            on_registration_done(joined);
        }

        info!(reason = ?exit, "Event loop stopped");
        exit
    }

    async fn on_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let message = match MessageCodec::decode(datagram) {
            Ok(message) => message,
            Err(e) => {
                warn!(%from, error = %e, "Dropping malformed datagram");
                return;
            }
        };

        match message {
            Message::Register { child_kind, name } => {
                debug!(%from, kind = %child_kind, name = %name, "Registration received");
                self.registration
                    .spawn(&mut self.tasks, child_kind, name, from);
            }
            Message::Query { name } => {
                let outcome = self.resolution.resolve(&name);
                debug!(%from, name = %name, %outcome, "Query resolved");

                let reply = Message::from(outcome);
                if let Err(e) = send_message(self.transport.as_ref(), &reply, from).await {
                    warn!(%from, error = %e, "Failed to send query result");
                }
            }
            other => {
                debug!(%from, kind = other.kind(), "Ignoring unsolicited message");
            }
        }
    }

    async fn on_command(&mut self, line: &str) -> Option<LoopExit> {
        let command = Command::parse(line);
        if command != Command::Empty {
            self.print(&format!("server> {}\n", line.trim())).await;
        }

        match command {
            Command::End => return Some(LoopExit::Command),
            Command::ListSubdomains => {
                let text = render_entries(&self.registry.snapshot_subdomains());
                self.print(&text).await;
            }
            Command::ListHosts => {
                let text = render_entries(&self.registry.snapshot_hosts());
                self.print(&text).await;
            }
            Command::Stats => {
                let text = render_stats(&self.registry.stats());
                self.print(&text).await;
            }
            Command::Help => self.print(HELP_TEXT).await,
            Command::Unknown(command) => debug!(command = %command, "Ignoring unknown console command"),
            Command::Empty => {}
        }

        None
    }

    async fn print(&mut self, text: &str) {
        if let Err(e) = self.output.write_all(text.as_bytes()).await {
            warn!(error = %e, "Failed to write console output");
            return;
        }
        if let Err(e) = self.output.flush().await {
            warn!(error = %e, "Failed to flush console output");
        }
    }
}

/// Next console line, or never if the console is gone
async fn next_line<R>(console: &mut Option<Lines<R>>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    match console {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

fn on_registration_done(joined: std::result::Result<Result<RegistrationOutcome>, JoinError>) {
    match joined {
        Ok(Ok(outcome)) => debug!(name = %outcome.name, success = outcome.is_success(), "Registration task finished"),
        Ok(Err(e)) => debug!(error = %e, "Registration task finished without a reply"),
        Err(e) => error!(error = %e, "Registration task aborted"),
    }
}
