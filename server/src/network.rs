//! Server network layer: UDP transport in front of the room coordinator

use crate::broadcast::Outgoing;
use crate::connections::ConnectionTable;
use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::directory::ConnectionId;
use crate::timers::{ScheduledTimer, Timer};
use log::{debug, error, info, warn};
use shared::{decode_packet, encode_packet, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network and timer tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ConnectionTimeout { connection: ConnectionId },
    TimerFired(Timer),
    Shutdown,
}

/// Messages sent from the main loop to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server owning the coordinator and its transport
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    coordinator: Coordinator,
    client_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, BoxError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new(config.max_clients))),
            client_timeout: config.client_timeout,
            coordinator: Coordinator::new(config),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping `run` from another task
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 8192];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = decode_packet(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(GameMessage::SendPacket { packet, addr }) = game_rx.recv().await {
                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
        });
    }

    /// Spawns task that drops connections whose heartbeats stopped
    async fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let timeout = self.client_timeout;
        let period = (timeout / 2).clamp(Duration::from_millis(50), Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                let timed_out = connections.write().await.reap_silent(timeout);

                for connection in timed_out {
                    let message = ServerMessage::ConnectionTimeout { connection };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    /// Sleeps for the timer's delay, then hands it back to the main loop
    fn spawn_timer(&self, scheduled: ScheduledTimer) {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(scheduled.delay).await;
            if server_tx
                .send(ServerMessage::TimerFired(scheduled.timer))
                .is_err()
            {
                debug!("Main loop gone, dropping timer");
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = encode_packet(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let connection = {
            let connections = self.connections.read().await;
            connections.by_addr(addr)
        };

        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let reason = "Protocol version mismatch".to_string();
                    self.send_packet(Packet::Disconnected { reason }, addr);
                    return;
                }

                // A reconnect from the same address replaces the old connection
                if let Some(existing_id) = connection {
                    info!("Replacing connection {} from {}", existing_id, addr);
                    self.connections.write().await.close(existing_id);
                    self.coordinator.disconnect(existing_id);
                }

                let new_id = self.connections.write().await.open(addr);
                match new_id {
                    Some(connection_id) => {
                        self.send_packet(Packet::Connected { connection_id }, addr);
                    }
                    None => {
                        let reason = "Server full".to_string();
                        self.send_packet(Packet::Disconnected { reason }, addr);
                    }
                }
            }

            Packet::Heartbeat => match connection {
                Some(connection) => {
                    self.connections.write().await.touch(connection);
                }
                None => debug!("Heartbeat from unknown address {}", addr),
            },

            Packet::Disconnect => {
                if let Some(connection) = connection {
                    self.connections.write().await.close(connection);
                    self.coordinator.disconnect(connection);
                }
            }

            Packet::Action(action) => match connection {
                Some(connection) => {
                    self.connections.write().await.touch(connection);
                    self.coordinator.handle_action(connection, action);
                }
                None => warn!("Action from unconnected address {}", addr),
            },

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Sends everything the coordinator queued and arms the timers it asked for
    async fn flush(&mut self) {
        let outgoing = self.coordinator.drain_outgoing();
        if !outgoing.is_empty() {
            let connections = self.connections.read().await;
            for Outgoing { connection, event } in outgoing {
                match connections.addr_of(connection) {
                    Some(addr) => self.send_packet(Packet::Event(event), addr),
                    None => debug!("Dropping event for closed connection {}", connection),
                }
            }
        }

        for scheduled in self.coordinator.drain_timers() {
            self.spawn_timer(scheduled);
        }
    }

    /// Main server loop: one message at a time, then flush
    pub async fn run(&mut self) -> Result<(), BoxError> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        info!("Server started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::ConnectionTimeout { connection }) => {
                    info!("Connection {} timed out", connection);
                    self.coordinator.disconnect(connection);
                }
                Some(ServerMessage::TimerFired(timer)) => {
                    self.coordinator.handle_timer(timer);
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Server shutting down");
                    break;
                }
            }

            self.flush().await;
        }

        Ok(())
    }
}
