//! Scripted client for poking a running server: connects, watches the lobby,
//! creates or joins a room and plays whenever it is its turn.

use clap::Parser;
use log::{error, info, warn};
use shared::{
    count_matches, decode_packet, encode_packet, Bid, ClientAction, Packet, PlayerInfo,
    RoomSnapshot, ServerEvent, DIE_FACES, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, Instant};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted Liar's Dice client", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player id to play as
    #[arg(short, long, default_value = "bot")]
    id: String,

    /// Display name
    #[arg(short, long, default_value = "Bot")]
    name: String,

    /// Room to create or join
    #[arg(short, long, default_value = "table")]
    room: String,

    /// Room password
    #[arg(long)]
    password: Option<String>,

    /// Join an existing room instead of creating one
    #[arg(short, long)]
    join: bool,

    /// Capacity when creating
    #[arg(short, long, default_value = "2")]
    capacity: u8,

    /// Seconds to stay connected
    #[arg(short, long, default_value = "60")]
    duration: u64,
}

struct TestClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    args: Args,
    connection_id: Option<u32>,
}

impl TestClient {
    async fn new(args: Args) -> Result<Self, BoxError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = args.server.parse()?;
        info!("Client socket bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            server_addr,
            args,
            connection_id: None,
        })
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), BoxError> {
        let data = encode_packet(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn send_action(&self, action: ClientAction) -> Result<(), BoxError> {
        self.send_packet(&Packet::Action(action)).await
    }

    fn player(&self) -> PlayerInfo {
        PlayerInfo::new(self.args.id.clone(), self.args.name.clone())
    }

    async fn enter_room(&self) -> Result<(), BoxError> {
        let action = if self.args.join {
            ClientAction::JoinRoom {
                name: self.args.room.clone(),
                password: self.args.password.clone(),
                player: self.player(),
            }
        } else {
            ClientAction::CreateRoom {
                name: self.args.room.clone(),
                password: self.args.password.clone(),
                player: self.player(),
                capacity: self.args.capacity,
            }
        };
        self.send_action(action).await
    }

    /// Doubts a bid that claims more than a third of the table, otherwise
    /// raises by one on the face it holds most of.
    async fn take_turn(&self, room: &RoomSnapshot) -> Result<(), BoxError> {
        let Some(game) = &room.game else {
            return Ok(());
        };
        let Some(me) = game.players.get(game.current_player) else {
            return Ok(());
        };
        if me.id != self.args.id {
            return Ok(());
        }

        let total_dice: u32 = game.players.iter().map(|p| u32::from(p.dice_count)).sum();
        let favourite = (1..=DIE_FACES)
            .max_by_key(|face| count_matches(me.dice.iter(), *face))
            .unwrap_or(DIE_FACES);

        let action = match game.current_bid {
            Some(bid) if bid.count.saturating_mul(3) > total_dice => ClientAction::Doubt {
                room_name: room.name.clone(),
            },
            Some(bid) => ClientAction::RaiseBid {
                room_name: room.name.clone(),
                bid: Bid::new(bid.value, bid.count.saturating_add(1)),
            },
            None => ClientAction::RaiseBid {
                room_name: room.name.clone(),
                bid: Bid::new(favourite, 1),
            },
        };
        info!("Playing {:?}", action);
        self.send_action(action).await
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), BoxError> {
        match packet {
            Packet::Connected { connection_id } => {
                info!("Connected! Connection ID: {}", connection_id);
                self.connection_id = Some(connection_id);
                self.send_action(ClientAction::Watch {
                    id: self.args.id.clone(),
                })
                .await?;
                self.enter_room().await?;
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connection_id = None;
            }
            Packet::Event(ServerEvent::Room { room }) | Packet::Event(ServerEvent::Restart { room }) => {
                info!(
                    "Room {}: {}/{} seated, game running: {}",
                    room.name,
                    room.players.len(),
                    room.capacity,
                    room.game.is_some()
                );
                self.take_turn(&room).await?;
            }
            Packet::Event(event) => info!("Event: {:?}", event),
            other => warn!("Unexpected packet: {:?}", other),
        }
        Ok(())
    }

    async fn run(&mut self) -> Result<(), BoxError> {
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await?;

        let deadline = Instant::now() + Duration::from_secs(self.args.duration);
        let mut heartbeat = interval(Duration::from_secs(2));
        let mut buffer = [0u8; 8192];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => match decode_packet(&buffer[0..len]) {
                            Ok(packet) => self.handle_packet(packet).await?,
                            Err(e) => warn!("Failed to decode packet: {}", e),
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                }
                _ = heartbeat.tick() => {
                    if self.connection_id.is_some() {
                        self.send_packet(&Packet::Heartbeat).await?;
                    }
                }
                _ = sleep(deadline.saturating_duration_since(Instant::now())) => {
                    break;
                }
            }
        }

        if self.connection_id.is_some() {
            self.send_action(ClientAction::LeaveImmediate {
                name: self.args.room.clone(),
                id: self.args.id.clone(),
            })
            .await?;
            self.send_packet(&Packet::Disconnect).await?;
        }
        info!("Test client finished");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut client = TestClient::new(args).await?;
    client.run().await
}
