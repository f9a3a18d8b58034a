//! Integration tests for the network router over real loopback sockets.
//!
//! A minimal fake server (blocking std sockets on 127.0.0.1) plays the other
//! end of both transports.  The gameplay side is the real update system
//! pulling from a real [`Router`].

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use floorsync_client::application::update::{ClientUpdateSystem, PullOutcome};
use floorsync_client::infrastructure::network::{NetError, Router};
use floorsync_client::infrastructure::storage::config::NetworkConfig;
use floorsync_client::infrastructure::world::memory::InMemoryWorld;
use floorsync_core::protocol::{
    decode_datagram, decode_payload, decode_type, encode_message, AllPositionUpdateMessage,
    ChatMessage, ClientLobbyMessage, GameState, GameStatusMessage, Message, PacketType,
    PlayerMotion, PlayerStatus, PositionUpdateRequestMessage, Team, MAX_DATAGRAM_SIZE,
    MAX_PLAYERS,
};

const DEADLINE: Duration = Duration::from_secs(5);

struct FakeServer {
    stream: TcpStream,
    udp: UdpSocket,
    client_udp: SocketAddr,
}

/// Binds both server sockets, connects a router to them, and accepts it.
fn connect_pair() -> (FakeServer, Router) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind TCP listener");
    let udp = UdpSocket::bind("127.0.0.1:0").expect("bind UDP socket");
    udp.set_read_timeout(Some(Duration::from_secs(2)))
        .expect("UDP read timeout");

    let config = NetworkConfig {
        server_host: "127.0.0.1".into(),
        tcp_port: listener.local_addr().unwrap().port(),
        udp_port: udp.local_addr().unwrap().port(),
        poll_timeout_ms: 10,
        ..NetworkConfig::default()
    };
    let router = Router::connect(&config).expect("router must connect");
    let (stream, _) = listener.accept().expect("accept client");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("TCP read timeout");

    let client_udp = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        router.local_udp_addr().port(),
    );
    (
        FakeServer {
            stream,
            udp,
            client_udp,
        },
        router,
    )
}

fn status_with(id: usize, team: Team) -> Message {
    let mut players = [PlayerStatus::default(); MAX_PLAYERS];
    players[id] = PlayerStatus {
        valid: true,
        team,
        character: 1,
        ready: true,
    };
    Message::GameStatus(GameStatusMessage {
        game_state: GameState::Running,
        players,
    })
}

fn position_of(id: usize, x: f32, y: f32) -> Message {
    let mut players = [PlayerMotion::default(); MAX_PLAYERS];
    players[id] = PlayerMotion {
        x,
        y,
        vx: 0.0,
        vy: 0.0,
    };
    Message::AllPositionUpdate(AllPositionUpdateMessage {
        floor: 0,
        on_floor_mask: 1 << id,
        players,
    })
}

#[test]
fn test_packets_from_both_transports_reach_the_world() {
    // Arrange
    let (mut server, mut router) = connect_pair();
    let mut updates = ClientUpdateSystem::new();
    updates.begin_session();
    let mut world = InMemoryWorld::default();

    let chat = Message::Chat(ChatMessage {
        sender: 2,
        text: "over tcp".into(),
    });
    let mut reliable = encode_message(&status_with(2, Team::B), 0).unwrap();
    reliable.extend(encode_message(&chat, 0).unwrap());
    server.stream.write_all(&reliable).unwrap();
    let datagram = encode_message(&position_of(2, 12.5, -3.0), 1).unwrap();

    // Act – keep pulling (and re-sending the lossy datagram) until both land
    let started = Instant::now();
    let placed = loop {
        server.udp.send_to(&datagram, server.client_udp).unwrap();
        assert_eq!(updates.pull_and_apply(&mut router, &mut world), PullOutcome::Ok);

        let placed = updates
            .session()
            .players
            .get(2)
            .and_then(|b| world.entity(b.entity))
            .map(|r| (r.x, r.y));
        if placed == Some((12.5, -3.0)) && !world.chat_log().is_empty() {
            break placed;
        }
        assert!(started.elapsed() < DEADLINE, "packets never arrived");
        std::thread::sleep(Duration::from_millis(10));
    };

    // Assert
    assert_eq!(placed, Some((12.5, -3.0)));
    assert_eq!(world.chat_log(), &[(2, "over tcp".to_string())]);
    assert_eq!(world.remote_players().count(), 1);
    assert!(router.is_running());
}

#[test]
fn test_requests_leave_on_the_transport_their_type_names() {
    // Arrange
    let (mut server, router) = connect_pair();
    let lobby = Message::ClientLobby(ClientLobbyMessage {
        player_id: 4,
        team: Team::A,
        character: 3,
        ready: true,
    });
    let report = Message::PositionUpdateRequest(PositionUpdateRequestMessage {
        player_id: 4,
        floor: 0,
        motion: PlayerMotion {
            x: 1.0,
            y: 2.0,
            vx: 0.0,
            vy: 0.0,
        },
    });

    // Act
    router.send(&lobby).unwrap();
    router
        .send(&ClientUpdateSystem::connect_request("alice", Team::A))
        .unwrap();
    router.send(&report).unwrap();

    // Assert – both reliable requests arrive in order on the stream
    let mut word = [0u8; 4];
    server.stream.read_exact(&mut word).unwrap();
    let first = decode_type(u32::from_be_bytes(word)).unwrap();
    assert_eq!(first, PacketType::ClientLobby);
    let mut payload = vec![0u8; first.payload_size()];
    server.stream.read_exact(&mut payload).unwrap();
    assert_eq!(decode_payload(first, &payload).unwrap(), lobby);

    server.stream.read_exact(&mut word).unwrap();
    let second = decode_type(u32::from_be_bytes(word)).unwrap();
    assert_eq!(second, PacketType::ConnectAccept);
    let mut payload = vec![0u8; second.payload_size()];
    server.stream.read_exact(&mut payload).unwrap();

    // Assert – the position report arrives as one stamped datagram
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];
    let (n, from) = server.udp.recv_from(&mut buf).unwrap();
    assert_eq!(from.port(), server.client_udp.port());
    let (packet_type, payload, stamp) = decode_datagram(&buf[..n]).unwrap().unwrap();
    assert_eq!(packet_type, PacketType::PositionUpdateRequest);
    assert_eq!(decode_payload(packet_type, &payload).unwrap(), report);
    assert!(stamp > 0);
}

#[test]
fn test_server_hang_up_ends_the_session() {
    // Arrange
    let (server, mut router) = connect_pair();
    let mut updates = ClientUpdateSystem::new();
    updates.begin_session();
    let mut world = InMemoryWorld::default();

    // Act
    drop(server);
    let started = Instant::now();
    let reason = loop {
        match updates.pull_and_apply(&mut router, &mut world) {
            PullOutcome::Shutdown(reason) => break reason,
            PullOutcome::Ok => {}
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(started.elapsed() < DEADLINE, "hang-up never noticed");
        std::thread::sleep(Duration::from_millis(10));
    };

    // Assert
    assert!(!reason.is_empty());
    assert!(!updates.is_ready());
    assert_eq!(router.last_error(), Some(NetError::ConnectionClosed));
    assert!(!router.is_running());
}

#[test]
fn test_shutdown_is_idempotent_and_closes_the_outbound_pipe() {
    // Arrange
    let (_server, mut router) = connect_pair();

    // Act
    router.shutdown("test over");
    router.shutdown("again");

    // Assert
    assert!(!router.is_running());
    assert!(matches!(
        router.send(&Message::KeepAlive),
        Err(NetError::PipeWriteFailed(_))
    ));
}

#[test]
fn test_router_shutdown_reaches_gameplay_and_resets_tables() {
    // Arrange – bind a remote player so there is state to reset
    let (mut server, mut router) = connect_pair();
    let mut updates = ClientUpdateSystem::new();
    updates.begin_session();
    let mut world = InMemoryWorld::default();
    let status = encode_message(&status_with(2, Team::A), 0).unwrap();
    server.stream.write_all(&status).unwrap();

    let started = Instant::now();
    while updates.session().players.get(2).is_none() {
        assert_eq!(updates.pull_and_apply(&mut router, &mut world), PullOutcome::Ok);
        assert!(started.elapsed() < DEADLINE, "game status never arrived");
        std::thread::sleep(Duration::from_millis(10));
    }

    // Act
    router.shutdown("maintenance");
    let outcome = updates.pull_and_apply(&mut router, &mut world);

    // Assert
    assert_eq!(outcome, PullOutcome::Shutdown("maintenance".into()));
    assert!(updates.session().players.is_empty());
    assert!(updates.session().objectives.entities().is_empty());
    assert!(!updates.is_ready());
    assert!(!router.is_running());
}
