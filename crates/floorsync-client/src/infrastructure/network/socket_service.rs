//! Socket I/O service: the receive worker and the send worker.
//!
//! # Receive worker
//!
//! One loop waits on four things at once with `tokio::select!`:
//!
//! 1. the TCP stream has bytes,
//! 2. a UDP datagram arrived,
//! 3. the gameplay thread asked for a batch (signal channel),
//! 4. `poll_timeout` elapsed, so the `running` flag gets re-checked.
//!
//! When one transport is ready the worker handles it, then checks the other
//! one once without waiting (`try_read`/`try_recv`) so a busy UDP channel
//! cannot starve TCP or vice versa.
//!
//! Decoded packets sit in a [`PacketQueue`] until the gameplay thread asks for
//! them.  Every counted request is answered with exactly one batch on the
//! inbound pipe:
//!
//! ```text
//! [count:u32] ([type:u32][payload; size_table[type]]) * count
//! ```
//!
//! A fatal error replaces the count with [`SHUTDOWN_SENTINEL`] followed by a
//! length-prefixed UTF-8 message, after which the worker exits.
//!
//! # Why an accumulation buffer? (for beginners)
//!
//! `tokio::select!` drops the futures of the branches that did not win.  A
//! `read_exact` that had already consumed half a frame would lose those bytes
//! when dropped.  A plain `read` into a scratch buffer is cancel-safe, so the
//! worker appends whatever arrived to a [`StreamAssembler`] and carves whole
//! frames out of it afterwards.
//!
//! # Send worker
//!
//! A plain blocking loop: read a type word from the outbound pipe, read the
//! payload that type implies, frame it for its transport, and write it to the
//! matching socket.  It ends when the outbound pipe closes.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use floorsync_core::protocol::{
    decode_datagram, decode_type, decode_type_and_payload, frame_for_transport_now,
    stream_frame_len, Arrival, PacketType, ProtocolError, SequenceCounter, Transport,
    MAX_DATAGRAM_SIZE, SHUTDOWN_SENTINEL, TYPE_WORD_SIZE,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use super::{NetError, ServiceState, ServiceStateCell};
use crate::infrastructure::error_cell::ErrorCell;
use crate::infrastructure::pipe::{PipeError, PipeReader, PipeWriter};
use crate::infrastructure::signal::SignalChannel;

/// Bytes pulled off the TCP stream per read.
const READ_CHUNK: usize = 4096;

/// Builds the inbound-pipe notice that replaces a batch when the session ends.
pub(crate) fn shutdown_notice(message: &str) -> Vec<u8> {
    let bytes = message.as_bytes();
    let mut notice = Vec::with_capacity(8 + bytes.len());
    notice.extend_from_slice(&SHUTDOWN_SENTINEL.to_be_bytes());
    notice.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    notice.extend_from_slice(bytes);
    notice
}

// ── Packet queue ──────────────────────────────────────────────────────────────

/// A decoded packet waiting for the next data request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueuedPacket {
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
    pub arrival: Arrival,
}

/// Packets held between two data requests.
///
/// Past `capacity` the oldest datagram is discarded to make room.  Reliable
/// packets carry state the client cannot recover, so they are never dropped;
/// a queue holding nothing but reliable packets grows past its capacity.
#[derive(Debug)]
pub(crate) struct PacketQueue {
    packets: VecDeque<QueuedPacket>,
    capacity: usize,
    dropped: u64,
}

impl PacketQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Packets waiting for the next data request.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Datagrams discarded so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, packet: QueuedPacket) {
        if self.packets.len() >= self.capacity {
            let oldest_datagram = self
                .packets
                .iter()
                .position(|p| matches!(p.arrival, Arrival::SenderStamped(_)));
            match (oldest_datagram, packet.arrival) {
                (Some(index), _) => {
                    if let Some(old) = self.packets.remove(index) {
                        self.dropped += 1;
                        warn!(packet_type = ?old.packet_type, "receive queue full; oldest datagram dropped");
                    }
                }
                (None, Arrival::SenderStamped(_)) => {
                    self.dropped += 1;
                    warn!(packet_type = ?packet.packet_type, "receive queue full; datagram dropped");
                    return;
                }
                (None, Arrival::Sequenced(_)) => {
                    warn!(queued = self.packets.len(), "receive queue over capacity with reliable packets");
                }
            }
        }
        self.packets.push_back(packet);
    }

    /// Serialises every queued packet as one batch and empties the queue.
    ///
    /// # Errors
    ///
    /// [`NetError::OutOfMemory`] if the batch buffer cannot be allocated.
    pub fn take_batch(&mut self) -> Result<Vec<u8>, NetError> {
        let size = 4 + self
            .packets
            .iter()
            .map(|p| TYPE_WORD_SIZE + p.payload.len())
            .sum::<usize>();
        let mut batch = Vec::new();
        batch
            .try_reserve_exact(size)
            .map_err(|_| NetError::OutOfMemory(format!("batch of {size} bytes")))?;

        batch.extend_from_slice(&(self.packets.len() as u32).to_be_bytes());
        for packet in self.packets.drain(..) {
            batch.extend_from_slice(&packet.packet_type.as_u32().to_be_bytes());
            batch.extend_from_slice(&packet.payload);
        }
        Ok(batch)
    }
}

// ── Stream assembly ───────────────────────────────────────────────────────────

/// One frame carved out of the reliable stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamFrame {
    Packet(PacketType, Vec<u8>),
    KeepAlive,
}

/// Accumulates TCP bytes and yields complete `[type][payload]` frames.
#[derive(Debug, Default)]
pub(crate) struct StreamAssembler {
    buf: Vec<u8>,
}

impl StreamAssembler {
    /// Appends freshly read bytes.
    ///
    /// # Errors
    ///
    /// [`NetError::OutOfMemory`] if the buffer cannot grow.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        self.buf
            .try_reserve(bytes.len())
            .map_err(|_| NetError::OutOfMemory(format!("stream buffer +{} bytes", bytes.len())))?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Removes the next complete frame, or returns `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// On an invalid type word the four offending bytes are discarded and
    /// [`ProtocolError::InvalidType`] is returned; calling again resumes with
    /// the bytes that followed.
    pub fn next_frame(&mut self) -> Result<Option<StreamFrame>, ProtocolError> {
        let len = match stream_frame_len(&self.buf) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.buf.drain(..TYPE_WORD_SIZE.min(self.buf.len()));
                return Err(err);
            }
        };
        let decoded = decode_type_and_payload(&self.buf[..len]);
        self.buf.drain(..len);
        Ok(Some(match decoded? {
            Some((packet_type, payload)) => StreamFrame::Packet(packet_type, payload),
            None => StreamFrame::KeepAlive,
        }))
    }
}

// ── Receive worker ────────────────────────────────────────────────────────────

/// Which branch of the multiplexed wait fired.
enum Ready {
    Signal,
    Stream(io::Result<usize>),
    Datagram(io::Result<usize>),
    Timeout,
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Owns the read side of both sockets and the writer of the inbound pipe.
pub(crate) struct ReceiveWorker {
    pub stream: OwnedReadHalf,
    pub udp: Arc<UdpSocket>,
    pub inbound: PipeWriter,
    pub signal: Arc<SignalChannel>,
    pub errors: Arc<ErrorCell>,
    pub running: Arc<AtomicBool>,
    pub state: Arc<ServiceStateCell>,
    pub poll_timeout: Duration,
    pub queue: PacketQueue,
    pub assembler: StreamAssembler,
    pub sequence: SequenceCounter,
}

impl ReceiveWorker {
    /// Runs until shutdown or a fatal error, then marks the service stopped.
    pub async fn run(mut self) {
        info!("receive worker started");
        let result = self.poll_loop().await;
        self.state.set(ServiceState::Stopped);
        match result {
            Ok(()) => info!(
                dropped = self.queue.dropped(),
                unparsed = self.assembler.pending(),
                "receive worker stopped"
            ),
            Err(err) => {
                error!(%err, "receive worker failed; shutting down");
                self.report_fatal(err);
            }
        }
    }

    async fn poll_loop(&mut self) -> Result<(), NetError> {
        let mut chunk = vec![0u8; READ_CHUNK];
        // One spare byte so an oversized datagram shows up as a length mismatch.
        let mut datagram = vec![0u8; MAX_DATAGRAM_SIZE + 1];

        while self.running.load(Ordering::Acquire) {
            self.state.set(ServiceState::Polling);

            let ready = tokio::select! {
                _ = self.signal.notified() => Ready::Signal,
                read = self.stream.read(&mut chunk) => Ready::Stream(read),
                recv = self.udp.recv(&mut datagram) => Ready::Datagram(recv),
                _ = time::sleep(self.poll_timeout) => Ready::Timeout,
            };

            match ready {
                Ready::Signal => {}
                Ready::Timeout => trace!("poll timeout"),
                Ready::Stream(read) => {
                    self.on_stream_read(read, &chunk)?;
                    self.state.set(ServiceState::DrainingOne);
                    let partner = self.udp.try_recv(&mut datagram);
                    self.on_datagram(partner, &datagram)?;
                }
                Ready::Datagram(recv) => {
                    self.on_datagram(recv, &datagram)?;
                    self.state.set(ServiceState::DrainingOne);
                    let partner = self.stream.try_read(&mut chunk);
                    self.on_stream_read(partner, &chunk)?;
                }
            }

            self.answer_requests()?;
        }
        Ok(())
    }

    fn on_stream_read(&mut self, read: io::Result<usize>, chunk: &[u8]) -> Result<(), NetError> {
        match read {
            Ok(0) => Err(NetError::ConnectionClosed),
            Ok(n) => {
                self.assembler.extend(&chunk[..n])?;
                self.drain_frames()
            }
            Err(e) if is_transient(&e) => Ok(()),
            Err(e) => Err(NetError::TransportReceiveFailed {
                transport: Transport::Reliable,
                reason: e.to_string(),
            }),
        }
    }

    fn drain_frames(&mut self) -> Result<(), NetError> {
        loop {
            match self.assembler.next_frame() {
                Ok(None) => return Ok(()),
                Ok(Some(StreamFrame::KeepAlive)) => {}
                Ok(Some(StreamFrame::Packet(packet_type, payload))) => {
                    let arrival = self.sequence.stamp();
                    trace!(?packet_type, ?arrival, "reliable packet queued");
                    self.queue.push(QueuedPacket {
                        packet_type,
                        payload,
                        arrival,
                    });
                }
                Err(err) => {
                    let err = NetError::from(err);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(%err, "skipping corrupted bytes on reliable stream");
                }
            }
        }
    }

    fn on_datagram(&mut self, recv: io::Result<usize>, buf: &[u8]) -> Result<(), NetError> {
        let n = match recv {
            Ok(n) => n,
            Err(e) if is_transient(&e) => return Ok(()),
            // ICMP port-unreachable echoed back on a connected UDP socket.
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                debug!("server UDP port unreachable");
                return Ok(());
            }
            Err(e) => {
                return Err(NetError::TransportReceiveFailed {
                    transport: Transport::Unreliable,
                    reason: e.to_string(),
                })
            }
        };

        match decode_datagram(&buf[..n]) {
            Ok(Some((packet_type, payload, stamp))) => {
                trace!(?packet_type, stamp, "datagram queued");
                self.queue.push(QueuedPacket {
                    packet_type,
                    payload,
                    arrival: Arrival::SenderStamped(stamp),
                });
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                let err = NetError::from(err);
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(%err, len = n, "dropping corrupted datagram");
                Ok(())
            }
        }
    }

    /// Writes one batch per outstanding data request.
    fn answer_requests(&mut self) -> Result<(), NetError> {
        let pending = self.signal.take();
        for _ in 0..pending {
            let count = self.queue.len();
            let batch = self.queue.take_batch()?;
            self.inbound.write_all(&batch)?;
            debug!(count, "batch delivered");
        }
        Ok(())
    }

    fn report_fatal(&self, err: NetError) {
        let message = err.to_string();
        if let Err(busy) = self.errors.record(err) {
            warn!(%busy, "receive failure not recorded");
        }
        self.running.store(false, Ordering::Release);
        if self.inbound.write_all(&shutdown_notice(&message)).is_err() {
            debug!("inbound pipe closed; shutdown notice not delivered");
        }
    }
}

// ── Send worker ───────────────────────────────────────────────────────────────

/// Owns the write side of both sockets and the reader of the outbound pipe.
pub(crate) struct SendWorker {
    pub outbound: PipeReader,
    pub stream: OwnedWriteHalf,
    pub udp: Arc<UdpSocket>,
    pub handle: Handle,
    pub errors: Arc<ErrorCell>,
    /// Longest a single socket write may take before it counts as failed.
    pub send_timeout: Duration,
}

impl SendWorker {
    /// Drains the outbound pipe until every writer is gone.
    ///
    /// Must run on a thread outside the runtime; socket writes are driven
    /// with [`Handle::block_on`].
    pub fn run(mut self) {
        info!("send worker started");
        loop {
            let word = match self.outbound.read_u32() {
                Ok(word) => word,
                Err(PipeError::Closed) => break,
            };
            let packet_type = match decode_type(word) {
                Ok(t) => t,
                Err(err) => {
                    debug!(%err, "discarding outbound request");
                    continue;
                }
            };
            let payload = match self.outbound.read_vec(packet_type.payload_size()) {
                Ok(payload) => payload,
                Err(PipeError::Closed) => break,
            };
            if let Err(err) = self.send(packet_type, &payload) {
                error!(%err, ?packet_type, "send failed");
                if let Err(busy) = self.errors.record(err) {
                    warn!(%busy, "send failure not recorded");
                }
            }
        }
        info!("send worker stopped");
    }

    fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), NetError> {
        let frame = frame_for_transport_now(packet_type, payload)?;
        let limit = self.send_timeout;
        match packet_type.transport() {
            Transport::Reliable => self.handle.block_on(bounded_write(
                Transport::Reliable,
                limit,
                self.stream.write_all(&frame),
            )),
            Transport::Unreliable => {
                let sent = self.handle.block_on(bounded_write(
                    Transport::Unreliable,
                    limit,
                    self.udp.send(&frame),
                ))?;
                if sent != frame.len() {
                    return Err(NetError::TransportSendFailed {
                        transport: Transport::Unreliable,
                        reason: format!("short datagram: {sent} of {} bytes", frame.len()),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Runs one socket write, failing it once `limit` has elapsed.
async fn bounded_write<T, F>(transport: Transport, limit: Duration, write: F) -> Result<T, NetError>
where
    F: std::future::Future<Output = io::Result<T>>,
{
    match time::timeout(limit, write).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(NetError::TransportSendFailed {
            transport,
            reason: e.to_string(),
        }),
        Err(_) => Err(NetError::TransportSendFailed {
            transport,
            reason: format!("write timed out after {limit:?}"),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::pipe::pipe;
    use floorsync_core::protocol::{
        encode_message, encode_payload, ChatMessage, Message, PlayerMotion,
        PositionUpdateRequestMessage,
    };
    use std::thread;

    fn datagram(packet_type: PacketType, stamp: u64) -> QueuedPacket {
        QueuedPacket {
            packet_type,
            payload: vec![0; packet_type.payload_size()],
            arrival: Arrival::SenderStamped(stamp),
        }
    }

    fn reliable(packet_type: PacketType, seq: u64) -> QueuedPacket {
        QueuedPacket {
            packet_type,
            payload: vec![1; packet_type.payload_size()],
            arrival: Arrival::Sequenced(seq),
        }
    }

    // ── Shutdown notice ───────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_notice_layout() {
        let notice = shutdown_notice("socket error");
        assert_eq!(&notice[..4], &u32::MAX.to_be_bytes());
        assert_eq!(&notice[4..8], &12u32.to_be_bytes());
        assert_eq!(&notice[8..], b"socket error");
    }

    // ── PacketQueue ───────────────────────────────────────────────────────────

    #[test]
    fn test_empty_queue_yields_zero_count_batch() {
        let mut queue = PacketQueue::new(4);
        assert_eq!(queue.take_batch().unwrap(), 0u32.to_be_bytes().to_vec());
    }

    #[test]
    fn test_batch_lists_packets_in_arrival_order_and_clears_queue() {
        // Arrange
        let mut queue = PacketQueue::new(8);
        queue.push(reliable(PacketType::Tagging, 0));
        queue.push(datagram(PacketType::FloorMove, 99));

        // Act
        let batch = queue.take_batch().unwrap();

        // Assert
        let mut expected = 2u32.to_be_bytes().to_vec();
        expected.extend_from_slice(&PacketType::Tagging.as_u32().to_be_bytes());
        expected.extend_from_slice(&[1; 8]);
        expected.extend_from_slice(&PacketType::FloorMove.as_u32().to_be_bytes());
        expected.extend_from_slice(&[0; 12]);
        assert_eq!(batch, expected);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_full_queue_drops_oldest_datagram_first() {
        // Arrange
        let mut queue = PacketQueue::new(3);
        queue.push(reliable(PacketType::ChatSend, 0));
        queue.push(datagram(PacketType::AllPositionUpdate, 1));
        queue.push(datagram(PacketType::AllPositionUpdate, 2));

        // Act
        queue.push(reliable(PacketType::GameStatus, 1));

        // Assert
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 1);
        let arrivals: Vec<Arrival> = queue.packets.iter().map(|p| p.arrival).collect();
        assert_eq!(
            arrivals,
            vec![
                Arrival::Sequenced(0),
                Arrival::SenderStamped(2),
                Arrival::Sequenced(1)
            ]
        );
    }

    #[test]
    fn test_full_queue_of_reliable_packets_never_drops_them() {
        let mut queue = PacketQueue::new(2);
        queue.push(reliable(PacketType::ChatSend, 0));
        queue.push(reliable(PacketType::ChatSend, 1));

        queue.push(datagram(PacketType::Tagging, 5));
        assert_eq!(queue.len(), 2, "new datagram is the one dropped");

        queue.push(reliable(PacketType::ChatSend, 2));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 1);
    }

    // ── StreamAssembler ───────────────────────────────────────────────────────

    #[test]
    fn test_assembler_waits_for_complete_frame() {
        // Arrange
        let frame = encode_message(
            &Message::Chat(ChatMessage {
                sender: 1,
                text: "hi".into(),
            }),
            0,
        )
        .unwrap();
        let mut assembler = StreamAssembler::default();

        // Act – deliver the frame in two pieces
        assembler.extend(&frame[..10]).unwrap();
        let first = assembler.next_frame().unwrap();
        assembler.extend(&frame[10..]).unwrap();
        let second = assembler.next_frame().unwrap();

        // Assert
        assert_eq!(first, None);
        assert_eq!(
            second,
            Some(StreamFrame::Packet(PacketType::ChatSend, frame[4..].to_vec()))
        );
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_assembler_skips_bad_type_word_and_recovers() {
        // Arrange – garbage word, then a keep-alive, then a chat frame
        let chat = encode_message(
            &Message::Chat(ChatMessage {
                sender: 2,
                text: "ok".into(),
            }),
            0,
        )
        .unwrap();
        let mut assembler = StreamAssembler::default();
        assembler.extend(&0u32.to_be_bytes()).unwrap();
        assembler
            .extend(&PacketType::KeepAlive.as_u32().to_be_bytes())
            .unwrap();
        assembler.extend(&chat).unwrap();

        // Act / Assert
        assert_eq!(assembler.next_frame(), Err(ProtocolError::InvalidType(0)));
        assert_eq!(assembler.next_frame(), Ok(Some(StreamFrame::KeepAlive)));
        assert!(matches!(
            assembler.next_frame(),
            Ok(Some(StreamFrame::Packet(PacketType::ChatSend, _)))
        ));
        assert_eq!(assembler.next_frame(), Ok(None));
    }

    // ── SendWorker ────────────────────────────────────────────────────────────

    #[test]
    fn test_send_worker_routes_each_type_to_its_transport() {
        // Arrange – loopback TCP pair and UDP pair on a runtime the worker can borrow
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let (server_stream, client_stream, server_udp, client_udp) = rt.block_on(async {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let client = tokio::net::TcpStream::connect(listener.local_addr().unwrap())
                .await
                .unwrap();
            let (server, _) = listener.accept().await.unwrap();
            let server_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let client_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            client_udp.connect(server_udp.local_addr().unwrap()).await.unwrap();
            (server, client, server_udp, client_udp)
        });
        let (_read_half, write_half) = client_stream.into_split();
        let (writer, reader) = pipe();
        let errors = Arc::new(ErrorCell::new());
        let worker = SendWorker {
            outbound: reader,
            stream: write_half,
            udp: Arc::new(client_udp),
            handle: rt.handle().clone(),
            errors: Arc::clone(&errors),
            send_timeout: Duration::from_secs(2),
        };

        let chat = Message::Chat(ChatMessage {
            sender: 3,
            text: "ready".into(),
        });
        let position = Message::PositionUpdateRequest(PositionUpdateRequestMessage {
            player_id: 3,
            floor: 1,
            motion: PlayerMotion {
                x: 1.0,
                y: 2.0,
                vx: 0.0,
                vy: 0.0,
            },
        });

        // Act – an invalid word first, which must be skipped
        let handle = thread::spawn(move || worker.run());
        writer.write_u32(0).unwrap();
        for msg in [&chat, &position] {
            let mut request = msg.packet_type().as_u32().to_be_bytes().to_vec();
            request.extend_from_slice(&encode_payload(msg));
            writer.write_all(&request).unwrap();
        }
        drop(writer);
        handle.join().unwrap();

        // Assert
        let (stream_bytes, datagram_bytes) = rt.block_on(async {
            let mut server_stream = server_stream;
            let mut buf = vec![0u8; 4 + PacketType::ChatSend.payload_size()];
            server_stream.read_exact(&mut buf).await.unwrap();
            let mut dgram = vec![0u8; MAX_DATAGRAM_SIZE];
            let n = server_udp.recv(&mut dgram).await.unwrap();
            dgram.truncate(n);
            (buf, dgram)
        });
        assert_eq!(stream_bytes, encode_message(&chat, 0).unwrap());
        let (t, payload, stamp) = decode_datagram(&datagram_bytes).unwrap().unwrap();
        assert_eq!(t, PacketType::PositionUpdateRequest);
        assert_eq!(payload, encode_payload(&position));
        assert!(stamp > 0);
        assert_eq!(errors.take(), None);
    }

    #[tokio::test]
    async fn test_stalled_write_fails_after_send_timeout() {
        // Arrange – a write that never completes
        let stalled = std::future::pending::<io::Result<()>>();

        // Act
        let result = bounded_write(Transport::Reliable, Duration::from_millis(20), stalled).await;

        // Assert
        match result {
            Err(NetError::TransportSendFailed { transport, reason }) => {
                assert_eq!(transport, Transport::Reliable);
                assert!(reason.contains("timed out"), "unexpected reason {reason}");
            }
            other => panic!("expected a send failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bounded_write_passes_through_result_and_io_error() {
        // Act
        let sent = bounded_write(Transport::Unreliable, Duration::from_secs(1), async { Ok(7usize) }).await;
        let refused = bounded_write::<(), _>(Transport::Unreliable, Duration::from_secs(1), async {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        })
        .await;

        // Assert
        assert_eq!(sent, Ok(7));
        assert!(matches!(
            refused,
            Err(NetError::TransportSendFailed { transport: Transport::Unreliable, .. })
        ));
    }
}
