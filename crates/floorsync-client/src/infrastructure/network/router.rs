//! Network Router: owns the sockets, the I/O workers, and the gameplay ends
//! of both pipes.
//!
//! # Lifecycle
//!
//! ```text
//! Router::connect ─┬─ resolve host
//!                  ├─ build runtime (1 I/O driver thread)
//!                  ├─ TCP connect, UDP bind + connect
//!                  └─ spawn "floorsync-recv" and "floorsync-send"
//!
//! Router::shutdown ─┬─ stop taking data requests, wake the receive worker
//!                   ├─ join the receive worker
//!                   ├─ close the outbound pipe, join the send worker
//!                   └─ write the shutdown notice for the gameplay thread
//! ```
//!
//! The gameplay thread never sees sockets.  It writes requests with
//! [`Router::send`] and pulls batches through the [`PacketSource`]
//! implementation.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use floorsync_core::protocol::{encode_payload, Message, SequenceCounter};
use tokio::net::{TcpStream, UdpSocket};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::socket_service::{shutdown_notice, PacketQueue, ReceiveWorker, SendWorker, StreamAssembler};
use super::{NetError, ServiceState, ServiceStateCell};
use crate::application::update::{PacketSource, SourceError};
use crate::infrastructure::error_cell::ErrorCell;
use crate::infrastructure::pipe::{duplex, PipeEnd, PipeError, PipeReader, PipeWriter};
use crate::infrastructure::signal::SignalChannel;
use crate::infrastructure::storage::config::NetworkConfig;

/// Connection to one game server.
pub struct Router {
    runtime: Option<Runtime>,
    running: Arc<AtomicBool>,
    signal: Arc<SignalChannel>,
    errors: Arc<ErrorCell>,
    state: Arc<ServiceStateCell>,
    inbound: PipeReader,
    /// Clone of the receive worker's writer, for the final shutdown notice.
    notice_writer: PipeWriter,
    outbound: Option<PipeWriter>,
    receive_thread: Option<JoinHandle<()>>,
    send_thread: Option<JoinHandle<()>>,
    server_addr: SocketAddr,
    local_udp_addr: SocketAddr,
}

impl Router {
    /// Connects to the server named in `config` and starts both workers.
    ///
    /// # Errors
    ///
    /// - [`NetError::SocketSetAllocationFailed`] if the runtime cannot be built.
    /// - [`NetError::HostUnresolved`] if the host name has no address.
    /// - [`NetError::RouterInitFailed`] if a socket or worker thread cannot be set up.
    pub fn connect(config: &NetworkConfig) -> Result<Self, NetError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("floorsync-io")
            .enable_all()
            .build()
            .map_err(|e| NetError::SocketSetAllocationFailed(e.to_string()))?;

        let (stream, udp, server_addr) = runtime.block_on(open_sockets(config))?;
        let local_udp_addr = udp
            .local_addr()
            .map_err(|e| NetError::RouterInitFailed(format!("UDP local address: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        let udp = Arc::new(udp);

        let (gameplay, workers) = duplex();
        let PipeEnd {
            writer: outbound,
            reader: inbound,
        } = gameplay;
        let PipeEnd {
            writer: inbound_writer,
            reader: outbound_reader,
        } = workers;

        let running = Arc::new(AtomicBool::new(true));
        let signal = Arc::new(SignalChannel::new());
        let errors = Arc::new(ErrorCell::new());
        let state = Arc::new(ServiceStateCell::new(ServiceState::Idle));
        let notice_writer = inbound_writer.clone();

        let receiver = ReceiveWorker {
            stream: read_half,
            udp: Arc::clone(&udp),
            inbound: inbound_writer,
            signal: Arc::clone(&signal),
            errors: Arc::clone(&errors),
            running: Arc::clone(&running),
            state: Arc::clone(&state),
            poll_timeout: config.poll_timeout(),
            queue: PacketQueue::new(config.max_queued_packets),
            assembler: StreamAssembler::default(),
            sequence: SequenceCounter::new(),
        };
        let handle = runtime.handle().clone();
        let receive_thread = thread::Builder::new()
            .name("floorsync-recv".into())
            .spawn(move || handle.block_on(receiver.run()))
            .map_err(|e| NetError::RouterInitFailed(format!("spawn receive worker: {e}")))?;

        let sender = SendWorker {
            outbound: outbound_reader,
            stream: write_half,
            udp,
            handle: runtime.handle().clone(),
            errors: Arc::clone(&errors),
            send_timeout: config.send_timeout(),
        };
        let send_thread = match thread::Builder::new()
            .name("floorsync-send".into())
            .spawn(move || sender.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                running.store(false, Ordering::Release);
                signal.wake();
                if receive_thread.join().is_err() {
                    warn!("receive worker panicked during failed start-up");
                }
                return Err(NetError::RouterInitFailed(format!("spawn send worker: {e}")));
            }
        };

        info!(%server_addr, %local_udp_addr, "connected to server");
        Ok(Self {
            runtime: Some(runtime),
            running,
            signal,
            errors,
            state,
            inbound,
            notice_writer,
            outbound: Some(outbound),
            receive_thread: Some(receive_thread),
            send_thread: Some(send_thread),
            server_addr,
            local_udp_addr,
        })
    }

    /// Asks the receive worker for one batch.  Ignored once shut down.
    pub fn signal_data_request(&self) {
        if self.running.load(Ordering::Acquire) {
            self.signal.signal();
        }
    }

    /// Queues `msg` for the send worker.
    ///
    /// # Errors
    ///
    /// [`NetError::PipeWriteFailed`] once the router is shut down or the send
    /// worker has exited.
    pub fn send(&self, msg: &Message) -> Result<(), NetError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(NetError::PipeWriteFailed(PipeError::Closed))?;
        let mut request = msg.packet_type().as_u32().to_be_bytes().to_vec();
        request.extend_from_slice(&encode_payload(msg));
        outbound.write_all(&request)?;
        Ok(())
    }

    /// Stops both workers and leaves a shutdown notice carrying `reason` for
    /// the gameplay thread.  Calling it again does nothing.
    pub fn shutdown(&mut self, reason: &str) {
        if self.receive_thread.is_none() && self.send_thread.is_none() {
            return;
        }
        info!(reason, "router shutting down");

        self.running.store(false, Ordering::Release);
        self.signal.wake();
        if let Some(handle) = self.receive_thread.take() {
            if handle.join().is_err() {
                warn!("receive worker panicked");
            }
        }

        self.outbound = None;
        if let Some(handle) = self.send_thread.take() {
            if handle.join().is_err() {
                warn!("send worker panicked");
            }
        }

        if self.notice_writer.write_all(&shutdown_notice(reason)).is_err() {
            debug!("inbound pipe closed; shutdown notice not delivered");
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }

    /// Takes the most recent error recorded by either worker.
    pub fn last_error(&self) -> Option<NetError> {
        self.errors.take()
    }

    /// True while the receive worker is alive and no shutdown was requested.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.state.get() != ServiceState::Stopped
    }

    /// Lifecycle state last published by the receive worker.
    pub fn service_state(&self) -> ServiceState {
        self.state.get()
    }

    /// Resolved TCP address of the server.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Address the client's UDP socket is bound to.
    pub fn local_udp_addr(&self) -> SocketAddr {
        self.local_udp_addr
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown("router dropped");
    }
}

impl PacketSource for Router {
    fn request_batch(&mut self) {
        self.signal_data_request();
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        self.inbound.read_exact(buf).map_err(|_| SourceError::Closed)
    }
}

// ── Socket setup ──────────────────────────────────────────────────────────────

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetError> {
    let unresolved = |reason: String| NetError::HostUnresolved {
        host: host.to_string(),
        reason,
    };
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| unresolved(e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| unresolved("no addresses returned".into()))
}

async fn open_sockets(
    config: &NetworkConfig,
) -> Result<(TcpStream, UdpSocket, SocketAddr), NetError> {
    let server_addr = resolve(&config.server_host, config.tcp_port).await?;
    let udp_addr = SocketAddr::new(server_addr.ip(), config.udp_port);

    let stream = TcpStream::connect(server_addr)
        .await
        .map_err(|e| NetError::RouterInitFailed(format!("TCP connect to {server_addr}: {e}")))?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!("could not disable Nagle on the reliable stream: {e}");
    }

    let bind_addr: SocketAddr = if udp_addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, config.local_udp_port).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, config.local_udp_port).into()
    };
    let udp = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| NetError::RouterInitFailed(format!("UDP bind {bind_addr}: {e}")))?;
    udp.connect(udp_addr)
        .await
        .map_err(|e| NetError::RouterInitFailed(format!("UDP connect to {udp_addr}: {e}")))?;

    debug!(%server_addr, %udp_addr, "sockets open");
    Ok((stream, udp, server_addr))
}
