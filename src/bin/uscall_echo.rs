//! uscall Echo Server
//!
//! Demo end-to-end untuk hook bridge dan slice adapters:
//! - Native loop: begin hook → callback (poll + echo) → end hook (stats)
//! - mio readiness polling di dalam callback, timeout 1ms
//! - Satu fixed-frame window dipakai bersama untuk recv; sisa echo yang
//!   belum terkirim disimpan di `Frame` per koneksi sampai socket writable
//!
//! Usage:
//!   cargo run --release --bin uscall_echo -- [OPTIONS]

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::unix::io::{AsRawFd, RawFd};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::{TcpListener as MioTcpListener, TcpStream as MioTcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use uscall::hook::{run_native_loop, HandleRegistry, LoopParams};
use uscall::network::{self, Backend, Frame, OsBackend, Window};
use uscall::{BackendKind, Config, Slice, StorageKind, Tool};

const SERVER_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 1024;
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Statistik yang dibagi antara callback dan end hook
#[derive(Default)]
struct EchoStats {
    iterations: AtomicU64,
    bytes_echoed: AtomicU64,
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    short_writes: AtomicU64,
}

impl EchoStats {
    fn print_stats(&self, uptime: Duration) {
        let iterations = self.iterations.load(Ordering::Relaxed);
        let bytes = self.bytes_echoed.load(Ordering::Relaxed);

        println!("\n📊 Echo Stats (uptime: {:.1}s)", uptime.as_secs_f64());
        println!(
            "   Iterations:    {} ({:.1}/sec)",
            iterations,
            iterations as f64 / uptime.as_secs_f64()
        );
        println!("   Bytes echoed:  {} KB", bytes / 1024);
        println!(
            "   Connections:   {} active / {} total",
            self.connections_active.load(Ordering::Relaxed),
            self.connections_total.load(Ordering::Relaxed)
        );
        let short = self.short_writes.load(Ordering::Relaxed);
        if short > 0 {
            println!("   Short writes:  {} ⚠️", short);
        }
    }
}

/// Keadaan koneksi setelah dilayani
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// Tidak ada data lagi dan semua echo sudah terkirim
    Idle,
    /// Peer belum membaca; sisa echo menunggu di `pending`
    Blocked,
    /// Peer menutup koneksi
    Closed,
}

/// Kirim sisa echo yang tertunda. `Ok(true)` jika sudah habis.
fn flush_pending<K: Backend + ?Sized>(
    backend: &K,
    fd: RawFd,
    pending: &mut Frame<Slice>,
    stats: &EchoStats,
) -> io::Result<bool> {
    while !pending.is_empty() {
        let before = pending.len();
        match pending.flush(backend, fd) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                pending.compact_after_flush(n as u32, before);
                stats.bytes_echoed.fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Echo semua data yang tersedia di `fd` lewat window bersama
///
/// Sisa yang tertunda dikirim dulu; selama masih ada sisa, tidak ada read
/// baru, jadi window bersama tidak pernah menimpa data yang belum terkirim.
/// `one_shot` membatasi satu echo per panggilan (socket blocking).
fn echo_available<K: Backend + ?Sized>(
    backend: &K,
    fd: RawFd,
    window: &mut Window<Slice>,
    capacity: u32,
    pending: &mut Frame<Slice>,
    stats: &EchoStats,
    one_shot: bool,
) -> io::Result<Progress> {
    if !flush_pending(backend, fd, pending, stats)? {
        return Ok(Progress::Blocked);
    }

    loop {
        window.resize(capacity).map_err(frame_err)?;
        let n = match window.recv(backend, fd) {
            Ok(0) => return Ok(Progress::Closed),
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Progress::Idle),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        window.resize(n as u32).map_err(frame_err)?;
        let sent = match window.send(backend, fd) {
            Ok(sent) => sent,
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                0
            }
            Err(e) => return Err(e),
        };
        stats.bytes_echoed.fetch_add(sent as u64, Ordering::Relaxed);

        if sent < n {
            stats.short_writes.fetch_add(1, Ordering::Relaxed);
            // pending kosong di sini dan kapasitasnya sama dengan window
            pending.append(&window.as_bytes()[sent..]);
            if !flush_pending(backend, fd, pending, stats)? {
                return Ok(Progress::Blocked);
            }
        }

        if one_shot {
            return Ok(Progress::Idle);
        }
    }
}

/// Koneksi yang terdaftar di poll
struct EchoConn {
    stream: MioTcpStream,
    pending: Frame<Slice>,
    interest: Interest,
}

/// State callback: listener, koneksi, dan window bersama
struct EchoServer {
    poll: Poll,
    events: Events,
    ready: Vec<Token>,
    listener: MioTcpListener,
    connections: HashMap<Token, EchoConn>,
    next_token: usize,
    window: Window<Slice>,
    capacity: u32,
    storage: StorageKind,
    nonblocking: bool,
    backend: OsBackend,
    stats: Arc<EchoStats>,
}

impl EchoServer {
    fn bind(config: &Config, stats: Arc<EchoStats>) -> io::Result<Self> {
        let backend = OsBackend;

        let listener = TcpListener::bind(&config.bind_addr)?;
        let fd = listener.as_raw_fd();
        if config.reuse_port {
            network::set_reuse_port(&backend, fd)?;
        }
        // mio selalu butuh listener non-blocking
        network::set_nonblocking(&backend, fd, true)?;

        let mut listener = MioTcpListener::from_std(listener);
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;

        let slice = Slice::allocate_with(config.storage, config.slice_capacity).map_err(frame_err)?;
        let window = Window::with_size(slice, config.slice_capacity).map_err(frame_err)?;

        info!(
            addr = %listener.local_addr()?,
            backend = backend.name(),
            capacity = config.slice_capacity,
            storage = ?config.storage,
            "echo server listening"
        );

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            ready: Vec::with_capacity(EVENTS_CAPACITY),
            listener,
            connections: HashMap::new(),
            next_token: 1,
            window,
            capacity: config.slice_capacity,
            storage: config.storage,
            nonblocking: config.nonblocking,
            backend,
            stats,
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Satu tick: poll 1ms lalu layani semua event yang siap
    ///
    /// Hanya kegagalan poll yang fatal; error per koneksi menutup koneksi
    /// itu saja.
    fn tick(&mut self) -> io::Result<()> {
        match self.poll.poll(&mut self.events, Some(Duration::from_millis(1))) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        self.ready.clear();
        self.ready.extend(self.events.iter().map(|event| event.token()));

        for i in 0..self.ready.len() {
            match self.ready[i] {
                SERVER_TOKEN => self.accept_connections(),
                token => self.serve(token),
            }
        }
        Ok(())
    }

    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.add_connection(stream, addr) {
                        warn!(%addr, error = %e, "failed to set up connection");
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e)
                    if e.kind() == io::ErrorKind::ConnectionAborted
                        || e.kind() == io::ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn add_connection(&mut self, mut stream: MioTcpStream, addr: SocketAddr) -> io::Result<()> {
        network::set_nonblocking(&self.backend, stream.as_raw_fd(), self.nonblocking)?;
        let pending = Slice::allocate_with(self.storage, self.capacity).map_err(frame_err)?;

        let token = Token(self.next_token);
        self.next_token += 1;
        self.poll
            .registry()
            .register(&mut stream, token, Interest::READABLE)?;

        self.connections.insert(
            token,
            EchoConn {
                stream,
                pending: Frame::new(pending),
                interest: Interest::READABLE,
            },
        );

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
        debug!(%addr, ?token, "connection accepted");
        Ok(())
    }

    /// Layani event read atau write pada satu koneksi
    fn serve(&mut self, token: Token) {
        let conn = match self.connections.get_mut(&token) {
            Some(conn) => conn,
            None => return,
        };

        let progress = echo_available(
            &self.backend,
            conn.stream.as_raw_fd(),
            &mut self.window,
            self.capacity,
            &mut conn.pending,
            &self.stats,
            !self.nonblocking,
        );

        let interest = match progress {
            Ok(Progress::Idle) => Interest::READABLE,
            Ok(Progress::Blocked) => Interest::READABLE | Interest::WRITABLE,
            Ok(Progress::Closed) => return self.close(token, None),
            Err(e) => return self.close(token, Some(e)),
        };

        if interest == conn.interest {
            return;
        }
        let reregistered = self
            .poll
            .registry()
            .reregister(&mut conn.stream, token, interest);
        match reregistered {
            Ok(()) => conn.interest = interest,
            Err(e) => self.close(token, Some(e)),
        }
    }

    fn close(&mut self, token: Token, err: Option<io::Error>) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };
        let _ = self.poll.registry().deregister(&mut conn.stream);
        self.stats.connections_active.fetch_sub(1, Ordering::Relaxed);

        match err {
            Some(e) => warn!(?token, error = %e, "connection closed on error"),
            None => debug!(?token, "connection closed"),
        }
    }
}

fn frame_err(e: uscall::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

fn status_of(e: &io::Error) -> i32 {
    -e.raw_os_error().unwrap_or(libc::EIO)
}

fn main() {
    let mut config = Config::default();
    if let Err(e) = config.apply_env() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    let config = match config.with_args(Tool::Echo, std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{}", Config::usage(Tool::Echo));
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", Config::usage(Tool::Echo));
            process::exit(1);
        }
    };

    // USCALL_BACKEND bisa memilih stack; echo hanya jalan di OS backend
    if config.backend != BackendKind::Os {
        eprintln!("Error: uscall_echo only runs on the os backend");
        process::exit(1);
    }

    let default_filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    println!("╔════════════════════════════════════════╗");
    println!("║        uscall Echo Server              ║");
    println!("╚════════════════════════════════════════╝");
    println!();
    println!("📡 Bind:     {}", config.bind_addr);
    println!("📦 Slice:    {} bytes ({:?})", config.slice_capacity, config.storage);
    println!();

    let stats = Arc::new(EchoStats::default());
    let mut server = match EchoServer::bind(&config, stats.clone()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut registry = HandleRegistry::new();
    let mut params = LoopParams::default();

    let begin_stats = stats.clone();
    params.bind_begin(&mut registry, move || {
        begin_stats.iterations.fetch_add(1, Ordering::Relaxed);
        0
    });

    params.bind_proc(&mut registry, move || match server.tick() {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "poll loop failed");
            status_of(&e)
        }
    });

    let verbose = config.verbose;
    let end_stats = stats;
    let started = Instant::now();
    let mut last_report = started;
    params.bind_end(&mut registry, move || {
        if verbose && last_report.elapsed() >= STATS_INTERVAL {
            end_stats.print_stats(started.elapsed());
            last_report = Instant::now();
        }
        0
    });

    let err = match run_native_loop(&params, &mut registry) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    params.unbind_all(&mut registry);

    eprintln!("Error: {}", err);
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::os::unix::net::UnixStream;

    /// Isi send buffer `fd` sampai kernel menolak write berikutnya
    fn fill_send_buffer(fd: RawFd) -> usize {
        let filler = [0xAAu8; 4096];
        let mut chunk = filler.len();
        let mut queued = 0;
        loop {
            match OsBackend.write(fd, &filler[..chunk]) {
                Ok(n) => queued += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock && chunk > 1 => chunk /= 2,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return queued,
                Err(e) => panic!("fill failed: {}", e),
            }
        }
    }

    fn shared_window(capacity: u32) -> Window<Slice> {
        Window::with_size(Slice::allocate(capacity).unwrap(), capacity).unwrap()
    }

    #[test]
    fn test_echo_round_trip() {
        let (mut peer, local) = UnixStream::pair().unwrap();
        let fd = local.as_raw_fd();
        network::set_nonblocking(&OsBackend, fd, true).unwrap();

        let stats = EchoStats::default();
        let mut window = shared_window(64);
        let mut pending = Frame::new(Slice::allocate(64).unwrap());

        peer.write_all(b"ping").unwrap();
        let progress =
            echo_available(&OsBackend, fd, &mut window, 64, &mut pending, &stats, false).unwrap();
        assert_eq!(progress, Progress::Idle);

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        assert_eq!(stats.bytes_echoed.load(Ordering::Relaxed), 4);

        drop(peer);
        let progress =
            echo_available(&OsBackend, fd, &mut window, 64, &mut pending, &stats, false).unwrap();
        assert_eq!(progress, Progress::Closed);
    }

    #[test]
    fn test_echo_keeps_unsent_bytes_for_slow_peer() {
        let (mut peer, local) = UnixStream::pair().unwrap();
        let fd = local.as_raw_fd();
        network::set_nonblocking(&OsBackend, fd, true).unwrap();

        let queued = fill_send_buffer(fd);
        peer.write_all(b"hello").unwrap();

        let stats = EchoStats::default();
        let mut window = shared_window(64);
        let mut pending = Frame::new(Slice::allocate(64).unwrap());

        let progress =
            echo_available(&OsBackend, fd, &mut window, 64, &mut pending, &stats, false).unwrap();
        assert_eq!(progress, Progress::Blocked);
        assert_eq!(pending.filled(), b"hello");
        assert_eq!(stats.short_writes.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_echoed.load(Ordering::Relaxed), 0);

        // Masih blocked: tidak ada read baru yang menimpa window
        peer.write_all(b"later").unwrap();
        let progress =
            echo_available(&OsBackend, fd, &mut window, 64, &mut pending, &stats, false).unwrap();
        assert_eq!(progress, Progress::Blocked);
        assert_eq!(pending.filled(), b"hello");

        // Peer mulai membaca: sisa terkirim lebih dulu, lalu data berikutnya
        let mut filler = vec![0u8; queued];
        peer.read_exact(&mut filler).unwrap();
        assert!(filler.iter().all(|&b| b == 0xAA));

        let progress =
            echo_available(&OsBackend, fd, &mut window, 64, &mut pending, &stats, false).unwrap();
        assert_eq!(progress, Progress::Idle);
        assert!(pending.is_empty());

        let mut echoed = [0u8; 10];
        peer.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"hellolater");
        assert_eq!(stats.bytes_echoed.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_flush_pending_reports_drained() {
        let (mut peer, local) = UnixStream::pair().unwrap();
        let stats = EchoStats::default();
        let mut pending = Frame::new(Slice::allocate(16).unwrap());
        pending.append(b"rest");

        assert!(flush_pending(&OsBackend, local.as_raw_fd(), &mut pending, &stats).unwrap());
        assert!(pending.is_empty());

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"rest");
    }

    fn test_server() -> EchoServer {
        let config = Config {
            bind_addr: "127.0.0.1:0".to_string(),
            slice_capacity: 64,
            ..Config::default()
        };
        EchoServer::bind(&config, Arc::new(EchoStats::default())).unwrap()
    }

    /// Tick sampai `done` terpenuhi atau batas waktu habis
    fn tick_until(server: &mut EchoServer, mut done: impl FnMut(&EchoServer) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            server.tick().unwrap();
            if done(server) {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_server_echo_reuses_token_buffer() {
        let mut server = test_server();
        let scratch = server.ready.capacity();

        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
        client.write_all(b"ping").unwrap();

        assert!(tick_until(&mut server, |s| {
            s.stats.bytes_echoed.load(Ordering::Relaxed) >= 4
        }));

        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        assert_eq!(server.ready.capacity(), scratch);
    }

    #[test]
    fn test_reset_connection_does_not_stop_server() {
        let mut server = test_server();
        let addr = server.local_addr().unwrap();

        let mut good = TcpStream::connect(addr).unwrap();
        let bad = TcpStream::connect(addr).unwrap();
        assert!(tick_until(&mut server, |s| s.connections.len() == 2));

        // SO_LINGER 0: close mengirim RST, read di server gagal ECONNRESET
        let linger = libc::linger {
            l_onoff: 1,
            l_linger: 0,
        };
        // SAFETY: optval menunjuk struct linger yang hidup selama call
        let ret = unsafe {
            libc::setsockopt(
                bad.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_LINGER,
                &linger as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::linger>() as libc::socklen_t,
            )
        };
        assert_eq!(ret, 0);
        drop(bad);

        assert!(tick_until(&mut server, |s| {
            s.connections.len() == 1 && s.stats.connections_active.load(Ordering::Relaxed) == 1
        }));
        assert_eq!(server.stats.connections_total.load(Ordering::Relaxed), 2);

        good.write_all(b"still up").unwrap();
        assert!(tick_until(&mut server, |s| {
            s.stats.bytes_echoed.load(Ordering::Relaxed) >= 8
        }));

        let mut buf = [0u8; 8];
        good.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"still up");
    }
}
