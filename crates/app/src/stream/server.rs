//! Websocket endpoint and session dispatch.
//!
//! The listener is polled non-blocking so the shutdown flag is honoured even
//! while idle. Each connection gets its own thread; the stream resources
//! (camera, detector, encoder) are opened once at startup and held behind a
//! mutex, so exactly one session drives them at a time and a second client
//! is refused with a busy close instead of racing.

use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Once, TryLockError,
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use hand_core::{HandPolicy, MediapipeDetector};
use tracing::{debug, error, info, warn};
use tungstenite::{
    accept,
    protocol::{frame::coding::CloseCode, CloseFrame},
    Message, WebSocket,
};
use video_io::{FfmpegCamera, FfmpegSink};

use crate::stream::{
    session::{run_session, CountNotifier, SessionEnd},
    telemetry, StreamConfig,
};

const ACCEPT_POLL_MS: u64 = 100;

/// Process-wide stream resources, initialised once and reused across
/// sessions. A failed session leaves them in whatever state it caused;
/// nothing is torn down or relaunched between clients.
struct StreamResources {
    camera: FfmpegCamera,
    detector: MediapipeDetector,
    sink: FfmpegSink,
}

impl CountNotifier for WebSocket<TcpStream> {
    fn send_count(&mut self, count: u8) -> anyhow::Result<()> {
        self.send(Message::Text(count.to_string()))?;
        Ok(())
    }
}

/// Run the streamer until Ctrl+C.
pub fn run(config: StreamConfig) -> Result<()> {
    static CTRL_HANDLER: Once = Once::new();

    telemetry::init(config.verbose);

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler({
            let handler_shutdown = handler_shutdown.clone();
            move || {
                handler_shutdown.store(true, Ordering::SeqCst);
            }
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });

    info!(
        "Opening capture source {} ({}x{} @ {} fps)",
        config.camera_uri, config.width, config.height, config.fps
    );
    let camera = FfmpegCamera::open(&config.camera_uri, (config.width, config.height), config.fps)
        .context("Failed to open capture source")?;

    info!("Starting hand detector {}", config.detector_script.display());
    let detector = MediapipeDetector::spawn(
        &config.python_bin,
        &config.detector_script,
        &config.model_path,
    )
    .context("Failed to start hand detector")?;

    info!("Starting virtual camera encoder for {}", config.video_device);
    let sink = FfmpegSink::spawn(&config.video_device, (config.width, config.height), config.fps)
        .context("Failed to start virtual camera encoder")?;

    let resources = Arc::new(Mutex::new(StreamResources {
        camera,
        detector,
        sink,
    }));

    let listener = TcpListener::bind(&config.listen_addr)
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    listener
        .set_nonblocking(true)
        .context("Failed to make listener non-blocking")?;
    info!("Finger counts available on ws://{}", config.listen_addr);

    let mut sessions: Vec<thread::JoinHandle<()>> = Vec::new();
    let mut session_seq: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((conn, peer)) => {
                session_seq += 1;
                let session = session_seq;
                let resources = resources.clone();
                let shutdown = shutdown.clone();
                let policy = config.hand_policy;
                let frame_interval = config.frame_interval();
                let handle = thread::Builder::new()
                    .name(format!("stream-session-{session}"))
                    .spawn(move || {
                        handle_client(
                            conn,
                            peer,
                            resources,
                            policy,
                            frame_interval,
                            shutdown,
                            session,
                        )
                    })
                    .context("Failed to spawn session thread")?;
                sessions.push(handle);
                sessions.retain(|handle| !handle.is_finished());
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
            }
            Err(err) => {
                error!("Listener accept failed: {err}");
                thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
            }
        }
    }

    debug!("Stopping streamer");
    for handle in sessions {
        let _ = handle.join();
    }
    info!("Streamer stopped");
    Ok(())
}

fn handle_client(
    conn: TcpStream,
    peer: SocketAddr,
    resources: Arc<Mutex<StreamResources>>,
    policy: HandPolicy,
    frame_interval: Duration,
    shutdown: Arc<AtomicBool>,
    session: u64,
) {
    let span = tracing::info_span!("session", id = session, client = %peer);
    let _guard = span.enter();

    if let Err(err) = conn.set_nonblocking(false) {
        warn!("Failed to configure client socket: {err}");
        return;
    }
    let mut ws = match accept(conn) {
        Ok(ws) => ws,
        Err(err) => {
            warn!("Websocket handshake failed: {err}");
            return;
        }
    };
    info!("Notification client connected");

    let mut guard = match resources.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            warn!("Stream busy; refusing client");
            let _ = ws.close(Some(CloseFrame {
                code: CloseCode::Again,
                reason: "stream busy".into(),
            }));
            let _ = ws.flush();
            return;
        }
        // A crashed session leaves the resources in whatever state it made;
        // the next client takes them as-is.
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };
    let StreamResources {
        camera,
        detector,
        sink,
    } = &mut *guard;

    match run_session(
        camera,
        detector,
        sink,
        &mut ws,
        policy,
        frame_interval,
        &shutdown,
    ) {
        Ok(SessionEnd::Cancelled) => info!("Session cancelled by shutdown"),
        Err(err) => error!("Session ended: {err:?}"),
    }

    let _ = ws.close(None);
    let _ = ws.flush();
    info!("Returning to idle");
}
