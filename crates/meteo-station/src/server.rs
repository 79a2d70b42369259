//! Single-client HTTP loop over `std::net`

use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use log::{debug, error, info, warn};
use meteo_core::app_state::AppState;
use meteo_core::sensors::SnapshotSource;
use meteo_core::storage::DataLog;
use meteo_core::time::{Clock, NetworkTime};
use meteo_core::web::{RequestScanner, Route};

/// Pause between accept polls when nobody is connecting.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Connection whose blocking reads can be cut short.
pub trait ClientStream: Read + Write {
    /// Make the next read give up after `remaining`.
    fn limit_read(&mut self, remaining: Duration) -> io::Result<()>;
}

impl ClientStream for TcpStream {
    fn limit_read(&mut self, remaining: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(remaining))
    }
}

/// Read one request from `stream` and answer it.
///
/// The whole request must arrive before `deadline`, however it is split
/// across reads. Returns the route served, or `None` when the client went
/// away or ran out of time before the end of its headers. Such clients get no
/// response.
pub fn handle_client<T, S, C, N, L>(
    app: &mut AppState<S, C, N, L>,
    stream: &mut T,
    deadline: Instant,
) -> io::Result<Option<Route>>
where
    T: ClientStream,
    S: SnapshotSource,
    C: Clock,
    N: NetworkTime,
    L: DataLog,
{
    let mut scanner = RequestScanner::new();
    let mut chunk = [0u8; 256];
    while !scanner.is_complete() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("Client timed out");
            return Ok(None);
        }
        stream.limit_read(remaining)?;

        match stream.read(&mut chunk) {
            Ok(0) => {
                debug!("Client closed the connection mid-request");
                return Ok(None);
            }
            Ok(n) => {
                scanner.feed(&chunk[..n]);
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                warn!("Client timed out");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    let route = Route::from_request(scanner.request());
    debug!("Serving {:?}", route);
    let response = block_on(app.handle_request(route));
    stream.write_all(response.head().as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()?;
    Ok(Some(route))
}

fn serve_stream<S, C, N, L>(
    app: &mut AppState<S, C, N, L>,
    mut stream: TcpStream,
    client_timeout: Duration,
) -> io::Result<Option<Route>>
where
    S: SnapshotSource,
    C: Clock,
    N: NetworkTime,
    L: DataLog,
{
    let deadline = Instant::now() + client_timeout;
    stream.set_nonblocking(false)?;
    handle_client(app, &mut stream, deadline)
}

/// Accept clients one at a time forever, running `tick` between them.
pub fn serve<S, C, N, L>(
    app: &mut AppState<S, C, N, L>,
    listener: &TcpListener,
    link_up: bool,
    client_timeout: Duration,
) -> io::Result<()>
where
    S: SnapshotSource,
    C: Clock,
    N: NetworkTime,
    L: DataLog,
{
    listener.set_nonblocking(true)?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("Client connected: {}", peer);
                if let Err(e) = serve_stream(app, stream, client_timeout) {
                    warn!("Client {} failed: {}", peer, e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(IDLE_POLL),
            Err(e) => return Err(e),
        }

        match block_on(app.tick(link_up)) {
            Ok(Some(snapshot)) => info!(
                "Saved sample: {:.2}°C {:.2}% {:.2} hPa {} lx",
                snapshot.temperature_celsius,
                snapshot.humidity_percent,
                snapshot.pressure_hpa,
                snapshot.illuminance_lux
            ),
            Ok(None) => {}
            Err(e) => error!("Failed to save sample: {}", e),
        }
    }
}
