pub mod routes;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::progress::Reporter;
use crate::core::state::InstallerContext;
use crate::core::version::VersionMap;

pub use routes::{mime_for_path, router, ServeState};

/// How long `stop` waits for in-flight responses before detaching the task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
}

struct Running {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

enum Inner {
    Stopped,
    /// `stop_requested` is set by a `stop` that arrives before the bind completes.
    Starting { stop_requested: bool },
    Listening(Running),
}

/// LAN server that re-serves the `_programs` store and the version map.
///
/// Every accepted connection runs on its own task, so a slow client never
/// holds up the others or a running batch.
pub struct DistributionServer {
    port: u16,
    state: ServeState,
    inner: Mutex<Inner>,
}

impl DistributionServer {
    pub fn new(port: u16, programs_dir: PathBuf, versions: VersionMap, reporter: Reporter) -> Self {
        Self {
            port,
            state: ServeState {
                programs_dir,
                versions,
                reporter,
            },
            inner: Mutex::new(Inner::Stopped),
        }
    }

    pub fn from_context(context: &InstallerContext) -> Self {
        Self::new(
            context.settings.server_port,
            context.programs_dir(),
            context.versions.clone(),
            context.reporter.clone(),
        )
    }

    pub fn state(&self) -> ServerState {
        match &*self.inner.lock() {
            Inner::Stopped => ServerState::Stopped,
            Inner::Starting { .. } => ServerState::Starting,
            Inner::Listening(_) => ServerState::Listening,
        }
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.inner.lock() {
            Inner::Listening(running) => Some(running.addr),
            _ => None,
        }
    }

    /// Bind all interfaces and start accepting.
    ///
    /// Calling this while already listening returns the current address.
    pub async fn start(&self) -> InstallerResult<SocketAddr> {
        {
            let mut inner = self.inner.lock();
            match &*inner {
                Inner::Listening(running) => return Ok(running.addr),
                Inner::Starting { .. } => {
                    return Err(InstallerError::Other("server is already starting".into()))
                }
                Inner::Stopped => {}
            }
            *inner = Inner::Starting {
                stop_requested: false,
            };
        }

        let reporter = &self.state.reporter;
        reporter.log("Starting server.");

        let requested = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        let bound = TcpListener::bind(requested)
            .await
            .and_then(|listener| listener.local_addr().map(|addr| (listener, addr)));
        let (listener, addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                *self.inner.lock() = Inner::Stopped;
                let err = InstallerError::ServerBind {
                    addr: requested,
                    source,
                };
                reporter.log(format!("Server could not start: {err}"));
                return Err(err);
            }
        };

        self.listen(listener, addr)
    }

    /// Second half of `start`: serve on a bound listener unless a stop came in.
    fn listen(&self, listener: TcpListener, addr: SocketAddr) -> InstallerResult<SocketAddr> {
        let mut inner = self.inner.lock();
        if let Inner::Starting {
            stop_requested: true,
        } = &*inner
        {
            *inner = Inner::Stopped;
            drop(inner);
            self.state.reporter.log("Server stopped.");
            return Err(InstallerError::Other(
                "server was stopped before it finished starting".into(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(self.state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Distribution server error: {}", e);
            }
        });

        *inner = Inner::Listening(Running {
            addr,
            shutdown_tx,
            task,
        });
        drop(inner);
        self.state
            .reporter
            .log("Server started. Listening for requests...");
        Ok(addr)
    }

    /// Close the listener and let in-flight responses finish.
    ///
    /// Safe to call when the server never started.
    pub async fn stop(&self) {
        let running = {
            let mut inner = self.inner.lock();
            match std::mem::replace(&mut *inner, Inner::Stopped) {
                Inner::Listening(running) => running,
                Inner::Starting { .. } => {
                    *inner = Inner::Starting {
                        stop_requested: true,
                    };
                    drop(inner);
                    self.state.reporter.log("Stopping server.");
                    return;
                }
                Inner::Stopped => {
                    drop(inner);
                    self.state.reporter.log("Server is not running.");
                    return;
                }
            }
        };

        self.state.reporter.log("Stopping server.");
        let _ = running.shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, running.task)
            .await
            .is_err()
        {
            warn!("Server did not drain within {:?}", SHUTDOWN_GRACE);
        }
        self.state.reporter.log("Server stopped.");
    }
}
