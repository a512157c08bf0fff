//! Listener + bounded worker pool + dispatch queue.
//!
//! Generalizes the teacher's per-connection `SocketActor` (one actor, one
//! task, `monocoque-core/src/actor.rs`) to a *pool* of worker tasks
//! pulling accepted connections off one bounded queue, per the design
//! notes' "per-operation thread creation -> bounded worker pool + queues"
//! guidance (SPEC_FULL §4.F'): a single accept loop is the dispatcher; it
//! never itself runs a handler, so it can never be blocked by one. When
//! the queue is full the accept loop answers the connection directly
//! with the handler's shed response and closes it, rather than queuing
//! unboundedly.
//!
//! One instance serves one opcode contract (`Request`/`Response` for a
//! ring peer, `RegistryRequest`/`RegistryResponse` for the bootstrap
//! registry) — the type parameters are fixed by the `RequestHandler` impl
//! passed in.

use crate::framing::{read_message, write_message};
use crate::tcp::enable_tcp_nodelay;
use async_trait::async_trait;
use compio::net::{TcpListener, TcpStream};
use compio::time::timeout;
use flume::{Receiver, Sender};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One opcode contract's request handling logic. `chordite`'s ring-peer
/// handler and `chordite-bootstrap`'s registry handler each implement
/// this once.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: DeserializeOwned + Send + 'static;
    type Response: Serialize + Send + 'static;

    async fn handle(&self, req: Self::Request) -> Self::Response;

    /// Response sent (then the connection is dropped) when the worker
    /// pool and its queue are both saturated — §7's "shed load" policy
    /// for local resource exhaustion.
    fn shed_response(&self) -> Self::Response;
}

/// A running listener: holds the accept-loop and worker-pool task
/// handles so the owner can request a drained shutdown.
pub struct Listener {
    stopping: Arc<AtomicBool>,
    tasks: Vec<compio::runtime::Task<()>>,
}

impl Listener {
    /// Bind `addr` and start serving `handler` with `worker_count`
    /// workers draining a queue of depth `queue_depth`. Returns once the
    /// listener is bound and the workers are spawned; serving continues
    /// in the background until [`Listener::shutdown`] is called.
    pub async fn bind<H>(
        addr: &str,
        handler: Arc<H>,
        worker_count: usize,
        queue_depth: usize,
        net_timeout: Duration,
    ) -> io::Result<Self>
    where
        H: RequestHandler,
    {
        let tcp_listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(tcp_listener, handler, worker_count, queue_depth, net_timeout))
    }

    fn from_listener<H>(
        tcp_listener: TcpListener,
        handler: Arc<H>,
        worker_count: usize,
        queue_depth: usize,
        net_timeout: Duration,
    ) -> Self
    where
        H: RequestHandler,
    {
        let stopping = Arc::new(AtomicBool::new(false));
        let (tx, rx): (Sender<TcpStream>, Receiver<TcpStream>) = flume::bounded(queue_depth.max(1));

        let mut tasks = Vec::with_capacity(worker_count + 1);
        for worker_id in 0..worker_count.max(1) {
            let rx = rx.clone();
            let handler = Arc::clone(&handler);
            let stopping = Arc::clone(&stopping);
            tasks.push(compio::runtime::spawn(async move {
                worker_loop(worker_id, rx, handler, stopping, net_timeout).await;
            }));
        }

        {
            let stopping = Arc::clone(&stopping);
            tasks.push(compio::runtime::spawn(async move {
                accept_loop(tcp_listener, tx, handler, stopping).await;
            }));
        }

        Self { stopping, tasks }
    }

    /// Stop accepting new connections, let in-flight requests finish up
    /// to `drain_timeout`, then return once every background task has
    /// ended (or been abandoned past the deadline).
    pub async fn shutdown(self, drain_timeout: Duration) {
        self.stopping.store(true, Ordering::SeqCst);
        for task in self.tasks {
            if timeout(drain_timeout, task).await.is_err() {
                debug!("listener shutdown: worker did not drain within deadline, abandoning");
            }
        }
    }
}

async fn accept_loop<H>(
    tcp_listener: TcpListener,
    tx: Sender<TcpStream>,
    handler: Arc<H>,
    stopping: Arc<AtomicBool>,
) where
    H: RequestHandler,
{
    // Poll accept with a short timeout so the loop periodically checks
    // `stopping` instead of blocking forever in a single `accept().await`
    // that shutdown could never cancel.
    const POLL_INTERVAL: Duration = Duration::from_millis(200);

    while !stopping.load(Ordering::SeqCst) {
        let accepted = match timeout(POLL_INTERVAL, tcp_listener.accept()).await {
            Ok(Ok((stream, _addr))) => stream,
            Ok(Err(e)) => {
                warn!(error = %e, "accept failed");
                continue;
            }
            Err(_) => continue, // poll interval elapsed, recheck `stopping`
        };
        let _ = enable_tcp_nodelay(&accepted);

        if let Err(flume::TrySendError::Full(stream)) = tx.try_send(accepted) {
            debug!("dispatch queue full, shedding inbound connection");
            shed_connection(stream, &*handler).await;
        }
    }
}

async fn shed_connection<H: RequestHandler>(mut stream: TcpStream, handler: &H) {
    let response = handler.shed_response();
    let _ = write_message(&mut stream, &response, Duration::from_secs(1)).await;
}

async fn worker_loop<H>(
    worker_id: usize,
    rx: Receiver<TcpStream>,
    handler: Arc<H>,
    stopping: Arc<AtomicBool>,
    net_timeout: Duration,
) where
    H: RequestHandler,
{
    while let Ok(mut stream) = rx.recv_async().await {
        loop {
            let req: H::Request = match read_message(&mut stream, net_timeout).await {
                Ok(req) => req,
                Err(e) => {
                    debug!(worker = worker_id, error = %e, "connection closed or framing error");
                    break;
                }
            };

            let response = handler.handle(req).await;
            if write_message(&mut stream, &response, net_timeout).await.is_err() {
                break;
            }

            // Inbound requests already in flight are allowed to finish;
            // we just stop accepting a *next* request on this connection
            // once shutdown has been requested.
            if stopping.load(Ordering::SeqCst) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chordite_wire::message::{Request, Response};

    struct EchoPingHandler;

    #[async_trait]
    impl RequestHandler for EchoPingHandler {
        type Request = Request;
        type Response = Response;

        async fn handle(&self, req: Request) -> Response {
            match req {
                Request::Ping => Response::Ack,
                _ => Response::error("unsupported in test handler"),
            }
        }

        fn shed_response(&self) -> Response {
            Response::error("busy")
        }
    }

    #[test]
    fn serves_one_round_trip_over_tcp() {
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let port = portpicker::pick_unused_port().expect("free port");
            let addr = format!("127.0.0.1:{port}");
            let listener = Listener::bind(&addr, Arc::new(EchoPingHandler), 2, 8, Duration::from_secs(2))
                .await
                .unwrap();

            // Give the accept loop a tick to start polling.
            compio::time::sleep(Duration::from_millis(50)).await;

            let mut stream = TcpStream::connect(&addr).await.unwrap();
            write_message(&mut stream, &Request::Ping, Duration::from_secs(2)).await.unwrap();
            let resp: Response = read_message(&mut stream, Duration::from_secs(2)).await.unwrap();
            assert!(matches!(resp, Response::Ack));

            listener.shutdown(Duration::from_millis(500)).await;
        });
    }
}
