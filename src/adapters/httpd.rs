//! Portal HTTP server adapter.
//!
//! ESP-IDF's httpd runs handlers on its own task, but the portal logic
//! lives in the single-threaded tick loop. The adapter bridges the two:
//! each handler packages its request together with a reply channel and
//! parks on that channel; the tick loop pops the exchange through
//! [`PortalHttpPort::next_request`] and answers through
//! [`PortalHttpPort::send_response`]. A handler that waits too long
//! answers 503 on its own, so a stalled loop cannot wedge httpd's task
//! pool.
//!
//! The simulation backend replaces the server with an injected request
//! queue and records every response for inspection.

use std::collections::VecDeque;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::ports::{HttpRequest, HttpResponse, NetError, PortalHttpPort};
#[cfg(target_os = "espidf")]
use crate::ports::HttpMethod;

#[cfg(target_os = "espidf")]
use std::sync::mpsc::{sync_channel, SyncSender};
#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};
#[cfg(target_os = "espidf")]
use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{Configuration as HttpConfig, EspHttpServer};
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;
#[cfg(target_os = "espidf")]
use esp_idf_svc::io::Write;

/// Large enough for any configuration document the portal accepts.
#[cfg(target_os = "espidf")]
const MAX_BODY_BYTES: usize = 8 * 1024;

/// How long a handler waits for the tick loop before giving up.
#[cfg(target_os = "espidf")]
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(target_os = "espidf")]
struct PendingExchange {
    request: HttpRequest,
    reply: SyncSender<HttpResponse>,
}

pub struct PortalHttpServer {
    #[cfg(target_os = "espidf")]
    server: Option<EspHttpServer<'static>>,
    #[cfg(target_os = "espidf")]
    exchanges: Arc<Mutex<VecDeque<PendingExchange>>>,
    /// Reply channel of the exchange currently held by the tick loop.
    #[cfg(target_os = "espidf")]
    in_flight: Option<SyncSender<HttpResponse>>,

    #[cfg(not(target_os = "espidf"))]
    sim_requests: VecDeque<HttpRequest>,
    #[cfg(not(target_os = "espidf"))]
    sim_responses: Vec<HttpResponse>,
}

impl PortalHttpServer {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            server: None,
            #[cfg(target_os = "espidf")]
            exchanges: Arc::new(Mutex::new(VecDeque::new())),
            #[cfg(target_os = "espidf")]
            in_flight: None,

            #[cfg(not(target_os = "espidf"))]
            sim_requests: VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_responses: Vec::new(),
        }
    }

    /// Queue a request as if a client had sent it.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_request(&mut self, request: HttpRequest) {
        self.sim_requests.push_back(request);
    }

    /// Drain everything the portal has answered so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn take_responses(&mut self) -> Vec<HttpResponse> {
        core::mem::take(&mut self.sim_responses)
    }
}

impl Default for PortalHttpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain the request body, bounded by [`MAX_BODY_BYTES`].
#[cfg(target_os = "espidf")]
fn read_body<R>(reader: &mut R) -> anyhow::Result<Vec<u8>>
where
    R: esp_idf_svc::io::Read,
    R::Error: core::fmt::Debug,
{
    let mut body = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| anyhow::anyhow!("body read failed: {e:?}"))?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
        anyhow::ensure!(body.len() <= MAX_BODY_BYTES, "request body too large");
    }
    Ok(body)
}

/// Hand the request to the tick loop and wait for its answer.
/// `None` means the loop never picked it up (or poisoned the queue).
#[cfg(target_os = "espidf")]
fn queue_and_wait(
    queue: &Mutex<VecDeque<PendingExchange>>,
    request: HttpRequest,
) -> Option<HttpResponse> {
    let (tx, rx) = sync_channel(1);
    match queue.lock() {
        Ok(mut q) => q.push_back(PendingExchange {
            request,
            reply: tx,
        }),
        Err(_) => return None,
    }
    rx.recv_timeout(EXCHANGE_TIMEOUT).ok()
}

impl PortalHttpPort for PortalHttpServer {
    #[cfg(target_os = "espidf")]
    fn start_http(&mut self) -> Result<(), NetError> {
        let mut server = EspHttpServer::new(&HttpConfig {
            stack_size: 16 * 1024,
            uri_match_wildcard: true,
            ..Default::default()
        })
        .map_err(|e| {
            warn!("http: server start failed: {e}");
            NetError::HttpStartFailed
        })?;

        let routes = [
            (Method::Get, HttpMethod::Get),
            (Method::Put, HttpMethod::Put),
            (Method::Options, HttpMethod::Options),
        ];
        for (method, mapped) in routes {
            let queue = self.exchanges.clone();
            server
                .fn_handler::<anyhow::Error, _>("/*", method, move |mut req| {
                    let body = read_body(&mut req)?;
                    let request = HttpRequest {
                        method: mapped,
                        path: req.uri().to_string(),
                        body,
                    };
                    match queue_and_wait(&queue, request) {
                        Some(resp) => {
                            let mut headers: Vec<(&str, &str)> =
                                Vec::with_capacity(1 + resp.extra_headers.len());
                            headers.push(("Content-Type", resp.content_type));
                            headers.extend_from_slice(resp.extra_headers);
                            let mut out = req.into_response(resp.status, None, &headers)?;
                            out.write_all(resp.body.as_bytes())?;
                        }
                        None => {
                            req.into_status_response(503)?;
                        }
                    }
                    Ok(())
                })
                .map_err(|e| {
                    warn!("http: handler registration failed: {e}");
                    NetError::HttpStartFailed
                })?;
        }

        self.server = Some(server);
        info!("http: portal server listening on :80");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn start_http(&mut self) -> Result<(), NetError> {
        info!("http: sim portal server started");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn next_request(&mut self) -> Option<HttpRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let exchange = self.exchanges.lock().ok()?.pop_front()?;
        self.in_flight = Some(exchange.reply);
        Some(exchange.request)
    }

    #[cfg(not(target_os = "espidf"))]
    fn next_request(&mut self) -> Option<HttpRequest> {
        self.sim_requests.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn send_response(&mut self, response: HttpResponse) {
        if let Some(reply) = self.in_flight.take() {
            // Handler may have timed out and gone away; that is fine.
            let _ = reply.send(response);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn send_response(&mut self, response: HttpResponse) {
        self.sim_responses.push(response);
    }
}
