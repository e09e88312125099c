//! Command gateway.
//!
//! Receives remote commands over two channels and translates them into
//! bus writes:
//!
//! - a UDP socket carrying JSON-RPC style datagrams
//!   (`{"jsonrpc":"2.0","method":"set_power_level","params":{...}}`),
//! - a TCP listener answering one `GET /?power_level=<n>` web form.
//!
//! Polled once per cycle; alternates one source per call so neither
//! channel can starve the other or block the cycle. All sockets are
//! non-blocking; "no data" is normal control flow. Malformed payloads
//! are logged and dropped; nothing inbound can crash the loop.

pub mod http;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::time::Duration;

use anyhow::Context;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::bus::PidPatch;
use crate::config::SystemConfig;
use crate::error::RequestError;
use crate::looper::{PollCtx, Pollable};

/// The datagram envelope. `jsonrpc` and `id` are required / carried by
/// the protocol but their content is unused.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Value,
    #[serde(default)]
    #[allow(dead_code)]
    id: Option<i64>,
}

pub struct CommandGateway {
    device_id: String,
    udp: UdpSocket,
    web: TcpListener,
    /// Alternates between the datagram and connection channels.
    poll_udp: bool,
    /// Upper bound on one web read, kept within the poll period.
    read_timeout: Duration,
}

impl CommandGateway {
    pub fn new(config: &SystemConfig) -> anyhow::Result<Self> {
        let udp = UdpSocket::bind((config.bind_address.as_str(), config.udp_port))
            .with_context(|| format!("binding UDP command socket on port {}", config.udp_port))?;
        udp.set_nonblocking(true)
            .context("setting UDP socket non-blocking")?;

        let web = TcpListener::bind((config.bind_address.as_str(), config.web_port))
            .with_context(|| format!("binding web socket on port {}", config.web_port))?;
        web.set_nonblocking(true)
            .context("setting web listener non-blocking")?;

        Ok(Self {
            device_id: config.device_id.clone(),
            udp,
            web,
            poll_udp: true,
            read_timeout: Duration::from_millis(u64::from(config.poll_interval_ms.max(1))),
        })
    }

    /// Actual bound datagram address (useful when configured with port 0).
    pub fn udp_addr(&self) -> std::io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    /// Actual bound web address.
    pub fn web_addr(&self) -> std::io::Result<SocketAddr> {
        self.web.local_addr()
    }

    // ── Datagram channel ──────────────────────────────────────

    /// Drain every queued datagram without blocking.
    fn poll_datagrams(&mut self, ctx: &mut PollCtx) {
        let mut buf = [0u8; 2048];
        loop {
            match self.udp.recv_from(&mut buf) {
                Ok((len, peer)) => match parse_datagram(&buf[..len]) {
                    Ok(request) => self.process_request(&request, ctx),
                    Err(e) => warn!("dropping datagram from {peer}: {e}"),
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("udp receive error: {e}");
                    break;
                }
            }
        }
    }

    fn process_request(&mut self, request: &RpcRequest, ctx: &mut PollCtx) {
        match request.method.as_str() {
            "set_power_level" => self.set_power_level(&request.params, ctx),
            "pid_update" => match PidPatch::deserialize(&request.params) {
                Ok(patch) => {
                    let now = ctx.now_ms();
                    ctx.bus.merge_pid_settings(&patch, now);
                }
                Err(e) => warn!("dropping pid_update: bad params: {e}"),
            },
            // Shutdown goes through this gateway's own poll context, not
            // any global handle.
            "shutdown" => ctx.request_shutdown(),
            other => warn!("dropping request: unknown method '{other}'"),
        }
    }

    /// Parse, round and store a power level. Fails silently (logged, no
    /// write) on a missing field or a non-numeric value.
    fn set_power_level(&mut self, params: &Value, ctx: &mut PollCtx) {
        match extract_level(params) {
            Ok(level) => {
                let now = ctx.now_ms();
                ctx.bus.set_power_level(level, now);
            }
            Err(e) => debug!("set_power_level ignored: {e}"),
        }
    }

    // ── Connection channel ────────────────────────────────────

    /// Accept at most one pending connection, answer it, close it.
    fn poll_web(&mut self, ctx: &mut PollCtx) {
        let (mut stream, peer) = match self.web.accept() {
            Ok(conn) => conn,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
            Err(e) => {
                warn!("web accept error: {e}");
                return;
            }
        };
        debug!("web connection from {peer}");

        // Bound the read by the poll period so a slow client cannot
        // stall the cycle.
        let _ = stream.set_read_timeout(Some(self.read_timeout));
        let mut buf = [0u8; 4096];
        let query = match stream.read(&mut buf) {
            Ok(len) if len > 0 => http::parse_query(&buf[..len]),
            _ => None,
        };

        // A query applies the level; a bare or static-asset request has
        // no side effect.
        if let Some(params) = query {
            if let Some(raw) = params.get("power_level") {
                match raw.trim().parse::<f32>() {
                    Ok(level) => {
                        let now = ctx.now_ms();
                        ctx.bus.set_power_level(level, now);
                    }
                    Err(_) => debug!("web: non-numeric power_level '{raw}'"),
                }
            }
        }

        // The status page goes out on every exit path, then the
        // connection closes on drop.
        let page = http::build_page(&self.device_id, ctx.bus.power().power_level);
        if let Err(e) = stream.write_all(page.as_bytes()) {
            debug!("web: response write failed: {e}");
        }
    }
}

impl Pollable for CommandGateway {
    fn poll(&mut self, ctx: &mut PollCtx) {
        if self.poll_udp {
            self.poll_udp = false;
            self.poll_datagrams(ctx);
        } else {
            self.poll_udp = true;
            self.poll_web(ctx);
        }
    }

    fn shutdown(&mut self, _ctx: &mut PollCtx) {
        // Sockets close on drop; nothing else to release.
        debug!("command gateway closed");
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_datagram(payload: &[u8]) -> Result<RpcRequest, RequestError> {
    let text = std::str::from_utf8(payload).map_err(|_| RequestError::BadPayload)?;
    // Report which required envelope field is absent, like the wire
    // protocol promises; other shape errors are just a bad payload.
    let value: Value = serde_json::from_str(text).map_err(|_| RequestError::BadPayload)?;
    for field in ["jsonrpc", "method", "params"] {
        if value.get(field).is_none() {
            return Err(RequestError::MissingField(field));
        }
    }
    RpcRequest::deserialize(value).map_err(|_| RequestError::BadPayload)
}

fn extract_level(params: &Value) -> Result<f32, RequestError> {
    let raw = params
        .get("power_level")
        .ok_or(RequestError::MissingField("power_level"))?;
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(|v| v as f32)
            .ok_or(RequestError::BadNumber("power_level")),
        Value::String(s) => s
            .trim()
            .parse::<f32>()
            .map_err(|_| RequestError::BadNumber("power_level")),
        _ => Err(RequestError::BadNumber("power_level")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
