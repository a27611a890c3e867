use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

pub const DEFAULT_RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP, please try again later";

/// Checks between sweeps of expired windows.
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Process-wide per-IP limiter plus the message sent when it trips.
#[derive(Clone)]
pub struct IpRateLimit {
    /// Fixed-window request counters keyed by client IP
    windows: Arc<DashMap<IpAddr, Window>>,
    max_requests: u32,
    window: Duration,
    message: Arc<str>,
    trust_proxy: bool,
    checks: Arc<AtomicU64>,
}

impl IpRateLimit {
    /// Allow `max_requests` per `window` from one IP.
    ///
    /// A window opens on the first request from an IP and its count resets
    /// once `window` has elapsed.
    pub fn new(max_requests: u32, window: Duration, message: impl Into<String>) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests: max_requests.max(1),
            window: window.max(Duration::from_millis(1)),
            message: Arc::from(message.into()),
            trust_proxy: false,
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Key on the first `x-forwarded-for` entry instead of the socket peer.
    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Count one request from `ip`. Returns the seconds to wait when exhausted.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.purge_expired(now);
        }

        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.saturating_duration_since(window.started));
            return Err(ceil_secs(remaining).max(1));
        }

        window.count += 1;
        Ok(())
    }

    /// Drop windows that have already ended.
    pub fn purge_expired(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    /// Number of IPs with an open window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Client IP: the socket peer, or the first `x-forwarded-for` entry when
    /// the service sits behind a trusted proxy.
    pub fn client_ip(&self, request: &Request) -> Option<IpAddr> {
        let forwarded_ip = if self.trust_proxy {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        } else {
            None
        };

        forwarded_ip.or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limit): State<IpRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limit.client_ip(&request) {
        Some(ip) => match limit.check(ip) {
            Ok(()) => Ok(next.run(request).await),
            Err(retry_after) => {
                tracing::warn!(client_ip = %ip, "Rate limit exceeded");
                metrics::counter!("http_rate_limited_total").increment(1);
                Err(AppError::RateLimited(
                    limit.message().to_string(),
                    Some(retry_after),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
