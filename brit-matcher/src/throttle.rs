//! Per-IP request throttling.
//!
//! Payers only need today's addresses once, so the default allows a single
//! request per client IP per minute.
//!
//! # Thread Safety
//!
//! The throttle uses `Mutex` for thread-safe access. Lock poisoning
//! is handled by failing open (allowing requests) rather than
//! panicking, to avoid blocking legitimate traffic.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Configuration for request throttling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Maximum requests per IP within the window.
    pub max_requests_per_ip: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Maximum tracked IPs to prevent memory exhaustion.
    pub max_tracked_ips: usize,
    /// Optional limit on total requests across all IPs within the window.
    pub global_max_requests: Option<u32>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests_per_ip: 1,
            window_secs: 60,
            max_tracked_ips: 10_000,
            global_max_requests: None,
        }
    }
}

impl ThrottleConfig {
    pub fn new(max_requests: u32, window_secs: u64, max_ips: usize) -> Self {
        Self {
            max_requests_per_ip: max_requests,
            window_secs,
            max_tracked_ips: max_ips,
            global_max_requests: None,
        }
    }

    /// Relaxed throttling for development and tests.
    pub fn relaxed() -> Self {
        Self {
            max_requests_per_ip: 100,
            window_secs: 60,
            max_tracked_ips: 1_000,
            global_max_requests: None,
        }
    }

    /// Disable throttling.
    pub fn disabled() -> Self {
        Self {
            max_requests_per_ip: u32::MAX,
            window_secs: 1,
            max_tracked_ips: 1,
            global_max_requests: None,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
    last_seen: Instant,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            count: 1,
            started: now,
            last_seen: now,
        }
    }

    fn is_expired(&self, length: Duration, now: Instant) -> bool {
        now.duration_since(self.started) > length
    }

    /// Whether one more request fits, without recording it.
    fn allows(&self, max: u32, length: Duration, now: Instant) -> bool {
        self.is_expired(length, now) || self.count < max
    }

    /// Count one request, restarting the window if it lapsed.
    fn record(&mut self, length: Duration, now: Instant) {
        if self.is_expired(length, now) {
            *self = Self::new(now);
        } else {
            self.count += 1;
            self.last_seen = now;
        }
    }

    fn admit(&mut self, max: u32, length: Duration, now: Instant) -> bool {
        if !self.allows(max, length, now) {
            return false;
        }
        self.record(length, now);
        true
    }
}

/// Thread-safe per-IP request throttle.
///
/// # Example
///
/// ```rust
/// use brit_matcher::throttle::{RequestThrottle, ThrottleConfig};
/// use std::net::IpAddr;
///
/// let throttle = RequestThrottle::new(ThrottleConfig::default());
/// let ip: IpAddr = "192.168.1.1".parse().unwrap();
///
/// assert!(throttle.check_and_record(ip));
/// assert!(!throttle.check_and_record(ip));
/// ```
#[derive(Debug)]
pub struct RequestThrottle {
    config: ThrottleConfig,
    records: Mutex<HashMap<IpAddr, Window>>,
    global: Mutex<Option<Window>>,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
            global: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Returns `true` if the request is allowed, and records it.
    ///
    /// Fails open if a lock is poisoned.
    pub fn check_and_record(&self, ip: IpAddr) -> bool {
        self.check_and_record_at(ip, Instant::now())
    }

    /// The per-IP limit is checked first, so a client that is already
    /// throttled does not use up the global allowance. At most
    /// `max_tracked_ips` windows are kept: expired ones are purged first,
    /// then the least recently seen IP is evicted.
    pub(crate) fn check_and_record_at(&self, ip: IpAddr, now: Instant) -> bool {
        let window = self.config.window();

        let mut records = match self.records.lock() {
            Ok(r) => r,
            Err(_) => return true,
        };

        if let Some(record) = records.get_mut(&ip) {
            if !record.allows(self.config.max_requests_per_ip, window, now) {
                record.last_seen = now;
                return false;
            }
        }

        if !self.admit_global(now) {
            tracing::debug!("global request limit reached");
            return false;
        }

        if let Some(record) = records.get_mut(&ip) {
            record.record(window, now);
            return true;
        }

        if records.len() >= self.config.max_tracked_ips {
            records.retain(|_, record| !record.is_expired(window, now));
        }
        if records.len() >= self.config.max_tracked_ips {
            let oldest = records
                .iter()
                .min_by_key(|(_, record)| record.last_seen)
                .map(|(ip, _)| *ip);
            if let Some(oldest) = oldest {
                records.remove(&oldest);
            }
        }
        if self.config.max_tracked_ips > 0 {
            records.insert(ip, Window::new(now));
        }
        true
    }

    fn admit_global(&self, now: Instant) -> bool {
        let Some(global_max) = self.config.global_max_requests else {
            return true;
        };
        let mut global = match self.global.lock() {
            Ok(g) => g,
            Err(_) => return true,
        };
        match global.as_mut() {
            Some(record) => record.admit(global_max, self.config.window(), now),
            None => {
                *global = Some(Window::new(now));
                true
            }
        }
    }

    /// Peek without recording.
    pub fn is_throttled(&self, ip: IpAddr) -> bool {
        let records = match self.records.lock() {
            Ok(r) => r,
            Err(_) => return false,
        };
        records.get(&ip).is_some_and(|record| {
            Instant::now().duration_since(record.started) <= self.config.window()
                && record.count >= self.config.max_requests_per_ip
        })
    }

    /// Forget an IP.
    pub fn reset(&self, ip: IpAddr) {
        if let Ok(mut records) = self.records.lock() {
            records.remove(&ip);
        }
    }

    /// Current number of tracked IPs. Returns 0 if the lock is poisoned.
    pub fn tracked_count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}
