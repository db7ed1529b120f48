//! Per-agent request-frequency limiting.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use vibegate_core::{traits::RateAdmitter, Result};

const WINDOW: Duration = Duration::from_secs(60);

/// Fixed 60-second trailing window with lazy eviction.
///
/// On each call, timestamps older than the window are discarded; if the
/// remaining count has reached the agent's ceiling the request is rejected
/// without being recorded, otherwise it is recorded and admitted. Bursts of
/// up to twice the nominal rate across a window boundary are admitted; that
/// is the documented baseline behavior of this algorithm.
///
/// State is local to the running process. Each replica enforces the limit
/// independently; a shared-store `RateAdmitter` is the seam for tightening
/// that.
pub struct FixedWindowLimiter {
    /// Admitted-request timestamps by agent ID. The entry guard gives
    /// per-agent mutual exclusion across the check-and-record step.
    windows: DashMap<String, Vec<Instant>>,
}

impl FixedWindowLimiter {
    /// Create a new limiter with no recorded history.
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Number of agents with a live window.
    pub fn tracked_agents(&self) -> usize {
        self.windows.len()
    }

    fn admit_at(&self, agent_id: &str, limit_per_minute: u32, now: Instant) -> bool {
        let mut window = self.windows.entry(agent_id.to_string()).or_default();

        window.retain(|t| now.duration_since(*t) < WINDOW);

        if window.len() >= limit_per_minute as usize {
            return false;
        }

        window.push(now);
        true
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateAdmitter for FixedWindowLimiter {
    async fn try_admit(&self, agent_id: &str, limit_per_minute: u32) -> Result<bool> {
        let admitted = self.admit_at(agent_id, limit_per_minute, Instant::now());

        if !admitted {
            tracing::debug!(
                agent_id = agent_id,
                limit_per_minute = limit_per_minute,
                "Rate limit rejection"
            );
        }

        Ok(admitted)
    }
}
