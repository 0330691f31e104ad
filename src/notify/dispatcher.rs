use super::{render, NotificationChannel, OutboundMessage};
use crate::engine::types::AlertEvent;
use chrono::Local;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    // `attempt` is 1-based
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << shift)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    Partial { delivered: usize, failed: usize },
    Failed,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub digest: ChannelOutcome,
    pub direct: ChannelOutcome,
}

impl DispatchReport {
    pub fn status(&self) -> DispatchStatus {
        let enabled: Vec<ChannelOutcome> = [self.digest, self.direct]
            .into_iter()
            .filter(|o| *o != ChannelOutcome::Disabled)
            .collect();

        if !enabled.is_empty() && enabled.iter().all(|o| *o == ChannelOutcome::Delivered) {
            DispatchStatus::Success
        } else if enabled
            .iter()
            .any(|o| matches!(o, ChannelOutcome::Delivered | ChannelOutcome::Partial { .. }))
        {
            DispatchStatus::Partial
        } else {
            DispatchStatus::Failed
        }
    }
}

pub struct NotificationDispatcher {
    digest: Option<Arc<dyn NotificationChannel>>,
    direct: Option<Arc<dyn NotificationChannel>>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        digest: Option<Arc<dyn NotificationChannel>>,
        direct: Option<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            digest,
            direct,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn dispatch(&self, events: &[AlertEvent]) -> DispatchReport {
        let (digest, direct) = tokio::join!(self.send_digest(events), self.send_direct(events));
        let report = DispatchReport { digest, direct };

        match report.status() {
            DispatchStatus::Success => info!("Dispatched {} alerts", events.len()),
            DispatchStatus::Partial => warn!(
                "Alert dispatch degraded: digest={:?} direct={:?}",
                report.digest, report.direct
            ),
            DispatchStatus::Failed => error!(
                "Alert dispatch failed on every channel: digest={:?} direct={:?}",
                report.digest, report.direct
            ),
        }
        report
    }

    async fn send_digest(&self, events: &[AlertEvent]) -> ChannelOutcome {
        let channel = match &self.digest {
            Some(c) => c,
            None => return ChannelOutcome::Disabled,
        };
        let message = render::digest(events, &Local::now().naive_local());
        if send_with_retry(channel.as_ref(), &message, &self.policy).await {
            ChannelOutcome::Delivered
        } else {
            ChannelOutcome::Failed
        }
    }

    async fn send_direct(&self, events: &[AlertEvent]) -> ChannelOutcome {
        let channel = match &self.direct {
            Some(c) => c,
            None => return ChannelOutcome::Disabled,
        };

        let mut delivered = 0;
        for event in events {
            if send_with_retry(channel.as_ref(), &render::direct(event), &self.policy).await {
                delivered += 1;
            }
        }

        let failed = events.len() - delivered;
        match (delivered, failed) {
            (_, 0) => ChannelOutcome::Delivered,
            (0, _) => ChannelOutcome::Failed,
            _ => ChannelOutcome::Partial { delivered, failed },
        }
    }
}

pub async fn send_with_retry(
    channel: &dyn NotificationChannel,
    message: &OutboundMessage,
    policy: &RetryPolicy,
) -> bool {
    for attempt in 1..=policy.max_attempts {
        match channel.deliver(message).await {
            Ok(()) => return true,
            Err(e) => {
                warn!(
                    "{} send attempt {}/{} failed: {}",
                    channel.name(),
                    attempt,
                    policy.max_attempts,
                    e
                );
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay_after(attempt)).await;
                }
            }
        }
    }
    error!(
        "Failed to send {} message after {} attempts",
        channel.name(),
        policy.max_attempts
    );
    false
}
