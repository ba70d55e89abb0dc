//! Tracing setup and per-request relay accounting

use crate::stream::Fragment;
use crate::types::RequestId;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`); `LOG_FORMAT=json`
/// switches to JSON lines. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Counters for one relayed chat request, logged when the relay ends
#[derive(Debug)]
pub struct RelaySummary {
    /// Request identifier
    pub request_id: RequestId,
    /// Model id as sent to the API
    pub model: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Reasoning fragments relayed
    pub reasoning_fragments: usize,
    /// Answer fragments relayed
    pub content_fragments: usize,
    /// Whether the relay ended with an error block
    pub failed: bool,
    start: Instant,
    finished: bool,
}

impl RelaySummary {
    /// Start accounting for a request
    pub fn new(request_id: RequestId, model: impl Into<String>) -> Self {
        Self {
            request_id,
            model: model.into(),
            started_at: Utc::now(),
            reasoning_fragments: 0,
            content_fragments: 0,
            failed: false,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Count a relayed fragment
    pub fn record(&mut self, fragment: &Fragment) {
        match fragment {
            Fragment::Reasoning(_) => self.reasoning_fragments += 1,
            Fragment::Content(_) => self.content_fragments += 1,
            Fragment::ThinkOpen | Fragment::ThinkClose => {}
        }
    }

    /// Log the summary of a relay that ran to its end
    pub fn finish(mut self) {
        self.finished = true;
        info!(
            request_id = %self.request_id,
            model = %self.model,
            started_at = %self.started_at.to_rfc3339(),
            reasoning_fragments = self.reasoning_fragments,
            content_fragments = self.content_fragments,
            failed = self.failed,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "chat relay finished"
        );
    }
}

impl Drop for RelaySummary {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                request_id = %self.request_id,
                model = %self.model,
                elapsed_ms = self.start.elapsed().as_millis() as u64,
                "chat relay dropped before completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_text_fragments_only() {
        let mut summary = RelaySummary::new(RequestId::new(), "deepseek-r1");
        for fragment in [
            Fragment::ThinkOpen,
            Fragment::Reasoning("a".into()),
            Fragment::Reasoning("b".into()),
            Fragment::ThinkClose,
            Fragment::Content("c".into()),
        ] {
            summary.record(&fragment);
        }

        assert_eq!(summary.reasoning_fragments, 2);
        assert_eq!(summary.content_fragments, 1);
        assert!(!summary.failed);
        summary.finish();
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
