//! Analysis Polling
//!
//! An analysis job is re-fetched on a fixed interval for as long as it reports
//! `pending`. There is no backoff and no retry: a failed fetch ends the loop,
//! as does cancellation (page teardown in the dashboard, Ctrl-C in the CLI).

use std::time::Duration;

use crate::models::AnalysisStatus;

/// Fixed delay between fetches of a pending analysis
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What to do after observing a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue,
    Stop,
}

impl PollDecision {
    pub fn after(status: &AnalysisStatus) -> Self {
        if status.is_pending() {
            PollDecision::Continue
        } else {
            PollDecision::Stop
        }
    }
}

#[cfg(feature = "native")]
pub use runner::{AnalysisSource, PollOutcome, Poller};

#[cfg(feature = "native")]
mod runner {
    use std::future::Future;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{PollDecision, POLL_INTERVAL};
    use crate::error::{ClientError, ClientResult};
    use crate::models::AnalysisDetail;

    /// Anything that can fetch an analysis by id
    #[async_trait]
    pub trait AnalysisSource: Send + Sync {
        async fn fetch_analysis(&self, id: i64) -> ClientResult<AnalysisDetail>;
    }

    /// How a poll loop ended
    #[derive(Debug)]
    pub enum PollOutcome {
        /// The job left `pending`
        Settled(AnalysisDetail),
        /// A fetch failed; the loop does not retry
        Failed(ClientError),
        /// Cancelled, with the last snapshot seen (if any)
        Cancelled(Option<AnalysisDetail>),
    }

    /// Fixed-interval poll loop
    #[derive(Debug, Clone)]
    pub struct Poller {
        interval: Duration,
    }

    impl Default for Poller {
        fn default() -> Self {
            Self::new(POLL_INTERVAL)
        }
    }

    impl Poller {
        pub fn new(interval: Duration) -> Self {
            Self { interval }
        }

        pub fn interval(&self) -> Duration {
            self.interval
        }

        /// Fetch `id` until it settles, fails, or `cancel` resolves.
        ///
        /// `on_update` sees every snapshot, including the final one.
        pub async fn run<S, F, C>(
            &self,
            source: &S,
            id: i64,
            mut on_update: F,
            cancel: C,
        ) -> PollOutcome
        where
            S: AnalysisSource + ?Sized,
            F: FnMut(&AnalysisDetail),
            C: Future<Output = ()>,
        {
            tokio::pin!(cancel);
            let mut last: Option<AnalysisDetail> = None;
            let mut attempt: u32 = 0;

            loop {
                let fetched = tokio::select! {
                    _ = &mut cancel => return PollOutcome::Cancelled(last),
                    result = source.fetch_analysis(id) => result,
                };
                attempt += 1;

                let detail = match fetched {
                    Ok(detail) => detail,
                    Err(e) => {
                        tracing::warn!(analysis_id = id, attempt, "Analysis fetch failed: {}", e);
                        return PollOutcome::Failed(e);
                    }
                };

                tracing::debug!(analysis_id = id, attempt, status = %detail.status, "Polled analysis");
                on_update(&detail);

                if PollDecision::after(&detail.status) == PollDecision::Stop {
                    return PollOutcome::Settled(detail);
                }
                last = Some(detail);

                tokio::select! {
                    _ = &mut cancel => return PollOutcome::Cancelled(last),
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }
    }
}
