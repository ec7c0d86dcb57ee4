//! One monitoring pass: check every configured target, then send at most one
//! alert.
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::alerting::FailureAccumulator;
use crate::config::MonitorConfig;
use crate::notifications::{AlertDispatcher, DeliveryStatus, NotificationSender};
use crate::service_monitor::{Check, CheckOutcome, ProtocolKind, TargetSpec};

/// Summary of a finished run, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub checked: usize,
    pub failed: usize,
    pub delivery: DeliveryStatus,
}

pub struct Runner<C, S> {
    checker: C,
    dispatcher: AlertDispatcher<S>,
    concurrency: usize,
}

impl<C, S> Runner<C, S>
where
    C: Check,
    S: NotificationSender,
{
    pub fn new(checker: C, dispatcher: AlertDispatcher<S>) -> Self {
        Self {
            checker,
            dispatcher,
            concurrency: 1,
        }
    }

    /// Allows up to `concurrency` checks of one protocol in flight at once.
    /// Results are still recorded in configuration order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    pub fn dispatcher(&self) -> &AlertDispatcher<S> {
        &self.dispatcher
    }

    /// Runs every protocol category in order (or only `only`), then
    /// dispatches the collected failures.
    pub async fn run(&self, config: &MonitorConfig, only: Option<ProtocolKind>) -> RunReport {
        if !config.enabled {
            info!("Monitoring is disabled in config; nothing to do.");
            return RunReport {
                checked: 0,
                failed: 0,
                delivery: DeliveryStatus::Skipped,
            };
        }

        let mut failures = FailureAccumulator::new();
        let mut checked = 0;

        for kind in ProtocolKind::ALL {
            if only.is_some_and(|selected| selected != kind) {
                continue;
            }
            let targets = config.targets(kind);
            if targets.is_empty() {
                continue;
            }
            info!(kind = %kind, count = targets.len(), "Checking targets.");
            checked += targets.len();
            self.check_category(&targets, &mut failures).await;
        }

        let failed = failures.len();
        if failed > 0 {
            warn!(checked, failed, "Some targets failed their checks.");
        } else {
            info!(checked, "All targets passed.");
        }

        let records = failures.drain();
        let delivery = self.dispatcher.send(&records, &config.webhook_token).await;
        RunReport {
            checked,
            failed,
            delivery,
        }
    }

    async fn check_category(&self, targets: &[TargetSpec], failures: &mut FailureAccumulator) {
        let checker = &self.checker;
        // `buffered` yields in input order regardless of completion order.
        let outcomes: Vec<(&TargetSpec, CheckOutcome)> = stream::iter(targets)
            .map(|target| async move { (target, checker.check(target).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (target, outcome) in outcomes {
            if let CheckOutcome::Failure(e) = outcome {
                failures.record(target.title(), e.to_string());
            }
        }
    }
}
