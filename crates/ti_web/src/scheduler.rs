use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use ti_core::storage::{ProfileStore, ScheduleStore, Store};
use ti_core::{Clock, ScheduledTask};
use ti_report::{
    report_filename, rows_to_csv, BodyFormat, EmailAttachment, Mailer, ReportPipeline, TrendReport,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const FIRE_EARLY: i64 = 5; // minutes before the scheduled time
const FIRE_LATE: i64 = 1; // minutes after

/// Whether `task` should fire at `now`: the day rule matches, `now` falls in
/// the fire window around the scheduled time, and it has not run today.
pub fn is_due(task: &ScheduledTask, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    if !task.day.matches(today.weekday()) {
        return false;
    }
    if task.last_run == Some(today) {
        return false;
    }

    let scheduled = today.and_time(task.time_utc).and_utc();
    let diff = now - scheduled;
    diff >= -Duration::minutes(FIRE_EARLY) && diff <= Duration::minutes(FIRE_LATE)
}

/// Reload-driven scheduler: `tick` is called on every HTTP request rather
/// than from a background task, so a fire can only happen while traffic
/// flows. Non-reentrant via `try_lock`; a tick that finds a run in progress
/// returns immediately.
pub struct Scheduler {
    store: Arc<dyn Store>,
    pipeline: Arc<ReportPipeline>,
    mailer: Option<Arc<Mailer>>,
    clock: Arc<dyn Clock>,
    running: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        pipeline: Arc<ReportPipeline>,
        mailer: Option<Arc<Mailer>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            pipeline,
            mailer,
            clock,
            running: Mutex::new(()),
        }
    }

    /// Errors are logged, never propagated to the request that ticked.
    pub async fn tick(&self) {
        let Ok(_guard) = self.running.try_lock() else {
            return;
        };

        let task = match self.store.schedule().await {
            Ok(Some(task)) => task,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to load schedule");
                return;
            }
        };

        let now = self.clock.now();
        if !is_due(&task, now) {
            return;
        }
        info!(profile = %task.profile_name, "scheduled report run firing");

        let profile = match self.store.list_profiles().await {
            Ok(profiles) => profiles.into_iter().find(|p| p.name == task.profile_name),
            Err(e) => {
                warn!(error = %e, "failed to load profiles for scheduled run");
                return;
            }
        };
        let Some(profile) = profile else {
            warn!(profile = %task.profile_name, "scheduled profile no longer exists");
            return;
        };

        let report = match self.pipeline.run(&profile).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "scheduled report run failed");
                return;
            }
        };

        // last_run is only recorded once a delivery was attempted; without a
        // mailer the task stays due so configuring smtp later picks it up
        let Some(mailer) = &self.mailer else {
            warn!("no smtp configuration, scheduled report not emailed");
            return;
        };
        if let Err(e) = self.deliver(mailer, &task, &report, now).await {
            error!(error = %e, "scheduled report delivery failed");
        }
        if let Err(e) = self.store.mark_run(now.date_naive()).await {
            warn!(error = %e, "failed to record scheduled run date");
        }
    }

    async fn deliver(
        &self,
        mailer: &Mailer,
        task: &ScheduledTask,
        report: &TrendReport,
        now: DateTime<Utc>,
    ) -> ti_core::Result<()> {
        let mut attachments = vec![EmailAttachment {
            data: report.formatted.clone().into_bytes(),
            filename: report_filename("트렌드_보고서", "txt", now),
            mime_type: "text/plain".to_string(),
        }];
        match rows_to_csv(&ti_report::parse_report(&report.formatted)) {
            Ok(csv) => attachments.push(EmailAttachment {
                data: csv,
                filename: report_filename("트렌드_보고서", "csv", now),
                mime_type: "text/csv".to_string(),
            }),
            Err(e) => warn!(error = %e, "report csv attachment skipped"),
        }
        if let Some(clause) = &report.clause {
            attachments.push(EmailAttachment {
                data: clause.clone().into_bytes(),
                filename: report_filename("생성된_보험_특약", "txt", now),
                mime_type: "text/plain".to_string(),
            });
        }

        mailer
            .send_report(
                &task.recipients,
                &format!("뉴스 트렌드 분석 보고서 ({})", now.format("%Y-%m-%d")),
                &report.formatted,
                BodyFormat::Markdown,
                attachments,
            )
            .await
    }
}
