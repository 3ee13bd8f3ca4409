use std::sync::Arc;

use log::{error, info};
use tokio_cron_scheduler::{Job, JobSchedulerError};

use crate::services::settlement_service::{settings::SettlementSettings, SettlementService};

///
/// Creates the cron job settling the previous game day. The schedule is
/// evaluated in UTC; the settled date follows the game timezone.
///
pub fn create_settlement_job(
    settlement_service: Arc<dyn SettlementService>,
    settings: &SettlementSettings,
) -> Result<Job, JobSchedulerError> {
    Job::new_async(settings.cron.as_str(), move |_uuid, _lock| {
        let settlement_service = settlement_service.clone();
        Box::pin(async move {
            info!("Scheduled settlement starting");
            match settlement_service.run(None).await {
                Ok(report) => info!(
                    "Scheduled settlement of {} done: {} submission(s) settled, {} instance(s) failed",
                    report.date, report.submissions_settled, report.instances_failed
                ),
                // Unsettled submissions stay pending and are picked up by the next run
                Err(e) => error!("Scheduled settlement failed: {e}"),
            }
        })
    })
}
