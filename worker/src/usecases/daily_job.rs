use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use backend::usecases::order_lifecycle::OrderLifecycleController;
use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::{invoices::InvoiceEntity, orders::OrderEntity},
        repositories::{
            invoice_reminders::InvoiceReminderRepository, invoices::InvoiceRepository,
            orders::OrderRepository, payments::PaymentRepository,
        },
        value_objects::{enums::invoice_statuses::InvoiceStatus, orders::ServerDetails},
    },
    email::mailer_client::{EmailAction, EmailMessage, EmailNotifier},
    panel::panel_client::PanelGateway,
    payments::qr_gateway::format_display_amount,
};
use mockall::automock;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::config_model::Jobs;

/// Drives the billing-side suspend transition for an order whose invoices
/// went unpaid past the grace period.
#[async_trait]
#[automock]
pub trait OrderSuspender: Send + Sync {
    async fn suspend_delinquent(&self, order_id: Uuid) -> Result<()>;
}

#[async_trait]
impl<O, I, P, Pnl, M> OrderSuspender for OrderLifecycleController<O, I, P, Pnl, M>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pnl: PanelGateway + Send + Sync + 'static,
    M: EmailNotifier + Send + Sync + 'static,
{
    async fn suspend_delinquent(&self, order_id: Uuid) -> Result<()> {
        let outcome = self.suspend(order_id).await?;
        if let Some(warning) = outcome.panel_warning {
            warn!(%order_id, warning = %warning, "daily_job: panel suspend degraded");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyJobSummary {
    pub reminders_sent: usize,
    pub reminders_by_threshold: BTreeMap<i32, usize>,
    pub overdue_count: usize,
    pub suspended_count: usize,
    pub suspend_failed: usize,
}

pub struct DailyJobUseCase {
    order_repository: Arc<dyn OrderRepository + Send + Sync>,
    invoice_repository: Arc<dyn InvoiceRepository + Send + Sync>,
    reminder_repository: Arc<dyn InvoiceReminderRepository + Send + Sync>,
    mailer: Arc<dyn EmailNotifier + Send + Sync>,
    suspender: Arc<dyn OrderSuspender + Send + Sync>,
    jobs: Jobs,
}

impl DailyJobUseCase {
    pub fn new(
        order_repository: Arc<dyn OrderRepository + Send + Sync>,
        invoice_repository: Arc<dyn InvoiceRepository + Send + Sync>,
        reminder_repository: Arc<dyn InvoiceReminderRepository + Send + Sync>,
        mailer: Arc<dyn EmailNotifier + Send + Sync>,
        suspender: Arc<dyn OrderSuspender + Send + Sync>,
        jobs: Jobs,
    ) -> Self {
        Self {
            order_repository,
            invoice_repository,
            reminder_repository,
            mailer,
            suspender,
            jobs,
        }
    }

    /// One batch run over both passes. Re-running with no newly due or
    /// overdue invoices produces zero new side effects.
    pub async fn run(&self) -> Result<DailyJobSummary> {
        let mut summary = DailyJobSummary::default();
        self.reminder_pass(&mut summary).await?;
        self.suspension_pass(&mut summary).await?;

        info!(
            reminders_sent = summary.reminders_sent,
            overdue_count = summary.overdue_count,
            suspended_count = summary.suspended_count,
            suspend_failed = summary.suspend_failed,
            "daily_job: run complete"
        );
        Ok(summary)
    }

    async fn reminder_pass(&self, summary: &mut DailyJobSummary) -> Result<()> {
        let now = Utc::now();
        // The window reaches back by the grace period so an invoice whose due
        // date passed while the job was down still gets its missed reminders.
        let window_start = now - Duration::days(self.jobs.suspend_grace_days);
        let window_end = now + Duration::days(self.jobs.lookahead_days);
        let due_soon = self
            .invoice_repository
            .list_unpaid_due_within(window_start, window_end)
            .await?;

        for invoice in due_soon {
            let days_left = (invoice.due_at - now).num_days().max(0);

            for &threshold in &self.jobs.reminder_thresholds {
                if days_left > i64::from(threshold) {
                    continue;
                }

                match self
                    .reminder_repository
                    .reminder_exists(invoice.id, threshold)
                    .await
                {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(err) => {
                        error!(
                            invoice_id = %invoice.id,
                            threshold,
                            db_error = ?err,
                            "daily_job: reminder dedup lookup failed"
                        );
                        continue;
                    }
                }

                let Some(recipient) = self.reminder_recipient(&invoice).await else {
                    warn!(
                        invoice_id = %invoice.id,
                        "daily_job: no contact email for invoice, reminder skipped"
                    );
                    continue;
                };

                self.mailer
                    .send(EmailMessage {
                        action: EmailAction::RenewalReminder,
                        recipient,
                        params: reminder_params(&invoice, days_left),
                    })
                    .await;

                if let Err(err) = self
                    .reminder_repository
                    .record_reminder(invoice.id, threshold)
                    .await
                {
                    error!(
                        invoice_id = %invoice.id,
                        threshold,
                        db_error = ?err,
                        "daily_job: failed to record reminder"
                    );
                }

                summary.reminders_sent += 1;
                *summary.reminders_by_threshold.entry(threshold).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    async fn suspension_pass(&self, summary: &mut DailyJobSummary) -> Result<()> {
        let cutoff = Utc::now() - Duration::days(self.jobs.suspend_grace_days);
        let overdue = self.order_repository.list_active_overdue(cutoff).await?;
        summary.overdue_count = overdue.len();

        for order in overdue {
            self.flag_overdue_invoices(order.id).await;

            match self.suspender.suspend_delinquent(order.id).await {
                Ok(()) => {
                    summary.suspended_count += 1;
                    info!(order_id = %order.id, "daily_job: order suspended for non-payment");
                }
                Err(err) => {
                    summary.suspend_failed += 1;
                    error!(
                        order_id = %order.id,
                        error = ?err,
                        "daily_job: suspend failed, continuing with the batch"
                    );
                }
            }
        }
        Ok(())
    }

    async fn flag_overdue_invoices(&self, order_id: Uuid) {
        let unpaid = match self.invoice_repository.list_unpaid_by_order(order_id).await {
            Ok(invoices) => invoices,
            Err(err) => {
                error!(
                    %order_id,
                    db_error = ?err,
                    "daily_job: failed to list unpaid invoices"
                );
                return;
            }
        };

        for invoice in unpaid {
            if let Err(err) = self
                .invoice_repository
                .update_status_by_id(invoice.id, &InvoiceStatus::Overdue.to_string())
                .await
            {
                error!(
                    invoice_id = %invoice.id,
                    db_error = ?err,
                    "daily_job: failed to flag invoice overdue"
                );
            }
        }
    }

    async fn reminder_recipient(&self, invoice: &InvoiceEntity) -> Option<String> {
        let order_id = invoice.order_id?;
        match self.order_repository.find_by_id(order_id).await {
            Ok(Some(order)) => contact_email_of(&order),
            Ok(None) => None,
            Err(err) => {
                error!(
                    %order_id,
                    db_error = ?err,
                    "daily_job: failed to load order for reminder"
                );
                None
            }
        }
    }
}

fn contact_email_of(order: &OrderEntity) -> Option<String> {
    serde_json::from_value::<ServerDetails>(order.server_details.clone())
        .ok()
        .and_then(|details| details.contact_email)
}

fn reminder_params(invoice: &InvoiceEntity, days_left: i64) -> HashMap<String, String> {
    HashMap::from([
        ("invoice_number".to_string(), invoice.number.to_string()),
        (
            "amount".to_string(),
            format_display_amount(invoice.total_minor, &invoice.currency),
        ),
        ("currency".to_string(), invoice.currency.clone()),
        ("due_at".to_string(), invoice.due_at.to_rfc3339()),
        ("days_left".to_string(), days_left.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::repositories::{
            invoice_reminders::MockInvoiceReminderRepository, invoices::MockInvoiceRepository,
            orders::MockOrderRepository,
        },
        email::mailer_client::MockEmailNotifier,
    };
    use serde_json::json;

    fn test_jobs() -> Jobs {
        Jobs {
            reminder_thresholds: vec![7, 3, 1],
            lookahead_days: 7,
            suspend_grace_days: 3,
            run_interval_secs: 86_400,
            internal_token: None,
        }
    }

    fn active_order(due_days_ago: i64) -> OrderEntity {
        OrderEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            price_minor: 1000,
            currency: "USD".to_string(),
            billing_cycle: "monthly".to_string(),
            next_due_at: Utc::now() - Duration::days(due_days_ago),
            status: "active".to_string(),
            server_details: json!({
                "plan": {
                    "name": "Iron",
                    "location": "eu-west",
                    "memory_mb": 4096,
                    "slots": 10,
                },
                "contact_email": "player@example.com",
            }),
            server_id: Some("srv-1".to_string()),
            created_at: Utc::now() - Duration::days(40),
            updated_at: Utc::now(),
        }
    }

    fn unpaid_invoice(order_id: Uuid, due_in_days: i64) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            number: 1042,
            user_id: Uuid::new_v4(),
            order_id: Some(order_id),
            subtotal_minor: 1000,
            tax_minor: 0,
            discount_minor: 0,
            total_minor: 1000,
            currency: "USD".to_string(),
            due_at: Utc::now() + Duration::days(due_in_days),
            status: "unpaid".to_string(),
            payment_method: None,
            paid_at: None,
            created_at: Utc::now() - Duration::days(1),
        }
    }

    fn no_overdue_orders(order_repository: &mut MockOrderRepository) {
        order_repository
            .expect_list_active_overdue()
            .returning(|_| Box::pin(async { Ok(vec![]) }));
    }

    #[tokio::test]
    async fn reminder_sent_once_for_crossed_threshold() {
        let order = active_order(0);
        let invoice = unpaid_invoice(order.id, 5);
        let invoice_id = invoice.id;

        let mut order_repository = MockOrderRepository::new();
        no_overdue_orders(&mut order_repository);
        order_repository.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .returning(move |_, _| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(vec![invoice]) })
            });

        let mut reminder_repository = MockInvoiceReminderRepository::new();
        reminder_repository
            .expect_reminder_exists()
            .returning(|_, _| Box::pin(async { Ok(false) }));
        reminder_repository
            .expect_record_reminder()
            .withf(move |id, threshold| *id == invoice_id && *threshold == 7)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut mailer = MockEmailNotifier::new();
        mailer
            .expect_send()
            .withf(|message| {
                message.action == EmailAction::RenewalReminder
                    && message.recipient == "player@example.com"
                    && message.params["amount"] == "10.00"
            })
            .times(1)
            .returning(|_| Box::pin(async {}));

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(reminder_repository),
            Arc::new(mailer),
            Arc::new(MockOrderSuspender::new()),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.reminders_sent, 1);
        assert_eq!(summary.reminders_by_threshold[&7], 1);
    }

    #[tokio::test]
    async fn past_due_invoice_still_gets_its_missed_reminder() {
        let order = active_order(0);
        // Due date slipped by while the job was down; 7 and 3 already went out.
        let invoice = unpaid_invoice(order.id, -1);
        let invoice_id = invoice.id;

        let mut order_repository = MockOrderRepository::new();
        no_overdue_orders(&mut order_repository);
        order_repository.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .withf(|from, to| *from < Utc::now() && *to > Utc::now())
            .returning(move |_, _| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(vec![invoice]) })
            });

        let mut reminder_repository = MockInvoiceReminderRepository::new();
        reminder_repository
            .expect_reminder_exists()
            .returning(|_, threshold| {
                let already_sent = threshold > 1;
                Box::pin(async move { Ok(already_sent) })
            });
        reminder_repository
            .expect_record_reminder()
            .withf(move |id, threshold| *id == invoice_id && *threshold == 1)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut mailer = MockEmailNotifier::new();
        mailer
            .expect_send()
            .withf(|message| message.params["days_left"] == "0")
            .times(1)
            .returning(|_| Box::pin(async {}));

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(reminder_repository),
            Arc::new(mailer),
            Arc::new(MockOrderSuspender::new()),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.reminders_sent, 1);
        assert_eq!(summary.reminders_by_threshold[&1], 1);
    }

    #[tokio::test]
    async fn reminder_not_resent_for_same_threshold() {
        let order = active_order(0);
        let invoice = unpaid_invoice(order.id, 5);

        let mut order_repository = MockOrderRepository::new();
        no_overdue_orders(&mut order_repository);

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .returning(move |_, _| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(vec![invoice]) })
            });

        let mut reminder_repository = MockInvoiceReminderRepository::new();
        reminder_repository
            .expect_reminder_exists()
            .returning(|_, _| Box::pin(async { Ok(true) }));
        reminder_repository.expect_record_reminder().times(0);

        let mut mailer = MockEmailNotifier::new();
        mailer.expect_send().times(0);

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(reminder_repository),
            Arc::new(mailer),
            Arc::new(MockOrderSuspender::new()),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.reminders_sent, 0);
        assert!(summary.reminders_by_threshold.is_empty());
    }

    #[tokio::test]
    async fn overdue_order_is_suspended_and_invoices_flagged() {
        let order = active_order(4);
        let order_id = order.id;
        let invoice = unpaid_invoice(order_id, -4);
        let invoice_id = invoice.id;

        let mut order_repository = MockOrderRepository::new();
        order_repository
            .expect_list_active_overdue()
            .returning(move |_| {
                let order = order.clone();
                Box::pin(async move { Ok(vec![order]) })
            });

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        invoice_repository
            .expect_list_unpaid_by_order()
            .withf(move |id| *id == order_id)
            .returning(move |_| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(vec![invoice]) })
            });
        invoice_repository
            .expect_update_status_by_id()
            .withf(move |id, status| *id == invoice_id && status == "overdue")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut suspender = MockOrderSuspender::new();
        suspender
            .expect_suspend_delinquent()
            .withf(move |id| *id == order_id)
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(MockInvoiceReminderRepository::new()),
            Arc::new(MockEmailNotifier::new()),
            Arc::new(suspender),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.suspended_count, 1);
        assert_eq!(summary.suspend_failed, 0);
    }

    #[tokio::test]
    async fn second_pass_with_no_new_overdue_is_a_no_op() {
        let mut order_repository = MockOrderRepository::new();
        no_overdue_orders(&mut order_repository);

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));

        let mut suspender = MockOrderSuspender::new();
        suspender.expect_suspend_delinquent().times(0);

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(MockInvoiceReminderRepository::new()),
            Arc::new(MockEmailNotifier::new()),
            Arc::new(suspender),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.suspended_count, 0);
        assert_eq!(summary.reminders_sent, 0);
    }

    #[tokio::test]
    async fn suspend_failure_does_not_abort_the_batch() {
        let first = active_order(5);
        let second = active_order(6);
        let failing_id = first.id;

        let mut order_repository = MockOrderRepository::new();
        order_repository
            .expect_list_active_overdue()
            .returning(move |_| {
                let orders = vec![first.clone(), second.clone()];
                Box::pin(async move { Ok(orders) })
            });

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_unpaid_due_within()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        invoice_repository
            .expect_list_unpaid_by_order()
            .returning(|_| Box::pin(async { Ok(vec![]) }));

        let mut suspender = MockOrderSuspender::new();
        suspender
            .expect_suspend_delinquent()
            .times(2)
            .returning(move |id| {
                let fails = id == failing_id;
                Box::pin(async move {
                    if fails {
                        anyhow::bail!("panel unreachable")
                    } else {
                        Ok(())
                    }
                })
            });

        let usecase = DailyJobUseCase::new(
            Arc::new(order_repository),
            Arc::new(invoice_repository),
            Arc::new(MockInvoiceReminderRepository::new()),
            Arc::new(MockEmailNotifier::new()),
            Arc::new(suspender),
            test_jobs(),
        );

        let summary = usecase.run().await.unwrap();
        assert_eq!(summary.overdue_count, 2);
        assert_eq!(summary.suspended_count, 1);
        assert_eq!(summary.suspend_failed, 1);
    }
}
