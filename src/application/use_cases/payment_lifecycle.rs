use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        payment_gateway::{CreateGatewayPayment, IdempotencyToken, PaymentGatewayPort},
        reconcile_lock::ReconcileLockPort,
    },
    domain::entities::{
        gateway_action::GatewayAction, payment_record::PaymentRecord, plan::Plan,
    },
};

const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

// ============================================================================
// Repository Traits
// ============================================================================

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_profile_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;
}

#[async_trait]
pub trait PlanCatalogRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
}

#[async_trait]
pub trait PlanGrantRepo: Send + Sync {
    /// Grant the record's plan to its user and move the record `pending -> complete`,
    /// as one atomic step that excludes concurrent callers for the same record.
    /// Granting again replaces the user's previous grant.
    ///
    /// Returns false, granting nothing, when the record is not pending.
    /// Returns `AppError::PlanUnavailable` if the plan no longer exists.
    async fn grant_and_complete(&self, gateway_payment_id: &str) -> AppResult<bool>;
}

#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub gateway_payment_id: String,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(PaymentRecord),
    /// A record with this gateway id already existed and was left untouched.
    Existing(PaymentRecord),
}

#[async_trait]
pub trait PaymentRecordRepo: Send + Sync {
    /// Insert a pending record. Never overwrites an existing record with the same gateway id.
    async fn create_pending(&self, input: &NewPaymentRecord) -> AppResult<InsertOutcome>;

    async fn get_by_gateway_id(&self, gateway_payment_id: &str) -> AppResult<Option<PaymentRecord>>;
}

// ============================================================================
// Use Case Types
// ============================================================================

/// Static parameters of the gateway request
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub method: String,
    pub description: String,
    pub notification_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCreated {
    pub gateway_payment_id: String,
    pub redemption_code: Option<String>,
    pub redemption_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub action: GatewayAction,
    pub gateway_payment_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// Creation-phase event, nothing to reconcile
    Acknowledged,
    /// Action we do not act on
    Ignored,
    /// Plan granted and record moved to complete by this call
    Processed,
    /// Record was already complete, nothing done
    AlreadyProcessed,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Acknowledged => "acknowledged",
            NotificationOutcome::Ignored => "ignored",
            NotificationOutcome::Processed => "processed",
            NotificationOutcome::AlreadyProcessed => "already_processed",
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentLifecycleUseCases {
    user_repo: Arc<dyn UserRepo>,
    plan_repo: Arc<dyn PlanCatalogRepo>,
    record_repo: Arc<dyn PaymentRecordRepo>,
    grant_repo: Arc<dyn PlanGrantRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    lock: Arc<dyn ReconcileLockPort>,
    settings: PaymentSettings,
}

impl PaymentLifecycleUseCases {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        plan_repo: Arc<dyn PlanCatalogRepo>,
        record_repo: Arc<dyn PaymentRecordRepo>,
        grant_repo: Arc<dyn PlanGrantRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        lock: Arc<dyn ReconcileLockPort>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            user_repo,
            plan_repo,
            record_repo,
            grant_repo,
            gateway,
            lock,
            settings,
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    pub async fn create_payment(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        idempotency_key: Option<&str>,
    ) -> AppResult<PaymentCreated> {
        let idempotency_token = match idempotency_key {
            Some(key) => IdempotencyToken::derived(user_id, validate_idempotency_key(key)?),
            None => IdempotencyToken::fresh(),
        };

        let user = self
            .user_repo
            .get_profile_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        let request = CreateGatewayPayment {
            amount_cents: plan.price_cents,
            currency: plan.currency.clone(),
            method: self.settings.method.clone(),
            payer_email: user.email,
            description: self.settings.description.clone(),
            notification_url: self.settings.notification_url.clone(),
            idempotency_token,
        };

        let payment = self.gateway.create_payment(&request).await.map_err(|e| {
            warn!(
                gateway = self.gateway.name(),
                user_id = %user_id,
                plan_id = %plan_id,
                error = %e,
                "Gateway payment creation failed"
            );
            match e {
                AppError::Gateway(_) => e,
                other => AppError::Gateway(other.to_string()),
            }
        })?;

        if payment.redemption.is_empty() {
            warn!(
                gateway_payment_id = %payment.id,
                "Gateway returned no redemption data"
            );
        }

        let input = NewPaymentRecord {
            gateway_payment_id: payment.id.to_string(),
            user_id,
            plan_id,
            amount_cents: plan.price_cents,
            currency: plan.currency.clone(),
        };

        let record = match self.record_repo.create_pending(&input).await {
            Ok(InsertOutcome::Created(record)) => record,
            Ok(InsertOutcome::Existing(record)) if record.belongs_to(user_id, plan_id) => {
                info!(
                    gateway_payment_id = %record.gateway_payment_id,
                    status = %record.status,
                    "Replayed payment creation, reusing existing record"
                );
                record
            }
            Ok(InsertOutcome::Existing(record)) => {
                error!(
                    gateway_payment_id = %record.gateway_payment_id,
                    existing_user_id = %record.user_id,
                    user_id = %user_id,
                    "Gateway returned a payment id already recorded for another purchase"
                );
                return Err(AppError::Conflict(
                    "Payment already recorded for a different purchase".into(),
                ));
            }
            Err(e) => {
                // The gateway payment exists but we have no record of it. Its notifications
                // will resolve to RecordNotFound.
                error!(
                    gateway_payment_id = %payment.id,
                    user_id = %user_id,
                    plan_id = %plan_id,
                    error = %e,
                    "Orphaned gateway payment: failed to persist pending record"
                );
                return Err(e);
            }
        };

        info!(
            gateway_payment_id = %record.gateway_payment_id,
            user_id = %user_id,
            plan_id = %plan_id,
            amount_cents = record.amount_cents,
            "Payment created"
        );

        Ok(PaymentCreated {
            gateway_payment_id: record.gateway_payment_id,
            redemption_code: payment.redemption.code,
            redemption_url: payment.redemption.url,
        })
    }

    // ========================================================================
    // Notification Reconciliation
    // ========================================================================

    pub async fn handle_notification(
        &self,
        notification: &PaymentNotification,
    ) -> AppResult<NotificationOutcome> {
        match &notification.action {
            GatewayAction::PaymentCreated => {
                // The record may not be committed yet; never look it up here.
                debug!(
                    gateway_payment_id = %notification.gateway_payment_id,
                    "Creation-phase notification acknowledged"
                );
                return Ok(NotificationOutcome::Acknowledged);
            }
            GatewayAction::Other(action) => {
                debug!(
                    action = %action,
                    gateway_payment_id = %notification.gateway_payment_id,
                    "Unhandled notification action"
                );
                return Ok(NotificationOutcome::Ignored);
            }
            GatewayAction::PaymentUpdated => {}
        }

        let gateway_payment_id = notification.gateway_payment_id.trim();
        if gateway_payment_id.is_empty() {
            return Err(AppError::InvalidInput("Missing gateway payment id".into()));
        }

        let guard = self.lock.acquire(gateway_payment_id).await?;
        let result = self.reconcile(gateway_payment_id).await;
        guard.release().await;

        result
    }

    /// Runs with the reconcile lock for `gateway_payment_id` held.
    async fn reconcile(&self, gateway_payment_id: &str) -> AppResult<NotificationOutcome> {
        let Some(record) = self.record_repo.get_by_gateway_id(gateway_payment_id).await? else {
            warn!(
                gateway_payment_id,
                retryable = true,
                "Notification for unknown payment record"
            );
            return Err(AppError::RecordNotFound);
        };

        if record.is_complete() {
            info!(
                gateway_payment_id,
                "Duplicate notification for completed payment, skipping"
            );
            return Ok(NotificationOutcome::AlreadyProcessed);
        }

        // The lock only keeps duplicates off the store. The store's atomic step is what
        // decides which delivery grants.
        let transitioned = self
            .grant_repo
            .grant_and_complete(gateway_payment_id)
            .await
            .map_err(|e| {
                error!(
                    gateway_payment_id,
                    user_id = %record.user_id,
                    plan_id = %record.plan_id,
                    error = %e,
                    "Plan grant failed, payment left pending"
                );
                e
            })?;

        if !transitioned {
            warn!(
                gateway_payment_id,
                "Payment was completed by a concurrent delivery, nothing granted"
            );
            return Ok(NotificationOutcome::AlreadyProcessed);
        }

        info!(
            gateway_payment_id,
            user_id = %record.user_id,
            plan_id = %record.plan_id,
            "Payment complete, plan granted"
        );
        Ok(NotificationOutcome::Processed)
    }
}

fn validate_idempotency_key(key: &str) -> AppResult<&str> {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::InvalidInput(format!(
            "Idempotency key must be 1-{} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok(key)
}
