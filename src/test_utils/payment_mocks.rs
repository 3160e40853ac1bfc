//! In-memory mock implementations for the payment lifecycle ports.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreateGatewayPayment, GatewayPayment, GatewayPaymentId, PaymentGatewayPort, Redemption,
    },
    domain::entities::{payment_record::PaymentRecord, payment_status::PaymentStatus, plan::Plan},
    use_cases::payment_lifecycle::{
        InsertOutcome, NewPaymentRecord, PaymentRecordRepo, PlanCatalogRepo, PlanGrantRepo,
        UserProfile, UserRepo,
    },
};

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.insert(user);
        }
        repo
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<UserProfile> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_profile_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.get(id))
    }
}

// ============================================================================
// InMemoryPlanCatalogRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanCatalogRepo {
    pub plans: Mutex<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanCatalogRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<Plan>) -> Self {
        let repo = Self::new();
        for plan in plans {
            repo.insert(plan);
        }
        repo
    }

    pub fn insert(&self, plan: Plan) {
        self.plans.lock().unwrap().insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanCatalogRepo for InMemoryPlanCatalogRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }
}

// ============================================================================
// InMemoryPlanGrantRepo
// ============================================================================

/// Grants against an `InMemoryPaymentRecordRepo`. `claim` plays the row lock: the
/// pending check, the grant and the completion happen while it is held, and a
/// failure anywhere records nothing.
pub struct InMemoryPlanGrantRepo {
    records: Arc<InMemoryPaymentRecordRepo>,
    claim: tokio::sync::Mutex<()>,
    grants: Mutex<Vec<(Uuid, Uuid)>>,
    fail_next: Mutex<Option<AppError>>,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryPlanGrantRepo {
    pub fn new(records: Arc<InMemoryPaymentRecordRepo>) -> Self {
        Self {
            records,
            claim: tokio::sync::Mutex::new(()),
            grants: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            delay: Mutex::new(None),
        }
    }

    /// Successful grants in order, as (user_id, plan_id).
    pub fn grants(&self) -> Vec<(Uuid, Uuid)> {
        self.grants.lock().unwrap().clone()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().unwrap().len()
    }

    /// The next grant fails with `err`.
    pub fn fail_next_with(&self, err: AppError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Every grant sleeps this long after claiming the record, to widen race windows.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl PlanGrantRepo for InMemoryPlanGrantRepo {
    async fn grant_and_complete(&self, gateway_payment_id: &str) -> AppResult<bool> {
        let _claim = self.claim.lock().await;

        let record = match self.records.get(gateway_payment_id) {
            Some(record) if !record.is_complete() => record,
            _ => return Ok(false),
        };

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }

        if !self.records.complete_pending(gateway_payment_id)? {
            return Ok(false);
        }

        self.grants
            .lock()
            .unwrap()
            .push((record.user_id, record.plan_id));
        Ok(true)
    }
}

// ============================================================================
// InMemoryPaymentRecordRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRecordRepo {
    records: Mutex<HashMap<String, PaymentRecord>>,
    lookups: AtomicUsize,
    completions: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_next_completion: AtomicBool,
}

impl InMemoryPaymentRecordRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: PaymentRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.gateway_payment_id.clone(), record);
    }

    pub fn get(&self, gateway_payment_id: &str) -> Option<PaymentRecord> {
        self.records.lock().unwrap().get(gateway_payment_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Number of `get_by_gateway_id` calls.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of records moved to complete.
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_completion(&self) {
        self.fail_next_completion.store(true, Ordering::SeqCst);
    }

    /// Conditional `pending -> complete`, the write half of `grant_and_complete`.
    fn complete_pending(&self, gateway_payment_id: &str) -> AppResult<bool> {
        if self.fail_next_completion.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database("update failed".into()));
        }

        let mut records = self.records.lock().unwrap();
        match records.get_mut(gateway_payment_id) {
            Some(record) if record.status.can_transition_to(PaymentStatus::Complete) => {
                record.status = PaymentStatus::Complete;
                record.updated_at = Some(now());
                self.completions.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentRecordRepo for InMemoryPaymentRecordRepo {
    async fn create_pending(&self, input: &NewPaymentRecord) -> AppResult<InsertOutcome> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert failed".into()));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&input.gateway_payment_id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let timestamp = now();
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            gateway_payment_id: input.gateway_payment_id.clone(),
            user_id: input.user_id,
            plan_id: input.plan_id,
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: PaymentStatus::Pending,
            created_at: Some(timestamp),
            updated_at: Some(timestamp),
        };
        records.insert(record.gateway_payment_id.clone(), record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn get_by_gateway_id(&self, gateway_payment_id: &str) -> AppResult<Option<PaymentRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(gateway_payment_id))
    }
}

// ============================================================================
// MockPaymentGateway
// ============================================================================

/// Records every call. Like a real gateway, a repeated idempotency token returns
/// the payment created for it the first time.
#[derive(Default)]
pub struct MockPaymentGateway {
    calls: Mutex<Vec<CreateGatewayPayment>>,
    by_token: Mutex<HashMap<String, GatewayPayment>>,
    fail_next: Mutex<Option<String>>,
    next_id: Mutex<Option<String>>,
    counter: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CreateGatewayPayment> {
        self.calls.lock().unwrap().clone()
    }

    /// The next call fails with a gateway error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    /// The next newly created payment gets this id.
    pub fn set_next_id(&self, id: &str) {
        *self.next_id.lock().unwrap() = Some(id.to_string());
    }
}

#[async_trait]
impl PaymentGatewayPort for MockPaymentGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment(&self, request: &CreateGatewayPayment) -> AppResult<GatewayPayment> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(AppError::Gateway(message));
        }

        let mut by_token = self.by_token.lock().unwrap();
        let payment = by_token
            .entry(request.idempotency_token.as_str().to_string())
            .or_insert_with(|| {
                let id = self.next_id.lock().unwrap().take().unwrap_or_else(|| {
                    format!("mock_pay_{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
                });
                GatewayPayment {
                    redemption: Redemption {
                        code: Some(format!("PIX-{}", id)),
                        url: Some(format!("https://gateway.test/payments/{}", id)),
                    },
                    id: GatewayPaymentId::new(id),
                }
            })
            .clone();

        Ok(payment)
    }
}
