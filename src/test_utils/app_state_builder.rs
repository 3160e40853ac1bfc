//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` creates an `AppState` backed by in-memory mocks and an
//! in-process reconcile lock.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    domain::entities::{payment_record::PaymentRecord, plan::Plan},
    infra::{
        config::{AppConfig, GatewayKind},
        reconcile_lock::InProcessReconcileLock,
    },
    test_utils::{
        InMemoryPaymentRecordRepo, InMemoryPlanCatalogRepo, InMemoryPlanGrantRepo,
        InMemoryUserRepo, MockPaymentGateway,
    },
    use_cases::payment_lifecycle::{PaymentLifecycleUseCases, PaymentSettings, UserProfile},
};

const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

/// Handles to the mocks behind a built `AppState`, for assertions.
pub struct TestMocks {
    pub users: Arc<InMemoryUserRepo>,
    pub plans: Arc<InMemoryPlanCatalogRepo>,
    pub records: Arc<InMemoryPaymentRecordRepo>,
    pub grants: Arc<InMemoryPlanGrantRepo>,
    pub gateway: Arc<MockPaymentGateway>,
}

pub struct TestAppStateBuilder {
    users: Vec<UserProfile>,
    plans: Vec<Plan>,
    records: Vec<PaymentRecord>,
    webhook_secret: Option<SecretString>,
    jwt_secret: SecretString,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            plans: Vec::new(),
            records: Vec::new(),
            webhook_secret: None,
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_record(mut self, record: PaymentRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Turn on notification signature verification.
    pub fn with_webhook_secret(mut self, secret: SecretString) -> Self {
        self.webhook_secret = Some(secret);
        self
    }

    /// A valid access token for `user_id`, signed with this builder's secret.
    pub fn access_token_for(&self, user_id: Uuid) -> String {
        jwt::issue(user_id, &self.jwt_secret, time::Duration::minutes(15)).unwrap()
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            cors_origin: HeaderValue::from_static("http://localhost:5173"),
            gateway: GatewayKind::Dummy,
            mercadopago_access_token: None,
            mercadopago_webhook_secret: self.webhook_secret.clone(),
            mercadopago_api_base: "https://api.mercadopago.test".parse().unwrap(),
            notification_url: None,
            payment_method: "pix".to_string(),
            payment_description: "Plan purchase".to_string(),
            gateway_timeout: Duration::from_secs(5),
            redis_url: None,
            reconcile_lock_ttl: Duration::from_secs(30),
            reconcile_lock_wait: Duration::from_secs(5),
        }
    }

    /// Build the AppState and return the mocks behind it.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let config = self.config();

        let records = Arc::new(InMemoryPaymentRecordRepo::new());
        let mocks = TestMocks {
            users: Arc::new(InMemoryUserRepo::with_users(self.users)),
            plans: Arc::new(InMemoryPlanCatalogRepo::with_plans(self.plans)),
            grants: Arc::new(InMemoryPlanGrantRepo::new(records.clone())),
            records,
            gateway: Arc::new(MockPaymentGateway::new()),
        };
        for record in self.records {
            mocks.records.insert(record);
        }

        let payment_use_cases = PaymentLifecycleUseCases::new(
            mocks.users.clone(),
            mocks.plans.clone(),
            mocks.records.clone(),
            mocks.grants.clone(),
            mocks.gateway.clone(),
            Arc::new(InProcessReconcileLock::new(config.reconcile_lock_wait)),
            PaymentSettings {
                method: config.payment_method.clone(),
                description: config.payment_description.clone(),
                notification_url: None,
            },
        );

        let app_state = AppState {
            config: Arc::new(config),
            payment_use_cases: Arc::new(payment_use_cases),
        };

        (app_state, mocks)
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }
}
