use crate::{
    adapters::http::app_state::AppState,
    application::ports::{payment_gateway::PaymentGatewayPort, reconcile_lock::ReconcileLockPort},
    infra::{
        InfraError,
        config::{AppConfig, GatewayKind},
        dummy_payment_client::DummyPaymentClient,
        mercadopago_client::MercadoPagoClient,
        postgres_persistence,
        reconcile_lock::{InProcessReconcileLock, RedisReconcileLock},
    },
    use_cases::payment_lifecycle::{
        PaymentLifecycleUseCases, PaymentRecordRepo, PaymentSettings, PlanCatalogRepo,
        PlanGrantRepo, UserRepo,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let gateway: Arc<dyn PaymentGatewayPort> = match config.gateway {
        GatewayKind::MercadoPago => {
            let access_token = config.mercadopago_access_token.clone().ok_or_else(|| {
                InfraError::Config("MERCADOPAGO_ACCESS_TOKEN must be set".into())
            })?;
            Arc::new(MercadoPagoClient::new(
                access_token,
                config.mercadopago_api_base.clone(),
                config.gateway_timeout,
            )?)
        }
        GatewayKind::Dummy => {
            tracing::warn!("Using dummy payment gateway, no real payments will be created");
            Arc::new(DummyPaymentClient::new())
        }
    };

    let lock: Arc<dyn ReconcileLockPort> = match &config.redis_url {
        Some(redis_url) => Arc::new(
            RedisReconcileLock::new(
                redis_url,
                config.reconcile_lock_ttl,
                config.reconcile_lock_wait,
            )
            .await?,
        ),
        None => {
            tracing::info!("REDIS_URL not set, reconcile locks are per-process");
            Arc::new(InProcessReconcileLock::new(config.reconcile_lock_wait))
        }
    };

    if config.mercadopago_webhook_secret.is_none() {
        tracing::warn!("MERCADOPAGO_WEBHOOK_SECRET not set, notification signatures are not verified");
    }

    let settings = PaymentSettings {
        method: config.payment_method.clone(),
        description: config.payment_description.clone(),
        notification_url: config.notification_url.as_ref().map(|u| u.to_string()),
    };

    let payment_use_cases = PaymentLifecycleUseCases::new(
        postgres_arc.clone() as Arc<dyn UserRepo>,
        postgres_arc.clone() as Arc<dyn PlanCatalogRepo>,
        postgres_arc.clone() as Arc<dyn PaymentRecordRepo>,
        postgres_arc.clone() as Arc<dyn PlanGrantRepo>,
        gateway,
        lock,
        settings,
    );

    Ok(AppState {
        config: Arc::new(config),
        payment_use_cases: Arc::new(payment_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subscription_hub=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let json_layer = match File::create("app.log") {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(Arc::new(file))
                .with_current_span(true)
                .with_span_list(true),
        ),
        Err(e) => {
            eprintln!("cannot create app.log, JSON logs disabled: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
