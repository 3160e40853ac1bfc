pub mod payment_gateway;
pub mod reconcile_lock;
