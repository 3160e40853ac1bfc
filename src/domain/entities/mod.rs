pub mod gateway_action;
pub mod payment_record;
pub mod payment_status;
pub mod plan;
