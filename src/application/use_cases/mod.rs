pub mod payment_lifecycle;
