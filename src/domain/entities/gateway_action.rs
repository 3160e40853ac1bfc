/// Classification of the `action` tag carried by a gateway notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayAction {
    /// The gateway generated a redeemable artifact. No funds moved yet.
    PaymentCreated,
    /// The payment changed on the gateway side and must be reconciled.
    PaymentUpdated,
    /// Anything we do not act on.
    Other(String),
}

impl GatewayAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "payment.created" => GatewayAction::PaymentCreated,
            "payment.updated" => GatewayAction::PaymentUpdated,
            other => GatewayAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayAction::PaymentCreated => "payment.created",
            GatewayAction::PaymentUpdated => "payment.updated",
            GatewayAction::Other(s) => s,
        }
    }
}
