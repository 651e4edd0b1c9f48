//! Return status state machine.

use serde::{Deserialize, Serialize};

/// The status of a return request in its lifecycle.
///
/// Status transitions:
/// ```text
/// pending ──► approved ──► shipped ──► received ──► processed ──► refunded
///    │            │
///    └────────────┴──► rejected
/// ```
/// `refunded` is additionally reachable from any non-terminal status via the
/// refund workflow, which must complete the external refund first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    /// Requested by the customer, awaiting admin review.
    #[default]
    Pending,

    /// Approved; customer may ship the items back.
    Approved,

    /// Customer handed the items to a carrier.
    Shipped,

    /// Items arrived back at the studio.
    Received,

    /// Items inspected and accepted.
    Processed,

    /// Money returned to the customer (terminal state).
    Refunded,

    /// Request declined (terminal state).
    Rejected,
}

impl ReturnStatus {
    /// Single transition table governing every return status write.
    pub fn can_transition_to(&self, next: ReturnStatus) -> bool {
        use ReturnStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) => true,
            (Approved, Shipped) | (Approved, Rejected) => true,
            (Shipped, Received) => true,
            (Received, Processed) => true,
            // The refund workflow may close out a return from any
            // non-terminal status once the gateway refund succeeds.
            (_, Refunded) => true,
            _ => false,
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReturnStatus::Refunded | ReturnStatus::Rejected)
    }

    /// Returns the status name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Shipped => "shipped",
            ReturnStatus::Received => "received",
            ReturnStatus::Processed => "processed",
            ReturnStatus::Refunded => "refunded",
            ReturnStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReturnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReturnStatus::Pending),
            "approved" => Ok(ReturnStatus::Approved),
            "shipped" => Ok(ReturnStatus::Shipped),
            "received" => Ok(ReturnStatus::Received),
            "processed" => Ok(ReturnStatus::Processed),
            "refunded" => Ok(ReturnStatus::Refunded),
            "rejected" => Ok(ReturnStatus::Rejected),
            other => Err(format!("unknown return status: {other}")),
        }
    }
}
