//! Shipment status state machine.

use serde::{Deserialize, Serialize};

/// The status of a shipment attempt.
///
/// Status transitions:
/// ```text
/// pending ──► created ──► purchased
///    │           │
///    └───────────┴──► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    /// Row persisted before the broker call, the durable breadcrumb.
    #[default]
    Pending,

    /// Broker returned a shipment quote with rates.
    Created,

    /// Label purchased; tracking number and label URL recorded (terminal).
    Purchased,

    /// A broker call failed; `error_message` holds the reason (terminal).
    Failed,
}

impl ShipmentStatus {
    /// Single transition table governing shipment status writes.
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Pending, Created) | (Created, Purchased) | (Pending, Failed) | (Created, Failed)
        )
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Purchased | ShipmentStatus::Failed)
    }

    /// Returns the status name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Created => "created",
            ShipmentStatus::Purchased => "purchased",
            ShipmentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShipmentStatus::Pending),
            "created" => Ok(ShipmentStatus::Created),
            "purchased" => Ok(ShipmentStatus::Purchased),
            "failed" => Ok(ShipmentStatus::Failed),
            other => Err(format!("unknown shipment status: {other}")),
        }
    }
}
