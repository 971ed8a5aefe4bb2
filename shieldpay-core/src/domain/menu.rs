//! Action menu offered to the user after each interaction

use serde::{Deserialize, Serialize};

use super::workflow::WorkflowKind;

/// Entry point a front end can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateAccount,
    Configure,
    CheckBalance,
    Withdraw,
    ConfidentialTransfer,
    Redeem,
    SendAndReceive,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::CreateAccount,
        Action::Configure,
        Action::CheckBalance,
        Action::Withdraw,
        Action::ConfidentialTransfer,
        Action::Redeem,
        Action::SendAndReceive,
    ];

    /// Stable trigger identifier (button callback data)
    pub fn trigger(&self) -> &'static str {
        match self {
            Action::CreateAccount => "create_cnf",
            Action::Configure => "configure_conf",
            Action::CheckBalance => "check_balance",
            Action::Withdraw => "withdraw_conf",
            Action::ConfidentialTransfer => "transfer_conf",
            Action::Redeem => "redeem_conf",
            Action::SendAndReceive => "send_usdc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::CreateAccount => "Create CNf Account",
            Action::Configure => "Configure Confidential",
            Action::CheckBalance => "Check Balance",
            Action::Withdraw => "Withdraw Confidential Tokens",
            Action::ConfidentialTransfer => "Confidential Transfer confUSD",
            Action::Redeem => "Redeem confUSD for USD",
            Action::SendAndReceive => "Send USDC (Get cnfUSD)",
        }
    }

    pub fn from_trigger(trigger: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.trigger() == trigger)
    }

    /// The workflow this action runs directly.
    ///
    /// `CheckBalance` runs none, and `ConfidentialTransfer` first needs a
    /// recipient from the user.
    pub fn workflow(&self) -> Option<WorkflowKind> {
        match self {
            Action::CreateAccount => Some(WorkflowKind::CreateAccount),
            Action::Configure => Some(WorkflowKind::Configure),
            Action::Withdraw => Some(WorkflowKind::Withdraw),
            Action::Redeem => Some(WorkflowKind::Redeem),
            Action::SendAndReceive => Some(WorkflowKind::SendAndReceive),
            Action::CheckBalance | Action::ConfidentialTransfer => None,
        }
    }
}

/// Ordered set of labeled triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenu {
    pub actions: Vec<Action>,
}

impl ActionMenu {
    /// The menu attached to every final message
    pub fn main() -> Self {
        Self {
            actions: Action::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_lookup() {
        for action in Action::ALL {
            assert_eq!(Action::from_trigger(action.trigger()), Some(action));
        }
        assert_eq!(Action::from_trigger("unknown"), None);
    }

    #[test]
    fn test_direct_workflows() {
        assert_eq!(Action::Redeem.workflow(), Some(WorkflowKind::Redeem));
        assert_eq!(Action::ConfidentialTransfer.workflow(), None);
        assert_eq!(Action::CheckBalance.workflow(), None);
    }
}
