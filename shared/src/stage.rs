//! Command Lifecycle Stages
//!
//! Every operator command moves through a fixed forward-only sequence of
//! acknowledgement stages. There is no failure stage: a command whose
//! timers never fire simply stays where it is.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of an issued command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStage {
    /// Command issued, awaiting acknowledgement
    Sent,
    /// Command acknowledged by the simulated transport
    Acknowledged,
    /// Command executed, terminal
    Executed,
}

/// Result of a stage transition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTransition {
    /// Transition was valid and the stage moved forward
    Advanced(CommandStage),
    /// Transition would regress or repeat the stage; nothing changed
    Ignored { from: CommandStage, to: CommandStage },
}

impl CommandStage {
    /// The stage a fresh command starts in
    pub fn initial() -> Self {
        CommandStage::Sent
    }

    /// Whether this stage is the end of the lifecycle
    pub fn is_terminal(self) -> bool {
        self == CommandStage::Executed
    }

    /// The next stage in the sequence, if any
    pub fn next(self) -> Option<CommandStage> {
        match self {
            CommandStage::Sent => Some(CommandStage::Acknowledged),
            CommandStage::Acknowledged => Some(CommandStage::Executed),
            CommandStage::Executed => None,
        }
    }

    /// Attempt to advance to a target stage. Stages only move forward;
    /// a regression or a repeat is ignored rather than an error.
    pub fn advance_to(self, target: CommandStage) -> StageTransition {
        if target > self {
            StageTransition::Advanced(target)
        } else {
            StageTransition::Ignored {
                from: self,
                to: target,
            }
        }
    }

    /// Short display label, as shown on the command list
    pub fn label(self) -> &'static str {
        match self {
            CommandStage::Sent => "sent",
            CommandStage::Acknowledged => "acknowledged",
            CommandStage::Executed => "executed",
        }
    }
}

/// Check if moving from one stage to another is a forward transition
pub fn is_valid_transition(from: CommandStage, to: CommandStage) -> bool {
    to > from
}

#[cfg(test)]
mod tests {
    use super::*;
    use CommandStage::*;

    #[test]
    fn test_initial_stage() {
        assert_eq!(CommandStage::initial(), Sent);
        assert!(!Sent.is_terminal());
        assert!(Executed.is_terminal());
    }

    #[test]
    fn test_sequence_order() {
        assert_eq!(Sent.next(), Some(Acknowledged));
        assert_eq!(Acknowledged.next(), Some(Executed));
        assert_eq!(Executed.next(), None);
    }

    #[test]
    fn test_forward_transitions_only() {
        assert!(is_valid_transition(Sent, Acknowledged));
        assert!(is_valid_transition(Sent, Executed));
        assert!(is_valid_transition(Acknowledged, Executed));

        assert!(!is_valid_transition(Acknowledged, Sent));
        assert!(!is_valid_transition(Executed, Acknowledged));
        assert!(!is_valid_transition(Executed, Sent));
        assert!(!is_valid_transition(Sent, Sent));
    }

    #[test]
    fn test_advance_to_never_regresses() {
        assert_eq!(
            Sent.advance_to(Acknowledged),
            StageTransition::Advanced(Acknowledged)
        );
        assert_eq!(
            Executed.advance_to(Acknowledged),
            StageTransition::Ignored {
                from: Executed,
                to: Acknowledged
            }
        );
        assert_eq!(
            Acknowledged.advance_to(Acknowledged),
            StageTransition::Ignored {
                from: Acknowledged,
                to: Acknowledged
            }
        );
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        let json = serde_json::to_string(&Acknowledged).unwrap();
        assert_eq!(json, "\"acknowledged\"");
    }
}
