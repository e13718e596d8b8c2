//! Detection of terminal conditions on the custom resource.
//!
//! Negative-path scenarios expect the controller to give up.  The detector
//! watches the resource's conditions and moves from `Waiting` to
//! `TerminalSeen` exactly once.  A terminal condition whose message does not
//! carry the expected text is a hard failure, not something to wait out.

use std::future::Future;

use tracing::info;

use crate::crd::table::Table;
use crate::error::{Error, Result};
use crate::observed::{ConditionRecord, ConditionStatus};
use crate::poller::{poll_until, PollPolicy};

/// Condition type the ACK runtime uses for unrecoverable errors.
pub const ACK_TERMINAL: &str = "ACK.Terminal";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectorState {
    Waiting,
    /// Absorbing.
    TerminalSeen { message: String },
}

#[derive(Clone, Debug)]
pub struct TerminalErrorDetector {
    condition_type: String,
    expected_message: String,
    state: DetectorState,
}

impl TerminalErrorDetector {
    pub fn new(condition_type: impl Into<String>, expected_message: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.into(),
            expected_message: expected_message.into(),
            state: DetectorState::Waiting,
        }
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Feed one batch of conditions.  Only the first True condition of the
    /// designated type is considered.
    pub fn observe(&mut self, conditions: &[ConditionRecord]) -> Result<&DetectorState> {
        if matches!(self.state, DetectorState::TerminalSeen { .. }) {
            return Ok(&self.state);
        }

        let Some(terminal) = conditions
            .iter()
            .find(|c| c.condition_type == self.condition_type && c.status == ConditionStatus::True)
        else {
            return Ok(&self.state);
        };

        let message = terminal.message.as_deref().unwrap_or_default();
        if !message.contains(&self.expected_message) {
            return Err(Error::UnexpectedTerminalReason {
                condition_type: self.condition_type.clone(),
                expected: self.expected_message.clone(),
                actual: message.to_string(),
            });
        }

        self.state = DetectorState::TerminalSeen {
            message: message.to_string(),
        };
        Ok(&self.state)
    }

    /// Poll `fetch` until the terminal condition shows up.  Returns the
    /// condition message.
    pub async fn await_terminal<F, Fut>(&mut self, policy: &PollPolicy, fetch: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Table>>>,
    {
        let description = format!("condition {} is True", self.condition_type);
        let outcome = poll_until(policy, &description, fetch, |observed| {
            let records = observed.map(conditions_of).unwrap_or_default();
            let state = self.observe(&records)?;
            Ok(matches!(state, DetectorState::TerminalSeen { .. }))
        })
        .await?;

        match &self.state {
            DetectorState::TerminalSeen { message } => {
                info!(condition = %self.condition_type, %message, "terminal condition observed");
                Ok(message.clone())
            }
            DetectorState::Waiting => Err(Error::TerminalConditionNeverAppeared {
                condition_type: self.condition_type.clone(),
                elapsed: outcome.elapsed,
                last_observed: format!(
                    "{:?}",
                    outcome.last_observed.as_ref().map(conditions_of)
                ),
            }),
        }
    }
}

/// Conditions from the resource status; empty while the controller has not
/// written a status yet.
pub fn conditions_of(table: &Table) -> Vec<ConditionRecord> {
    table
        .status
        .as_ref()
        .map(|s| s.conditions.iter().map(ConditionRecord::from).collect())
        .unwrap_or_default()
}
