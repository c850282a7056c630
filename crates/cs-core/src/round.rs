//! The per-round state machine.
//!
//! A round is created when a prompt is drawn. Participants fill in their
//! submissions and lock them. Once every expected participant is locked the
//! round is `AllLocked` and waits for the session to evaluate it, after
//! which it is `Resolved` and closed for edits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attribute::{Attribute, AttributeSet, UNSET};
use crate::error::{SenseError, SenseResult};
use crate::prompt::Prompt;

/// Opaque participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A named player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
}

impl Participant {
    /// Create a participant whose id equals its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ParticipantId::new(name.clone()),
            name,
        }
    }

    /// Create a participant with a separate id.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
        }
    }
}

/// One participant's chosen values. Missing attributes are unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    values: BTreeMap<Attribute, String>,
}

impl Submission {
    /// An empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// The value for an attribute, or [`UNSET`].
    pub fn get(&self, attribute: Attribute) -> &str {
        self.values.get(&attribute).map_or(UNSET, String::as_str)
    }

    /// Set a value after checking it against the attribute's domain.
    /// Setting [`UNSET`] clears the attribute.
    pub fn set(&mut self, attribute: Attribute, value: &str) -> SenseResult<()> {
        if !attribute.is_valid_value(value) {
            return Err(SenseError::InvalidValue {
                attribute,
                value: value.to_string(),
            });
        }
        if value.is_empty() {
            self.values.remove(&attribute);
        } else {
            self.values.insert(attribute, value.to_string());
        }
        Ok(())
    }

    /// Builder form of [`Submission::set`].
    pub fn with(mut self, attribute: Attribute, value: &str) -> SenseResult<Self> {
        self.set(attribute, value)?;
        Ok(self)
    }

    /// Reset every attribute to unset.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Set attributes and their values.
    pub fn non_empty_values(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.values.iter().map(|(a, v)| (*a, v.as_str()))
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lifecycle of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Nobody has locked yet.
    Open,
    /// Some, but not all, expected participants are locked.
    LockedPending,
    /// Everyone is locked; evaluation is due.
    AllLocked,
    /// Evaluated and scored; closed for edits.
    Resolved,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::LockedPending => "waiting for locks",
            Self::AllLocked => "fully locked",
            Self::Resolved => "resolved",
        })
    }
}

/// What a lock toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockChange {
    /// The participant is now locked.
    Locked,
    /// The participant is now unlocked.
    Unlocked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Slot {
    submission: Submission,
    locked: bool,
}

/// A single round.
#[derive(Debug, Clone)]
pub struct Round {
    number: u32,
    prompt: Option<Prompt>,
    relevant: AttributeSet,
    order: Vec<ParticipantId>,
    slots: BTreeMap<ParticipantId, Slot>,
    status: RoundStatus,
}

impl Round {
    /// Open a new round for the given participants.
    pub fn new(
        number: u32,
        prompt: Option<Prompt>,
        relevant: AttributeSet,
        participants: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        let order: Vec<ParticipantId> = participants.into_iter().collect();
        let slots = order.iter().map(|id| (id.clone(), Slot::default())).collect();
        Self {
            number,
            prompt,
            relevant,
            order,
            slots,
            status: RoundStatus::Open,
        }
    }

    /// 1-based round number within the session.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The prompt, if the mode draws one.
    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// Attributes compared this round.
    pub fn relevant(&self) -> &AttributeSet {
        &self.relevant
    }

    /// Current status.
    pub fn status(&self) -> RoundStatus {
        self.status
    }

    /// Expected participants in roster order.
    pub fn expected(&self) -> &[ParticipantId] {
        &self.order
    }

    /// A participant's submission.
    pub fn submission(&self, id: &ParticipantId) -> SenseResult<&Submission> {
        Ok(&self.slot(id)?.submission)
    }

    /// All submissions in roster order.
    pub fn submissions(&self) -> Vec<(ParticipantId, &Submission)> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|s| (id.clone(), &s.submission)))
            .collect()
    }

    /// Whether a participant is locked.
    pub fn is_locked(&self, id: &ParticipantId) -> SenseResult<bool> {
        Ok(self.slot(id)?.locked)
    }

    /// How many participants are locked.
    pub fn locked_count(&self) -> usize {
        self.slots.values().filter(|s| s.locked).count()
    }

    /// Whether the round still accepts edits from someone.
    pub fn is_collecting(&self) -> bool {
        matches!(self.status, RoundStatus::Open | RoundStatus::LockedPending)
    }

    /// Set one attribute of a participant's submission.
    pub fn submit(
        &mut self,
        id: &ParticipantId,
        attribute: Attribute,
        value: &str,
    ) -> SenseResult<()> {
        self.ensure_editable(id, "submit")?;
        self.slot_mut(id)?.submission.set(attribute, value)?;
        debug!(round = self.number, participant = %id, %attribute, value, "submission updated");
        Ok(())
    }

    /// Replace a participant's whole submission.
    pub fn replace_submission(
        &mut self,
        id: &ParticipantId,
        submission: Submission,
    ) -> SenseResult<()> {
        self.ensure_editable(id, "submit")?;
        self.slot_mut(id)?.submission = submission;
        Ok(())
    }

    /// Reset a participant's submission to unset.
    pub fn clear_submission(&mut self, id: &ParticipantId) -> SenseResult<()> {
        self.ensure_editable(id, "clear")?;
        self.slot_mut(id)?.submission.clear();
        Ok(())
    }

    /// Toggle a participant's lock. Unset values may be locked in.
    pub fn toggle_lock(&mut self, id: &ParticipantId) -> SenseResult<LockChange> {
        if !self.is_collecting() {
            return Err(self.state_error("lock"));
        }
        let slot = self.slot_mut(id)?;
        slot.locked = !slot.locked;
        let change = if slot.locked {
            LockChange::Locked
        } else {
            LockChange::Unlocked
        };
        self.update_status();
        debug!(
            round = self.number,
            participant = %id,
            ?change,
            status = %self.status,
            "lock toggled"
        );
        Ok(change)
    }

    /// Lock a participant if not yet locked.
    pub fn lock(&mut self, id: &ParticipantId) -> SenseResult<()> {
        if !self.is_locked(id)? {
            self.toggle_lock(id)?;
        }
        Ok(())
    }

    /// Force-lock everyone still unlocked. Returns who was locked.
    pub fn lock_all_unlocked(&mut self) -> Vec<ParticipantId> {
        if !self.is_collecting() {
            return Vec::new();
        }
        let mut forced = Vec::new();
        for id in &self.order {
            if let Some(slot) = self.slots.get_mut(id) {
                if !slot.locked {
                    slot.locked = true;
                    forced.push(id.clone());
                }
            }
        }
        self.update_status();
        forced
    }

    /// Close the round after evaluation.
    pub fn mark_resolved(&mut self) -> SenseResult<()> {
        if self.status != RoundStatus::AllLocked {
            return Err(self.state_error("resolve"));
        }
        self.status = RoundStatus::Resolved;
        Ok(())
    }

    /// Unlock everyone and clear submissions. Only from `Open` or `Resolved`.
    pub fn reset(&mut self) -> SenseResult<()> {
        if !matches!(self.status, RoundStatus::Open | RoundStatus::Resolved) {
            return Err(self.state_error("reset"));
        }
        for slot in self.slots.values_mut() {
            *slot = Slot::default();
        }
        self.status = RoundStatus::Open;
        Ok(())
    }

    fn ensure_editable(&self, id: &ParticipantId, operation: &'static str) -> SenseResult<()> {
        if !self.is_collecting() || self.slot(id)?.locked {
            return Err(self.state_error(operation));
        }
        Ok(())
    }

    fn update_status(&mut self) {
        let locked = self.locked_count();
        self.status = if !self.order.is_empty() && locked == self.order.len() {
            RoundStatus::AllLocked
        } else if locked > 0 {
            RoundStatus::LockedPending
        } else {
            RoundStatus::Open
        };
    }

    fn state_error(&self, operation: &'static str) -> SenseError {
        SenseError::InvalidRoundState {
            operation,
            status: self.status,
        }
    }

    fn slot(&self, id: &ParticipantId) -> SenseResult<&Slot> {
        self.slots
            .get(id)
            .ok_or_else(|| SenseError::UnknownParticipant(id.to_string()))
    }

    fn slot_mut(&mut self, id: &ParticipantId) -> SenseResult<&mut Slot> {
        self.slots
            .get_mut(id)
            .ok_or_else(|| SenseError::UnknownParticipant(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ParticipantId, ParticipantId) {
        (ParticipantId::new("p1"), ParticipantId::new("p2"))
    }

    fn round() -> Round {
        let (a, b) = ids();
        Round::new(1, None, AttributeSet::all(), [a, b])
    }

    #[test]
    fn submission_rejects_foreign_values() {
        let mut s = Submission::new();
        assert!(s.set(Attribute::Color, "Red").is_ok());
        assert_eq!(
            s.set(Attribute::Color, "Sweet"),
            Err(SenseError::InvalidValue {
                attribute: Attribute::Color,
                value: "Sweet".into()
            })
        );
        assert_eq!(s.get(Attribute::Color), "Red");
        s.set(Attribute::Color, UNSET).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn lock_progression() {
        let (a, b) = ids();
        let mut r = round();
        assert_eq!(r.status(), RoundStatus::Open);
        assert_eq!(r.toggle_lock(&a).unwrap(), LockChange::Locked);
        assert_eq!(r.status(), RoundStatus::LockedPending);
        assert_eq!(r.toggle_lock(&a).unwrap(), LockChange::Unlocked);
        assert_eq!(r.status(), RoundStatus::Open);
        r.lock(&a).unwrap();
        r.lock(&b).unwrap();
        assert_eq!(r.status(), RoundStatus::AllLocked);
    }

    #[test]
    fn locked_participant_cannot_submit() {
        let (a, b) = ids();
        let mut r = round();
        r.submit(&a, Attribute::Taste, "Sour").unwrap();
        r.lock(&a).unwrap();
        let err = r.submit(&a, Attribute::Taste, "Sweet").unwrap_err();
        assert!(matches!(err, SenseError::InvalidRoundState { operation: "submit", .. }));
        assert_eq!(r.submission(&a).unwrap().get(Attribute::Taste), "Sour");
        // The other participant can still edit.
        r.submit(&b, Attribute::Taste, "Sweet").unwrap();
    }

    #[test]
    fn invalid_value_leaves_submission_untouched() {
        let (a, _) = ids();
        let mut r = round();
        r.submit(&a, Attribute::Volume, "Loud").unwrap();
        assert!(r.submit(&a, Attribute::Volume, "Deafening").is_err());
        assert_eq!(r.submission(&a).unwrap().get(Attribute::Volume), "Loud");
    }

    #[test]
    fn unknown_participant() {
        let mut r = round();
        let ghost = ParticipantId::new("ghost");
        assert_eq!(
            r.submit(&ghost, Attribute::Color, "Red"),
            Err(SenseError::UnknownParticipant("ghost".into()))
        );
        assert!(r.toggle_lock(&ghost).is_err());
    }

    #[test]
    fn no_edits_once_all_locked() {
        let (a, b) = ids();
        let mut r = round();
        r.lock(&a).unwrap();
        r.lock(&b).unwrap();
        assert!(r.toggle_lock(&a).is_err());
        assert!(r.clear_submission(&b).is_err());
        assert!(r.reset().is_err());
    }

    #[test]
    fn force_lock() {
        let (a, b) = ids();
        let mut r = round();
        r.lock(&a).unwrap();
        assert_eq!(r.lock_all_unlocked(), vec![b]);
        assert_eq!(r.status(), RoundStatus::AllLocked);
        assert!(r.lock_all_unlocked().is_empty());
    }

    #[test]
    fn resolve_and_reset() {
        let (a, b) = ids();
        let mut r = round();
        assert!(r.mark_resolved().is_err());
        r.submit(&a, Attribute::Color, "Red").unwrap();
        r.lock_all_unlocked();
        r.mark_resolved().unwrap();
        assert_eq!(r.status(), RoundStatus::Resolved);
        assert!(r.mark_resolved().is_err());
        assert!(r.submit(&b, Attribute::Color, "Red").is_err());
        r.reset().unwrap();
        assert_eq!(r.status(), RoundStatus::Open);
        assert!(r.submission(&a).unwrap().is_empty());
        assert!(!r.is_locked(&a).unwrap());
    }
}
