//! Party entity and its relational backend.

mod sql;

pub use sql::PartySqlDb;

use crate::backend::Entity;
use serde::{Deserialize, Serialize};

/// Maximum party name length in bytes.
pub const PARTY_NAME_MAX: usize = 23;

/// One member slot of a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PartyMember {
    /// Owning account.
    pub account_id: u32,
    /// Character in the party.
    pub char_id: u32,
    /// Whether this member leads the party.
    pub leader: bool,
}

impl PartyMember {
    /// Creates a non-leader member.
    #[must_use]
    pub const fn new(account_id: u32, char_id: u32) -> Self {
        Self {
            account_id,
            char_id,
            leader: false,
        }
    }

    /// Whether this slot belongs to the given character.
    #[must_use]
    pub const fn is(&self, account_id: u32, char_id: u32) -> bool {
        self.account_id == account_id && self.char_id == char_id
    }
}

/// A player party.
///
/// Id `0` means "unassigned". At most one member carries the leader flag;
/// the leader's identity is also stored on the party row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Party {
    /// Party id.
    pub id: u32,
    /// Display name. Not unique.
    pub name: String,
    /// Experience sharing mode.
    pub exp_share: u8,
    /// Item distribution mode.
    pub item_share: u8,
    /// Members in slot order.
    pub members: Vec<PartyMember>,
}

impl Party {
    /// Creates an unassigned party led by `founder`.
    #[must_use]
    pub fn new(name: &str, founder: PartyMember) -> Self {
        Self {
            id: 0,
            name: mmodb_codec::bounded(name, PARTY_NAME_MAX),
            exp_share: 0,
            item_share: 0,
            members: vec![PartyMember {
                leader: true,
                ..founder
            }],
        }
    }

    /// Returns the leading member, if any.
    #[must_use]
    pub fn leader(&self) -> Option<&PartyMember> {
        self.members.iter().find(|m| m.leader)
    }

    /// Returns the slot index of a character.
    #[must_use]
    pub fn position(&self, account_id: u32, char_id: u32) -> Option<usize> {
        self.members.iter().position(|m| m.is(account_id, char_id))
    }

    /// Moves the leader flag to the member at `index`.
    ///
    /// Returns `false` if there is no such member.
    pub fn set_leader(&mut self, index: usize) -> bool {
        if index >= self.members.len() {
            return false;
        }
        for (i, member) in self.members.iter_mut().enumerate() {
            member.leader = i == index;
        }
        true
    }
}

impl Entity for Party {
    const KIND: &'static str = "party";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One named partial update of a party.
///
/// Member variants carry the index into [`Party::members`] of the member
/// concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartyChange {
    /// Rewrite the name and the sharing modes.
    Basic,
    /// Store the member at this index as leader.
    Leader(usize),
    /// Link the member at this index to the party.
    AddMember(usize),
    /// Unlink the member at this index from the party.
    RemoveMember(usize),
}

/// A set of changes applied together in one transaction.
///
/// # Example
///
/// ```rust
/// use mmodb_core::{PartyChange, PartyUpdate};
///
/// let update: PartyUpdate = [PartyChange::Basic, PartyChange::Leader(2)].into_iter().collect();
/// assert_eq!(update.changes().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyUpdate(Vec<PartyChange>);

impl PartyUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Adds a change.
    #[must_use]
    pub fn with(mut self, change: PartyChange) -> Self {
        self.0.push(change);
        self
    }

    /// The changes, in application order.
    #[must_use]
    pub fn changes(&self) -> &[PartyChange] {
        &self.0
    }

    /// Whether no change is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PartyChange> for PartyUpdate {
    fn from(change: PartyChange) -> Self {
        Self(vec![change])
    }
}

impl FromIterator<PartyChange> for PartyUpdate {
    fn from_iter<I: IntoIterator<Item = PartyChange>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
