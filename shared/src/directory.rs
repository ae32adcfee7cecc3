//! Directory and profile view state that outlives a single fetch: the
//! per-session connect set and the delete-then-replace workflow.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::{SubmitPayload, UserFields};
use crate::config::PlaceholderConfig;
use crate::image_processing::{placeholder_image, PlaceholderLabel};
use crate::model::{UserId, ViewTicket};

/// Records the user has pressed "Connect" on. Lives for the session only and
/// is never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectSet(BTreeSet<UserId>);

impl ConnectSet {
    /// Flips membership and returns whether `id` is now connected.
    pub fn toggle(&mut self, id: UserId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which view started a delete, and so where to go when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOrigin {
    Directory,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub id: UserId,
    pub display_name: String,
    pub origin: DeleteOrigin,
    pub ticket: ViewTicket,
}

impl DeleteTarget {
    pub fn confirm_message(&self) -> String {
        format!("Are you sure you want to delete {}?", self.display_name)
    }
}

/// At most one delete runs at a time. Every terminal transition lands back on
/// `Idle`, whatever the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeleteFlow {
    #[default]
    Idle,
    Confirming(DeleteTarget),
    Deleting(DeleteTarget),
    ReplacementCreating(DeleteTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a delete of user {busy_with} is already in progress")]
pub struct DeleteBusy {
    pub busy_with: UserId,
}

impl DeleteFlow {
    pub fn target(&self) -> Option<&DeleteTarget> {
        match self {
            DeleteFlow::Idle => None,
            DeleteFlow::Confirming(t) | DeleteFlow::Deleting(t) | DeleteFlow::ReplacementCreating(t) => {
                Some(t)
            }
        }
    }

    /// The record whose delete controls should show as busy. Confirmation
    /// has not started any work yet, so it does not count.
    pub fn busy_record(&self) -> Option<UserId> {
        match self {
            DeleteFlow::Deleting(t) | DeleteFlow::ReplacementCreating(t) => Some(t.id),
            DeleteFlow::Idle | DeleteFlow::Confirming(_) => None,
        }
    }

    pub fn is_confirming(&self) -> bool {
        matches!(self, DeleteFlow::Confirming(_))
    }

    pub fn begin(&mut self, target: DeleteTarget) -> Result<(), DeleteBusy> {
        if let Some(current) = self.target() {
            return Err(DeleteBusy {
                busy_with: current.id,
            });
        }
        *self = DeleteFlow::Confirming(target);
        Ok(())
    }

    /// Confirmation answered. Returns the target when the delete should go
    /// ahead.
    pub fn confirmed(&mut self, id: UserId, confirmed: bool) -> Option<DeleteTarget> {
        match std::mem::take(self) {
            DeleteFlow::Confirming(target) if target.id == id => {
                if confirmed {
                    *self = DeleteFlow::Deleting(target.clone());
                    Some(target)
                } else {
                    None
                }
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// Delete answered. On success the flow moves on to the replacement; on
    /// failure it is over.
    pub fn deleted(&mut self, id: UserId, succeeded: bool) -> Option<DeleteTarget> {
        match std::mem::take(self) {
            DeleteFlow::Deleting(target) if target.id == id => {
                if succeeded {
                    *self = DeleteFlow::ReplacementCreating(target.clone());
                }
                Some(target)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn finish(&mut self, id: UserId) -> Option<DeleteTarget> {
        match std::mem::take(self) {
            DeleteFlow::ReplacementCreating(target) if target.id == id => Some(target),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Millisecond stamp for the next replacement email. Strictly greater than
/// `last`, so two replacements in the same millisecond still differ.
pub fn next_replacement_stamp(now_ms: u64, last: u64) -> u64 {
    now_ms.max(last.saturating_add(1))
}

pub fn replacement_fields(stamp: u64) -> UserFields {
    UserFields {
        first_name: "Replacement".to_string(),
        last_name: "User".to_string(),
        email: format!("replacement{stamp}@example.com"),
        bio: "This user was created to replace a deleted user.".to_string(),
        major: "Computer Science".to_string(),
        graduation_year: "2026".to_string(),
    }
}

pub fn replacement_payload(stamp: u64, placeholder: &PlaceholderConfig) -> SubmitPayload {
    SubmitPayload {
        fields: replacement_fields(stamp),
        image: Some(placeholder_image(placeholder, PlaceholderLabel::REPLACEMENT_USER)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn target(id: u64) -> DeleteTarget {
        DeleteTarget {
            id: UserId(id),
            display_name: "Ada Lovelace".into(),
            origin: DeleteOrigin::Directory,
            ticket: ViewTicket(1),
        }
    }

    #[test]
    fn connect_toggles() {
        let mut set = ConnectSet::default();
        assert!(set.toggle(UserId(1)));
        assert!(set.contains(UserId(1)));
        assert!(!set.toggle(UserId(1)));
        assert!(set.is_empty());
    }

    #[test]
    fn confirm_message_names_the_user() {
        assert_eq!(
            target(7).confirm_message(),
            "Are you sure you want to delete Ada Lovelace?"
        );
    }

    #[test]
    fn happy_path_returns_to_idle() {
        let mut flow = DeleteFlow::default();
        flow.begin(target(7)).unwrap();
        assert!(flow.is_confirming());
        assert_eq!(flow.busy_record(), None);

        assert!(flow.confirmed(UserId(7), true).is_some());
        assert_eq!(flow.busy_record(), Some(UserId(7)));

        assert!(flow.deleted(UserId(7), true).is_some());
        assert_matches!(flow, DeleteFlow::ReplacementCreating(_));

        assert!(flow.finish(UserId(7)).is_some());
        assert_eq!(flow, DeleteFlow::Idle);
    }

    #[test]
    fn decline_returns_to_idle() {
        let mut flow = DeleteFlow::default();
        flow.begin(target(7)).unwrap();
        assert!(flow.confirmed(UserId(7), false).is_none());
        assert_eq!(flow, DeleteFlow::Idle);
    }

    #[test]
    fn failed_delete_returns_to_idle() {
        let mut flow = DeleteFlow::default();
        flow.begin(target(7)).unwrap();
        flow.confirmed(UserId(7), true);
        assert!(flow.deleted(UserId(7), false).is_some());
        assert_eq!(flow, DeleteFlow::Idle);
    }

    #[test]
    fn second_delete_is_rejected_while_busy() {
        let mut flow = DeleteFlow::default();
        flow.begin(target(7)).unwrap();
        assert_eq!(
            flow.begin(target(8)).unwrap_err(),
            DeleteBusy {
                busy_with: UserId(7)
            }
        );
    }

    #[test]
    fn responses_for_other_records_are_ignored() {
        let mut flow = DeleteFlow::default();
        flow.begin(target(7)).unwrap();
        flow.confirmed(UserId(7), true);
        assert!(flow.deleted(UserId(9), true).is_none());
        assert!(flow.finish(UserId(7)).is_none());
        assert_matches!(flow, DeleteFlow::Deleting(_));
    }

    #[test]
    fn replacement_record_fields() {
        let payload = replacement_payload(1_700_000_000_000, &PlaceholderConfig::default());
        assert_eq!(payload.fields.first_name, "Replacement");
        assert_eq!(payload.fields.last_name, "User");
        assert_eq!(payload.fields.email, "replacement1700000000000@example.com");
        assert_eq!(payload.fields.graduation_year, "2026");
        let image = payload.image.unwrap();
        assert_eq!(image.file_name, "placeholder.png");
        assert!(!image.is_empty());
    }

    proptest! {
        #[test]
        fn replacement_stamps_strictly_increase(times in proptest::collection::vec(0u64..10_000, 1..50)) {
            let mut last = 0;
            for now in times {
                let stamp = next_replacement_stamp(now, last);
                prop_assert!(stamp > last);
                last = stamp;
            }
        }
    }
}
