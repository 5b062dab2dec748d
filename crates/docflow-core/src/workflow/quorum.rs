//! Approval quorum: who must approve a document and when they all have.

use std::collections::HashSet;

use crate::models::{ApprovalRecord, ApprovalStatus, Principal};

use super::role::Role;

/// Current holders of each recognized role.
#[derive(Debug, Clone, Default)]
pub struct RoleHolders {
    holders: Vec<(Role, Vec<Principal>)>,
}

impl RoleHolders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role, principals: Vec<Principal>) {
        self.holders.retain(|(r, _)| *r != role);
        self.holders.push((role, principals));
    }

    fn of(&self, role: Role) -> &[Principal] {
        self.holders
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    /// Union of all recognized role holders, deduplicated by principal id.
    ///
    /// Order is Filler1, Filler2, Filler3, Approver holders, each group by
    /// username; the first occurrence of a principal wins.
    pub fn eligible_approvers(&self) -> Vec<&Principal> {
        let mut seen = HashSet::new();
        let mut eligible = Vec::new();
        for role in Role::RECOGNIZED {
            let mut group: Vec<&Principal> = self.of(role).iter().collect();
            group.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
            for principal in group {
                if seen.insert(principal.id.as_str()) {
                    eligible.push(principal);
                }
            }
        }
        eligible
    }
}

/// Pending records for every eligible approver that has none yet.
///
/// Calling this again with the returned records included in `existing`
/// yields nothing, so repeated entries into approval never duplicate votes.
pub fn missing_records(
    document_id: &str,
    holders: &RoleHolders,
    existing: &[ApprovalRecord],
) -> Vec<ApprovalRecord> {
    let present: HashSet<&str> = existing.iter().map(|r| r.approver_id.as_str()).collect();
    holders
        .eligible_approvers()
        .into_iter()
        .filter(|p| !present.contains(p.id.as_str()))
        .map(|p| {
            ApprovalRecord::new(
                uuid::Uuid::new_v4().to_string(),
                document_id.to_string(),
                p.id.clone(),
                p.username.clone(),
            )
        })
        .collect()
}

/// Quorum is met when there is at least one record and all are approved.
pub fn is_complete(records: &[ApprovalRecord]) -> bool {
    !records.is_empty() && records.iter().all(|r| r.status == ApprovalStatus::Approved)
}

/// Return every record to `Pending` with comment and timestamp cleared.
pub fn reset_all(records: &mut [ApprovalRecord]) {
    for record in records.iter_mut() {
        record.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: &str, username: &str) -> Principal {
        Principal::new(id.to_string(), username.to_string(), None)
    }

    fn holders() -> RoleHolders {
        let mut h = RoleHolders::new();
        h.insert(Role::Approver, vec![principal("u4", "user4"), principal("u1", "user1")]);
        h.insert(Role::Filler1, vec![principal("u1", "user1")]);
        h.insert(Role::Filler2, vec![principal("u2", "user2")]);
        h.insert(Role::Filler3, vec![principal("u3", "user3")]);
        h
    }

    #[test]
    fn test_eligible_union_is_deduplicated_and_ordered() {
        let h = holders();
        let ids: Vec<&str> = h.eligible_approvers().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["u1", "u2", "u3", "u4"]);
    }

    #[test]
    fn test_missing_records_is_idempotent() {
        let h = holders();
        let first = missing_records("doc", &h, &[]);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|r| r.status == ApprovalStatus::Pending));
        assert!(first.iter().all(|r| r.document_id == "doc"));

        let second = missing_records("doc", &h, &first);
        assert!(second.is_empty());

        let partial = missing_records("doc", &h, &first[..2]);
        let ids: Vec<&str> = partial.iter().map(|r| r.approver_id.as_str()).collect();
        assert_eq!(ids, ["u3", "u4"]);
    }

    #[test]
    fn test_completion_requires_every_record_approved() {
        let mut records = missing_records("doc", &holders(), &[]);
        assert!(!is_complete(&records));

        records[0].status = ApprovalStatus::Approved;
        assert!(!is_complete(&records));

        for r in records.iter_mut() {
            r.status = ApprovalStatus::Approved;
        }
        assert!(is_complete(&records));

        records[3].status = ApprovalStatus::Rejected;
        assert!(!is_complete(&records));
        assert!(!is_complete(&[]));
    }

    #[test]
    fn test_reset_all_clears_votes() {
        let mut records = missing_records("doc", &holders(), &[]);
        records[0].status = ApprovalStatus::Approved;
        records[0].comments = Some("looks good".into());
        records[0].approved_at = Some(chrono::Utc::now());
        records[1].status = ApprovalStatus::Rejected;
        records[1].comments = Some("no".into());

        reset_all(&mut records);
        for r in &records {
            assert_eq!(r.status, ApprovalStatus::Pending);
            assert!(r.comments.is_none());
            assert!(r.approved_at.is_none());
        }
    }
}
