// quorum.rs — Collective access requests approved by PrimaryHead quorum.
//
// State machine (one-way, no reject path):
//
//   Pending ──(|approvals| ≥ required_quorum)──▶ Approved
//
// `required_quorum` is fixed when the request is created. Approvals are a set
// of distinct voters, so a repeat vote cannot count twice. Revoking an
// approved request withdraws its grant without moving it back to Pending.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_policy::Action;

use crate::error::AccessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Approved,
}

impl RequestState {
    pub fn can_transition_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Pending, RequestState::Approved)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Pending => f.write_str("pending"),
            RequestState::Approved => f.write_str("approved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: u64,
    pub requester: String,
    pub resource: String,
    pub action: Action,
    pub approvals: BTreeSet<String>,
    pub required_quorum: usize,
    pub state: RequestState,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    pub fn is_approved(&self) -> bool {
        self.state == RequestState::Approved
    }

    /// Approved and not revoked.
    pub fn grants(&self, requester: &str, resource: &str, action: &Action) -> bool {
        self.is_approved()
            && !self.revoked
            && self.requester == requester
            && self.resource == resource
            && &self.action == action
    }

    fn try_approve(&mut self, at: DateTime<Utc>) -> bool {
        if self.approvals.len() >= self.required_quorum
            && self.state.can_transition_to(RequestState::Approved)
        {
            self.state = RequestState::Approved;
            self.approved_at = Some(at);
            true
        } else {
            false
        }
    }
}

/// Result of a counted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteResult {
    pub approvals: usize,
    pub required_quorum: usize,
    /// This vote moved the request to Approved.
    pub newly_approved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RequestBook {
    requests: Vec<AccessRequest>,
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a request. Ids are sequential from 0. `endorsed_by_requester`
    /// seeds the approval set with the requester (a PrimaryHead asking on its
    /// own behalf); with a quorum of one that approves immediately.
    pub fn create(
        &mut self,
        requester: &str,
        resource: &str,
        action: Action,
        required_quorum: usize,
        endorsed_by_requester: bool,
        at: DateTime<Utc>,
    ) -> &AccessRequest {
        let id = self.requests.len() as u64;
        let mut approvals = BTreeSet::new();
        if endorsed_by_requester {
            approvals.insert(requester.to_string());
        }
        let mut request = AccessRequest {
            id,
            requester: requester.to_string(),
            resource: resource.to_string(),
            action,
            approvals,
            required_quorum,
            state: RequestState::Pending,
            revoked: false,
            created_at: at,
            approved_at: None,
        };
        request.try_approve(at);
        self.requests.push(request);
        &self.requests[self.requests.len() - 1]
    }

    pub fn get(&self, id: u64) -> Result<&AccessRequest, AccessError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.requests.get(idx))
            .ok_or(AccessError::RequestNotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut AccessRequest, AccessError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.requests.get_mut(idx))
            .ok_or(AccessError::RequestNotFound(id))
    }

    /// Validate a vote without recording it.
    pub fn check_vote(&self, id: u64, voter: &str) -> Result<(), AccessError> {
        let request = self.get(id)?;
        if request.approvals.contains(voter) {
            return Err(AccessError::DuplicateVote {
                id,
                voter: voter.to_string(),
            });
        }
        Ok(())
    }

    /// Record an approval. Votes on an already approved request are still
    /// recorded but cannot change its state.
    pub fn vote(
        &mut self,
        id: u64,
        voter: &str,
        at: DateTime<Utc>,
    ) -> Result<VoteResult, AccessError> {
        self.check_vote(id, voter)?;
        let request = self.get_mut(id)?;
        request.approvals.insert(voter.to_string());
        let newly_approved = request.try_approve(at);
        Ok(VoteResult {
            approvals: request.approvals.len(),
            required_quorum: request.required_quorum,
            newly_approved,
        })
    }

    /// Withdraw the grant of a request. Returns false if it was already revoked.
    pub fn revoke(&mut self, id: u64) -> Result<bool, AccessError> {
        let request = self.get_mut(id)?;
        let changed = !request.revoked;
        request.revoked = true;
        Ok(changed)
    }

    /// Does `requester` hold a live approval for (resource, action)?
    pub fn has_approved(&self, requester: &str, resource: &str, action: &Action) -> bool {
        self.requests
            .iter()
            .any(|r| r.grants(requester, resource, action))
    }

    pub fn requests(&self) -> &[AccessRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn book_with_request(required: usize, endorsed: bool) -> RequestBook {
        let mut book = RequestBook::new();
        book.create("ph1", "GlobalResourceTable", Action::View, required, endorsed, t0());
        book
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let mut book = RequestBook::new();
        assert_eq!(book.create("a", "r", Action::View, 2, false, t0()).id, 0);
        assert_eq!(book.create("b", "r", Action::View, 2, false, t0()).id, 1);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn quorum_reached_flips_to_approved() {
        let mut book = book_with_request(3, true);
        let first = book.vote(0, "ph2", t0()).unwrap();
        assert_eq!(first.approvals, 2);
        assert!(!first.newly_approved);

        let second = book.vote(0, "ph3", t0()).unwrap();
        assert!(second.newly_approved);
        assert!(book.get(0).unwrap().is_approved());
        assert!(book.has_approved("ph1", "GlobalResourceTable", &Action::View));
        assert!(!book.has_approved("ph1", "GlobalResourceTable", &Action::Edit));
        assert!(!book.has_approved("ph2", "GlobalResourceTable", &Action::View));
    }

    #[test]
    fn duplicate_vote_counts_once() {
        let mut book = book_with_request(3, false);
        book.vote(0, "ph2", t0()).unwrap();
        let err = book.vote(0, "ph2", t0()).unwrap_err();
        assert!(matches!(err, AccessError::DuplicateVote { id: 0, .. }));
        assert_eq!(book.get(0).unwrap().approvals.len(), 1);
    }

    #[test]
    fn endorsed_requester_cannot_vote_again() {
        let mut book = book_with_request(3, true);
        assert!(matches!(
            book.vote(0, "ph1", t0()),
            Err(AccessError::DuplicateVote { .. })
        ));
    }

    #[test]
    fn single_head_quorum_approves_at_creation() {
        let book = book_with_request(1, true);
        let request = book.get(0).unwrap();
        assert!(request.is_approved());
        assert_eq!(request.approved_at, Some(t0()));
    }

    #[test]
    fn approval_is_permanent() {
        let mut book = book_with_request(2, true);
        book.vote(0, "ph2", t0()).unwrap();
        let late = book.vote(0, "ph3", t0()).unwrap();
        assert!(!late.newly_approved);
        assert!(book.get(0).unwrap().is_approved());

        // Revocation withdraws the grant but not the approval.
        assert!(book.revoke(0).unwrap());
        assert!(!book.revoke(0).unwrap());
        assert!(book.get(0).unwrap().is_approved());
        assert!(!book.has_approved("ph1", "GlobalResourceTable", &Action::View));
    }

    #[test]
    fn unknown_request_is_error() {
        let mut book = RequestBook::new();
        assert!(matches!(book.vote(9, "ph1", t0()), Err(AccessError::RequestNotFound(9))));
        assert!(matches!(book.revoke(9), Err(AccessError::RequestNotFound(9))));
    }

    #[test]
    fn state_transitions_are_one_way() {
        assert!(RequestState::Pending.can_transition_to(RequestState::Approved));
        assert!(!RequestState::Approved.can_transition_to(RequestState::Pending));
        assert!(!RequestState::Approved.can_transition_to(RequestState::Approved));
    }
}
