use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// A single approver's vote on a document.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRecord {
    pub id: String,
    #[serde(skip_serializing)]
    pub document_id: String,
    #[serde(rename = "approver")]
    pub approver_id: String,
    pub approver_name: String,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn new(id: String, document_id: String, approver_id: String, approver_name: String) -> Self {
        Self {
            id,
            document_id,
            approver_id,
            approver_name,
            status: ApprovalStatus::Pending,
            comments: None,
            approved_at: None,
            created_at: Utc::now(),
        }
    }

    /// Back to `Pending` with comment and timestamp cleared.
    pub fn reset(&mut self) {
        self.status = ApprovalStatus::Pending;
        self.comments = None;
        self.approved_at = None;
    }
}

/// The two actions an approver can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}
