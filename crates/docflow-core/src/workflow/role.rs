//! Role resolution: maps a principal's group memberships to a workflow role.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::models::FillerStep;

pub const FILLER_GROUP_1: &str = "FillerGroup1";
pub const FILLER_GROUP_2: &str = "FillerGroup2";
pub const FILLER_GROUP_3: &str = "FillerGroup3";
pub const APPROVER_GROUP: &str = "ApproverGroup";

/// The workflow role a principal acts under.
///
/// `Unassigned` is the "no role" sentinel (code 0): authenticated, but
/// entitled to no privileged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Filler1,
    Filler2,
    Filler3,
    Approver,
    Unassigned,
}

impl Role {
    /// Recognized roles in resolution priority order.
    pub const RECOGNIZED: [Role; 4] = [Role::Filler1, Role::Filler2, Role::Filler3, Role::Approver];

    pub fn code(self) -> u8 {
        match self {
            Self::Filler1 => 1,
            Self::Filler2 => 2,
            Self::Filler3 => 3,
            Self::Approver => 4,
            Self::Unassigned => 0,
        }
    }

    /// Group whose members hold this role.
    pub fn group(self) -> Option<&'static str> {
        match self {
            Self::Filler1 => Some(FILLER_GROUP_1),
            Self::Filler2 => Some(FILLER_GROUP_2),
            Self::Filler3 => Some(FILLER_GROUP_3),
            Self::Approver => Some(APPROVER_GROUP),
            Self::Unassigned => None,
        }
    }

    /// The filling step this role owns, if any.
    pub fn filler_step(self) -> Option<FillerStep> {
        match self {
            Self::Filler1 => Some(FillerStep::One),
            Self::Filler2 => Some(FillerStep::Two),
            Self::Filler3 => Some(FillerStep::Three),
            Self::Approver | Self::Unassigned => None,
        }
    }

    pub fn is_recognized(self) -> bool {
        self != Self::Unassigned
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Filler1 => "Filler1",
            Self::Filler2 => "Filler2",
            Self::Filler3 => "Filler3",
            Self::Approver => "Approver",
            Self::Unassigned => "None",
        };
        f.write_str(name)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Resolve a role from group memberships.
///
/// Multiple memberships resolve first-match-wins in the order
/// Filler1 > Filler2 > Filler3 > Approver.
pub fn resolve<S: AsRef<str>>(memberships: &[S]) -> Role {
    Role::RECOGNIZED
        .into_iter()
        .find(|role| {
            let group = role.group().unwrap_or_default();
            memberships.iter().any(|m| m.as_ref() == group)
        })
        .unwrap_or(Role::Unassigned)
}
