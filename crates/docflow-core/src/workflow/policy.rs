//! Access policy: what a role may see, write, approve, or delete for a
//! document at its current workflow position.
//!
//! Field ownership is a static table keyed by filling step; every permission
//! is derived from it together with the document's stage and step.

use crate::models::{Document, DocumentField, FillerStep, Stage};

use super::role::Role;

const fn field(n: u8) -> DocumentField {
    match DocumentField::new(n) {
        Some(f) => f,
        None => panic!("field number out of range"),
    }
}

const STEP_ONE_FIELDS: [DocumentField; 4] = [field(1), field(2), field(3), field(4)];
const STEP_TWO_FIELDS: [DocumentField; 4] = [field(5), field(6), field(7), field(8)];
const STEP_THREE_FIELDS: [DocumentField; 3] = [field(9), field(10), field(11)];

/// Fields owned by a filling step.
pub fn step_fields(step: FillerStep) -> &'static [DocumentField] {
    match step {
        FillerStep::One => &STEP_ONE_FIELDS,
        FillerStep::Two => &STEP_TWO_FIELDS,
        FillerStep::Three => &STEP_THREE_FIELDS,
    }
}

/// Fields a role may ever write (empty for roles without a step).
pub fn role_fields(role: Role) -> &'static [DocumentField] {
    role.filler_step().map(step_fields).unwrap_or(&[])
}

/// Fields of every step up to and including `step`.
pub fn cumulative_fields(step: FillerStep) -> Vec<DocumentField> {
    let last = step_fields(step).last().copied();
    DocumentField::all().take_while(|f| Some(*f) <= last).collect()
}

pub fn can_read(_role: Role, _doc: &Document) -> bool {
    true
}

pub fn can_write(role: Role, doc: &Document) -> bool {
    doc.current_stage == Stage::Filling && role.filler_step() == Some(doc.current_filler_step)
}

pub fn can_approve(role: Role, doc: &Document) -> bool {
    doc.current_stage == Stage::Approval && role.is_recognized()
}

pub fn can_delete(role: Role, doc: &Document) -> bool {
    match doc.current_stage {
        Stage::Filling => can_write(role, doc),
        Stage::Approval => role.is_recognized(),
        Stage::Completed => false,
    }
}

/// The fields presented to a role and which of them it may edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVisibility {
    pub visible: Vec<DocumentField>,
    pub writable: Vec<DocumentField>,
}

impl FieldVisibility {
    /// Visible fields that are not writable.
    pub fn read_only(&self) -> Vec<DocumentField> {
        self.visible
            .iter()
            .copied()
            .filter(|f| !self.writable.contains(f))
            .collect()
    }
}

/// While filling, everything through the current step is visible regardless
/// of role; only the current step's fields are writable, and only for the
/// role that owns the step. Outside filling all fields are visible and
/// read-only.
pub fn visible_field_set(role: Role, doc: &Document) -> FieldVisibility {
    match doc.current_stage {
        Stage::Filling => {
            let step = doc.current_filler_step;
            let writable = if can_write(role, doc) {
                step_fields(step).to_vec()
            } else {
                Vec::new()
            };
            FieldVisibility {
                visible: cumulative_fields(step),
                writable,
            }
        }
        Stage::Approval | Stage::Completed => FieldVisibility {
            visible: DocumentField::all().collect(),
            writable: Vec::new(),
        },
    }
}
