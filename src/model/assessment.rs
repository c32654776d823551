// self
use crate::{
	_prelude::*,
	auth::{AssessmentId, UserId},
};

/// Kinds of gradable items the host application offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
	/// Individual or group assignment marked through results.
	Assignment,
	/// Tabular grade-entry form.
	GradeEntryForm,
}
impl AssessmentKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AssessmentKind::Assignment => "assignment",
			AssessmentKind::GradeEntryForm => "grade_entry_form",
		}
	}
}

/// Gradable item mirrored as one LMS line item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
	/// Local identifier.
	pub id: AssessmentId,
	/// Short code, sent as the line item's `resourceId`.
	pub short_identifier: String,
	/// Human-readable description, sent as the line item's label.
	pub description: String,
	/// Maximum achievable mark.
	pub max_mark: f64,
	/// Assessment kind.
	pub kind: AssessmentKind,
}

/// Released result of one grouping on an assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupingMark {
	/// Accepted members of the grouping.
	pub members: Vec<UserId>,
	/// Total mark of the grouping's released result.
	pub total_mark: f64,
}

/// Released total grade of one student on a grade-entry form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeEntryMark {
	/// Student.
	pub user: UserId,
	/// Released total grade.
	pub total_grade: f64,
}

/// Released marks of one assessment, tagged by assessment kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "marks", rename_all = "snake_case")]
pub enum ReleasedMarks {
	/// Marks of an assignment, one per grouping.
	Assignment(Vec<GroupingMark>),
	/// Marks of a grade-entry form, one per student.
	GradeEntryForm(Vec<GradeEntryMark>),
}
impl ReleasedMarks {
	/// Empty mark set matching `kind`.
	pub fn empty(kind: AssessmentKind) -> Self {
		match kind {
			AssessmentKind::Assignment => ReleasedMarks::Assignment(Vec::new()),
			AssessmentKind::GradeEntryForm => ReleasedMarks::GradeEntryForm(Vec::new()),
		}
	}

	/// Kind of assessment the marks belong to.
	pub fn kind(&self) -> AssessmentKind {
		match self {
			ReleasedMarks::Assignment(_) => AssessmentKind::Assignment,
			ReleasedMarks::GradeEntryForm(_) => AssessmentKind::GradeEntryForm,
		}
	}
}
