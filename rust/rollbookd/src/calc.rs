use crate::model::{ClassRecord, ModelError};
use serde::Serialize;

/// Rounds to one decimal, halves away from zero, used for every displayed
/// average and percentage. Negative averages mirror their positive values.
pub fn round_off_1_decimal(x: f64) -> f64 {
    let magnitude = ((10.0 * x.abs()) + 0.5).floor() / 10.0;
    if magnitude == 0.0 {
        0.0
    } else {
        magnitude.copysign(x)
    }
}

pub fn format_1_decimal(x: f64) -> String {
    format!("{:.1}", round_off_1_decimal(x))
}

/// Attendance for one session. `NoData` stands in for the 0-student case
/// instead of a division by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttendanceRate {
    Percent(f64),
    NoData,
}

impl AttendanceRate {
    pub fn percent(self) -> Option<f64> {
        match self {
            AttendanceRate::Percent(p) => Some(p),
            AttendanceRate::NoData => None,
        }
    }

    pub fn display(self) -> String {
        match self {
            AttendanceRate::Percent(p) => format!("{}%", format_1_decimal(p)),
            AttendanceRate::NoData => "-".to_string(),
        }
    }
}

pub fn average_mark(cls: &ClassRecord, student: usize) -> Result<f64, ModelError> {
    if student >= cls.student_count() {
        return Err(ModelError::OutOfRange {
            what: "student",
            index: student,
            len: cls.student_count(),
        });
    }
    let rows = cls.marks();
    if rows.is_empty() {
        return Ok(0.0);
    }
    // Marks are unbounded integers; summing as f64 cannot overflow.
    let total: f64 = rows.iter().map(|row| row[student] as f64).sum();
    Ok(total / rows.len() as f64)
}

pub fn attendance_percentage(cls: &ClassRecord, session: usize) -> Result<AttendanceRate, ModelError> {
    let Some(row) = cls.attendance().get(session) else {
        return Err(ModelError::OutOfRange {
            what: "session",
            index: session,
            len: cls.session_count(),
        });
    };
    let total = cls.student_count();
    if total == 0 {
        return Ok(AttendanceRate::NoData);
    }
    let attended = row.iter().filter(|present| **present).count();
    Ok(AttendanceRate::Percent(
        100.0 * attended as f64 / total as f64,
    ))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub index: usize,
    pub name: String,
    pub average_mark: f64,
    pub average_display: String,
    pub sessions_attended: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub index: usize,
    pub name: String,
    pub present_count: usize,
    pub attendance_percent: Option<f64>,
    pub attendance_display: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub name: String,
    pub student_count: usize,
    pub session_count: usize,
    pub students: Vec<StudentSummary>,
    pub sessions: Vec<SessionSummary>,
}

/// Every aggregate for one class, recomputed from the grids on each call.
pub fn class_summary(cls: &ClassRecord) -> ClassSummary {
    let students = cls
        .students()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let avg = average_mark(cls, i).unwrap_or(0.0);
            StudentSummary {
                index: i,
                name: s.name.clone(),
                average_mark: avg,
                average_display: format_1_decimal(avg),
                sessions_attended: cls.attendance().iter().filter(|row| row[i]).count(),
            }
        })
        .collect();

    let sessions = cls
        .sessions()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let rate = attendance_percentage(cls, j).unwrap_or(AttendanceRate::NoData);
            SessionSummary {
                index: j,
                name: name.clone(),
                present_count: cls.attendance()[j].iter().filter(|p| **p).count(),
                attendance_percent: rate.percent(),
                attendance_display: rate.display(),
            }
        })
        .collect();

    ClassSummary {
        name: cls.name().to_string(),
        student_count: cls.student_count(),
        session_count: cls.session_count(),
        students,
        sessions,
    }
}
