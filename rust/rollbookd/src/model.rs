use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sessions a new class starts with unless workspace settings say otherwise.
pub const DEFAULT_SESSION_COUNT: usize = 10;

/// Value stored when a mark entry cannot be read as an integer.
pub const MARK_PARSE_FALLBACK: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{field} must not be empty")]
    InvalidInput { field: &'static str },

    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

impl ModelError {
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidInput { .. } => "invalid_input",
            ModelError::OutOfRange { .. } => "out_of_range",
        }
    }
}

fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), ModelError> {
    if index < len {
        Ok(())
    } else {
        Err(ModelError::OutOfRange { what, index, len })
    }
}

fn required_name(field: &'static str, raw: &str) -> Result<String, ModelError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ModelError::InvalidInput { field });
    }
    Ok(name.to_string())
}

/// Leading-integer parse used for grid mark entry.
///
/// Skips leading whitespace, accepts an optional sign, then reads digits up to
/// the first non-digit. Anything without at least one digit (or that does not
/// fit an `i64`) yields [`MARK_PARSE_FALLBACK`].
pub fn parse_mark(raw: &str) -> i64 {
    let t = raw.trim_start();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return MARK_PARSE_FALLBACK;
    }
    match digits[..end].parse::<i64>() {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) => MARK_PARSE_FALLBACK,
    }
}

pub fn default_session_name(position: usize) -> String {
    format!("Session {}", position)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
}

/// One class: roster, sessions and the two `[session][student]` grids.
///
/// Fields stay private so that every index shift goes through the methods
/// below, which keep `sessions`, `attendance` and `marks` the same height and
/// every grid row as wide as `students`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    students: Vec<Student>,
    #[serde(default)]
    sessions: Vec<String>,
    #[serde(default)]
    attendance: Vec<Vec<bool>>,
    #[serde(default)]
    marks: Vec<Vec<i64>>,
}

impl ClassRecord {
    pub fn new(name: &str, session_count: usize) -> Result<Self, ModelError> {
        let name = required_name("class name", name)?;
        Ok(Self {
            name,
            description: String::new(),
            students: Vec::new(),
            sessions: (1..=session_count).map(default_session_name).collect(),
            attendance: vec![Vec::new(); session_count],
            marks: vec![Vec::new(); session_count],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn attendance(&self) -> &[Vec<bool>] {
        &self.attendance
    }

    pub fn marks(&self) -> &[Vec<i64>] {
        &self.marks
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn set_description(&mut self, text: &str) {
        self.description = text.to_string();
    }

    pub fn add_student(&mut self, name: &str) -> Result<usize, ModelError> {
        let name = required_name("student name", name)?;
        self.students.push(Student { name });
        for row in self.attendance.iter_mut() {
            row.push(false);
        }
        for row in self.marks.iter_mut() {
            row.push(0);
        }
        Ok(self.students.len() - 1)
    }

    pub fn remove_student(&mut self, index: usize) -> Result<Student, ModelError> {
        check_index("student", index, self.students.len())?;
        let removed = self.students.remove(index);
        for row in self.attendance.iter_mut() {
            row.remove(index);
        }
        for row in self.marks.iter_mut() {
            row.remove(index);
        }
        Ok(removed)
    }

    /// Appends a session row. A missing or blank name falls back to
    /// `"Session N"` where N is the new session count.
    pub fn add_session(&mut self, name: Option<&str>) -> usize {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => default_session_name(self.sessions.len() + 1),
        };
        let width = self.students.len();
        self.sessions.push(name);
        self.attendance.push(vec![false; width]);
        self.marks.push(vec![0; width]);
        self.sessions.len() - 1
    }

    /// Drops the last session and its grid rows. Sessions are only ever
    /// removed from the tail; returns `None` when there is nothing to remove.
    pub fn remove_session(&mut self) -> Option<String> {
        let removed = self.sessions.pop()?;
        self.attendance.pop();
        self.marks.pop();
        Some(removed)
    }

    fn check_cell(&self, session: usize, student: usize) -> Result<(), ModelError> {
        check_index("session", session, self.sessions.len())?;
        check_index("student", student, self.students.len())
    }

    /// Stores `raw` read through [`parse_mark`]; never rejects the content.
    pub fn set_mark(&mut self, session: usize, student: usize, raw: &str) -> Result<i64, ModelError> {
        let value = parse_mark(raw);
        self.set_mark_value(session, student, value)?;
        Ok(value)
    }

    pub fn set_mark_value(
        &mut self,
        session: usize,
        student: usize,
        value: i64,
    ) -> Result<(), ModelError> {
        self.check_cell(session, student)?;
        self.marks[session][student] = value;
        Ok(())
    }

    pub fn mark(&self, session: usize, student: usize) -> Result<i64, ModelError> {
        self.check_cell(session, student)?;
        Ok(self.marks[session][student])
    }

    pub fn set_attendance(
        &mut self,
        session: usize,
        student: usize,
        present: bool,
    ) -> Result<(), ModelError> {
        self.check_cell(session, student)?;
        self.attendance[session][student] = present;
        Ok(())
    }

    pub fn is_present(&self, session: usize, student: usize) -> Result<bool, ModelError> {
        self.check_cell(session, student)?;
        Ok(self.attendance[session][student])
    }

    pub fn is_well_formed(&self) -> bool {
        let width = self.students.len();
        self.attendance.len() == self.sessions.len()
            && self.marks.len() == self.sessions.len()
            && self.attendance.iter().all(|row| row.len() == width)
            && self.marks.iter().all(|row| row.len() == width)
    }

    /// Forces the grids into shape after deserialization: rows and cells that
    /// are missing get defaults, surplus ones are dropped. Returns true when
    /// anything changed.
    pub fn normalize(&mut self) -> bool {
        if self.is_well_formed() {
            return false;
        }
        let height = self.sessions.len();
        let width = self.students.len();
        self.attendance.resize_with(height, Vec::new);
        self.marks.resize_with(height, Vec::new);
        for row in self.attendance.iter_mut() {
            row.resize(width, false);
        }
        for row in self.marks.iter_mut() {
            row.resize(width, 0);
        }
        true
    }
}

/// Ordered collection of classes. Class identity is the position in this list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassRepository {
    classes: Vec<ClassRecord>,
}

impl ClassRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(mut classes: Vec<ClassRecord>) -> Self {
        for cls in classes.iter_mut() {
            cls.normalize();
        }
        Self { classes }
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn create_class(&mut self, name: &str, session_count: usize) -> Result<usize, ModelError> {
        let cls = ClassRecord::new(name, session_count)?;
        self.classes.push(cls);
        Ok(self.classes.len() - 1)
    }

    pub fn select(&self, index: usize) -> Result<&ClassRecord, ModelError> {
        check_index("class", index, self.classes.len())?;
        Ok(&self.classes[index])
    }

    pub fn select_mut(&mut self, index: usize) -> Result<&mut ClassRecord, ModelError> {
        check_index("class", index, self.classes.len())?;
        Ok(&mut self.classes[index])
    }

    pub fn reset_all(&mut self) {
        self.classes.clear();
    }

    pub fn list(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name()).collect()
    }
}
