use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Participant,
    Instructor,
}

impl Role {
    /// Read a free-text marker such as "participante" or "Instructor".
    /// Blank and unrecognised markers have no role.
    pub fn from_marker(marker: Option<&str>) -> Option<Self> {
        let marker = marker?.to_lowercase();
        if marker.contains("part") {
            Some(Role::Participant)
        } else if ["instr", "min", "org"].iter().any(|t| marker.contains(t)) {
            Some(Role::Instructor)
        } else {
            None
        }
    }

    pub fn folder(self) -> &'static str {
        match self {
            Role::Participant => "Participants",
            Role::Instructor => "Instructors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Participants,
    Instructors,
    Both,
}

impl GenerationMode {
    pub fn wants_participants(self) -> bool {
        matches!(self, Self::Participants | Self::Both)
    }

    pub fn wants_instructors(self) -> bool {
        matches!(self, Self::Instructors | Self::Both)
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "participants" | "participantes" => Ok(Self::Participants),
            "instructors" | "ministrantes" => Ok(Self::Instructors),
            "both" | "ambos" => Ok(Self::Both),
            other => Err(format!("unknown generation mode {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRecord {
    pub name: String,
    pub role: Role,
}

impl PersonRecord {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Sequential certificate number, printed zero-padded to four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CertificateNumber(pub u32);

impl std::fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// One raw row of the courses sheet, every column optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseRow {
    pub title: Option<String>,
    pub workload: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub program: Option<String>,
    pub instructors: Option<String>,
}

/// Course details shared by every certificate in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseConfig {
    pub title: String,
    /// Display text, never used arithmetically.
    pub hours: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub program: Vec<String>,
    pub instructors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkbookSummary {
    pub sheets: Vec<String>,
    pub courses: Vec<CourseRow>,
    pub participants: usize,
}
