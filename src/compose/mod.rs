// Certificate wording. Produces styled text only; geometry lives in `pdf`.
use chrono::NaiveDate;

use crate::records::{CourseConfig, PersonRecord, Role};

pub const BULLET_MARKER: char = '-';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub spans: Vec<Span>,
}

impl RichText {
    pub fn push(&mut self, text: impl Into<String>, bold: bool) -> &mut Self {
        self.spans.push(Span {
            text: text.into(),
            bold,
        });
        self
    }

    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramEntry {
    Paragraph(String),
    Bullet(String),
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn period_clause(course: &CourseConfig) -> String {
    let start = format_date(course.start_date);
    let end = format_date(course.end_date);
    if start == end {
        format!("held on {},", start)
    } else {
        format!("held from {} to {},", start, end)
    }
}

/// Page 1 sentence. The person's name and the course title are bold.
pub fn compose_statement(person: &PersonRecord, course: &CourseConfig) -> RichText {
    let verb = match person.role {
        Role::Instructor => "organized the",
        Role::Participant => "participated in the",
    };
    let mut text = RichText::default();
    text.push("Certifies that ", false)
        .push(person.name.trim(), true)
        .push(format!(" {} ", verb), false)
        .push(course.title.trim(), true)
        .push(
            format!(
                ", {} with a workload of {} hours.",
                period_clause(course),
                course.hours.trim()
            ),
            false,
        );
    text
}

/// Page 2 program block: `-`-prefixed items become bullets, other non-blank
/// items become paragraphs.
pub fn compose_program<S: AsRef<str>>(items: &[S]) -> Vec<ProgramEntry> {
    items
        .iter()
        .map(|item| item.as_ref().trim())
        .filter(|item| !item.is_empty())
        .map(|item| match item.strip_prefix(BULLET_MARKER) {
            Some(rest) => ProgramEntry::Bullet(rest.trim().to_string()),
            None => ProgramEntry::Paragraph(item.to_string()),
        })
        .collect()
}
