mod models;

pub use models::*;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{CertError, Result};
use crate::workbook::{Sheet, Workbook};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Parse a day-first or ISO date, an ISO date-time, or a spreadsheet serial
/// day number.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let value = input.trim();
    let fail = |reason: &str| CertError::Parse {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(fail("empty value"));
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
    {
        return Ok(date);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
    {
        return Ok(dt.date());
    }

    if let Ok(serial) = value.parse::<f64>() {
        if (1.0..=2_958_465.0).contains(&serial) {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(|| fail("bad epoch"))?;
            return epoch
                .checked_add_signed(Duration::days(serial.trunc() as i64))
                .ok_or_else(|| fail("serial out of range"));
        }
        return Err(fail("number is not a day serial"));
    }

    Err(fail("expected DD/MM/YYYY or YYYY-MM-DD"))
}

/// Split a `;`-separated list, trimming entries and dropping blanks.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl CourseRow {
    fn from_sheet(sheet: &Sheet, row: usize) -> Self {
        let get = |key: &str| sheet.cell(row, sheet.column(key)).map(str::to_string);
        Self {
            title: get("COURSE"),
            workload: get("WORKLOAD"),
            start_date: get("STARTDATE"),
            end_date: get("ENDDATE"),
            program: get("PROGRAM"),
            instructors: get("INSTRUCTORS"),
        }
    }

    /// Fill every blank field of `self` from `fallback`.
    pub fn or(self, fallback: Option<&CourseRow>) -> Self {
        let Some(fb) = fallback else {
            return self;
        };
        let pick = |own: Option<String>, other: &Option<String>| {
            own.filter(|v| !v.trim().is_empty()).or_else(|| other.clone())
        };
        Self {
            title: pick(self.title, &fb.title),
            workload: pick(self.workload, &fb.workload),
            start_date: pick(self.start_date, &fb.start_date),
            end_date: pick(self.end_date, &fb.end_date),
            program: pick(self.program, &fb.program),
            instructors: pick(self.instructors, &fb.instructors),
        }
    }
}

/// All rows of the courses sheet, in sheet order.
pub fn course_rows(workbook: &Workbook) -> Vec<CourseRow> {
    workbook
        .courses()
        .map(|sheet| {
            sheet
                .data_rows()
                .map(|row| CourseRow::from_sheet(sheet, row))
                .collect()
        })
        .unwrap_or_default()
}

fn date_or_today(field: &str, value: Option<&str>, today: NaiveDate) -> NaiveDate {
    match value.map(parse_date) {
        Some(Ok(date)) => date,
        Some(Err(e)) => {
            tracing::warn!("{} unusable ({}), using {}", field, e, today);
            today
        }
        None => {
            tracing::warn!("{} missing, using {}", field, today);
            today
        }
    }
}

impl CourseConfig {
    /// Decode a course row. Title and workload are required; dates that are
    /// missing or unparseable become `today`.
    pub fn from_row(row: &CourseRow, today: NaiveDate) -> Result<Self> {
        let title = row
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CertError::validation("Course title is required."))?;
        let hours = row
            .workload
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CertError::validation("Course workload is required."))?;

        Ok(Self {
            title: title.to_string(),
            hours: hours.to_string(),
            start_date: date_or_today("start date", row.start_date.as_deref(), today),
            end_date: date_or_today("end date", row.end_date.as_deref(), today),
            program: row.program.as_deref().map(split_list).unwrap_or_default(),
            instructors: row.instructors.as_deref().map(split_list).unwrap_or_default(),
        })
    }
}

fn participant_rows(workbook: &Workbook) -> Vec<PersonRecord> {
    let Some(sheet) = workbook.participants() else {
        return Vec::new();
    };
    let name_col = sheet.column("NAME");
    let role_col = sheet.column("ROLE");

    // Without a role column every row is a participant; with one, only rows
    // marked as participants are.
    sheet
        .data_rows()
        .filter(|&row| match role_col {
            Some(_) => Role::from_marker(sheet.cell(row, role_col)) == Some(Role::Participant),
            None => true,
        })
        .filter_map(|row| sheet.cell(row, name_col))
        .map(|name| PersonRecord::new(name, Role::Participant))
        .collect()
}

/// Ordered people to certify: participant rows first, then the course's
/// instructors, depending on `mode`.
pub fn select_people(
    workbook: Option<&Workbook>,
    course: &CourseConfig,
    mode: GenerationMode,
) -> Result<Vec<PersonRecord>> {
    let mut people = Vec::new();

    if mode.wants_participants() {
        if let Some(workbook) = workbook {
            people.extend(participant_rows(workbook));
        }
    }
    if mode.wants_instructors() {
        people.extend(
            course
                .instructors
                .iter()
                .map(|name| PersonRecord::new(name.clone(), Role::Instructor)),
        );
    }

    if people.is_empty() {
        return Err(CertError::validation(
            "No people found for the selected criteria.",
        ));
    }
    Ok(people)
}

pub fn summarize(workbook: &Workbook) -> WorkbookSummary {
    WorkbookSummary {
        sheets: workbook.sheet_names(),
        courses: course_rows(workbook),
        participants: participant_rows(workbook).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn course(instructors: &[&str]) -> CourseConfig {
        CourseConfig {
            title: "Intro to Circuits".into(),
            hours: "20".into(),
            start_date: ymd(2024, 3, 10),
            end_date: ymd(2024, 3, 10),
            program: vec![],
            instructors: instructors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn workbook(csv: &str) -> Workbook {
        Workbook::from_upload("participants.csv", csv.as_bytes()).unwrap()
    }

    #[test]
    fn dates_in_common_shapes() {
        assert_eq!(parse_date("10/03/2024").unwrap(), ymd(2024, 3, 10));
        assert_eq!(parse_date(" 2024-03-10 ").unwrap(), ymd(2024, 3, 10));
        assert_eq!(parse_date("2024-03-10 00:00:00").unwrap(), ymd(2024, 3, 10));
        assert_eq!(parse_date("10.03.2024").unwrap(), ymd(2024, 3, 10));
        assert_eq!(parse_date("45361").unwrap(), ymd(2024, 3, 10));
    }

    #[test]
    fn bad_dates_are_parse_errors() {
        for input in ["", "next tuesday", "31/02/2024", "-4"] {
            assert!(
                matches!(parse_date(input), Err(CertError::Parse { .. })),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn list_splitting_trims_and_drops_blanks() {
        assert_eq!(split_list(" Ana Lima ; ;Bruno;"), vec!["Ana Lima", "Bruno"]);
        assert!(split_list(" ; ").is_empty());
    }

    #[test]
    fn course_from_row_falls_back_to_today() {
        let today = ymd(2025, 1, 2);
        let row = CourseRow {
            title: Some(" Intro ".into()),
            workload: Some("20".into()),
            start_date: Some("garbage".into()),
            end_date: None,
            program: Some("Intro;-Basics".into()),
            instructors: Some("Ana;Bruno".into()),
        };
        let course = CourseConfig::from_row(&row, today).unwrap();
        assert_eq!(course.title, "Intro");
        assert_eq!(course.start_date, today);
        assert_eq!(course.end_date, today);
        assert_eq!(course.program, vec!["Intro", "-Basics"]);
        assert_eq!(course.instructors, vec!["Ana", "Bruno"]);
    }

    #[test]
    fn course_requires_title_and_workload() {
        let today = ymd(2025, 1, 2);
        let row = CourseRow {
            workload: Some("20".into()),
            ..Default::default()
        };
        assert!(CourseConfig::from_row(&row, today).unwrap_err().is_validation());
        let row = CourseRow {
            title: Some("Intro".into()),
            workload: Some("  ".into()),
            ..Default::default()
        };
        assert!(CourseConfig::from_row(&row, today).unwrap_err().is_validation());
    }

    #[test]
    fn form_fields_win_over_sheet_row() {
        let form = CourseRow {
            title: Some("Edited".into()),
            workload: Some("".into()),
            ..Default::default()
        };
        let sheet = CourseRow {
            title: Some("Original".into()),
            workload: Some("8".into()),
            start_date: Some("2024-01-01".into()),
            ..Default::default()
        };
        let merged = form.or(Some(&sheet));
        assert_eq!(merged.title.as_deref(), Some("Edited"));
        assert_eq!(merged.workload.as_deref(), Some("8"));
        assert_eq!(merged.start_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn participants_filtered_by_role_column() {
        let wb = workbook(
            "Name,Role\nMaria Silva,Participante\nAna Lima,Ministrante\n,participant\nJoão,\n",
        );
        let people = select_people(Some(&wb), &course(&[]), GenerationMode::Participants).unwrap();
        assert_eq!(people, vec![PersonRecord::new("Maria Silva", Role::Participant)]);
    }

    #[test]
    fn blank_and_unknown_roles_are_not_participants() {
        let wb = workbook("NAME,ROLE\nMaria,participante\nJoao,\nGuest Person,guest\n");
        let people = select_people(Some(&wb), &course(&[]), GenerationMode::Participants).unwrap();
        let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Maria"]);
    }

    #[test]
    fn role_column_without_participants_is_rejected() {
        let wb = workbook("NAME,ROLE\nJoao,\nGuest Person,guest\n");
        let err = select_people(Some(&wb), &course(&[]), GenerationMode::Participants).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn missing_role_column_means_everyone_participates() {
        let wb = workbook("NAME\nMaria\nPedro\n");
        let people = select_people(Some(&wb), &course(&[]), GenerationMode::Participants).unwrap();
        assert_eq!(people.len(), 2);
        assert!(people.iter().all(|p| p.role == Role::Participant));
    }

    #[test]
    fn both_puts_participants_before_instructors() {
        let wb = workbook("NAME\nP1\nP2\n");
        let people =
            select_people(Some(&wb), &course(&["I1", "I2"]), GenerationMode::Both).unwrap();
        let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["P1", "P2", "I1", "I2"]);
        assert_eq!(people[2].role, Role::Instructor);
    }

    #[test]
    fn instructors_only_ignores_sheet() {
        let wb = workbook("NAME\nP1\n");
        let people =
            select_people(Some(&wb), &course(&["Ana Lima"]), GenerationMode::Instructors).unwrap();
        assert_eq!(people, vec![PersonRecord::new("Ana Lima", Role::Instructor)]);
    }

    #[test]
    fn empty_selection_is_a_validation_error() {
        let err = select_people(None, &course(&[]), GenerationMode::Both).unwrap_err();
        assert!(err.is_validation());
        let wb = workbook("NAME,ROLE\nAna,instructor\n");
        let err = select_people(Some(&wb), &course(&[]), GenerationMode::Participants).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn summary_lists_courses_and_participant_count() {
        let wb = Workbook {
            sheets: vec![
                Sheet::new(
                    "Courses",
                    vec!["Course".into(), "Workload".into(), "Start Date".into()],
                    vec![vec!["Intro".into(), "20".into(), "2024-03-10".into()]],
                ),
                Sheet::new(
                    "Participants",
                    vec!["Name".into()],
                    vec![vec!["A".into()], vec!["B".into()]],
                ),
            ],
        };
        let summary = summarize(&wb);
        assert_eq!(summary.sheets, vec!["Courses", "Participants"]);
        assert_eq!(summary.courses.len(), 1);
        assert_eq!(summary.courses[0].title.as_deref(), Some("Intro"));
        assert_eq!(summary.courses[0].start_date.as_deref(), Some("2024-03-10"));
        assert_eq!(summary.participants, 2);
    }
}
