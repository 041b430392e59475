// Multipart form decoding and the immutable per-run configuration built from it.
use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::NaiveDate;
use serde::Serialize;

use crate::batch::{last_number, BatchOptions};
use crate::config::Config;
use crate::error::{CertError, Result};
use crate::records::{
    course_rows, parse_date, select_people, CourseConfig, CourseRow, GenerationMode,
    PersonRecord,
};
use crate::storage::load_template;
use crate::workbook::Workbook;

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Raw submission: text fields by name plus the two optional files.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: HashMap<String, String>,
    pub workbook: Option<Upload>,
    pub template: Option<Upload>,
}

impl Submission {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut submission = Submission::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| CertError::Upload(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "workbook" | "template" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| CertError::Upload(e.to_string()))?;
                    if bytes.is_empty() {
                        continue;
                    }
                    let upload = Some(Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                    if name == "workbook" {
                        submission.workbook = upload;
                    } else {
                        submission.template = upload;
                    }
                }
                _ => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| CertError::Upload(e.to_string()))?;
                    submission.fields.insert(name, text);
                }
            }
        }
        Ok(submission)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn course_row(&self) -> CourseRow {
        let get = |name: &str| self.field(name).map(str::to_string);
        CourseRow {
            title: get("title"),
            workload: get("workload"),
            start_date: get("start_date"),
            end_date: get("end_date"),
            program: get("program"),
            instructors: get("instructors"),
        }
    }

    pub fn values(&self) -> FormValues {
        let get = |name: &str| self.fields.get(name).cloned().unwrap_or_default();
        FormValues {
            title: get("title"),
            workload: get("workload"),
            start_date: get("start_date"),
            end_date: get("end_date"),
            program: get("program"),
            instructors: get("instructors"),
            mode: get("mode"),
            signature_date: get("signature_date"),
            start_number: get("start_number"),
            volume: get("volume"),
        }
    }
}

/// Field values echoed back into the form when it is re-rendered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormValues {
    pub title: String,
    pub workload: String,
    pub start_date: String,
    pub end_date: String,
    pub program: String,
    pub instructors: String,
    pub mode: String,
    pub signature_date: String,
    pub start_number: String,
    pub volume: String,
}

impl FormValues {
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            mode: "participants".into(),
            signature_date: today.format("%Y-%m-%d").to_string(),
            start_number: "1".into(),
            ..Default::default()
        }
    }
}

/// Everything one generation run needs, fixed before rendering starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub course: CourseConfig,
    pub people: Vec<PersonRecord>,
    pub options: BatchOptions,
    pub template: Vec<u8>,
}

impl RunConfig {
    /// Validate the submission. Failures here are shown inline and nothing
    /// is generated.
    pub fn build(submission: Submission, config: &Config, today: NaiveDate) -> Result<Self> {
        let workbook = submission
            .workbook
            .as_ref()
            .map(|u| Workbook::from_upload(&u.filename, &u.bytes))
            .transpose()?;

        let sheet_course = match (submission.field("course_index"), &workbook) {
            (Some(index), Some(wb)) => {
                let index: usize = index
                    .parse()
                    .map_err(|_| CertError::validation("Invalid course selection."))?;
                course_rows(wb).into_iter().nth(index)
            }
            _ => None,
        };
        let course = CourseConfig::from_row(
            &submission.course_row().or(sheet_course.as_ref()),
            today,
        )?;

        let mode = match submission.field("mode") {
            Some(mode) => mode.parse().map_err(CertError::Validation)?,
            None => GenerationMode::Participants,
        };
        let people = select_people(workbook.as_ref(), &course, mode)?;

        let signature_date = match submission.field("signature_date").map(parse_date) {
            Some(Ok(date)) => date,
            Some(Err(e)) => {
                tracing::warn!("signature date unusable ({}), using {}", e, today);
                today
            }
            None => today,
        };
        let start_number = match submission.field("start_number") {
            Some(n) => n
                .parse::<u32>()
                .ok()
                .filter(|&n| n >= 1)
                .ok_or_else(|| CertError::validation("Starting number must be a whole number of at least 1."))?,
            None => 1,
        };
        last_number(start_number, people.len())?;
        let volume = submission.field("volume").map(str::to_string);

        let template = load_template(
            submission.template.map(|u| u.bytes),
            &config.default_template,
        )?;

        Ok(Self {
            course,
            people,
            options: BatchOptions {
                signature_date,
                start_number,
                volume,
                city: config.city.clone(),
            },
            template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Role;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            default_template: PathBuf::from("/nonexistent/certificate.pdf"),
            city: "City".into(),
            font_family: None,
            max_upload_bytes: 1024,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn submission(fields: &[(&str, &str)]) -> Submission {
        Submission {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            workbook: Some(Upload {
                filename: "participants.csv".into(),
                bytes: b"NAME\nMaria Silva\nPedro\n".to_vec(),
            }),
            template: Some(Upload {
                filename: "t.pdf".into(),
                bytes: b"%PDF".to_vec(),
            }),
        }
    }

    #[test]
    fn builds_run_from_fields() {
        let sub = submission(&[
            ("title", "Intro to Circuits"),
            ("workload", "20"),
            ("start_date", "2024-03-10"),
            ("end_date", "2024-03-10"),
            ("program", "Intro;-Basics"),
            ("instructors", "Ana Lima"),
            ("mode", "both"),
            ("signature_date", "2024-04-02"),
            ("start_number", "5"),
            ("volume", ""),
        ]);
        let run = RunConfig::build(sub, &config(), today()).unwrap();
        assert_eq!(run.course.title, "Intro to Circuits");
        assert_eq!(run.people.len(), 3);
        assert_eq!(run.people[2].role, Role::Instructor);
        assert_eq!(run.options.start_number, 5);
        assert_eq!(run.options.volume, None);
        assert_eq!(
            run.options.signature_date,
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
        );
        assert_eq!(run.template, b"%PDF");
    }

    #[test]
    fn blank_fields_come_from_selected_course_row() {
        let mut sub = submission(&[("course_index", "1"), ("mode", "instructors")]);
        let mut zip_data = Vec::new();
        {
            use std::io::Write;
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("courses.csv", opts).unwrap();
            zip.write_all(
                b"COURSE,WORKLOAD,START_DATE,END_DATE,PROGRAM,INSTRUCTORS\n\
                  First,8,01/02/2024,01/02/2024,A,X\n\
                  Second,16,05/03/2024,06/03/2024,B;-C,Ana;Bruno\n",
            )
            .unwrap();
            zip.finish().unwrap();
        }
        sub.workbook = Some(Upload {
            filename: "data.zip".into(),
            bytes: zip_data,
        });
        let run = RunConfig::build(sub, &config(), today()).unwrap();
        assert_eq!(run.course.title, "Second");
        assert_eq!(run.course.hours, "16");
        assert_eq!(run.course.program, vec!["B", "-C"]);
        let names: Vec<_> = run.people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bruno"]);
    }

    #[test]
    fn zero_start_number_is_rejected() {
        let sub = submission(&[("title", "T"), ("workload", "1"), ("start_number", "0")]);
        assert!(RunConfig::build(sub, &config(), today()).unwrap_err().is_validation());
    }

    #[test]
    fn start_number_that_overflows_the_batch_is_rejected() {
        let sub = submission(&[("title", "T"), ("workload", "1"), ("start_number", "4294967295")]);
        assert!(RunConfig::build(sub, &config(), today()).unwrap_err().is_validation());
        let sub = submission(&[("title", "T"), ("workload", "1"), ("start_number", "4294967294")]);
        assert_eq!(RunConfig::build(sub, &config(), today()).unwrap().options.start_number, 4294967294);
    }

    #[test]
    fn missing_template_without_default_is_rejected() {
        let mut sub = submission(&[("title", "T"), ("workload", "1")]);
        sub.template = None;
        assert!(RunConfig::build(sub, &config(), today()).unwrap_err().is_validation());
    }

    #[test]
    fn unparseable_signature_date_uses_today() {
        let sub = submission(&[("title", "T"), ("workload", "1"), ("signature_date", "soon")]);
        let run = RunConfig::build(sub, &config(), today()).unwrap();
        assert_eq!(run.options.signature_date, today());
    }

    #[test]
    fn values_echo_raw_fields() {
        let sub = submission(&[("title", " Intro "), ("mode", "both")]);
        let values = sub.values();
        assert_eq!(values.title, " Intro ");
        assert_eq!(values.mode, "both");
        assert_eq!(values.volume, "");
    }
}
