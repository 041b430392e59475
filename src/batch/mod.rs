// Batch assembly: one certificate per person, numbered in record order.
use chrono::NaiveDate;

use crate::compose::{compose_program, compose_statement, format_date};
use crate::error::{CertError, Result};
use crate::pdf::{
    merge_overlays, render_program_page, render_statement_page, unencodable, FontSet,
    ProgramPage, TemplatePdf,
};
use crate::records::{CertificateNumber, CourseConfig, PersonRecord, Role};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub signature_date: NaiveDate,
    pub start_number: u32,
    pub volume: Option<String>,
    /// Place printed before the signature date.
    pub city: String,
}

/// A finished certificate and where it goes in the archive.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub path: String,
    pub pdf: Vec<u8>,
}

/// Keep letters, digits and whitespace (any script), trimming the ends.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn artifact_path(role: Role, number: CertificateNumber, name: &str) -> String {
    format!("{}/{} - {}.pdf", role.folder(), number, sanitize_name(name))
}

/// Render one certificate against an already parsed template.
pub fn render_certificate(
    person: &PersonRecord,
    number: CertificateNumber,
    course: &CourseConfig,
    options: &BatchOptions,
    template: &TemplatePdf,
    fonts: &FontSet,
) -> Result<Vec<u8>> {
    let signature = format!("{}, {}", options.city, format_date(options.signature_date));
    let statement = compose_statement(person, course);
    let missing = unencodable(&statement.plain());
    if !missing.is_empty() {
        tracing::warn!(
            "Certificate {} for {:?}: {:?} not printable with the built-in fonts, shown as '?'",
            number,
            person.name,
            missing
        );
    }
    let program = compose_program(&course.program);

    let mut overlays = vec![render_statement_page(
        template.page_size(0)?,
        &statement,
        &signature,
        fonts,
    )];
    if template.output_pages() > 1 {
        let page = ProgramPage {
            program: &program,
            instructors: &course.instructors,
            volume: options.volume.as_deref(),
            number,
            signature: &signature,
        };
        overlays.push(render_program_page(template.page_size(1)?, &page, fonts));
    }

    merge_overlays(template, &overlays, fonts)
}

/// Number of the last certificate in a batch of `count` starting at
/// `start_number`. Fails when the run would go past the largest number.
pub fn last_number(start_number: u32, count: usize) -> Result<CertificateNumber> {
    u32::try_from(count.saturating_sub(1))
        .ok()
        .and_then(|offset| start_number.checked_add(offset))
        .map(CertificateNumber)
        .ok_or_else(|| {
            CertError::validation(format!(
                "Starting number {} is too large for {} certificate(s).",
                start_number, count
            ))
        })
}

/// Produce every certificate of the batch in record order. Any failure
/// aborts the batch and nothing is returned.
pub fn assemble(
    people: &[PersonRecord],
    course: &CourseConfig,
    options: &BatchOptions,
    template_bytes: &[u8],
    fonts: &FontSet,
) -> Result<Vec<OutputArtifact>> {
    last_number(options.start_number, people.len())?;
    let template = TemplatePdf::parse(template_bytes)?;
    tracing::info!(
        "Rendering {} certificate(s) on a {}-page template, starting at {}",
        people.len(),
        template.page_count(),
        CertificateNumber(options.start_number)
    );

    let mut artifacts = Vec::with_capacity(people.len());
    for (position, person) in people.iter().enumerate() {
        let number = CertificateNumber(options.start_number + position as u32);
        let pdf = render_certificate(person, number, course, options, &template, fonts)?;
        let path = artifact_path(person.role, number, &person.name);
        tracing::debug!("Rendered {} ({} bytes)", path, pdf.len());
        artifacts.push(OutputArtifact { path, pdf });
    }
    Ok(artifacts)
}
