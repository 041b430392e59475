// Spreadsheet ingestion: every supported upload becomes a set of named sheets
// with canonical headers and plain string cells.
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use regex::Regex;

use crate::error::{CertError, Result};

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.iter().map(|h| normalize_header(h)).collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn column(&self, canonical: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == canonical)
    }

    /// Cell at `row`/`col`, trimmed; `None` when the cell is missing or blank.
    pub fn cell(&self, row: usize, col: Option<usize>) -> Option<&str> {
        let value = self.rows.get(row)?.get(col?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Rows that carry at least one non-blank cell.
    pub fn data_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Load an uploaded workbook, choosing the reader from the file extension.
    pub fn from_upload(filename: &str, bytes: &[u8]) -> Result<Self> {
        let path = Path::new(filename);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet1");

        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::from_spreadsheet(bytes),
            "csv" => Ok(Self {
                sheets: vec![sheet_from_csv(stem, bytes)?],
            }),
            "zip" => Self::from_csv_archive(bytes),
            other => Err(CertError::Workbook(format!(
                "unsupported spreadsheet type {:?} (expected xlsx, ods, csv or zip)",
                other
            ))),
        }
    }

    pub fn from_spreadsheet(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let mut rows = range.rows();
            let headers = match rows.next() {
                Some(header) => header.iter().map(cell_to_string).collect(),
                None => Vec::new(),
            };
            let rows = rows
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();
            sheets.push(Sheet::new(name, headers, rows));
        }
        Ok(Self { sheets })
    }

    pub fn from_csv_archive(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut sheets = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let path = Path::new(&name);
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("sheet")
                .to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            sheets.push(sheet_from_csv(&stem, &data)?);
        }
        if sheets.is_empty() {
            return Err(CertError::Workbook("zip contains no .csv sheets".into()));
        }
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Case-insensitive lookup trying each accepted name in turn.
    pub fn sheet(&self, names: &[&str]) -> Option<&Sheet> {
        names.iter().find_map(|wanted| {
            self.sheets
                .iter()
                .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
        })
    }

    pub fn courses(&self) -> Option<&Sheet> {
        self.sheet(&["courses", "cursos"])
    }

    /// The participants sheet, or the first sheet when none is named so.
    pub fn participants(&self) -> Option<&Sheet> {
        self.sheet(&["participants", "participantes"])
            .or_else(|| self.sheets.first())
    }
}

fn header_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_\-]+").expect("static regex"))
}

/// Canonical column key: uppercase with whitespace, `_` and `-` removed, and
/// known aliases folded onto one name.
pub fn normalize_header(raw: &str) -> String {
    let key = header_separators()
        .replace_all(raw.trim(), "")
        .to_uppercase();
    match key.as_str() {
        "NOME" => "NAME".to_string(),
        "TIPO" => "ROLE".to_string(),
        "CURSO" => "COURSE".to_string(),
        "CARGAHORARIA" | "HOURS" => "WORKLOAD".to_string(),
        "DATAINICIO" => "STARTDATE".to_string(),
        "DATAFIM" => "ENDDATE".to_string(),
        "PROGRAMA" => "PROGRAM".to_string(),
        "MINISTRANTES" => "INSTRUCTORS".to_string(),
        _ => key,
    }
}

fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    // max_by_key keeps the last maximum, so comma wins ties
    [b'\t', b';', b',']
        .into_iter()
        .max_by_key(|d| first_line.iter().filter(|&&b| b == *d).count())
        .unwrap_or(b',')
}

fn sheet_from_csv(name: &str, bytes: &[u8]) -> Result<Sheet> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(bytes))
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Sheet::new(name, headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => dt.date().format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn headers_fold_case_spacing_and_aliases() {
        assert_eq!(normalize_header(" Start Date "), "STARTDATE");
        assert_eq!(normalize_header("start_date"), "STARTDATE");
        assert_eq!(normalize_header("DataInicio"), "STARTDATE");
        assert_eq!(normalize_header("Carga Horaria"), "WORKLOAD");
        assert_eq!(normalize_header("nome"), "NAME");
        assert_eq!(normalize_header("Email"), "EMAIL");
    }

    #[test]
    fn csv_upload_becomes_named_sheet() {
        let data = "Name;Role\nMaria Silva;participant\n;\nJoão;instructor\n";
        let wb = Workbook::from_upload("participants.csv", data.as_bytes()).unwrap();
        let sheet = wb.participants().unwrap();
        assert_eq!(sheet.name, "participants");
        assert_eq!(sheet.headers, vec!["NAME", "ROLE"]);
        assert_eq!(sheet.data_rows().count(), 2);
        assert_eq!(sheet.cell(2, sheet.column("NAME")), Some("João"));
    }

    #[test]
    fn first_sheet_stands_in_for_participants() {
        let wb = Workbook::from_upload("people.csv", b"NAME\nAna\n").unwrap();
        assert_eq!(wb.participants().unwrap().name, "people");
        assert!(wb.courses().is_none());
    }

    #[test]
    fn zip_of_csv_files_yields_sheets() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("Cursos.csv", options).unwrap();
            zip.write_all(b"CURSO,CARGAHORARIA\nIntro,20\n").unwrap();
            zip.start_file("participantes.csv", options).unwrap();
            zip.write_all(b"NOME\nMaria\n").unwrap();
            zip.start_file("readme.txt", options).unwrap();
            zip.write_all(b"ignored").unwrap();
            zip.finish().unwrap();
        }
        let wb = Workbook::from_upload("data.zip", &buf).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Cursos", "participantes"]);
        let courses = wb.courses().unwrap();
        assert_eq!(courses.cell(0, courses.column("WORKLOAD")), Some("20"));
        assert_eq!(wb.participants().unwrap().name, "participantes");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Workbook::from_upload("notes.txt", b"x").unwrap_err();
        assert!(matches!(err, CertError::Workbook(_)));
    }

    #[test]
    fn corrupt_spreadsheet_reports_workbook_error() {
        let err = Workbook::from_upload("broken.xlsx", b"not a zip").unwrap_err();
        assert!(matches!(err, CertError::Workbook(_)));
    }
}
