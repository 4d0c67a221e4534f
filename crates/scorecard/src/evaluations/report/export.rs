use std::fmt::Write as _;
use std::io;

use super::ReportDocument;

pub const CSV_HEADER: [&str; 5] = ["Framework", "Criterion", "Subcriterion", "Score", "Weight"];

/// Separates the pages of the text rendering; every framework starts on a new page.
pub const TEXT_PAGE_BREAK: char = '\x0c';

const TITLE_WIDTH: usize = 44;

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Csv(csv::Error),
    Utf8(std::string::FromUtf8Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write report: {}", err),
            ExportError::Csv(err) => write!(f, "failed to encode report spreadsheet: {}", err),
            ExportError::Utf8(err) => write!(f, "report spreadsheet is not valid UTF-8: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Utf8(err) => Some(err),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Utf8(err)
    }
}

/// One row per subcriterion, blank cells left empty.
pub fn write_csv<W: io::Write>(document: &ReportDocument, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for framework in &document.frameworks {
        for criterion in &framework.criteria {
            for sub in &criterion.subcriteria {
                let score = sub.score.map(|score| score.to_string()).unwrap_or_default();
                writer.write_record([
                    framework.framework.as_str(),
                    criterion.title.as_str(),
                    sub.title.as_str(),
                    score.as_str(),
                    sub.priority_label,
                ])?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn render_csv(document: &ReportDocument) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(document, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Paginated plain-text rendering of the report.
pub fn render_text(document: &ReportDocument) -> String {
    let pages: Vec<String> = document
        .frameworks
        .iter()
        .map(|framework| {
            let mut page = String::new();
            let _ = writeln!(page, "{}", document.title);
            let _ = writeln!(page, "Framework: {}", framework.framework);

            for criterion in &framework.criteria {
                let _ = writeln!(page);
                let _ = writeln!(
                    page,
                    "{} | Score: {} | Weight: {}",
                    criterion.title, criterion.score_display, criterion.priority_label
                );
                let _ = writeln!(page, "  {:<TITLE_WIDTH$} {:>5}  Weight", "Subcriterion", "Score");
                for sub in &criterion.subcriteria {
                    let score = sub.score.map(|score| score.to_string()).unwrap_or_default();
                    let _ = writeln!(
                        page,
                        "  {:<TITLE_WIDTH$} {:>5}  {}",
                        sub.title, score, sub.priority_label
                    );
                }
            }

            let _ = writeln!(page);
            let _ = writeln!(page, "{:<TITLE_WIDTH$} {:>6}  Weight", "Criterion", "Score");
            for line in &framework.summary {
                let _ = writeln!(
                    page,
                    "{:<TITLE_WIDTH$} {:>6}  {}",
                    line.criterion, line.score_display, line.priority_label
                );
            }
            let _ = writeln!(
                page,
                "{:<TITLE_WIDTH$} {:>6}",
                "Final Score", framework.final_score_display
            );
            page
        })
        .collect();

    pages.join(format!("{TEXT_PAGE_BREAK}\n").as_str())
}
