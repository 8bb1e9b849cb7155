//!
//! Script diagnostics rendered with miette
//!
//! Read errors point into the script source with a labeled span, so a bad
//! escape or an unclosed list shows the offending line.
//!

use miette::{Diagnostic, LabeledSpan, NamedSource, Report, SourceSpan};
use thiserror::Error;

use crate::reader::{ReadError, ReadErrorKind};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScriptDiagnostic {
    message: String,
    src: NamedSource<String>,
    span: SourceSpan,
    label: String,
    help_text: Option<String>,
}

impl Diagnostic for ScriptDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new("hostsql::read"))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_primary_with_span(
            Some(self.label.clone()),
            self.span,
        ))))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help_text
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>)
    }
}

impl ScriptDiagnostic {
    pub fn from_read_error(err: &ReadError, name: &str, source: &str) -> Self {
        let (line, col) = line_col(source, err.span.start);
        Self {
            message: format!("parse error at {}:{}", line, col),
            src: NamedSource::new(name, source.to_string()),
            span: (err.span.start, err.span.len()).into(),
            label: err.kind.to_string(),
            help_text: help(&err.kind),
        }
    }
}

fn help(kind: &ReadErrorKind) -> Option<String> {
    match kind {
        ReadErrorKind::UnclosedList => Some("add a closing `)`".to_string()),
        ReadErrorKind::UnclosedString => Some("add a closing `\"`".to_string()),
        ReadErrorKind::InvalidEscape(_) => {
            Some("strings accept \\\" \\\\ \\n \\t; unibyte strings also \\xHH".to_string())
        }
        _ => None,
    }
}

/// 1-based line and column of a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}

pub fn report_read_error(err: &ReadError, name: &str, source: &str) {
    let report = Report::new(ScriptDiagnostic::from_read_error(err, name, source));
    eprintln!("{:?}", report);
}
