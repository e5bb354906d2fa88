//! Fatal conditions raised while resolving and typechecking a module set

use crate::pos::Pos;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use rela_types::Type;
use std::ops::Range;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Name not found, bad import argument, cyclic hierarchy, malformed declaration
    #[error("syntax error at {pos}: {message}")]
    Syntax { pos: Pos, message: String },
    /// Operator or arity mismatch, residual ambiguity, wrong classification
    #[error("type error at {pos}: {message}")]
    Type { pos: Pos, message: String },
    /// A broken invariant inside the checker itself
    #[error("internal error at {pos}: {message}")]
    Internal { pos: Pos, message: String },
}

impl Error {
    pub fn syntax(pos: &Pos, message: impl Into<String>) -> Self {
        Error::Syntax { pos: pos.clone(), message: message.into() }
    }

    pub fn type_error(pos: &Pos, message: impl Into<String>) -> Self {
        Error::Type { pos: pos.clone(), message: message.into() }
    }

    pub fn internal(pos: &Pos, message: impl Into<String>) -> Self {
        Error::Internal { pos: pos.clone(), message: message.into() }
    }

    /// Type error found while computing bounding types, citing both operands
    pub fn bounding(pos: &Pos, message: &str, left: &Type, right: &Type) -> Self {
        Self::type_error(
            pos,
            format!("{}\nLeft type = {}\nRight type = {}", message, left, right),
        )
    }

    /// Type error found while narrowing to relevant types, citing both operands
    pub fn relevant(pos: &Pos, message: &str, left: &Type, right: &Type) -> Self {
        Self::type_error(
            pos,
            format!("{}\nLeft relevant type = {}\nRight relevant type = {}", message, left, right),
        )
    }

    pub fn pos(&self) -> &Pos {
        match self {
            Error::Syntax { pos, .. } | Error::Type { pos, .. } | Error::Internal { pos, .. } => pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Syntax { message, .. }
            | Error::Type { message, .. }
            | Error::Internal { message, .. } => message,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Error::Syntax { .. } => "syntax error",
            Error::Type { .. } => "type error",
            Error::Internal { .. } => "internal error",
        }
    }

    /// Build a report labelled at this error's position
    pub fn report(&self) -> Report<'static, (String, Range<usize>)> {
        self.build_report(Config::default())
    }

    fn build_report(&self, config: Config) -> Report<'static, (String, Range<usize>)> {
        let pos = self.pos();
        let file = pos.file.to_string();
        let span = pos.start..pos.end.max(pos.start);
        let (headline, detail) = match self.message().split_once('\n') {
            Some((head, rest)) => (head.to_string(), Some(rest.to_string())),
            None => (self.message().to_string(), None),
        };
        let mut report = Report::build(ReportKind::Error, file.clone(), pos.start)
            .with_config(config)
            .with_message(format!("{}: {}", self.title(), headline))
            .with_label(
                Label::new((file, span))
                    .with_message(headline)
                    .with_color(Color::Red),
            );
        if let Some(detail) = detail {
            report = report.with_note(detail);
        }
        report.finish()
    }

    /// Render the report against `source` as plain text
    pub fn render(&self, source: &str) -> String {
        let mut out = Vec::new();
        let file = self.pos().file.to_string();
        let written = self
            .build_report(Config::default().with_color(false))
            .write((file, Source::from(source.to_string())), &mut out);
        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
