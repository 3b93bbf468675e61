use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of syntax errors stored before the parser gives up.
pub const MAX_ERRORS: usize = 20;

/// Numeric syntax error code (E100–E199).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    /// No grammar alternative matched at the reported position.
    pub const UNEXPECTED_INPUT: Self = Self(100);
    /// A numeric literal was started but is not well formed (`1.`, `12ab`).
    pub const MALFORMED_NUMBER: Self = Self(101);
    /// A complete program was parsed but input remains.
    pub const TRAILING_INPUT: Self = Self(102);
    pub const NESTING_TOO_DEEP: Self = Self(103);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured GenLang syntax error.
///
/// Carries the position of the failure and the set of alternatives the
/// grammar tried there, so hosts can render diagnostics without parsing
/// free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Source file name.
    pub file: String,
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// Labels of the alternatives tried at `span`, sorted and deduplicated.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expected: Vec<String>,
    /// The source line containing the error, for context.
    pub source_line: String,
}

impl SyntaxError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            message: message.into(),
            span,
            expected: Vec::new(),
            source_line: source_line.into(),
        }
    }

    /// Attach the expected-alternative set.
    pub fn with_expected<I, S>(mut self, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = expected.into_iter().map(Into::into).collect();
        self.expected.sort();
        self.expected.dedup();
        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.span, self.code, self.message)?;
        if !self.expected.is_empty() {
            write!(f, " (expected one of: {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// All syntax errors collected during one parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
    /// Number of errors seen, including those dropped past the storage cap.
    pub total_errors: usize,
    #[serde(skip)]
    max_errors: usize,
}

impl SyntaxErrors {
    pub fn empty() -> Self {
        Self::with_capacity_limit(MAX_ERRORS)
    }

    /// Create an empty collection storing at most `max_errors` entries.
    pub fn with_capacity_limit(max_errors: usize) -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
            max_errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// `true` once the storage cap has been reached.
    pub fn is_full(&self) -> bool {
        self.total_errors >= self.max_errors
    }

    /// Add an error, respecting the storage cap.
    pub fn push(&mut self, error: SyntaxError) {
        if self.errors.len() < self.max_errors {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SyntaxError> {
        self.errors.iter()
    }
}

impl Default for SyntaxErrors {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for SyntaxErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        if self.total_errors > self.errors.len() {
            write!(
                f,
                "\n... and {} more",
                self.total_errors - self.errors.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxErrors {}
