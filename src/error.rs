pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    UnexpectedEnd,
    UnknownSymbol { symbol: String },
    UnexpectedToken { found: String },
    ExpectedIdentList,
    ExpectedIdentAfterSeparator,
    InvalidExpression,
    NoValueAfterEq,
    ExpectedTagEnd { found: String },
    MultipleElse,
    ElseOutsideBlock,
    UnbalancedClose,
    MismatchedClose { open: String, close: String },
    BlockStillOpen { name: String },
    UnterminatedComment,
    RawEndTagMismatch { name: String },
    UnknownHelper { name: String },
    MissingPartial { name: String },
    NegatedSectionValue,
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "Unexpected end of template"),
            Self::UnknownSymbol { symbol } => write!(f, "Unknown symbol: {}", symbol),
            Self::UnexpectedToken { found } => write!(f, "Unexpected token {}", found),
            Self::ExpectedIdentList => write!(f, "Expect ident list"),
            Self::ExpectedIdentAfterSeparator => write!(f, "Expect IDENT after . or /"),
            Self::InvalidExpression => write!(f, "Failed to parse expression"),
            Self::NoValueAfterEq => write!(f, "No value after '='"),
            Self::ExpectedTagEnd { found } => write!(f, "Expect '}}}}' got {}", found),
            Self::MultipleElse => write!(f, "Multiple else blocks"),
            Self::ElseOutsideBlock => write!(f, "Else outside of a block"),
            Self::UnbalancedClose => write!(f, "Unbalanced section close"),
            Self::MismatchedClose { open, close } => write!(
                f,
                "Close section expects matching ident: old='{}' new='{}'",
                open, close
            ),
            Self::BlockStillOpen { name } => write!(f, "Block still open: {}", name),
            Self::UnterminatedComment => write!(f, "Unterminated comment block"),
            Self::RawEndTagMismatch { name } => write!(f, "Raw end tag mismatch for '{}'", name),
            Self::UnknownHelper { name } => {
                write!(f, "Only known helpers are allowed, got: {}", name)
            }
            Self::MissingPartial { name } => write!(f, "Missing partial: {}", name),
            Self::NegatedSectionValue => write!(f, "'^' section requires a simple value"),
        }
    }
}

impl std::error::Error for SyntaxErrorKind {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token, counted in characters.
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    /// Builds an error positioned at byte `offset` of `source`.
    pub(crate) fn at(source: &str, offset: usize, kind: SyntaxErrorKind) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
        Self {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            kind,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [Line {} col {}]", self.kind, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateError {
    Syntax(SyntaxError),
    WrongArgumentCount {
        helper: String,
        got: usize,
        expected: usize,
    },
    MissingHelper {
        name: String,
    },
    /// A self-including partial that never finished compiling.
    MissingPartial {
        name: String,
    },
    Helper {
        message: String,
    },
}

impl TemplateError {
    /// Error raised from inside a user supplied helper.
    pub fn helper<M: Into<String>>(message: M) -> Self {
        Self::Helper {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(syntax_error) => write!(f, "{}", syntax_error),
            Self::WrongArgumentCount {
                helper,
                got,
                expected,
            } => write!(
                f,
                "Wrong number of arguments to '{}': got {} expect {}",
                helper, got, expected
            ),
            Self::MissingHelper { name } => write!(f, "Missing helper: {}", name),
            Self::MissingPartial { name } => write!(f, "Missing partial: {}", name),
            Self::Helper { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(syntax_error) => Some(syntax_error),
            Self::WrongArgumentCount { .. }
            | Self::MissingHelper { .. }
            | Self::MissingPartial { .. }
            | Self::Helper { .. } => None,
        }
    }
}

impl From<SyntaxError> for TemplateError {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let err = SyntaxError::at("{{ \"", 3, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!((err.line, err.column), (1, 4));
    }

    #[test]
    fn test_position_after_newlines() {
        let err = SyntaxError::at("1\n2\n{{ \"", 7, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!((err.line, err.column), (3, 4));
        assert!(err.to_string().ends_with("[Line 3 col 4]"));
    }

    #[test]
    fn test_position_counts_characters() {
        let err = SyntaxError::at("ää{{", 4, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn test_arity_message() {
        let err = TemplateError::WrongArgumentCount {
            helper: "with".to_string(),
            got: 2,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "Wrong number of arguments to 'with': got 2 expect 1"
        );
    }
}
