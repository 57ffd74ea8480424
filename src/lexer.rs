use std::sync::LazyLock;

use regex::Regex;

use crate::error::{SyntaxError, SyntaxErrorKind};

/// Intra-tag token grammar. Groups: 1 constant, 2 identifier, 3 whitespace, 4 any other symbol.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"('(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|-?[0-9]+(?:[.][0-9]+)?\b)"#,
        r#"|([^\x00-\x20\x7F\s!"\#%\&'()*+,./;<=>@\[\\\]^`{|}\~]+|\[[^\]]+\])"#,
        r"|(\s+)",
        r"|(.)",
    ))
    .expect("token grammar is valid")
});

/// Tag openers in plain text. Groups: 1 brace run after `{{`, 2 trim marker after it,
/// 3 trim marker before a sigil, 4 sigil, 5 backslash-escaped character.
pub(crate) static TAG_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:(\{\{?)(~?)|(~?)(!--|[\&\#^/>!]?))|\\(.)").expect("tag grammar is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TokenKind {
    Ident,
    Space,
    Dot,
    Open,
    Close,
    Eq,
    Const,
    Tilde,
    End,
    At,
    Slash,
    This,
    True,
    False,
    Else,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the template source.
    pub start: usize,
}

impl Token<'_> {
    /// Identifier text with bracket quoting removed.
    pub fn ident(&self) -> &str {
        self.text
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(self.text)
    }
}

/// Tokenizer for the inside of a tag. It can be repositioned with [`Lexer::seek`],
/// which is how the parser hops between tags and re-scans expressions.
pub(crate) struct Lexer<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }

    /// Byte offset just past the last produced token.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.offset;
        let captures = TOKEN
            .captures_at(self.source, start)
            .filter(|captures| captures.get(0).is_some_and(|m| m.start() == start))
            .ok_or_else(|| SyntaxError::at(self.source, start, SyntaxErrorKind::UnexpectedEnd))?;

        let (kind, text) = if let Some(constant) = captures.get(1) {
            (TokenKind::Const, constant.as_str())
        } else if let Some(ident) = captures.get(2) {
            let kind = match ident.as_str() {
                "else" => TokenKind::Else,
                "this" => TokenKind::This,
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                _ => TokenKind::Ident,
            };
            (kind, ident.as_str())
        } else if let Some(space) = captures.get(3) {
            (TokenKind::Space, space.as_str())
        } else {
            let symbol = captures.get(4).map_or("", |m| m.as_str());
            let kind = match symbol {
                "." => TokenKind::Dot,
                "(" => TokenKind::Open,
                ")" => TokenKind::Close,
                "=" => TokenKind::Eq,
                "~" => TokenKind::Tilde,
                "}" => TokenKind::End,
                "@" => TokenKind::At,
                "/" => TokenKind::Slash,
                _ => {
                    return Err(SyntaxError::at(
                        self.source,
                        start,
                        SyntaxErrorKind::UnknownSymbol {
                            symbol: symbol.to_string(),
                        },
                    ));
                }
            };
            (kind, symbol)
        };

        self.offset = start + text.len();
        Ok(Token { kind, text, start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        while lexer.offset() < source.len() {
            kinds.push(lexer.next_token().unwrap().kind);
        }
        kinds
    }

    #[test]
    fn test_path_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("../foo.bar/[baz qux]}}"),
            [Dot, Dot, Slash, Ident, Dot, Ident, Slash, Ident, End, End]
        );
    }

    #[test]
    fn test_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("else this true false elsewhere"),
            [Else, Space, This, Space, True, Space, False, Space, Ident]
        );
    }

    #[test]
    fn test_constants() {
        let mut lexer = Lexer::new(r#"'it\'s' "q\"q" -12.5 7x"#);
        let texts: Vec<(TokenKind, &str)> = std::iter::from_fn(|| {
            let token = lexer.next_token().ok()?;
            Some((token.kind, token.text))
        })
        .filter(|(kind, _)| *kind != TokenKind::Space)
        .collect();
        assert_eq!(
            texts,
            [
                (TokenKind::Const, r"'it\'s'"),
                (TokenKind::Const, r#""q\"q""#),
                (TokenKind::Const, "-12.5"),
                (TokenKind::Ident, "7x"),
            ]
        );
    }

    #[test]
    fn test_hash_and_subexpression() {
        use TokenKind::*;
        assert_eq!(
            kinds("src=(add 1 @index)~"),
            [Ident, Eq, Open, Ident, Space, Const, Space, At, Ident, Close, Tilde]
        );
    }

    #[test]
    fn test_bracket_ident_is_unwrapped() {
        let mut lexer = Lexer::new("[@weird]");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Ident);
        assert_eq!(token.ident(), "@weird");
    }

    #[test]
    fn test_unknown_symbol() {
        let mut lexer = Lexer::new("foo[]");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(
            err.kind,
            SyntaxErrorKind::UnknownSymbol {
                symbol: "[".to_string()
            }
        );
        assert_eq!((err.line, err.column), (1, 4));
    }

    #[test]
    fn test_end_of_input() {
        let mut lexer = Lexer::new("ab");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_tag_start_groups() {
        let captures = TAG_START.captures("x {{~#each}}").unwrap();
        assert_eq!(captures.get(3).unwrap().as_str(), "~");
        assert_eq!(captures.get(4).unwrap().as_str(), "#");

        let captures = TAG_START.captures("{{{{raw}}}}").unwrap();
        assert_eq!(captures.get(1).unwrap().as_str(), "{{");

        let captures = TAG_START.captures(r"a\{{b}}").unwrap();
        assert_eq!(captures.get(5).unwrap().as_str(), "{");
    }
}
