use regex::Regex;

use crate::{
    TemplateError, TemplateResult, Value,
    ast::{Callee, Fragments, HelperCall, Node, PartialCall, Path},
    error::{SyntaxError, SyntaxErrorKind},
    helpers::Helper,
    lexer::{Lexer, TAG_START, Token, TokenKind},
    registry::Registry,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CompileFlags {
    /// Block heads and calls with arguments must name a registered helper.
    pub known_helpers_only: bool,
    /// Callable context values are returned as-is, never invoked.
    pub no_function_values: bool,
}

/// A `{{#...}}` block whose close tag has not been seen yet.
struct OpenBlock {
    call: HelperCall,
    then: Fragments,
    inverse: Fragments,
    in_else: bool,
    /// Opened by `{{else helper ...}}`; closed together with its enclosing block.
    chained: bool,
}

impl OpenBlock {
    fn into_node(self) -> Node {
        let mut call = self.call;
        call.then = Some(self.then);
        call.inverse = Some(self.inverse);
        Node::Helper(Box::new(call))
    }
}

/// Recursive-descent parser that compiles template source straight into nodes.
///
/// Plain text is scanned for tag openers with [`TAG_START`]; the inside of each
/// tag is tokenized by the [`Lexer`] with exactly one token of lookahead held
/// in `token`.
pub(crate) struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    token: Token<'a>,
    registry: &'a Registry,
    flags: CompileFlags,
    /// Strip trailing whitespace from the text before the current tag.
    trim_before: bool,
    /// Strip leading whitespace from the text after the last tag.
    trim_after: bool,
    root: Fragments,
    blocks: Vec<OpenBlock>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, registry: &'a Registry, flags: CompileFlags) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            token: Token {
                kind: TokenKind::End,
                text: "",
                start: 0,
            },
            registry,
            flags,
            trim_before: false,
            trim_after: false,
            root: Fragments::default(),
            blocks: Vec::new(),
        }
    }

    pub fn parse(mut self) -> TemplateResult<Fragments> {
        let source = self.source;
        let mut pos = 0;
        let mut search = 0;
        let mut plaintext = String::new();

        while pos < source.len() {
            self.trim_before = false;
            let Some(captures) = TAG_START.captures_at(source, search) else {
                if pos == 0 {
                    return Ok(Fragments(vec![Node::Const(Value::from(source))]));
                }
                plaintext.push_str(&source[pos..]);
                self.push_plaintext(&plaintext);
                break;
            };
            let Some(tag) = captures.get(0) else {
                break;
            };
            plaintext.push_str(&source[pos..tag.start()]);

            // `\x` drops the backslash and keeps `x` as text.
            if let Some(escaped) = captures.get(5) {
                pos = escaped.start();
                search = escaped.end();
                continue;
            }

            let group = |index| captures.get(index).map_or("", |m| m.as_str());
            self.trim_before = !group(2).is_empty() || !group(3).is_empty();
            let sigil = if group(1).is_empty() { group(4) } else { group(1) };

            self.push_plaintext(&plaintext);
            self.trim_after = false;
            plaintext.clear();

            if let Some(style) = sigil.strip_prefix('!') {
                let terminator = if style.is_empty() { "}}" } else { "--}}" };
                let Some(found) = source[tag.end()..].find(terminator) else {
                    return Err(SyntaxError::at(
                        source,
                        tag.start(),
                        SyntaxErrorKind::UnterminatedComment,
                    )
                    .into());
                };
                pos = tag.end() + found + terminator.len();
            } else {
                self.lexer.seek(tag.end());
                self.advance()?;
                self.eat(TokenKind::Space)?;
                match sigil {
                    "{" => self.unquoted(1)?,
                    "&" => self.unquoted(0)?,
                    "^" => self.negated_section()?,
                    "#" => self.section()?,
                    "/" => self.close_section()?,
                    ">" => self.partial()?,
                    "{{" => self.raw_block()?,
                    _ => self.quoted()?,
                }
                pos = self.lexer.offset();
            }
            search = pos;
        }

        if let Some(block) = self.blocks.last() {
            return Err(self.error(SyntaxErrorKind::BlockStillOpen {
                name: block.call.name.clone(),
            }));
        }
        Ok(self.root)
    }

    fn error(&self, kind: SyntaxErrorKind) -> TemplateError {
        SyntaxError::at(self.source, self.token.start, kind).into()
    }

    fn advance(&mut self) -> TemplateResult<()> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    fn eat(&mut self, kind: TokenKind) -> TemplateResult<bool> {
        if self.token.kind == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> TemplateResult<()> {
        if self.eat(kind)? {
            Ok(())
        } else {
            Err(self.error(SyntaxErrorKind::UnexpectedToken {
                found: self.token.text.to_string(),
            }))
        }
    }

    fn current(&mut self) -> &mut Fragments {
        match self.blocks.last_mut() {
            Some(block) if block.in_else => &mut block.inverse,
            Some(block) => &mut block.then,
            None => &mut self.root,
        }
    }

    fn plain_node(&self, text: &str) -> Option<Node> {
        let mut text = text;
        if self.trim_after {
            text = text.trim_start();
        }
        if self.trim_before {
            text = text.trim_end();
        }
        (!text.is_empty()).then(|| Node::Const(Value::from(text)))
    }

    fn push_plaintext(&mut self, text: &str) {
        if let Some(node) = self.plain_node(text) {
            self.current().push(node);
        }
    }

    /// Consumes the tag closer: optional space, optional `~`, then `extra + 2`
    /// braces. The last brace stays as the lookahead token.
    fn end_tag(&mut self, extra: usize) -> TemplateResult<()> {
        self.eat(TokenKind::Space)?;
        if self.eat(TokenKind::Tilde)? {
            self.trim_after = true;
        }
        for _ in 0..=extra {
            self.expect(TokenKind::End)?;
        }
        if self.token.kind != TokenKind::End {
            return Err(self.error(SyntaxErrorKind::ExpectedTagEnd {
                found: self.token.text.to_string(),
            }));
        }
        Ok(())
    }

    /// `a.b/[c d]`, unwrapping bracketed names. With `keep_separators` the
    /// separators are kept as their own entries.
    fn ident_list(&mut self, required: bool, keep_separators: bool) -> TemplateResult<Option<Vec<String>>> {
        if self.token.kind != TokenKind::Ident {
            return if required {
                Err(self.error(SyntaxErrorKind::ExpectedIdentList))
            } else {
                Ok(None)
            };
        }

        let mut names = Vec::new();
        while self.token.kind == TokenKind::Ident {
            names.push(self.token.ident().to_string());
            self.advance()?;
            if !matches!(self.token.kind, TokenKind::Dot | TokenKind::Slash) {
                return Ok(Some(names));
            }
            if keep_separators {
                names.push(self.token.text.to_string());
            }
            self.advance()?;
        }
        Err(self.error(SyntaxErrorKind::ExpectedIdentAfterSeparator))
    }

    fn parse_const(&mut self) -> TemplateResult<Option<Node>> {
        let value = match self.token.kind {
            TokenKind::Const => {
                let text = self.token.text;
                if text.starts_with(['"', '\'']) {
                    Value::from(unescape(text.get(1..text.len() - 1).unwrap_or_default()))
                } else {
                    Value::from(text.parse::<f64>().unwrap_or(f64::NAN))
                }
            }
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            _ => return Ok(None),
        };
        self.advance()?;
        Ok(Some(Node::Const(value)))
    }

    /// `@`-prefixed, `this`, `./` and `../` aware value reference.
    fn parse_simple_value(&mut self, run_func: bool) -> TemplateResult<Option<Node>> {
        let run_func = run_func && !self.flags.no_function_values;
        let data = self.eat(TokenKind::At)?;
        let mut current = false;
        let mut up = 0;

        if self.eat(TokenKind::This)? {
            current = true;
            if !self.eat(TokenKind::Dot)? {
                return Ok(Some(Node::This { data, up }));
            }
        } else {
            while self.eat(TokenKind::Dot)? {
                if self.eat(TokenKind::Dot)? {
                    up += 1;
                    if !self.eat(TokenKind::Slash)? {
                        return Ok(Some(Node::This { data, up }));
                    }
                } else if self.eat(TokenKind::Slash)? {
                    current = true;
                } else {
                    return Ok(Some(Node::This { data, up }));
                }
            }
        }

        let names = self.ident_list(current || up > 0, false)?;
        Ok(names.map(|names| {
            Node::Path(Path {
                names,
                data,
                up,
                run_func,
            })
        }))
    }

    fn parse_value_extended(&mut self) -> TemplateResult<Option<Node>> {
        if let Some(node) = self.parse_simple_value(true)? {
            return Ok(Some(node));
        }
        if let Some(node) = self.parse_const()? {
            return Ok(Some(node));
        }
        if self.eat(TokenKind::Open)? {
            self.eat(TokenKind::Space)?;
            let node = self.parse_expression()?;
            self.expect(TokenKind::Close)?;
            return Ok(Some(node));
        }
        Ok(None)
    }

    fn parse_helper_arg(
        &mut self,
        args: &mut Vec<Node>,
        hash: &mut Vec<(String, Node)>,
    ) -> TemplateResult<bool> {
        if let Some(mut names) = self.ident_list(false, false)? {
            if names.len() == 1 && self.eat(TokenKind::Eq)? {
                let Some(value) = self.parse_value_extended()? else {
                    return Err(self.error(SyntaxErrorKind::NoValueAfterEq));
                };
                hash.push((names.remove(0), value));
            } else {
                args.push(Node::Path(Path {
                    names,
                    data: false,
                    up: 0,
                    run_func: !self.flags.no_function_values,
                }));
            }
            return Ok(true);
        }

        match self.parse_value_extended()? {
            Some(node) => {
                args.push(node);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn parse_args(&mut self) -> TemplateResult<(Vec<Node>, Vec<(String, Node)>)> {
        let mut args = Vec::new();
        let mut hash = Vec::new();
        while self.eat(TokenKind::Space)? && self.parse_helper_arg(&mut args, &mut hash)? {}
        Ok((args, hash))
    }

    fn registered(&self, names: &[String]) -> Option<Helper> {
        match names {
            [name] => self.registry.helper(name).cloned(),
            _ => None,
        }
    }

    /// Parses `head args... key=value...`, returning the call and the offset
    /// where its head starts.
    fn parse_call(&mut self, block: bool) -> TemplateResult<(HelperCall, usize)> {
        let start = self.token.start;
        let callee = if let Some(names) = self.ident_list(false, false)? {
            match self.registered(&names) {
                Some(helper) => Callee::Static(helper),
                None => Callee::Dynamic(Node::Path(Path {
                    names,
                    data: false,
                    up: 0,
                    run_func: false,
                })),
            }
        } else if let Some(node) = self.parse_simple_value(false)? {
            Callee::Dynamic(node)
        } else {
            return Err(self.error(SyntaxErrorKind::InvalidExpression));
        };
        let name = self.source[start..self.token.start].to_string();

        let (args, hash) = self.parse_args()?;
        let fallback = if block {
            "blockHelperMissing"
        } else {
            "helperMissing"
        };

        let call = HelperCall {
            callee,
            fallback: self.registry.helper(fallback).cloned(),
            args,
            hash,
            then: None,
            inverse: None,
            name,
            skip_level: false,
        };
        Ok((call, start))
    }

    fn check_known(&self, call: &HelperCall) -> TemplateResult<()> {
        if self.flags.known_helpers_only && matches!(call.callee, Callee::Dynamic(_)) {
            return Err(self.error(SyntaxErrorKind::UnknownHelper {
                name: call.name.clone(),
            }));
        }
        Ok(())
    }

    fn parse_block_call(&mut self) -> TemplateResult<HelperCall> {
        let (call, _) = self.parse_call(true)?;
        self.check_known(&call)?;
        Ok(call)
    }

    /// A non-block expression. A head that is neither a registered helper nor
    /// given any arguments is re-read as a plain value reference, which invokes
    /// callable values.
    fn parse_expression(&mut self) -> TemplateResult<Node> {
        let (call, start) = self.parse_call(false)?;
        if matches!(call.callee, Callee::Dynamic(_)) && call.args.is_empty() && call.hash.is_empty() {
            self.lexer.seek(start);
            self.advance()?;
            return self
                .parse_simple_value(true)?
                .ok_or_else(|| self.error(SyntaxErrorKind::InvalidExpression));
        }
        self.check_known(&call)?;
        Ok(Node::Helper(Box::new(call)))
    }

    fn open_block(&mut self, call: HelperCall, chained: bool) {
        self.blocks.push(OpenBlock {
            call,
            then: Fragments::default(),
            inverse: Fragments::default(),
            in_else: false,
            chained,
        });
    }

    fn unquoted(&mut self, extra: usize) -> TemplateResult<()> {
        let node = self.parse_expression()?;
        self.end_tag(extra)?;
        self.current().push(Node::Unquoted(Box::new(node)));
        Ok(())
    }

    fn quoted(&mut self) -> TemplateResult<()> {
        if self.eat(TokenKind::Else)? {
            let in_else = self.blocks.last().is_some_and(|block| block.in_else);
            if !in_else
                && self.eat(TokenKind::Space)?
                && !matches!(self.token.kind, TokenKind::Tilde | TokenKind::End)
            {
                return self.chained_else();
            }
            return self.swap_else();
        }

        let node = self.parse_expression()?;
        self.end_tag(0)?;
        self.current().push(Node::Quoted(Box::new(node)));
        Ok(())
    }

    /// `{{else}}` and `{{^}}`: switch the innermost block to its inverse body.
    fn swap_else(&mut self) -> TemplateResult<()> {
        match self.blocks.last().map(|block| block.in_else) {
            None => return Err(self.error(SyntaxErrorKind::ElseOutsideBlock)),
            Some(true) => return Err(self.error(SyntaxErrorKind::MultipleElse)),
            Some(false) => {}
        }
        if let Some(block) = self.blocks.last_mut() {
            block.in_else = true;
        }
        self.end_tag(0)
    }

    /// `{{else helper args}}`: the inverse body becomes a new block that shares
    /// the enclosing block's close tag.
    fn chained_else(&mut self) -> TemplateResult<()> {
        if self.blocks.is_empty() {
            return Err(self.error(SyntaxErrorKind::ElseOutsideBlock));
        }
        if let Some(block) = self.blocks.last_mut() {
            block.in_else = true;
        }

        let mut call = self.parse_block_call()?;
        call.skip_level = true;
        self.open_block(call, true);
        self.end_tag(0)
    }

    fn section(&mut self) -> TemplateResult<()> {
        let call = self.parse_block_call()?;
        self.open_block(call, false);
        self.end_tag(0)
    }

    /// `{{^value}}` opens a section that renders when `value` is empty. A bare
    /// `{{^}}` is an else marker.
    fn negated_section(&mut self) -> TemplateResult<()> {
        if matches!(self.token.kind, TokenKind::Tilde | TokenKind::End) {
            return self.swap_else();
        }

        let start = self.token.start;
        let Some(value) = self.parse_simple_value(false)? else {
            return Err(self.error(SyntaxErrorKind::NegatedSectionValue));
        };
        let call = HelperCall {
            callee: Callee::Dynamic(Node::Not(Box::new(value))),
            fallback: self.registry.helper("blockHelperMissing").cloned(),
            args: Vec::new(),
            hash: Vec::new(),
            then: None,
            inverse: None,
            name: self.source[start..self.token.start].to_string(),
            skip_level: false,
        };
        self.open_block(call, false);
        self.end_tag(0)
    }

    fn close_section(&mut self) -> TemplateResult<()> {
        let source = self.source;
        let start = self.token.start;
        self.ident_list(false, false)?;
        let name = &source[start..self.token.start];
        self.end_tag(0)?;

        loop {
            let Some(block) = self.blocks.pop() else {
                return Err(SyntaxError::at(source, start, SyntaxErrorKind::UnbalancedClose).into());
            };
            let chained = block.chained;
            if !chained && block.call.name != name {
                return Err(SyntaxError::at(
                    source,
                    start,
                    SyntaxErrorKind::MismatchedClose {
                        open: block.call.name,
                        close: name.to_string(),
                    },
                )
                .into());
            }
            let node = block.into_node();
            self.current().push(node);
            if !chained {
                return Ok(());
            }
        }
    }

    /// `{{{{helper args}}}}body{{{{/helper}}}}`: the body is kept verbatim.
    fn raw_block(&mut self) -> TemplateResult<()> {
        let mut call = self.parse_block_call()?;
        self.end_tag(2)?;

        let raw_end_error = |parser: &Self, name: &str| {
            parser.error(SyntaxErrorKind::RawEndTagMismatch {
                name: name.to_string(),
            })
        };
        let pattern = format!(
            r"\{{\{{\{{\{{(~)?/\s*{}\s*(~)?\}}\}}\}}\}}",
            regex::escape(&call.name)
        );
        let closer = Regex::new(&pattern).map_err(|_| raw_end_error(self, &call.name))?;

        let body_start = self.lexer.offset();
        let Some(captures) = closer.captures_at(self.source, body_start) else {
            return Err(raw_end_error(self, &call.name));
        };
        let Some(close) = captures.get(0) else {
            return Err(raw_end_error(self, &call.name));
        };

        self.trim_before = captures.get(1).is_some();
        let mut body = Fragments::default();
        if let Some(node) = self.plain_node(&self.source[body_start..close.start()]) {
            body.push(node);
        }
        call.then = Some(body);
        self.current().push(Node::Helper(Box::new(call)));

        self.trim_after = captures.get(2).is_some();
        self.lexer.seek(close.end());
        Ok(())
    }

    fn partial(&mut self) -> TemplateResult<()> {
        let start = self.token.start;
        let name = self
            .ident_list(true, true)?
            .map(|parts| parts.concat())
            .unwrap_or_default();
        let Some(target) = self.registry.partial(&name, self.flags)? else {
            return Err(
                SyntaxError::at(self.source, start, SyntaxErrorKind::MissingPartial { name }).into(),
            );
        };

        let (args, hash) = self.parse_args()?;
        self.end_tag(0)?;
        self.current().push(Node::Partial(PartialCall {
            name,
            target,
            args,
            hash,
        }));
        Ok(())
    }
}

/// Drops the backslash of every `\x` pair inside a quoted constant.
fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) if next != '\n' => unescaped.push(next),
                Some(next) => {
                    unescaped.push(ch);
                    unescaped.push(next);
                }
                None => unescaped.push(ch),
            },
            other => unescaped.push(other),
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(source: &str, flags: CompileFlags) -> TemplateResult<Fragments> {
        let registry = Registry::default();
        Parser::new(source, &registry, flags).parse()
    }

    fn parse(source: &str) -> TemplateResult<Fragments> {
        parse_with(source, CompileFlags::default())
    }

    fn syntax_kind(source: &str) -> SyntaxErrorKind {
        match parse(source) {
            Err(TemplateError::Syntax(err)) => err.kind,
            other => panic!("expected a syntax error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_plain_text_is_single_const() {
        let fragments = parse("  just text  ").unwrap();
        assert_eq!(fragments.0.len(), 1);
        assert!(matches!(&fragments.0[0], Node::Const(Value::String(s)) if &**s == "  just text  "));
    }

    #[test]
    fn test_empty_template() {
        assert!(parse("").unwrap().0.is_empty());
    }

    #[test]
    fn test_bare_name_becomes_invoking_path() {
        let fragments = parse("{{ foo.bar }}").unwrap();
        let [Node::Quoted(inner)] = fragments.0.as_slice() else {
            panic!("expected a single quoted node");
        };
        let Node::Path(path) = inner.as_ref() else {
            panic!("expected a path");
        };
        assert_eq!(path.names, ["foo", "bar"]);
        assert!(path.run_func);
        assert!(!path.data);
    }

    #[test]
    fn test_no_function_values_masks_invocation() {
        let flags = CompileFlags {
            known_helpers_only: true,
            no_function_values: true,
        };
        let fragments = parse_with("{{ foo }}", flags).unwrap();
        let [Node::Quoted(inner)] = fragments.0.as_slice() else {
            panic!("expected a single quoted node");
        };
        assert!(matches!(inner.as_ref(), Node::Path(path) if !path.run_func));
    }

    #[test]
    fn test_registered_helper_is_static() {
        let fragments = parse("{{lookup obj 'k' }}").unwrap();
        let [Node::Quoted(inner)] = fragments.0.as_slice() else {
            panic!("expected a single quoted node");
        };
        let Node::Helper(call) = inner.as_ref() else {
            panic!("expected a helper call");
        };
        assert!(matches!(call.callee, Callee::Static(_)));
        assert_eq!(call.name, "lookup");
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn test_hash_and_subexpression() {
        let fragments = parse("{{#with a k=(lookup b 'c') n=1 s=\"x\\\"y\"}}{{/with}}").unwrap();
        let [Node::Helper(call)] = fragments.0.as_slice() else {
            panic!("expected a block helper");
        };
        let keys: Vec<&str> = call.hash.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["k", "n", "s"]);
        assert!(matches!(call.hash[0].1, Node::Helper(_)));
        assert!(matches!(&call.hash[1].1, Node::Const(Value::Number(n)) if *n == 1.0));
        assert!(matches!(&call.hash[2].1, Node::Const(Value::String(s)) if &**s == "x\"y"));
    }

    #[test]
    fn test_up_and_data_paths() {
        let fragments = parse("{{../../a}}{{@../index}}{{..}}{{this}}{{./b}}").unwrap();
        let paths: Vec<&Node> = fragments
            .0
            .iter()
            .map(|node| match node {
                Node::Quoted(inner) => inner.as_ref(),
                other => other,
            })
            .collect();
        assert!(matches!(paths[0], Node::Path(p) if p.up == 2 && p.names == ["a"]));
        assert!(matches!(paths[1], Node::Path(p) if p.up == 1 && p.data));
        assert!(matches!(paths[2], Node::This { data: false, up: 1 }));
        assert!(matches!(paths[3], Node::This { data: false, up: 0 }));
        assert!(matches!(paths[4], Node::Path(p) if p.up == 0 && p.names == ["b"]));
    }

    #[test]
    fn test_else_chain_nests_in_inverse() {
        let fragments = parse("{{#if a}}A{{else if b}}B{{else}}C{{/if}}").unwrap();
        let [Node::Helper(outer)] = fragments.0.as_slice() else {
            panic!("expected a block helper");
        };
        assert!(!outer.skip_level);
        let inverse = outer.inverse.as_ref().unwrap();
        let [Node::Helper(chained)] = inverse.0.as_slice() else {
            panic!("expected the chained block in the inverse body");
        };
        assert!(chained.skip_level);
        assert_eq!(chained.inverse.as_ref().unwrap().0.len(), 1);
    }

    #[test]
    fn test_raw_block_keeps_body() {
        let fragments = parse("{{{{noop}}}} {{x}} {{{{/noop}}}}").unwrap();
        let [Node::Helper(call)] = fragments.0.as_slice() else {
            panic!("expected a raw block");
        };
        let body = call.then.as_ref().unwrap();
        assert!(matches!(&body.0[..], [Node::Const(Value::String(s))] if &**s == " {{x}} "));
        assert!(call.inverse.is_none());
    }

    #[test]
    fn test_block_errors() {
        assert_eq!(
            syntax_kind("{{#foo}}"),
            SyntaxErrorKind::BlockStillOpen {
                name: "foo".to_string()
            }
        );
        assert_eq!(
            syntax_kind("{{#foo}}{{/bar}}"),
            SyntaxErrorKind::MismatchedClose {
                open: "foo".to_string(),
                close: "bar".to_string()
            }
        );
        assert_eq!(syntax_kind("{{/bar}}"), SyntaxErrorKind::UnbalancedClose);
        assert_eq!(syntax_kind("{{#if a}}{{^}}{{^}}{{/if}}"), SyntaxErrorKind::MultipleElse);
        assert_eq!(syntax_kind("{{#if a}}{{else}}{{^}}{{/if}}"), SyntaxErrorKind::MultipleElse);
        assert_eq!(syntax_kind("{{else}}"), SyntaxErrorKind::ElseOutsideBlock);
        assert_eq!(syntax_kind("{{^}}"), SyntaxErrorKind::ElseOutsideBlock);
    }

    #[test]
    fn test_path_errors() {
        assert_eq!(
            syntax_kind("{{ foo/../asd }}"),
            SyntaxErrorKind::ExpectedIdentAfterSeparator
        );
        assert_eq!(syntax_kind("{{ //qwe }}"), SyntaxErrorKind::InvalidExpression);
        assert_eq!(
            syntax_kind("{{ foo[a] }}"),
            SyntaxErrorKind::UnexpectedToken {
                found: "[a]".to_string()
            }
        );
        assert_eq!(
            syntax_kind("{{ foo[] }}"),
            SyntaxErrorKind::UnknownSymbol {
                symbol: "[".to_string()
            }
        );
        assert_eq!(syntax_kind("{{# }}"), SyntaxErrorKind::InvalidExpression);
        assert_eq!(syntax_kind("{{#with a b=}}{{/with}}"), SyntaxErrorKind::NoValueAfterEq);
    }

    #[test]
    fn test_comment_errors() {
        assert_eq!(syntax_kind("{{!  "), SyntaxErrorKind::UnterminatedComment);
        assert_eq!(syntax_kind("{{!-- }} "), SyntaxErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_known_helpers_only() {
        let flags = CompileFlags {
            known_helpers_only: true,
            no_function_values: false,
        };
        assert!(parse_with("{{#if a}}{{/if}}", flags).is_ok());
        assert!(parse_with("{{ plain.value }}", flags).is_ok());
        let Err(TemplateError::Syntax(err)) = parse_with("{{#custom a}}{{/custom}}", flags) else {
            panic!("expected an unknown helper error");
        };
        assert_eq!(
            err.kind,
            SyntaxErrorKind::UnknownHelper {
                name: "custom".to_string()
            }
        );
        assert!(parse_with("{{custom a}}", flags).is_err());
    }

    #[test]
    fn test_missing_partial() {
        assert_eq!(
            syntax_kind("{{> undef }}"),
            SyntaxErrorKind::MissingPartial {
                name: "undef".to_string()
            }
        );
    }

    #[test]
    fn test_error_positions() {
        let Err(TemplateError::Syntax(err)) = parse("{{ \"") else {
            panic!("expected a syntax error");
        };
        assert_eq!((err.line, err.column), (1, 4));

        let Err(err) = parse("1\n2\n{{ \"") else {
            panic!("expected a syntax error");
        };
        assert!(err.to_string().contains("[Line 3 col 4]"));

        let Err(err) = parse("\n   {{ \" ") else {
            panic!("expected a syntax error");
        };
        assert!(err.to_string().contains("[Line 2 col 7]"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"qwe\'z\\"), r"qwe'z\");
        assert_eq!(unescape(r#"a\"b"#), "a\"b");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
