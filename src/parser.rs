use std::borrow::Cow;

use crate::{
    ast::{AstNode, Case},
    error::{Location, ParseError, ParseErrorKind},
};

type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone)]
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// The starting location of the current line
    line_start_pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            pos: 0,
            line: 1,
            line_start_pos: 0,
        }
    }

    #[inline]
    fn current_column(&self) -> usize {
        self.pos - self.line_start_pos + 1
    }

    #[inline]
    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.current_column(),
            offset: self.pos,
        }
    }

    #[inline]
    fn make_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            location: self.location(),
            kind,
        }
    }

    #[inline]
    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Advances the parser position by char_len bytes, correctly handling
    /// multi-byte characters. Updates line and column numbers if a newline is
    /// encountered.
    #[inline]
    fn advance_by_char(&mut self, current_char: char, char_len: usize) {
        if current_char == '\n' {
            self.line += 1;
            self.line_start_pos = self.pos + char_len;
        }
        self.pos += char_len;
    }

    /// Advances the parser position by `len` bytes.
    /// This method assumes that the consumed string `s` does NOT contain newlines.
    /// If it can, line/column tracking will be incorrect. Used for fixed delimiters.
    #[inline]
    fn advance_bytes_no_newline(&mut self, len: usize) {
        self.pos += len;
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek if the remaining input starts with `s`
    fn peek(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Returns the keyword of the `{% ... %}` directive at the current
    /// position without consuming anything.
    fn peek_keyword(&self) -> Option<&'a str> {
        if !self.peek("{%") {
            return None;
        }
        let mut parser = self.clone();
        parser.advance_bytes_no_newline(2);
        parser.consume_identifier().ok()
    }

    /// Whether the `{` at the current position opens a delimiter that starts
    /// one byte later, which makes the brace itself plain text.
    fn literal_brace(&self) -> bool {
        self.peek("{{%") || self.peek("{{{")
    }

    /// Consume `s` if the remaining input starts with it.
    /// Assumes `s` does not contain newlines.
    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.advance_bytes_no_newline(s.len());
            true
        } else {
            false
        }
    }

    fn consume_whitespace(&mut self) {
        while let Some(current_char) = self.current_char() {
            if !current_char.is_ascii_whitespace() {
                break;
            }
            self.advance_by_char(current_char, current_char.len_utf8());
        }
    }

    /// Expect `s` to be the start of the remaining input, consume it or return Err.
    /// Assumes `s` does not contain newlines.
    fn expect(&mut self, s: &str) -> ParseResult<()> {
        if self.consume(s) {
            Ok(())
        } else {
            let found: String = self.input[self.pos..].chars().take(s.len() + 10).collect();
            Err(self.make_error(ParseErrorKind::Expected {
                description: format!("'{}', found '{}'", s, found),
            }))
        }
    }

    /// Consume and return an identifier (alphanumeric + '_' + '.' + '-')
    fn consume_identifier(&mut self) -> ParseResult<&'a str> {
        self.consume_whitespace();
        let start = self.pos;
        while let Some(current_char) = self.current_char() {
            if current_char.is_ascii_alphanumeric() || matches!(current_char, '_' | '.' | '-') {
                self.advance_by_char(current_char, current_char.len_utf8());
            } else {
                break;
            }
        }
        if start == self.pos {
            Err(self.make_error(ParseErrorKind::Expected {
                description: "identifier".to_string(),
            }))
        } else {
            Ok(&self.input[start..self.pos])
        }
    }

    /// Parses a block of constant text until a `{{` or `{%` delimiter.
    ///
    /// `\{{` and `\{%` produce the literal delimiter; only then is the text copied.
    fn parse_constant(&mut self) -> AstNode<'a> {
        let start_pos = self.pos;
        let mut segment_start = start_pos;
        let mut unescaped: Option<String> = None;

        while let Some(current_char) = self.current_char() {
            if self.peek("\\{{") || self.peek("\\{%") {
                let buffer = unescaped.get_or_insert_with(String::new);
                buffer.push_str(&self.input[segment_start..self.pos]);
                self.advance_bytes_no_newline(1); // Skip only the backslash
                segment_start = self.pos;
                self.advance_bytes_no_newline(2); // Keep the delimiter as text
                continue;
            }

            // A `{` followed by a delimiter is literal text, as in `{{% switch` or `{{{ x }}}`.
            if self.literal_brace() {
                self.advance_bytes_no_newline(1);
                continue;
            }

            if self.peek("{{") || self.peek("{%") {
                break;
            }

            self.advance_by_char(current_char, current_char.len_utf8());
        }

        let data = match unescaped {
            Some(mut buffer) => {
                buffer.push_str(&self.input[segment_start..self.pos]);
                Cow::Owned(buffer)
            }
            None => Cow::Borrowed(&self.input[start_pos..self.pos]),
        };
        AstNode::Constant { data }
    }

    fn parse_placeholder(&mut self) -> ParseResult<AstNode<'a>> {
        let location = self.location();
        self.expect("{{")?;
        self.consume_whitespace();
        let name = self.consume_identifier()?;
        self.consume_whitespace();
        self.expect("}}")?;
        Ok(AstNode::Placeholder {
            name: Cow::Borrowed(name),
            location,
        })
    }

    fn parse_node(&mut self) -> ParseResult<AstNode<'a>> {
        if self.peek("{%") {
            self.parse_directive()
        } else if self.peek("{{") && !self.literal_brace() {
            self.parse_placeholder()
        } else {
            Ok(self.parse_constant())
        }
    }

    /// Parse nodes until EOF, or, inside a switch, until the next
    /// `{% case %}` / `{% endswitch %}` directive.
    fn parse_nodes(&mut self, in_switch: bool) -> ParseResult<Vec<AstNode<'a>>> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                if in_switch {
                    return Err(
                        self.make_error(ParseErrorKind::unexpected_eof(Some("{% endswitch %}")))
                    );
                }
                break;
            }

            if in_switch && matches!(self.peek_keyword(), Some("case" | "endswitch")) {
                break;
            }

            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    // --- Directive Parsing ---

    fn parse_directive(&mut self) -> ParseResult<AstNode<'a>> {
        let location = self.location();
        self.expect("{%")?;
        self.consume_whitespace();
        let keyword = self.consume_identifier()?;
        match keyword {
            "switch" => self.parse_switch(location),
            "case" | "endswitch" => Err(ParseError {
                location,
                kind: ParseErrorKind::OutsideSwitch {
                    keyword: keyword.to_string(),
                },
            }),
            _ => Err(ParseError {
                location,
                kind: ParseErrorKind::UnknownKeyword {
                    keyword: keyword.to_string(),
                },
            }),
        }
    }

    fn parse_switch(&mut self, location: Location) -> ParseResult<AstNode<'a>> {
        self.consume_whitespace();
        let name = self.consume_identifier()?;
        self.consume_whitespace();
        self.expect("%}")?;

        // Only whitespace may separate the switch from its first case.
        let preamble_location = self.location();
        let preamble = self.parse_nodes(true)?;
        let only_whitespace = preamble.iter().all(|node| {
            matches!(node, AstNode::Constant { data } if data.trim().is_empty())
        });
        if !only_whitespace {
            return Err(ParseError {
                location: preamble_location,
                kind: ParseErrorKind::Expected {
                    description: format!("'{{% case \"label\" %}}' after '{{% switch {name} %}}'"),
                },
            });
        }

        let mut cases: Vec<Case<'a>> = Vec::new();
        loop {
            if self.peek_keyword() == Some("endswitch") {
                self.expect("{%")?;
                self.consume_whitespace();
                self.expect("endswitch")?;
                self.consume_whitespace();
                self.expect("%}")?;
                break;
            }

            let case_location = self.location();
            self.expect("{%")?;
            self.consume_whitespace();
            self.expect("case")?;
            self.consume_whitespace();
            let label = self.parse_label()?;
            self.consume_whitespace();
            self.expect("%}")?;

            if cases.iter().any(|case| case.label == label) {
                return Err(ParseError {
                    location: case_location,
                    kind: ParseErrorKind::DuplicateCase {
                        switch: name.to_string(),
                        label: label.to_string(),
                    },
                });
            }

            let body = self.parse_nodes(true)?;
            cases.push(Case {
                label: Cow::Borrowed(label),
                body,
            });
        }

        if cases.is_empty() {
            return Err(ParseError {
                location,
                kind: ParseErrorKind::EmptySwitch {
                    switch: name.to_string(),
                },
            });
        }

        Ok(AstNode::Switch {
            name: Cow::Borrowed(name),
            location,
            cases,
        })
    }

    /// Parses a double-quoted case label. Labels cannot span lines.
    fn parse_label(&mut self) -> ParseResult<&'a str> {
        self.expect("\"")?;
        let start = self.pos;
        loop {
            match self.current_char() {
                Some('"') => break,
                Some('\n') | None => {
                    return Err(self.make_error(ParseErrorKind::Expected {
                        description: "closing '\"' for case label".to_string(),
                    }));
                }
                Some(current_char) => self.advance_by_char(current_char, current_char.len_utf8()),
            }
        }
        let label = &self.input[start..self.pos];
        self.advance_bytes_no_newline(1);
        Ok(label)
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<AstNode<'_>>, ParseError> {
    Parser::new(input).parse_nodes(false)
}

/// Tests for individual functions in the parser module.
#[cfg(test)]
mod test_utils {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_peek_keyword() {
        let parser = Parser::new("  {%     switch flag %}");
        assert_eq!(parser.peek_keyword(), None);

        let parser = Parser::new("{%     switch flag %}");
        assert_eq!(parser.peek_keyword(), Some("switch"));

        let parser = Parser::new("{%endswitch%}");
        assert_eq!(parser.peek_keyword(), Some("endswitch"));

        let parser = Parser::new("{% %}");
        assert_eq!(parser.peek_keyword(), None);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_location_tracks_lines() {
        let mut parser = Parser::new("ab\ncd");
        parser.parse_constant();
        assert_eq!(
            parser.location(),
            Location {
                line: 2,
                column: 3,
                offset: 5
            }
        );
    }
}

/// Tests for the parser module via tokenizer.
#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    // Helper macros for quick AST node creation in tests
    macro_rules! const_str {
        ($data:expr) => {
            AstNode::Constant {
                data: Cow::Borrowed($data),
            }
        };
    }

    fn placeholder_name<'a>(node: &'a AstNode<'_>) -> &'a str {
        match node {
            AstNode::Placeholder { name, .. } => name,
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_constant() {
        assert_eq!(
            tokenize(r#"{"a": {"b": {}}}"#).unwrap(),
            vec![const_str!(r#"{"a": {"b": {}}}"#)]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_placeholder() {
        let nodes = tokenize("{{name}}").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(placeholder_name(&nodes[0]), "name");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_placeholder_with_whitespace_and_dots() {
        let nodes = tokenize("{{  stack.region_name  }}").unwrap();
        assert_eq!(placeholder_name(&nodes[0]), "stack.region_name");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_constant_and_placeholder() {
        let nodes = tokenize(r#""Count": {{ n }},"#).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], const_str!(r#""Count": "#));
        assert_eq!(placeholder_name(&nodes[1]), "n");
        assert_eq!(nodes[2], const_str!(","));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_placeholder_location() {
        let nodes = tokenize("{\n  \"a\": {{ a }}\n}").unwrap();
        match &nodes[1] {
            AstNode::Placeholder { location, .. } => {
                assert_eq!(location.line, 2);
                assert_eq!(location.column, 8);
                assert_eq!(location.offset, 9);
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unclosed_placeholder() {
        let err = tokenize("{{var").unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("'}}'"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unbalanced_placeholder_delimiters() {
        let err = tokenize("{{ var }").unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("'}}'"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_placeholder() {
        let err = tokenize("{{ }}").unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("identifier"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_escaped_delimiters() {
        assert_eq!(
            tokenize(r"a \{{ b }} \{% c").unwrap(),
            vec![AstNode::Constant {
                data: Cow::Owned("a {{ b }} {% c".to_string())
            }]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_object_brace_before_switch() {
        let nodes =
            tokenize(r#"{"Resources": {{% switch lb %}{% case "a" %}"A": 1{% endswitch %}}}"#)
                .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], const_str!(r#"{"Resources": {"#));
        match &nodes[1] {
            AstNode::Switch { name, location, .. } => {
                assert_eq!(name, "lb");
                assert_eq!(location.offset, 15);
            }
            other => panic!("Expected switch, got {:?}", other),
        }
        assert_eq!(nodes[2], const_str!("}}"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_object_brace_around_placeholder() {
        // `{{{ x }}}` is a literal brace, the placeholder, then a literal brace.
        let nodes = tokenize("{{{ x }}}").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], const_str!("{"));
        assert_eq!(placeholder_name(&nodes[1]), "x");
        assert_eq!(nodes[2], const_str!("}"));

        let nodes = tokenize("{{{{% switch x %}{% case \"a\" %}{% endswitch %}").unwrap();
        assert_eq!(nodes[0], const_str!("{{{"));
        assert!(matches!(nodes[1], AstNode::Switch { .. }));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_switch() {
        let nodes =
            tokenize(r#"{% switch x %}{% case "true" %}A{% case "false" %}{% endswitch %}B"#)
                .unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            AstNode::Switch { name, cases, .. } => {
                assert_eq!(name, "x");
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].label, "true");
                assert_eq!(cases[0].body, vec![const_str!("A")]);
                assert_eq!(cases[1].label, "false");
                assert!(cases[1].body.is_empty());
                assert!(cases[1].is_optional());
                assert!(!cases[0].is_optional());
            }
            other => panic!("Expected switch, got {:?}", other),
        }
        assert_eq!(nodes[1], const_str!("B"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_switch_whitespace_preamble_is_dropped() {
        let nodes = tokenize("{%switch x%}\n  {%case \"a\"%}A{%endswitch%}").unwrap();
        match &nodes[0] {
            AstNode::Switch { cases, .. } => assert_eq!(cases[0].body, vec![const_str!("A")]),
            other => panic!("Expected switch, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_switch_content_before_first_case() {
        let err = tokenize(r#"{% switch x %}oops{% case "a" %}A{% endswitch %}"#).unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("case"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_switch() {
        let input = concat!(
            r#"{% switch outer %}"#,
            r#"{% case "a" %}{% switch inner %}{% case "b" %}{{ v }}{% endswitch %}"#,
            r#"{% case "c" %}C"#,
            r#"{% endswitch %}"#,
        );
        let nodes = tokenize(input).unwrap();
        assert_eq!(nodes.len(), 1);
        let AstNode::Switch { cases, .. } = &nodes[0] else {
            panic!("Expected switch");
        };
        assert_eq!(cases.len(), 2);
        let AstNode::Switch {
            name: inner_name,
            cases: inner_cases,
            ..
        } = &cases[0].body[0]
        else {
            panic!("Expected nested switch");
        };
        assert_eq!(inner_name, "inner");
        assert_eq!(placeholder_name(&inner_cases[0].body[0]), "v");
        assert_eq!(cases[1].body, vec![const_str!("C")]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_duplicate_case_label() {
        let input = r#"{% switch x %}{% case "a" %}A{% case "a" %}B{% endswitch %}"#;
        let err = tokenize(input).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::DuplicateCase {
                switch: "x".to_string(),
                label: "a".to_string()
            }
        );
        // The second `{% case` starts at byte 29.
        assert_eq!(err.location.offset, 29);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_switch() {
        let input = r#"{% switch x %}{% case "a" %} text"#;
        let err = tokenize(input).unwrap_err();
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.column, input.len() + 1);
        assert!(
            matches!(err.kind, ParseErrorKind::UnexpectedEOF { ref expected_what } if expected_what.contains("{% endswitch %}"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_switch_without_cases() {
        let err = tokenize("{% switch x %} {% endswitch %}").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::EmptySwitch {
                switch: "x".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_case_outside_switch() {
        let err = tokenize(r#"text {% case "a" %}"#).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::OutsideSwitch {
                keyword: "case".to_string()
            }
        );
        assert_eq!(err.location.column, 6);

        let err = tokenize("{% endswitch %}").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::OutsideSwitch { .. }));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unknown_keyword() {
        let err = tokenize("{% for x in y %}").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownKeyword {
                keyword: "for".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_case_label() {
        let err = tokenize("{% switch x %}{% case \"a %}A{% endswitch %}").unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("case label"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unquoted_case_label() {
        let err = tokenize("{% switch x %}{% case a %}A{% endswitch %}").unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("'\"'"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_switch_missing_closing_delimiter() {
        let err = tokenize("{% switch x {% case \"a\" %}{% endswitch %}").unwrap_err();
        assert_eq!(err.location.column, 13);
        assert!(
            matches!(err.kind, ParseErrorKind::Expected { ref description } if description.contains("'%}'"))
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_multibyte_text_in_error_snippet() {
        // The error snippet must not split a multi-byte character.
        let err = tokenize("{{ name ééééééééééééé").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Expected { .. }));
    }
}
