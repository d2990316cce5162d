use {
    crate::parser::{
        is_word_char, parse_keyword_or_symbol, parse_string_literal, Expected, Expr, KConfigError, LocToken, Located,
        Location, Preprocessor, Token,
    },
    std::{iter::FusedIterator, ops::Deref, path::Path},
};

/// An iterator over a string slice from a file that returns characters and can peek at the next character.
///
/// This is more powerful than Peekable<Chars>:
/// * It can peek at more than the next character.
/// * [`&str`][str] methods such as [`starts_with()`][str::starts_with()] can be used via [`Deref`][Deref].
/// * It can return the location of the current character.
#[derive(Clone, Debug)]
pub struct PeekableChars<'buf> {
    base: &'buf str,
    offset: usize,
    location: Location,
}

impl<'buf> PeekableChars<'buf> {
    /// Create a new PeekableChars from a string slice and filename.
    pub fn new(base: &'buf str, filename: &Path) -> Self {
        Self::with_location(base, Location::start_of(filename))
    }

    /// Create a new PeekableChars whose first character is at `location`.
    pub fn with_location(base: &'buf str, location: Location) -> Self {
        Self {
            base,
            offset: 0,
            location,
        }
    }

    /// Returns the location of the next character.
    #[inline(always)]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Returns true if there are no more bytes to read.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.base.len()
    }

    /// Peek at the next character in the string.
    #[inline(always)]
    pub fn peek(&self) -> Option<char> {
        self.base[self.offset..].chars().next()
    }

    /// Peek at the nth character in the string.
    #[inline(always)]
    pub fn peek_at(&self, n: usize) -> Option<char> {
        self.base[self.offset..].chars().nth(n)
    }

    /// Read characters until the given predicate returns true or the end of the string is reached.
    pub fn read_until(&mut self, predicate: impl Fn(char) -> bool) -> &'buf str {
        let start = self.offset;

        while let Some(c) = self.peek() {
            if predicate(c) {
                break;
            }
            _ = self.next();
        }

        &self.base[start..self.offset]
    }
}

impl<'buf> Deref for PeekableChars<'buf> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.base[self.offset..]
    }
}

impl<'buf> Iterator for PeekableChars<'buf> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        Some(c)
    }
}

impl<'buf> FusedIterator for PeekableChars<'buf> {}

/// Reads physical lines from a Kconfig file and joins backslash-continued lines into logical lines.
#[derive(Debug)]
pub struct LineReader<'buf> {
    data: &'buf str,
    offset: usize,
    line: u32,
    filename: &'static Path,
}

impl<'buf> LineReader<'buf> {
    /// Create a reader over the contents of `filename`.
    pub fn new(data: &'buf str, filename: &Path) -> Self {
        let location = Location::start_of(filename);
        Self {
            data,
            offset: 0,
            line: 1,
            filename: location.filename,
        }
    }

    /// Returns the location of the start of the next line.
    #[inline(always)]
    pub fn location(&self) -> Location {
        Location {
            filename: self.filename,
            line: self.line,
            column: 1,
        }
    }

    fn peek_physical(&self) -> Option<&'buf str> {
        if self.offset >= self.data.len() {
            return None;
        }

        let rest = &self.data[self.offset..];
        let line = rest.split('\n').next().unwrap_or(rest);
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    fn next_physical(&mut self) -> Option<&'buf str> {
        let line = self.peek_physical()?;
        let rest = &self.data[self.offset..];
        self.offset += match rest.find('\n') {
            Some(i) => i + 1,
            None => rest.len(),
        };
        self.line += 1;
        Some(line)
    }

    /// Read a logical line. If a line ends with a backslash, the next line is appended to it, omitting the
    /// backslash-newline combination.
    ///
    /// Returns `None` at end-of-file.
    pub fn read_line(&mut self) -> Option<(Location, String)> {
        let location = self.location();
        let mut line = self.next_physical()?.to_string();

        while line.ends_with('\\') {
            line.pop();
            match self.next_physical() {
                Some(next) => line.push_str(next),
                None => break,
            }
        }

        Some((location, line))
    }

    /// Read a help block.
    ///
    /// The first non-blank line determines the indentation of the block. The block continues until a non-blank
    /// line is found that is indented less than the first line. Tabs count to the next multiple of 8 columns.
    /// The indentation is removed from every line and trailing blank lines are dropped.
    pub fn read_help_block(&mut self) -> String {
        while let Some(line) = self.peek_physical() {
            if !line.trim().is_empty() {
                break;
            }
            _ = self.next_physical();
        }

        let Some(first) = self.peek_physical() else {
            return String::new();
        };

        let indent = indentation(first);
        if indent == 0 {
            return String::new();
        }

        let mut lines: Vec<String> = Vec::new();

        while let Some(line) = self.peek_physical() {
            if line.trim().is_empty() {
                lines.push(String::new());
            } else if indentation(line) < indent {
                break;
            } else {
                let expanded = expand_tabs(line);
                lines.push(expanded[indent..].trim_end().to_string());
            }
            _ = self.next_physical();
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}

fn expand_tabs(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - result.chars().count() % 8;
            result.extend(std::iter::repeat(' ').take(pad));
        } else {
            result.push(c);
        }
    }
    result
}

fn indentation(line: &str) -> usize {
    let expanded = expand_tabs(line);
    expanded.len() - expanded.trim_start().len()
}

/// Lines of tokens from a single file, expanded and tokenized on demand so that macro variables defined by
/// earlier statements (including those in sourced files) are visible to later lines.
#[derive(Debug)]
pub struct TokenLines<'buf> {
    reader: LineReader<'buf>,
    pushed: Option<Vec<LocToken>>,
}

impl<'buf> TokenLines<'buf> {
    /// Create a token stream over the contents of `filename`.
    pub fn new(data: &'buf str, filename: &Path) -> Self {
        Self {
            reader: LineReader::new(data, filename),
            pushed: None,
        }
    }

    /// Returns the location of the next unread line.
    #[inline(always)]
    pub fn location(&self) -> Location {
        self.reader.location()
    }

    /// Returns the file being read.
    #[inline(always)]
    pub fn filename(&self) -> &'static Path {
        self.reader.filename
    }

    /// Return a line to the stream; the next call to [`next_line()`][TokenLines::next_line] returns it again.
    pub fn push_back(&mut self, line: Vec<LocToken>) {
        debug_assert!(self.pushed.is_none(), "only one line may be pushed back");
        self.pushed = Some(line);
    }

    /// Read the next non-empty line of tokens.
    ///
    /// Macro assignments are consumed by the preprocessor and never returned. A line consisting of only a `help`
    /// keyword is returned as [`Token::Help`] followed by a [`Token::StrLit`] holding the help text.
    pub fn next_line(&mut self, pp: &mut Preprocessor) -> Result<Option<Vec<LocToken>>, KConfigError> {
        if let Some(line) = self.pushed.take() {
            return Ok(Some(line));
        }

        while let Some((location, raw)) = self.reader.read_line() {
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if pp.try_assignment(trimmed, location)? {
                continue;
            }

            let location = location.at_column((raw.len() - trimmed.len()) as u32 + 1);
            let mut tokens = if trimmed.contains("$(") {
                tokenize_line(&pp.expand(trimmed, location)?, location)?
            } else {
                tokenize_line(trimmed, location)?
            };

            if tokens.is_empty() {
                continue;
            }

            if tokens.len() == 1 && tokens[0].token == Token::Help {
                let start = self.reader.location();
                tokens.push(LocToken::new(Token::StrLit(self.reader.read_help_block()), start));
            }

            return Ok(Some(tokens));
        }

        Ok(None)
    }
}

/// Split a logical line into tokens.
pub fn tokenize_line(line: &str, location: Location) -> Result<Vec<LocToken>, KConfigError> {
    let mut chars = PeekableChars::with_location(line, location);
    let mut tokens = Vec::new();

    while let Some(c) = chars.peek() {
        let start = chars.location();

        match c {
            '#' => break,

            c if c.is_whitespace() => {
                _ = chars.next();
            }

            '"' | '\'' => {
                let s = parse_string_literal(&mut chars, c)?;
                tokens.push(LocToken::new(Token::StrLit(s), start));
            }

            '&' if chars.starts_with("&&") => {
                _ = chars.next();
                _ = chars.next();
                tokens.push(LocToken::new(Token::And, start));
            }

            '|' if chars.starts_with("||") => {
                _ = chars.next();
                _ = chars.next();
                tokens.push(LocToken::new(Token::Or, start));
            }

            '=' => {
                _ = chars.next();
                tokens.push(LocToken::new(Token::Eq, start));
            }

            '!' | '<' | '>' => {
                _ = chars.next();
                let with_eq = chars.peek() == Some('=');
                if with_eq {
                    _ = chars.next();
                }

                let op = match (c, with_eq) {
                    ('!', false) => Token::Not,
                    ('!', true) => Token::Ne,
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    _ => Token::Ge,
                };
                tokens.push(LocToken::new(op, start));
            }

            '(' => {
                _ = chars.next();
                tokens.push(LocToken::new(Token::LParen, start));
            }

            ')' => {
                _ = chars.next();
                tokens.push(LocToken::new(Token::RParen, start));
            }

            c if is_word_char(c) => {
                let token = parse_keyword_or_symbol(&mut chars)?;
                tokens.push(token);
            }

            _ => return Err(KConfigError::syntax(format!("unexpected character {c:?}"), start)),
        }
    }

    Ok(tokens)
}

/// An iterator over a single line of tokens that can peek ahead at the next token without consuming it.
#[derive(Debug)]
pub struct TokenLine<'buf> {
    base: &'buf [LocToken],
    offset: usize,
}

impl<'buf> TokenLine<'buf> {
    /// Create a new `TokenLine` from the given slice of tokens.
    pub fn new(base: &'buf [LocToken]) -> Self {
        Self {
            base,
            offset: 0,
        }
    }

    /// Returns the remaining number of tokens to read in the line.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.base.len() - self.offset
    }

    /// Returns true if there are no more tokens to read.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.base.len()
    }

    /// Peek at the next token in the line.
    #[inline(always)]
    pub fn peek(&self) -> Option<&'buf LocToken> {
        self.base.get(self.offset)
    }

    /// Returns the location of the last token consumed, or of the first token if nothing was consumed yet.
    pub fn last_location(&self) -> Option<Location> {
        self.base.get(self.offset.saturating_sub(1)).map(Located::location)
    }

    /// Fail if there are any tokens left in the line.
    pub fn expect_eol(&mut self) -> Result<(), KConfigError> {
        match self.next() {
            Some(unexpected) => Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location())),
            None => Ok(()),
        }
    }

    /// Read a command followed by a symbol from the line.
    pub fn read_cmd_sym(&mut self, require_eol: bool) -> Result<(&'buf LocToken, String), KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected keyword");
        };

        let Some(name) = self.next() else {
            return Err(KConfigError::missing(Expected::Symbol, cmd.location()));
        };

        let Some(name) = name.symbol_value() else {
            return Err(KConfigError::unexpected(name, Expected::Symbol, name.location()));
        };

        if require_eol {
            self.expect_eol()?;
        }

        Ok((cmd, name.to_string()))
    }

    /// Read a command followed by a string literal from the line.
    pub fn read_cmd_str_lit(&mut self, require_eol: bool) -> Result<(&'buf LocToken, String), KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected keyword");
        };

        let Some(str_lit) = self.next() else {
            return Err(KConfigError::missing(Expected::StringLiteral, cmd.location()));
        };

        let Some(str_lit) = str_lit.string_literal_value() else {
            return Err(KConfigError::unexpected(str_lit, Expected::StringLiteral, str_lit.location()));
        };

        if require_eol {
            self.expect_eol()?;
        }

        Ok((cmd, str_lit.to_string()))
    }

    /// Read an `if <expr>` expression, if present.
    pub fn read_if_expr(&mut self, require_eol: bool) -> Result<Option<Expr>, KConfigError> {
        let Some(if_token) = self.next() else {
            return Ok(None);
        };

        if if_token.token != Token::If {
            return Err(KConfigError::unexpected(if_token, Expected::IfOrEol, if_token.location()));
        }

        let expr = Expr::parse(if_token.location(), self)?;

        if require_eol {
            self.expect_eol()?;
        }

        Ok(Some(expr))
    }

    /// Read the help text from a `help` block.
    ///
    /// This is tokenized as [`Token::Help`] followed by a [`Token::StrLit`].
    pub fn read_help(&mut self) -> Result<String, KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected help keyword");
        };

        let Some(text) = self.next() else {
            return Err(KConfigError::missing(Expected::StringLiteral, cmd.location()));
        };

        let Some(text) = text.string_literal_value() else {
            return Err(KConfigError::unexpected(text, Expected::StringLiteral, text.location()));
        };

        self.expect_eol()?;
        Ok(text.to_string())
    }
}

impl<'buf> Iterator for TokenLine<'buf> {
    type Item = &'buf LocToken;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.peek()?;
        self.offset += 1;
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl<'buf> FusedIterator for TokenLine<'buf> {}
