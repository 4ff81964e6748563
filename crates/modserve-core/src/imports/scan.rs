//! Import specifier scanner.
//!
//! Single pass over the source bytes, without full parsing. Comments,
//! string literals, template literals and regular expressions are skipped so
//! that `import` inside them is never reported. Every token this scanner
//! cares about is ASCII, so all reported offsets land on UTF-8 boundaries.

use thiserror::Error;

/// One recognized import occurrence.
///
/// Offsets are byte offsets into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportRecord {
    /// Start of the specifier text.
    ///
    /// Static imports: first byte inside the quotes. Dynamic imports: first
    /// byte of the call argument. `import.meta`: the `i` of `import`.
    pub specifier_start: usize,
    /// End (exclusive) of the specifier text.
    pub specifier_end: usize,
    /// Argument start of a dynamic `import(...)` call, `None` for static
    /// imports and `import.meta`.
    pub dynamic_start: Option<usize>,
}

impl ImportRecord {
    #[must_use]
    pub fn new_static(start: usize, end: usize) -> Self {
        Self {
            specifier_start: start,
            specifier_end: end,
            dynamic_start: None,
        }
    }

    #[must_use]
    pub fn new_dynamic(arg_start: usize, arg_end: usize) -> Self {
        Self {
            specifier_start: arg_start,
            specifier_end: arg_end,
            dynamic_start: Some(arg_start),
        }
    }

    /// Whether this is a dynamic `import(...)` call.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_start.is_some()
    }

    /// The specifier text within `source`.
    #[must_use]
    pub fn specifier<'a>(&self, source: &'a str) -> &'a str {
        &source[self.specifier_start..self.specifier_end]
    }
}

/// The source is not valid module syntax.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {pos}")]
pub struct ScanError {
    /// Byte offset of the offending construct.
    pub pos: usize,
    pub message: String,
}

impl ScanError {
    fn new(pos: usize, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

/// Produces import records for a module's source.
pub trait ImportScanner: Send + Sync {
    /// Records in strictly ascending, non-overlapping offset order.
    fn scan(&self, source: &str) -> Result<Vec<ImportRecord>, ScanError>;
}

/// The default hand-written scanner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexScanner;

impl ImportScanner for LexScanner {
    fn scan(&self, source: &str) -> Result<Vec<ImportRecord>, ScanError> {
        scan_imports(source)
    }
}

/// Scan source code for import specifiers.
pub fn scan_imports(source: &str) -> Result<Vec<ImportRecord>, ScanError> {
    let mut scanner = Scanner {
        src: source.as_bytes(),
        pos: 0,
        records: Vec::new(),
        braces: Vec::new(),
        last: Last::Start,
    };
    scanner.run()?;
    Ok(scanner.records)
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// The last significant token, used to tell division from regex literals.
#[derive(Debug, Clone, Copy)]
enum Last {
    Start,
    Punct,
    Value,
    Word(usize, usize),
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    records: Vec<ImportRecord>,
    /// One entry per open `{`; `true` when it opened a template `${`.
    braces: Vec<bool>,
    last: Last,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

impl<'a> Scanner<'a> {
    fn run(&mut self) -> Result<(), ScanError> {
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' => match self.peek(1) {
                    Some(b'/') => self.pos = self.skip_line_comment(self.pos),
                    Some(b'*') => self.pos = self.skip_block_comment(self.pos)?,
                    _ if self.regex_allowed() => {
                        self.pos = self.skip_regex(self.pos)?;
                        self.last = Last::Value;
                    }
                    _ => {
                        self.pos += 1;
                        self.last = Last::Punct;
                    }
                },
                b'\'' | b'"' => {
                    self.pos = self.string_end(self.pos)? + 1;
                    self.last = Last::Value;
                }
                b'`' => {
                    self.pos = self.template_continue(self.pos + 1, self.pos)?;
                    self.last = Last::Value;
                }
                b'{' => {
                    self.braces.push(false);
                    self.pos += 1;
                    self.last = Last::Punct;
                }
                b'}' => {
                    self.pos += 1;
                    if self.braces.pop() == Some(true) {
                        self.pos = self.template_continue(self.pos, self.pos - 1)?;
                        self.last = Last::Value;
                    } else {
                        self.last = Last::Punct;
                    }
                }
                b')' | b']' => {
                    self.pos += 1;
                    self.last = Last::Value;
                }
                _ if is_ident_byte(b) => {
                    let start = self.pos;
                    let end = self.word_end(start);
                    self.pos = end;
                    self.last = Last::Word(start, end);
                    match &self.src[start..end] {
                        b"import" if !self.member_access(start) => self.import_at(start, end)?,
                        b"export" if !self.member_access(start) => self.export_at(end)?,
                        _ => {}
                    }
                }
                _ => {
                    self.pos += 1;
                    self.last = Last::Punct;
                }
            }
        }

        if self.braces.contains(&true) {
            return Err(ScanError::new(self.src.len(), "Unterminated template literal"));
        }
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn word_end(&self, mut i: usize) -> usize {
        while i < self.src.len() && is_ident_byte(self.src[i]) {
            i += 1;
        }
        i
    }

    fn word_at(&self, i: usize) -> &'a [u8] {
        let src: &'a [u8] = self.src;
        &src[i..self.word_end(i)]
    }

    /// `foo.import` / `foo?.import` is a property, not the keyword.
    fn member_access(&self, start: usize) -> bool {
        let mut i = start;
        while i > 0 && self.src[i - 1].is_ascii_whitespace() {
            i -= 1;
        }
        i > 0 && self.src[i - 1] == b'.' && !self.src[..i].ends_with(b"...")
    }

    fn regex_allowed(&self) -> bool {
        match self.last {
            Last::Start | Last::Punct => true,
            Last::Value => false,
            Last::Word(start, end) => {
                let word = &self.src[start..end];
                REGEX_KEYWORDS.iter().any(|k| k.as_bytes() == word)
            }
        }
    }

    fn skip_line_comment(&self, mut i: usize) -> usize {
        while i < self.src.len() && self.src[i] != b'\n' {
            i += 1;
        }
        i
    }

    fn skip_block_comment(&self, start: usize) -> Result<usize, ScanError> {
        let mut i = start + 2;
        while i + 1 < self.src.len() {
            if self.src[i] == b'*' && self.src[i + 1] == b'/' {
                return Ok(i + 2);
            }
            i += 1;
        }
        Err(ScanError::new(start, "Unterminated comment"))
    }

    /// Skip whitespace and comments starting at `i`.
    fn skip_trivia(&self, mut i: usize) -> Result<usize, ScanError> {
        while i < self.src.len() {
            match self.src[i] {
                b' ' | b'\t' | b'\n' | b'\r' => i += 1,
                b'/' if self.src.get(i + 1) == Some(&b'/') => i = self.skip_line_comment(i),
                b'/' if self.src.get(i + 1) == Some(&b'*') => i = self.skip_block_comment(i)?,
                _ => break,
            }
        }
        Ok(i)
    }

    /// Index of the closing quote of the string literal opening at `start`.
    fn string_end(&self, start: usize) -> Result<usize, ScanError> {
        let quote = self.src[start];
        let mut i = start + 1;
        while i < self.src.len() {
            match self.src[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b == quote => return Ok(i),
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated string literal"))
    }

    /// Continue a template literal body at `i`. Returns the position after
    /// the closing backtick, or after `${` (pushing a template brace).
    fn template_continue(&mut self, mut i: usize, start: usize) -> Result<usize, ScanError> {
        while i < self.src.len() {
            match self.src[i] {
                b'\\' => i += 2,
                b'`' => return Ok(i + 1),
                b'$' if self.src.get(i + 1) == Some(&b'{') => {
                    self.braces.push(true);
                    return Ok(i + 2);
                }
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated template literal"))
    }

    fn skip_regex(&self, start: usize) -> Result<usize, ScanError> {
        let mut i = start + 1;
        let mut in_class = false;
        while i < self.src.len() {
            match self.src[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => return Ok(self.word_end(i + 1)),
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated regular expression"))
    }

    /// Index of the `close` byte balancing an opener just before `i`.
    ///
    /// Used for dynamic import arguments, which are skipped as a whole so
    /// that records never overlap.
    fn balanced_end(&self, mut i: usize, open_at: usize) -> Result<usize, ScanError> {
        let mut depth = 0usize;
        while i < self.src.len() {
            match self.src[i] {
                b'\'' | b'"' => i = self.string_end(i)? + 1,
                b'`' => i = self.balanced_template_end(i)?,
                b'/' if self.src.get(i + 1) == Some(&b'/') => i = self.skip_line_comment(i),
                b'/' if self.src.get(i + 1) == Some(&b'*') => i = self.skip_block_comment(i)?,
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    i += 1;
                }
                b')' | b']' | b'}' if depth > 0 => {
                    depth -= 1;
                    i += 1;
                }
                b')' => return Ok(i),
                b']' | b'}' => break,
                _ => i += 1,
            }
        }
        Err(ScanError::new(open_at, "Unterminated dynamic import"))
    }

    /// Position after the template literal opening at `start`, nested
    /// `${...}` expressions included.
    fn balanced_template_end(&self, start: usize) -> Result<usize, ScanError> {
        let mut i = start + 1;
        while i < self.src.len() {
            match self.src[i] {
                b'\\' => i += 2,
                b'`' => return Ok(i + 1),
                b'$' if self.src.get(i + 1) == Some(&b'{') => {
                    i = self.expression_end(i + 2)? + 1;
                }
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated template literal"))
    }

    /// Index of the `}` closing a template expression starting at `i`.
    fn expression_end(&self, mut i: usize) -> Result<usize, ScanError> {
        let start = i;
        let mut depth = 0usize;
        while i < self.src.len() {
            match self.src[i] {
                b'\'' | b'"' => i = self.string_end(i)? + 1,
                b'`' => i = self.balanced_template_end(i)?,
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' if depth == 0 => return Ok(i),
                b'}' => {
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated template literal"))
    }

    /// `import` keyword spanning `start..end`.
    ///
    /// `import` used as a property key, class member or method name is
    /// left alone; only the statement, `import(...)` and `import.meta`
    /// forms produce records.
    fn import_at(&mut self, start: usize, end: usize) -> Result<(), ScanError> {
        let p = self.skip_trivia(end)?;
        match self.src.get(p) {
            Some(b'(') => {
                let arg_start = p + 1;
                let close = self.balanced_end(arg_start, p)?;
                let after = self.skip_trivia(close + 1)?;
                if self.src.get(after) == Some(&b'{')
                    && !self.src[close + 1..after].contains(&b'\n')
                {
                    // `import() { ... }`: a method named `import`.
                    return Ok(());
                }
                self.records.push(ImportRecord::new_dynamic(arg_start, close));
                self.pos = close + 1;
                self.last = Last::Value;
            }
            Some(b'.') => {
                // Only the contiguous `import.meta` form is reported.
                if p == end && self.word_at(p + 1) == b"meta" {
                    let meta_end = p + 5;
                    self.records.push(ImportRecord::new_static(start, meta_end));
                    self.pos = meta_end;
                    self.last = Last::Value;
                }
            }
            Some(b'\'' | b'"') => {
                let close = self.string_end(p)?;
                self.records.push(ImportRecord::new_static(p + 1, close));
                self.pos = close + 1;
                self.last = Last::Punct;
            }
            Some(&b) if b == b'{' || b == b'*' || is_ident_byte(b) => self.import_clause(p)?,
            // `{ import: x }`, `class { import = 1; import }` and friends.
            Some(_) | None => {}
        }
        Ok(())
    }

    /// `import <clause> from '<specifier>'`, scanning from the clause start.
    ///
    /// Leaves the scanner untouched when the tokens do not form an import
    /// statement.
    fn import_clause(&mut self, mut i: usize) -> Result<(), ScanError> {
        loop {
            i = self.skip_trivia(i)?;
            let Some(&b) = self.src.get(i) else {
                return Ok(());
            };
            match b {
                b'{' => i = self.named_list_end(i)?,
                b'*' | b',' => i += 1,
                _ if is_ident_byte(b) => {
                    let end = self.word_end(i);
                    if &self.src[i..end] == b"from" {
                        let next = self.skip_trivia(end)?;
                        if matches!(self.src.get(next), Some(b'\'' | b'"')) {
                            return self.from_specifier(end);
                        }
                    }
                    i = end;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Position after the `}` closing a named import/export list at `start`.
    fn named_list_end(&self, start: usize) -> Result<usize, ScanError> {
        let mut i = start + 1;
        while i < self.src.len() {
            match self.src[i] {
                b'\'' | b'"' => i = self.string_end(i)? + 1,
                b'/' if matches!(self.src.get(i + 1), Some(b'/' | b'*')) => {
                    i = self.skip_trivia(i)?;
                }
                b'}' => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(ScanError::new(start, "Unterminated import/export list"))
    }

    /// Record the string literal following a `from` keyword ending at `i`.
    fn from_specifier(&mut self, i: usize) -> Result<(), ScanError> {
        let p = self.skip_trivia(i)?;
        match self.src.get(p) {
            Some(b'\'' | b'"') => {
                let close = self.string_end(p)?;
                self.records.push(ImportRecord::new_static(p + 1, close));
                self.pos = close + 1;
                self.last = Last::Punct;
                Ok(())
            }
            _ => Err(ScanError::new(p, "Expected a string literal after `from`")),
        }
    }

    /// `export` keyword ending at `end`. Only re-exports produce records.
    fn export_at(&mut self, end: usize) -> Result<(), ScanError> {
        let p = self.skip_trivia(end)?;
        match self.src.get(p) {
            Some(b'*') => {
                let mut i = self.skip_trivia(p + 1)?;
                if self.word_at(i) == b"as" {
                    i = self.skip_trivia(i + 2)?;
                    i = match self.src.get(i) {
                        Some(b'\'' | b'"') => self.string_end(i)? + 1,
                        _ => self.word_end(i),
                    };
                    i = self.skip_trivia(i)?;
                }
                if self.word_at(i) == b"from" {
                    self.from_specifier(i + 4)
                } else {
                    Err(ScanError::new(i, "Expected `from` after `export *`"))
                }
            }
            Some(b'{') => {
                let after = self.named_list_end(p)?;
                let i = self.skip_trivia(after)?;
                if self.word_at(i) == b"from" {
                    self.from_specifier(i + 4)
                } else {
                    self.pos = after;
                    self.last = Last::Punct;
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}
