//! Lexer for the argument list of `import.meta.hot.accept(...)`.
//!
//! Recognizes only the statically analyzable forms:
//! - `accept()` / `accept(cb)` / `accept(() => ...)`: self-accepting
//! - `accept('./dep', cb)`: accepts one dependency
//! - `accept(['./a', "./b", `./c`], cb)`: accepts a list of dependencies
//!
//! Anything else inside an array literal is a hard error rather than a
//! silent misparse.

use std::collections::HashSet;
use thiserror::Error;

/// The accept call argument is outside the literal-or-array grammar.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "import.meta.hot.accept() can only accept string literals or an Array of string literals \
     (offset {pos})"
)]
pub struct AcceptSyntaxError {
    /// Byte offset of the offending character.
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    InCall,
    InArray,
    InSingleQuoteString,
    InDoubleQuoteString,
    InTemplateString,
}

impl LexerState {
    fn closing_quote(self) -> Option<char> {
        match self {
            Self::InSingleQuoteString => Some('\''),
            Self::InDoubleQuoteString => Some('"'),
            Self::InTemplateString => Some('`'),
            Self::InCall | Self::InArray => None,
        }
    }
}

/// Lex the accept call arguments starting at `start`, the byte just past `(`.
///
/// Literal dependency paths are inserted into `deps`. Returns whether the
/// call is self-accepting.
pub fn lex_accepted_deps(
    code: &str,
    start: usize,
    deps: &mut HashSet<String>,
) -> Result<bool, AcceptSyntaxError> {
    let Some(rest) = code.get(start..) else {
        return Ok(false);
    };

    let mut state = LexerState::InCall;
    // Strings only ever nest one level inside a call or an array.
    let mut prev_state = LexerState::InCall;
    let mut current = String::new();

    let mut chars = rest.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        let pos = start + offset;
        match state {
            LexerState::InCall | LexerState::InArray => {
                let string_state = match c {
                    '\'' => Some(LexerState::InSingleQuoteString),
                    '"' => Some(LexerState::InDoubleQuoteString),
                    '`' => Some(LexerState::InTemplateString),
                    _ => None,
                };
                if let Some(next) = string_state {
                    prev_state = state;
                    state = next;
                } else if c.is_whitespace() {
                    continue;
                } else if state == LexerState::InCall {
                    if c == '[' {
                        state = LexerState::InArray;
                    } else {
                        // No argument, or a callback: neither a string nor an
                        // array literal.
                        return Ok(true);
                    }
                } else {
                    match c {
                        ']' => return Ok(false),
                        ',' => {}
                        _ => return Err(AcceptSyntaxError { pos }),
                    }
                }
            }
            LexerState::InSingleQuoteString
            | LexerState::InDoubleQuoteString
            | LexerState::InTemplateString => {
                if Some(c) == state.closing_quote() {
                    deps.insert(std::mem::take(&mut current));
                    if prev_state == LexerState::InCall {
                        // accept('./dep', cb): the remaining arguments do not matter.
                        return Ok(false);
                    }
                    state = prev_state;
                } else if state == LexerState::InTemplateString
                    && c == '$'
                    && chars.peek().map(|&(_, next)| next) == Some('{')
                {
                    return Err(AcceptSyntaxError { pos });
                } else {
                    current.push(c);
                }
            }
        }
    }

    Ok(false)
}
