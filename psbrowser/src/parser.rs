//! Splits an input line into a command name and its parameters.
//!
//! Tokens are separated by whitespace. Single and double quotes group words
//! into one parameter, a backslash escapes the next character (except inside
//! single quotes), and quoted text glued to plain text forms a single token
//! the way a POSIX shell does it.

use crate::error::ParseError;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    pub command: String,
    pub params: Vec<String>,
}

/// Parse a line into `command` + `params`.
pub fn parse(line: &str) -> Result<ParsedInput, ParseError> {
    let mut tokens = tokenize(line)?.into_iter();
    let command = tokens.next().ok_or(ParseError::Empty)?;
    Ok(ParsedInput {
        command,
        params: tokens.collect(),
    })
}

fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut out = Vec::new();
    let mut current = String::new();
    // Distinguishes `""` (an empty parameter) from no token at all.
    let mut in_token = false;
    let mut quote: Option<(char, usize)> = None;
    let mut chars = line.chars().enumerate();

    while let Some((column, c)) = chars.next() {
        match (quote, c) {
            (Some((q, _)), c) if c == q => quote = None,
            (Some(('\'', _)), c) => current.push(c),
            (Some(_), '\\') | (None, '\\') => {
                in_token = true;
                // A trailing backslash stays literal.
                let escaped = chars.next().map_or('\\', |(_, next)| next);
                current.push(escaped);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                in_token = true;
                quote = Some((c, column + 1));
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if let Some((quote, position)) = quote {
        return Err(ParseError::UnterminatedQuote { quote, position });
    }
    if in_token {
        out.push(current);
    }
    Ok(out)
}
