//! Flat tokens for note bodies.
use crate::render::character::read_marker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
  Text(&'a str),
  /// `\name ` or `\+name `
  Open(&'a str),
  /// `\name*` or `\+name*`
  Close(&'a str),
}

/// Splits a note body into text and marker tokens.
///
/// A backslash that does not start a marker is kept as text.
#[must_use]
pub fn tokenize(body: &str) -> Vec<Token<'_>> {
  let mut tokens = Vec::new();
  let mut rest = body;
  while let Some(ix) = rest.find('\\') {
    if ix > 0 {
      tokens.push(Token::Text(&rest[..ix]));
    }
    rest = &rest[ix..];
    match read_marker(rest) {
      Some(raw) => {
        tokens.push(if raw.closing {
          Token::Close(raw.name)
        } else {
          Token::Open(raw.name)
        });
        rest = &rest[raw.len..];
      },
      None => {
        tokens.push(Token::Text(&rest[..1]));
        rest = &rest[1..];
      },
    }
  }
  if !rest.is_empty() {
    tokens.push(Token::Text(rest));
  }
  tokens
}
