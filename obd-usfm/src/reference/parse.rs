//! The reference grammar.
//!
//! A reference is an optional book name followed by `C:V`, `C` or `V`
//! (the last only for single-chapter books), optionally followed by a range.
//! A hyphen joins verses within one chapter. An en-dash joins chapters or
//! crosses into another book, so the two are handled separately.
use super::{ReferenceRange, VerseRef};
use crate::{
  collaborators::Lookups,
  error::ReferenceError,
  types::BookCode,
  utils::CRITICAL,
};

/// Words skipped anywhere in a reference.
const NOISE_WORDS: &[&str] = &["and", "c.", "ca.", "cf.", "cf", "see", "also"];

/// Everything a reference needs to be resolved.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
  pub version:   &'a str,
  /// Book the reference appears in, used when it names none.
  pub home_book: &'a BookCode,
  pub lookups:   Lookups<'a>,
}

impl ParseContext<'_> {
  /// The 1611 King James uses `C.V` and Roman-numeral chapters.
  fn is_kjb_1611(&self) -> bool {
    self.version == "KJB-1611"
  }
}

fn malformed(text: &str, reason: &str) -> ReferenceError {
  ReferenceError::Malformed {
    text:   text.to_string(),
    reason: reason.to_string(),
  }
}

/// Value of a lowercase Roman numeral such as `xii`. Runs of subtractive
/// numerals that would take the value below zero give `None`.
fn roman_to_number(text: &str) -> Option<u32> {
  let mut total: u32 = 0;
  let mut previous = 0;
  for c in text.chars().rev() {
    let value = match c {
      'i' => 1,
      'v' => 5,
      'x' => 10,
      'l' => 50,
      'c' => 100,
      _ => return None,
    };
    if value < previous {
      total = total.checked_sub(value)?;
    } else {
      total = total.checked_add(value)?;
      previous = value;
    }
  }
  (total > 0).then_some(total)
}

/// Parses a chapter token, which for the 1611 King James may be Roman.
fn parse_chapter(token: &str, ctx: &ParseContext<'_>) -> Option<u32> {
  let token = token.trim().trim_end_matches('.');
  token
    .parse()
    .ok()
    .or_else(|| ctx.is_kjb_1611().then(|| roman_to_number(token)).flatten())
}

fn parse_number(token: &str, text: &str) -> Result<u32, ReferenceError> {
  token
    .trim()
    .trim_end_matches('.')
    .parse()
    .map_err(|_| {
      malformed(text, &format!("'{}' is not a number", token.trim()))
    })
}

/// Length of a numbered-book prefix such as `1 `, `2`, `II ` or `III.`.
fn numbered_prefix_len(text: &str) -> usize {
  let bytes = text.as_bytes();
  if bytes.first().is_some_and(|b| (b'1'..=b'4').contains(b)) {
    let after = text[1..].trim_start();
    if after.starts_with(|c: char| c.is_alphabetic()) {
      return text.len() - after.len();
    }
    return 0;
  }
  for roman in ["III", "II", "I"] {
    if let Some(after) = text.strip_prefix(roman) {
      if after.starts_with([' ', '.']) {
        let rest = after[1..].trim_start();
        if rest.starts_with(|c: char| c.is_uppercase()) {
          return text.len() - rest.len();
        }
      }
    }
  }
  0
}

/// Byte offset and text of each whitespace-separated word.
fn word_starts(text: &str) -> impl Iterator<Item = (usize, &str)> {
  text
    .char_indices()
    .filter(|&(ix, c)| {
      !c.is_whitespace()
        && text[..ix].chars().next_back().is_none_or(char::is_whitespace)
    })
    .map(|(ix, _)| (ix, text[ix..].split_whitespace().next().unwrap_or("")))
}

/// Splits `text` into a book name (if any) and the numeric part.
fn split_book<'t>(
  text: &'t str,
  ctx: &ParseContext<'_>,
) -> (Option<&'t str>, &'t str) {
  let prefix = numbered_prefix_len(text);
  let body = &text[prefix..];
  let digit_at = body.find(|c: char| c.is_ascii_digit());
  // Roman chapter tokens follow the book name after whitespace
  let roman_at = if ctx.is_kjb_1611() {
    word_starts(body).skip(1).find_map(|(ix, word)| {
      roman_to_number(word.trim_end_matches('.')).map(|_| ix)
    })
  } else {
    None
  };
  let numbers_at = match (digit_at, roman_at) {
    (Some(digit), Some(roman)) => Some(digit.min(roman)),
    (digit, roman) => digit.or(roman),
  };
  let split = prefix + numbers_at.unwrap_or(body.len());
  let book = text[..split].trim();
  let numbers = text[split..].trim();
  if book.is_empty() {
    (None, numbers)
  } else {
    (Some(book), numbers)
  }
}

/// Splits a `C:V` (or `C.V` for the 1611 King James) pair.
fn split_chapter_verse<'t>(
  numbers: &'t str,
  ctx: &ParseContext<'_>,
) -> Option<(&'t str, &'t str)> {
  numbers.split_once(':').or_else(|| {
    ctx
      .is_kjb_1611()
      .then(|| numbers.trim_end_matches('.').split_once('.'))
      .flatten()
  })
}

/// Resolves one position: `Book C:V`, `Book N`, `C:V` or `N`.
fn parse_single(
  text: &str,
  ctx: &ParseContext<'_>,
  last: Option<&VerseRef>,
) -> Result<VerseRef, ReferenceError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(ReferenceError::Empty);
  }
  let (book_text, numbers) = split_book(text, ctx);
  let versification = ctx.lookups.versification;

  let book = match book_text {
    Some(name) => ctx
      .lookups
      .books
      .book_abbreviation_to_code(ctx.version, name)
      .ok_or_else(|| ReferenceError::UnknownBook(name.to_string()))?,
    None => match last {
      Some(last) => last.book.clone(),
      None => {
        log::error!(
          target: CRITICAL,
          "Assuming bare reference '{text}' is in {} for {}",
          ctx.home_book,
          ctx.version
        );
        ctx.home_book.clone()
      },
    },
  };
  if numbers.is_empty() {
    return Err(malformed(text, "no chapter or verse"));
  }

  let resolved = if let Some((chapter, verse)) =
    split_chapter_verse(numbers, ctx)
  {
    let chapter = parse_chapter(chapter, ctx)
      .ok_or_else(|| malformed(text, "unreadable chapter"))?;
    VerseRef::new(book, chapter, Some(parse_number(verse, text)?))
  } else {
    let number = parse_chapter(numbers, ctx)
      .ok_or_else(|| malformed(text, "unreadable number"))?;
    let single_chapter = versification.is_single_chapter_book(&book);
    match (book_text, last) {
      _ if single_chapter => VerseRef::new(book, 1, Some(number)),
      (Some(_), _) => VerseRef::new(book, number, None),
      // "Gen 1:3, 5": a bare number after a verse is another verse
      (None, Some(last)) if last.verse.is_some() => {
        VerseRef::new(book, last.chapter, Some(number))
      },
      (None, _) => VerseRef::new(book, number, None),
    }
  };

  check_bounds(&resolved, ctx, text)?;
  Ok(resolved)
}

/// Rejects a chapter the book does not have, or a verse beyond the chapter
/// when verse counts are loaded.
fn check_bounds(
  position: &VerseRef,
  ctx: &ParseContext<'_>,
  text: &str,
) -> Result<(), ReferenceError> {
  let versification = ctx.lookups.versification;
  let book = &position.book;
  let chapter = position.chapter;
  if let Some(max) = versification.max_chapters(book)
    && (chapter == 0 || chapter > max)
  {
    return Err(malformed(text, &format!("{book} has {max} chapters")));
  }
  if let Some(verse) = position.verse
    && let Some(max) = versification.num_verses(book, chapter)
    && (verse == 0 || verse > max)
  {
    return Err(malformed(
      text,
      &format!("{book} {chapter} has {max} verses"),
    ));
  }
  Ok(())
}

/// Drops noise words and surrounding punctuation.
fn clean(text: &str) -> String {
  let text = text.trim_matches(|c: char| {
    c.is_whitespace() || matches!(c, '(' | ')' | ',' | ';' | '[' | ']')
  });
  text
    .split_whitespace()
    .filter(|word| !NOISE_WORDS.contains(&word.to_lowercase().as_str()))
    .collect::<Vec<_>>()
    .join(" ")
    .trim_end_matches(['.', ','])
    .to_string()
}

/// Parses `text` into a range.
///
/// `last` is the previous reference in the same list, which supplies the
/// book (and chapter for bare verses) to references that omit them.
///
/// # Errors
///
/// Returns a [`ReferenceError`] when the text cannot be resolved.
pub fn parse_reference(
  text: &str,
  ctx: &ParseContext<'_>,
  last: Option<&VerseRef>,
) -> Result<ReferenceRange, ReferenceError> {
  let cleaned = clean(text);
  if cleaned.is_empty() {
    return Err(ReferenceError::Empty);
  }

  if let Some((left, right)) = cleaned.split_once('–') {
    let start = parse_single(left, ctx, last)?;
    let right = right.trim();
    let end = if split_book(right, ctx).0.is_some() {
      parse_single(right, ctx, Some(&start))?
    } else if let Some((chapter, verse)) = split_chapter_verse(right, ctx) {
      let chapter = parse_chapter(chapter, ctx)
        .ok_or_else(|| malformed(&cleaned, "unreadable end chapter"))?;
      VerseRef::new(
        start.book.clone(),
        chapter,
        Some(parse_number(verse, &cleaned)?),
      )
    } else if start.verse.is_none() {
      let chapter = parse_chapter(right, ctx)
        .ok_or_else(|| malformed(&cleaned, "unreadable end chapter"))?;
      VerseRef::new(start.book.clone(), chapter, None)
    } else {
      let verse = parse_number(right, &cleaned)?;
      VerseRef::new(start.book.clone(), start.chapter, Some(verse))
    };
    check_bounds(&end, ctx, &cleaned)?;
    return Ok(ReferenceRange {
      start,
      end: Some(end),
    });
  }

  if let Some((left, right)) = cleaned.split_once('-') {
    let start = parse_single(left, ctx, last)?;
    let right = right.trim();
    let end = match start.verse {
      Some(_) if right.contains(':') => {
        return Err(malformed(
          &cleaned,
          "a hyphen joins verses within one chapter",
        ));
      },
      Some(_) => VerseRef::new(
        start.book.clone(),
        start.chapter,
        Some(parse_number(right, &cleaned)?),
      ),
      None => VerseRef::new(
        start.book.clone(),
        parse_number(right, &cleaned)?,
        None,
      ),
    };
    check_bounds(&end, ctx, &cleaned)?;
    return Ok(ReferenceRange {
      start,
      end: Some(end),
    });
  }

  parse_single(&cleaned, ctx, last).map(ReferenceRange::single)
}
