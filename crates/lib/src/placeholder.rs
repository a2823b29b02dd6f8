//! Placeholder parsing and substitution for command templates.
//!
//! Task actions are declared as command templates. Before a command runs,
//! every placeholder is replaced with the matching value from the resolved
//! configuration snapshot.
//!
//! # Placeholder Format
//!
//! - `$${NAME}` - the effective value of option `NAME` (uppercase letters,
//!   digits and underscores)
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so shell variables like
//! `$HOME` and `$ARCH` work naturally without any escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use taskwell_lib::placeholder::{parse, Segment, Placeholder};
//!
//! let segments = parse("$${IMAGE}:$${TAG}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Placeholder(Placeholder::Option("IMAGE".to_string())),
//!     Segment::Literal(":".to_string()),
//!     Segment::Placeholder(Placeholder::Option("TAG".to_string())),
//! ]);
//! ```

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${NAME}` - value of a configuration option
  Option(String),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved option '{0}' in command template")]
  UnresolvedOption(String),
}

/// Supplies values for placeholders during substitution.
pub trait Resolver {
  /// Resolve the rendered value of a configuration option.
  fn resolve_option(&self, name: &str) -> Result<String, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or its name is not a valid
/// option name.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    if !matches!(chars.peek(), Some((_, '$'))) {
      // Lone $, shell variables pass through
      literal.push('$');
      continue;
    }
    chars.next();

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if matches!(chars.peek(), Some((_, '{'))) {
          // Escaped: $$${ -> $${
          chars.next();
          literal.push_str("$${");
        } else {
          literal.push_str("$$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        segments.push(Segment::Placeholder(parse_placeholder_content(&name)?));
      }
      _ => literal.push_str("$$"),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  let valid = !content.is_empty()
    && content
      .chars()
      .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    && !content.starts_with(|c: char| c.is_ascii_digit());

  if !valid {
    return Err(PlaceholderError::Malformed(format!("invalid option name '{content}'")));
  }

  Ok(Placeholder::Option(content.to_string()))
}

/// Parse and substitute in one step.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(Placeholder::Option(name)) => result.push_str(&resolver.resolve_option(name)?),
    }
  }

  Ok(result)
}
