//! Splitting raw parameter text into literal runs and `{ ... }` fragments.

use cogwork_types::InterpolationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(String),
    Fragment(&'a str),
}

/// Scan `raw` left to right.
///
/// `{{` and `}}` produce literal braces. Inside a fragment, quoted string
/// literals may contain braces; any other `{` is a nesting error.
pub(crate) fn scan(raw: &str) -> Result<Vec<Segment<'_>>, InterpolationError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((offset, current)) = chars.next() {
        match current {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(InterpolationError::compile(raw, format!("unmatched '}}' at position {offset}")));
            }
            '{' => {
                let start = offset + 1;
                let end = find_fragment_end(raw, start)?;
                let source = &raw[start..end];
                if source.trim().is_empty() {
                    return Err(InterpolationError::compile(source, format!("empty expression at position {offset}")));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Fragment(source));
                while let Some((next_offset, _)) = chars.peek() {
                    if *next_offset > end {
                        break;
                    }
                    chars.next();
                }
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Byte offset of the `}` closing the fragment that starts at `start`.
fn find_fragment_end(raw: &str, start: usize) -> Result<usize, InterpolationError> {
    let body = &raw[start..];
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (relative, current) in body.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if current == '\\' {
                escaped = true;
            } else if current == open {
                quote = None;
            }
            continue;
        }
        match current {
            '\'' | '"' => quote = Some(current),
            '}' => return Ok(start + relative),
            '{' => {
                return Err(InterpolationError::compile(
                    body,
                    format!("nested '{{' at position {}; fragments cannot be nested", start + relative),
                ));
            }
            _ => {}
        }
    }

    Err(InterpolationError::compile(body, format!("unterminated '{{' at position {}", start - 1)))
}
