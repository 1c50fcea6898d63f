//! Privacy delimiters
//!
//! Private data inside a request or result is wrapped in `!!@ … @!!` so the
//! runtime can mask it in logs. A delimiter preceded by `^` is escaped and
//! is not treated as a delimiter.

/// Opening privacy delimiter
pub const OPEN: &str = "!!@";
/// Closing privacy delimiter
pub const CLOSE: &str = "@!!";
/// Escape character for delimiters
pub const ESCAPE: char = '^';

const DELIM_LEN: usize = 3;

/// Mark `data` as private.
///
/// Empty input and input that is already wrapped are returned unchanged.
/// Delimiters inside `data` are escaped first.
pub fn add_privacy_delimiters(data: &str) -> String {
    if data.is_empty() || is_delimited(data) {
        return data.to_string();
    }
    let mut out = String::with_capacity(data.len() + 2 * DELIM_LEN);
    out.push_str(OPEN);
    out.push_str(&escape_privacy_delimiters(data));
    out.push_str(CLOSE);
    out
}

fn is_delimited(data: &str) -> bool {
    data.len() >= 2 * DELIM_LEN && data.starts_with(OPEN) && data.ends_with(CLOSE)
}

/// Escape every delimiter in `data` with `^`.
pub fn escape_privacy_delimiters(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;
    while !rest.is_empty() {
        if rest.starts_with(OPEN) || rest.starts_with(CLOSE) {
            out.push(ESCAPE);
            out.push_str(&rest[..DELIM_LEN]);
            rest = &rest[DELIM_LEN..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Remove `levels` levels of privacy delimiters; 0 removes all of them.
///
/// Each level removes every unescaped `!!@ … @!!` pair and unescapes the
/// delimiters inside it by one level, so nested private data surfaces for
/// the next level. Unpaired delimiters are left alone.
pub fn remove_privacy_delimiters(data: &str, levels: u32) -> String {
    let mut out = data.to_string();
    let mut level = 0;
    while levels == 0 || level < levels {
        let spans = delimited_spans(&out);
        if spans.is_empty() {
            break;
        }

        let mut stripped = String::with_capacity(out.len());
        let mut last = 0;
        for (start, end) in spans {
            stripped.push_str(&out[last..start]);
            stripped.push_str(&unescape_once(&out[start + DELIM_LEN..end - DELIM_LEN]));
            last = end;
        }
        stripped.push_str(&out[last..]);
        out = stripped;
        level += 1;
    }
    out
}

/// Replace each private span, delimiters included, with one `*` per character.
pub fn mask_private_data(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut last = 0;
    for (start, end) in delimited_spans(data) {
        out.push_str(&data[last..start]);
        out.extend(std::iter::repeat('*').take(data[start..end].chars().count()));
        last = end;
    }
    out.push_str(&data[last..]);
    out
}

/// Byte offset of the first `delim` at or after `from` not preceded by `^`.
fn find_unescaped(data: &str, mut from: usize, delim: &str) -> Option<usize> {
    while let Some(offset) = data[from..].find(delim) {
        let at = from + offset;
        if at == 0 || data.as_bytes()[at - 1] != ESCAPE as u8 {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Outermost unescaped delimiter pairs as `(start, end)` byte ranges,
/// delimiters included.
fn delimited_spans(data: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(open) = find_unescaped(data, from, OPEN) {
        match find_unescaped(data, open + DELIM_LEN, CLOSE) {
            Some(close) => {
                spans.push((open, close + DELIM_LEN));
                from = close + DELIM_LEN;
            }
            None => break,
        }
    }
    spans
}

/// Drop one `^` in front of each delimiter.
fn unescape_once(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;
    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        if c == ESCAPE && (after.starts_with(OPEN) || after.starts_with(CLOSE)) {
            rest = after;
            continue;
        }
        out.push(c);
        rest = after;
    }
    out
}
