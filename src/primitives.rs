//! Small string algorithms shared by the enhancer, the structural adapter and
//! the pretty reporter.

/// Width of a tab stop when computing visual columns.
pub const TAB_WIDTH: usize = 8;

// ─── Edit distance ───────────────────────────────────────────────────────────

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Candidates within `max_distance` of `target`, closest first, ties broken
/// lexicographically, at most `limit` of them.
pub fn closest_matches<'a, I>(
    target: &str,
    candidates: I,
    max_distance: usize,
    limit: usize,
) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|c| *c != target)
        .map(|c| (levenshtein(target, c), c))
        .filter(|(d, _)| *d <= max_distance)
        .collect();
    scored.sort();
    scored.dedup();
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

// ─── Message parsing ─────────────────────────────────────────────────────────

/// The first substring enclosed in matching double or single quotes.
///
/// Used to recover the offending identifier from a rendered message, e.g.
/// `reference "foo" does not match` yields `foo`.
pub fn first_quoted(message: &str) -> Option<&str> {
    let (start, quote) = message.char_indices().find(|(_, c)| *c == '"' || *c == '\'')?;
    let rest = &message[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

// ─── Visual columns ──────────────────────────────────────────────────────────

/// Zero-based visual column of the character at 1-based `column`, with tabs
/// advancing to the next multiple of [`TAB_WIDTH`].
pub fn visual_column(line: &str, column: usize) -> usize {
    let mut visual = 0;
    for c in line.chars().take(column.saturating_sub(1)) {
        visual = advance(visual, c);
    }
    visual
}

/// The line with tabs replaced by spaces up to the next tab stop.
pub fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut visual = 0;
    for c in line.chars() {
        let next = advance(visual, c);
        if c == '\t' {
            out.extend(std::iter::repeat_n(' ', next - visual));
        } else {
            out.push(c);
        }
        visual = next;
    }
    out
}

fn advance(visual: usize, c: char) -> usize {
    if c == '\t' {
        (visual / TAB_WIDTH + 1) * TAB_WIDTH
    } else {
        visual + 1
    }
}

/// Length in characters of the quoted value of `attribute` when it starts at
/// 1-based `column` of `line`, along with the 1-based column of the value.
///
/// `<transition target="acitve"/>` with the column of `target` yields
/// `(column of 'a', 6)`.
pub fn attribute_value_span(line: &str, column: usize, attribute: &str) -> Option<(usize, usize)> {
    let chars: Vec<char> = line.chars().collect();
    let start = column.checked_sub(1)?;
    let name: Vec<char> = attribute.chars().collect();
    if chars.get(start..start + name.len())? != name.as_slice() {
        return None;
    }
    let mut i = start + name.len();
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    if chars.get(i) != Some(&'=') {
        return None;
    }
    i += 1;
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    let quote = *chars.get(i).filter(|c| **c == '"' || **c == '\'')?;
    let value_start = i + 1;
    let len = chars[value_start..].iter().position(|c| *c == quote)?;
    Some((value_start + 1, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("acitve", "active"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn closest_matches_sorted_and_capped() {
        let pool = ["idle", "idel", "iddle", "ide", "busy"];
        let got = closest_matches("idl", pool, 2, 3);
        assert_eq!(got, vec!["ide", "idel", "idle"]);
    }

    #[test]
    fn first_quoted_variants() {
        assert_eq!(first_quoted(r#"reference "foo" is bad"#), Some("foo"));
        assert_eq!(first_quoted("reference 'bar' is bad"), Some("bar"));
        assert_eq!(first_quoted(r#"id "a" and "b""#), Some("a"));
        assert_eq!(first_quoted("no quotes here"), None);
        assert_eq!(first_quoted("unterminated \"oops"), None);
    }

    #[test]
    fn tabs_advance_to_stops() {
        assert_eq!(visual_column("\tx", 2), 8);
        assert_eq!(visual_column("ab\tx", 4), 8);
        assert_eq!(visual_column("abc", 3), 2);
        assert_eq!(expand_tabs("a\tb"), "a       b");
    }

    #[test]
    fn attribute_value_span_finds_value() {
        let line = r#"  <transition target="acitve"/>"#;
        assert_eq!(attribute_value_span(line, 15, "target"), Some((23, 6)));
        assert_eq!(attribute_value_span(line, 15, "event"), None);
    }
}
