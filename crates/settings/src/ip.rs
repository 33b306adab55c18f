//! IPv4 input cleanup and validation.

/// Characters that users (or soft keyboards) type in place of `.`.
const DOT_LIKE: &[char] = &[
    '。', '．', '・', '·', '∙', '․', '‧', '⋅', '•', '●', '｡', ',', ' ',
];

/// Reduces raw input to a bare dotted-digit candidate.
///
/// Strips any `scheme://` prefix, path, and port, maps dot-like characters
/// to `.`, drops everything that is not an ASCII digit or a dot, collapses
/// runs of dots, and trims dots from both ends. The result is not validated.
pub fn normalize_ipv4_input(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some((_, rest)) = s.split_once("://") {
        s = rest;
    }
    if let Some((head, _)) = s.split_once('/') {
        s = head;
    }
    if let Some((head, _)) = s.split_once(':') {
        s = head;
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let c = if DOT_LIKE.contains(&c) { '.' } else { c };
        match c {
            '.' if out.ends_with('.') => {}
            '.' | '0'..='9' => out.push(c),
            _ => {}
        }
    }
    out.trim_matches('.').to_string()
}

/// Strict dotted-quad check: four parts, each 1 to 3 digits in 0..=255,
/// with no leading zeros. Surrounding whitespace is ignored.
pub fn is_valid_ipv4(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }

    let parts: Vec<&str> = candidate.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            (1..=3).contains(&part.len())
                && part.bytes().all(|b| b.is_ascii_digit())
                && !(part.len() > 1 && part.starts_with('0'))
                && part.parse::<u16>().is_ok_and(|v| v <= 255)
        })
}
