//! Rupiah amount parsing and formatting.
//!
//! Amounts are carried as `i64` minor units (hundredths). Spreadsheet cells
//! arrive in many shapes: `1000000`, `Rp1.000.000`, `Rp. 250.000,-`,
//! `IDR 1,000,000.00`, `1 000 000`. Both `.` and `,` may be the thousands
//! separator; a separator is read as the decimal point only when it occurs
//! once and is followed by one or two digits.

/// Parse an amount into minor units. Returns `None` for text with no digits,
/// negative amounts, ambiguous separators, or overflow.
pub fn parse_amount(input: &str) -> Option<i64> {
    let s = input.trim();
    let first = s.find(|c: char| c.is_ascii_digit())?;
    let last = s.rfind(|c: char| c.is_ascii_digit())?;

    let prefix = &s[..first];
    if prefix.contains('-') || prefix.contains('(') || has_leading_separator(prefix) {
        return None;
    }

    let mut body = String::with_capacity(last + 1 - first);
    for c in s[first..=last].chars() {
        match c {
            '0'..='9' | '.' | ',' => body.push(c),
            // Space-grouped thousands: "1 000 000"
            ' ' | '\u{a0}' | '\u{202f}' => {}
            _ => return None,
        }
    }

    let (whole, frac) = split_decimal(&body)?;
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole.checked_mul(100)?.checked_add(frac)
}

/// A separator directly before the first digit (".50") is not a currency
/// abbreviation like "Rp." and would otherwise be silently dropped.
fn has_leading_separator(prefix: &str) -> bool {
    let mut rev = prefix.chars().rev();
    match rev.next() {
        Some('.' | ',') => !rev.next().is_some_and(char::is_alphabetic),
        _ => false,
    }
}

/// Split a digits-and-separators string into (whole digits, fraction digits).
fn split_decimal(body: &str) -> Option<(String, &str)> {
    let Some(pos) = body.rfind(['.', ',']) else {
        return Some((body.to_string(), ""));
    };
    let sep = body[pos..].chars().next()?;
    let (whole, after) = (&body[..pos], &body[pos + 1..]);
    let digits_only = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();

    match after.len() {
        1 | 2 if !whole.contains(sep) && is_grouped(whole) => Some((digits_only(whole), after)),
        3 if is_grouped(body) => Some((digits_only(body), "")),
        _ => None,
    }
}

/// True when `s` has no separators, or is thousands-grouped with a single
/// separator kind: a 1-3 digit leading group, then groups of exactly 3.
fn is_grouped(s: &str) -> bool {
    if !s.contains(['.', ',']) {
        return true;
    }
    if s.contains('.') && s.contains(',') {
        return false;
    }
    let mut groups = s.split(['.', ',']);
    groups.next().is_some_and(|g| (1..=3).contains(&g.len())) && groups.all(|g| g.len() == 3)
}

/// Plain decimal rendering: `100000000` -> `"1000000"`, `150` -> `"1.50"`.
pub fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let (whole, frac) = (abs / 100, abs % 100);
    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{frac:02}")
    }
}

/// Display rendering with `.` thousands grouping: `100000000` -> `"1.000.000"`.
/// A non-zero fraction is appended after `,`.
pub fn format_grouped(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let (whole, frac) = (abs / 100, abs % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if frac == 0 {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped},{frac:02}")
    }
}
