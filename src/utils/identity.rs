use regex::Regex;
use std::sync::OnceLock;

fn digits() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// True when `email` belongs to the institutional domain (exact domain match).
pub fn is_institutional_email(email: &str, domain: &str) -> bool {
    match email.trim().rsplit_once('@') {
        Some((local, host)) => !local.is_empty() && host.eq_ignore_ascii_case(domain),
        None => false,
    }
}

/// Canonical student id: `prefix` followed by the first run of digits in the
/// email's local part, e.g. `f20210123@...` with prefix `411` → `41120210123`.
///
/// Only consulted when a student's identity mapping is first written.
pub fn derive_student_id(prefix: &str, email: &str) -> Option<i64> {
    let local = email.trim().split('@').next()?;
    let run = digits().find(local)?.as_str();
    format!("{}{}", prefix, run).parse::<i64>().ok()
}
