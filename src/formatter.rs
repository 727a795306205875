use std::fmt::{self, Write};

/// Substitutes positional arguments into a message template.
///
/// Formatting runs on the producer side of the writer, so implementations
/// must never panic or fail: a template they cannot honour is returned
/// as-is.
pub trait Formatter: Send + Sync {
    fn render(&self, template: &str, args: &[&dyn fmt::Display]) -> String;
}

/// `%s`-style substitution.
///
/// * `%s` takes the next argument.
/// * `%%` and `\%` produce a literal `%`.
/// * Any other `%x` is copied through.
///
/// When the number of `%s` markers differs from the number of arguments the
/// template is emitted unformatted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentFormatter;

/// Number of `%s` markers in `template`, skipping escaped percents.
pub fn count_placeholders(template: &str) -> usize {
    let bytes = template.as_bytes();
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'\\', Some(b'%')) | (b'%', Some(b'%')) => i += 2,
            (b'%', Some(b's')) => {
                count += 1;
                i += 2;
            }
            _ => i += 1,
        }
    }
    count
}

impl Formatter for PercentFormatter {
    fn render(&self, template: &str, args: &[&dyn fmt::Display]) -> String {
        if count_placeholders(template) != args.len() {
            return template.to_string();
        }

        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len() + 16 * args.len());
        let mut args = args.iter();
        let mut start = 0;
        let mut i = 0;

        // Markers are ASCII, so every split point is a char boundary.
        while i < bytes.len() {
            match (bytes[i], bytes.get(i + 1)) {
                (b'\\', Some(b'%')) | (b'%', Some(b'%')) => {
                    out.push_str(&template[start..i]);
                    out.push('%');
                    i += 2;
                    start = i;
                }
                (b'%', Some(b's')) => {
                    out.push_str(&template[start..i]);
                    if let Some(arg) = args.next() {
                        let _ = write!(out, "{}", arg);
                    }
                    i += 2;
                    start = i;
                }
                _ => i += 1,
            }
        }
        out.push_str(&template[start..]);
        out
    }
}
