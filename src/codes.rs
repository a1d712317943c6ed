//! Food code normalization and pattern matching.

use std::fmt;

/// Canonical form of a food code: trimmed and uppercased.
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Strips a single trailing alphabetic variant suffix (`SO.1D` -> `SO.1`).
/// Codes without a `.` are their own base.
pub fn base_code(code: &str) -> &str {
    if !code.contains('.') {
        return code;
    }
    match code.char_indices().last() {
        Some((idx, c)) if c.is_alphabetic() && idx > 0 => &code[..idx],
        _ => code,
    }
}

/// True when `raw` is written as a prefix pattern (`DN.` or `DN.*`).
pub fn is_prefix_pattern(raw: &str) -> bool {
    let raw = raw.trim();
    raw.ends_with(".*") || (raw.len() > 1 && raw.ends_with('.'))
}

/// A configured code or prefix pattern. Keeps the text it was written
/// with so reason strings can quote it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePattern {
    Exact { raw: String, code: String },
    Prefix { raw: String, prefix: String },
}

impl CodePattern {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_prefix_pattern(trimmed) {
            let prefix = normalize(trimmed.trim_end_matches('*'));
            CodePattern::Prefix {
                raw: trimmed.to_string(),
                prefix,
            }
        } else {
            CodePattern::Exact {
                raw: trimmed.to_string(),
                code: normalize(trimmed),
            }
        }
    }

    /// `code` must already be normalized.
    pub fn matches(&self, code: &str) -> bool {
        match self {
            CodePattern::Exact { code: c, .. } => c == code,
            CodePattern::Prefix { prefix, .. } => code.starts_with(prefix.as_str()),
        }
    }

    /// First code in `codes` matched by this pattern.
    pub fn first_match<'a, I>(&self, codes: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        codes.into_iter().find(|c| self.matches(c))
    }

    pub fn raw(&self) -> &str {
        match self {
            CodePattern::Exact { raw, .. } | CodePattern::Prefix { raw, .. } => raw,
        }
    }
}

impl fmt::Display for CodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Formats a multiplier the short way (`1`, `1.5`, `0.25`).
pub fn fmt_mult(mult: f64) -> String {
    format!("{}", mult)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_code_strips_variant() {
        assert_eq!(base_code("SO.1D"), "SO.1");
        assert_eq!(base_code("SO.1"), "SO.1");
        assert_eq!(base_code("EGG"), "EGG");
        assert_eq!(base_code("VE.12A"), "VE.12");
    }

    #[test]
    fn test_pattern_forms() {
        let p = CodePattern::parse("dn.*");
        assert!(p.matches("DN.3"));
        assert!(!p.matches("D.3"));
        assert_eq!(p.raw(), "dn.*");

        let p = CodePattern::parse("DN.");
        assert!(p.matches("DN.1"));

        let e = CodePattern::parse("b.1");
        assert!(e.matches("B.1"));
        assert!(!e.matches("B.11"));
    }

    #[test]
    fn test_fmt_mult() {
        assert_eq!(fmt_mult(1.0), "1");
        assert_eq!(fmt_mult(1.5), "1.5");
    }
}
