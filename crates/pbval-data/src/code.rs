//! A-share instrument code helpers.
//!
//! Codes are stored bare (`688120`); providers want them with an exchange
//! suffix (`688120.SH`), a lowercase prefix (`sh688120`) or an Eastmoney
//! `secid` (`1.688120`).

use crate::error::{DataError, Result};
use std::fmt;

/// Listing exchange inferred from a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// Shanghai Stock Exchange
    Shanghai,
    /// Shenzhen Stock Exchange
    Shenzhen,
    /// Beijing Stock Exchange
    Beijing,
}

impl Exchange {
    /// Infer the exchange from a bare code. Unknown prefixes map to Shanghai.
    pub fn of(code: &str) -> Self {
        if code.starts_with('6') {
            Self::Shanghai
        } else if code.starts_with('0') || code.starts_with('3') || code.starts_with("159") {
            Self::Shenzhen
        } else if code.starts_with('4') || code.starts_with('8') {
            Self::Beijing
        } else {
            Self::Shanghai
        }
    }

    /// Uppercase suffix, e.g. `SH`.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Shanghai => "SH",
            Self::Shenzhen => "SZ",
            Self::Beijing => "BJ",
        }
    }

    /// Lowercase prefix, e.g. `sh`.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Shanghai => "sh",
            Self::Shenzhen => "sz",
            Self::Beijing => "bj",
        }
    }

    /// Eastmoney market id used in `secid` parameters.
    pub const fn eastmoney_market(&self) -> u8 {
        match self {
            Self::Shanghai => 1,
            Self::Shenzhen | Self::Beijing => 0,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Check that `code` is a bare six-digit code.
pub fn validate(code: &str) -> Result<&str> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(DataError::InvalidCode(code.to_string()))
    }
}

/// Remove any exchange suffix or prefix: `688120.SH` and `sh688120` become `688120`.
pub fn strip_market(code: &str) -> &str {
    let code = code.trim();
    let code = code.split('.').next().unwrap_or(code);
    let lower = code.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("sh" | "sz" | "bj") => &code[2..],
        _ => code,
    }
}

/// Suffixed form, e.g. `688120.SH`.
pub fn with_suffix(code: &str) -> String {
    let bare = strip_market(code);
    format!("{}.{}", bare, Exchange::of(bare).suffix())
}

/// Prefixed form, e.g. `sh688120`.
pub fn with_prefix(code: &str) -> String {
    let bare = strip_market(code);
    format!("{}{}", Exchange::of(bare).prefix(), bare)
}

/// Eastmoney `secid`, e.g. `1.600000`.
pub fn eastmoney_secid(code: &str) -> String {
    let bare = strip_market(code);
    format!("{}.{}", Exchange::of(bare).eastmoney_market(), bare)
}

/// Clean a code read from a holdings file.
///
/// Keeps only what follows the last `*` marker, drops whitespace and any
/// market decoration, and left-pads numeric codes to six digits. Returns
/// `None` when nothing numeric remains.
pub fn clean_holding_code(raw: &str) -> Option<String> {
    let marked = raw.rsplit('*').next().unwrap_or(raw);
    let trimmed: String = marked.chars().filter(|c| !c.is_whitespace()).collect();
    let bare = strip_market(&trimmed);
    if bare.is_empty() || bare.len() > 6 || !bare.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>6}", bare))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("688120", Exchange::Shanghai)]
    #[case("600000", Exchange::Shanghai)]
    #[case("000001", Exchange::Shenzhen)]
    #[case("300750", Exchange::Shenzhen)]
    #[case("159915", Exchange::Shenzhen)]
    #[case("430047", Exchange::Beijing)]
    #[case("830799", Exchange::Beijing)]
    #[case("510300", Exchange::Shanghai)]
    fn test_exchange_of(#[case] code: &str, #[case] expected: Exchange) {
        assert_eq!(Exchange::of(code), expected);
    }

    #[test]
    fn test_code_forms() {
        assert_eq!(with_suffix("688120"), "688120.SH");
        assert_eq!(with_suffix("000001.SZ"), "000001.SZ");
        assert_eq!(with_prefix("000001"), "sz000001");
        assert_eq!(eastmoney_secid("600000"), "1.600000");
        assert_eq!(eastmoney_secid("sz300750"), "0.300750");
    }

    #[rstest]
    #[case("688120.SH", "688120")]
    #[case("sh688120", "688120")]
    #[case("SZ000001", "000001")]
    #[case("000001", "000001")]
    fn test_strip_market(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(strip_market(raw), expected);
    }

    #[rstest]
    #[case("*600519", Some("600519"))]
    #[case("ST*600123", Some("600123"))]
    #[case("1", Some("000001"))]
    #[case(" 2594 ", Some("002594"))]
    #[case("", None)]
    #[case("ABC", None)]
    fn test_clean_holding_code(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(clean_holding_code(raw).as_deref(), expected);
    }

    #[test]
    fn test_validate() {
        assert!(validate("600000").is_ok());
        assert!(matches!(validate("60000"), Err(DataError::InvalidCode(_))));
        assert!(matches!(validate("60000a"), Err(DataError::InvalidCode(_))));
    }
}
