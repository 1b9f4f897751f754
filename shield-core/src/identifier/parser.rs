//! Payment identifier parsing and handle feature extraction

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `handle@provider`: handle 1-100 of `[A-Za-z0-9._-]`, provider 2-50 alphanumeric
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z0-9._-]{1,100})@([a-zA-Z0-9]{2,50})$").unwrap());

const PERSONAL_BANK_PROVIDERS: &[&str] = &[
    "okicici",
    "oksbi",
    "okhdfcbank",
    "okaxis",
    "ybl",
    "ibl",
    "sbi",
    "icici",
    "hdfcbank",
    "axisbank",
    "upi",
    "barodampay",
    "pnb",
    "canarabank",
    "unionbank",
    "bob",
    "kotak",
    "indus",
    "federal",
    "rbl",
    "dbs",
    "hsbc",
    "citi",
    "sc",
];

const PERSONAL_APP_PROVIDERS: &[&str] = &[
    "paytm",
    "gpay",
    "phonepe",
    "freecharge",
    "mobikwik",
    "airtel",
    "jio",
    "amazonpay",
    "slice",
    "cred",
    "jupiter",
];

const MERCHANT_PROVIDERS: &[&str] = &[
    "paytm",
    "razorpay",
    "yesbank",
    "yesbankltd",
    "hdfcbankqr",
    "axisb",
    "icicibank",
    "sbiupi",
];

/// Kind of payment-service operator behind a provider suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Bank-issued personal handle
    PersonalBank,
    /// Payment-app personal handle
    PersonalApp,
    /// Merchant collection handle
    Merchant,
    /// Not in the catalog
    Unknown,
}

impl ProviderKind {
    /// Classify a lowercase provider suffix. Catalog groups are searched in
    /// order, so a suffix listed twice takes its first group.
    pub fn classify(provider: &str) -> Self {
        const CATALOG: [(ProviderKind, &[&str]); 3] = [
            (ProviderKind::PersonalBank, PERSONAL_BANK_PROVIDERS),
            (ProviderKind::PersonalApp, PERSONAL_APP_PROVIDERS),
            (ProviderKind::Merchant, MERCHANT_PROVIDERS),
        ];

        CATALOG
            .iter()
            .find(|(_, suffixes)| suffixes.contains(&provider))
            .map_or(ProviderKind::Unknown, |(kind, _)| *kind)
    }

    /// Provider is used for personal accounts, or cannot be vouched for
    pub fn looks_personal(&self) -> bool {
        !matches!(self, ProviderKind::Merchant)
    }
}

/// Handle features used by the heuristic rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleFeatures {
    /// Characters in the handle
    pub length: usize,
    /// ASCII digits
    pub digit_count: usize,
    /// ASCII letters
    pub letter_count: usize,
    /// Digits over length
    pub digit_ratio: f64,
    /// Handle is digits only
    pub is_all_digits: bool,
    /// Handle is letters only
    pub is_all_alpha: bool,
    /// Four or more identical characters in a row
    pub has_repeated_chars: bool,
    /// Four consecutive ascending or descending digits
    pub has_sequential_digits: bool,
    /// Frequent letter/digit alternation
    pub looks_random: bool,
}

impl HandleFeatures {
    /// Extract features from an ASCII handle
    pub fn extract(handle: &str) -> Self {
        let chars: Vec<char> = handle.chars().collect();
        let length = chars.len();
        let digit_count = chars.iter().filter(|c| c.is_ascii_digit()).count();
        let letter_count = chars.iter().filter(|c| c.is_ascii_alphabetic()).count();

        Self {
            length,
            digit_count,
            letter_count,
            digit_ratio: if length > 0 {
                digit_count as f64 / length as f64
            } else {
                0.0
            },
            is_all_digits: length > 0 && digit_count == length,
            is_all_alpha: length > 0 && letter_count == length,
            has_repeated_chars: has_run(&chars, 4),
            has_sequential_digits: has_sequential_digits(&chars, 4),
            looks_random: looks_random(&chars),
        }
    }
}

fn has_run(chars: &[char], len: usize) -> bool {
    chars.windows(len).any(|w| w.iter().all(|c| *c == w[0]))
}

fn has_sequential_digits(chars: &[char], len: usize) -> bool {
    chars.windows(len).any(|w| {
        let digits: Option<Vec<i32>> = w
            .iter()
            .map(|c| c.to_digit(10).map(|d| d as i32))
            .collect();
        match digits {
            Some(d) => {
                let step = d[1] - d[0];
                (step == 1 || step == -1) && d.windows(2).all(|p| p[1] - p[0] == step)
            }
            None => false,
        }
    })
}

/// More than 40% of adjacent pairs switch between digit and non-digit
fn looks_random(chars: &[char]) -> bool {
    if chars.len() < 6 {
        return false;
    }
    let transitions = chars
        .windows(2)
        .filter(|p| p[0].is_ascii_digit() != p[1].is_ascii_digit())
        .count();
    transitions as f64 / (chars.len() - 1) as f64 > 0.4
}

/// Lowercase handle split on `.`, `_`, `-` and at letter/digit boundaries
pub fn segments(handle: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_digit: Option<bool> = None;

    for c in handle.chars().map(|c| c.to_ascii_lowercase()) {
        if matches!(c, '.' | '_' | '-') {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_digit = None;
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if prev_digit.map_or(false, |p| p != is_digit) && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev_digit = Some(is_digit);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// A syntactically valid identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentifier {
    /// Handle as written
    pub handle: String,
    /// Lowercase provider suffix
    pub provider: String,
    /// Catalog group of the provider
    pub provider_kind: ProviderKind,
}

impl ParsedIdentifier {
    /// `handle@provider`, lowercased
    pub fn normalized(&self) -> String {
        format!("{}@{}", self.handle.to_lowercase(), self.provider)
    }

    /// Provider appears in the catalog
    pub fn provider_known(&self) -> bool {
        self.provider_kind != ProviderKind::Unknown
    }
}

/// Parse a trimmed identifier; `None` when malformed
pub fn parse(identifier: &str) -> Option<ParsedIdentifier> {
    let caps = IDENTIFIER_PATTERN.captures(identifier.trim())?;
    let handle = caps.get(1)?.as_str().to_string();
    let provider = caps.get(2)?.as_str().to_lowercase();
    let provider_kind = ProviderKind::classify(&provider);

    Some(ParsedIdentifier {
        handle,
        provider,
        provider_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let parsed = parse("  Ramesh.K@OKICICI ").unwrap();
        assert_eq!(parsed.handle, "Ramesh.K");
        assert_eq!(parsed.provider, "okicici");
        assert_eq!(parsed.provider_kind, ProviderKind::PersonalBank);
        assert_eq!(parsed.normalized(), "ramesh.k@okicici");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let malformed = [
            "",
            "@ybl",
            "name@",
            "name@y",
            "na me@ybl",
            "a@b@ybl",
            "name@ok-icici",
            "name",
        ];
        for bad in malformed {
            assert!(parse(bad).is_none(), "{} should be rejected", bad);
        }
        assert!(parse(&format!("{}@ybl", "a".repeat(101))).is_none());
        assert!(parse(&format!("{}@ybl", "a".repeat(100))).is_some());
    }

    #[test]
    fn test_provider_catalog_order() {
        assert_eq!(ProviderKind::classify("paytm"), ProviderKind::PersonalApp);
        assert_eq!(ProviderKind::classify("razorpay"), ProviderKind::Merchant);
        assert_eq!(ProviderKind::classify("sbi"), ProviderKind::PersonalBank);
        assert_eq!(ProviderKind::classify("fastpay"), ProviderKind::Unknown);
    }

    #[test]
    fn test_handle_features() {
        let f = HandleFeatures::extract("refund123456");
        assert_eq!(f.length, 12);
        assert_eq!(f.digit_ratio, 0.5);
        assert!(f.has_sequential_digits);
        assert!(!f.looks_random);
        assert!(!f.is_all_alpha);

        let f = HandleFeatures::extract("a1b2c3d4");
        assert!(f.looks_random);

        let f = HandleFeatures::extract("xxxx99");
        assert!(f.has_repeated_chars);
        assert!(!f.has_sequential_digits);

        let f = HandleFeatures::extract("9876543210");
        assert!(f.is_all_digits);
        assert!(f.has_sequential_digits);
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("refund123456"), vec!["refund", "123456"]);
        assert_eq!(segments("KYC.update_99"), vec!["kyc", "update", "99"]);
        assert_eq!(segments("my-cash-back"), vec!["my", "cash", "back"]);
    }
}
