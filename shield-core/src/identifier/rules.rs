//! Heuristic rules for payment identifiers
//!
//! Positive points are risk, negative points are trust. Tiered rules take the
//! first matching tier.

use super::parser::{segments, HandleFeatures, ParsedIdentifier, ProviderKind};

/// Keywords typical of scam handles
pub const SCAM_KEYWORDS: &[&str] = &[
    "refund",
    "cashback",
    "prize",
    "lottery",
    "winner",
    "reward",
    "bonus",
    "offer",
    "claim",
    "lucky",
    "congratulations",
    "selected",
    "verification",
    "kyc",
    "update",
    "submit",
    "approve",
];

/// Authority terms that a personal handle should not carry
pub const AUTHORITY_KEYWORDS: &[&str] = &[
    "rbi",
    "govt",
    "government",
    "bank",
    "sbi",
    "icici",
    "hdfc",
    "axis",
    "pnb",
    "baroda",
    "rbisupport",
    "bankhelp",
    "support",
    "customer",
    "service",
    "helpdesk",
    "care",
    "official",
    "verify",
    "office",
    "manager",
];

/// Authority terms looked for in display names
pub const AUTHORITY_NAMES: &[&str] = &[
    "bank",
    "rbi",
    "support",
    "customer",
    "service",
    "refund",
    "helpdesk",
    "official",
    "government",
    "govt",
    "sbi",
    "hdfc",
    "icici",
    "axis",
    "paytm",
    "phonepe",
    "gpay",
    "amazon",
    "flipkart",
];

/// Well-known companies looked for in display names
pub const COMPANY_NAMES: &[&str] = &[
    "amazon", "flipkart", "paytm", "phonepe", "gpay", "zomato", "swiggy",
];

/// Rule predicate
pub type Check = fn(&RuleInput<'_>) -> Option<Hit>;

/// Inputs shared by every rule
#[derive(Debug)]
pub struct RuleInput<'a> {
    /// Parsed identifier
    pub parsed: &'a ParsedIdentifier,
    /// Shape features of the handle
    pub features: &'a HandleFeatures,
    /// Lowercased handle
    pub handle_lower: String,
    /// Trimmed display name as supplied
    pub display_name: Option<&'a str>,
    /// Lowercased display name
    pub name_lower: Option<String>,
}

impl<'a> RuleInput<'a> {
    /// Prepare rule input
    pub fn new(
        parsed: &'a ParsedIdentifier,
        features: &'a HandleFeatures,
        display_name: Option<&'a str>,
    ) -> Self {
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());
        Self {
            parsed,
            features,
            handle_lower: parsed.handle.to_lowercase(),
            display_name,
            name_lower: display_name.map(str::to_lowercase),
        }
    }
}

/// Points and reason from a matching rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Risk points; negative for trust
    pub points: i32,
    /// Human-readable reason
    pub reason: String,
}

fn hit(points: i32, reason: impl Into<String>) -> Option<Hit> {
    Some(Hit {
        points,
        reason: reason.into(),
    })
}

/// Catalog entry
#[derive(Clone, Copy)]
pub struct IdentifierRule {
    /// Stable rule id (`U…` risk, `T…` trust)
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Predicate producing the hit
    pub check: Check,
}

impl std::fmt::Debug for IdentifierRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Every rule, in evaluation order
pub const RULES: &[IdentifierRule] = &[
    IdentifierRule {
        id: "U001",
        name: "Excessive Digits",
        check: excessive_digits,
    },
    IdentifierRule {
        id: "U002",
        name: "Random Pattern",
        check: random_pattern,
    },
    IdentifierRule {
        id: "U003",
        name: "Handle Length",
        check: handle_length,
    },
    IdentifierRule {
        id: "U004",
        name: "Repeated Characters",
        check: repeated_chars,
    },
    IdentifierRule {
        id: "U005",
        name: "Sequential Digits",
        check: sequential_digits,
    },
    IdentifierRule {
        id: "U006",
        name: "Unknown Provider",
        check: unknown_provider,
    },
    IdentifierRule {
        id: "U007",
        name: "Scam Keywords",
        check: scam_keywords,
    },
    IdentifierRule {
        id: "U008",
        name: "Authority Impersonation",
        check: authority_impersonation,
    },
    IdentifierRule {
        id: "U009",
        name: "Authority Name Mismatch",
        check: authority_name_mismatch,
    },
    IdentifierRule {
        id: "U010",
        name: "Company Name Mismatch",
        check: company_name_mismatch,
    },
    IdentifierRule {
        id: "T001",
        name: "Trust: Clean Handle",
        check: clean_handle,
    },
    IdentifierRule {
        id: "T002",
        name: "Trust: Merchant Provider",
        check: merchant_provider,
    },
    IdentifierRule {
        id: "T003",
        name: "Trust: Name Matches Handle",
        check: name_matches_handle,
    },
];

// ===== TIERED RULES =====

struct Tier {
    matches: fn(&HandleFeatures) -> bool,
    points: i32,
    reason: &'static str,
}

const DIGIT_TIERS: &[Tier] = &[
    Tier {
        matches: |f| f.is_all_digits,
        points: 20,
        reason: "Handle is entirely numeric (likely phone number)",
    },
    Tier {
        matches: |f| f.digit_ratio > 0.7,
        points: 25,
        reason: "Handle has excessive digits (>70%)",
    },
    Tier {
        matches: |f| f.digit_ratio > 0.5,
        points: 15,
        reason: "Handle has many digits (>50%)",
    },
    Tier {
        matches: |f| f.digit_ratio > 0.3,
        points: 5,
        reason: "Handle contains significant digits",
    },
];

const LENGTH_TIERS: &[Tier] = &[
    Tier {
        matches: |f| f.length < 3,
        points: 15,
        reason: "Handle is suspiciously short (<3 chars)",
    },
    Tier {
        matches: |f| f.length > 30,
        points: 15,
        reason: "Handle is unusually long (>30 chars)",
    },
    Tier {
        matches: |f| f.length > 20,
        points: 5,
        reason: "Handle is somewhat long (>20 chars)",
    },
];

const CLEAN_HANDLE_TIERS: &[Tier] = &[
    Tier {
        matches: |f| f.is_all_alpha && (4..=15).contains(&f.length),
        points: -15,
        reason: "Clean alphabetic handle",
    },
    Tier {
        matches: |f| f.is_all_alpha,
        points: -5,
        reason: "Alphabetic handle",
    },
];

fn first_tier(tiers: &[Tier], features: &HandleFeatures) -> Option<Hit> {
    tiers
        .iter()
        .find(|tier| (tier.matches)(features))
        .and_then(|tier| hit(tier.points, tier.reason))
}

fn excessive_digits(input: &RuleInput<'_>) -> Option<Hit> {
    first_tier(DIGIT_TIERS, input.features)
}

fn handle_length(input: &RuleInput<'_>) -> Option<Hit> {
    first_tier(LENGTH_TIERS, input.features)
}

fn clean_handle(input: &RuleInput<'_>) -> Option<Hit> {
    first_tier(CLEAN_HANDLE_TIERS, input.features)
}

// ===== HANDLE SHAPE =====

fn random_pattern(input: &RuleInput<'_>) -> Option<Hit> {
    if input.features.looks_random {
        return hit(20, "Handle appears randomly generated");
    }
    None
}

fn repeated_chars(input: &RuleInput<'_>) -> Option<Hit> {
    if input.features.has_repeated_chars {
        return hit(15, "Handle contains repeated character sequences");
    }
    None
}

fn sequential_digits(input: &RuleInput<'_>) -> Option<Hit> {
    if input.features.has_sequential_digits {
        return hit(10, "Handle contains sequential digit pattern");
    }
    None
}

fn unknown_provider(input: &RuleInput<'_>) -> Option<Hit> {
    if !input.parsed.provider_known() {
        let provider = &input.parsed.provider;
        return hit(20, format!("Unknown payment provider: @{}", provider));
    }
    None
}

// ===== KEYWORDS =====

fn scam_keywords(input: &RuleInput<'_>) -> Option<Hit> {
    let found: Vec<&str> = SCAM_KEYWORDS
        .iter()
        .copied()
        .filter(|k| input.handle_lower.contains(k))
        .collect();
    let first = *found.first()?;

    let mut points = 35;
    if segments(&input.parsed.handle).iter().any(|s| s == first) {
        points += 15;
    }
    points += 20 * (found.len() as i32 - 1);

    hit(points, format!("Handle contains scam keyword: '{}'", first))
}

fn authority_impersonation(input: &RuleInput<'_>) -> Option<Hit> {
    if input.features.length <= 5 {
        return None;
    }
    let keyword = AUTHORITY_KEYWORDS
        .iter()
        .find(|k| input.handle_lower.contains(*k))?;
    hit(30, format!("Handle impersonates authority: '{}'", keyword))
}

// ===== DISPLAY NAME =====

fn authority_name_mismatch(input: &RuleInput<'_>) -> Option<Hit> {
    let (shown, name) = (input.display_name?, input.name_lower.as_deref()?);
    let claimed: Vec<&str> = AUTHORITY_NAMES
        .iter()
        .copied()
        .filter(|term| name.contains(term))
        .collect();
    if claimed.is_empty() || !input.parsed.provider_kind.looks_personal() {
        return None;
    }

    let handle_suspicious = input.features.digit_count > 0
        || !claimed.iter().any(|term| input.handle_lower.contains(term));

    if handle_suspicious {
        let reason = format!(
            "Display name '{}' claims authority but handle looks personal",
            shown
        );
        hit(50, reason)
    } else {
        let reason = format!("Authority name '{}' using personal handle provider", shown);
        hit(25, reason)
    }
}

fn company_name_mismatch(input: &RuleInput<'_>) -> Option<Hit> {
    let name = input.name_lower.as_deref()?;
    let company = COMPANY_NAMES
        .iter()
        .find(|c| name.contains(*c) && !input.handle_lower.contains(*c))?;
    let reason = format!("Name mentions '{}' but handle doesn't match", company);
    hit(40, reason)
}

// ===== TRUST =====

fn merchant_provider(input: &RuleInput<'_>) -> Option<Hit> {
    if input.parsed.provider_kind == ProviderKind::Merchant {
        return hit(-10, "Known merchant payment provider");
    }
    None
}

fn letters_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn name_matches_handle(input: &RuleInput<'_>) -> Option<Hit> {
    let name = letters_only(input.display_name?);
    let handle = letters_only(&input.parsed.handle);
    let long_enough = handle.len() >= 4 && name.len() >= 4;
    if long_enough && (name.contains(&handle) || handle.contains(&name)) {
        return hit(-10, "Display name matches handle");
    }
    None
}
