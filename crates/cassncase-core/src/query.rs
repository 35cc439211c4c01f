// ABOUTME: Normalization rules for looking up orders by email, phone, or order id.
// ABOUTME: Stored lookup keys and incoming queries go through the same functions.

/// Case-folded, trimmed email used for comparison.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Phone number with every non-digit character removed.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A buyer's lookup input, normalized once for each way it can match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// Trimmed input, compared verbatim (case-sensitive) to `order_id`.
    pub order_id: String,
    pub email: String,
    /// `None` when the input has no digits, so it never matches a blank phone.
    pub phone: Option<String>,
}

impl LookupQuery {
    /// Build a query from raw input. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let phone = normalize_phone(trimmed);
        Some(Self {
            order_id: trimmed.to_string(),
            email: normalize_email(trimmed),
            phone: (!phone.is_empty()).then_some(phone),
        })
    }
}
