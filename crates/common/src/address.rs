//! Address screening for the wallet console.
//!
//! The canonical on-platform address is 20 bytes rendered as `0x` + 40 hex
//! digits. Validation is strict: no trimming, no case normalization — those
//! are separate, explicit steps so the caller controls what gets stored.

/// Exactly `0x` followed by 40 hex digits. Mixed case passes; surrounding
/// whitespace does not.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Canonical storage form: lowercase hex.
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Outcome of screening a pasted batch of address candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkScreen {
    /// Normalized (lowercase) addresses that passed, first occurrence wins.
    pub valid: Vec<String>,
    /// Trimmed originals that failed the format check.
    pub invalid: Vec<String>,
}

impl BulkScreen {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }
}

/// Screen one candidate per entry (caller splits on line breaks): trim,
/// lowercase, validate, dedupe. Blank lines are skipped; malformed entries
/// are reported in `invalid`, never an error.
pub fn screen_bulk_addresses<S: AsRef<str>>(lines: &[S]) -> BulkScreen {
    let mut screen = BulkScreen::default();
    for line in lines {
        let trimmed = line.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let normalized = normalize_address(trimmed);
        if is_valid_address(&normalized) {
            if !screen.valid.contains(&normalized) {
                screen.valid.push(normalized);
            }
        } else {
            screen.invalid.push(trimmed.to_string());
        }
    }
    screen
}
