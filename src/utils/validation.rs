/// Substrings that mark a token name or symbol as spam.
pub const SPAM_BLACKLIST: [&str; 7] = ["test", "spam", "scam", "fake", "token", "coin", "airdrop"];

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 30;

/// Heuristic check that a token name or symbol looks like a real project.
///
/// The value is lower-cased and stripped down to `[a-z0-9\s]` before the
/// length and blacklist checks run.
pub fn is_valid_token_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }

    let lowered = value.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim();

    let len = cleaned.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return false;
    }

    !SPAM_BLACKLIST.iter().any(|word| cleaned.contains(word))
}
