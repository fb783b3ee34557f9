/// Seed value asking the backend to pick a random seed
pub const RANDOM_SEED: i64 = -1;

/// Normalize free-form seed input.
///
/// Blank input selects [`RANDOM_SEED`]. Otherwise the leading integer is used
/// (an optional sign followed by digits, trailing text ignored). Input with no
/// leading integer, or one that does not fit in an `i64`, also falls back to
/// [`RANDOM_SEED`].
pub fn parse_seed(input: &str) -> i64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return RANDOM_SEED;
    }

    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return RANDOM_SEED;
    }

    trimmed[..sign_len + digits_len]
        .parse::<i64>()
        .unwrap_or(RANDOM_SEED)
}
