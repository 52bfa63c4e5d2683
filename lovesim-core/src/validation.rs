//! Input checks performed before anything is sent to the server.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 20;

static NICKNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[가-힣a-zA-Z0-9_\s]+$").expect("nickname pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Nickname must be between {min} and {max} characters (got {len})")]
    NicknameLength { len: usize, min: usize, max: usize },

    #[error("Nickname may only contain Hangul, letters, digits, underscores and spaces")]
    NicknameCharacters,

    #[error("Score must be between 0 and 100 (got {0})")]
    ScoreOutOfRange(i64),
}

/// Validate a leaderboard nickname, returning it trimmed.
pub fn validate_nickname(raw: &str) -> Result<String, ValidationError> {
    let nickname = raw.trim();
    let len = nickname.chars().count();

    if !(NICKNAME_MIN_CHARS..=NICKNAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::NicknameLength {
            len,
            min: NICKNAME_MIN_CHARS,
            max: NICKNAME_MAX_CHARS,
        });
    }

    if !NICKNAME_PATTERN.is_match(nickname) {
        return Err(ValidationError::NicknameCharacters);
    }

    Ok(nickname.to_string())
}

pub fn validate_score(score: i64) -> Result<u8, ValidationError> {
    u8::try_from(score)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or(ValidationError::ScoreOutOfRange(score))
}
