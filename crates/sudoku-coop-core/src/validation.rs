use thiserror::Error;

use crate::puzzle::MAX_PLAYERS_PER_PUZZLE;

pub const MIN_DIFFICULTY: f64 = 0.1;
pub const MAX_DIFFICULTY: f64 = 0.99;

/// Box size sent to the backend; 3 means a classic 9x9 board.
pub const DEFAULT_SIZE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("difficulty must be between 0.1 and 0.99, got {0}")]
    DifficultyOutOfRange(f64),

    #[error("\"{0}\" does not look like an email address")]
    InvalidEmail(String),

    #[error("at most {max} other players can be invited, got {count}")]
    TooManyInvitees { count: usize, max: usize },
}

/// A create-puzzle request that passed the local checks. These are hints
/// for the player; the backend does its own validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePuzzle {
    pub difficulty: f64,
    pub size: u8,
    pub invitees: Vec<String>,
}

impl CreatePuzzle {
    pub fn new(difficulty: f64, invitees: Vec<String>) -> Result<Self, ValidationError> {
        validate_difficulty(difficulty)?;
        let max = MAX_PLAYERS_PER_PUZZLE - 1;
        if invitees.len() > max {
            return Err(ValidationError::TooManyInvitees {
                count: invitees.len(),
                max,
            });
        }
        if let Some(bad) = invitees.iter().find(|e| !is_plausible_email(e)) {
            return Err(ValidationError::InvalidEmail(bad.clone()));
        }
        Ok(Self {
            difficulty,
            size: DEFAULT_SIZE,
            invitees,
        })
    }

    /// Build from the free-text invitee field.
    pub fn from_input(difficulty: f64, invitees: &str) -> Result<Self, ValidationError> {
        Self::new(difficulty, parse_invitees(invitees))
    }

    /// Comma separated form used in the `additional_players` query parameter.
    pub fn invitees_csv(&self) -> String {
        self.invitees.join(",")
    }
}

pub fn validate_difficulty(difficulty: f64) -> Result<(), ValidationError> {
    if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        Ok(())
    } else {
        Err(ValidationError::DifficultyOutOfRange(difficulty))
    }
}

/// Split a comma separated list, dropping blank entries.
pub fn parse_invitees(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loose syntactic check: an `@` and a `.` somewhere.
pub fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
