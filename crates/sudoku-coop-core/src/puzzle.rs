use serde::{Deserialize, Serialize};

use crate::board::{Grid, GridError};
use crate::difficulty::Difficulty;
use crate::protocol::PuzzleDto;
use crate::session::Identity;

pub type PuzzleId = u64;

/// Most players a single puzzle can hold, creator included.
pub const MAX_PLAYERS_PER_PUZZLE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
}

impl Player {
    /// "First L." with the first name capitalised.
    pub fn display_name(&self) -> String {
        let mut chars = self.first_name.chars();
        let first = match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        match self
            .last_name
            .as_deref()
            .and_then(|last| last.chars().next())
        {
            Some(initial) => format!("{} {}.", first, initial.to_uppercase()),
            None => first,
        }
    }

    pub fn is(&self, identity: &Identity) -> bool {
        identity.is_email(&self.email)
    }
}

/// The client's cached copy of a backend puzzle.
#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    pub id: PuzzleId,
    pub difficulty: f64,
    pub point_value: i64,
    pub completed: bool,
    pub grid: Grid,
    pub players: Vec<Player>,
}

impl Puzzle {
    pub fn difficulty_label(&self) -> &'static str {
        Difficulty::from_value(self.difficulty).label()
    }

    /// Roster position of a player, used to pick their display colour.
    pub fn roster_index(&self, identity: &Identity) -> Option<usize> {
        roster_index(&self.players, identity)
    }
}

impl TryFrom<PuzzleDto> for Puzzle {
    type Error = GridError;

    fn try_from(dto: PuzzleDto) -> Result<Self, Self::Error> {
        let grid = Grid::from_pieces(&dto.pieces)?;
        Ok(Self {
            id: dto.puzzle_id,
            difficulty: dto.difficulty,
            point_value: dto.point_value,
            completed: dto.completed,
            grid,
            players: dto.players,
        })
    }
}

pub fn roster_index(players: &[Player], identity: &Identity) -> Option<usize> {
    players.iter().position(|p| p.is(identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(first: &str, last: Option<&str>) -> Player {
        Player {
            id: 1,
            first_name: first.into(),
            last_name: last.map(Into::into),
            email: "p@example.com".into(),
        }
    }

    #[test]
    fn difficulty_label_outlives_the_lookup() {
        let puzzle = Puzzle {
            id: 4,
            difficulty: 0.52,
            point_value: 10,
            completed: false,
            grid: Grid::empty(),
            players: Vec::new(),
        };
        let label = puzzle.difficulty_label();
        drop(puzzle);
        assert_eq!(label, "Intermediate");
    }

    #[test]
    fn display_name_formats() {
        assert_eq!(player("grace", Some("hopper")).display_name(), "Grace H.");
        assert_eq!(player("alan", None).display_name(), "Alan");
        assert_eq!(player("alan", Some("")).display_name(), "Alan");
        assert_eq!(player("", None).display_name(), "");
    }

    #[test]
    fn roster_lookup_by_identity() {
        let players = vec![
            Player {
                id: 1,
                first_name: "a".into(),
                last_name: None,
                email: "a@x.io".into(),
            },
            Player {
                id: 2,
                first_name: "b".into(),
                last_name: None,
                email: "b@x.io".into(),
            },
        ];
        assert_eq!(roster_index(&players, &Identity::new("B", "B@x.io")), Some(1));
        assert_eq!(roster_index(&players, &Identity::new("C", "c@x.io")), None);
    }
}
