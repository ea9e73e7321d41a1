use serde::{Deserialize, Serialize};

/// Named difficulty levels offered when creating a puzzle. The backend only
/// ever sees the numeric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Warmup,
    Beginner,
    Easy,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Warmup => "Warmup",
            Difficulty::Beginner => "Beginner",
            Difficulty::Easy => "Easy",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Expert => "Expert",
            Difficulty::Master => "Master",
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Difficulty::Warmup => 0.2,
            Difficulty::Beginner => 0.3,
            Difficulty::Easy => 0.4,
            Difficulty::Intermediate => 0.5,
            Difficulty::Advanced => 0.6,
            Difficulty::Expert => 0.7,
            Difficulty::Master => 0.8,
        }
    }

    /// Nearest named level for a backend difficulty value.
    pub fn from_value(value: f64) -> Difficulty {
        let tenths = (value * 10.0).round();
        if tenths <= 2.0 {
            Difficulty::Warmup
        } else if tenths <= 3.0 {
            Difficulty::Beginner
        } else if tenths <= 4.0 {
            Difficulty::Easy
        } else if tenths <= 5.0 {
            Difficulty::Intermediate
        } else if tenths <= 6.0 {
            Difficulty::Advanced
        } else if tenths <= 7.0 {
            Difficulty::Expert
        } else {
            Difficulty::Master
        }
    }

    pub fn all() -> &'static [Difficulty] {
        &[
            Difficulty::Warmup,
            Difficulty::Beginner,
            Difficulty::Easy,
            Difficulty::Intermediate,
            Difficulty::Advanced,
            Difficulty::Expert,
            Difficulty::Master,
        ]
    }

    pub fn next(&self) -> Difficulty {
        match self {
            Difficulty::Warmup => Difficulty::Beginner,
            Difficulty::Beginner => Difficulty::Easy,
            Difficulty::Easy => Difficulty::Intermediate,
            Difficulty::Intermediate => Difficulty::Advanced,
            Difficulty::Advanced => Difficulty::Expert,
            Difficulty::Expert => Difficulty::Master,
            Difficulty::Master => Difficulty::Warmup,
        }
    }

    pub fn prev(&self) -> Difficulty {
        match self {
            Difficulty::Warmup => Difficulty::Master,
            Difficulty::Beginner => Difficulty::Warmup,
            Difficulty::Easy => Difficulty::Beginner,
            Difficulty::Intermediate => Difficulty::Easy,
            Difficulty::Advanced => Difficulty::Intermediate,
            Difficulty::Expert => Difficulty::Advanced,
            Difficulty::Master => Difficulty::Expert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_labels() {
        for d in Difficulty::all() {
            assert_eq!(Difficulty::from_value(d.value()), *d);
        }
    }

    #[test]
    fn out_of_table_values_clamp() {
        assert_eq!(Difficulty::from_value(0.1), Difficulty::Warmup);
        assert_eq!(Difficulty::from_value(0.99), Difficulty::Master);
        assert_eq!(Difficulty::from_value(0.54), Difficulty::Intermediate);
    }

    #[test]
    fn next_and_prev_cycle() {
        assert_eq!(Difficulty::Master.next(), Difficulty::Warmup);
        assert_eq!(Difficulty::Warmup.prev(), Difficulty::Master);
        for d in Difficulty::all() {
            assert_eq!(d.next().prev(), *d);
        }
    }
}
