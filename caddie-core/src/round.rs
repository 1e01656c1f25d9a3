use crate::model::{DEFAULT_PAR, HoleScore, Round};

/// Local view of the round in progress: which hole the player is on and
/// running totals that stay in step with hole updates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTracker {
    round: Option<Round>,
    current_hole: u32,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self { round: None, current_hole: 1 }
    }
}

impl RoundTracker {
    /// Pick up where the player left off: the first hole without shots, or
    /// the last hole if every hole has been played.
    pub fn from_active(round: Option<Round>) -> Self {
        match round {
            Some(round) => {
                let current_hole = round
                    .hole_scores
                    .iter()
                    .find(|h| h.shots == 0)
                    .map(|h| h.hole_number)
                    .unwrap_or(round.total_holes);
                Self { round: Some(round), current_hole }
            }
            None => Self::default(),
        }
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn current_hole(&self) -> u32 {
        self.current_hole
    }

    pub fn next_hole(&mut self) {
        if let Some(round) = &self.round {
            if self.current_hole < round.total_holes {
                self.current_hole += 1;
            }
        }
    }

    pub fn previous_hole(&mut self) {
        if self.current_hole > 1 {
            self.current_hole -= 1;
        }
    }

    /// Jump to `hole_number`. Ignored without a round or outside `1..=total_holes`.
    pub fn set_current_hole(&mut self, hole_number: u32) {
        if let Some(round) = &self.round {
            if (1..=round.total_holes).contains(&hole_number) {
                self.current_hole = hole_number;
            }
        }
    }

    /// Swap in the backend's view of one hole and recompute round totals.
    pub fn apply_hole_score(&mut self, updated: HoleScore) {
        let Some(round) = self.round.as_mut() else {
            return;
        };

        match round.hole_scores.iter_mut().find(|h| h.hole_number == updated.hole_number) {
            Some(hole) => *hole = updated,
            None => {
                log::warn!("Hole {} is not part of round {}", updated.hole_number, round.id);
                return;
            }
        }

        round.total_shots = round.hole_scores.iter().map(|h| h.shots).sum();
        round.total_par = round.hole_scores.iter().map(|h| h.par).sum();
        round.score_relative_to_par = round.total_shots as i32 - round.total_par as i32;
    }

    pub fn current_hole_data(&self) -> Option<&HoleScore> {
        self.round.as_ref()?.hole_scores.iter().find(|h| h.hole_number == self.current_hole)
    }

    pub fn current_hole_shots(&self) -> u32 {
        self.current_hole_data().map(|h| h.shots).unwrap_or(0)
    }

    pub fn current_hole_par(&self) -> u32 {
        self.current_hole_data().map(|h| h.par).unwrap_or(DEFAULT_PAR)
    }
}

/// Aggregates over a player's round history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundStats {
    pub rounds_played: usize,
    pub total_shots: u32,
    pub total_par: u32,
    /// Shots as a percentage of par.
    pub efficiency_pct: u32,
    /// Mean shots per completed round.
    pub average_score: u32,
    /// Lowest score relative to par.
    pub best_score: Option<i32>,
}

impl RoundStats {
    /// Only completed rounds with recorded shots and par feed the averages;
    /// `rounds_played` counts everything.
    pub fn from_history(rounds: &[Round]) -> Self {
        let completed: Vec<&Round> = rounds
            .iter()
            .filter(|r| r.is_completed && r.total_shots > 0 && r.total_par > 0)
            .collect();

        if completed.is_empty() {
            return Self { rounds_played: rounds.len(), ..Self::default() };
        }

        let total_shots: u32 = completed.iter().map(|r| r.total_shots).sum();
        let total_par: u32 = completed.iter().map(|r| r.total_par).sum();

        Self {
            rounds_played: rounds.len(),
            total_shots,
            total_par,
            efficiency_pct: (total_shots as f64 / total_par as f64 * 100.0).round() as u32,
            average_score: (total_shots as f64 / completed.len() as f64).round() as u32,
            best_score: completed.iter().map(|r| r.score_relative_to_par).min(),
        }
    }
}

/// `Even`, `+3`, `-2`.
pub fn format_relative_score(score: i32) -> String {
    match score {
        0 => "Even".to_string(),
        s if s > 0 => format!("+{s}"),
        s => s.to_string(),
    }
}

/// Handicaps better than scratch are written with a leading `+`.
pub fn format_handicap(handicap: f64) -> String {
    if handicap < 0.0 { format!("+{}", handicap.abs()) } else { handicap.to_string() }
}
