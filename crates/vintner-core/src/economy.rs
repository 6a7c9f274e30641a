//! Economy phase automaton.
//!
//! The economy moves through five ordered phases as a biased random walk,
//! advanced once per season rollover. Edge phases (Crash, Boom) can only
//! move inward; middle phases can move one step in either direction. The
//! result is a sticky, mean-reverting macro cycle whose index can never
//! leave `0..=4`.
//!
//! | Current  | `r < p_edge`     | `r < p_mid`     | `p_mid <= r < 2 p_mid` | otherwise |
//! |----------|------------------|-----------------|------------------------|-----------|
//! | Crash    | Recession        |                 |                        | stay      |
//! | Boom     | Expansion        |                 |                        | stay      |
//! | middle   |                  | toward Crash    | toward Boom            | stay      |

use rand::Rng;
use vintner_types::EconomyPhase;

use crate::config::EconomyConfig;

/// Result of one automaton step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EconomyShift {
    /// Phase before the step.
    pub from: EconomyPhase,
    /// Phase after the step (may equal `from`).
    pub to: EconomyPhase,
}

impl EconomyShift {
    /// Whether the phase actually moved.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// Player-facing description of the move, or `None` if the phase stayed.
    pub fn message(&self) -> Option<String> {
        self.changed().then(|| transition_message(self.from, self.to))
    }
}

/// The economy phase random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconomyAutomaton {
    /// Probability that an edge phase moves inward.
    edge_shift_chance: f64,
    /// Probability, per direction, that a middle phase moves.
    middle_shift_chance: f64,
}

impl Default for EconomyAutomaton {
    fn default() -> Self {
        Self::from_config(&EconomyConfig::default())
    }
}

impl EconomyAutomaton {
    /// Build the automaton from validated configuration.
    pub const fn from_config(config: &EconomyConfig) -> Self {
        Self {
            edge_shift_chance: config.edge_shift_chance,
            middle_shift_chance: config.middle_shift_chance,
        }
    }

    /// Pure transition function for a uniform draw `r` in `[0, 1)`.
    pub fn next(&self, current: EconomyPhase, r: f64) -> EconomyPhase {
        if current.is_edge() {
            if r < self.edge_shift_chance {
                current.toward_interior()
            } else {
                current
            }
        } else if r < self.middle_shift_chance {
            current.toward_crash()
        } else if r < self.middle_shift_chance * 2.0 {
            current.toward_boom()
        } else {
            current
        }
    }

    /// Draw one value from `rng` and apply [`next`](Self::next).
    pub fn step(&self, current: EconomyPhase, rng: &mut impl Rng) -> EconomyShift {
        let r: f64 = rng.random();
        EconomyShift {
            from: current,
            to: self.next(current, r),
        }
    }
}

/// Human-readable description of a phase change.
pub fn transition_message(from: EconomyPhase, to: EconomyPhase) -> String {
    let direction = if to > from { "improved" } else { "worsened" };
    format!("The economy has {direction}: {from} gave way to {to}.")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn automaton() -> EconomyAutomaton {
        EconomyAutomaton::default()
    }

    #[test]
    fn index_never_leaves_bounds() {
        let automaton = automaton();
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        for start in EconomyPhase::ALL {
            let mut phase = start;
            for _ in 0..10_000 {
                let shift = automaton.step(phase, &mut rng);
                let delta = i16::from(shift.to.index()) - i16::from(shift.from.index());
                assert!(delta.abs() <= 1, "jumped more than one step: {shift:?}");
                assert!(shift.to.index() <= 4);
                phase = shift.to;
            }
        }
    }

    #[test]
    fn crash_never_moves_down() {
        let automaton = automaton();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let next = automaton.step(EconomyPhase::Crash, &mut rng).to;
            assert!(next == EconomyPhase::Crash || next == EconomyPhase::Recession);
        }
    }

    #[test]
    fn boom_never_moves_up() {
        let automaton = automaton();
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let next = automaton.step(EconomyPhase::Boom, &mut rng).to;
            assert!(next == EconomyPhase::Boom || next == EconomyPhase::Expansion);
        }
    }

    #[test]
    fn edge_threshold_is_exclusive() {
        let automaton = automaton();
        assert_eq!(automaton.next(EconomyPhase::Crash, 0.0), EconomyPhase::Recession);
        assert_eq!(automaton.next(EconomyPhase::Crash, 0.33), EconomyPhase::Recession);
        assert_eq!(automaton.next(EconomyPhase::Crash, 0.34), EconomyPhase::Crash);
        assert_eq!(automaton.next(EconomyPhase::Boom, 0.1), EconomyPhase::Expansion);
        assert_eq!(automaton.next(EconomyPhase::Boom, 0.9), EconomyPhase::Boom);
    }

    #[test]
    fn middle_bands_split_down_up_stay() {
        let automaton = automaton();
        let phase = EconomyPhase::Stable;
        assert_eq!(automaton.next(phase, 0.0), EconomyPhase::Recession);
        assert_eq!(automaton.next(phase, 0.24), EconomyPhase::Recession);
        assert_eq!(automaton.next(phase, 0.25), EconomyPhase::Expansion);
        assert_eq!(automaton.next(phase, 0.49), EconomyPhase::Expansion);
        assert_eq!(automaton.next(phase, 0.5), EconomyPhase::Stable);
        assert_eq!(automaton.next(phase, 0.99), EconomyPhase::Stable);
    }

    #[test]
    fn middle_neighbors_of_edges_can_reach_edges() {
        let automaton = automaton();
        assert_eq!(automaton.next(EconomyPhase::Recession, 0.1), EconomyPhase::Crash);
        assert_eq!(automaton.next(EconomyPhase::Expansion, 0.3), EconomyPhase::Boom);
    }

    #[test]
    fn walk_visits_every_phase() {
        let automaton = automaton();
        let mut rng = SmallRng::seed_from_u64(99);
        let mut seen = [false; 5];
        let mut phase = EconomyPhase::Stable;
        for _ in 0..10_000 {
            phase = automaton.step(phase, &mut rng).to;
            if let Some(slot) = seen.get_mut(usize::from(phase.index())) {
                *slot = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn message_only_when_changed() {
        let same = EconomyShift {
            from: EconomyPhase::Stable,
            to: EconomyPhase::Stable,
        };
        assert!(same.message().is_none());

        let up = EconomyShift {
            from: EconomyPhase::Stable,
            to: EconomyPhase::Expansion,
        };
        let text = up.message().unwrap_or_default();
        assert!(text.contains("improved"));
        assert!(text.contains("Stable"));
        assert!(text.contains("Expansion"));
    }
}
