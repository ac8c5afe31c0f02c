//! Exhaustive depth-first search over short move sequences.
//!
//! Every sequence of [`LOOKAHEAD_DEPTH`] moves is scored by the halite a
//! ship would accrue while following it. Only staying on a cell collects:
//! the first stay takes a quarter of the cell, each consecutive stay takes
//! three quarters of the previous take. Prefixes that touch a blocked cell
//! are pruned before their subtree is expanded.

use halite_fleet_core::{HaliteView, Move, PlannedStep, Position, LOOKAHEAD_DEPTH};

const COLLECT_RATE: f64 = 0.25;
const RESIDUAL_RATE: f64 = 0.75;

/// Highest scoring complete sequence.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CollectionPath {
    pub(crate) steps: [PlannedStep; LOOKAHEAD_DEPTH],
    pub(crate) total: f64,
}

/// Finds the best complete sequence starting at `origin`.
///
/// `is_blocked(depth, position)` rejects a position at a 1-based depth.
/// Ties keep the sequence enumerated first. Returns `None` when every
/// sequence is pruned.
pub(crate) fn plan_collection<F>(
    origin: Position,
    halite: HaliteView<'_>,
    is_blocked: F,
) -> Option<CollectionPath>
where
    F: Fn(usize, Position) -> bool,
{
    let mut search = Search {
        halite,
        is_blocked: &is_blocked,
        current: [PlannedStep {
            mv: Move::Stay,
            position: origin,
            halite: 0.0,
        }; LOOKAHEAD_DEPTH],
        best: None,
    };
    search.descend(1, origin, None, 0.0);
    search.best
}

struct Search<'a, F> {
    halite: HaliteView<'a>,
    is_blocked: &'a F,
    current: [PlannedStep; LOOKAHEAD_DEPTH],
    best: Option<CollectionPath>,
}

impl<F> Search<'_, F>
where
    F: Fn(usize, Position) -> bool,
{
    fn descend(&mut self, depth: usize, from: Position, previous: Option<PlannedStep>, total: f64) {
        for mv in Move::ALL {
            let position = from.translate(mv, self.halite.size());
            if (self.is_blocked)(depth, position) {
                continue;
            }

            let step = PlannedStep {
                mv,
                position,
                halite: accrual(mv, previous, self.halite.halite_at(position)),
            };
            self.current[depth - 1] = step;
            let total = total + step.halite;

            if depth < LOOKAHEAD_DEPTH {
                self.descend(depth + 1, position, Some(step), total);
            } else if self.best.as_ref().is_none_or(|best| total > best.total) {
                self.best = Some(CollectionPath {
                    steps: self.current,
                    total,
                });
            }
        }
    }
}

fn accrual(mv: Move, previous: Option<PlannedStep>, cell: f64) -> f64 {
    match (mv, previous) {
        (Move::Stay, Some(previous)) if previous.mv == Move::Stay => previous.halite * RESIDUAL_RATE,
        (Move::Stay, _) => cell * COLLECT_RATE,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(size: u32, rich: &[(Position, f64)]) -> Vec<f64> {
        let mut cells = vec![0.0; (size * size) as usize];
        for (position, amount) in rich {
            if let Some(index) = position.index(size) {
                cells[index] = *amount;
            }
        }
        cells
    }

    #[test]
    fn four_stays_compound_bit_exactly() {
        let origin = Position::new(3, 3);
        let cells = grid(7, &[(origin, 400.0)]);
        let path = plan_collection(origin, HaliteView::new(&cells, 7), |_, _| false)
            .expect("open board yields a path");

        let scores: Vec<f64> = path.steps.iter().map(|step| step.halite).collect();
        assert_eq!(scores, vec![100.0, 75.0, 56.25, 42.1875]);
        assert_eq!(path.total, 273.4375);
        assert!(path.steps.iter().all(|step| step.mv == Move::Stay));
    }

    #[test]
    fn rich_neighbour_is_reached_then_harvested() {
        let origin = Position::new(3, 3);
        let rich = origin.translate(Move::North, 7);
        let cells = grid(7, &[(rich, 800.0)]);
        let path = plan_collection(origin, HaliteView::new(&cells, 7), |_, _| false)
            .expect("open board yields a path");

        let moves: Vec<Move> = path.steps.iter().map(|step| step.mv).collect();
        assert_eq!(moves, vec![Move::North, Move::Stay, Move::Stay, Move::Stay]);
        assert_eq!(path.steps[0].halite, 0.0);
        assert_eq!(path.total, 200.0 + 150.0 + 112.5);
        assert!(path.steps[1..].iter().all(|step| step.position == rich));
    }

    #[test]
    fn empty_board_keeps_first_enumerated_sequence() {
        let origin = Position::new(1, 1);
        let cells = grid(5, &[]);
        let path = plan_collection(origin, HaliteView::new(&cells, 5), |_, _| false)
            .expect("open board yields a path");

        assert_eq!(path.total, 0.0);
        assert!(path.steps.iter().all(|step| step.mv == Move::Stay));
    }

    #[test]
    fn blocked_cells_are_avoided_at_their_depth_only() {
        let origin = Position::new(3, 3);
        let cells = grid(7, &[(origin, 400.0)]);
        let blocked_now = |depth: usize, position: Position| depth == 1 && position == origin;
        let path = plan_collection(origin, HaliteView::new(&cells, 7), blocked_now)
            .expect("neighbours remain open");

        assert_ne!(path.steps[0].position, origin);
        assert_eq!(path.steps[1].position, origin);
        assert_eq!(path.steps[2].mv, Move::Stay);
        assert_eq!(path.total, 100.0 + 75.0);
    }

    #[test]
    fn boxed_in_ship_has_no_path() {
        let origin = Position::new(2, 2);
        let cells = grid(5, &[(origin, 100.0)]);
        let blocked = |depth: usize, position: Position| {
            depth == 1 && position.manhattan_distance(origin) <= 1
        };

        assert!(plan_collection(origin, HaliteView::new(&cells, 5), blocked).is_none());
    }

    #[test]
    fn moving_never_accrues() {
        let previous = PlannedStep {
            mv: Move::Stay,
            position: Position::new(0, 0),
            halite: 80.0,
        };
        assert_eq!(accrual(Move::East, Some(previous), 500.0), 0.0);
        assert_eq!(accrual(Move::Stay, Some(previous), 500.0), 60.0);
        assert_eq!(accrual(Move::Stay, None, 500.0), 125.0);
    }
}
