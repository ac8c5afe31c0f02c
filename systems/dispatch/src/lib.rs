#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Conflict-avoiding dispatcher that assigns every idle ship a behaviour.
//!
//! Ships are processed in identifier order through three phases that share
//! one [`TurnPlan`]: distant ships found new shipyards, loaded ships head
//! back to the nearest base and the remaining ships follow a lookahead
//! collection plan. Every committed position is claimed in the plan's
//! ledger so that later ships never target a cell an earlier ship already
//! holds at the same depth.

mod lookahead;

use halite_fleet_core::{
    BoardSnapshot, CommitError, DispatchPlan, DispatchRecord, Move, PlannedStep, Position,
    ShipAction, ShipId, Tuning, TurnPlan,
};
use thiserror::Error;

use crate::lookahead::plan_collection;

/// Failures that abort the dispatch of a turn.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A ship must return its cargo but the player owns no shipyard.
    #[error("ship {} must return its cargo but no shipyard exists", .ship.get())]
    MissingBase {
        /// Ship that could not be routed.
        ship: ShipId,
    },
    /// A ship found no free cell to move to or stay on.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Closest base reported by [`nearest_base`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NearestBase {
    /// Cell of the closest base.
    pub position: Position,
    /// Manhattan distance to the base.
    pub distance: u32,
}

/// Locates the closest owned or pending base.
///
/// Owned shipyards are scanned before pending conversions and the first
/// minimum wins. Returns `None` when no base exists at all.
#[must_use]
pub fn nearest_base(
    position: Position,
    shipyards: &[Position],
    pending: &[Position],
) -> Option<NearestBase> {
    let mut nearest: Option<NearestBase> = None;
    for base in shipyards.iter().chain(pending) {
        let distance = position.manhattan_distance(*base);
        if nearest.is_none_or(|current| distance < current.distance) {
            nearest = Some(NearestBase {
                position: *base,
                distance,
            });
        }
    }
    nearest
}

/// Pure system that turns a board snapshot into per-ship dispatch decisions.
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    tuning: Tuning,
}

impl Dispatcher {
    /// Creates a dispatcher driven by the provided tuning.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Dispatches every free ship of the acting player.
    ///
    /// Ships that already carry a command or a record are left untouched.
    pub fn handle(&self, board: &BoardSnapshot, plan: &mut TurnPlan) -> Result<(), DispatchError> {
        let shipyards = board.own_shipyard_positions();
        self.convert_distant_ships(board, &shipyards, plan);
        self.return_loaded_ships(board, &shipyards, plan)?;
        collect_halite(board, &shipyards, plan)
    }

    fn convert_distant_ships(
        &self,
        board: &BoardSnapshot,
        shipyards: &[Position],
        plan: &mut TurnPlan,
    ) {
        if board.player_halite < self.tuning.convert_cost {
            return;
        }

        let threshold = self.tuning.conversion_distance(board.size);
        for ship in board.own_ships() {
            if !plan.is_free(ship.id) {
                continue;
            }

            let nearest = nearest_base(ship.position, shipyards, &plan.pending_conversions);
            let distant = nearest.is_none_or(|base| f64::from(base.distance) > threshold);
            if distant {
                tracing::debug!(
                    ship = ship.id.get(),
                    distance = nearest.map(|base| base.distance),
                    "converting distant ship into shipyard"
                );
                plan.convert(ship);
            }
        }
    }

    fn return_loaded_ships(
        &self,
        board: &BoardSnapshot,
        shipyards: &[Position],
        plan: &mut TurnPlan,
    ) -> Result<(), DispatchError> {
        for ship in board.own_ships() {
            if !plan.is_free(ship.id) || ship.halite <= self.tuning.halite_threshold {
                continue;
            }

            let base = nearest_base(ship.position, shipyards, &plan.pending_conversions)
                .ok_or(DispatchError::MissingBase { ship: ship.id })?;
            let step = ship.position.step_toward(base.position);
            let commit = plan.commit_step(board, ship, step)?;
            if commit.displaced {
                tracing::debug!(ship = ship.id.get(), "deposit step is taken, falling back");
            }
            tracing::debug!(
                ship = ship.id.get(),
                cargo = ship.halite,
                step = ?commit.mv,
                "returning cargo"
            );

            let _ = plan.records.insert(
                ship.id,
                DispatchRecord {
                    ship: ship.id,
                    halite: ship.halite,
                    origin: ship.position,
                    plan: DispatchPlan::Deposit {
                        base: base.position,
                        next: commit.next,
                    },
                },
            );
        }
        Ok(())
    }
}

fn collect_halite(
    board: &BoardSnapshot,
    shipyards: &[Position],
    plan: &mut TurnPlan,
) -> Result<(), DispatchError> {
    let halite = board.halite_view();
    for ship in board.own_ships() {
        if !plan.is_free(ship.id) {
            continue;
        }

        let path = plan_collection(ship.position, halite, |depth, position| {
            shipyards.contains(&position)
                || plan.pending_conversions.contains(&position)
                || plan.claims.is_claimed_by_other(depth, position, ship.id)
        });

        let (steps, total) = match path {
            Some(path) => {
                for (index, step) in path.steps.iter().enumerate() {
                    let _ = plan.claims.claim(index + 1, step.position, ship.id);
                }
                (path.steps.to_vec(), path.total)
            }
            None => {
                tracing::warn!(
                    ship = ship.id.get(),
                    x = ship.position.x(),
                    y = ship.position.y(),
                    "no legal collection sequence, holding position"
                );
                let commit = plan.commit_step(board, ship, Move::Stay)?;
                let collected = if commit.mv == Move::Stay {
                    halite.halite_at(commit.next) * 0.25
                } else {
                    0.0
                };
                let step = PlannedStep {
                    mv: commit.mv,
                    position: commit.next,
                    halite: collected,
                };
                (vec![step], collected)
            }
        };

        match steps.first().and_then(|step| ShipAction::from_move(step.mv)) {
            Some(action) => plan.actions.set_ship(ship.id, action),
            None => plan.actions.clear_ship(ship.id),
        }

        let _ = plan.records.insert(
            ship.id,
            DispatchRecord {
                ship: ship.id,
                halite: ship.halite,
                origin: ship.position,
                plan: DispatchPlan::Collect { steps, total },
            },
        );
    }
    Ok(())
}
