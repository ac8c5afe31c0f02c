#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Overrides dispatch decisions for ships that have an enemy nearby.
//!
//! Every own ship that is not converting looks at its closest enemy ship.
//! A much richer enemy within attack range is pursued; a poorer enemy
//! within escape range is fled from. Both checks run independently and
//! the later override wins. Overrides replace the ship's dispatch record
//! and its claims in the plan.

use halite_fleet_core::{
    BoardSnapshot, CommitError, DispatchPlan, DispatchRecord, Move, Position, ShipSnapshot, Tuning,
    TurnPlan,
};

/// Pure system that reacts to nearby enemy ships.
#[derive(Clone, Debug, Default)]
pub struct ThreatResponse {
    tuning: Tuning,
}

#[derive(Clone, Copy, Debug)]
enum Reaction {
    Attack,
    Escape,
}

impl ThreatResponse {
    /// Creates the threat layer driven by the provided tuning.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Applies attack and escape overrides to the plan.
    ///
    /// Does nothing when the board holds no enemy ship. Fails when an
    /// overridden ship has no free cell left.
    pub fn handle(&self, board: &BoardSnapshot, plan: &mut TurnPlan) -> Result<(), CommitError> {
        if board.enemy_ships().next().is_none() {
            return Ok(());
        }

        for ship in board.own_ships() {
            if plan.is_converting(ship.id) {
                continue;
            }
            let Some(enemy) = closest_enemy(board, ship.position) else {
                continue;
            };

            let distance = ship.position.manhattan_distance(enemy.position);
            if distance <= self.tuning.attack_distance() && enemy.halite > ship.halite * 2.0 {
                override_ship(board, plan, ship, enemy, Reaction::Attack)?;
            }
            if distance <= self.tuning.escape_distance() && enemy.halite < ship.halite * 2.0 {
                override_ship(board, plan, ship, enemy, Reaction::Escape)?;
            }
        }
        Ok(())
    }
}

/// Closest enemy ship by Manhattan distance, first in identifier order on ties.
fn closest_enemy(board: &BoardSnapshot, position: Position) -> Option<&ShipSnapshot> {
    let mut closest: Option<(&ShipSnapshot, u32)> = None;
    for enemy in board.enemy_ships() {
        let distance = position.manhattan_distance(enemy.position);
        if closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((enemy, distance));
        }
    }
    closest.map(|(enemy, _)| enemy)
}

fn override_ship(
    board: &BoardSnapshot,
    plan: &mut TurnPlan,
    ship: &ShipSnapshot,
    enemy: &ShipSnapshot,
    reaction: Reaction,
) -> Result<(), CommitError> {
    let mv: Move = match reaction {
        Reaction::Attack => ship.position.step_toward(enemy.position),
        Reaction::Escape => ship.position.step_away(enemy.position),
    };
    let commit = plan.commit_step(board, ship, mv)?;
    if commit.displaced {
        tracing::warn!(ship = ship.id.get(), ?reaction, "reaction step is taken, falling back");
    }
    tracing::debug!(
        ship = ship.id.get(),
        enemy = enemy.id.get(),
        cargo = ship.halite,
        enemy_cargo = enemy.halite,
        reaction = ?reaction,
        step = ?commit.mv,
        "enemy ship nearby"
    );

    let decision = match reaction {
        Reaction::Attack => DispatchPlan::Attack {
            target: enemy.position,
            next: commit.next,
        },
        Reaction::Escape => DispatchPlan::Escape {
            threat: enemy.position,
            next: commit.next,
        },
    };
    let _ = plan.records.insert(
        ship.id,
        DispatchRecord {
            ship: ship.id,
            halite: ship.halite,
            origin: ship.position,
            plan: decision,
        },
    );
    Ok(())
}
