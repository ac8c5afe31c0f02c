#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fleet growth policy: founding the first shipyard and spawning ships.

mod density;

use halite_fleet_core::{BoardSnapshot, ShipyardAction, Tuning, TurnPlan};

pub use crate::density::{shipyard_density, ShipyardDensity};

/// Orders issued by one expansion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpansionOutcome {
    /// Ships ordered to become shipyards.
    pub conversions: u32,
    /// Shipyards ordered to spawn a ship.
    pub spawns: u32,
}

/// Pure system that decides when the fleet grows.
#[derive(Clone, Debug, Default)]
pub struct Expansion {
    tuning: Tuning,
}

impl Expansion {
    /// Creates the expansion policy driven by the provided tuning.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    /// Issues conversion and spawn orders for the acting player.
    ///
    /// A player without shipyards converts its first ship. A spawn is
    /// ordered while the player can afford it, owns a shipyard, the board
    /// still holds enough halite per ship and the episode has not passed
    /// its expansion cutoff.
    pub fn handle(&self, board: &BoardSnapshot, plan: &mut TurnPlan) -> ExpansionOutcome {
        let mut outcome = ExpansionOutcome::default();
        let has_shipyard = board.own_shipyards().next().is_some();

        if !has_shipyard {
            if let Some(first) = board.own_ships().next() {
                tracing::debug!(ship = first.id.get(), "founding first shipyard");
                plan.convert(first);
                outcome.conversions += 1;
            }
        }

        let ratio = halite_per_ship(board);
        let cutoff = f64::from(board.episode_steps) * self.tuning.expansion_cutoff;
        let should_spawn = board.player_halite >= self.tuning.spawn_cost
            && has_shipyard
            && ratio > self.tuning.halite_to_ship_threshold
            && f64::from(board.step) < cutoff;
        if !should_spawn {
            return outcome;
        }

        let mut shipyards = board.own_shipyards();
        let chosen = match (shipyards.next(), shipyards.next()) {
            (Some(only), None) => Some(only.id),
            (Some(_), Some(_)) => shipyard_density(board, &self.tuning)
                .first()
                .map(|best| {
                    tracing::debug!(
                        shipyard = best.shipyard.get(),
                        ships_in_area = best.ships_in_area,
                        halite_in_area = best.halite_in_area,
                        ratio = best.ratio,
                        "spawning at densest shipyard"
                    );
                    best.shipyard
                }),
            (None, _) => None,
        };

        if let Some(shipyard) = chosen {
            plan.actions.set_shipyard(shipyard, ShipyardAction::Spawn);
            outcome.spawns += 1;
        }
        outcome
    }
}

/// Board halite divided by the number of own ships.
///
/// Infinite when the player has no ships at all.
#[must_use]
pub fn halite_per_ship(board: &BoardSnapshot) -> f64 {
    let ships = board.own_ships().count();
    if ships == 0 {
        return f64::INFINITY;
    }
    board.halite_view().total() / ships as f64
}
