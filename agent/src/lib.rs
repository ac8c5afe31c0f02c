#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-turn decision pipeline for one player.
//!
//! The agent validates the snapshot it receives, builds a fresh
//! [`TurnPlan`] and runs the expansion policy, the dispatcher and the
//! threat layer over it in that order.

use std::collections::BTreeMap;

use halite_fleet_core::{
    BoardSnapshot, CommitError, DispatchRecord, PlayerActions, ShipId, SnapshotError, Tuning,
    TurnPlan,
};
use halite_fleet_system_dispatch::{DispatchError, Dispatcher};
use halite_fleet_system_expansion::{halite_per_ship, Expansion};
use halite_fleet_system_threat_response::ThreatResponse;
use serde::Serialize;
use thiserror::Error;

/// Failures that prevent the agent from producing a turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The snapshot violates a structural invariant.
    #[error("invalid board snapshot")]
    Snapshot(#[from] SnapshotError),
    /// The dispatcher could not route a ship.
    #[error("dispatch failed")]
    Dispatch(#[from] DispatchError),
    /// The threat layer could not place an overridden ship.
    #[error("threat response failed")]
    ThreatResponse(#[from] CommitError),
}

/// Bookkeeping reported for every decided turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnSummary {
    /// Turn the decision was made for.
    pub step: u32,
    /// Own ships on the board.
    pub ships: usize,
    /// Own shipyards on the board.
    pub shipyards: usize,
    /// Halite banked by the player.
    pub halite: f64,
    /// Conversions ordered this turn.
    pub shipyard_spawns: u32,
    /// Spawns ordered this turn.
    pub ship_spawns: u32,
    /// Halite the ordered conversions and spawns cost.
    pub total_cost: f64,
    /// Halite left on the whole board.
    pub board_halite: f64,
    /// Board halite per own ship.
    pub halite_to_ship_ratio: f64,
}

/// Output of one [`Agent::decide`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnDecision {
    /// Commands to submit for the turn.
    pub actions: PlayerActions,
    /// Dispatch decision per ship.
    pub records: BTreeMap<ShipId, DispatchRecord>,
    /// Turn bookkeeping.
    pub summary: TurnSummary,
}

/// Decision engine for one player.
#[derive(Clone, Debug, Default)]
pub struct Agent {
    tuning: Tuning,
    expansion: Expansion,
    dispatcher: Dispatcher,
    threat_response: ThreatResponse,
}

impl Agent {
    /// Creates an agent whose layers share the provided tuning.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self {
            expansion: Expansion::new(tuning.clone()),
            dispatcher: Dispatcher::new(tuning.clone()),
            threat_response: ThreatResponse::new(tuning.clone()),
            tuning,
        }
    }

    /// Tuning the agent was built with.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Decides the commands for the snapshot's acting player.
    pub fn decide(&self, board: &BoardSnapshot) -> Result<TurnDecision, AgentError> {
        board.validate()?;

        let mut plan = TurnPlan::new();
        let expansion = self.expansion.handle(board, &mut plan);
        let founded_by_expansion = plan.pending_conversions.len();
        self.dispatcher.handle(board, &mut plan)?;
        self.threat_response.handle(board, &mut plan)?;

        let dispatched_conversions = plan
            .pending_conversions
            .len()
            .saturating_sub(founded_by_expansion);
        let shipyard_spawns = expansion
            .conversions
            .saturating_add(u32::try_from(dispatched_conversions).unwrap_or(u32::MAX));
        let summary = TurnSummary {
            step: board.step,
            ships: board.own_ships().count(),
            shipyards: board.own_shipyards().count(),
            halite: board.player_halite,
            shipyard_spawns,
            ship_spawns: expansion.spawns,
            total_cost: f64::from(expansion.spawns) * self.tuning.spawn_cost
                + f64::from(shipyard_spawns) * self.tuning.convert_cost,
            board_halite: board.halite_view().total(),
            halite_to_ship_ratio: halite_per_ship(board),
        };
        tracing::debug!(
            player = board.player.get(),
            step = summary.step,
            ships = summary.ships,
            shipyards = summary.shipyards,
            halite = summary.halite,
            shipyard_spawns = summary.shipyard_spawns,
            ship_spawns = summary.ship_spawns,
            total_cost = summary.total_cost,
            board_halite = summary.board_halite,
            halite_to_ship_ratio = summary.halite_to_ship_ratio,
            "turn decided"
        );

        Ok(TurnDecision {
            actions: plan.actions,
            records: plan.records,
            summary,
        })
    }
}
