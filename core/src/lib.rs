#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Halite Fleet engine.
//!
//! This crate defines the message surface that connects the hosting world,
//! the decision systems and the adapters. The world publishes immutable
//! [`BoardSnapshot`] values, systems amend a per-turn [`TurnPlan`] and the
//! resulting [`PlayerActions`] are submitted back to the world through
//! [`Command`] values. The world answers with [`Event`] values describing
//! what actually happened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of future turns considered by one lookahead planning pass.
pub const LOOKAHEAD_DEPTH: usize = 4;

/// Identifier of a player participating in the episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a ship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(u32);

impl ShipId {
    /// Creates a new ship identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a shipyard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipyardId(u32);

impl ShipyardId {
    /// Creates a new shipyard identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single cell on the toroidal board.
///
/// Coordinates always lie in `[0, size)`; every arithmetic helper wraps
/// around the board edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new board position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the position.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the position. Rows grow toward the north.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Adds an arbitrary delta, wrapping both axes modulo `size`.
    #[must_use]
    pub fn offset(self, dx: i64, dy: i64, size: u32) -> Self {
        let size = i64::from(size.max(1));
        let x = (i64::from(self.x) + dx).rem_euclid(size);
        let y = (i64::from(self.y) + dy).rem_euclid(size);
        Self::new(x as u32, y as u32)
    }

    /// Moves the position by a single [`Move`], wrapping around the board.
    #[must_use]
    pub fn translate(self, mv: Move, size: u32) -> Self {
        let (dx, dy) = mv.delta();
        self.offset(i64::from(dx), i64::from(dy), size)
    }

    /// Computes the Manhattan distance between two positions.
    ///
    /// The distance deliberately ignores the board wrap: two cells on
    /// opposite edges are reported as far apart.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Single greedy step that reduces the distance to `target`.
    ///
    /// The x axis is closed first, then the y axis. Returns [`Move::Stay`]
    /// when both positions coincide.
    #[must_use]
    pub fn step_toward(self, target: Position) -> Move {
        if self.x < target.x {
            Move::East
        } else if self.x > target.x {
            Move::West
        } else if self.y < target.y {
            Move::North
        } else if self.y > target.y {
            Move::South
        } else {
            Move::Stay
        }
    }

    /// Single greedy step that increases the distance to `threat`.
    #[must_use]
    pub fn step_away(self, threat: Position) -> Move {
        if self.x > threat.x {
            Move::East
        } else if self.x < threat.x {
            Move::West
        } else if self.y > threat.y {
            Move::North
        } else if self.y < threat.y {
            Move::South
        } else {
            Move::Stay
        }
    }

    /// Row-major index of the position within a `size` by `size` grid.
    #[must_use]
    pub fn index(self, size: u32) -> Option<usize> {
        if self.x < size && self.y < size {
            let row = usize::try_from(self.y).ok()?;
            let column = usize::try_from(self.x).ok()?;
            let width = usize::try_from(size).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Single-turn movement choices available to a ship.
///
/// The declaration order is the enumeration order used by every search in
/// the engine and therefore doubles as the tie-break order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    /// Remain on the current cell and collect halite.
    Stay,
    /// Movement toward increasing `y`.
    North,
    /// Movement toward decreasing `y`.
    South,
    /// Movement toward decreasing `x`.
    West,
    /// Movement toward increasing `x`.
    East,
}

impl Move {
    /// Every move in enumeration order.
    pub const ALL: [Move; 5] = [Move::Stay, Move::North, Move::South, Move::West, Move::East];

    /// Coordinate delta applied by the move.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Stay => (0, 0),
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
        }
    }

    /// Move that undoes this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Stay => Self::Stay,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }
}

/// Commands a ship may receive for the current turn. Absence means no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipAction {
    /// Move one cell toward increasing `y`.
    North,
    /// Move one cell toward decreasing `y`.
    South,
    /// Move one cell toward increasing `x`.
    East,
    /// Move one cell toward decreasing `x`.
    West,
    /// Consume the ship to build a shipyard on its cell.
    Convert,
}

impl ShipAction {
    /// Converts a planned move into the command that executes it.
    ///
    /// [`Move::Stay`] has no command and yields `None`.
    #[must_use]
    pub const fn from_move(mv: Move) -> Option<Self> {
        match mv {
            Move::Stay => None,
            Move::North => Some(Self::North),
            Move::South => Some(Self::South),
            Move::West => Some(Self::West),
            Move::East => Some(Self::East),
        }
    }

    /// Movement performed by the command, if it is a movement command.
    #[must_use]
    pub const fn as_move(self) -> Option<Move> {
        match self {
            Self::North => Some(Move::North),
            Self::South => Some(Move::South),
            Self::West => Some(Move::West),
            Self::East => Some(Move::East),
            Self::Convert => None,
        }
    }
}

/// Commands a shipyard may receive for the current turn. Absence means no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipyardAction {
    /// Build a new ship on the shipyard's cell.
    Spawn,
}

/// Complete command set emitted by one player for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerActions {
    ships: BTreeMap<ShipId, ShipAction>,
    shipyards: BTreeMap<ShipyardId, ShipyardAction>,
}

impl PlayerActions {
    /// Creates an empty command set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a command to a ship, replacing any earlier one.
    pub fn set_ship(&mut self, ship: ShipId, action: ShipAction) {
        let _ = self.ships.insert(ship, action);
    }

    /// Removes the command of a ship so it idles this turn.
    pub fn clear_ship(&mut self, ship: ShipId) {
        let _ = self.ships.remove(&ship);
    }

    /// Command currently assigned to the ship.
    #[must_use]
    pub fn ship(&self, ship: ShipId) -> Option<ShipAction> {
        self.ships.get(&ship).copied()
    }

    /// Assigns a command to a shipyard.
    pub fn set_shipyard(&mut self, shipyard: ShipyardId, action: ShipyardAction) {
        let _ = self.shipyards.insert(shipyard, action);
    }

    /// Command currently assigned to the shipyard.
    #[must_use]
    pub fn shipyard(&self, shipyard: ShipyardId) -> Option<ShipyardAction> {
        self.shipyards.get(&shipyard).copied()
    }

    /// Ship commands in identifier order.
    pub fn ships(&self) -> impl Iterator<Item = (ShipId, ShipAction)> + '_ {
        self.ships.iter().map(|(id, action)| (*id, *action))
    }

    /// Shipyard commands in identifier order.
    pub fn shipyards(&self) -> impl Iterator<Item = (ShipyardId, ShipyardAction)> + '_ {
        self.shipyards.iter().map(|(id, action)| (*id, *action))
    }

    /// Reports whether no command was issued at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty() && self.shipyards.is_empty()
    }
}

/// Immutable representation of a single ship used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    /// Unique identifier assigned to the ship.
    pub id: ShipId,
    /// Player controlling the ship.
    pub owner: PlayerId,
    /// Cell currently occupied by the ship.
    pub position: Position,
    /// Halite carried in the ship's hold.
    pub halite: f64,
}

/// Immutable representation of a single shipyard used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipyardSnapshot {
    /// Unique identifier assigned to the shipyard.
    pub id: ShipyardId,
    /// Player controlling the shipyard.
    pub owner: PlayerId,
    /// Cell occupied by the shipyard.
    pub position: Position,
}

/// Read-only view into the dense per-cell halite grid.
#[derive(Clone, Copy, Debug)]
pub struct HaliteView<'a> {
    cells: &'a [f64],
    size: u32,
}

impl<'a> HaliteView<'a> {
    /// Captures a new halite view backed by the provided row-major cells.
    #[must_use]
    pub fn new(cells: &'a [f64], size: u32) -> Self {
        Self { cells, size }
    }

    /// Halite stored on the cell, zero for positions outside the grid.
    #[must_use]
    pub fn halite_at(&self, position: Position) -> f64 {
        position
            .index(self.size)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Sum of halite over the whole board.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Side length of the square board.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }
}

/// Reasons a board snapshot is rejected before any decision is made.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SnapshotError {
    /// The board has no cells.
    #[error("board size must be positive")]
    EmptyBoard,
    /// The halite grid does not contain `size * size` cells.
    #[error("expected {expected} halite cells, found {actual}")]
    CellCount {
        /// Number of cells implied by the board size.
        expected: usize,
        /// Number of cells supplied.
        actual: usize,
    },
    /// A ship or shipyard lies outside the board.
    #[error("position ({x}, {y}) lies outside a board of size {size}")]
    OutOfBounds {
        /// Column of the offending position.
        x: u32,
        /// Row of the offending position.
        y: u32,
        /// Side length of the board.
        size: u32,
    },
    /// Entities are not listed in ascending identifier order.
    #[error("ships and shipyards must be sorted by identifier")]
    Unordered,
}

/// Read-only world state supplied to the acting player each turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Side length of the square board.
    pub size: u32,
    /// Zero-based index of the current turn.
    pub step: u32,
    /// Total number of turns in the episode.
    pub episode_steps: u32,
    /// Player the decisions are made for.
    pub player: PlayerId,
    /// Halite banked by the acting player.
    pub player_halite: f64,
    /// Row-major per-cell halite, `size * size` entries.
    pub halite: Vec<f64>,
    /// Every ship on the board, friendly and opposing.
    pub ships: Vec<ShipSnapshot>,
    /// Every shipyard on the board, friendly and opposing.
    pub shipyards: Vec<ShipyardSnapshot>,
}

impl BoardSnapshot {
    /// Sorts ships and shipyards into the deterministic identifier order.
    #[must_use]
    pub fn into_canonical(mut self) -> Self {
        self.ships.sort_by_key(|ship| ship.id);
        self.shipyards.sort_by_key(|shipyard| shipyard.id);
        self
    }

    /// Checks the structural invariants every system relies on.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.size == 0 {
            return Err(SnapshotError::EmptyBoard);
        }
        let side = usize::try_from(self.size).unwrap_or(usize::MAX);
        let expected = side.saturating_mul(side);
        if self.halite.len() != expected {
            return Err(SnapshotError::CellCount {
                expected,
                actual: self.halite.len(),
            });
        }

        let positions = self
            .ships
            .iter()
            .map(|ship| ship.position)
            .chain(self.shipyards.iter().map(|shipyard| shipyard.position));
        for position in positions {
            if position.index(self.size).is_none() {
                return Err(SnapshotError::OutOfBounds {
                    x: position.x(),
                    y: position.y(),
                    size: self.size,
                });
            }
        }

        let ships_sorted = self.ships.windows(2).all(|pair| pair[0].id < pair[1].id);
        let shipyards_sorted = self
            .shipyards
            .windows(2)
            .all(|pair| pair[0].id < pair[1].id);
        if !ships_sorted || !shipyards_sorted {
            return Err(SnapshotError::Unordered);
        }

        Ok(())
    }

    /// Read-only view over the halite grid.
    #[must_use]
    pub fn halite_view(&self) -> HaliteView<'_> {
        HaliteView::new(&self.halite, self.size)
    }

    /// Ships controlled by the acting player in identifier order.
    pub fn own_ships(&self) -> impl Iterator<Item = &ShipSnapshot> {
        self.ships.iter().filter(move |ship| ship.owner == self.player)
    }

    /// Ships controlled by any other player in identifier order.
    pub fn enemy_ships(&self) -> impl Iterator<Item = &ShipSnapshot> {
        self.ships.iter().filter(move |ship| ship.owner != self.player)
    }

    /// Shipyards controlled by the acting player in identifier order.
    pub fn own_shipyards(&self) -> impl Iterator<Item = &ShipyardSnapshot> {
        self.shipyards
            .iter()
            .filter(move |shipyard| shipyard.owner == self.player)
    }

    /// Positions of the acting player's shipyards.
    #[must_use]
    pub fn own_shipyard_positions(&self) -> Vec<Position> {
        self.own_shipyards().map(|shipyard| shipyard.position).collect()
    }
}

/// Tunable constants that steer every decision layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Fraction of the board size beyond which a ship founds a new shipyard.
    /// Also sizes the neighbourhood of the density evaluator.
    pub factor_nearest_shipyard: f64,
    /// Distance at which a ship escapes; attacks reach twice as far.
    pub enemy_dist_threshold: u32,
    /// Cargo above which a ship returns to the nearest shipyard.
    pub halite_threshold: f64,
    /// Board halite per ship above which another ship is spawned.
    pub halite_to_ship_threshold: f64,
    /// Halite charged for spawning a ship.
    pub spawn_cost: f64,
    /// Halite charged for converting a ship into a shipyard.
    pub convert_cost: f64,
    /// Fraction of the episode after which no more ships are spawned.
    pub expansion_cutoff: f64,
}

impl Tuning {
    /// Distance to the nearest base beyond which a ship converts.
    #[must_use]
    pub fn conversion_distance(&self, size: u32) -> f64 {
        self.factor_nearest_shipyard * f64::from(size)
    }

    /// Half width of the square neighbourhood scanned around a shipyard.
    #[must_use]
    pub fn density_half_width(&self, size: u32) -> u32 {
        let width = (self.factor_nearest_shipyard * f64::from(size)).floor();
        if width <= 0.0 {
            0
        } else {
            width as u32
        }
    }

    /// Maximum distance at which an enemy is attacked.
    #[must_use]
    pub const fn attack_distance(&self) -> u32 {
        self.enemy_dist_threshold.saturating_mul(2)
    }

    /// Maximum distance at which an enemy is escaped from.
    #[must_use]
    pub const fn escape_distance(&self) -> u32 {
        self.enemy_dist_threshold
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            factor_nearest_shipyard: 0.25,
            enemy_dist_threshold: 2,
            halite_threshold: 500.0,
            halite_to_ship_threshold: 1400.0,
            spawn_cost: 500.0,
            convert_cost: 500.0,
            expansion_cutoff: 0.75,
        }
    }
}

/// Behaviour assigned to a ship for the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// Harvest halite following a lookahead plan.
    Collect,
    /// Carry cargo back to the nearest shipyard.
    Deposit,
    /// Close in on a richer enemy ship.
    Attack,
    /// Move away from a nearby enemy ship.
    Escape,
}

/// One move of a lookahead plan together with its simulated accrual.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Move performed at this depth.
    pub mv: Move,
    /// Position reached after the move.
    pub position: Position,
    /// Halite accrued at this depth.
    pub halite: f64,
}

/// Typed decision attached to a ship, one variant per status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DispatchPlan {
    /// Lookahead collection sequence.
    Collect {
        /// Planned steps, first step first.
        steps: Vec<PlannedStep>,
        /// Sum of the per-step accruals.
        total: f64,
    },
    /// Greedy return toward a base.
    Deposit {
        /// Base the ship is heading for.
        base: Position,
        /// Position the ship occupies after this turn.
        next: Position,
    },
    /// Greedy pursuit of an enemy ship.
    Attack {
        /// Position of the pursued enemy.
        target: Position,
        /// Position the ship occupies after this turn.
        next: Position,
    },
    /// Greedy retreat from an enemy ship.
    Escape {
        /// Position of the threatening enemy.
        threat: Position,
        /// Position the ship occupies after this turn.
        next: Position,
    },
}

/// Per-ship result of one dispatch turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Ship the record belongs to.
    pub ship: ShipId,
    /// Cargo carried when the decision was made.
    pub halite: f64,
    /// Cell occupied when the decision was made.
    pub origin: Position,
    /// Decision taken for the ship.
    pub plan: DispatchPlan,
}

impl DispatchRecord {
    /// Status tag of the record.
    #[must_use]
    pub fn status(&self) -> DispatchStatus {
        match self.plan {
            DispatchPlan::Collect { .. } => DispatchStatus::Collect,
            DispatchPlan::Deposit { .. } => DispatchStatus::Deposit,
            DispatchPlan::Attack { .. } => DispatchStatus::Attack,
            DispatchPlan::Escape { .. } => DispatchStatus::Escape,
        }
    }

    /// Position the ship occupies after this turn.
    #[must_use]
    pub fn next_position(&self) -> Position {
        match &self.plan {
            DispatchPlan::Collect { steps, .. } => steps
                .first()
                .map_or(self.origin, |step| step.position),
            DispatchPlan::Deposit { next, .. }
            | DispatchPlan::Attack { next, .. }
            | DispatchPlan::Escape { next, .. } => *next,
        }
    }
}

/// Positions already promised to friendly ships, one map per lookahead depth.
///
/// Depths are numbered from 1 (the coming turn) to [`LOOKAHEAD_DEPTH`]. The
/// first ship to claim a position at a depth keeps it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimLedger {
    depths: [BTreeMap<Position, ShipId>; LOOKAHEAD_DEPTH],
}

impl ClaimLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `position` at `depth` for `ship`.
    ///
    /// Returns `false` when the position already belongs to another ship or
    /// the depth is out of range; the existing claim is left untouched.
    pub fn claim(&mut self, depth: usize, position: Position, ship: ShipId) -> bool {
        let Some(claims) = self.depths.get_mut(depth.wrapping_sub(1)) else {
            return false;
        };
        match claims.get(&position) {
            Some(owner) => *owner == ship,
            None => {
                let _ = claims.insert(position, ship);
                true
            }
        }
    }

    /// Ship holding the claim on `position` at `depth`, if any.
    #[must_use]
    pub fn claimant(&self, depth: usize, position: Position) -> Option<ShipId> {
        self.depths
            .get(depth.wrapping_sub(1))
            .and_then(|claims| claims.get(&position).copied())
    }

    /// Reports whether a ship other than `ship` holds `position` at `depth`.
    #[must_use]
    pub fn is_claimed_by_other(&self, depth: usize, position: Position, ship: ShipId) -> bool {
        self.claimant(depth, position)
            .is_some_and(|owner| owner != ship)
    }

    /// Drops every claim held by `ship` across all depths.
    pub fn release(&mut self, ship: ShipId) {
        for claims in &mut self.depths {
            claims.retain(|_, owner| *owner != ship);
        }
    }

    /// Claims registered at `depth` in position order.
    pub fn iter_depth(&self, depth: usize) -> impl Iterator<Item = (Position, ShipId)> + '_ {
        self.depths
            .get(depth.wrapping_sub(1))
            .into_iter()
            .flat_map(|claims| claims.iter().map(|(position, ship)| (*position, *ship)))
    }
}

/// Outcome of committing a single greedy step through [`TurnPlan::commit_step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepCommit {
    /// Move that was actually committed.
    pub mv: Move,
    /// Position the ship occupies after this turn.
    pub next: Position,
    /// Whether the requested move was replaced by a fallback.
    pub displaced: bool,
}

/// Failure to find any free cell for a ship this turn.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitError {
    /// Every reachable cell is already held by another friendly ship.
    #[error("ship {} has no free cell to move to or stay on", .ship.get())]
    NoFreeCell {
        /// Ship that could not be placed.
        ship: ShipId,
    },
}

/// Mutable per-turn context threaded through every decision layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TurnPlan {
    /// Commands issued so far.
    pub actions: PlayerActions,
    /// Cells where ships convert into shipyards this turn, in decision order.
    pub pending_conversions: Vec<Position>,
    /// Positions promised to friendly ships per lookahead depth.
    pub claims: ClaimLedger,
    /// Dispatch decision per ship.
    pub records: BTreeMap<ShipId, DispatchRecord>,
}

impl TurnPlan {
    /// Creates an empty plan for a fresh turn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the ship has neither a command nor a dispatch record.
    #[must_use]
    pub fn is_free(&self, ship: ShipId) -> bool {
        self.actions.ship(ship).is_none() && !self.records.contains_key(&ship)
    }

    /// Reports whether the ship was ordered to convert this turn.
    #[must_use]
    pub fn is_converting(&self, ship: ShipId) -> bool {
        self.actions.ship(ship) == Some(ShipAction::Convert)
    }

    /// Orders a ship to convert and registers the pending shipyard.
    pub fn convert(&mut self, ship: &ShipSnapshot) {
        self.actions.set_ship(ship.id, ShipAction::Convert);
        self.pending_conversions.push(ship.position);
    }

    /// Commits a single step for `ship`, falling back to another free cell.
    ///
    /// Earlier claims of the ship are released first. The requested move
    /// is kept when its destination is free at depth 1. Otherwise the ship
    /// stays if its own cell is free, and failing that takes the first move
    /// in [`Move::ALL`] order whose destination is neither claimed nor an
    /// own or pending shipyard.
    pub fn commit_step(
        &mut self,
        board: &BoardSnapshot,
        ship: &ShipSnapshot,
        mv: Move,
    ) -> Result<StepCommit, CommitError> {
        self.claims.release(ship.id);

        let shipyards = board.own_shipyard_positions();
        let is_free = |claims: &ClaimLedger, position: Position| {
            !claims.is_claimed_by_other(1, position, ship.id)
        };

        let requested = ship.position.translate(mv, board.size);
        let committed = if is_free(&self.claims, requested) {
            mv
        } else if is_free(&self.claims, ship.position) {
            Move::Stay
        } else {
            Move::ALL
                .into_iter()
                .filter(|candidate| *candidate != mv && *candidate != Move::Stay)
                .find(|candidate| {
                    let next = ship.position.translate(*candidate, board.size);
                    is_free(&self.claims, next)
                        && !shipyards.contains(&next)
                        && !self.pending_conversions.contains(&next)
                })
                .ok_or(CommitError::NoFreeCell { ship: ship.id })?
        };

        let next = ship.position.translate(committed, board.size);
        let _ = self.claims.claim(1, next, ship.id);
        match ShipAction::from_move(committed) {
            Some(action) => self.actions.set_ship(ship.id, action),
            None => self.actions.clear_ship(ship.id),
        }

        Ok(StepCommit {
            mv: committed,
            next,
            displaced: committed != mv,
        })
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Queues the command set of one player for the current turn.
    SubmitActions {
        /// Player issuing the commands.
        player: PlayerId,
        /// Commands issued by the player.
        actions: PlayerActions,
    },
    /// Resolves every queued command set and advances the turn counter.
    AdvanceTurn,
}

/// Reasons the world refused to execute a submitted command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The addressed ship or shipyard does not exist.
    UnknownEntity,
    /// The addressed ship or shipyard belongs to another player.
    NotOwner,
    /// The player cannot pay for the command.
    InsufficientHalite,
    /// A shipyard already stands on the cell.
    CellOccupied,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a turn finished resolving.
    TurnAdvanced {
        /// Index of the turn that is now current.
        step: u32,
    },
    /// Confirms that a ship moved between two cells.
    ShipMoved {
        /// Ship that moved.
        ship: ShipId,
        /// Cell occupied before the move.
        from: Position,
        /// Cell occupied after the move.
        to: Position,
    },
    /// Confirms that a shipyard spawned a ship.
    ShipSpawned {
        /// Identifier assigned to the new ship.
        ship: ShipId,
        /// Shipyard that produced the ship.
        shipyard: ShipyardId,
        /// Cell the new ship occupies.
        position: Position,
    },
    /// Confirms that a ship was converted into a shipyard.
    ShipConverted {
        /// Ship consumed by the conversion.
        ship: ShipId,
        /// Identifier assigned to the new shipyard.
        shipyard: ShipyardId,
        /// Cell of the new shipyard.
        position: Position,
    },
    /// Reports that a ship was destroyed in a collision.
    ShipDestroyed {
        /// Ship that was destroyed.
        ship: ShipId,
        /// Cell where the ship was destroyed.
        position: Position,
    },
    /// Reports that a shipyard was destroyed by an enemy ship.
    ShipyardDestroyed {
        /// Shipyard that was destroyed.
        shipyard: ShipyardId,
        /// Cell of the destroyed shipyard.
        position: Position,
    },
    /// Confirms that a ship unloaded its cargo into its owner's bank.
    HaliteDeposited {
        /// Ship that unloaded.
        ship: ShipId,
        /// Player credited with the cargo.
        player: PlayerId,
        /// Amount of halite deposited.
        amount: f64,
    },
    /// Reports that a submitted command was refused.
    ActionRejected {
        /// Player that issued the command.
        player: PlayerId,
        /// Specific reason the command failed.
        reason: RejectionReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship(id: u32, x: u32, y: u32) -> ShipSnapshot {
        ShipSnapshot {
            id: ShipId::new(id),
            owner: PlayerId::new(0),
            position: Position::new(x, y),
            halite: 0.0,
        }
    }

    #[test]
    fn translate_round_trips_across_edges() {
        let size = 10;
        let corners = [
            Position::new(0, 0),
            Position::new(9, 9),
            Position::new(0, 9),
            Position::new(5, 0),
        ];
        for position in corners {
            for mv in Move::ALL {
                let moved = position.translate(mv, size);
                assert!(moved.x() < size && moved.y() < size);
                assert_eq!(moved.translate(mv.opposite(), size), position);
            }
        }
    }

    #[test]
    fn translate_wraps_at_board_edges() {
        assert_eq!(
            Position::new(9, 4).translate(Move::East, 10),
            Position::new(0, 4)
        );
        assert_eq!(
            Position::new(3, 0).translate(Move::South, 10),
            Position::new(3, 9)
        );
        assert_eq!(
            Position::new(2, 2).offset(-13, 21, 10),
            Position::new(9, 3)
        );
    }

    #[test]
    fn manhattan_distance_ignores_wraparound() {
        let left = Position::new(0, 0);
        let right = Position::new(9, 0);
        assert_eq!(left.manhattan_distance(right), 9);
        assert_eq!(right.manhattan_distance(left), 9);
        assert_eq!(Position::new(1, 1).manhattan_distance(Position::new(4, 3)), 5);
    }

    #[test]
    fn greedy_steps_prefer_x_axis() {
        let origin = Position::new(2, 2);
        assert_eq!(origin.step_toward(Position::new(5, 2)), Move::East);
        assert_eq!(origin.step_toward(Position::new(0, 7)), Move::West);
        assert_eq!(origin.step_toward(Position::new(2, 7)), Move::North);
        assert_eq!(origin.step_toward(origin), Move::Stay);

        let unit = Position::new(5, 5);
        assert_eq!(unit.step_away(Position::new(5, 6)), Move::South);
        assert_eq!(unit.step_away(Position::new(4, 9)), Move::East);
        assert_eq!(unit.step_away(unit), Move::Stay);
    }

    #[test]
    fn ledger_keeps_first_claimant() {
        let mut ledger = ClaimLedger::new();
        let cell = Position::new(3, 3);
        assert!(ledger.claim(1, cell, ShipId::new(1)));
        assert!(!ledger.claim(1, cell, ShipId::new(2)));
        assert!(ledger.claim(1, cell, ShipId::new(1)));
        assert!(ledger.claim(2, cell, ShipId::new(2)));
        assert_eq!(ledger.claimant(1, cell), Some(ShipId::new(1)));
        assert!(ledger.is_claimed_by_other(1, cell, ShipId::new(2)));
        assert!(!ledger.is_claimed_by_other(1, cell, ShipId::new(1)));

        ledger.release(ShipId::new(1));
        assert_eq!(ledger.claimant(1, cell), None);
        assert_eq!(ledger.claimant(2, cell), Some(ShipId::new(2)));
    }

    #[test]
    fn ledger_rejects_out_of_range_depths() {
        let mut ledger = ClaimLedger::new();
        assert!(!ledger.claim(0, Position::new(0, 0), ShipId::new(1)));
        assert!(!ledger.claim(LOOKAHEAD_DEPTH + 1, Position::new(0, 0), ShipId::new(1)));
        assert_eq!(ledger.iter_depth(0).count(), 0);
    }

    fn open_board(size: u32, ships: Vec<ShipSnapshot>) -> BoardSnapshot {
        BoardSnapshot {
            size,
            step: 0,
            episode_steps: 400,
            player: PlayerId::new(0),
            player_halite: 0.0,
            halite: vec![0.0; (size * size) as usize],
            ships,
            shipyards: Vec::new(),
        }
    }

    #[test]
    fn commit_step_falls_back_to_staying() {
        let mut plan = TurnPlan::new();
        let first = ship(1, 4, 4);
        let second = ship(2, 2, 4);
        let board = open_board(10, vec![first.clone(), second.clone()]);

        let commit = plan.commit_step(&board, &first, Move::West).expect("free cell");
        assert_eq!(commit.next, Position::new(3, 4));
        assert!(!commit.displaced);
        assert_eq!(plan.actions.ship(first.id), Some(ShipAction::West));

        let commit = plan.commit_step(&board, &second, Move::East).expect("free cell");
        assert_eq!(commit.mv, Move::Stay);
        assert_eq!(commit.next, second.position);
        assert!(commit.displaced);
        assert_eq!(plan.actions.ship(second.id), None);
        assert_eq!(plan.claims.claimant(1, second.position), Some(second.id));
    }

    #[test]
    fn commit_step_leaves_a_taken_cell_for_the_first_free_neighbour() {
        let mut plan = TurnPlan::new();
        let unit = ship(3, 2, 2);
        let mut board = open_board(10, vec![unit.clone()]);
        board.shipyards.push(ShipyardSnapshot {
            id: ShipyardId::new(1),
            owner: PlayerId::new(0),
            position: Position::new(2, 3),
        });
        assert!(plan.claims.claim(1, Position::new(3, 2), ShipId::new(1)));
        assert!(plan.claims.claim(1, Position::new(2, 2), ShipId::new(2)));

        let commit = plan.commit_step(&board, &unit, Move::East).expect("south is free");

        assert_eq!(commit.mv, Move::South);
        assert_eq!(commit.next, Position::new(2, 1));
        assert!(commit.displaced);
        assert_eq!(plan.actions.ship(unit.id), Some(ShipAction::South));
        assert_eq!(plan.claims.claimant(1, Position::new(2, 2)), Some(ShipId::new(2)));
    }

    #[test]
    fn commit_step_fails_when_every_cell_is_taken() {
        let mut plan = TurnPlan::new();
        let unit = ship(9, 5, 5);
        let board = open_board(10, vec![unit.clone()]);
        for (index, mv) in Move::ALL.into_iter().enumerate() {
            let other = ShipId::new(index as u32 + 1);
            assert!(plan.claims.claim(1, unit.position.translate(mv, 10), other));
        }

        let result = plan.commit_step(&board, &unit, Move::North);

        assert_eq!(result, Err(CommitError::NoFreeCell { ship: unit.id }));
        assert_eq!(plan.actions.ship(unit.id), None);
    }

    #[test]
    fn commit_step_releases_previous_claims() {
        let mut plan = TurnPlan::new();
        let unit = ship(1, 4, 4);
        let board = open_board(10, vec![unit.clone()]);
        let _ = plan.commit_step(&board, &unit, Move::North).expect("free cell");
        let _ = plan.commit_step(&board, &unit, Move::South).expect("free cell");
        let claimed: Vec<_> = plan.claims.iter_depth(1).collect();
        assert_eq!(claimed, vec![(Position::new(4, 3), unit.id)]);
    }

    #[test]
    fn validate_rejects_malformed_snapshots() {
        let mut board = BoardSnapshot {
            size: 3,
            step: 0,
            episode_steps: 400,
            player: PlayerId::new(0),
            player_halite: 0.0,
            halite: vec![0.0; 9],
            ships: vec![ship(2, 0, 0), ship(1, 1, 1)],
            shipyards: Vec::new(),
        };
        assert_eq!(board.validate(), Err(SnapshotError::Unordered));

        board = board.into_canonical();
        assert_eq!(board.validate(), Ok(()));

        board.ships.push(ship(3, 3, 0));
        assert!(matches!(
            board.validate(),
            Err(SnapshotError::OutOfBounds { x: 3, y: 0, size: 3 })
        ));

        let _ = board.halite.pop();
        assert_eq!(
            board.validate(),
            Err(SnapshotError::CellCount {
                expected: 9,
                actual: 8
            })
        );
    }

    #[test]
    fn tuning_derives_distances_from_board_size() {
        let tuning = Tuning::default();
        assert!((tuning.conversion_distance(21) - 5.25).abs() < f64::EPSILON);
        assert_eq!(tuning.density_half_width(21), 5);
        assert_eq!(tuning.attack_distance(), 4);
        assert_eq!(tuning.escape_distance(), 2);
    }

    #[test]
    fn player_actions_round_trip_through_bincode() {
        let mut actions = PlayerActions::new();
        actions.set_ship(ShipId::new(4), ShipAction::Convert);
        actions.set_ship(ShipId::new(7), ShipAction::North);
        actions.set_shipyard(ShipyardId::new(2), ShipyardAction::Spawn);

        let bytes = bincode::serialize(&actions).expect("serialize");
        let restored: PlayerActions = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, actions);
    }
}
