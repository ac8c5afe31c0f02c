#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Halite Fleet episodes.
//!
//! The world owns the halite field, every ship and shipyard and the banked
//! halite of each player. Agents never mutate it directly: they submit
//! [`Command::SubmitActions`] batches and the world resolves all of them
//! together when it receives [`Command::AdvanceTurn`].

use std::collections::{BTreeMap, BTreeSet};

use halite_fleet_core::{
    Command, Event, PlayerActions, PlayerId, Position, RejectionReason, ShipAction, ShipId,
    ShipyardAction, ShipyardId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MAX_PLAYERS: u32 = 4;
const HALITE_CELL_PROBABILITY: f64 = 0.35;

/// Game rules applied by the world while resolving turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Side length of the square board.
    pub size: u32,
    /// Number of turns in an episode.
    pub episode_steps: u32,
    /// Halite banked by each player when the episode starts.
    pub starting_halite: f64,
    /// Total halite distributed over the board at generation time.
    pub board_halite: f64,
    /// Halite charged for spawning a ship.
    pub spawn_cost: f64,
    /// Halite charged for converting a ship into a shipyard.
    pub convert_cost: f64,
    /// Fraction of a cell's halite collected by a ship staying on it.
    pub collect_rate: f64,
    /// Per-turn growth of halite on unoccupied cells.
    pub regen_rate: f64,
    /// Regeneration never lifts a cell above this amount.
    pub max_cell_halite: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            size: 21,
            episode_steps: 400,
            starting_halite: 5000.0,
            board_halite: 24_000.0,
            spawn_cost: 500.0,
            convert_cost: 500.0,
            collect_rate: 0.25,
            regen_rate: 0.02,
            max_cell_halite: 500.0,
        }
    }
}

/// Represents the authoritative Halite Fleet world state.
#[derive(Debug)]
pub struct World {
    rules: Rules,
    halite: Vec<f64>,
    ships: Vec<Ship>,
    shipyards: Vec<Shipyard>,
    players: Vec<Player>,
    step: u32,
    next_ship_id: u32,
    next_shipyard_id: u32,
    queued: BTreeMap<PlayerId, PlayerActions>,
}

impl World {
    /// Creates a world with a seeded halite field and one ship per player.
    ///
    /// The player count is clamped to `1..=4`; start cells are mirrored so
    /// every player faces the same halite distribution.
    #[must_use]
    pub fn new(rules: Rules, players: u32, seed: u64) -> Self {
        let size = rules.size.max(1);
        let player_count = players.clamp(1, MAX_PLAYERS);
        let halite = generate_halite(size, rules.board_halite, seed);

        let mut world = Self {
            halite,
            ships: Vec::new(),
            shipyards: Vec::new(),
            players: Vec::new(),
            step: 0,
            next_ship_id: 0,
            next_shipyard_id: 0,
            queued: BTreeMap::new(),
            rules: Rules { size, ..rules },
        };

        for (index, start) in start_positions(size)
            .into_iter()
            .take(player_count as usize)
            .enumerate()
        {
            let owner = PlayerId::new(index as u32);
            world.players.push(Player {
                id: owner,
                halite: world.rules.starting_halite,
            });
            let id = world.allocate_ship_id();
            world.ships.push(Ship {
                id,
                owner,
                position: start,
                halite: 0.0,
            });
        }

        world
    }

    fn allocate_ship_id(&mut self) -> ShipId {
        let id = ShipId::new(self.next_ship_id);
        self.next_ship_id += 1;
        id
    }

    fn allocate_shipyard_id(&mut self) -> ShipyardId {
        let id = ShipyardId::new(self.next_shipyard_id);
        self.next_shipyard_id += 1;
        id
    }

    fn player_mut(&mut self, player: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|entry| entry.id == player)
    }

    fn ship_index(&self, ship: ShipId) -> Option<usize> {
        self.ships.iter().position(|entry| entry.id == ship)
    }

    fn cell_mut(&mut self, position: Position) -> Option<&mut f64> {
        position
            .index(self.rules.size)
            .and_then(|index| self.halite.get_mut(index))
    }

    fn resolve_turn(&mut self, out_events: &mut Vec<Event>) {
        let queued = std::mem::take(&mut self.queued);
        let mut moved: BTreeSet<ShipId> = BTreeSet::new();

        for (player, actions) in &queued {
            for (shipyard, ShipyardAction::Spawn) in actions.shipyards() {
                if let Some(ship) = self.spawn(*player, shipyard, out_events) {
                    let _ = moved.insert(ship);
                }
            }
            for (ship, action) in actions.ships() {
                match action {
                    ShipAction::Convert => self.convert(*player, ship, out_events),
                    other => {
                        if self.relocate(*player, ship, other, out_events) {
                            let _ = moved.insert(ship);
                        }
                    }
                }
            }
        }

        self.resolve_ship_collisions(out_events);
        self.resolve_shipyard_collisions(out_events);
        self.deposit_cargo(out_events);
        self.collect_halite(&moved);
        self.regenerate_halite();

        self.step = self.step.saturating_add(1);
        tracing::trace!(
            step = self.step,
            ships = self.ships.len(),
            shipyards = self.shipyards.len(),
            "turn resolved"
        );
        out_events.push(Event::TurnAdvanced { step: self.step });
    }

    fn spawn(
        &mut self,
        player: PlayerId,
        shipyard: ShipyardId,
        out_events: &mut Vec<Event>,
    ) -> Option<ShipId> {
        let Some(yard) = self.shipyards.iter().find(|entry| entry.id == shipyard) else {
            reject(out_events, player, RejectionReason::UnknownEntity);
            return None;
        };
        if yard.owner != player {
            reject(out_events, player, RejectionReason::NotOwner);
            return None;
        }
        let position = yard.position;

        let cost = self.rules.spawn_cost;
        let Some(bank) = self.player_mut(player).filter(|entry| entry.halite >= cost) else {
            reject(out_events, player, RejectionReason::InsufficientHalite);
            return None;
        };
        bank.halite -= cost;

        let id = self.allocate_ship_id();
        self.ships.push(Ship {
            id,
            owner: player,
            position,
            halite: 0.0,
        });
        out_events.push(Event::ShipSpawned {
            ship: id,
            shipyard,
            position,
        });
        Some(id)
    }

    fn convert(&mut self, player: PlayerId, ship: ShipId, out_events: &mut Vec<Event>) {
        let Some(index) = self.ship_index(ship) else {
            reject(out_events, player, RejectionReason::UnknownEntity);
            return;
        };
        let Ship {
            owner,
            position,
            halite,
            ..
        } = self.ships[index];
        if owner != player {
            reject(out_events, player, RejectionReason::NotOwner);
            return;
        }
        if self
            .shipyards
            .iter()
            .any(|shipyard| shipyard.position == position)
        {
            reject(out_events, player, RejectionReason::CellOccupied);
            return;
        }

        let cost = self.rules.convert_cost;
        let Some(bank) = self
            .player_mut(player)
            .filter(|entry| entry.halite + halite >= cost)
        else {
            reject(out_events, player, RejectionReason::InsufficientHalite);
            return;
        };
        bank.halite += halite - cost;

        let _ = self.ships.remove(index);
        let shipyard = self.allocate_shipyard_id();
        self.shipyards.push(Shipyard {
            id: shipyard,
            owner: player,
            position,
        });
        out_events.push(Event::ShipConverted {
            ship,
            shipyard,
            position,
        });
    }

    fn relocate(
        &mut self,
        player: PlayerId,
        ship: ShipId,
        action: ShipAction,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let size = self.rules.size;
        let Some(mv) = action.as_move() else {
            return false;
        };
        let Some(entry) = self.ships.iter_mut().find(|entry| entry.id == ship) else {
            reject(out_events, player, RejectionReason::UnknownEntity);
            return false;
        };
        if entry.owner != player {
            reject(out_events, player, RejectionReason::NotOwner);
            return false;
        }

        let from = entry.position;
        entry.position = from.translate(mv, size);
        out_events.push(Event::ShipMoved {
            ship,
            from,
            to: entry.position,
        });
        true
    }

    fn resolve_ship_collisions(&mut self, out_events: &mut Vec<Event>) {
        let mut by_cell: BTreeMap<Position, Vec<usize>> = BTreeMap::new();
        for (index, ship) in self.ships.iter().enumerate() {
            by_cell.entry(ship.position).or_default().push(index);
        }

        let mut destroyed: BTreeSet<ShipId> = BTreeSet::new();
        for (position, indices) in by_cell {
            if indices.len() < 2 {
                continue;
            }

            let lightest = indices
                .iter()
                .map(|index| self.ships[*index].halite)
                .fold(f64::INFINITY, f64::min);
            let survivors: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|index| self.ships[*index].halite <= lightest)
                .collect();
            let cargo: f64 = indices
                .iter()
                .filter(|index| !survivors.contains(*index) || survivors.len() > 1)
                .map(|index| self.ships[*index].halite)
                .sum();

            if let [winner] = survivors.as_slice() {
                self.ships[*winner].halite += cargo;
            } else if let Some(cell) = self.cell_mut(position) {
                *cell += cargo;
            }

            for index in indices {
                if survivors.len() > 1 || !survivors.contains(&index) {
                    let _ = destroyed.insert(self.ships[index].id);
                }
            }
        }

        self.remove_ships(&destroyed, out_events);
    }

    fn resolve_shipyard_collisions(&mut self, out_events: &mut Vec<Event>) {
        let mut destroyed_ships: BTreeSet<ShipId> = BTreeSet::new();
        let mut destroyed_shipyards: Vec<(ShipyardId, Position)> = Vec::new();

        for shipyard in &self.shipyards {
            let raider = self
                .ships
                .iter()
                .find(|ship| ship.position == shipyard.position && ship.owner != shipyard.owner);
            if let Some(raider) = raider {
                let _ = destroyed_ships.insert(raider.id);
                destroyed_shipyards.push((shipyard.id, shipyard.position));
            }
        }

        for (shipyard, position) in &destroyed_shipyards {
            self.shipyards.retain(|entry| entry.id != *shipyard);
            out_events.push(Event::ShipyardDestroyed {
                shipyard: *shipyard,
                position: *position,
            });
        }

        let spilled: Vec<(Position, f64)> = self
            .ships
            .iter()
            .filter(|ship| destroyed_ships.contains(&ship.id))
            .map(|ship| (ship.position, ship.halite))
            .collect();
        for (position, cargo) in spilled {
            if let Some(cell) = self.cell_mut(position) {
                *cell += cargo;
            }
        }
        self.remove_ships(&destroyed_ships, out_events);
    }

    fn remove_ships(&mut self, destroyed: &BTreeSet<ShipId>, out_events: &mut Vec<Event>) {
        if destroyed.is_empty() {
            return;
        }
        for ship in self.ships.iter().filter(|ship| destroyed.contains(&ship.id)) {
            out_events.push(Event::ShipDestroyed {
                ship: ship.id,
                position: ship.position,
            });
        }
        self.ships.retain(|ship| !destroyed.contains(&ship.id));
    }

    fn deposit_cargo(&mut self, out_events: &mut Vec<Event>) {
        for ship in &mut self.ships {
            if ship.halite <= 0.0 {
                continue;
            }
            let docked = self
                .shipyards
                .iter()
                .any(|shipyard| shipyard.position == ship.position && shipyard.owner == ship.owner);
            if !docked {
                continue;
            }
            if let Some(bank) = self.players.iter_mut().find(|entry| entry.id == ship.owner) {
                bank.halite += ship.halite;
                out_events.push(Event::HaliteDeposited {
                    ship: ship.id,
                    player: ship.owner,
                    amount: ship.halite,
                });
                ship.halite = 0.0;
            }
        }
    }

    fn collect_halite(&mut self, moved: &BTreeSet<ShipId>) {
        let size = self.rules.size;
        for ship in &mut self.ships {
            if moved.contains(&ship.id) {
                continue;
            }
            if self
                .shipyards
                .iter()
                .any(|shipyard| shipyard.position == ship.position)
            {
                continue;
            }
            let Some(cell) = ship
                .position
                .index(size)
                .and_then(|index| self.halite.get_mut(index))
            else {
                continue;
            };
            let amount = *cell * self.rules.collect_rate;
            *cell -= amount;
            ship.halite += amount;
        }
    }

    fn regenerate_halite(&mut self) {
        let size = self.rules.size;
        let occupied: BTreeSet<usize> = self
            .ships
            .iter()
            .filter_map(|ship| ship.position.index(size))
            .collect();
        let growth = 1.0 + self.rules.regen_rate;
        let cap = self.rules.max_cell_halite;
        for (index, cell) in self.halite.iter_mut().enumerate() {
            if occupied.contains(&index) || *cell >= cap {
                continue;
            }
            *cell = (*cell * growth).min(cap);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SubmitActions { player, actions } => {
            if world.players.iter().any(|entry| entry.id == player) {
                let _ = world.queued.insert(player, actions);
            } else {
                reject(out_events, player, RejectionReason::UnknownEntity);
            }
        }
        Command::AdvanceTurn => world.resolve_turn(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use halite_fleet_core::{BoardSnapshot, HaliteView, PlayerId, ShipSnapshot, ShipyardSnapshot};

    use super::{Rules, World};

    /// Rules the world was created with.
    #[must_use]
    pub fn rules(world: &World) -> &Rules {
        &world.rules
    }

    /// Index of the current turn.
    #[must_use]
    pub fn step(world: &World) -> u32 {
        world.step
    }

    /// Players participating in the episode in identifier order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerId> {
        world.players.iter().map(|player| player.id).collect()
    }

    /// Halite banked by each player in identifier order.
    #[must_use]
    pub fn scores(world: &World) -> Vec<(PlayerId, f64)> {
        world
            .players
            .iter()
            .map(|player| (player.id, player.halite))
            .collect()
    }

    /// Read-only view over the halite field.
    #[must_use]
    pub fn halite_view(world: &World) -> HaliteView<'_> {
        HaliteView::new(&world.halite, world.rules.size)
    }

    /// Reports whether the episode is over.
    ///
    /// An episode ends on its final turn or, with several players, once at
    /// most one player can still act.
    #[must_use]
    pub fn is_finished(world: &World) -> bool {
        if world.step >= world.rules.episode_steps.saturating_sub(1) {
            return true;
        }
        if world.players.len() < 2 {
            return false;
        }
        let active = world
            .players
            .iter()
            .filter(|player| {
                let has_ship = world.ships.iter().any(|ship| ship.owner == player.id);
                let can_spawn = player.halite >= world.rules.spawn_cost
                    && world
                        .shipyards
                        .iter()
                        .any(|shipyard| shipyard.owner == player.id);
                has_ship || can_spawn
            })
            .count();
        active <= 1
    }

    /// Captures the snapshot handed to `player`'s agent for this turn.
    #[must_use]
    pub fn board_snapshot(world: &World, player: PlayerId) -> BoardSnapshot {
        let player_halite = world
            .players
            .iter()
            .find(|entry| entry.id == player)
            .map_or(0.0, |entry| entry.halite);
        let ships = world
            .ships
            .iter()
            .map(|ship| ShipSnapshot {
                id: ship.id,
                owner: ship.owner,
                position: ship.position,
                halite: ship.halite,
            })
            .collect();
        let shipyards = world
            .shipyards
            .iter()
            .map(|shipyard| ShipyardSnapshot {
                id: shipyard.id,
                owner: shipyard.owner,
                position: shipyard.position,
            })
            .collect();

        BoardSnapshot {
            size: world.rules.size,
            step: world.step,
            episode_steps: world.rules.episode_steps,
            player,
            player_halite,
            halite: world.halite.clone(),
            ships,
            shipyards,
        }
        .into_canonical()
    }
}

#[derive(Clone, Debug)]
struct Ship {
    id: ShipId,
    owner: PlayerId,
    position: Position,
    halite: f64,
}

#[derive(Clone, Debug)]
struct Shipyard {
    id: ShipyardId,
    owner: PlayerId,
    position: Position,
}

#[derive(Clone, Debug)]
struct Player {
    id: PlayerId,
    halite: f64,
}

fn reject(out_events: &mut Vec<Event>, player: PlayerId, reason: RejectionReason) {
    tracing::debug!(player = player.get(), ?reason, "action rejected");
    out_events.push(Event::ActionRejected { player, reason });
}

fn start_positions(size: u32) -> [Position; MAX_PLAYERS as usize] {
    let near = size / 4;
    let far = size - 1 - near;
    [
        Position::new(near, near),
        Position::new(far, far),
        Position::new(near, far),
        Position::new(far, near),
    ]
}

/// Builds a field that is mirrored across both axes so every start cell
/// sees the same surroundings.
fn generate_halite(size: u32, budget: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let half = size.div_ceil(2) as usize;
    let mut quadrant = vec![0.0_f64; half * half];
    for weight in &mut quadrant {
        if rng.gen_bool(HALITE_CELL_PROBABILITY) {
            let sample: f64 = rng.gen();
            *weight = sample * sample;
        }
    }

    let side = size as usize;
    let mut cells = Vec::with_capacity(side * side);
    for y in 0..side {
        for x in 0..side {
            let fold_x = x.min(side - 1 - x);
            let fold_y = y.min(side - 1 - y);
            cells.push(quadrant[fold_y * half + fold_x]);
        }
    }

    let total: f64 = cells.iter().sum();
    if total > 0.0 {
        let scale = budget / total;
        for cell in &mut cells {
            *cell *= scale;
        }
    }
    cells
}
