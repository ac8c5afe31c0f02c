use halite_fleet_core::{
    BoardSnapshot, CommitError, DispatchPlan, DispatchRecord, DispatchStatus, Move, PlannedStep, PlayerId,
    Position, ShipAction, ShipId, ShipSnapshot, Tuning, TurnPlan,
};
use halite_fleet_system_threat_response::ThreatResponse;

const PLAYER: PlayerId = PlayerId::new(0);
const ENEMY: PlayerId = PlayerId::new(1);

fn ship(id: u32, owner: PlayerId, x: u32, y: u32, halite: f64) -> ShipSnapshot {
    ShipSnapshot {
        id: ShipId::new(id),
        owner,
        position: Position::new(x, y),
        halite,
    }
}

fn board(ships: Vec<ShipSnapshot>) -> BoardSnapshot {
    BoardSnapshot {
        size: 15,
        step: 20,
        episode_steps: 400,
        player: PLAYER,
        player_halite: 0.0,
        halite: vec![0.0; 225],
        ships,
        shipyards: Vec::new(),
    }
}

fn respond(board: &BoardSnapshot) -> TurnPlan {
    let mut plan = TurnPlan::new();
    ThreatResponse::new(Tuning::default())
        .handle(board, &mut plan)
        .expect("a free cell exists");
    plan
}

#[test]
fn richer_enemy_in_range_is_attacked() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 10.0),
        ship(2, ENEMY, 9, 5, 21.0),
    ]);

    let plan = respond(&snapshot);

    assert_eq!(plan.actions.ship(ShipId::new(1)), Some(ShipAction::East));
    assert_eq!(
        plan.records[&ShipId::new(1)].plan,
        DispatchPlan::Attack {
            target: Position::new(9, 5),
            next: Position::new(6, 5),
        }
    );
}

#[test]
fn attack_needs_strictly_more_than_double_cargo() {
    let even = board(vec![
        ship(1, PLAYER, 5, 5, 10.0),
        ship(2, ENEMY, 9, 5, 20.0),
    ]);
    assert!(respond(&even).records.is_empty());

    let distant = board(vec![
        ship(1, PLAYER, 5, 5, 10.0),
        ship(2, ENEMY, 10, 5, 500.0),
    ]);
    assert!(respond(&distant).records.is_empty());
}

#[test]
fn loaded_ship_escapes_a_close_enemy() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 6, 50.0),
    ]);

    let plan = respond(&snapshot);

    assert_eq!(plan.actions.ship(ShipId::new(1)), Some(ShipAction::South));
    let record = &plan.records[&ShipId::new(1)];
    assert_eq!(record.status(), DispatchStatus::Escape);
    assert_eq!(record.next_position(), Position::new(5, 4));
}

#[test]
fn board_without_enemies_is_left_untouched() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, PLAYER, 5, 6, 900.0),
    ]);

    let plan = respond(&snapshot);

    assert_eq!(plan, TurnPlan::new());
}

#[test]
fn converting_ships_are_skipped() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 6, 50.0),
    ]);
    let mut plan = TurnPlan::new();
    plan.convert(&snapshot.ships[0]);

    ThreatResponse::new(Tuning::default())
        .handle(&snapshot, &mut plan)
        .expect("a free cell exists");

    assert_eq!(plan.actions.ship(ShipId::new(1)), Some(ShipAction::Convert));
    assert!(plan.records.is_empty());
}

#[test]
fn override_replaces_the_collection_plan_and_its_claims() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 7, 50.0),
    ]);
    let own = &snapshot.ships[0];
    let mut plan = TurnPlan::new();
    let steps: Vec<PlannedStep> = (1..=4)
        .map(|_| PlannedStep {
            mv: Move::Stay,
            position: own.position,
            halite: 0.0,
        })
        .collect();
    for depth in 1..=4 {
        assert!(plan.claims.claim(depth, own.position, own.id));
    }
    let _ = plan.records.insert(
        own.id,
        DispatchRecord {
            ship: own.id,
            halite: own.halite,
            origin: own.position,
            plan: DispatchPlan::Collect { steps, total: 0.0 },
        },
    );

    ThreatResponse::new(Tuning::default())
        .handle(&snapshot, &mut plan)
        .expect("a free cell exists");

    assert_eq!(plan.records[&own.id].status(), DispatchStatus::Escape);
    assert_eq!(plan.claims.claimant(1, Position::new(5, 4)), Some(own.id));
    assert_eq!(plan.claims.claimant(1, own.position), None);
    assert_eq!(plan.claims.iter_depth(2).count(), 0);
}

#[test]
fn escape_falls_back_to_staying_when_an_ally_holds_the_cell() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 6, 50.0),
    ]);
    let mut plan = TurnPlan::new();
    assert!(plan.claims.claim(1, Position::new(5, 4), ShipId::new(7)));

    ThreatResponse::new(Tuning::default())
        .handle(&snapshot, &mut plan)
        .expect("a free cell exists");

    assert_eq!(plan.actions.ship(ShipId::new(1)), None);
    assert_eq!(
        plan.records[&ShipId::new(1)].next_position(),
        Position::new(5, 5)
    );
}

#[test]
fn blocked_escape_takes_the_first_free_neighbour() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 7, 50.0),
    ]);
    let mut plan = TurnPlan::new();
    assert!(plan.claims.claim(1, Position::new(5, 4), ShipId::new(7)));
    assert!(plan.claims.claim(1, Position::new(5, 5), ShipId::new(8)));

    ThreatResponse::new(Tuning::default())
        .handle(&snapshot, &mut plan)
        .expect("a free cell exists");

    assert_eq!(plan.actions.ship(ShipId::new(1)), Some(ShipAction::North));
    assert_eq!(
        plan.records[&ShipId::new(1)].plan,
        DispatchPlan::Escape {
            threat: Position::new(5, 7),
            next: Position::new(5, 6),
        }
    );
    assert_eq!(
        plan.claims.claimant(1, Position::new(5, 5)),
        Some(ShipId::new(8))
    );
    assert_eq!(
        plan.claims.claimant(1, Position::new(5, 6)),
        Some(ShipId::new(1))
    );
}

#[test]
fn surrounded_ship_aborts_the_turn() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 100.0),
        ship(2, ENEMY, 5, 7, 50.0),
    ]);
    let mut plan = TurnPlan::new();
    let taken = [(5, 5), (5, 6), (5, 4), (4, 5), (6, 5)];
    for (holder, (x, y)) in (10..).zip(taken) {
        assert!(plan.claims.claim(1, Position::new(x, y), ShipId::new(holder)));
    }

    let result = ThreatResponse::new(Tuning::default()).handle(&snapshot, &mut plan);

    assert_eq!(
        result,
        Err(CommitError::NoFreeCell {
            ship: ShipId::new(1)
        })
    );
}

#[test]
fn nearest_enemy_ties_resolve_to_lowest_identifier() {
    let snapshot = board(vec![
        ship(1, PLAYER, 5, 5, 10.0),
        ship(2, ENEMY, 3, 5, 500.0),
        ship(3, ENEMY, 7, 5, 500.0),
    ]);

    let plan = respond(&snapshot);

    assert_eq!(plan.actions.ship(ShipId::new(1)), Some(ShipAction::West));
    assert_eq!(
        plan.records[&ShipId::new(1)].plan,
        DispatchPlan::Attack {
            target: Position::new(3, 5),
            next: Position::new(4, 5),
        }
    );
}
