use halite_fleet_agent::Agent;
use halite_fleet_core::{Command, Event, PlayerId};
use halite_fleet_world::{self as world, query, World};

use crate::config::Settings;

/// Final state of a simulated episode.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EpisodeReport {
    /// Turns resolved before the episode ended.
    pub(crate) turns: u32,
    /// Banked halite per player.
    pub(crate) scores: Vec<(PlayerId, f64)>,
    /// Commands refused by the world over the whole episode.
    pub(crate) rejections: usize,
}

/// Plays a self-play episode with one agent per player.
///
/// A player whose agent fails on a turn submits nothing for that turn.
pub(crate) fn run_episode(settings: &Settings, players: u32, seed: u64) -> EpisodeReport {
    let mut world = World::new(settings.rules.clone(), players, seed);
    let agent = Agent::new(settings.tuning.clone());
    let mut rejections = 0;
    let mut turns = 0;

    tracing::info!(
        players = query::players(&world).len(),
        size = query::rules(&world).size,
        seed,
        halite_threshold = agent.tuning().halite_threshold,
        enemy_dist_threshold = agent.tuning().enemy_dist_threshold,
        "episode started"
    );

    while !query::is_finished(&world) {
        let mut events = Vec::new();
        for player in query::players(&world) {
            let board = query::board_snapshot(&world, player);
            match agent.decide(&board) {
                Ok(decision) => world::apply(
                    &mut world,
                    Command::SubmitActions {
                        player,
                        actions: decision.actions,
                    },
                    &mut events,
                ),
                Err(error) => tracing::error!(
                    player = player.get(),
                    step = board.step,
                    %error,
                    "agent failed, skipping turn"
                ),
            }
        }
        world::apply(&mut world, Command::AdvanceTurn, &mut events);

        rejections += events
            .iter()
            .filter(|event| matches!(event, Event::ActionRejected { .. }))
            .count();
        turns += 1;
        if turns % 50 == 0 {
            tracing::info!(step = query::step(&world), "episode progress");
        }
    }

    let report = EpisodeReport {
        turns,
        scores: query::scores(&world),
        rejections,
    };
    tracing::info!(turns = report.turns, rejections = report.rejections, "episode finished");
    report
}
