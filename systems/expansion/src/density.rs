use halite_fleet_core::{BoardSnapshot, Position, ShipyardId, Tuning};

/// Halite and ship concentration around one owned shipyard.
#[derive(Clone, Debug, PartialEq)]
pub struct ShipyardDensity {
    /// Shipyard the measurement belongs to.
    pub shipyard: ShipyardId,
    /// Cell of the shipyard.
    pub position: Position,
    /// Halite summed over the square neighbourhood.
    pub halite_in_area: f64,
    /// Own ships closer than the half width, plus one.
    pub ships_in_area: u32,
    /// `halite_in_area / ships_in_area`.
    pub ratio: f64,
}

/// Ranks the acting player's shipyards by halite available per nearby ship.
///
/// The neighbourhood spans offsets `[-w, w)` on both axes around the
/// shipyard, wrapping at the edges, with `w` the density half width of the
/// tuning. The result is sorted by ratio, highest first; equal ratios keep
/// shipyard identifier order.
#[must_use]
pub fn shipyard_density(board: &BoardSnapshot, tuning: &Tuning) -> Vec<ShipyardDensity> {
    let half_width = tuning.density_half_width(board.size);
    let span = i64::from(half_width);
    let halite = board.halite_view();

    let mut ranking: Vec<ShipyardDensity> = board
        .own_shipyards()
        .map(|shipyard| {
            let mut halite_in_area = 0.0;
            for dy in -span..span {
                for dx in -span..span {
                    halite_in_area += halite.halite_at(shipyard.position.offset(dx, dy, board.size));
                }
            }

            let nearby = board
                .own_ships()
                .filter(|ship| ship.position.manhattan_distance(shipyard.position) < half_width)
                .count();
            let ships_in_area = u32::try_from(nearby).unwrap_or(u32::MAX).saturating_add(1);

            ShipyardDensity {
                shipyard: shipyard.id,
                position: shipyard.position,
                halite_in_area,
                ships_in_area,
                ratio: halite_in_area / f64::from(ships_in_area),
            }
        })
        .collect();

    ranking.sort_by(|left, right| right.ratio.total_cmp(&left.ratio));
    ranking
}
