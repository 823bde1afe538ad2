use std::collections::BTreeMap;

use driftlands_common::{Rgba, hash2d};
use driftlands_render::QuarterTurn;
use driftlands_stream::TileId;

/// One of the four sides of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    North,
    East,
    South,
    West,
}

/// One of the four corners of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Corner {
    const ALL: [Corner; 4] = [Corner::NorthEast, Corner::NorthWest, Corner::SouthEast, Corner::SouthWest];

    fn sides(self) -> (Side, Side) {
        match self {
            Self::NorthEast => (Side::North, Side::East),
            Self::NorthWest => (Side::North, Side::West),
            Self::SouthEast => (Side::South, Side::East),
            Self::SouthWest => (Side::South, Side::West),
        }
    }

    fn index(self) -> usize {
        match self {
            Self::NorthEast => 0,
            Self::NorthWest => 1,
            Self::SouthEast => 2,
            Self::SouthWest => 3,
        }
    }
}

/// The eight tiles around a focal tile. North is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub north: TileId,
    pub east: TileId,
    pub south: TileId,
    pub west: TileId,
    pub north_east: TileId,
    pub north_west: TileId,
    pub south_east: TileId,
    pub south_west: TileId,
}

impl Neighbors {
    /// Sample neighbours through a lookup taking `(dx, dy)` offsets.
    pub fn sample(mut lookup: impl FnMut(i32, i32) -> TileId) -> Self {
        Self {
            north: lookup(0, -1),
            east: lookup(1, 0),
            south: lookup(0, 1),
            west: lookup(-1, 0),
            north_east: lookup(1, -1),
            north_west: lookup(-1, -1),
            south_east: lookup(1, 1),
            south_west: lookup(-1, 1),
        }
    }

    pub fn uniform(id: TileId) -> Self {
        Self::sample(|_, _| id)
    }

    pub fn side(&self, side: Side) -> TileId {
        match side {
            Side::North => self.north,
            Side::East => self.east,
            Side::South => self.south,
            Side::West => self.west,
        }
    }

    pub fn corner(&self, corner: Corner) -> TileId {
        match corner {
            Corner::NorthEast => self.north_east,
            Corner::NorthWest => self.north_west,
            Corner::SouthEast => self.south_east,
            Corner::SouthWest => self.south_west,
        }
    }

    fn all(&self) -> [TileId; 8] {
        [
            self.north,
            self.east,
            self.south,
            self.west,
            self.north_east,
            self.north_west,
            self.south_east,
            self.south_west,
        ]
    }
}

/// How a secondary tile borders the base surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShoreCase {
    Plain,
    /// Base on two adjacent sides.
    InnerCorner(Corner),
    /// Base on exactly one side (north, east or west).
    Edge(Side),
    /// Base on the south side only. Drawn from the depth pool rather than a
    /// half-turned edge, which would show the cliff face upside down.
    FarShore,
    /// Base on no side and exactly one corner.
    OuterCorner(Corner),
}

/// Classify a secondary tile by which neighbours are `base`.
pub fn classify_shore(base: TileId, n: &Neighbors) -> ShoreCase {
    // Neighbours that are still streaming would produce wrong edges.
    if n.all().iter().any(|id| !id.is_resolved()) {
        return ShoreCase::Plain;
    }

    const SIDES: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];
    let bordering: Vec<Side> = SIDES.into_iter().filter(|s| n.side(*s) == base).collect();

    if bordering.len() >= 2 {
        let pair = Corner::ALL.into_iter().find(|c| {
            let (a, b) = c.sides();
            bordering.contains(&a) && bordering.contains(&b)
        });
        if let Some(corner) = pair {
            return ShoreCase::InnerCorner(corner);
        }
        // Opposite sides only: treat as an edge on the first side.
        return edge(bordering[0]);
    }
    if let [side] = bordering[..] {
        return edge(side);
    }

    let mut corners = Corner::ALL.into_iter().filter(|c| n.corner(*c) == base);
    match (corners.next(), corners.next()) {
        (Some(corner), None) => ShoreCase::OuterCorner(corner),
        _ => ShoreCase::Plain,
    }
}

fn edge(side: Side) -> ShoreCase {
    match side {
        Side::South => ShoreCase::FarShore,
        other => ShoreCase::Edge(other),
    }
}

/// What to draw for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileChoice {
    /// Atlas tile `index`, rotated.
    Atlas { index: u32, rotation: QuarterTurn },
    /// Solid placeholder color; the type is unknown or not streamed yet.
    Placeholder,
}

/// Autotile rule table for one base/secondary surface pair.
///
/// Pools hold atlas indices. Shore edge art is authored with the base
/// surface on its north side.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    pub base: TileId,
    pub secondary: TileId,
    pub base_variants: Vec<u32>,
    pub secondary_plain: Vec<u32>,
    pub shore_edge: Vec<u32>,
    /// Depth variants used for the far-shore case.
    pub far_shore: Vec<u32>,
    /// Indexed NE, NW, SE, SW.
    pub inner_corners: [u32; 4],
    /// Indexed NE, NW, SE, SW.
    pub outer_corners: [u32; 4],
    /// Plain variant pools for every other registered type.
    pub others: BTreeMap<TileId, Vec<u32>>,
    pub placeholder: Rgba,
}

impl Default for RuleTable {
    fn default() -> Self {
        let mut others = BTreeMap::new();
        others.insert(TileId::SAND, vec![4, 5]);
        others.insert(TileId::STONE, vec![6, 7]);
        Self {
            base: TileId::GRASS,
            secondary: TileId::WATER,
            base_variants: vec![0, 1, 2, 3],
            secondary_plain: vec![16, 17],
            shore_edge: vec![18, 19],
            far_shore: vec![20, 21],
            inner_corners: [32, 33, 34, 35],
            outer_corners: [36, 37, 38, 39],
            others,
            placeholder: Rgba::rgb(0.06, 0.06, 0.09),
        }
    }
}

impl RuleTable {
    /// Choose the atlas tile for `focal` at `(tile_x, tile_y)`.
    ///
    /// Pure: identical arguments always give the identical choice.
    pub fn autotile(&self, focal: TileId, neighbors: &Neighbors, tile_x: i32, tile_y: i32, seed: u64) -> TileChoice {
        let pick = |pool: &[u32]| pick_variant(pool, tile_x, tile_y, seed);

        if !focal.is_resolved() {
            return TileChoice::Placeholder;
        }
        if focal == self.base {
            return pick(&self.base_variants);
        }
        if focal == self.secondary {
            return match classify_shore(self.base, neighbors) {
                ShoreCase::Plain => pick(&self.secondary_plain),
                ShoreCase::InnerCorner(c) => atlas(self.inner_corners[c.index()], QuarterTurn::None),
                ShoreCase::OuterCorner(c) => atlas(self.outer_corners[c.index()], QuarterTurn::None),
                ShoreCase::FarShore => pick(&self.far_shore),
                ShoreCase::Edge(side) => match pick(&self.shore_edge) {
                    TileChoice::Atlas { index, .. } => atlas(index, edge_rotation(side)),
                    TileChoice::Placeholder => TileChoice::Placeholder,
                },
            };
        }
        match self.others.get(&focal) {
            Some(pool) => pick(pool),
            None => TileChoice::Placeholder,
        }
    }
}

fn atlas(index: u32, rotation: QuarterTurn) -> TileChoice {
    TileChoice::Atlas { index, rotation }
}

fn edge_rotation(side: Side) -> QuarterTurn {
    match side {
        Side::East => QuarterTurn::Clockwise,
        Side::West => QuarterTurn::CounterClockwise,
        // South never reaches here; it is the far-shore case.
        Side::North | Side::South => QuarterTurn::None,
    }
}

fn pick_variant(pool: &[u32], tile_x: i32, tile_y: i32, seed: u64) -> TileChoice {
    if pool.is_empty() {
        return TileChoice::Placeholder;
    }
    let idx = (hash2d(tile_x, tile_y, seed) % pool.len() as u64) as usize;
    atlas(pool[idx], QuarterTurn::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const G: TileId = TileId::GRASS;
    const W: TileId = TileId::WATER;
    const U: TileId = TileId::UNRESOLVED;

    fn water_with(f: impl Fn(&mut Neighbors)) -> Neighbors {
        let mut n = Neighbors::uniform(W);
        f(&mut n);
        n
    }

    #[test]
    fn open_water_is_plain() {
        assert_eq!(classify_shore(G, &Neighbors::uniform(W)), ShoreCase::Plain);
    }

    #[test]
    fn single_sides_pick_edges() {
        assert_eq!(classify_shore(G, &water_with(|n| n.north = G)), ShoreCase::Edge(Side::North));
        assert_eq!(classify_shore(G, &water_with(|n| n.east = G)), ShoreCase::Edge(Side::East));
        assert_eq!(classify_shore(G, &water_with(|n| n.west = G)), ShoreCase::Edge(Side::West));
        assert_eq!(classify_shore(G, &water_with(|n| n.south = G)), ShoreCase::FarShore);
    }

    #[test]
    fn edge_rotations() {
        let rules = RuleTable::default();
        let rot = |n: Neighbors| match rules.autotile(W, &n, 3, 4, 7) {
            TileChoice::Atlas { rotation, .. } => rotation,
            TileChoice::Placeholder => panic!("expected atlas tile"),
        };
        assert_eq!(rot(water_with(|n| n.north = G)), QuarterTurn::None);
        assert_eq!(rot(water_with(|n| n.east = G)), QuarterTurn::Clockwise);
        assert_eq!(rot(water_with(|n| n.west = G)), QuarterTurn::CounterClockwise);
    }

    #[test]
    fn far_shore_uses_depth_pool_without_rotation() {
        let rules = RuleTable::default();
        let choice = rules.autotile(W, &water_with(|n| n.south = G), 10, 10, 1);
        match choice {
            TileChoice::Atlas { index, rotation } => {
                assert!(rules.far_shore.contains(&index));
                assert_eq!(rotation, QuarterTurn::None);
            }
            TileChoice::Placeholder => panic!("expected atlas tile"),
        }
    }

    #[test]
    fn adjacent_pairs_pick_inner_corners() {
        let cases = [
            (Corner::NorthEast, water_with(|n| (n.north, n.east) = (G, G))),
            (Corner::NorthWest, water_with(|n| (n.north, n.west) = (G, G))),
            (Corner::SouthEast, water_with(|n| (n.south, n.east) = (G, G))),
            (Corner::SouthWest, water_with(|n| (n.south, n.west) = (G, G))),
        ];
        let rules = RuleTable::default();
        for (corner, n) in cases {
            assert_eq!(classify_shore(G, &n), ShoreCase::InnerCorner(corner));
            assert_eq!(
                rules.autotile(W, &n, 0, 0, 0),
                TileChoice::Atlas {
                    index: rules.inner_corners[corner.index()],
                    rotation: QuarterTurn::None
                }
            );
        }
    }

    #[test]
    fn opposite_pairs_fall_back_to_first_edge() {
        assert_eq!(
            classify_shore(G, &water_with(|n| (n.north, n.south) = (G, G))),
            ShoreCase::Edge(Side::North)
        );
        assert_eq!(
            classify_shore(G, &water_with(|n| (n.east, n.west) = (G, G))),
            ShoreCase::Edge(Side::East)
        );
    }

    #[test]
    fn lone_diagonal_picks_outer_corner() {
        let n = water_with(|n| n.south_west = G);
        assert_eq!(classify_shore(G, &n), ShoreCase::OuterCorner(Corner::SouthWest));
        // two diagonals stay plain
        let n = water_with(|n| (n.south_west, n.north_east) = (G, G));
        assert_eq!(classify_shore(G, &n), ShoreCase::Plain);
    }

    #[test]
    fn unresolved_neighbor_short_circuits() {
        let n = water_with(|n| (n.north, n.south_east) = (G, U));
        assert_eq!(classify_shore(G, &n), ShoreCase::Plain);
    }

    #[test]
    fn unknown_or_unresolved_focal_is_placeholder() {
        let rules = RuleTable::default();
        let n = Neighbors::uniform(G);
        assert_eq!(rules.autotile(U, &n, 0, 0, 0), TileChoice::Placeholder);
        assert_eq!(rules.autotile(TileId(42), &n, 0, 0, 0), TileChoice::Placeholder);
    }

    #[test]
    fn other_types_draw_their_pool() {
        let rules = RuleTable::default();
        match rules.autotile(TileId::SAND, &Neighbors::uniform(W), 5, 9, 3) {
            TileChoice::Atlas { index, .. } => assert!(rules.others[&TileId::SAND].contains(&index)),
            TileChoice::Placeholder => panic!("sand has a pool"),
        }
    }

    #[test]
    fn base_variants_vary_across_tiles() {
        let rules = RuleTable::default();
        let n = Neighbors::uniform(G);
        let picks: std::collections::HashSet<_> = (0..64)
            .map(|x| match rules.autotile(G, &n, x, 0, 99) {
                TileChoice::Atlas { index, .. } => index,
                TileChoice::Placeholder => u32::MAX,
            })
            .collect();
        assert!(picks.len() > 1);
        assert!(!picks.contains(&u32::MAX));
    }

    fn any_tile() -> impl Strategy<Value = TileId> {
        prop_oneof![Just(G), Just(W), Just(TileId::SAND), Just(U)]
    }

    fn any_neighbors() -> impl Strategy<Value = Neighbors> {
        prop::array::uniform8(any_tile()).prop_map(|t| Neighbors {
            north: t[0],
            east: t[1],
            south: t[2],
            west: t[3],
            north_east: t[4],
            north_west: t[5],
            south_east: t[6],
            south_west: t[7],
        })
    }

    proptest! {
        #[test]
        fn autotile_is_deterministic(
            focal in any_tile(),
            n in any_neighbors(),
            x in -1000i32..1000,
            y in -1000i32..1000,
            seed in any::<u64>(),
        ) {
            let rules = RuleTable::default();
            let first = rules.autotile(focal, &n, x, y, seed);
            let second = rules.clone().autotile(focal, &n, x, y, seed);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn secondary_never_half_turns(n in any_neighbors(), x in 0i32..64, y in 0i32..64) {
            let rules = RuleTable::default();
            if let TileChoice::Atlas { rotation, .. } = rules.autotile(W, &n, x, y, 5) {
                prop_assert_ne!(rotation.degrees().abs(), 180);
            }
        }
    }
}
