//! Slot machine: 3x3 grid, weighted symbol pool, five paylines.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot symbols with their pool frequencies and line multipliers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotSymbol {
    Red,
    Blue,
    Green,
    YinYang,
    Hakkero,
    Yellow,
    Wild,
}

impl SlotSymbol {
    pub const ALL: [SlotSymbol; 7] = [
        SlotSymbol::Red,
        SlotSymbol::Blue,
        SlotSymbol::Green,
        SlotSymbol::YinYang,
        SlotSymbol::Hakkero,
        SlotSymbol::Yellow,
        SlotSymbol::Wild,
    ];

    /// Relative draw frequency in the symbol pool.
    pub fn frequency(self) -> u32 {
        match self {
            SlotSymbol::Red => 100,
            SlotSymbol::Blue => 90,
            SlotSymbol::Green => 80,
            SlotSymbol::YinYang => 50,
            SlotSymbol::Hakkero => 30,
            SlotSymbol::Yellow => 20,
            SlotSymbol::Wild => 20,
        }
    }

    /// Multiplier paid for a line of this symbol.
    pub fn multiplier(self) -> f64 {
        match self {
            SlotSymbol::Red => 0.5,
            SlotSymbol::Blue => 1.0,
            SlotSymbol::Green => 3.0,
            SlotSymbol::YinYang => 8.0,
            SlotSymbol::Hakkero => 12.0,
            SlotSymbol::Yellow => 25.0,
            SlotSymbol::Wild => 100.0,
        }
    }
}

impl fmt::Display for SlotSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotSymbol::Red => "red",
            SlotSymbol::Blue => "blue",
            SlotSymbol::Green => "green",
            SlotSymbol::YinYang => "yin_yang",
            SlotSymbol::Hakkero => "hakkero",
            SlotSymbol::Yellow => "yellow",
            SlotSymbol::Wild => "wild",
        };
        write!(f, "{}", name)
    }
}

/// A winning payline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineWin {
    /// Client-facing line label ("Horizontal 1".."3", "Diagonal 1"/"2").
    pub line: String,
    pub payout: f64,
}

/// Result of one spin before the stake is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub grid: [SlotSymbol; 9],
    pub wins: Vec<LineWin>,
    /// Middle row came up all-wild and was re-spun.
    pub maneki_neko: bool,
    /// Sum of all winning line multipliers. Total payout = wager x this.
    pub total_multiplier: f64,
}

/// The five evaluated paylines: three rows and both diagonals.
const PAYLINES: [(&str, [usize; 3]); 5] = [
    ("Horizontal 1", [0, 1, 2]),
    ("Horizontal 2", [3, 4, 5]),
    ("Horizontal 3", [6, 7, 8]),
    ("Diagonal 1", [0, 4, 8]),
    ("Diagonal 2", [2, 4, 6]),
];

/// Spin the grid: draw 9 symbols independently from the weighted pool, apply
/// the maneki-neko feature when the middle row is all-wild, then score every
/// payline on the final grid.
pub fn spin_slot<R: Rng + ?Sized>(rng: &mut R) -> SpinOutcome {
    let mut grid = [SlotSymbol::Red; 9];
    for cell in grid.iter_mut() {
        *cell = draw_symbol(rng);
    }

    let maneki_neko = grid[3..6].iter().all(|&s| s == SlotSymbol::Wild);
    if maneki_neko {
        // Re-spin the middle row; each cell must land on something other than
        // what it held before the feature.
        for i in 3..6 {
            let previous = grid[i];
            let mut replacement = uniform_symbol(rng);
            while replacement == previous {
                replacement = uniform_symbol(rng);
            }
            grid[i] = replacement;
        }
    }

    let wins = score_lines(&grid);
    let total_multiplier = wins.iter().map(|w| w.payout).sum();

    SpinOutcome {
        grid,
        wins,
        maneki_neko,
        total_multiplier,
    }
}

/// Evaluate every payline against the grid.
pub fn score_lines(grid: &[SlotSymbol; 9]) -> Vec<LineWin> {
    let mut wins = Vec::new();
    for (label, cells) in PAYLINES {
        let line = [grid[cells[0]], grid[cells[1]], grid[cells[2]]];
        if let Some(payout) = line_payout(line) {
            wins.push(LineWin {
                line: label.to_string(),
                payout,
            });
        }
    }
    wins
}

/// A line pays when every cell matches its first non-wild symbol or is wild.
/// An all-wild line pays the wild multiplier itself.
fn line_payout(line: [SlotSymbol; 3]) -> Option<f64> {
    let main = line
        .iter()
        .copied()
        .find(|&s| s != SlotSymbol::Wild)
        .unwrap_or(SlotSymbol::Wild);
    line.iter()
        .all(|&s| s == main || s == SlotSymbol::Wild)
        .then(|| main.multiplier())
}

/// Weighted pool draw.
fn draw_symbol<R: Rng + ?Sized>(rng: &mut R) -> SlotSymbol {
    let total: u32 = SlotSymbol::ALL.iter().map(|s| s.frequency()).sum();
    let mut roll = rng.gen_range(0..total);
    for symbol in SlotSymbol::ALL {
        if roll < symbol.frequency() {
            return symbol;
        }
        roll -= symbol.frequency();
    }
    unreachable!("roll bounded by total frequency")
}

/// Uniform draw used by the maneki-neko re-spin.
fn uniform_symbol<R: Rng + ?Sized>(rng: &mut R) -> SlotSymbol {
    SlotSymbol::ALL[rng.gen_range(0..SlotSymbol::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_matching_row_pays_symbol_multiplier() {
        let mut grid = [SlotSymbol::Red; 9];
        grid[0] = SlotSymbol::Green;
        grid[1] = SlotSymbol::Green;
        grid[2] = SlotSymbol::Green;

        let wins = score_lines(&grid);
        // Top row of greens plus the all-red remainder lines.
        let top = wins.iter().find(|w| w.line == "Horizontal 1").unwrap();
        assert_eq!(top.payout, 3.0);
    }

    #[test]
    fn test_wild_substitutes_on_a_line() {
        let mut grid = [SlotSymbol::Blue; 9];
        grid[0] = SlotSymbol::Yellow;
        grid[1] = SlotSymbol::Wild;
        grid[2] = SlotSymbol::Yellow;

        let wins = score_lines(&grid);
        let top = wins.iter().find(|w| w.line == "Horizontal 1").unwrap();
        assert_eq!(top.payout, 25.0);
    }

    #[test]
    fn test_all_wild_line_pays_wild() {
        let mut grid = [SlotSymbol::Red; 9];
        grid[6] = SlotSymbol::Wild;
        grid[7] = SlotSymbol::Wild;
        grid[8] = SlotSymbol::Wild;

        let wins = score_lines(&grid);
        let bottom = wins.iter().find(|w| w.line == "Horizontal 3").unwrap();
        assert_eq!(bottom.payout, 100.0);
    }

    #[test]
    fn test_both_diagonals_are_scored() {
        let mut grid = [SlotSymbol::Red; 9];
        grid[0] = SlotSymbol::Hakkero;
        grid[4] = SlotSymbol::Hakkero;
        grid[8] = SlotSymbol::Hakkero;
        grid[2] = SlotSymbol::Wild;
        grid[6] = SlotSymbol::Wild;

        let wins = score_lines(&grid);
        assert!(wins.iter().any(|w| w.line == "Diagonal 1" && w.payout == 12.0));
        assert!(wins.iter().any(|w| w.line == "Diagonal 2" && w.payout == 12.0));
    }

    #[test]
    fn test_mixed_line_pays_nothing() {
        let mut grid = [SlotSymbol::Red; 9];
        grid[1] = SlotSymbol::Blue;
        grid[4] = SlotSymbol::Green;
        grid[7] = SlotSymbol::Yellow;

        let wins = score_lines(&grid);
        assert!(wins.is_empty());
    }

    #[test]
    fn test_spin_multiplier_is_sum_of_wins() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..500 {
            let outcome = spin_slot(&mut rng);
            let expected: f64 = outcome.wins.iter().map(|w| w.payout).sum();
            assert_eq!(outcome.total_multiplier, expected);
        }
    }

    #[test]
    fn test_maneki_neko_clears_wild_middle_row() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = 0;
        // Enough spins to hit the feature a few times with 20/390 wild odds.
        for _ in 0..2_000_000 {
            let outcome = spin_slot(&mut rng);
            if outcome.maneki_neko {
                seen += 1;
                // The re-spun middle row may never keep its pre-feature wilds.
                assert!(outcome.grid[3..6].iter().all(|&s| s != SlotSymbol::Wild));
                if seen >= 3 {
                    return;
                }
            }
        }
        panic!("maneki-neko feature never triggered");
    }

    #[test]
    fn test_symbol_pool_is_biased_towards_commons() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut reds = 0u32;
        let mut yellows = 0u32;
        for _ in 0..50_000 {
            match draw_symbol(&mut rng) {
                SlotSymbol::Red => reds += 1,
                SlotSymbol::Yellow => yellows += 1,
                _ => {}
            }
        }
        // Red is five times as frequent as yellow in the pool.
        assert!(reds > yellows * 3);
    }
}
