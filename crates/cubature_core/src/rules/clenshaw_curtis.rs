//! Nested Clenshaw-Curtis rules for the p-adaptive driver.
//!
//! Level `m` has `2^(m+1) + 1` nodes `cos(kπ/n)` on `[-1, 1]`. Every node is
//! identified by an integer key on the finest grid, so a node shared between
//! levels has the same key at every level and its value can be cached.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Highest refinement level per axis.
pub const MAX_LEVEL: usize = 20;

/// Interval count of the level-`MAX_LEVEL` rule; node keys live in `0..=FINEST_INTERVALS`.
pub const FINEST_INTERVALS: u32 = 1 << (MAX_LEVEL + 1);

/// Clenshaw-Curtis weights on `[-1, 1]` for the `intervals + 1` nodes `cos(kπ/intervals)`.
///
/// Waldvogel's construction: the weights are the inverse DFT of the
/// Chebyshev moments. `intervals` must be even and positive.
pub fn clenshaw_curtis_weights(planner: &mut FftPlanner<f64>, intervals: usize) -> Vec<f64> {
    debug_assert!(intervals >= 2 && intervals % 2 == 0);
    let half = intervals / 2;

    let mut moments: Vec<f64> = Vec::with_capacity(intervals);
    moments.push(2.0);
    for j in 1..=half {
        let even = (2 * j) as f64;
        moments.push(2.0 / (1.0 - even * even));
    }
    for j in (1..half).rev() {
        moments.push(moments[j]);
    }

    let mut buffer: Vec<Complex<f64>> = moments.iter().map(|&c| Complex::new(c, 0.0)).collect();
    planner.plan_fft_inverse(intervals).process(&mut buffer);

    let scale = 1.0 / intervals as f64;
    let mut weights: Vec<f64> = buffer.iter().map(|z| z.re * scale).collect();
    weights[0] *= 0.5;
    weights.push(weights[0]);
    weights
}

/// One level of the nested family together with its embedded lower rule.
#[derive(Debug, Clone)]
pub struct LevelRule {
    pub level: usize,
    /// Node keys on the finest grid, one per node.
    pub keys: Vec<u32>,
    /// Node abscissae on `[-1, 1]`, descending.
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
    /// Weights of the rule one level down, laid out on this level's nodes
    /// (zero on the nodes it does not use). Level 0 embeds the midpoint rule.
    pub embedded: Vec<f64>,
}

impl LevelRule {
    fn build(planner: &mut FftPlanner<f64>, level: usize) -> Self {
        let intervals = 2usize << level;
        let stride = 1u32 << (MAX_LEVEL - level);
        let keys: Vec<u32> = (0..=intervals as u32).map(|k| k * stride).collect();
        let nodes = keys.iter().map(|&key| node_at(key)).collect();
        let weights = clenshaw_curtis_weights(planner, intervals);

        let embedded = if level == 0 {
            vec![0.0, 2.0, 0.0]
        } else {
            let coarse = clenshaw_curtis_weights(planner, intervals / 2);
            (0..=intervals)
                .map(|k| if k % 2 == 0 { coarse[k / 2] } else { 0.0 })
                .collect()
        };

        Self {
            level,
            keys,
            nodes,
            weights,
            embedded,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Abscissa on `[-1, 1]` of a finest-grid key.
pub fn node_at(key: u32) -> f64 {
    (key as f64 * std::f64::consts::PI / FINEST_INTERVALS as f64).cos()
}

/// Lazily built table of levels `0..=MAX_LEVEL`, shared by all axes.
pub struct LevelRules {
    planner: FftPlanner<f64>,
    levels: Vec<LevelRule>,
}

impl Default for LevelRules {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelRules {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            levels: Vec::new(),
        }
    }

    /// Builds every level up to `level`. Returns `false` past `MAX_LEVEL`.
    pub fn ensure(&mut self, level: usize) -> bool {
        if level > MAX_LEVEL {
            return false;
        }
        while self.levels.len() <= level {
            let next = self.levels.len();
            let rule = LevelRule::build(&mut self.planner, next);
            self.levels.push(rule);
        }
        true
    }

    /// A level already built by [`LevelRules::ensure`].
    pub fn get(&self, level: usize) -> Option<&LevelRule> {
        self.levels.get(level)
    }

    /// Like [`LevelRules::get`], for levels known to be built.
    ///
    /// # Panics
    /// If `level` has not been built.
    pub fn level(&self, level: usize) -> &LevelRule {
        &self.levels[level]
    }
}
