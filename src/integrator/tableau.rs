use super::IntegratorError;
use serde::{Deserialize, Serialize};

const ROW_SUM_TOLERANCE: f64 = 1e-10;

/// Coefficients of an embedded explicit Runge-Kutta pair.
///
/// `matrix[i]` holds the `i` coefficients of stage `i` (strictly lower
/// triangular). `weights` produce the lower-order estimate, whose local
/// error is `O(h^(order + 1))`; `higher_order_weights` produce the estimate
/// that is committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButcherTableau {
    pub name: &'static str,
    pub order: u32,
    pub nodes: &'static [f64],
    pub matrix: &'static [&'static [f64]],
    pub weights: &'static [f64],
    pub higher_order_weights: &'static [f64],
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.nodes.len()
    }

    /// Reject tables whose shapes or row sums do not describe a consistent method.
    pub fn validate(&self) -> Result<(), IntegratorError> {
        let malformed = |reason| IntegratorError::MalformedTableau { name: self.name, reason };
        let stages = self.stages();

        if stages == 0 {
            return Err(malformed("no stages"));
        }
        if self.matrix.len() != stages {
            return Err(malformed("stage matrix row count differs from node count"));
        }
        if self.weights.len() != stages || self.higher_order_weights.len() != stages {
            return Err(malformed("weight count differs from node count"));
        }
        if self.order == 0 {
            return Err(malformed("order must be at least 1"));
        }

        for (i, row) in self.matrix.iter().enumerate() {
            if row.len() != i {
                return Err(malformed("stage matrix is not strictly lower triangular"));
            }
            let row_sum: f64 = row.iter().sum();
            if (row_sum - self.nodes[i]).abs() > ROW_SUM_TOLERANCE {
                return Err(malformed("stage matrix row sum differs from its node"));
            }
        }

        for weights in [self.weights, self.higher_order_weights] {
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(malformed("weights do not sum to one"));
            }
        }

        Ok(())
    }
}

/// Dormand-Prince 5(4); the committed estimate is fifth order.
pub const DORMAND_PRINCE_5: ButcherTableau = ButcherTableau {
    name: "dormand-prince-5",
    order: 4,
    nodes: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
    matrix: &[
        &[],
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
        &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
    ],
    weights: &[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ],
    higher_order_weights: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
};

/// Runge-Kutta-Fehlberg 4(5).
pub const RUNGE_KUTTA_FEHLBERG_45: ButcherTableau = ButcherTableau {
    name: "runge-kutta-fehlberg-45",
    order: 4,
    nodes: &[0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0],
    matrix: &[
        &[],
        &[1.0 / 4.0],
        &[3.0 / 32.0, 9.0 / 32.0],
        &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
        &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
        &[-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
    ],
    weights: &[25.0 / 216.0, 0.0, 1408.0 / 2565.0, 2197.0 / 4104.0, -1.0 / 5.0, 0.0],
    higher_order_weights: &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
};

/// Bogacki-Shampine 3(2).
pub const BOGACKI_SHAMPINE_32: ButcherTableau = ButcherTableau {
    name: "bogacki-shampine-32",
    order: 2,
    nodes: &[0.0, 1.0 / 2.0, 3.0 / 4.0, 1.0],
    matrix: &[&[], &[1.0 / 2.0], &[0.0, 3.0 / 4.0], &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0]],
    weights: &[7.0 / 24.0, 1.0 / 4.0, 1.0 / 3.0, 1.0 / 8.0],
    higher_order_weights: &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    DormandPrince5,
    RungeKuttaFehlberg45,
    BogackiShampine32,
}

impl Scheme {
    pub fn tableau(self) -> &'static ButcherTableau {
        match self {
            Scheme::DormandPrince5 => &DORMAND_PRINCE_5,
            Scheme::RungeKuttaFehlberg45 => &RUNGE_KUTTA_FEHLBERG_45,
            Scheme::BogackiShampine32 => &BOGACKI_SHAMPINE_32,
        }
    }
}
