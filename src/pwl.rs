//! Piecewise-linear objective fragments.
use crate::error::{Error, Result};

/// How a piecewise-linear function behaves left of its first and right of its last breakpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PwlExtrapolation {
    /// Continue with the slope of the outermost segment
    #[default]
    Extend,
    /// The function is only defined between the outermost breakpoints;
    /// a solver restricts the variable to that interval.
    Clamp,
}

/// A piecewise-linear function given by breakpoints sorted by strictly increasing `x`
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseLinear {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl PiecewiseLinear {
    /// Build the function through the points `(xs[i], ys[i])`.
    /// At least two points are needed and `xs` must be strictly increasing.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::invalid(format!(
                "{} breakpoints but {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(Error::invalid(
                "a piecewise-linear function needs at least two breakpoints",
            ));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(Error::invalid("breakpoints and values must be finite"));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::invalid("breakpoints must be strictly increasing"));
        }
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    /// Breakpoint abscissae
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Values at the breakpoints
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Number of linear segments between breakpoints
    pub fn num_segments(&self) -> usize {
        self.xs.len() - 1
    }

    /// Width of segment `k`
    pub fn width(&self, k: usize) -> f64 {
        self.xs[k + 1] - self.xs[k]
    }

    /// Slope of segment `k`
    pub fn slope(&self, k: usize) -> f64 {
        (self.ys[k + 1] - self.ys[k]) / self.width(k)
    }

    /// Slopes never decrease: minimising the function is a linear program
    pub fn is_convex(&self) -> bool {
        self.slopes_ordered(|a, b| b >= a)
    }

    /// Slopes never increase: maximising the function is a linear program
    pub fn is_concave(&self) -> bool {
        self.slopes_ordered(|a, b| b <= a)
    }

    fn slopes_ordered(&self, ordered: impl Fn(f64, f64) -> bool) -> bool {
        (1..self.num_segments()).all(|k| ordered(self.slope(k - 1), self.slope(k)))
    }

    /// Value of the function at `x` by linear interpolation between consecutive breakpoints
    pub fn eval(&self, x: f64, extrapolation: PwlExtrapolation) -> f64 {
        let last = self.xs.len() - 1;
        if x <= self.xs[0] {
            return match extrapolation {
                PwlExtrapolation::Clamp => self.ys[0],
                PwlExtrapolation::Extend => self.ys[0] + self.slope(0) * (x - self.xs[0]),
            };
        }
        if x >= self.xs[last] {
            return match extrapolation {
                PwlExtrapolation::Clamp => self.ys[last],
                PwlExtrapolation::Extend => {
                    self.ys[last] + self.slope(last - 1) * (x - self.xs[last])
                }
            };
        }
        // first breakpoint strictly right of x, in 1..=last
        let k = self.xs.partition_point(|&b| b <= x) - 1;
        self.ys[k] + self.slope(k) * (x - self.xs[k])
    }
}

/// A piecewise-linear function of one solver column, added to the objective
#[derive(Clone, Debug, PartialEq)]
pub struct PwlFragment {
    /// Native index of the column
    pub col: usize,
    /// The cost function
    pub function: PiecewiseLinear,
}
