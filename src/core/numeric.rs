//! Small numeric kernels shared by the pipeline stages: evenly spaced grids,
//! least-squares polynomials, Savitzky–Golay smoothing, linear resampling and
//! trapezoidal integration.

use crate::utils::error::{ClassifierError, Result};

/// 與 numpy.linspace 相同：含端點，最後一點精確等於 `stop`
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            grid[n - 1] = stop;
            grid
        }
    }
}

/// Least-squares polynomial. The abscissa is mapped onto [-1, 1] before
/// fitting so wavelengths in the thousands do not blow up the normal equations.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// ascending powers of the scaled abscissa
    coefficients: Vec<f64>,
    center: f64,
    half_range: f64,
}

impl Polynomial {
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ClassifierError::processing(format!(
                "polynomial fit: x has {} points but y has {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() <= degree {
            return Err(ClassifierError::processing(format!(
                "polynomial fit of degree {} needs more than {} points",
                degree,
                x.len()
            )));
        }

        let (min, max) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let center = (min + max) / 2.0;
        let half_range = if max > min { (max - min) / 2.0 } else { 1.0 };

        let m = degree + 1;
        let mut ata = vec![vec![0.0; m]; m];
        let mut aty = vec![0.0; m];
        let mut powers = vec![0.0; 2 * degree + 1];

        for (&xi, &yi) in x.iter().zip(y) {
            let t = (xi - center) / half_range;
            let mut p = 1.0;
            for power in powers.iter_mut() {
                *power = p;
                p *= t;
            }
            for row in 0..m {
                aty[row] += powers[row] * yi;
                for col in 0..m {
                    ata[row][col] += powers[row + col];
                }
            }
        }

        let coefficients = solve_linear_system(ata, aty)?;
        Ok(Self {
            coefficients,
            center,
            half_range,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.half_range;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }
}

/// 部分選主元的高斯消去法
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if !(a[pivot_row][col].abs() > 1e-12 * scale) {
            return Err(ClassifierError::processing(
                "singular system in least-squares fit",
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}

/// Savitzky–Golay smoothing with scipy's default `interp` edge mode: interior
/// samples use the convolution coefficients, the first and last half-windows
/// are evaluated from a polynomial fitted to the first / last full window.
pub fn savgol_filter(y: &[f64], window: usize, order: usize) -> Result<Vec<f64>> {
    if window % 2 == 0 || window <= order {
        return Err(ClassifierError::processing(format!(
            "smoothing window {} must be odd and greater than order {}",
            window, order
        )));
    }
    let n = y.len();
    if n <= window {
        return Err(ClassifierError::processing(format!(
            "spectrum has {} samples, smoothing needs more than {}",
            n, window
        )));
    }

    let half = window / 2;
    let offsets: Vec<f64> = (0..window).map(|k| k as f64 - half as f64).collect();

    // 中心點的卷積係數：對單位向量做擬合後取 0 處的值
    let coefficients = (0..window)
        .map(|k| {
            let mut unit = vec![0.0; window];
            unit[k] = 1.0;
            Polynomial::fit(&offsets, &unit, order).map(|p| p.eval(0.0))
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut smoothed = vec![0.0; n];
    for i in half..n - half {
        smoothed[i] = coefficients
            .iter()
            .zip(&y[i - half..=i + half])
            .map(|(c, v)| c * v)
            .sum();
    }

    let head = Polynomial::fit(&offsets, &y[..window], order)?;
    for i in 0..half {
        smoothed[i] = head.eval(offsets[i]);
    }
    let tail = Polynomial::fit(&offsets, &y[n - window..], order)?;
    for i in 0..half {
        smoothed[n - half + i] = tail.eval(offsets[window - half + i]);
    }

    Ok(smoothed)
}

/// Linear interpolation of `(x, y)` onto `grid`; points outside `[x0, xn]`
/// become NaN.
pub fn interp_linear(x: &[f64], y: &[f64], grid: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return vec![f64::NAN; grid.len()];
    }
    let (x, y) = (&x[..n], &y[..n]);

    grid.iter()
        .map(|&g| {
            if !(g >= x[0] && g <= x[n - 1]) {
                return f64::NAN;
            }
            let idx = x.partition_point(|&v| v < g);
            if idx == 0 {
                return y[0];
            }
            let (x0, x1) = (x[idx - 1], x[idx]);
            let t = (g - x0) / (x1 - x0);
            y[idx - 1] + t * (y[idx] - y[idx - 1])
        })
        .collect()
}

pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
    }

    #[test]
    fn test_linspace_matches_endpoints() {
        let grid = linspace(4000.0, 7000.0, 1000);
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 4000.0);
        assert_eq!(grid[999], 7000.0);
        assert_close(grid[1] - grid[0], 3000.0 / 999.0, 1e-9);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_polynomial_recovers_cubic_on_wide_axis() {
        let x = linspace(3000.0, 10000.0, 500);
        let truth = |w: f64| 2.0 - 3.0e-4 * w + 5.0e-8 * w * w - 1.0e-12 * w * w * w;
        let y: Vec<f64> = x.iter().map(|&w| truth(w)).collect();

        let poly = Polynomial::fit(&x, &y, 3).unwrap();
        assert_eq!(poly.degree(), 3);
        for &w in &[3000.0, 4567.0, 8000.0, 10000.0] {
            assert_close(poly.eval(w), truth(w), 1e-8);
        }
    }

    #[test]
    fn test_polynomial_needs_enough_points() {
        assert!(Polynomial::fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 3).is_err());
    }

    #[test]
    fn test_savgol_preserves_cubic() {
        let y: Vec<f64> = (0..100)
            .map(|i| {
                let t = i as f64 / 10.0;
                1.0 + 0.5 * t - 0.1 * t * t + 0.01 * t * t * t
            })
            .collect();
        let smoothed = savgol_filter(&y, 21, 3).unwrap();
        assert_eq!(smoothed.len(), y.len());
        for (a, b) in smoothed.iter().zip(&y) {
            assert_close(*a, *b, 1e-8);
        }
    }

    #[test]
    fn test_savgol_coefficients_sum_to_one() {
        let flat = vec![3.25; 50];
        let smoothed = savgol_filter(&flat, 21, 3).unwrap();
        assert!(smoothed.iter().all(|v| (v - 3.25).abs() < 1e-10));
    }

    #[test]
    fn test_savgol_rejects_short_input() {
        assert!(savgol_filter(&[1.0; 21], 21, 3).is_err());
        assert!(savgol_filter(&[1.0; 40], 20, 3).is_err());
    }

    #[test]
    fn test_interp_out_of_range_is_nan() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, 40.0];
        let out = interp_linear(&x, &y, &[0.5, 1.0, 1.5, 3.0, 4.0, 4.5]);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 10.0);
        assert_close(out[2], 15.0, 1e-12);
        assert_close(out[3], 30.0, 1e-12);
        assert_eq!(out[4], 40.0);
        assert!(out[5].is_nan());
    }

    #[test]
    fn test_trapezoid() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [1.0, 1.0, 1.0, 1.0];
        assert_close(trapezoid(&y, &x), 4.0, 1e-12);
        assert_eq!(trapezoid(&[1.0], &[0.0]), 0.0);
    }
}
