//! Peak search in a 1-D signal with height, prominence and width criteria.
//! Plateaus resolve to their midpoint; prominence bases are searched over the
//! whole signal; widths are measured at half prominence with linear
//! interpolation between samples.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCriteria {
    pub min_height: f64,
    pub min_prominence: f64,
    /// 以樣本數計
    pub min_width: f64,
    pub rel_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub prominence: f64,
    pub width: f64,
}

pub fn find_peaks(x: &[f64], criteria: &PeakCriteria) -> Vec<Peak> {
    local_maxima(x)
        .into_iter()
        .filter(|&p| x[p] >= criteria.min_height)
        .filter_map(|p| {
            let (prominence, left_base, right_base) = prominence(x, p);
            (prominence >= criteria.min_prominence).then_some((p, prominence, left_base, right_base))
        })
        .filter_map(|(p, prominence, left_base, right_base)| {
            let width = width_at(x, p, prominence, left_base, right_base, criteria.rel_height);
            (width >= criteria.min_width).then_some(Peak {
                index: p,
                prominence,
                width,
            })
        })
        .collect()
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// 回傳 (prominence, left_base, right_base)
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = x[peak];

    let mut left_base = peak;
    let mut left_min = top;
    let mut i = peak as isize;
    while i >= 0 && x[i as usize] <= top {
        if x[i as usize] < left_min {
            left_min = x[i as usize];
            left_base = i as usize;
        }
        i -= 1;
    }

    let mut right_base = peak;
    let mut right_min = top;
    let mut i = peak;
    while i < x.len() && x[i] <= top {
        if x[i] < right_min {
            right_min = x[i];
            right_base = i;
        }
        i += 1;
    }

    (top - left_min.max(right_min), left_base, right_base)
}

fn width_at(
    x: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> f64 {
    let height = x[peak] - prominence * rel_height;

    let mut i = peak;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if x[i] < height {
        left_ip += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = peak;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if x[i] < height {
        right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    right_ip - left_ip
}
