//! Two-sample tests used by the drift detector
//!
//! - Kolmogorov-Smirnov with the asymptotic Kolmogorov distribution
//! - Chi-square goodness of fit of current counts against reference proportions

use std::collections::HashMap;

const ITMAX: usize = 500;
const EPS: f64 = 1e-14;
const FPMIN: f64 = 1e-300;

/// Result of a two-sample test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    /// `None` when the statistic is unbounded
    pub statistic: Option<f64>,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test
///
/// Returns `D = sup |F_ref(x) - F_cur(x)|` and its asymptotic p-value.
/// Non-finite values are ignored. A sample with no finite values yields
/// `D = 0, p = 1`.
pub fn ks_two_sample(reference: &[f64], current: &[f64]) -> TestResult {
    let finite = |values: &[f64]| values.iter().copied().filter(|v| v.is_finite()).collect::<Vec<_>>();
    let mut a = finite(reference);
    let mut b = finite(current);
    if a.is_empty() || b.is_empty() {
        return TestResult { statistic: Some(0.0), p_value: 1.0 };
    }

    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len(), b.len());
    let (nf, mf) = (n as f64, m as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < n && j < m {
        let x = a[i].min(b[j]);
        while i < n && a[i] <= x {
            i += 1;
        }
        while j < m && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / nf - j as f64 / mf).abs());
    }

    let en = (nf * mf / (nf + mf)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * d);

    TestResult { statistic: Some(d), p_value }
}

/// Survival function of the Kolmogorov distribution, `Q_KS(lambda)`
pub fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;

    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }

    // series failed to converge, only happens for tiny lambda
    1.0
}

/// Chi-square test of current category counts against reference proportions
///
/// Expected counts are the reference counts scaled by `n_current / n_reference`
/// over the union of observed categories. A category never seen in the
/// reference makes the statistic unbounded and the p-value 0.
pub fn chi_square_two_sample(reference: &[&str], current: &[&str]) -> TestResult {
    if reference.is_empty() || current.is_empty() {
        return TestResult { statistic: Some(0.0), p_value: 1.0 };
    }

    let ref_counts = value_counts(reference);
    let cur_counts = value_counts(current);

    let mut keys: Vec<&str> = ref_counts.iter().map(|(k, _)| *k).collect();
    for (k, _) in &cur_counts {
        if !keys.contains(k) {
            keys.push(*k);
        }
    }

    let lookup = |counts: &[(&str, usize)], key: &str| {
        counts.iter().find(|(k, _)| *k == key).map(|(_, c)| *c).unwrap_or(0)
    };

    let scale = current.len() as f64 / reference.len() as f64;
    let mut statistic = 0.0;
    for key in &keys {
        let expected = lookup(&ref_counts, key) as f64 * scale;
        let observed = lookup(&cur_counts, key) as f64;
        if expected == 0.0 {
            return TestResult { statistic: None, p_value: 0.0 };
        }
        statistic += (observed - expected).powi(2) / expected;
    }

    let df = keys.len().saturating_sub(1);
    if df == 0 {
        return TestResult { statistic: Some(statistic), p_value: 1.0 };
    }

    TestResult {
        statistic: Some(statistic),
        p_value: chi_square_sf(statistic, df as f64),
    }
}

/// Category counts in first-seen order
pub fn value_counts<'a>(values: &[&'a str]) -> Vec<(&'a str, usize)> {
    let mut order: Vec<&'a str> = Vec::new();
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    for value in values {
        let count = counts.entry(*value).or_insert(0);
        if *count == 0 {
            order.push(*value);
        }
        *count += 1;
    }
    order.into_iter().map(|v| (v, counts[&v])).collect()
}

/// Upper tail of the chi-square distribution with `df` degrees of freedom
pub fn chi_square_sf(statistic: f64, df: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    gamma_q(df / 2.0, statistic / 2.0)
}

/// Regularized upper incomplete gamma function `Q(a, x)`
pub fn gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let q = if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    };
    q.clamp(0.0, 1.0)
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut del = 1.0 / a;
    let mut sum = del;
    for _ in 0..ITMAX {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

// modified Lentz evaluation
fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..ITMAX {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = b + an / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Natural log of the gamma function (Lanczos approximation), `x > 0`
pub fn ln_gamma(x: f64) -> f64 {
    const COF: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000_000_000_190_015;
    for c in COF {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * ser / x).ln()
}
