use crate::error::PlotError;
use crate::pq::{nits_to_pq, pq_to_nits};

/// Percentiles for the "practical" maxima, taken in PQ space so a handful of
/// specular frames do not dominate the legend.
const CLL_PERCENTILE: f64 = 99.5;
const FALL_PERCENTILE: f64 = 99.75;

/// Aggregate statistics of a (trimmed) light level series. All values in nits,
/// rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightStats {
    pub max_cll: f64,
    pub max_fall: f64,
    pub avg_cll: f64,
    pub avg_fall: f64,
    pub practical_max_cll: f64,
    pub practical_max_fall: f64,
}

impl LightStats {
    pub fn compute(cll: &[f64], fall: &[f64]) -> Result<Self, PlotError> {
        if cll.is_empty() || fall.is_empty() {
            return Err(PlotError::EmptyMeasurements);
        }
        Ok(LightStats {
            max_cll: round2(max(cll)),
            max_fall: round2(max(fall)),
            avg_cll: round2(mean(cll)),
            avg_fall: round2(mean(fall)),
            practical_max_cll: round2(pq_percentile_nits(cll, CLL_PERCENTILE)),
            practical_max_fall: round2(pq_percentile_nits(fall, FALL_PERCENTILE)),
        })
    }

    pub fn cll_legend(&self) -> String {
        format!(
            "{:<7}(maxCLL  = {:8.2} nits,  avgCLL  = {:8.2} nits.)",
            "CLL", self.practical_max_cll, self.avg_cll
        )
    }

    pub fn fall_legend(&self) -> String {
        format!(
            "{:<6}(maxFALL = {:8.2} nits,  avgFALL = {:8.2} nits.)",
            "FALL", self.practical_max_fall, self.avg_fall
        )
    }
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn pq_percentile_nits(nits: &[f64], pct: f64) -> f64 {
    let pq: Vec<f64> = nits.iter().map(|&n| nits_to_pq(n)).collect();
    pq_to_nits(percentile(&pq, pct))
}

/// Percentile with linear interpolation between closest ranks.
/// `values` must not be empty.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert!((percentile(&values, 62.5) - 3.5).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 99.5), 7.0);
    }

    #[test]
    fn test_percentile_ignores_order() {
        assert_eq!(percentile(&[5.0, 1.0, 3.0], 50.0), 3.0);
    }

    #[test]
    fn test_compute() {
        let cll = [100.0, 200.0, 300.0, 1000.0];
        let fall = [10.0, 20.0, 30.0, 40.0];
        let stats = LightStats::compute(&cll, &fall).unwrap();
        assert_eq!(stats.max_cll, 1000.0);
        assert_eq!(stats.max_fall, 40.0);
        assert_eq!(stats.avg_cll, 400.0);
        assert_eq!(stats.avg_fall, 25.0);
        // The practical maximum lies between the two largest samples.
        assert!(stats.practical_max_cll > 300.0 && stats.practical_max_cll <= 1000.0);
        assert!(stats.practical_max_fall > 30.0 && stats.practical_max_fall <= 40.0);
    }

    #[test]
    fn test_constant_series() {
        let cll = [203.0; 50];
        let fall = [48.0; 50];
        let stats = LightStats::compute(&cll, &fall).unwrap();
        assert_eq!(stats.practical_max_cll, 203.0);
        assert_eq!(stats.practical_max_fall, 48.0);
    }

    #[test]
    fn test_empty_series() {
        assert!(matches!(
            LightStats::compute(&[], &[]),
            Err(PlotError::EmptyMeasurements)
        ));
    }

    #[test]
    fn test_legend_layout() {
        let stats = LightStats {
            max_cll: 1000.0,
            max_fall: 400.0,
            avg_cll: 150.25,
            avg_fall: 20.5,
            practical_max_cll: 987.65,
            practical_max_fall: 321.0,
        };
        assert_eq!(
            stats.cll_legend(),
            "CLL    (maxCLL  =   987.65 nits,  avgCLL  =   150.25 nits.)"
        );
        assert_eq!(
            stats.fall_legend(),
            "FALL  (maxFALL =   321.00 nits,  avgFALL =    20.50 nits.)"
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(999.999), 1000.0);
    }
}
