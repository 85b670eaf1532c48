//! Temporal Pattern Engine (C6): seasonality, trend, cyclicality, anomaly,
//! and emergence detection over a time-indexed signal series, grounded
//! numerically on spec §4.5 (no teacher precedent — the connectors API has
//! no equivalent time-series component).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::TemporalGrid;

/// Minimum sample count required to attempt seasonal/trend detection (spec
/// §4.5 "series with < 8 samples yield only anomaly and emergence").
const MIN_SAMPLES_FOR_SEASONAL_TREND: usize = 8;
/// Candidate seasonal periods, expressed in grid-unit counts for an hourly
/// grid (spec §4.5 {24h, 7d, 30d}). Scaled by grid resolution at call time.
const SEASONAL_PERIOD_HOURS: [usize; 3] = [24, 168, 720];
const DEFAULT_ANOMALY_WINDOW: usize = 48;
const DEFAULT_EMERGENCE_WINDOW: usize = 24;
const ANOMALY_Z_THRESHOLD: f64 = 3.0;
const CYCLICALITY_PEAK_RATIO: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PatternTag {
    Seasonal,
    Trend,
    Cyclical,
    Anomaly,
    Emergence,
}

/// Sign of the trend pattern's slope. Only the `Trend` pattern ever reports
/// anything other than `Flat` — it's what lets fusion's `market_timing`
/// distinguish "anomaly dominates with a declining trend" (`past`) from an
/// anomaly riding on a rising or flat trend (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Forecast {
    pub horizon_samples: usize,
    pub point: f64,
    pub lower_80: f64,
    pub upper_80: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemporalPattern {
    pub tag: PatternTag,
    pub strength: f32,
    pub confidence: f32,
    pub forecast: Option<Forecast>,
    pub direction: TrendDirection,
}

/// Converts an irregular, timestamped series of counts/intensities onto a
/// fixed grid by summation; gaps are filled with zero (spec §4.5).
pub fn to_grid(events: &[(DateTime<Utc>, f64)], grid: TemporalGrid) -> Vec<f64> {
    if events.is_empty() {
        return Vec::new();
    }
    let grid_seconds = grid.as_seconds().max(1);
    let start = events.iter().map(|(t, _)| *t).min().unwrap();
    let end = events.iter().map(|(t, _)| *t).max().unwrap();
    let bucket_count = ((end - start).num_seconds() / grid_seconds) as usize + 1;

    let mut buckets = vec![0.0f64; bucket_count];
    for (timestamp, value) in events {
        let offset = (*timestamp - start).num_seconds() / grid_seconds;
        let idx = offset.clamp(0, bucket_count as i64 - 1) as usize;
        buckets[idx] += value;
    }
    buckets
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

fn variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let m = mean(series);
    series.iter().map(|v| (v - m).powi(2)).sum::<f64>() / series.len() as f64
}

fn is_constant(series: &[f64]) -> bool {
    variance(series) < 1e-12
}

fn median(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Centered moving average with the given window, `None` at the edges
/// where the window doesn't fully fit.
fn centered_moving_average(series: &[f64], window: usize) -> Vec<Option<f64>> {
    let half = window / 2;
    (0..series.len())
        .map(|i| {
            if i < half || i + half >= series.len() {
                None
            } else {
                let slice = &series[i - half..=i + half];
                Some(mean(slice))
            }
        })
        .collect()
}

struct SeasonalDecomposition {
    period: usize,
    seasonal: Vec<f64>,
    strength: f32,
}

fn decompose_seasonal(series: &[f64], period: usize) -> Option<SeasonalDecomposition> {
    if period == 0 || series.len() < 2 * period {
        return None;
    }
    let trend = centered_moving_average(series, period);
    let mut phase_sums = vec![0.0f64; period];
    let mut phase_counts = vec![0usize; period];
    for (i, t) in trend.iter().enumerate() {
        if let Some(t) = t {
            let detrended = series[i] - t;
            let phase = i % period;
            phase_sums[phase] += detrended;
            phase_counts[phase] += 1;
        }
    }
    let phase_means: Vec<f64> = phase_sums
        .iter()
        .zip(phase_counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect();
    // Normalize seasonal indices to zero mean so they don't bias the level.
    let phase_mean_of_means = mean(&phase_means);
    let phase_means: Vec<f64> = phase_means.iter().map(|v| v - phase_mean_of_means).collect();

    let seasonal: Vec<f64> = (0..series.len()).map(|i| phase_means[i % period]).collect();
    let residual: Vec<f64> = series.iter().zip(seasonal.iter()).map(|(s, seas)| s - seas).collect();

    let series_var = variance(series);
    let strength = if series_var < 1e-12 {
        0.0
    } else {
        (1.0 - variance(&residual) / series_var).clamp(0.0, 1.0)
    };

    Some(SeasonalDecomposition {
        period,
        seasonal,
        strength: strength as f32,
    })
}

/// Ordinary least squares for `degree` 1 (linear) or 2 (quadratic) fits,
/// returning `(coefficients, adjusted_r_squared)`.
fn polynomial_fit(series: &[f64], degree: usize) -> (Vec<f64>, f64) {
    let n = series.len();
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();

    // Build normal equations X^T X beta = X^T y for a small (degree+1)-sized
    // system; degree is 1 or 2 here so this stays tiny and dependency-free.
    let terms = degree + 1;
    let mut xtx = vec![vec![0.0f64; terms]; terms];
    let mut xty = vec![0.0f64; terms];
    for (i, &x) in xs.iter().enumerate() {
        let powers: Vec<f64> = (0..terms).map(|p| x.powi(p as i32)).collect();
        for a in 0..terms {
            xty[a] += powers[a] * series[i];
            for b in 0..terms {
                xtx[a][b] += powers[a] * powers[b];
            }
        }
    }

    let coeffs = solve_linear_system(&mut xtx, &mut xty).unwrap_or(vec![0.0; terms]);

    let fitted: Vec<f64> = xs
        .iter()
        .map(|&x| coeffs.iter().enumerate().map(|(p, c)| c * x.powi(p as i32)).sum())
        .collect();
    let ss_res: f64 = series.iter().zip(fitted.iter()).map(|(y, f)| (y - f).powi(2)).sum();
    let ss_tot: f64 = {
        let m = mean(series);
        series.iter().map(|y| (y - m).powi(2)).sum()
    };
    let r2 = if ss_tot < 1e-12 { 0.0 } else { 1.0 - ss_res / ss_tot };
    let df = n as f64 - terms as f64;
    let adjusted_r2 = if df > 0.0 { 1.0 - (1.0 - r2) * (n as f64 - 1.0) / df } else { r2 };

    (coeffs, adjusted_r2)
}

/// Small Gaussian-elimination solver for the tiny (2x2 or 3x3) normal
/// equations produced by [`polynomial_fit`].
fn solve_linear_system(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for i in 0..n {
        let pivot_row = (i..n).max_by(|&r1, &r2| a[r1][i].abs().partial_cmp(&a[r2][i].abs()).unwrap())?;
        if a[pivot_row][i].abs() < 1e-12 {
            return None;
        }
        a.swap(i, pivot_row);
        b.swap(i, pivot_row);

        let pivot = a[i][i];
        for j in i..n {
            a[i][j] /= pivot;
        }
        b[i] /= pivot;

        for r in 0..n {
            if r == i {
                continue;
            }
            let factor = a[r][i];
            for j in i..n {
                a[r][j] -= factor * a[i][j];
            }
            b[r] -= factor * b[i];
        }
    }
    Some(b.to_vec())
}

fn standard_deviation(series: &[f64]) -> f64 {
    variance(series).sqrt()
}

/// Naive O(n^2) discrete Fourier transform magnitude spectrum; the series
/// lengths this engine handles (a handful of days at hourly/15m grid) make
/// an FFT crate unnecessary.
fn dft_magnitudes(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    (0..n / 2)
        .map(|k| {
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            for (t, value) in series.iter().enumerate() {
                let angle = -2.0 * std::f64::consts::PI * (k as f64) * (t as f64) / (n as f64);
                re += value * angle.cos();
                im += value * angle.sin();
            }
            (re * re + im * im).sqrt()
        })
        .collect()
}

pub struct TemporalEngine {
    pub anomaly_window: usize,
    pub emergence_window: usize,
    pub grid: TemporalGrid,
}

impl Default for TemporalEngine {
    fn default() -> Self {
        Self {
            anomaly_window: DEFAULT_ANOMALY_WINDOW,
            emergence_window: DEFAULT_EMERGENCE_WINDOW,
            grid: TemporalGrid::OneHour,
        }
    }
}

impl TemporalEngine {
    pub fn new(grid: TemporalGrid, anomaly_window: usize, emergence_window: usize) -> Self {
        Self {
            anomaly_window,
            emergence_window,
            grid,
        }
    }

    fn seasonal_period_samples(&self) -> [usize; 3] {
        let hourly_to_grid = 3600 / self.grid.as_seconds().max(1);
        SEASONAL_PERIOD_HOURS.map(|hours| ((hours as i64) * hourly_to_grid).max(1) as usize)
    }

    fn detect_seasonal(&self, series: &[f64]) -> TemporalPattern {
        if series.len() < MIN_SAMPLES_FOR_SEASONAL_TREND || is_constant(series) {
            return TemporalPattern {
                tag: PatternTag::Seasonal,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let best = self
            .seasonal_period_samples()
            .into_iter()
            .filter_map(|period| decompose_seasonal(series, period))
            .max_by(|a, b| a.strength.partial_cmp(&b.strength).unwrap());

        match best {
            Some(decomposition) => {
                let confidence = (series.len() as f32 / (4.0 * decomposition.period as f32)).clamp(0.0, 1.0);
                TemporalPattern {
                    tag: PatternTag::Seasonal,
                    strength: decomposition.strength,
                    confidence,
                    forecast: None,
                direction: TrendDirection::Flat,
                }
            }
            None => TemporalPattern {
                tag: PatternTag::Seasonal,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            },
        }
    }

    fn detect_trend(&self, series: &[f64], seasonal: Option<&[f64]>) -> TemporalPattern {
        if series.len() < MIN_SAMPLES_FOR_SEASONAL_TREND || is_constant(series) {
            return TemporalPattern {
                tag: PatternTag::Trend,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let detrended: Vec<f64> = match seasonal {
            Some(seasonal) => series.iter().zip(seasonal.iter()).map(|(s, seas)| s - seas).collect(),
            None => series.to_vec(),
        };

        let (linear_coeffs, linear_r2) = polynomial_fit(&detrended, 1);
        let (_, quad_r2) = polynomial_fit(&detrended, 2);

        let slope = linear_coeffs.get(1).copied().unwrap_or(0.0);
        let xs: Vec<f64> = (0..detrended.len()).map(|i| i as f64).collect();
        let sd_x = standard_deviation(&xs);
        let sd_y = standard_deviation(&detrended);
        let standardized_slope = if sd_y > 1e-9 { slope * sd_x / sd_y } else { 0.0 };

        let best_r2 = linear_r2.max(quad_r2);
        let direction = if standardized_slope > 1e-9 {
            TrendDirection::Rising
        } else if standardized_slope < -1e-9 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        };
        TemporalPattern {
            tag: PatternTag::Trend,
            strength: standardized_slope.abs().clamp(0.0, 1.0) as f32,
            confidence: best_r2.clamp(0.0, 1.0) as f32,
            forecast: None,
            direction,
        }
    }

    fn detect_cyclical(&self, residual: &[f64]) -> TemporalPattern {
        if residual.len() < MIN_SAMPLES_FOR_SEASONAL_TREND || is_constant(residual) {
            return TemporalPattern {
                tag: PatternTag::Cyclical,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let magnitudes = dft_magnitudes(residual);
        // Bin 0 is the DC component; skip it when looking for the peak.
        let ac_magnitudes = &magnitudes[1.min(magnitudes.len())..];
        if ac_magnitudes.is_empty() {
            return TemporalPattern {
                tag: PatternTag::Cyclical,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let peak = ac_magnitudes.iter().cloned().fold(0.0f64, f64::max);
        let med = median(ac_magnitudes).max(1e-9);

        if peak > CYCLICALITY_PEAK_RATIO * med {
            let strength = (peak / (peak + med)).clamp(0.0, 1.0);
            TemporalPattern {
                tag: PatternTag::Cyclical,
                strength: strength as f32,
                confidence: ((peak / med) / 10.0).clamp(0.0, 1.0) as f32,
                forecast: None,
                direction: TrendDirection::Flat,
            }
        } else {
            TemporalPattern {
                tag: PatternTag::Cyclical,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            }
        }
    }

    fn detect_anomaly(&self, series: &[f64]) -> TemporalPattern {
        if series.is_empty() || is_constant(series) {
            return TemporalPattern {
                tag: PatternTag::Anomaly,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let window = self.anomaly_window.min(series.len());
        let mut best_z = 0.0f64;
        for i in 0..series.len() {
            let start = i.saturating_sub(window.saturating_sub(1));
            let context = &series[start..i + 1];
            if context.len() < 2 {
                continue;
            }
            let m = mean(context);
            let sd = standard_deviation(context);
            if sd < 1e-9 {
                continue;
            }
            let z = (series[i] - m) / sd;
            if z.abs() > best_z.abs() {
                best_z = z;
            }
        }

        if best_z.abs() > ANOMALY_Z_THRESHOLD {
            TemporalPattern {
                tag: PatternTag::Anomaly,
                strength: (best_z.abs() / 6.0).clamp(0.0, 1.0) as f32,
                confidence: (series.len() as f32 / self.anomaly_window as f32).clamp(0.0, 1.0),
                forecast: None,
                direction: TrendDirection::Flat,
            }
        } else {
            TemporalPattern {
                tag: PatternTag::Anomaly,
                strength: 0.0,
                confidence: if series.len() >= 2 { 0.3 } else { 0.0 },
                forecast: None,
                direction: TrendDirection::Flat,
            }
        }
    }

    fn detect_emergence(&self, series: &[f64]) -> TemporalPattern {
        if series.len() < 3 {
            return TemporalPattern {
                tag: PatternTag::Emergence,
                strength: 0.0,
                confidence: 0.0,
                forecast: None,
                direction: TrendDirection::Flat,
            };
        }

        let window_len = self.emergence_window.min(series.len());
        let window = &series[series.len() - window_len..];

        let velocity = window[window.len() - 1] - window[window.len() - 2];
        let prior_velocity = if window.len() >= 3 {
            window[window.len() - 2] - window[window.len() - 3]
        } else {
            0.0
        };
        let acceleration = velocity - prior_velocity;

        let trailing_median = median(&window[..window.len() - 1]);
        let level = window[window.len() - 1];
        let level_condition = level >= 1.5 * trailing_median.max(1e-9) || (trailing_median < 1e-9 && level > 0.0);

        let is_emergence = velocity > 0.0 && acceleration > 0.0 && level_condition;

        if is_emergence {
            let scale = trailing_median.max(1.0);
            let strength = ((velocity + acceleration) / (2.0 * scale)).clamp(0.0, 1.0);
            TemporalPattern {
                tag: PatternTag::Emergence,
                strength: strength as f32,
                confidence: (window_len as f32 / self.emergence_window as f32).clamp(0.0, 1.0),
                forecast: None,
                direction: TrendDirection::Flat,
            }
        } else {
            TemporalPattern {
                tag: PatternTag::Emergence,
                strength: 0.0,
                confidence: if series.len() >= 3 { 0.3 } else { 0.0 },
                forecast: None,
                direction: TrendDirection::Flat,
            }
        }
    }

    /// Best-effort short-horizon forecast composed from the linear trend
    /// plus seasonal cycle; returns `None` rather than raising on any
    /// degenerate input (spec §4.5 "forecasting is best-effort").
    fn forecast(&self, series: &[f64], seasonal: Option<&[f64]>, period: Option<usize>) -> Option<Forecast> {
        if series.len() < MIN_SAMPLES_FOR_SEASONAL_TREND || is_constant(series) {
            return None;
        }
        let detrended: Vec<f64> = match seasonal {
            Some(seasonal) => series.iter().zip(seasonal.iter()).map(|(s, seas)| s - seas).collect(),
            None => series.to_vec(),
        };
        let (coeffs, _) = polynomial_fit(&detrended, 1);
        let intercept = *coeffs.first()?;
        let slope = *coeffs.get(1)?;

        let horizon = (series.len()).min(2 * self.anomaly_window.max(1)).max(1);
        let next_index = series.len() as f64;
        let trend_component = intercept + slope * next_index;
        let seasonal_component = match (seasonal, period) {
            (Some(seasonal), Some(period)) if period > 0 => seasonal[series.len() % period],
            _ => 0.0,
        };
        let point = trend_component + seasonal_component;

        let fitted: Vec<f64> = (0..detrended.len()).map(|i| intercept + slope * i as f64).collect();
        let residual_std = {
            let residuals: Vec<f64> = detrended.iter().zip(fitted.iter()).map(|(y, f)| y - f).collect();
            standard_deviation(&residuals)
        };
        if !residual_std.is_finite() {
            return None;
        }
        // 80% interval under a normal approximation, z ~= 1.2816.
        let half_width = 1.2816 * residual_std;

        Some(Forecast {
            horizon_samples: horizon,
            point,
            lower_80: point - half_width,
            upper_80: point + half_width,
        })
    }

    /// Runs every detection over `series` (already on a fixed grid) and
    /// returns one [`TemporalPattern`] per tag, plus a best-effort forecast
    /// attached to whichever of seasonal/trend dominates.
    pub fn detect(&self, series: &[f64]) -> Vec<TemporalPattern> {
        let seasonal_pattern = self.detect_seasonal(series);
        let best_period = self
            .seasonal_period_samples()
            .into_iter()
            .find(|p| decompose_seasonal(series, *p).map(|d| d.strength == seasonal_pattern.strength).unwrap_or(false));
        let seasonal_component = best_period.and_then(|p| decompose_seasonal(series, p)).map(|d| d.seasonal);

        let trend_pattern = self.detect_trend(series, seasonal_component.as_deref());

        let residual: Vec<f64> = match &seasonal_component {
            Some(seasonal) => series.iter().zip(seasonal.iter()).map(|(s, seas)| s - seas).collect(),
            None => series.to_vec(),
        };
        let cyclical_pattern = self.detect_cyclical(&residual);
        let anomaly_pattern = self.detect_anomaly(series);
        let emergence_pattern = self.detect_emergence(series);

        let forecast = self.forecast(series, seasonal_component.as_deref(), best_period);
        let mut seasonal_pattern = seasonal_pattern;
        let mut trend_pattern = trend_pattern;
        if seasonal_pattern.strength >= trend_pattern.strength {
            seasonal_pattern.forecast = forecast;
        } else {
            trend_pattern.forecast = forecast;
        }

        vec![seasonal_pattern, trend_pattern, cyclical_pattern, anomaly_pattern, emergence_pattern]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_yields_all_zero_patterns_with_zero_confidence() {
        let engine = TemporalEngine::default();
        let series = vec![5.0; 60];
        for pattern in engine.detect(&series) {
            assert_eq!(pattern.strength, 0.0);
            assert_eq!(pattern.confidence, 0.0);
            assert!(pattern.strength.is_finite());
        }
    }

    #[test]
    fn short_series_only_yields_anomaly_and_emergence_slots() {
        let engine = TemporalEngine::default();
        let series = vec![0.0, 1.0, 1.0, 2.0, 3.0];
        let patterns = engine.detect(&series);
        let seasonal = patterns.iter().find(|p| p.tag == PatternTag::Seasonal).unwrap();
        let trend = patterns.iter().find(|p| p.tag == PatternTag::Trend).unwrap();
        assert_eq!(seasonal.strength, 0.0);
        assert_eq!(seasonal.confidence, 0.0);
        assert_eq!(trend.strength, 0.0);
        assert_eq!(trend.confidence, 0.0);
    }

    #[test]
    fn sharp_ramp_up_is_detected_as_emergence() {
        let engine = TemporalEngine::default();
        let series = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 4.0, 8.0, 13.0];
        let patterns = engine.detect(&series);
        let emergence = patterns.iter().find(|p| p.tag == PatternTag::Emergence).unwrap();
        assert!(emergence.strength >= 0.4, "strength was {}", emergence.strength);
    }

    #[test]
    fn to_grid_fills_gaps_with_zero() {
        let base = Utc::now();
        let events = vec![
            (base, 1.0),
            (base + chrono::Duration::hours(3), 2.0),
        ];
        let grid = to_grid(&events, TemporalGrid::OneHour);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], 1.0);
        assert_eq!(grid[1], 0.0);
        assert_eq!(grid[2], 0.0);
        assert_eq!(grid[3], 2.0);
    }

    #[test]
    fn spiking_point_is_flagged_as_an_anomaly() {
        let engine = TemporalEngine::new(TemporalGrid::OneHour, 10, 5);
        let mut series = vec![1.0; 20];
        series[15] = 50.0;
        let patterns = engine.detect(&series);
        let anomaly = patterns.iter().find(|p| p.tag == PatternTag::Anomaly).unwrap();
        assert!(anomaly.strength > 0.0);
    }
}
