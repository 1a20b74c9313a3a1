//! Life K-Line Chart Geometry
//!
//! Turns a series of [`KLinePoint`]s into what the chart draws: candle bodies,
//! wicks, da-yun reference lines and the peak marker. The canvas component in
//! the dashboard and the terminal renderer both go through [`ChartLayout`].

use crate::models::KLinePoint;

/// Body fill / wick colours for rising (吉) and falling (凶) years
pub const UP_FILL: &str = "#22c55e";
pub const UP_STROKE: &str = "#15803d";
pub const DOWN_FILL: &str = "#ef4444";
pub const DOWN_STROKE: &str = "#b91c1c";

/// Y domain upper bound when there is no data
pub const EMPTY_MAX_HIGH: f64 = 100.0;

/// Minimum rendered body height in pixels, so flat years stay visible
pub const MIN_BODY_HEIGHT: f64 = 2.0;

/// Ages are labelled on every Nth candle
pub const AGE_LABEL_EVERY: usize = 10;

/// A year counts as rising when it closes at or above its open
pub fn is_up(point: &KLinePoint) -> bool {
    point.close >= point.open
}

/// Candle body extent: `(min(open, close), max(open, close))`
pub fn body_range(point: &KLinePoint) -> (f64, f64) {
    (point.open.min(point.close), point.open.max(point.close))
}

/// Start of a da-yun segment on the chart
#[derive(Debug, Clone, PartialEq)]
pub struct DaYunMarker {
    pub index: usize,
    pub age: u32,
    pub label: String,
}

/// The first point plus every point whose da-yun differs from the previous one
pub fn da_yun_changes(points: &[KLinePoint]) -> Vec<DaYunMarker> {
    points
        .iter()
        .enumerate()
        .filter(|(i, p)| *i == 0 || p.da_yun != points[i - 1].da_yun)
        .map(|(index, p)| DaYunMarker {
            index,
            age: p.age,
            label: p.da_yun.clone().unwrap_or_default(),
        })
        .collect()
}

/// Highest `high` in the series, [`EMPTY_MAX_HIGH`] when empty
pub fn max_high(points: &[KLinePoint]) -> f64 {
    if points.is_empty() {
        return EMPTY_MAX_HIGH;
    }
    points.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max)
}

/// Indices of the candles that reach the series' maximum high
pub fn peak_indices(points: &[KLinePoint]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    let peak = max_high(points);
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.high == peak)
        .map(|(i, _)| i)
        .collect()
}

/// Round `value` up to a readable axis bound (multiples of 1, 2 or 5 × 10ⁿ
/// over roughly five ticks)
pub fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 10.0;
    }
    let raw_step = value / 5.0;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let step = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    } * magnitude;
    (value / step).ceil() * step
}

/// Pixel padding around the plot area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 30.0,
            right: 10.0,
            bottom: 30.0,
            left: 44.0,
        }
    }
}

/// Pixel geometry of a single candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub center_x: f64,
    pub body_x: f64,
    pub body_width: f64,
    pub body_top: f64,
    pub body_height: f64,
    pub wick_top: f64,
    pub wick_bottom: f64,
    pub up: bool,
}

impl Candle {
    pub fn fill(&self) -> &'static str {
        if self.up {
            UP_FILL
        } else {
            DOWN_FILL
        }
    }

    pub fn stroke(&self) -> &'static str {
        if self.up {
            UP_STROKE
        } else {
            DOWN_STROKE
        }
    }
}

/// Maps chart values onto a `width` × `height` drawing surface
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    /// Y domain is `[0, y_max]`
    pub y_max: f64,
    pub count: usize,
}

impl ChartLayout {
    pub fn new(width: f64, height: f64, points: &[KLinePoint]) -> Self {
        Self::with_margins(width, height, Margins::default(), points)
    }

    pub fn with_margins(width: f64, height: f64, margins: Margins, points: &[KLinePoint]) -> Self {
        let top_value = points
            .iter()
            .map(|p| p.high.max(p.open).max(p.close))
            .fold(max_high(points), f64::max);

        Self {
            width,
            height,
            margins,
            y_max: nice_ceiling(top_value),
            count: points.len(),
        }
    }

    pub fn plot_width(&self) -> f64 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.height - self.margins.top - self.margins.bottom).max(0.0)
    }

    /// Horizontal band reserved for each candle
    pub fn slot_width(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.plot_width() / self.count as f64
    }

    pub fn x_center(&self, index: usize) -> f64 {
        self.margins.left + (index as f64 + 0.5) * self.slot_width()
    }

    /// Pixel y for a value (canvas y grows downward)
    pub fn y(&self, value: f64) -> f64 {
        let clamped = value.clamp(0.0, self.y_max);
        self.margins.top + (1.0 - clamped / self.y_max) * self.plot_height()
    }

    pub fn candle(&self, index: usize, point: &KLinePoint) -> Candle {
        let slot = self.slot_width();
        let body_width = (slot * 0.8).max(1.0);
        let center_x = self.x_center(index);
        let (low_body, high_body) = body_range(point);

        let body_top = self.y(high_body);
        let body_bottom = self.y(low_body);

        Candle {
            center_x,
            body_x: center_x - body_width / 2.0,
            body_width,
            body_top,
            body_height: (body_bottom - body_top).max(MIN_BODY_HEIGHT),
            wick_top: self.y(point.high),
            wick_bottom: self.y(point.low),
            up: is_up(point),
        }
    }

    /// Evenly spaced y-axis values from 0 to `y_max`
    pub fn y_ticks(&self, intervals: usize) -> Vec<f64> {
        let intervals = intervals.max(1);
        (0..=intervals)
            .map(|i| self.y_max * i as f64 / intervals as f64)
            .collect()
    }

    /// `(x, age)` for every labelled candle
    pub fn age_labels(&self, points: &[KLinePoint]) -> Vec<(f64, u32)> {
        points
            .iter()
            .enumerate()
            .filter(|(i, _)| i % AGE_LABEL_EVERY == 0)
            .map(|(i, p)| (self.x_center(i), p.age))
            .collect()
    }

    /// Candle under a horizontal pixel position, for tooltips
    pub fn index_at(&self, x: f64) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let offset = x - self.margins.left;
        if offset < 0.0 || offset >= self.plot_width() {
            return None;
        }
        let index = (offset / self.slot_width()) as usize;
        Some(index.min(self.count - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(age: u32, da_yun: Option<&str>, open: f64, close: f64, high: f64, low: f64) -> KLinePoint {
        KLinePoint {
            age,
            year: 1990 + age as i32,
            gan_zhi: "甲子".to_string(),
            da_yun: da_yun.map(str::to_string),
            open,
            close,
            high,
            low,
            score: close,
            reason: String::new(),
        }
    }

    fn series() -> Vec<KLinePoint> {
        vec![
            point(1, Some("童限"), 50.0, 55.0, 60.0, 45.0),
            point(2, Some("童限"), 55.0, 52.0, 58.0, 50.0),
            point(3, Some("辛酉"), 52.0, 70.0, 75.0, 51.0),
            point(4, Some("辛酉"), 70.0, 66.0, 75.0, 60.0),
            point(5, None, 66.0, 66.0, 68.0, 64.0),
        ]
    }

    #[test]
    fn test_body_range_and_direction() {
        let pts = series();
        assert_eq!(body_range(&pts[0]), (50.0, 55.0));
        assert_eq!(body_range(&pts[1]), (52.0, 55.0));
        assert!(is_up(&pts[0]));
        assert!(!is_up(&pts[1]));
        // Flat year counts as rising
        assert!(is_up(&pts[4]));
    }

    #[test]
    fn test_da_yun_changes() {
        let markers = da_yun_changes(&series());
        let ages: Vec<u32> = markers.iter().map(|m| m.age).collect();
        assert_eq!(ages, vec![1, 3, 5]);
        assert_eq!(markers[1].label, "辛酉");
        assert_eq!(markers[2].label, "");
        assert!(da_yun_changes(&[]).is_empty());
    }

    #[test]
    fn test_peak_detection() {
        let pts = series();
        assert_eq!(max_high(&pts), 75.0);
        assert_eq!(peak_indices(&pts), vec![2, 3]);
        assert_eq!(max_high(&[]), EMPTY_MAX_HIGH);
        assert!(peak_indices(&[]).is_empty());
    }

    #[test]
    fn test_nice_ceiling() {
        assert_eq!(nice_ceiling(60.0), 60.0);
        assert_eq!(nice_ceiling(75.0), 80.0);
        assert_eq!(nice_ceiling(87.0), 100.0);
        assert_eq!(nice_ceiling(100.0), 100.0);
        assert_eq!(nice_ceiling(0.0), 10.0);
    }

    #[test]
    fn test_layout_maps_values() {
        let pts = series();
        let layout = ChartLayout::with_margins(
            540.0,
            200.0,
            Margins { top: 20.0, right: 20.0, bottom: 20.0, left: 20.0 },
            &pts,
        );
        assert_eq!(layout.y_max, 80.0);
        assert_eq!(layout.slot_width(), 100.0);
        assert_eq!(layout.y(80.0), 20.0);
        assert_eq!(layout.y(0.0), 180.0);
        assert_eq!(layout.y(40.0), 100.0);

        let candle = layout.candle(2, &pts[2]);
        assert_eq!(candle.center_x, 270.0);
        assert_eq!(candle.body_width, 80.0);
        assert!(candle.up);
        assert_eq!(candle.fill(), UP_FILL);
        assert!(candle.wick_top < candle.body_top);
        assert!(candle.wick_bottom > candle.body_top + candle.body_height);

        // Flat body keeps a minimum height
        assert_eq!(layout.candle(4, &pts[4]).body_height, MIN_BODY_HEIGHT);
    }

    #[test]
    fn test_hit_testing_and_labels() {
        let pts = series();
        let layout = ChartLayout::with_margins(
            540.0,
            200.0,
            Margins { top: 20.0, right: 20.0, bottom: 20.0, left: 20.0 },
            &pts,
        );
        assert_eq!(layout.index_at(10.0), None);
        assert_eq!(layout.index_at(25.0), Some(0));
        assert_eq!(layout.index_at(519.0), Some(4));
        assert_eq!(layout.index_at(521.0), None);

        assert_eq!(layout.age_labels(&pts), vec![(70.0, 1)]);
        assert_eq!(layout.y_ticks(4), vec![0.0, 20.0, 40.0, 60.0, 80.0]);
    }
}
