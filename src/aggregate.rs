/// Screen coordinate chosen to receive the click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    pub x: f32,
    pub y: f32,
}

impl ClickPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// nearest whole pixel
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Reduces matched positions to one point: the median of all x and, independently,
/// the median of all y. None for an empty set.
pub fn aggregate(points: &[(f32, f32)]) -> Option<ClickPoint> {
    if points.is_empty() {
        return None;
    }
    let mut xs: Vec<f32> = points.iter().map(|p| p.0).collect();
    let mut ys: Vec<f32> = points.iter().map(|p| p.1).collect();
    Some(ClickPoint::new(median(&mut xs), median(&mut ys)))
}

/// Median of a non-empty slice; even lengths average the two middle values
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
