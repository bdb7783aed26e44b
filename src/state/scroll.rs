/// Rounding slack, in pixels, tolerated when deciding whether the view sits at the bottom.
pub const BOTTOM_SLACK_PX: f64 = 1.0;

/// Geometry of the scrollable message container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self { scroll_top, scroll_height, client_height }
    }

    pub fn is_at_bottom(&self) -> bool {
        is_at_bottom(self.scroll_top, self.scroll_height, self.client_height)
    }

    pub fn is_at_top(&self) -> bool {
        self.scroll_top <= 0.0
    }
}

pub fn is_at_bottom(scroll_top: f64, scroll_height: f64, client_height: f64) -> bool {
    (scroll_height - client_height - scroll_top).abs() <= BOTTOM_SLACK_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_boundary_is_one_pixel() {
        assert!(ScrollMetrics::new(500.0, 1000.0, 500.0).is_at_bottom());
        assert!(ScrollMetrics::new(499.0, 1000.0, 500.0).is_at_bottom());
        assert!(!ScrollMetrics::new(498.0, 1000.0, 500.0).is_at_bottom());
    }

    #[test]
    fn top_detection() {
        assert!(ScrollMetrics::new(0.0, 1000.0, 500.0).is_at_top());
        assert!(!ScrollMetrics::new(3.0, 1000.0, 500.0).is_at_top());
    }
}
