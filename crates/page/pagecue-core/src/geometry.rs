//! Rectangles, viewport and root-margin math used by the intersection tracker.
//!
//! All coordinates are document space in CSS pixels. The viewport is the
//! visible window onto the document; the root margin grows or shrinks it
//! before intersection is computed, mirroring how hosts apply `rootMargin`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CueError, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rectangles. Edge-adjacent rectangles produce a
    /// zero-area overlap rather than `None`.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// The visible window onto the document.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Viewport rectangle in document space.
    pub fn rect(&self) -> Rect {
        Rect::new(self.scroll_x, self.scroll_y, self.width, self.height)
    }

    pub fn scrolled_to(mut self, x: f64, y: f64) -> Self {
        self.scroll_x = x;
        self.scroll_y = y;
        self
    }
}

/// One side of a root margin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Length {
    fn resolve(&self, basis: f64) -> f64 {
        match *self {
            Length::Px(v) => v,
            Length::Percent(p) => basis * p / 100.0,
        }
    }

    fn parse(token: &str, input: &str) -> Result<Length> {
        let (number, percent) = if let Some(n) = token.strip_suffix("px") {
            (n, false)
        } else if let Some(n) = token.strip_suffix('%') {
            (n, true)
        } else if token.parse::<f64>().map(|v| v == 0.0).unwrap_or(false) {
            // unitless zero is the only unitless length CSS accepts
            (token, false)
        } else {
            return Err(CueError::root_margin(
                input,
                format!("`{token}` must be in px or %"),
            ));
        };
        let value: f64 = number
            .parse()
            .map_err(|_| CueError::root_margin(input, format!("`{token}` is not a number")))?;
        if !value.is_finite() {
            return Err(CueError::root_margin(input, "non-finite length"));
        }
        Ok(if percent {
            Length::Percent(value)
        } else {
            Length::Px(value)
        })
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{v}px"),
            Length::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// CSS margin shorthand applied to the viewport before intersection.
/// Positive values grow the root, negative values shrink it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin {
        top: Length::Px(0.0),
        right: Length::Px(0.0),
        bottom: Length::Px(0.0),
        left: Length::Px(0.0),
    };

    /// Grow `root` by this margin. Percentages resolve against the root's
    /// height for top/bottom and its width for left/right.
    pub fn expand(&self, root: Rect) -> Rect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);
        Rect::new(
            root.x - left,
            root.y - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

impl FromStr for RootMargin {
    type Err = CueError;

    fn from_str(input: &str) -> Result<Self> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let lengths = tokens
            .iter()
            .map(|t| Length::parse(t, input))
            .collect::<Result<Vec<_>>>()?;
        let (top, right, bottom, left) = match lengths.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => {
                return Err(CueError::root_margin(
                    input,
                    "expected one to four lengths",
                ))
            }
        };
        Ok(RootMargin {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl TryFrom<String> for RootMargin {
    type Error = CueError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RootMargin> for String {
    fn from(m: RootMargin) -> Self {
        m.to_string()
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// Fraction of `target` visible inside `root`, in [0, 1].
///
/// Returns `None` when the two do not touch at all. A zero-area target that
/// touches the root counts as fully visible.
pub fn intersection_ratio(target: Rect, root: Rect) -> Option<f64> {
    let overlap = target.intersection(&root)?;
    let area = target.area();
    if area <= 0.0 {
        return Some(1.0);
    }
    Some((overlap.area() / area).clamp(0.0, 1.0))
}

/// True when `target` lies entirely inside the viewport.
pub fn is_in_viewport(target: Rect, viewport: &Viewport) -> bool {
    let rel = target.translate(-viewport.scroll_x, -viewport.scroll_y);
    rel.top() >= 0.0
        && rel.left() >= 0.0
        && rel.bottom() <= viewport.height
        && rel.right() <= viewport.width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_margin_shorthand() {
        let m: RootMargin = "0px".parse().unwrap();
        assert_eq!(m, RootMargin::ZERO);

        let m: RootMargin = "10px 5%".parse().unwrap();
        assert_eq!(m.top, Length::Px(10.0));
        assert_eq!(m.right, Length::Percent(5.0));
        assert_eq!(m.bottom, Length::Px(10.0));
        assert_eq!(m.left, Length::Percent(5.0));

        let m: RootMargin = "1px 2px 3px".parse().unwrap();
        assert_eq!(m.left, Length::Px(2.0));
        assert_eq!(m.bottom, Length::Px(3.0));

        assert!("0".parse::<RootMargin>().is_ok());
        assert!("10".parse::<RootMargin>().is_err());
        assert!("".parse::<RootMargin>().is_err());
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
        assert!("abcpx".parse::<RootMargin>().is_err());
    }

    #[test]
    fn margin_round_trips_through_serde() {
        let m: RootMargin = serde_json::from_str("\"-20px 0px\"").unwrap();
        assert_eq!(m.top, Length::Px(-20.0));
        let s = serde_json::to_string(&m).unwrap();
        assert_eq!(s, "\"-20px 0px -20px 0px\"");
        assert!(serde_json::from_str::<RootMargin>("\"wide\"").is_err());
    }

    #[test]
    fn negative_margin_shrinks_root() {
        let m: RootMargin = "-50px 0px".parse().unwrap();
        let r = m.expand(Rect::new(0.0, 0.0, 100.0, 400.0));
        assert_eq!(r, Rect::new(0.0, 50.0, 100.0, 300.0));

        let m: RootMargin = "10%".parse().unwrap();
        let r = m.expand(Rect::new(0.0, 0.0, 100.0, 200.0));
        assert_eq!(r, Rect::new(-10.0, -20.0, 120.0, 240.0));
    }

    #[test]
    fn ratio_of_partial_overlap() {
        let root = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(intersection_ratio(Rect::new(0.0, 50.0, 100.0, 100.0), root), Some(0.5));
        assert_eq!(intersection_ratio(Rect::new(0.0, 0.0, 10.0, 10.0), root), Some(1.0));
        assert_eq!(intersection_ratio(Rect::new(0.0, 300.0, 10.0, 10.0), root), None);
        // edge-adjacent touches with zero visible area
        assert_eq!(intersection_ratio(Rect::new(0.0, 100.0, 10.0, 10.0), root), Some(0.0));
        // zero-area target inside the root
        assert_eq!(intersection_ratio(Rect::new(5.0, 5.0, 0.0, 0.0), root), Some(1.0));
    }

    #[test]
    fn viewport_containment() {
        let vp = Viewport::new(100.0, 100.0).scrolled_to(0.0, 200.0);
        assert!(is_in_viewport(Rect::new(0.0, 210.0, 50.0, 50.0), &vp));
        assert!(!is_in_viewport(Rect::new(0.0, 190.0, 50.0, 50.0), &vp));
        assert!(!is_in_viewport(Rect::new(60.0, 210.0, 50.0, 50.0), &vp));
    }
}
