//! Polygonal selections in (ToF, Energy) space and their file line codec.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tofe_core::{DetectionType, Element};

/// Bounding box of a selection, used for cheap containment rejection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxesLimits {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl AxesLimits {
    /// Computes the bounding box of `points`; `None` when empty.
    #[must_use]
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let first = points.first()?;
        let mut limits = Self {
            x_min: first.0,
            x_max: first.0,
            y_min: first.1,
            y_max: first.1,
        };
        for &(x, y) in &points[1..] {
            limits.x_min = limits.x_min.min(x);
            limits.x_max = limits.x_max.max(x);
            limits.y_min = limits.y_min.min(y);
            limits.y_max = limits.y_max.max(y);
        }
        Some(limits)
    }

    /// Whether `(x, y)` lies inside the box (borders included).
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Even-odd ray-crossing test against a closed polygon.
///
/// Points exactly on an edge may fall on either side; selections are drawn
/// coarsely enough that this never matters in practice.
#[must_use]
pub fn point_inside_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Failure to parse a selection file line.
#[derive(Debug, thiserror::Error)]
#[error("bad selection line ({reason}): {line}")]
pub struct SelectionParseError {
    pub line: String,
    pub reason: String,
}

/// Field separator of the selections file format.
const FIELD_SEP: &str = "    ";

/// A named polygonal region selecting events of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// ERD (recoil) or RBS (scattered beam) events.
    pub kind: DetectionType,
    /// Recoil element the selection collects.
    pub element: Element,
    /// Scattering target element, RBS selections only.
    pub scatter: Option<Element>,
    /// Statistical weight applied in later analysis.
    pub weight_factor: f64,
    /// Display color name.
    pub color: String,
    /// Polygon vertices in (ToF channel, energy channel) space.
    pub points: Vec<(f64, f64)>,
    /// A selection only catches events once its polygon is closed.
    pub closed: bool,
    limits: Option<AxesLimits>,
}

impl Selection {
    /// Creates a closed selection over `points`.
    #[must_use]
    pub fn new(
        kind: DetectionType,
        element: Element,
        scatter: Option<Element>,
        weight_factor: f64,
        color: impl Into<String>,
        points: Vec<(f64, f64)>,
    ) -> Self {
        let limits = AxesLimits::from_points(&points);
        Self {
            kind,
            element,
            scatter,
            weight_factor,
            color: color.into(),
            points,
            closed: true,
            limits,
        }
    }

    /// Appends a vertex to an open selection.
    pub fn add_point(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
        self.limits = AxesLimits::from_points(&self.points);
    }

    /// Cached bounding box of the polygon.
    #[must_use]
    pub fn limits(&self) -> Option<AxesLimits> {
        self.limits
    }

    /// Whether the event channel pair lies inside the selection.
    ///
    /// Open selections and polygons with fewer than three vertices catch
    /// nothing. The bounding box rejects most events before the polygon
    /// test runs.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.closed {
            return false;
        }
        match self.limits {
            Some(limits) if limits.contains(x, y) => point_inside_polygon(x, y, &self.points),
            _ => false,
        }
    }

    /// Cut-file suffix: `ERD`, or `RBS_<scatter>` for RBS selections.
    #[must_use]
    pub fn suffix(&self) -> String {
        match (self.kind, &self.scatter) {
            (DetectionType::Rbs, Some(scatter)) => format!("RBS_{scatter}"),
            (DetectionType::Rbs, None) => "RBS".to_string(),
            (DetectionType::Erd, _) => "ERD".to_string(),
        }
    }

    /// Serializes to one selections-file line.
    ///
    /// Format: type, symbol, isotope, weight factor, scatter, color and
    /// the vertex lists, four-space separated, with the vertices as
    /// `X1,X2,...;Y1,Y2,...`.
    #[must_use]
    pub fn to_line(&self) -> String {
        let isotope = self
            .element
            .isotope
            .map_or(String::new(), |n| n.to_string());
        let scatter = self
            .scatter
            .as_ref()
            .map_or(String::new(), ToString::to_string);
        let xs: Vec<String> = self.points.iter().map(|p| p.0.to_string()).collect();
        let ys: Vec<String> = self.points.iter().map(|p| p.1.to_string()).collect();
        [
            self.kind.as_str().to_string(),
            self.element.symbol.clone(),
            isotope,
            self.weight_factor.to_string(),
            scatter,
            self.color.clone(),
            format!("{};{}", xs.join(","), ys.join(",")),
        ]
        .join(FIELD_SEP)
    }

    /// Parses one selections-file line.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionParseError`] for a wrong field count or any
    /// unparseable field.
    pub fn from_line(line: &str) -> Result<Self, SelectionParseError> {
        let err = |reason: &str| SelectionParseError {
            line: line.to_string(),
            reason: reason.to_string(),
        };
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FIELD_SEP).collect();
        if fields.len() != 7 {
            return Err(err("expected 7 fields"));
        }
        let kind = DetectionType::parse(fields[0]).ok_or_else(|| err("unknown type"))?;
        let isotope = if fields[2].is_empty() {
            None
        } else {
            Some(fields[2].parse().map_err(|_| err("bad isotope"))?)
        };
        let element = Element {
            symbol: fields[1].to_string(),
            isotope,
        };
        let weight_factor = fields[3].parse().map_err(|_| err("bad weight factor"))?;
        let scatter = if fields[4].is_empty() {
            None
        } else {
            Some(Element::from_string(fields[4]).map_err(|_| err("bad scatter element"))?)
        };
        let (xs, ys) = fields[6]
            .split_once(';')
            .ok_or_else(|| err("missing vertex separator"))?;
        let xs: Vec<f64> = xs
            .split(',')
            .map(|v| v.parse().map_err(|_| err("bad x vertex")))
            .collect::<Result<_, _>>()?;
        let ys: Vec<f64> = ys
            .split(',')
            .map(|v| v.parse().map_err(|_| err("bad y vertex")))
            .collect::<Result<_, _>>()?;
        if xs.len() != ys.len() {
            return Err(err("vertex list length mismatch"));
        }
        let points = xs.into_iter().zip(ys).collect();
        Ok(Self::new(
            kind,
            element,
            scatter,
            weight_factor,
            fields[5],
            points,
        ))
    }
}
