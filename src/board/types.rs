//! Board domain objects built by the board parser
//!
//! All lengths are in IU. Optional fields are `None` when absent from the
//! file and are not written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::{Outline, Point, PolygonSet};

/// Position with an optional rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct At {
    pub x: i64,
    pub y: i64,
    pub angle: f64,
}

impl At {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y, angle: 0.0 }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TitleBlock {
    pub title: Option<String>,
    pub date: Option<String>,
    pub rev: Option<String>,
    pub company: Option<String>,
    pub comments: BTreeMap<u8, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub ordinal: i64,
    pub canonical_name: String,
    pub layer_type: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub code: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: i64,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Line { start: Point, end: Point },
    Rect { start: Point, end: Point },
    Circle { center: Point, end: Point },
    Arc { start: Point, mid: Point, end: Point },
    Poly { outline: Outline },
}

impl Shape {
    /// Keyword suffix shared by `gr_*` and `fp_*` forms
    pub fn suffix(&self) -> &'static str {
        match self {
            Shape::Line { .. } => "line",
            Shape::Rect { .. } => "rect",
            Shape::Circle { .. } => "circle",
            Shape::Arc { .. } => "arc",
            Shape::Poly { .. } => "poly",
        }
    }
}

/// A graphic item on the board (`gr_*`) or inside a footprint (`fp_*`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub shape: Shape,
    pub stroke: Option<Stroke>,
    pub fill: Option<String>,
    pub layer: String,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
    pub at: Option<At>,
    pub layer: Option<String>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drill {
    pub oval: bool,
    pub width: i64,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub number: String,
    pub pad_type: String,
    pub shape: String,
    pub at: At,
    pub size: (i64, i64),
    pub drill: Option<Drill>,
    pub layers: Vec<String>,
    pub roundrect_rratio: Option<f64>,
    pub net: Option<Net>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub lib_id: String,
    pub layer: String,
    pub uuid: Option<String>,
    pub at: At,
    pub attr: Vec<String>,
    pub properties: Vec<Property>,
    pub drawings: Vec<Drawing>,
    pub pads: Vec<Pad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFill {
    pub layer: String,
    /// Stored fractured, one hole-free outline per island
    pub polygons: PolygonSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub net: i64,
    pub net_name: String,
    pub layers: Vec<String>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub priority: Option<i64>,
    pub min_thickness: Option<i64>,
    pub outline: PolygonSet,
    pub fills: Vec<ZoneFill>,
}

impl Zone {
    /// Store `filled` for `layer`, fracturing it the way fills are kept on disk
    pub fn set_fill(&mut self, layer: &str, filled: &PolygonSet) -> Result<(), GeometryError> {
        let polygons = filled.fracture()?;
        self.fills.retain(|f| f.layer != layer);
        self.fills.push(ZoneFill { layer: layer.to_string(), polygons });
        Ok(())
    }

    /// Fill of `layer` with holes restored
    pub fn fill_with_holes(&self, layer: &str) -> Option<PolygonSet> {
        self.fills
            .iter()
            .find(|f| f.layer == layer)
            .map(|f| f.polygons.unfracture())
    }

    pub fn filled_area(&self) -> f64 {
        self.fills.iter().map(|f| f.polygons.area()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub version: i64,
    pub generator: Option<String>,
    pub generator_version: Option<String>,
    pub thickness: Option<i64>,
    pub paper: Option<String>,
    pub title_block: Option<TitleBlock>,
    pub layers: Vec<Layer>,
    pub nets: Vec<Net>,
    pub footprints: Vec<Footprint>,
    pub drawings: Vec<Drawing>,
    pub zones: Vec<Zone>,
}

impl Board {
    pub fn new(version: i64) -> Self {
        Self {
            version,
            generator: None,
            generator_version: None,
            thickness: None,
            paper: None,
            title_block: None,
            layers: Vec::new(),
            nets: Vec::new(),
            footprints: Vec::new(),
            drawings: Vec::new(),
            zones: Vec::new(),
        }
    }

    pub fn net_by_code(&self, code: i64) -> Option<&Net> {
        self.nets.iter().find(|n| n.code == code)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.canonical_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    #[test]
    fn test_zone_fill_is_fractured_and_restorable() {
        let outline = Outline::rectangle(Point::new(0, 0), Point::new(100, 100));
        let hole = Outline::rectangle(Point::new(25, 25), Point::new(75, 75)).reversed();
        let filled = PolygonSet::from_polygons(vec![Polygon::with_holes(outline.clone(), vec![hole])]);

        let mut zone = Zone {
            net: 1,
            net_name: "GND".into(),
            layers: vec!["F.Cu".into()],
            uuid: None,
            name: None,
            priority: None,
            min_thickness: None,
            outline: PolygonSet::from_outline(outline),
            fills: Vec::new(),
        };
        zone.set_fill("F.Cu", &filled).unwrap();
        assert_eq!(zone.fills[0].polygons.hole_count(), 0);
        assert_eq!(zone.filled_area(), 7500.0);
        assert_eq!(zone.fill_with_holes("F.Cu"), Some(filled.normalized()));
        assert_eq!(zone.fill_with_holes("B.Cu"), None);
    }
}
