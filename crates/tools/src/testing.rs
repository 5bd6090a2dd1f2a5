//! Test doubles shared by the handler unit tests.
//!
//! `StubEngine` approximates every geometry by its bounding box, which is
//! enough to exercise ordering, cardinality and failure policies without a
//! real geometry library.

use std::sync::Arc;

use geo_types::{coord, LineString, Polygon, Rect};

use map_analysis_core::{
    CoreError, CoreResult, FeatureSet, FieldType, FixedClock, Geometry, GeometryEngine,
    GeometryRecord, GeometryType, LinearUnit, SchemaField, Shape, SpatialReference, ToolContext,
};

#[derive(Debug, Clone, Default)]
pub struct StubEngine {
    failing_buffer_distances: Vec<f64>,
    failing_predicate_x: Option<f64>,
    failing_simplify: bool,
}

impl StubEngine {
    pub fn failing_buffer_at(mut self, distance: f64) -> Self {
        self.failing_buffer_distances.push(distance);
        self
    }

    /// Predicates fail when the second geometry's box starts at `x`.
    pub fn failing_predicate_at(mut self, x: f64) -> Self {
        self.failing_predicate_x = Some(x);
        self
    }

    pub fn failing_simplify(mut self) -> Self {
        self.failing_simplify = true;
        self
    }

    fn check_predicate(&self, b: &Geometry) -> CoreResult<()> {
        if let (Some(x), Some(rect)) = (self.failing_predicate_x, bbox(b)) {
            if rect.min().x == x {
                return Err(CoreError::geometry("predicate failed"));
            }
        }
        Ok(())
    }
}

pub fn bbox(geometry: &Geometry) -> Option<Rect<f64>> {
    let coords: Vec<(f64, f64)> = match &geometry.shape {
        Shape::Point(p) => vec![(p.x(), p.y())],
        Shape::Multipoint(mp) => mp.0.iter().map(|p| (p.x(), p.y())).collect(),
        Shape::Polyline(mls) => mls.0.iter().flat_map(|l| l.0.iter().map(|c| (c.x, c.y))).collect(),
        Shape::Polygon(mp) => mp
            .0
            .iter()
            .flat_map(|p| p.exterior().0.iter().map(|c| (c.x, c.y)))
            .collect(),
        Shape::Extent(r) => vec![(r.min().x, r.min().y), (r.max().x, r.max().y)],
    };
    let (first, rest) = coords.split_first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for (x, y) in rest {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    Some(Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    ))
}

fn overlap(a: &Rect<f64>, b: &Rect<f64>) -> Option<Rect<f64>> {
    let min_x = a.min().x.max(b.min().x);
    let min_y = a.min().y.max(b.min().y);
    let max_x = a.max().x.min(b.max().x);
    let max_y = a.max().y.min(b.max().y);
    if min_x <= max_x && min_y <= max_y {
        Some(Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: max_x, y: max_y },
        ))
    } else {
        None
    }
}

fn rect_polygon(rect: Rect<f64>, sr: SpatialReference) -> Geometry {
    Geometry::polygon(vec![rect.to_polygon()], sr)
}

fn grow(rect: Rect<f64>, d: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: rect.min().x - d, y: rect.min().y - d },
        coord! { x: rect.max().x + d, y: rect.max().y + d },
    )
}

fn boxes(a: &Geometry, b: &Geometry) -> CoreResult<(Rect<f64>, Rect<f64>)> {
    match (bbox(a), bbox(b)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(CoreError::geometry("empty geometry")),
    }
}

impl GeometryEngine for StubEngine {
    fn intersects(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.check_predicate(b)?;
        let (a, b) = boxes(a, b)?;
        Ok(overlap(&a, &b).is_some())
    }

    fn contains(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.check_predicate(b)?;
        let (a, b) = boxes(a, b)?;
        Ok(overlap(&a, &b) == Some(b))
    }

    fn within(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.contains(b, a)
    }

    fn overlaps(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.check_predicate(b)?;
        let (ra, rb) = boxes(a, b)?;
        Ok(overlap(&ra, &rb).map_or(false, |o| o != ra && o != rb))
    }

    fn touches(&self, _a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.check_predicate(b)?;
        Ok(false)
    }

    fn crosses(&self, _a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.check_predicate(b)?;
        Ok(false)
    }

    fn equals(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        Ok(a == b)
    }

    fn union(&self, geometries: &[Geometry]) -> CoreResult<Geometry> {
        let first = geometries
            .first()
            .ok_or_else(|| CoreError::geometry("nothing to union"))?;
        let mut acc = bbox(first).ok_or_else(|| CoreError::geometry("empty geometry"))?;
        for g in &geometries[1..] {
            if let Some(r) = bbox(g) {
                acc = Rect::new(
                    coord! { x: acc.min().x.min(r.min().x), y: acc.min().y.min(r.min().y) },
                    coord! { x: acc.max().x.max(r.max().x), y: acc.max().y.max(r.max().y) },
                );
            }
        }
        Ok(rect_polygon(acc, first.spatial_reference))
    }

    fn intersect(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        let (ra, rb) = boxes(a, b)?;
        Ok(overlap(&ra, &rb).map(|r| rect_polygon(r, a.spatial_reference)))
    }

    fn difference(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        let (ra, rb) = boxes(a, b)?;
        match overlap(&ra, &rb) {
            Some(o) if o == ra => Ok(None),
            _ => Ok(Some(a.clone())),
        }
    }

    fn convex_hull(&self, geometries: &[Geometry], merge: bool) -> CoreResult<Vec<Geometry>> {
        if merge {
            return Ok(vec![self.union(geometries)?]);
        }
        geometries
            .iter()
            .map(|g| self.union(std::slice::from_ref(g)))
            .collect()
    }

    fn planar_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(bbox(geometry).map_or(0.0, |r| r.width() * r.height()))
    }

    fn geodesic_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.planar_area(geometry)
    }

    fn planar_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(bbox(geometry).map_or(0.0, |r| 2.0 * (r.width() + r.height())))
    }

    fn geodesic_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.planar_length(geometry)
    }

    fn buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        if self.failing_buffer_distances.contains(&distance) {
            return Err(CoreError::geometry(format!("buffer {} failed", distance)));
        }
        let d = unit.to_meters(distance);
        Ok(geometries
            .iter()
            .filter_map(|g| bbox(g).map(|r| rect_polygon(grow(r, d), g.spatial_reference)))
            .collect())
    }

    fn geodesic_buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        self.buffer(geometries, distance, unit)
    }

    fn offset(&self, geometry: &Geometry, _: f64, _: LinearUnit) -> CoreResult<Geometry> {
        if geometry.geometry_type().is_point() {
            return Err(CoreError::geometry("cannot offset points"));
        }
        Ok(geometry.clone())
    }

    fn geodesic_offset(&self, geometry: &Geometry, d: f64, unit: LinearUnit) -> CoreResult<Geometry> {
        self.offset(geometry, d, unit)
    }

    fn densify(&self, geometry: &Geometry, _: f64, _: LinearUnit) -> CoreResult<Geometry> {
        Ok(geometry.clone())
    }

    fn geodesic_densify(&self, geometry: &Geometry, _: f64, _: LinearUnit) -> CoreResult<Geometry> {
        Ok(geometry.clone())
    }

    fn simplify(&self, geometry: &Geometry, _: f64) -> CoreResult<Geometry> {
        if self.failing_simplify {
            return Err(CoreError::geometry("simplify failed"));
        }
        Ok(geometry.clone())
    }

    fn cut(&self, geometry: &Geometry, cutter: &Geometry) -> CoreResult<Vec<Geometry>> {
        let (rg, rc) = boxes(geometry, cutter)?;
        if overlap(&rg, &rc).is_none() {
            return Ok(Vec::new());
        }
        let mid = (rg.min().x + rg.max().x) / 2.0;
        let left = Rect::new(rg.min(), coord! { x: mid, y: rg.max().y });
        let right = Rect::new(coord! { x: mid, y: rg.min().y }, rg.max());
        Ok(vec![
            rect_polygon(left, geometry.spatial_reference),
            rect_polygon(right, geometry.spatial_reference),
        ])
    }
}

pub fn context(engine: StubEngine) -> ToolContext {
    ToolContext::new("test-run", Arc::new(engine)).with_clock(Arc::new(FixedClock::at(9, 30)))
}

pub fn sr() -> SpatialReference {
    SpatialReference::web_mercator()
}

/// Point layer with a `name` attribute `p{i}`.
pub fn point_set(title: &str, points: &[(f64, f64)]) -> FeatureSet {
    let records = points
        .iter()
        .enumerate()
        .map(|(i, (x, y))| {
            GeometryRecord::with_geometry(Geometry::point(*x, *y, sr())).attr("name", format!("p{}", i))
        })
        .collect();
    FeatureSet::new(
        title,
        Some(GeometryType::Point),
        sr(),
        vec![
            SchemaField::new("OBJECTID", FieldType::Oid),
            SchemaField::new("name", FieldType::String),
        ],
        records,
    )
}

/// Axis-aligned square of the given size with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ]),
        vec![],
    )
}

/// Polygon layer of squares with a `zone` attribute `z{i}`.
pub fn square_set(title: &str, squares: &[(f64, f64, f64)]) -> FeatureSet {
    let records = squares
        .iter()
        .enumerate()
        .map(|(i, (x, y, size))| {
            GeometryRecord::with_geometry(Geometry::polygon(vec![square(*x, *y, *size)], sr()))
                .attr("zone", format!("z{}", i))
        })
        .collect();
    FeatureSet::new(
        title,
        Some(GeometryType::Polygon),
        sr(),
        vec![SchemaField::new("zone", FieldType::String)],
        records,
    )
}

/// Polyline layer of straight segments.
pub fn line_set(title: &str, lines: &[((f64, f64), (f64, f64))]) -> FeatureSet {
    let records = lines
        .iter()
        .map(|(a, b)| {
            GeometryRecord::with_geometry(Geometry::polyline(
                vec![LineString::from(vec![*a, *b])],
                sr(),
            ))
        })
        .collect();
    FeatureSet::new(title, Some(GeometryType::Polyline), sr(), vec![], records)
}
