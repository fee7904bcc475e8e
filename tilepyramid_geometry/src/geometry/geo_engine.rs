//! [`GeometryEngine`] implementation backed by the `geo` crate.
//!
//! * simplification uses Ramer-Douglas-Peucker ([`geo::Simplify`]); points are left alone,
//! * polygons are clipped with [`geo::BooleanOps::intersection`], lines with
//!   [`geo::BooleanOps::clip`] against the envelope's polygon,
//! * polygons are triangulated with earcut ([`geo::TriangulateEarcut`]).

use super::{Geometry, GeometryEngine, geometry_envelope};
use crate::{MAX_ITEM_VERTICES, TileGeometryType, VectorTileItem};
use anyhow::{Result, ensure};
use geo::{
	BooleanOps, Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect,
	Simplify, TriangulateEarcut,
};
use tilepyramid_core::Envelope;

/// The default geometry engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeoEngine;

/// A ring needs at least three distinct corners plus the closing coordinate.
fn is_valid_ring(ring: &LineString<f64>) -> bool {
	ring.0.len() >= 4
}

/// Drops degenerate rings: polygons without a valid exterior disappear, invalid holes are removed.
fn retain_valid_polygons(polygons: impl IntoIterator<Item = Polygon<f64>>) -> MultiPolygon<f64> {
	MultiPolygon::new(
		polygons
			.into_iter()
			.filter(|p| is_valid_ring(p.exterior()))
			.map(|p| {
				let (exterior, interiors) = p.into_inner();
				Polygon::new(exterior, interiors.into_iter().filter(is_valid_ring).collect())
			})
			.collect(),
	)
}

fn retain_valid_lines(lines: MultiLineString<f64>) -> Option<Geometry> {
	let lines: Vec<LineString<f64>> = lines.into_iter().filter(|l| l.0.len() >= 2).collect();
	(!lines.is_empty()).then(|| Geometry::MultiLineString(MultiLineString::new(lines)))
}

fn non_empty_polygons(polygons: MultiPolygon<f64>) -> Option<Geometry> {
	let polygons = retain_valid_polygons(polygons);
	(!polygons.0.is_empty()).then_some(Geometry::MultiPolygon(polygons))
}

fn to_local(coord: &Coord<f64>, origin: [f64; 2]) -> [f32; 2] {
	[(coord.x - origin[0]) as f32, (coord.y - origin[1]) as f32]
}

fn push_points(feature_id: i64, coords: &[Coord<f64>], origin: [f64; 2], items: &mut Vec<VectorTileItem>) {
	for chunk in coords.chunks(MAX_ITEM_VERTICES) {
		let vertices = chunk.iter().map(|c| to_local(c, origin)).collect();
		items.push(VectorTileItem::new(feature_id, TileGeometryType::Point, vertices));
	}
}

/// Lines longer than an item allows are split into chunks sharing their boundary vertex.
fn push_line(feature_id: i64, coords: &[Coord<f64>], origin: [f64; 2], items: &mut Vec<VectorTileItem>) {
	if coords.len() < 2 {
		return;
	}
	let mut start = 0;
	loop {
		let end = (start + MAX_ITEM_VERTICES).min(coords.len());
		let vertices = coords[start..end].iter().map(|c| to_local(c, origin)).collect();
		items.push(VectorTileItem::new(feature_id, TileGeometryType::Line, vertices));
		if end == coords.len() {
			break;
		}
		start = end - 1;
	}
}

fn push_polygon(
	feature_id: i64,
	polygon: &Polygon<f64>,
	origin: [f64; 2],
	items: &mut Vec<VectorTileItem>,
) -> Result<()> {
	if !is_valid_ring(polygon.exterior()) {
		return Ok(());
	}
	let vertex_count = polygon.exterior().0.len() + polygon.interiors().iter().map(|r| r.0.len()).sum::<usize>();
	ensure!(
		vertex_count <= MAX_ITEM_VERTICES,
		"polygon of feature {feature_id} has {vertex_count} vertices, at most {MAX_ITEM_VERTICES} fit into a tile item"
	);
	let triangulation = polygon.earcut_triangles_raw();
	if triangulation.triangle_indices.is_empty() {
		return Ok(());
	}
	let vertices = triangulation
		.vertices
		.chunks_exact(2)
		.map(|xy| to_local(&Coord { x: xy[0], y: xy[1] }, origin))
		.collect();
	let indices = triangulation.triangle_indices.iter().map(|i| *i as u16).collect();
	items.push(VectorTileItem::new(feature_id, TileGeometryType::Polygon, vertices).with_indices(indices));
	Ok(())
}

impl GeometryEngine for GeoEngine {
	fn simplify(&self, geometry: &Geometry, tolerance: f64) -> Geometry {
		if tolerance.is_nan() || tolerance <= 0.0 {
			return geometry.clone();
		}
		match geometry {
			Geometry::LineString(line) => Geometry::LineString(line.simplify(tolerance)),
			Geometry::MultiLineString(lines) => Geometry::MultiLineString(lines.simplify(tolerance)),
			Geometry::Polygon(polygon) => Geometry::MultiPolygon(retain_valid_polygons([polygon.simplify(tolerance)])),
			Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(retain_valid_polygons(polygons.simplify(tolerance))),
			Geometry::Rect(rect) => self.simplify(&Geometry::Polygon(rect.to_polygon()), tolerance),
			Geometry::Triangle(triangle) => self.simplify(&Geometry::Polygon(triangle.to_polygon()), tolerance),
			Geometry::GeometryCollection(collection) => Geometry::GeometryCollection(GeometryCollection::new_from(
				collection.iter().map(|g| self.simplify(g, tolerance)).collect(),
			)),
			Geometry::Point(_) | Geometry::MultiPoint(_) | Geometry::Line(_) => geometry.clone(),
		}
	}

	fn clip(&self, geometry: &Geometry, envelope: &Envelope) -> Option<Geometry> {
		let bounds = geometry_envelope(geometry)?;
		if !bounds.intersects(envelope) {
			return None;
		}
		if envelope.contains(&bounds) {
			return Some(geometry.clone());
		}

		let rect = Rect::new(
			Coord {
				x: envelope.min_x,
				y: envelope.min_y,
			},
			Coord {
				x: envelope.max_x,
				y: envelope.max_y,
			},
		)
		.to_polygon();

		match geometry {
			Geometry::Point(point) => envelope
				.contains_point(point.x(), point.y())
				.then_some(Geometry::Point(*point)),
			Geometry::MultiPoint(points) => {
				let inside: Vec<Point<f64>> = points
					.iter()
					.filter(|p| envelope.contains_point(p.x(), p.y()))
					.copied()
					.collect();
				(!inside.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(inside)))
			}
			Geometry::Line(line) => retain_valid_lines(rect.clip(
				&MultiLineString::new(vec![LineString::new(vec![line.start, line.end])]),
				false,
			)),
			Geometry::LineString(line) => retain_valid_lines(rect.clip(&MultiLineString::new(vec![line.clone()]), false)),
			Geometry::MultiLineString(lines) => retain_valid_lines(rect.clip(lines, false)),
			Geometry::Polygon(polygon) => non_empty_polygons(polygon.intersection(&rect)),
			Geometry::MultiPolygon(polygons) => non_empty_polygons(polygons.intersection(&rect)),
			Geometry::Rect(r) => non_empty_polygons(r.to_polygon().intersection(&rect)),
			Geometry::Triangle(triangle) => non_empty_polygons(triangle.to_polygon().intersection(&rect)),
			Geometry::GeometryCollection(collection) => {
				let parts: Vec<Geometry> = collection.iter().filter_map(|g| self.clip(g, envelope)).collect();
				(!parts.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection::new_from(parts)))
			}
		}
	}

	fn fill_tile_items(
		&self,
		feature_id: i64,
		geometry: &Geometry,
		origin: [f64; 2],
		items: &mut Vec<VectorTileItem>,
	) -> Result<()> {
		match geometry {
			Geometry::Point(point) => push_points(feature_id, &[point.0], origin, items),
			Geometry::MultiPoint(points) => {
				let coords: Vec<Coord<f64>> = points.iter().map(|p| p.0).collect();
				push_points(feature_id, &coords, origin, items);
			}
			Geometry::Line(line) => push_line(feature_id, &[line.start, line.end], origin, items),
			Geometry::LineString(line) => push_line(feature_id, &line.0, origin, items),
			Geometry::MultiLineString(lines) => {
				for line in lines {
					push_line(feature_id, &line.0, origin, items);
				}
			}
			Geometry::Polygon(polygon) => push_polygon(feature_id, polygon, origin, items)?,
			Geometry::MultiPolygon(polygons) => {
				for polygon in polygons {
					push_polygon(feature_id, polygon, origin, items)?;
				}
			}
			Geometry::Rect(rect) => push_polygon(feature_id, &rect.to_polygon(), origin, items)?,
			Geometry::Triangle(triangle) => push_polygon(feature_id, &triangle.to_polygon(), origin, items)?,
			Geometry::GeometryCollection(collection) => {
				for part in collection {
					self.fill_tile_items(feature_id, part, origin, items)?;
				}
			}
		}
		Ok(())
	}
}
