//! Campus geofence — the sole gate deciding whether a submission is accepted.
//!
//! Two interchangeable strategies implement [`Boundary`]:
//!
//! - [`BoundingBox`]: inclusive range test on each axis, `O(1)`.
//! - [`Polygon`]: even-odd (ray casting) rule over an implicitly closed ring of
//!   `[lat, lng]` vertices, `O(n)`, independent of winding direction.
//!
//! [`Geofence`] holds whichever one is configured. It deserialises from a
//! table tagged by `kind`:
//!
//! ```toml
//! [geofence]
//! kind     = "polygon"
//! vertices = [[12.839, 80.151], [12.844, 80.151], [12.844, 80.157]]
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default campus limits.
pub const CAMPUS_BOUNDS: BoundingBox = BoundingBox {
  min_lat: 12.839,
  max_lat: 12.844,
  min_lng: 80.151,
  max_lng: 80.157,
};

/// Membership test shared by every geofence strategy.
pub trait Boundary {
  fn is_within_bounds(&self, lat: f64, lng: f64) -> bool;
}

// ─── Bounding box ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxLimits")]
pub struct BoundingBox {
  pub min_lat: f64,
  pub max_lat: f64,
  pub min_lng: f64,
  pub max_lng: f64,
}

impl BoundingBox {
  pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Result<Self> {
    let bbox = Self { min_lat, max_lat, min_lng, max_lng };
    bbox.validate()?;
    Ok(bbox)
  }

  fn validate(&self) -> Result<()> {
    let limits = [self.min_lat, self.max_lat, self.min_lng, self.max_lng];
    if !limits.iter().all(|l| l.is_finite()) {
      return Err(Error::NonFiniteLimit);
    }
    if self.min_lat > self.max_lat {
      return Err(Error::InvertedBox("latitude"));
    }
    if self.min_lng > self.max_lng {
      return Err(Error::InvertedBox("longitude"));
    }
    Ok(())
  }
}

/// Unchecked box limits as they appear in serialized form.
#[derive(Deserialize)]
struct BoxLimits {
  min_lat: f64,
  max_lat: f64,
  min_lng: f64,
  max_lng: f64,
}

impl TryFrom<BoxLimits> for BoundingBox {
  type Error = Error;

  fn try_from(l: BoxLimits) -> Result<Self> {
    BoundingBox::new(l.min_lat, l.max_lat, l.min_lng, l.max_lng)
  }
}

impl Boundary for BoundingBox {
  fn is_within_bounds(&self, lat: f64, lng: f64) -> bool {
    (self.min_lat..=self.max_lat).contains(&lat)
      && (self.min_lng..=self.max_lng).contains(&lng)
  }
}

// ─── Polygon ─────────────────────────────────────────────────────────────────

/// A campus outline. The ring closes implicitly: the last vertex connects
/// back to the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
  vertices: Vec<[f64; 2]>,
  #[serde(skip)]
  extent:   BoundingBox,
}

impl Polygon {
  /// Build a polygon from `[lat, lng]` vertices.
  pub fn new(vertices: Vec<[f64; 2]>) -> Result<Self> {
    if vertices.len() < 3 {
      return Err(Error::TooFewVertices(vertices.len()));
    }
    if let Some((index, [lat, lng])) = vertices
      .iter()
      .copied()
      .enumerate()
      .find(|(_, [lat, lng])| !lat.is_finite() || !lng.is_finite())
    {
      return Err(Error::NonFiniteVertex { index, lat, lng });
    }
    let mut extent = BoundingBox {
      min_lat: f64::INFINITY,
      max_lat: f64::NEG_INFINITY,
      min_lng: f64::INFINITY,
      max_lng: f64::NEG_INFINITY,
    };
    for &[lat, lng] in &vertices {
      extent.min_lat = extent.min_lat.min(lat);
      extent.max_lat = extent.max_lat.max(lat);
      extent.min_lng = extent.min_lng.min(lng);
      extent.max_lng = extent.max_lng.max(lng);
    }
    Ok(Self { vertices, extent })
  }

  pub fn vertices(&self) -> &[[f64; 2]] { &self.vertices }

  /// The smallest box containing every vertex.
  pub fn extent(&self) -> BoundingBox { self.extent }
}

impl Boundary for Polygon {
  /// Casts a ray from the point towards increasing longitude and counts edge
  /// crossings; an odd count means inside.
  fn is_within_bounds(&self, lat: f64, lng: f64) -> bool {
    // Nothing outside the extent can be inside the ring.
    if !self.extent.is_within_bounds(lat, lng) {
      return false;
    }
    let mut inside = false;
    let mut prev = self.vertices[self.vertices.len() - 1];

    for &curr in &self.vertices {
      let [lat_a, lng_a] = prev;
      let [lat_b, lng_b] = curr;

      // Only edges straddling the ray's latitude can cross it. Such an edge
      // has lat_a != lat_b, so the division below is always defined, and a
      // vertical edge (lng_a == lng_b) simply crosses at lng_a.
      if (lat_a > lat) != (lat_b > lat) {
        let crossing_lng = lng_a + (lat - lat_a) * (lng_b - lng_a) / (lat_b - lat_a);
        if lng < crossing_lng {
          inside = !inside;
        }
      }
      prev = curr;
    }

    inside
  }
}

// ─── Configured geofence ─────────────────────────────────────────────────────

/// Raw, unvalidated form of [`Geofence`] as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeofenceConfig {
  BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
  },
  Polygon {
    vertices: Vec<[f64; 2]>,
  },
}

/// The active geofence policy. Exactly one strategy is in force at a time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "GeofenceConfig")]
pub enum Geofence {
  BoundingBox(BoundingBox),
  Polygon(Polygon),
}

impl Default for Geofence {
  fn default() -> Self { Geofence::BoundingBox(CAMPUS_BOUNDS) }
}

impl TryFrom<GeofenceConfig> for Geofence {
  type Error = Error;

  fn try_from(config: GeofenceConfig) -> Result<Self> {
    match config {
      GeofenceConfig::BoundingBox { min_lat, max_lat, min_lng, max_lng } => Ok(
        Geofence::BoundingBox(BoundingBox::new(min_lat, max_lat, min_lng, max_lng)?),
      ),
      GeofenceConfig::Polygon { vertices } => Ok(Geofence::Polygon(Polygon::new(vertices)?)),
    }
  }
}

impl Boundary for Geofence {
  fn is_within_bounds(&self, lat: f64, lng: f64) -> bool {
    match self {
      Geofence::BoundingBox(b) => b.is_within_bounds(lat, lng),
      Geofence::Polygon(p) => p.is_within_bounds(lat, lng),
    }
  }
}
