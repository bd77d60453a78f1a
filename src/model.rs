// Copyright 2024 Viktor Reusch
//
// This file is part of kml_gpx_convert.
//
// kml_gpx_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! In-memory model of the converted document.
//!
//! The model mirrors the structure of GPX: a [`Document`] owns standalone
//! waypoints and an ordered list of [`Track`]s, each made of [`Segment`]s of
//! track points. It is built by the [`KmlHandler`](crate::KmlHandler) and only
//! read afterwards.

/// Whether a [`Point`] belongs to a track segment or stands alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointKind {
    /// Point of a track segment (`<trkpt>`).
    TrackPoint,
    /// Standalone point (`<wpt>`).
    WayPoint,
}

/// A single position with an optional name.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    longitude: f64,
    latitude: f64,
    elevation: f64,
    name: Option<String>,
    kind: PointKind,
}

impl Point {
    pub fn new(
        longitude: f64,
        latitude: f64,
        elevation: f64,
        name: Option<String>,
        kind: PointKind,
    ) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
            name,
            kind,
        }
    }

    pub(crate) fn with_name(self, name: String) -> Self {
        Self {
            name: Some(name),
            ..self
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Elevation in meters, `0.0` if the source did not provide one.
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }
}

/// Continuous run of track points.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    name: Option<String>,
    description: Option<String>,
    number: u32,
    points: Vec<Point>,
}

impl Segment {
    /// Create an empty segment with its 1-based `number` within the track.
    pub fn new(number: u32) -> Self {
        Self {
            name: None,
            description: None,
            number,
            points: vec![],
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub(crate) fn extend_points(&mut self, points: impl IntoIterator<Item = Point>) {
        self.points.extend(points);
    }
}

/// Named track consisting of one or more segments.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    name: Option<String>,
    description: Option<String>,
    number: u32,
    segments: Vec<Segment>,
}

impl Track {
    /// Create an empty track with its 1-based `number` within the document.
    pub fn new(number: u32) -> Self {
        Self {
            name: None,
            description: None,
            number,
            segments: vec![],
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The number never changes once the track is created.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number for the next segment added to this track.
    pub(crate) fn next_segment_number(&self) -> u32 {
        self.segments.len() as u32 + 1
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub(crate) fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

/// Root of the model: metadata, waypoints, and tracks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    name: Option<String>,
    description: Option<String>,
    waypoints: Vec<Point>,
    tracks: Vec<Track>,
}

impl Document {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = Some(description);
    }

    pub(crate) fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub(crate) fn extend_waypoints(&mut self, waypoints: impl IntoIterator<Item = Point>) {
        self.waypoints.extend(waypoints);
    }
}
