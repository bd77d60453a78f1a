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

//! Parsing of KML `<coordinates>` text.
//!
//! KML stores coordinates as whitespace separated tuples of the form
//! `longitude,latitude,altitude`. The XML reader may hand the text of a
//! single `<coordinates>` element over in several chunks, split at arbitrary
//! positions. [`CoordinateBuffer`] keeps the unfinished tail of one chunk
//! until the next one arrives.

use crate::diagnostics::{CoordinateIssue, Diagnostics, Warning};
use crate::model::{Point, PointKind};

/// Separator between the fields of a coordinate tuple.
const FIELD_SEPARATOR: char = ',';
/// Every tuple must contain longitude, latitude, and elevation.
const FIELD_COUNT: usize = 3;

/// Parse a single `longitude,latitude,elevation` tuple.
///
/// No range checks are applied to longitude and latitude.
///
/// # Example
/// ```
/// # use kml_gpx_convert::coordinates::parse_point;
/// # use kml_gpx_convert::PointKind;
/// #
/// let point = parse_point("10.5,60.25,300", Some("1".into()), PointKind::TrackPoint)
///     .expect("valid tuple");
/// assert_eq!(point.longitude(), 10.5);
/// assert_eq!(point.latitude(), 60.25);
/// assert_eq!(point.elevation(), 300.0);
/// assert!(parse_point("10.5,60.25", None, PointKind::TrackPoint).is_err());
/// ```
pub fn parse_point(
    token: &str,
    name: Option<String>,
    kind: PointKind,
) -> Result<Point, CoordinateIssue> {
    let fields: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT {
        return Err(CoordinateIssue::FieldCount(fields.len()));
    }
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(CoordinateIssue::BlankField);
    }

    let longitude = parse_field(fields[0])?;
    let latitude = parse_field(fields[1])?;
    let elevation = parse_field(fields[2])?;
    Ok(Point::new(longitude, latitude, elevation, name, kind))
}

fn parse_field(field: &str) -> Result<f64, CoordinateIssue> {
    let field = field.trim();
    let value: f64 = field.parse()?;
    if !value.is_finite() {
        return Err(CoordinateIssue::NotFinite(field.to_string()));
    }
    Ok(value)
}

/// Source of the numeric names given to unnamed points.
///
/// Counting starts at 1 and is restarted by the caller for every new scope
/// (folder or line string).
#[derive(Debug, Clone)]
pub struct PointCounter(u32);

impl PointCounter {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn reset(&mut self) {
        self.0 = 1;
    }

    /// Return the current value as a name and advance.
    pub fn next_name(&mut self) -> String {
        let name = self.0.to_string();
        self.0 += 1;
        name
    }
}

impl Default for PointCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Carry-over buffer for the coordinates of one line string.
///
/// A tuple is only parsed once it is known to be complete, that is once
/// whitespace follows it or the element ends. Feeding a text in pieces
/// therefore yields exactly the points of feeding it at once.
#[derive(Debug, Default, Clone)]
pub struct CoordinateBuffer {
    carry: String,
}

impl CoordinateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unfinished tail of the text seen so far.
    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// Drop any unfinished tail, e.g. when a new element starts.
    pub fn clear(&mut self) {
        self.carry.clear();
    }

    /// Parse all complete track point tuples of `chunk`.
    ///
    /// The carry-over from the previous call is prepended to `chunk`. A
    /// trailing tuple not followed by whitespace is kept for the next call or
    /// for [`finish`](Self::finish).
    pub fn feed(
        &mut self,
        chunk: &str,
        counter: &mut PointCounter,
        diagnostics: &mut impl Diagnostics,
    ) -> Vec<Point> {
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(chunk);
        let terminated = text.ends_with(char::is_whitespace);

        let mut points = vec![];
        let mut tokens = text.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            if !terminated && tokens.peek().is_none() {
                self.carry.push_str(token);
                break;
            }
            points.extend(track_point(token, counter, diagnostics));
        }
        points
    }

    /// Parse the carried-over tuple once no more text will follow.
    pub fn finish(
        &mut self,
        counter: &mut PointCounter,
        diagnostics: &mut impl Diagnostics,
    ) -> Option<Point> {
        let text = std::mem::take(&mut self.carry);
        let token = text.trim();
        if token.is_empty() {
            return None;
        }
        track_point(token, counter, diagnostics)
    }
}

/// Parse every tuple of a self-contained coordinate text.
///
/// All points get `name` if given, otherwise a name from `counter`.
pub fn parse_points(
    text: &str,
    name: Option<&str>,
    kind: PointKind,
    counter: &mut PointCounter,
    diagnostics: &mut impl Diagnostics,
) -> Vec<Point> {
    text.split_whitespace()
        .filter_map(|token| {
            let point = parse_point(token, None, kind);
            report(token, point, &mut *diagnostics).map(|point| {
                let name = name.map_or_else(|| counter.next_name(), str::to_string);
                point.with_name(name)
            })
        })
        .collect()
}

fn track_point(
    token: &str,
    counter: &mut PointCounter,
    diagnostics: &mut impl Diagnostics,
) -> Option<Point> {
    let point = parse_point(token, None, PointKind::TrackPoint);
    report(token, point, diagnostics).map(|point| point.with_name(counter.next_name()))
}

/// Turn a parse failure into a warning.
fn report(
    token: &str,
    point: Result<Point, CoordinateIssue>,
    diagnostics: &mut impl Diagnostics,
) -> Option<Point> {
    point
        .map_err(|issue| {
            diagnostics.warn(Warning::MalformedCoordinate {
                token: token.to_string(),
                issue,
            })
        })
        .ok()
}
