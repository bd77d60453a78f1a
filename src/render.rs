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

//! Conversion of the [`Document`] model to [GPX](https://www.topografix.com/gpx.asp).
//!
//! The [`gpx`] crate provides the model. Serialization is done here because
//! the writer of the `gpx` crate drops `<number>` from tracks.

use std::io;

use geo_types::Point as GeoPoint;
use gpx::{Gpx, GpxVersion, Metadata, TrackSegment, Waypoint};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;

use crate::model::{Document, Point, Segment, Track};
use crate::Error;

/// Value of the `creator` attribute of the `<gpx>` element.
pub const CREATOR: &str = "kml_gpx_convert";

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// Write `document` as a complete GPX 1.1 file to `sink`.
///
/// Child elements follow the order of the GPX 1.1 schema.
pub fn write_gpx(document: &Document, sink: impl io::Write) -> Result<(), Error> {
    let gpx = to_gpx(document);
    let mut writer = GpxWriter {
        writer: Writer::new_with_indent(sink, b' ', 2),
    };
    writer.write(&gpx)
}

/// Build the GPX representation of `document`.
///
/// Document name and description end up in the metadata. Every point keeps
/// its elevation, so `<ele>` is always present.
pub fn to_gpx(document: &Document) -> Gpx {
    let metadata = Metadata {
        name: document.name().map(str::to_string),
        description: document.description().map(str::to_string),
        ..Default::default()
    };

    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        metadata: Some(metadata),
        waypoints: document.waypoints().iter().map(convert_point).collect(),
        tracks: document.tracks().iter().map(convert_track).collect(),
        ..Default::default()
    }
}

/// Convert a `track` together with all of its segments.
fn convert_track(track: &Track) -> gpx::Track {
    gpx::Track {
        name: track.name().map(str::to_string),
        description: track.description().map(str::to_string),
        number: Some(track.number()),
        segments: track.segments().iter().map(convert_segment).collect(),
        ..Default::default()
    }
}

fn convert_segment(segment: &Segment) -> TrackSegment {
    let mut converted = TrackSegment::default();
    converted.points = segment.points().iter().map(convert_point).collect();
    converted
}

/// Track points and waypoints share the same GPX type.
fn convert_point(point: &Point) -> Waypoint {
    let mut waypoint = Waypoint::new(GeoPoint::new(point.longitude(), point.latitude()));
    waypoint.elevation = Some(point.elevation());
    waypoint.name = point.name().map(str::to_string);
    waypoint
}

/// Serializer for the parts of the [`Gpx`] model that [`to_gpx`] fills in.
struct GpxWriter<W: io::Write> {
    writer: Writer<W>,
}

impl<W: io::Write> GpxWriter<W> {
    fn write(&mut self, gpx: &Gpx) -> Result<(), Error> {
        self.event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let creator = gpx.creator.as_deref().unwrap_or(CREATOR);
        let root = BytesStart::new("gpx").with_attributes([
            ("version", "1.1"),
            ("creator", creator),
            ("xmlns", GPX_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
        ]);
        self.event(XmlEvent::Start(root))?;

        if let Some(metadata) = &gpx.metadata {
            self.start("metadata")?;
            self.optional("name", metadata.name.as_deref())?;
            self.optional("desc", metadata.description.as_deref())?;
            self.end("metadata")?;
        }
        for waypoint in &gpx.waypoints {
            self.waypoint("wpt", waypoint)?;
        }
        for track in &gpx.tracks {
            self.track(track)?;
        }

        self.end("gpx")
    }

    fn track(&mut self, track: &gpx::Track) -> Result<(), Error> {
        self.start("trk")?;
        self.optional("name", track.name.as_deref())?;
        self.optional("desc", track.description.as_deref())?;
        if let Some(number) = track.number {
            self.text("number", &number.to_string())?;
        }
        for segment in &track.segments {
            self.start("trkseg")?;
            for point in &segment.points {
                self.waypoint("trkpt", point)?;
            }
            self.end("trkseg")?;
        }
        self.end("trk")
    }

    fn waypoint(&mut self, tag: &str, waypoint: &Waypoint) -> Result<(), Error> {
        let point = waypoint.point();
        let latitude = point.y().to_string();
        let longitude = point.x().to_string();
        let start = BytesStart::new(tag)
            .with_attributes([("lat", latitude.as_str()), ("lon", longitude.as_str())]);
        self.event(XmlEvent::Start(start))?;
        if let Some(elevation) = waypoint.elevation {
            self.text("ele", &elevation.to_string())?;
        }
        self.optional("name", waypoint.name.as_deref())?;
        self.end(tag)
    }

    fn optional(&mut self, tag: &str, text: Option<&str>) -> Result<(), Error> {
        match text {
            Some(text) => self.text(tag, text),
            None => Ok(()),
        }
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), Error> {
        self.start(tag)?;
        self.event(XmlEvent::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn start(&mut self, tag: &str) -> Result<(), Error> {
        self.event(XmlEvent::Start(BytesStart::new(tag)))
    }

    fn end(&mut self, tag: &str) -> Result<(), Error> {
        self.event(XmlEvent::End(BytesEnd::new(tag)))
    }

    fn event(&mut self, event: XmlEvent<'_>) -> Result<(), Error> {
        self.writer.write_event(event)?;
        Ok(())
    }
}
