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

//! Library for converting from [KML](https://developers.google.com/kml) to
//! [GPX](https://www.topografix.com/gpx.asp).
//!
//! It reads line strings of KML placemarks as GPX tracks and, optionally, KML
//! points as GPX waypoints. The KML input is streamed, so large files are
//! converted in a single pass.
//!
//! See [`convert`] for information on how to use this library. The individual
//! stages are available as [`read_kml`], [`KmlHandler`], and [`write_gpx`].

use std::io::{self, BufReader, Read};

use thiserror::Error;

pub mod coordinates;
pub mod diagnostics;
mod handler;
pub mod model;
mod reader;
mod render;

pub use diagnostics::{Diagnostics, LogDiagnostics, Warning};
pub use handler::{ConvertOptions, Event, KmlHandler, MergePolicy};
pub use model::{Document, Point, PointKind, Segment, Track};
pub use reader::read_kml;
pub use render::{to_gpx, write_gpx, CREATOR};

/// Error returned from the [`convert`] function.
#[derive(Error, Debug)]
pub enum Error {
    /// KML reading failed.
    #[error("reading KML failed: {0}")]
    Xml(#[from] quick_xml::Error),
    /// KML ended before its root element was closed, or had none.
    #[error("reading KML failed: unexpected end of document")]
    UnexpectedEof,
    /// GPX writing failed.
    #[error("writing GPX failed: {0}")]
    Io(#[from] io::Error),
}

/// Read a KML file and write a GPX file.
///
/// A complete KML file is read from `source`. The converted data is written as
/// a complete GPX file to `sink` and also returned. Problems with single
/// coordinates are logged as warnings via the [`log`] crate and do not stop
/// the conversion.
///
/// If an error occurs, the function returns immediately. The `source` and
/// `sink` might have been modified in this case.
///
/// # Example
/// ```
/// # use kml_gpx_convert::{convert, ConvertOptions};
/// #
/// let source = r#"
/// <?xml version="1.0" encoding="UTF-8"?>
/// <kml xmlns="http://www.opengis.net/kml/2.2">
///   <Document>
///     <Folder>
///       <name>Alps</name>
///       <Placemark>
///         <name>Ridge</name>
///         <LineString>
///           <coordinates>7.6586,45.9763,4478 7.6612,45.9790,4300</coordinates>
///         </LineString>
///       </Placemark>
///     </Folder>
///   </Document>
/// </kml>
/// "#;
/// let mut sink = vec![];
///
/// let document = convert(source.trim().as_bytes(), &mut sink, &ConvertOptions::default())
///     .expect("conversion failed");
/// assert_eq!(document.tracks()[0].name(), Some("Alps - Ridge"));
///
/// let gpx = String::from_utf8(sink).expect("GPX data is not valid UTF-8");
/// assert!(gpx.contains("<gpx"));
/// assert!(gpx.contains("45.9763"));
/// assert!(gpx.contains("Alps - Ridge"));
/// ```
pub fn convert(
    source: impl Read,
    sink: impl io::Write,
    options: &ConvertOptions,
) -> Result<Document, Error> {
    let document = read_kml(BufReader::new(source), options, LogDiagnostics)?;
    write_gpx(&document, sink)?;
    Ok(document)
}
