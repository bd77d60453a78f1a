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

//! Streaming state machine turning KML parse events into a [`Document`].
//!
//! Only the part of the KML structure needed for tracks and waypoints is
//! tracked:
//!
//! ```text
//! Document
//! ├── name, description
//! └── Folder
//!     ├── name
//!     └── Placemark
//!         ├── name, description
//!         ├── LineString
//!         │   └── coordinates
//!         └── Point
//!             └── coordinates
//! ```
//!
//! How placemarks and folders map to GPX tracks depends on the
//! [`MergePolicy`]:
//!
//! | KML         | no merge     | merge tracks | merge folders |
//! |-------------|--------------|--------------|---------------|
//! | Document    | -            | -            | track         |
//! | Folder      | name prefix  | track        | -             |
//! | Placemark   | track        | -            | -             |
//! | LineString  | segment      | segment      | segment       |

use crate::coordinates::{parse_points, CoordinateBuffer, PointCounter};
use crate::diagnostics::Diagnostics;
use crate::model::{Document, PointKind, Segment, Track};

/// Separator between folder and placemark name in track names.
const NAME_SEPARATOR: &str = " - ";

/// Options controlling the conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Merge all placemarks of a folder into one track.
    pub merge_tracks: bool,
    /// Merge all placemarks of the document into one track.
    ///
    /// This takes precedence over [`merge_tracks`](Self::merge_tracks).
    pub merge_folders: bool,
    /// Convert KML points to GPX waypoints.
    pub add_waypoints: bool,
}

/// How KML placemarks are grouped into GPX tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// One track per placemark.
    None,
    /// One track per folder.
    Tracks,
    /// One track for the whole document.
    Folders,
}

impl From<&ConvertOptions> for MergePolicy {
    fn from(options: &ConvertOptions) -> Self {
        if options.merge_folders {
            Self::Folders
        } else if options.merge_tracks {
            Self::Tracks
        } else {
            Self::None
        }
    }
}

/// A single XML parse event as seen by [`KmlHandler`].
///
/// Element names are local names without namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    ElementStart(&'a str),
    CharacterData(&'a str),
    ElementEnd(&'a str),
}

/// KML elements the handler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Document,
    Name,
    Description,
    Folder,
    Placemark,
    LineString,
    Point,
    Coordinates,
}

impl Element {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Document" => Self::Document,
            "name" => Self::Name,
            "description" => Self::Description,
            "Folder" => Self::Folder,
            "Placemark" => Self::Placemark,
            "LineString" => Self::LineString,
            "Point" => Self::Point,
            "coordinates" => Self::Coordinates,
            _ => return None,
        })
    }

    /// Context entered by this element when it appears below `parent`.
    fn context_in(self, parent: Option<Tag>) -> Option<Tag> {
        Some(match (self, parent) {
            (Self::Document, None) => Tag::Document,
            (Self::Name, Some(Tag::Document)) => Tag::DocumentName,
            (Self::Name, Some(Tag::Folder)) => Tag::FolderName,
            (Self::Name, Some(Tag::Placemark)) => Tag::PlacemarkName,
            (Self::Description, Some(Tag::Document)) => Tag::DocumentDescription,
            (Self::Description, Some(Tag::Placemark)) => Tag::PlacemarkDescription,
            (Self::Folder, Some(Tag::Document)) => Tag::Folder,
            (Self::Placemark, Some(Tag::Folder)) => Tag::Placemark,
            (Self::LineString, Some(Tag::Placemark)) => Tag::LineString,
            (Self::Point, Some(Tag::Placemark)) => Tag::Point,
            (Self::Coordinates, Some(Tag::LineString)) => Tag::LineStringCoordinates,
            (Self::Coordinates, Some(Tag::Point)) => Tag::PointCoordinates,
            _ => return None,
        })
    }

    /// Whether the end of this element leaves context `tag`.
    fn closes(self, tag: Tag) -> bool {
        if tag == Tag::Skipped(self) {
            return true;
        }
        match self {
            Self::Document => tag == Tag::Document,
            Self::Name => matches!(
                tag,
                Tag::DocumentName | Tag::FolderName | Tag::PlacemarkName
            ),
            Self::Description => {
                matches!(tag, Tag::DocumentDescription | Tag::PlacemarkDescription)
            }
            Self::Folder => tag == Tag::Folder,
            Self::Placemark => tag == Tag::Placemark,
            Self::LineString => tag == Tag::LineString,
            Self::Point => tag == Tag::Point,
            Self::Coordinates => {
                matches!(tag, Tag::LineStringCoordinates | Tag::PointCoordinates)
            }
        }
    }
}

/// Position in the tracked part of the KML structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Document,
    DocumentName,
    DocumentDescription,
    Folder,
    FolderName,
    Placemark,
    PlacemarkName,
    PlacemarkDescription,
    LineString,
    LineStringCoordinates,
    Point,
    PointCoordinates,
    /// A known element in a place where it is not expected. Everything
    /// inside it is ignored.
    Skipped(Element),
}

/// Builds a [`Document`] from a stream of [`Event`]s.
///
/// Feed every event to [`handle`](Self::handle) in document order and call
/// [`finish`](Self::finish) at the end of input. Problems with coordinate
/// data are reported to the [`Diagnostics`] sink `D`.
///
/// # Example
/// ```
/// # use kml_gpx_convert::{ConvertOptions, Event, KmlHandler, Warning};
/// #
/// let options = ConvertOptions::default();
/// let mut warnings: Vec<Warning> = vec![];
/// let mut handler = KmlHandler::new(&options, &mut warnings);
/// for event in [
///     Event::ElementStart("Document"),
///     Event::ElementStart("Folder"),
///     Event::ElementStart("Placemark"),
///     Event::ElementStart("LineString"),
///     Event::ElementStart("coordinates"),
///     Event::CharacterData("10.1,60.2,300 10.2,60.3,310"),
///     Event::ElementEnd("coordinates"),
///     Event::ElementEnd("LineString"),
///     Event::ElementEnd("Placemark"),
///     Event::ElementEnd("Folder"),
///     Event::ElementEnd("Document"),
/// ] {
///     handler.handle(event);
/// }
/// let document = handler.finish();
///
/// assert_eq!(document.tracks().len(), 1);
/// assert_eq!(document.tracks()[0].segments()[0].points().len(), 2);
/// assert!(warnings.is_empty());
/// ```
#[derive(Debug)]
pub struct KmlHandler<D> {
    policy: MergePolicy,
    add_waypoints: bool,
    document: Document,
    tags: Vec<Tag>,
    folder_name: Option<String>,
    track: Option<Track>,
    segment: Option<Segment>,
    tracks_created: u32,
    counter: PointCounter,
    coordinates: CoordinateBuffer,
    diagnostics: D,
}

impl<D: Diagnostics> KmlHandler<D> {
    pub fn new(options: &ConvertOptions, diagnostics: D) -> Self {
        Self {
            policy: options.into(),
            add_waypoints: options.add_waypoints,
            document: Document::default(),
            tags: vec![],
            folder_name: None,
            track: None,
            segment: None,
            tracks_created: 0,
            counter: PointCounter::new(),
            coordinates: CoordinateBuffer::new(),
            diagnostics,
        }
    }

    pub fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::ElementStart(name) => self.start_element(name),
            Event::CharacterData(text) => self.characters(text),
            Event::ElementEnd(name) => self.end_element(name),
        }
    }

    /// Complete the conversion once the input is exhausted.
    pub fn finish(mut self) -> Document {
        if self.policy == MergePolicy::Folders {
            if let Some(mut track) = self.track.take() {
                track.set_name(self.document.name().map(str::to_string));
                track.set_description(self.document.description().map(str::to_string));
                self.attach_track(track);
            }
        }

        log::debug!(
            "converted {} track(s) and {} waypoint(s)",
            self.document.tracks().len(),
            self.document.waypoints().len()
        );
        self.document
    }

    fn start_element(&mut self, name: &str) {
        let Some(element) = Element::from_name(name) else {
            return;
        };
        let Some(tag) = element.context_in(self.tags.last().copied()) else {
            log::trace!("skipping <{name}> in unexpected context");
            self.tags.push(Tag::Skipped(element));
            return;
        };
        self.tags.push(tag);

        match tag {
            Tag::Folder => {
                self.folder_name = None;
                self.counter.reset();
                if self.policy == MergePolicy::Tracks {
                    self.track = Some(self.new_track());
                }
            }
            Tag::Placemark => {
                if self.policy == MergePolicy::None || self.track.is_none() {
                    self.track = Some(self.new_track());
                }
            }
            Tag::LineString => {
                let number = self.track.as_ref().map_or(1, Track::next_segment_number);
                self.segment = Some(Segment::new(number));
                self.counter.reset();
            }
            Tag::LineStringCoordinates => self.coordinates.clear(),
            _ => {}
        }
    }

    fn characters(&mut self, raw: &str) {
        let Some(&tag) = self.tags.last() else {
            return;
        };

        // Coordinates are split at whitespace, line breaks included, so they
        // get the raw text. A trailing space also marks the last tuple as
        // complete.
        match tag {
            Tag::LineStringCoordinates => {
                let points = self
                    .coordinates
                    .feed(raw, &mut self.counter, &mut self.diagnostics);
                if let Some(segment) = self.segment.as_mut() {
                    segment.extend_points(points);
                }
                return;
            }
            Tag::PointCoordinates => {
                if self.add_waypoints {
                    let name = self.track.as_ref().and_then(Track::name);
                    let waypoints = parse_points(
                        raw,
                        name,
                        PointKind::WayPoint,
                        &mut self.counter,
                        &mut self.diagnostics,
                    );
                    self.document.extend_waypoints(waypoints);
                }
                return;
            }
            _ => {}
        }

        let Some(text) = clean_text(raw) else {
            return;
        };
        match tag {
            Tag::DocumentName => self.document.set_name(text),
            Tag::DocumentDescription => self.document.set_description(text),
            Tag::FolderName => {
                if self.policy != MergePolicy::None {
                    if let Some(track) = self.track.as_mut() {
                        track.set_name(Some(text.clone()));
                    }
                }
                self.folder_name = Some(text);
            }
            Tag::PlacemarkName if self.policy == MergePolicy::None => {
                let name = match &self.folder_name {
                    Some(folder) => format!("{folder}{NAME_SEPARATOR}{text}"),
                    None => text,
                };
                if let Some(track) = self.track.as_mut() {
                    track.set_name(Some(name));
                }
            }
            Tag::PlacemarkDescription if self.policy == MergePolicy::None => {
                if let Some(track) = self.track.as_mut() {
                    track.set_description(Some(text));
                }
            }
            _ => {}
        }
    }

    fn end_element(&mut self, name: &str) {
        let Some(element) = Element::from_name(name) else {
            return;
        };
        let Some(&tag) = self.tags.last() else {
            return;
        };
        if !element.closes(tag) {
            return;
        }
        self.tags.pop();

        match tag {
            Tag::LineStringCoordinates => {
                let last = self
                    .coordinates
                    .finish(&mut self.counter, &mut self.diagnostics);
                if let Some(segment) = self.segment.as_mut() {
                    segment.extend_points(last);
                }
            }
            Tag::LineString => {
                if let (Some(track), Some(segment)) = (self.track.as_mut(), self.segment.take()) {
                    track.push_segment(segment);
                }
            }
            Tag::Placemark if self.policy == MergePolicy::None => {
                self.segment = None;
                if let Some(track) = self.track.take() {
                    self.attach_track(track);
                }
            }
            Tag::Folder if self.policy == MergePolicy::Tracks => {
                self.segment = None;
                if let Some(track) = self.track.take() {
                    self.attach_track(track);
                }
            }
            _ => {}
        }
    }

    fn new_track(&mut self) -> Track {
        self.tracks_created += 1;
        Track::new(self.tracks_created)
    }

    fn attach_track(&mut self, track: Track) {
        log::debug!(
            "track {} {:?} with {} segment(s)",
            track.number(),
            track.name().unwrap_or_default(),
            track.segments().len()
        );
        self.document.push_track(track);
    }
}

/// Trim `raw` and remove line breaks. Empty text counts as absent.
fn clean_text(raw: &str) -> Option<String> {
    let text: String = raw.trim().chars().filter(|&c| c != '\n' && c != '\r').collect();
    Some(text).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Warning;

    use super::Event::{CharacterData as Text, ElementEnd as End, ElementStart as Start};

    fn run(options: ConvertOptions, events: &[Event<'_>]) -> (Document, Vec<Warning>) {
        let mut warnings = vec![];
        let mut handler = KmlHandler::new(&options, &mut warnings);
        for &event in events {
            handler.handle(event);
        }
        (handler.finish(), warnings)
    }

    fn element<'a>(name: &'a str, text: &'a str) -> [Event<'a>; 3] {
        [Start(name), Text(text), End(name)]
    }

    /// Placemark with a single line string of two points.
    fn placemark<'a>(name: &'a str, description: Option<&'a str>, coords: &'a str) -> Vec<Event<'a>> {
        let mut events = vec![Start("Placemark")];
        events.extend(element("name", name));
        if let Some(description) = description {
            events.extend(element("description", description));
        }
        events.extend([Start("LineString")]);
        events.extend(element("coordinates", coords));
        events.extend([End("LineString"), End("Placemark")]);
        events
    }

    fn folder_f() -> Vec<Event<'static>> {
        let mut events = vec![Start("Document"), Start("Folder")];
        events.extend(element("name", "F"));
        events.extend(placemark("A", Some("dA"), "1,2,3 4,5,6"));
        events.extend(placemark("B", None, "7,8,9 10,11,12"));
        events.extend([End("Folder"), End("Document")]);
        events
    }

    #[test]
    fn test_policy_precedence() {
        let both = ConvertOptions {
            merge_tracks: true,
            merge_folders: true,
            add_waypoints: false,
        };
        assert_eq!(MergePolicy::from(&both), MergePolicy::Folders);
        assert_eq!(MergePolicy::from(&ConvertOptions::default()), MergePolicy::None);
    }

    #[test]
    fn test_no_merge() {
        let (document, warnings) = run(ConvertOptions::default(), &folder_f());
        assert!(warnings.is_empty());

        let tracks = document.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name(), Some("F - A"));
        assert_eq!(tracks[0].description(), Some("dA"));
        assert_eq!(tracks[0].number(), 1);
        assert_eq!(tracks[1].name(), Some("F - B"));
        assert_eq!(tracks[1].description(), None);
        assert_eq!(tracks[1].number(), 2);
        for track in tracks {
            assert_eq!(track.segments().len(), 1);
            assert_eq!(track.segments()[0].number(), 1);
            assert_eq!(track.segments()[0].points().len(), 2);
        }
    }

    #[test]
    fn test_merge_tracks() {
        let options = ConvertOptions {
            merge_tracks: true,
            ..Default::default()
        };
        let (document, _) = run(options, &folder_f());

        let tracks = document.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name(), Some("F"));
        assert_eq!(tracks[0].description(), None);
        let numbers: Vec<_> = tracks[0].segments().iter().map(Segment::number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_merge_folders_named_after_document() {
        let mut events = vec![Start("Document")];
        events.extend(element("name", "Trip"));
        events.extend(element("description", "Summer"));
        for folder in ["F1", "F2"] {
            events.push(Start("Folder"));
            events.extend(element("name", folder));
            events.extend(placemark("P", None, "1,2,3"));
            events.push(End("Folder"));
        }
        events.push(End("Document"));

        let options = ConvertOptions {
            merge_folders: true,
            ..Default::default()
        };
        let (document, _) = run(options, &events);
        assert_eq!(document.name(), Some("Trip"));
        let tracks = document.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name(), Some("Trip"));
        assert_eq!(tracks[0].description(), Some("Summer"));
        assert_eq!(tracks[0].number(), 1);
        assert_eq!(tracks[0].segments().len(), 2);
    }

    #[test]
    fn test_folder_without_name() {
        let mut events = vec![Start("Document"), Start("Folder")];
        events.extend(placemark("A", None, "1,2,3"));
        events.extend([End("Folder"), End("Document")]);

        let (document, _) = run(ConvertOptions::default(), &events);
        assert_eq!(document.tracks()[0].name(), Some("A"));
    }

    #[test]
    fn test_folder_name_does_not_leak() {
        let mut events = vec![Start("Document"), Start("Folder")];
        events.extend(element("name", "F"));
        events.push(End("Folder"));
        events.push(Start("Folder"));
        events.extend(placemark("A", None, "1,2,3"));
        events.extend([End("Folder"), End("Document")]);

        let (document, _) = run(ConvertOptions::default(), &events);
        assert_eq!(document.tracks()[0].name(), Some("A"));
    }

    #[test]
    fn test_coordinates_split_across_events() {
        let events = [
            Start("Document"),
            Start("Folder"),
            Start("Placemark"),
            Start("LineString"),
            Start("coordinates"),
            Text("1.0,2.0,3.0 4.0,5."),
            Text("0,0.0"),
            End("coordinates"),
            End("LineString"),
            End("Placemark"),
            End("Folder"),
            End("Document"),
        ];
        let (document, warnings) = run(ConvertOptions::default(), &events);
        assert!(warnings.is_empty());

        let points = document.tracks()[0].segments()[0].points();
        assert_eq!(points.len(), 2);
        assert_eq!(
            (points[1].longitude(), points[1].latitude(), points[1].elevation()),
            (4.0, 5.0, 0.0)
        );
        assert_eq!(points[1].name(), Some("2"));
    }

    #[test]
    fn test_waypoints() {
        let mut events = vec![Start("Document"), Start("Folder"), Start("Placemark")];
        events.extend(element("name", "Hut"));
        events.extend([Start("Point")]);
        events.extend(element("coordinates", "\n  8.5,47.3,1200\n"));
        events.extend([End("Point"), End("Placemark"), End("Folder"), End("Document")]);

        let (document, _) = run(ConvertOptions::default(), &events);
        assert!(document.waypoints().is_empty());

        let options = ConvertOptions {
            add_waypoints: true,
            ..Default::default()
        };
        let (document, _) = run(options, &events);
        let waypoints = document.waypoints();
        assert_eq!(waypoints.len(), 1);
        assert_eq!(waypoints[0].name(), Some("Hut"));
        assert_eq!(waypoints[0].kind(), PointKind::WayPoint);
        assert_eq!(waypoints[0].elevation(), 1200.0);
    }

    #[test]
    fn test_unnamed_waypoint_counted() {
        let options = ConvertOptions {
            add_waypoints: true,
            ..Default::default()
        };
        let mut events = vec![Start("Document"), Start("Folder")];
        for _ in 0..2 {
            events.extend([Start("Placemark"), Start("Point")]);
            events.extend(element("coordinates", "1,2,3"));
            events.extend([End("Point"), End("Placemark")]);
        }
        events.extend([End("Folder"), End("Document")]);

        let (document, _) = run(options, &events);
        let names: Vec<_> = document.waypoints().iter().map(|w| w.name()).collect();
        assert_eq!(names, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_unexpected_context_ignored() {
        let mut events = vec![Start("Document")];
        events.extend(element("name", "Doc"));
        // Placemark outside of a folder, including its name.
        events.extend(placemark("Stray", None, "1,2,3"));
        events.push(Start("Folder"));
        // Line string directly in a folder.
        events.extend([Start("LineString")]);
        events.extend(element("coordinates", "1,2,3"));
        events.push(End("LineString"));
        events.extend(placemark("A", None, "4,5,6"));
        events.extend([End("Folder"), End("Document")]);

        let (document, _) = run(ConvertOptions::default(), &events);
        assert_eq!(document.name(), Some("Doc"));
        assert_eq!(document.tracks().len(), 1);
        assert_eq!(document.tracks()[0].name(), Some("A"));
        assert_eq!(document.tracks()[0].number(), 1);
    }

    #[test]
    fn test_unknown_elements_transparent() {
        let events = [
            Start("Document"),
            Start("Folder"),
            Start("Placemark"),
            Start("MultiGeometry"),
            Start("LineString"),
            Start("tessellate"),
            Text("1"),
            End("tessellate"),
            Start("coordinates"),
            Text("1,2,3"),
            End("coordinates"),
            End("LineString"),
            End("MultiGeometry"),
            End("Placemark"),
            End("Folder"),
            End("Document"),
        ];
        let (document, _) = run(ConvertOptions::default(), &events);
        assert_eq!(document.tracks()[0].segments()[0].points().len(), 1);
    }

    #[test]
    fn test_text_cleaned() {
        let mut events = vec![Start("Document")];
        events.extend(element("name", "  My\nTrip \n"));
        events.extend(element("description", " \n "));
        events.push(End("Document"));

        let (document, _) = run(ConvertOptions::default(), &events);
        assert_eq!(document.name(), Some("MyTrip"));
        assert_eq!(document.description(), None);
    }
}
