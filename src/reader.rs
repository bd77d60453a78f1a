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

//! Pull-based KML reader feeding the [`KmlHandler`].

use std::io::BufRead;

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

use crate::diagnostics::Diagnostics;
use crate::handler::{ConvertOptions, Event, KmlHandler};
use crate::model::Document;
use crate::Error;

/// Stream a KML document from `source` into a [`Document`].
///
/// The input is read event by event with a single reused buffer, so memory
/// use does not grow with the size of the input beyond the model itself.
/// Namespace prefixes are ignored. The encoding is taken from the XML
/// declaration or a byte order mark. Coordinate problems are reported to
/// `diagnostics`; malformed XML aborts the conversion, and so does input that
/// ends before its root element is closed.
pub fn read_kml<D: Diagnostics>(
    source: impl BufRead,
    options: &ConvertOptions,
    diagnostics: D,
) -> Result<Document, Error> {
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.trim_text(false);
    config.expand_empty_elements = true;

    let mut handler = KmlHandler::new(options, diagnostics);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                depth += 1;
                seen_root = true;
                let name = reader
                    .decoder()
                    .decode(e.local_name().into_inner())
                    .map_err(quick_xml::Error::from)?;
                handler.handle(Event::ElementStart(&name));
            }
            XmlEvent::End(e) => {
                depth = depth.saturating_sub(1);
                let name = reader
                    .decoder()
                    .decode(e.local_name().into_inner())
                    .map_err(quick_xml::Error::from)?;
                handler.handle(Event::ElementEnd(&name));
            }
            XmlEvent::Text(e) => {
                let text = e.unescape()?;
                handler.handle(Event::CharacterData(&text));
            }
            XmlEvent::CData(e) => {
                let text = e.decode().map_err(quick_xml::Error::from)?;
                handler.handle(Event::CharacterData(&text));
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth > 0 || !seen_root {
        return Err(Error::UnexpectedEof);
    }
    Ok(handler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Warning;

    fn read(kml: &str, options: &ConvertOptions) -> Document {
        let mut warnings: Vec<Warning> = vec![];
        read_kml(kml.as_bytes(), options, &mut warnings).unwrap()
    }

    #[test]
    fn test_namespaced_elements() {
        let kml = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2">
  <kml:Document>
    <kml:name>Prefixed</kml:name>
    <kml:Folder>
      <kml:Placemark>
        <kml:LineString><kml:coordinates>1,2,3 4,5,6</kml:coordinates></kml:LineString>
      </kml:Placemark>
    </kml:Folder>
  </kml:Document>
</kml:kml>"#;
        let document = read(kml, &ConvertOptions::default());
        assert_eq!(document.name(), Some("Prefixed"));
        assert_eq!(document.tracks()[0].segments()[0].points().len(), 2);
    }

    #[test]
    fn test_cdata_and_entities() {
        let kml = r#"<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Fish &amp; Chips</name>
    <description><![CDATA[<b>bold</b> trip]]></description>
  </Document>
</kml>"#;
        let document = read(kml, &ConvertOptions::default());
        assert_eq!(document.name(), Some("Fish & Chips"));
        assert_eq!(document.description(), Some("<b>bold</b> trip"));
    }

    #[test]
    fn test_empty_elements() {
        let kml = r#"<kml><Document><name/><Folder><name/><Placemark><name>A</name>
<LineString><coordinates/></LineString></Placemark></Folder></Document></kml>"#;
        let document = read(kml, &ConvertOptions::default());
        assert_eq!(document.name(), None);
        let track = &document.tracks()[0];
        assert_eq!(track.name(), Some("A"));
        assert!(track.segments()[0].points().is_empty());
    }

    #[test]
    fn test_malformed_xml() {
        let kml = "<kml><Document><Folder></Document></kml>";
        let mut warnings: Vec<Warning> = vec![];
        let result = read_kml(kml.as_bytes(), &ConvertOptions::default(), &mut warnings);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_truncated_document() {
        let kml = "<kml><Document><name>Cut</name><Folder><Placemark>";
        let mut warnings: Vec<Warning> = vec![];
        let result = read_kml(kml.as_bytes(), &ConvertOptions::default(), &mut warnings);
        assert!(matches!(result, Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_missing_root() {
        for kml in ["", "   \n", "not xml at all", "<?xml version=\"1.0\"?>"] {
            let mut warnings: Vec<Warning> = vec![];
            let result = read_kml(kml.as_bytes(), &ConvertOptions::default(), &mut warnings);
            assert!(matches!(result, Err(Error::UnexpectedEof)), "{kml:?}");
        }
    }

    #[test]
    fn test_declared_encoding() {
        let mut kml = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<kml><Document><name>Caf"#
            .to_vec();
        kml.push(0xE9);
        kml.extend_from_slice(b"</name></Document></kml>");
        let mut warnings: Vec<Warning> = vec![];
        let document = read_kml(&kml[..], &ConvertOptions::default(), &mut warnings).unwrap();
        assert_eq!(document.name(), Some("Caf\u{e9}"));
    }
}
