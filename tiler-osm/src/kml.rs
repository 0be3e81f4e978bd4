//! Minimal KML document writer.

use std::io::{self, Write};

use geo::{Coord, Rect};
use quick_xml::escape::escape;

/// Geometry carried by a [`Placemark`].
#[derive(Debug, Clone, PartialEq)]
pub enum KmlGeometry {
    /// Single waypoint.
    Point(Coord<f64>),
    /// Open line.
    Line(Vec<Coord<f64>>),
    /// Closed outer boundary.
    Polygon(Vec<Coord<f64>>),
}

/// Named feature in a KML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    /// Display name.
    pub name: String,
    /// Feature geometry.
    pub geometry: KmlGeometry,
}

impl Placemark {
    /// Polygon placemark outlining `rect`.
    #[must_use]
    pub fn rectangle(name: impl Into<String>, rect: Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        let ring = vec![
            Coord { x: min.x, y: max.y },
            Coord { x: max.x, y: max.y },
            Coord { x: max.x, y: min.y },
            Coord { x: min.x, y: min.y },
            Coord { x: min.x, y: max.y },
        ];
        Self {
            name: name.into(),
            geometry: KmlGeometry::Polygon(ring),
        }
    }
}

/// Writes a KML document with folders and placemarks.
#[derive(Debug)]
pub struct KmlWriter<W: Write> {
    out: W,
    open_folders: usize,
}

impl<W: Write> KmlWriter<W> {
    /// Wrap `out` and write the document header titled `title`.
    ///
    /// # Errors
    /// Propagates stream failures.
    pub fn header(mut out: W, title: &str) -> io::Result<Self> {
        writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(out, "<kml xmlns=\"http://www.opengis.net/kml/2.2\">")?;
        writeln!(out, "  <Document>")?;
        writeln!(out, "    <name>{}</name>", escape(title))?;
        writeln!(out, "    <visibility>1</visibility>")?;
        writeln!(out, "    <open>1</open>")?;
        Ok(Self {
            out,
            open_folders: 0,
        })
    }

    /// Open a named folder.
    ///
    /// # Errors
    /// Propagates stream failures.
    pub fn folder_start(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "    <Folder>")?;
        writeln!(self.out, "      <name>{}</name>", escape(name))?;
        self.open_folders += 1;
        Ok(())
    }

    /// Close the innermost folder; a no-op when none is open.
    ///
    /// # Errors
    /// Propagates stream failures.
    pub fn folder_end(&mut self) -> io::Result<()> {
        if self.open_folders == 0 {
            return Ok(());
        }
        self.open_folders -= 1;
        writeln!(self.out, "    </Folder>")
    }

    /// Write one placemark.
    ///
    /// # Errors
    /// Propagates stream failures.
    pub fn placemark(&mut self, placemark: &Placemark) -> io::Result<()> {
        writeln!(self.out, "      <Placemark>")?;
        writeln!(self.out, "        <name>{}</name>", escape(placemark.name.as_str()))?;
        match &placemark.geometry {
            KmlGeometry::Point(coord) => {
                writeln!(self.out, "        <Point>")?;
                writeln!(
                    self.out,
                    "          <coordinates>{}</coordinates>",
                    coordinates(std::slice::from_ref(coord))
                )?;
                writeln!(self.out, "        </Point>")?;
            }
            KmlGeometry::Line(coords) => {
                writeln!(self.out, "        <LineString>")?;
                writeln!(self.out, "          <tessellate>1</tessellate>")?;
                writeln!(self.out, "          <altitudeMode>clampToGround</altitudeMode>")?;
                writeln!(
                    self.out,
                    "          <coordinates>{}</coordinates>",
                    coordinates(coords)
                )?;
                writeln!(self.out, "        </LineString>")?;
            }
            KmlGeometry::Polygon(coords) => {
                writeln!(self.out, "        <Polygon>")?;
                writeln!(self.out, "          <outerBoundaryIs><LinearRing>")?;
                writeln!(
                    self.out,
                    "            <coordinates>{}</coordinates>",
                    coordinates(coords)
                )?;
                writeln!(self.out, "          </LinearRing></outerBoundaryIs>")?;
                writeln!(self.out, "        </Polygon>")?;
            }
        }
        writeln!(self.out, "      </Placemark>")
    }

    /// Close open folders and the document, flush, and return the stream.
    ///
    /// # Errors
    /// Propagates stream failures.
    pub fn finish(mut self) -> io::Result<W> {
        while self.open_folders > 0 {
            self.folder_end()?;
        }
        writeln!(self.out, "  </Document>")?;
        writeln!(self.out, "</kml>")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

fn coordinates(coords: &[Coord<f64>]) -> String {
    coords
        .iter()
        .map(|coord| format!("{},{},0", coord.x, coord.y))
        .collect::<Vec<_>>()
        .join(" ")
}
