//! Region overlays written beside the tile cache: the boundary as OSM XML
//! and a KML outline of the boundary and tile coverage.

use std::io::{self, BufWriter};

use camino::Utf8Path;
use geo::{Coord, Rect};
use log::info;
use tiler_core::{BoundingBox, Region, TileCoord, TileSource};
use tiler_osm::{
    ElementAttrs, KmlGeometry, KmlWriter, Member, MemberKind, OsmWriteError, OsmWriter,
    OsmWriterConfig, Placemark, TagMapper, TagSet,
};

/// Area covered by one source at one zoom.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Coverage {
    pub(crate) source: TileSource,
    pub(crate) zoom: u8,
    pub(crate) extent: Option<BoundingBox>,
}

impl Coverage {
    pub(crate) fn of(source: TileSource, zoom: u8, tiles: &[TileCoord]) -> Self {
        Self {
            source,
            zoom,
            extent: tiles_extent(tiles),
        }
    }

    fn label(&self) -> String {
        format!("{}{}", self.source.manifest_label(), self.zoom)
    }
}

fn tiles_extent(tiles: &[TileCoord]) -> Option<BoundingBox> {
    tiles.iter().map(TileCoord::bounds).reduce(|acc, next| {
        BoundingBox::new(
            acc.min_lon.min(next.min_lon),
            acc.max_lon.max(next.max_lon),
            acc.min_lat.min(next.min_lat),
            acc.max_lat.max(next.max_lat),
        )
    })
}

/// Elements written by [`write_boundary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BoundaryStats {
    pub(crate) nodes: usize,
    pub(crate) ways: usize,
    pub(crate) relations: usize,
}

/// Write the region's rings as closed ways.
///
/// A region with a single outer ring becomes one tagged way; anything else
/// becomes untagged ways joined by a tagged multipolygon relation.
pub(crate) fn write_boundary(
    path: &Utf8Path,
    region: &Region,
    config: OsmWriterConfig,
    mapper: TagMapper,
) -> Result<BoundaryStats, OsmWriteError> {
    let file = tiler_fs::create_file(path)?;
    let mut writer = OsmWriter::new(BufWriter::new(file), config, mapper)?;
    let mut stats = BoundaryStats::default();
    let region_tags = writer.map_fields([("name", region.name()), ("source", "tiler")]);
    let single = region.rings().len() == 1 && region.outer_rings().count() == 1;

    let mut members = Vec::new();
    for ring in region.rings() {
        let mut refs = Vec::new();
        for coord in open_ring(ring.vertices.coords()) {
            refs.push(writer.write_node(&ElementAttrs::default(), coord.y, coord.x, &TagSet::new())?);
            stats.nodes += 1;
        }
        if let Some(&first) = refs.first() {
            refs.push(first);
        }
        let tags = if single {
            let mut tags = region_tags.clone();
            tags.insert("area", "yes");
            tags
        } else {
            TagSet::new()
        };
        let way = writer.make_way(&ElementAttrs::default(), &refs, &tags)?;
        stats.ways += 1;
        let role = if ring.hole { "inner" } else { "outer" };
        members.push(Member::new(MemberKind::Way, way, role));
    }

    if !single {
        let mut tags = region_tags;
        tags.insert("type", "multipolygon");
        writer.make_relation(&ElementAttrs::default(), &members, &tags)?;
        stats.relations += 1;
    }
    writer.finish()?;
    info!(
        "wrote boundary {path}: {} nodes, {} ways, {} relations",
        stats.nodes, stats.ways, stats.relations
    );
    Ok(stats)
}

/// Ring vertices without the closing repeat of the first vertex.
fn open_ring<'a, I>(coords: I) -> Vec<&'a Coord<f64>>
where
    I: Iterator<Item = &'a Coord<f64>>,
{
    let mut vertices: Vec<_> = coords.collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Write a KML document outlining the region and each coverage extent.
pub(crate) fn write_kml(path: &Utf8Path, region: &Region, coverage: &[Coverage]) -> io::Result<()> {
    let file = tiler_fs::create_file(path)?;
    let mut kml = KmlWriter::header(BufWriter::new(file), region.name())?;

    kml.folder_start("Boundary")?;
    for ring in region.outer_rings() {
        kml.placemark(&Placemark {
            name: ring.name.clone(),
            geometry: KmlGeometry::Polygon(ring.vertices.coords().copied().collect()),
        })?;
    }
    kml.folder_end()?;

    kml.folder_start("Coverage")?;
    for entry in coverage {
        if let Some(extent) = entry.extent {
            kml.placemark(&Placemark::rectangle(entry.label(), Rect::from(extent)))?;
        }
    }
    kml.finish()?;
    info!("wrote {path}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    fn region(text: &str) -> Region {
        Region::parse(text.as_bytes()).expect("valid polygon")
    }

    const SQUARE: &str = "boulder county\n1\n-105.0 40.0\n-104.0 40.0\n-104.0 40.5\n-105.0 40.5\n-105.0 40.0\nEND\nEND\n";

    #[rstest]
    fn single_ring_becomes_tagged_way(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("boulder-boundary.osm");
        let config = OsmWriterConfig {
            user: "mapper".to_owned(),
            uid: 42,
            ..OsmWriterConfig::default()
        };
        let stats = write_boundary(&path, &region(SQUARE), config, TagMapper::builtin())
            .expect("boundary written");
        assert_eq!(
            stats,
            BoundaryStats {
                nodes: 4,
                ways: 1,
                relations: 0
            }
        );
        let xml = std::fs::read_to_string(path.as_std_path()).expect("read boundary");
        assert!(xml.contains("user='mapper'"), "{xml}");
        assert!(xml.contains("uid='42'"), "{xml}");
        assert!(xml.contains("<tag k='name' v='Boulder County'/>"), "{xml}");
        assert!(xml.contains("<tag k='area' v='yes'/>"), "{xml}");
        assert_eq!(xml.matches("<nd ref='-1'/>").count(), 2, "way closes on its first node");
    }

    #[rstest]
    fn holes_produce_a_multipolygon(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("ring-boundary.osm");
        let text = "ring\nouter\n0 0\n4 0\n4 4\n0 4\nEND\n!inner\n1 1\n2 1\n2 2\nEND\nEND\n";
        let stats = write_boundary(
            &path,
            &region(text),
            OsmWriterConfig::default(),
            TagMapper::builtin(),
        )
        .expect("boundary written");
        assert_eq!(stats.ways, 2);
        assert_eq!(stats.relations, 1);
        let xml = std::fs::read_to_string(path.as_std_path()).expect("read boundary");
        assert!(xml.contains("role='outer'"), "{xml}");
        assert!(xml.contains("role='inner'"), "{xml}");
        assert!(xml.contains("<tag k='type' v='multipolygon'/>"), "{xml}");
    }

    #[rstest]
    fn kml_lists_boundary_and_coverage(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("boulder.kml");
        let tiles = [TileCoord::new(15, 6826, 12345), TileCoord::new(15, 6827, 12346)];
        let coverage = [
            Coverage::of(TileSource::Topo, 15, &tiles),
            Coverage::of(TileSource::Usgs, 15, &[]),
        ];
        write_kml(&path, &region(SQUARE), &coverage).expect("kml written");
        let kml = std::fs::read_to_string(path.as_std_path()).expect("read kml");
        assert!(kml.contains("<name>boulder county</name>"), "{kml}");
        assert!(kml.contains("<name>Topo15</name>"), "{kml}");
        assert!(!kml.contains("<name>USGS15</name>"), "empty coverage is skipped");
        assert!(kml.trim_end().ends_with("</kml>"), "{kml}");
    }

    #[rstest]
    fn outputs_create_missing_parent_directories(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let boundary = root.join("nested/out/boulder-boundary.osm");
        let kml = root.join("other/boulder.kml");
        write_boundary(
            &boundary,
            &region(SQUARE),
            OsmWriterConfig::default(),
            TagMapper::builtin(),
        )
        .expect("boundary written");
        write_kml(&kml, &region(SQUARE), &[]).expect("kml written");
        assert!(tiler_fs::file_exists(&boundary));
        assert!(tiler_fs::file_exists(&kml));
    }

    #[rstest]
    fn outputs_report_unwritable_paths(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let blocker = root.join("blocker");
        tiler_fs::write_file(&blocker, b"not a directory").expect("write blocker");

        let err = write_boundary(
            &blocker.join("boundary.osm"),
            &region(SQUARE),
            OsmWriterConfig::default(),
            TagMapper::builtin(),
        )
        .expect_err("parent is a file");
        assert!(matches!(err, OsmWriteError::Write(_)), "{err:?}");
        write_kml(&blocker.join("region.kml"), &region(SQUARE), &[])
            .expect_err("parent is a file");
    }

    #[rstest]
    fn coverage_extent_spans_tile_bounds() {
        let tiles = [TileCoord::new(15, 6826, 12345), TileCoord::new(15, 6827, 12346)];
        let extent = Coverage::of(TileSource::Topo, 15, &tiles)
            .extent
            .expect("non-empty");
        let first = TileCoord::new(15, 6826, 12345).bounds();
        let last = TileCoord::new(15, 6827, 12346).bounds();
        assert_eq!(extent.min_lon, first.min_lon);
        assert_eq!(extent.max_lat, first.max_lat);
        assert_eq!(extent.max_lon, last.max_lon);
        assert_eq!(extent.min_lat, last.min_lat);
    }
}
