use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::MapError;
use crate::geometry::Cell;
use crate::grid::{CellState, OccupancyGrid};

const PGM_OPEN: u8 = 255;
const PGM_UNKNOWN: u8 = 205;
const PGM_OBSTACLE: u8 = 0;


/// ROS map_server metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    /// PGM image, relative to the YAML file
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub resolution: f32,
    /// [x, y, yaw] of the lower-left pixel
    pub origin: [f32; 3],
    #[serde(default)]
    pub negate: i32,
    #[serde(default = "default_occupied_thresh")]
    pub occupied_thresh: f32,
    #[serde(default = "default_free_thresh")]
    pub free_thresh: f32,
}

fn default_occupied_thresh() -> f32 {
    0.65
}

fn default_free_thresh() -> f32 {
    0.25
}


/// Load an occupancy grid from a ROS map YAML and its PGM
/// Any non-zero pixel is open space
pub fn load_ros_map<P: AsRef<Path>>(yaml_path: P) -> Result<OccupancyGrid, MapError> {
    let yaml_path = yaml_path.as_ref();
    let metadata: MapMetadata = serde_yaml::from_str(&fs::read_to_string(yaml_path)?)?;

    let yaml_dir = yaml_path.parent().unwrap_or(Path::new("."));
    let pgm_path = yaml_dir.join(&metadata.image);
    let pixels = image::open(&pgm_path)?.into_luma8();

    let cells = pixels.pixels()
        .map(|p| if p.0[0] > 0 { CellState::Open } else { CellState::Obstacle })
        .collect();
    let mut grid = OccupancyGrid::from_cells(pixels.width() as usize, pixels.height() as usize, metadata.resolution, cells)?;
    grid.m_width = metadata.origin[0].abs() * 2.0;
    grid.m_height = metadata.origin[1].abs() * 2.0;

    info!(
        "Loaded map {} ({}x{} px, {} m/px)",
        pgm_path.display(), grid.width(), grid.height(), grid.resolution
    );
    Ok(grid)
}


/// Parse the text grid format
///
/// ```text
/// 0.05
/// 2 3
/// 0,0,1
/// 1,0,0
/// ```
/// First line is the resolution, second `rows cols`, then one line per row
/// with 0 for open space and 1 for an obstacle.
pub fn parse_text_grid(text: &str) -> Result<OccupancyGrid, MapError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let resolution: f32 = next_line(&mut lines, "resolution")?
        .parse()
        .map_err(|e| MapError::Parse(format!("bad resolution: {e}")))?;

    let dims = next_line(&mut lines, "dimensions")?;
    let mut dims = dims.split_whitespace().map(|v| v.parse::<usize>());
    let (Some(Ok(rows)), Some(Ok(cols))) = (dims.next(), dims.next()) else {
        return Err(MapError::Parse("expected `rows cols` on the second line".into()));
    };

    // the header is untrusted, rows grow the buffer as they are read
    cols.checked_mul(rows).ok_or(MapError::TooLarge { width: cols, height: rows })?;
    let mut cells = Vec::new();
    for row in 0..rows {
        let line = next_line(&mut lines, "grid row")?;
        let before = cells.len();
        for value in line.split(',') {
            cells.push(match value.trim() {
                "0" => CellState::Open,
                "1" => CellState::Obstacle,
                other => return Err(MapError::Parse(format!("row {row}: unexpected value {other:?}"))),
            });
        }
        if cells.len() - before != cols {
            return Err(MapError::Dimensions { expected: cols, found: cells.len() - before });
        }
    }

    let mut grid = OccupancyGrid::from_cells(cols, rows, resolution, cells)?;
    grid.m_width = (resolution + 0.005) * cols as f32;
    grid.m_height = (resolution + 0.005) * rows as f32;
    Ok(grid)
}

fn next_line<'a>(lines: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str, MapError> {
    lines.next().ok_or_else(|| MapError::Parse(format!("missing {what}")))
}


/// Write `<title>.pgm` and `<title>.yaml` into `dir`
/// Returns the YAML path
pub fn save_ros_map<P: AsRef<Path>>(grid: &OccupancyGrid, dir: P, title: &str) -> Result<PathBuf, MapError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let pgm_path = dir.join(format!("{title}.pgm"));
    let pixels: Vec<u8> = grid.iter()
        .map(|(_, state)| match state {
            CellState::Obstacle => PGM_OBSTACLE,
            CellState::Open => PGM_OPEN,
            _ => PGM_UNKNOWN,
        })
        .collect();
    let writer = BufWriter::new(fs::File::create(&pgm_path)?);
    PnmEncoder::new(writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(&pixels, grid.width() as u32, grid.height() as u32, ExtendedColorType::L8)?;

    let metadata = MapMetadata {
        image: format!("{title}.pgm"),
        mode: None,
        resolution: grid.resolution,
        origin: [-grid.m_width / 2.0, -grid.m_height / 2.0, 0.0],
        negate: 0,
        occupied_thresh: default_occupied_thresh(),
        free_thresh: default_free_thresh(),
    };
    let yaml_path = dir.join(format!("{title}.yaml"));
    fs::write(&yaml_path, serde_yaml::to_string(&metadata)?)?;

    debug!("Saved map {} ({}x{})", yaml_path.display(), grid.width(), grid.height());
    Ok(yaml_path)
}


/// Colour of a cell in overlay images
pub fn state_color(state: CellState) -> Rgb<u8> {
    match state {
        CellState::Inflated => Rgb([1, 1, 1]),
        CellState::Obstacle => Rgb([0, 0, 0]),
        CellState::Open => Rgb([255, 255, 255]),
        CellState::NavPoint => Rgb([128, 0, 128]),
        CellState::Travelled => Rgb([173, 216, 230]),
        CellState::Path => Rgb([255, 0, 0]),
    }
}

/// Render a grid with `colors`
pub fn render_grid<F: Fn(CellState) -> Rgb<u8>>(grid: &OccupancyGrid, colors: F) -> RgbImage {
    let mut img = RgbImage::new(grid.width() as u32, grid.height() as u32);
    for (Cell { x, y }, state) in grid.iter() {
        img.put_pixel(x as u32, y as u32, colors(state));
    }
    img
}

/// Save a grid as an image, format taken from the extension
pub fn save_overlay_image<P: AsRef<Path>>(grid: &OccupancyGrid, path: P) -> Result<(), MapError> {
    render_grid(grid, state_color).save(path.as_ref())?;
    debug!("Saved overlay {}", path.as_ref().display());
    Ok(())
}
