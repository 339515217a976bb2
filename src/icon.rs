// Copyright 2023 The Dockbar Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Button icons: PNG images and SVG documents.

use std::{error::Error as StdError, fmt, fs, io, path::Path};

use kurbo::Rect;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapMut, PixmapPaint, Transform};

/// First bytes of every PNG file.
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Something that can paint itself into a button.
pub trait Icon: fmt::Debug {
    /// Paint into `area`, given in buffer pixels.
    fn paint(&self, pixmap: &mut PixmapMut<'_>, area: Rect);
}

/// Load the image at `path`. PNG files are recognised by their signature;
/// anything else has to parse as SVG.
pub fn open(path: &Path) -> Result<Box<dyn Icon>, IconError> {
    let data = fs::read(path).map_err(IconError::Io)?;
    if data.starts_with(&PNG_MAGIC) {
        tracing::debug!(path = %path.display(), "loading png icon");
        return Ok(Box::new(RasterIcon::decode_png(&data)?));
    }

    let mut options = usvg::Options::default();
    options.resources_dir = path.parent().map(Path::to_path_buf);
    tracing::debug!(path = %path.display(), "loading svg icon");
    Ok(Box::new(SvgIcon::parse(&data, &options)?))
}

/// A decoded raster image, stretched over the area it is painted into.
pub struct RasterIcon {
    pixmap: Pixmap,
}

impl RasterIcon {
    pub fn decode_png(data: &[u8]) -> Result<Self, IconError> {
        let image = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(IconError::Png)?
            .into_rgba8();
        Self::from_rgba(image.width(), image.height(), image.as_raw()).ok_or(IconError::Empty)
    }

    /// Build from straight-alpha RGBA pixels. `None` for an empty image.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Some(Self { pixmap })
    }
}

impl fmt::Debug for RasterIcon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RasterIcon")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}

impl Icon for RasterIcon {
    fn paint(&self, pixmap: &mut PixmapMut<'_>, area: Rect) {
        if area.width() <= 0. || area.height() <= 0. {
            return;
        }
        let sx = area.width() / self.pixmap.width() as f64;
        let sy = area.height() / self.pixmap.height() as f64;
        let transform = Transform::from_row(
            sx as f32,
            0.,
            0.,
            sy as f32,
            area.x0 as f32,
            area.y0 as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, self.pixmap.as_ref(), &paint, transform, None);
    }
}

/// A parsed SVG document, rendered at whatever size it is painted at.
pub struct SvgIcon {
    tree: usvg::Tree,
}

impl SvgIcon {
    pub fn parse(data: &[u8], options: &usvg::Options) -> Result<Self, IconError> {
        let tree = usvg::Tree::from_data(data, options).map_err(|e| match e {
            usvg::Error::NotAnUtf8Str | usvg::Error::ParsingFailed(_) => IconError::Unsupported,
            e => IconError::Svg(e),
        })?;
        Ok(Self { tree })
    }
}

impl fmt::Debug for SvgIcon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let size = self.tree.size();
        f.debug_struct("SvgIcon")
            .field("width", &size.width())
            .field("height", &size.height())
            .finish()
    }
}

impl Icon for SvgIcon {
    /// The document keeps its aspect ratio and is centred in `area`.
    fn paint(&self, pixmap: &mut PixmapMut<'_>, area: Rect) {
        let size = self.tree.size();
        let (width, height) = (size.width() as f64, size.height() as f64);
        if area.width() <= 0. || area.height() <= 0. || width <= 0. || height <= 0. {
            return;
        }
        let scale = (area.width() / width).min(area.height() / height);
        let x = area.x0 + (area.width() - width * scale) / 2.;
        let y = area.y0 + (area.height() - height * scale) / 2.;
        let transform =
            Transform::from_scale(scale as f32, scale as f32).post_translate(x as f32, y as f32);
        resvg::render(&self.tree, transform, pixmap);
    }
}

#[derive(Debug)]
pub enum IconError {
    Io(io::Error),
    Png(image::ImageError),
    Svg(usvg::Error),
    /// The image has no pixels.
    Empty,
    /// Neither a PNG file nor an SVG document.
    Unsupported,
}

impl fmt::Display for IconError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Png(e) => write!(f, "invalid png: {e}"),
            Self::Svg(e) => write!(f, "invalid svg: {e}"),
            Self::Empty => write!(f, "image is empty"),
            Self::Unsupported => write!(f, "unsupported file type, expected png or svg"),
        }
    }
}

impl StdError for IconError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Png(e) => Some(e),
            Self::Svg(e) => Some(e),
            Self::Empty | Self::Unsupported => None,
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::render::paint_argb8888;

    const SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4">
  <rect x="0" y="0" width="4" height="4" fill="#0000ff"/>
</svg>"##;

    fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dockbar-icon-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn raster_paints_into_area_only() {
        let icon = RasterIcon::from_rgba(1, 1, &[0, 255, 0, 255]).unwrap();
        let mut data = vec![0u8; 8 * 8 * 4];
        assert!(paint_argb8888(&mut data, 8, 8, |pixmap| {
            icon.paint(pixmap, Rect::new(2., 2., 6., 6.));
        }));
        assert_eq!(pixel(&data, 8, 3, 3), [0, 255, 0, 255]);
        assert_eq!(pixel(&data, 8, 1, 1), [0, 0, 0, 0]);
        assert_eq!(pixel(&data, 8, 6, 6), [0, 0, 0, 0]);
    }

    #[test]
    fn svg_is_scaled_and_centred() {
        let icon = SvgIcon::parse(SQUARE_SVG.as_bytes(), &usvg::Options::default()).unwrap();
        let mut data = vec![0u8; 16 * 8 * 4];
        assert!(paint_argb8888(&mut data, 16, 8, |pixmap| {
            icon.paint(pixmap, Rect::new(0., 0., 16., 8.));
        }));
        // An 8x8 square in the middle of the 16x8 area.
        assert_eq!(pixel(&data, 16, 8, 4), [255, 0, 0, 255]);
        assert_eq!(pixel(&data, 16, 5, 4), [255, 0, 0, 255]);
        assert_eq!(pixel(&data, 16, 1, 4), [0, 0, 0, 0]);
        assert_eq!(pixel(&data, 16, 14, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn opens_by_contents() {
        let svg = temp_file("icon.svg", SQUARE_SVG.as_bytes());
        let icon = open(&svg).unwrap();
        assert!(format!("{icon:?}").starts_with("SvgIcon"));

        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        // The extension does not matter, the signature does.
        let png = temp_file("icon.svg.png-really", &png);
        let icon = open(&png).unwrap();
        assert!(format!("{icon:?}").starts_with("RasterIcon"));

        let text = temp_file("notes.txt", b"just some words");
        assert!(matches!(open(&text), Err(IconError::Unsupported)));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            open(Path::new("/nonexistent/dockbar-icon.png")),
            Err(IconError::Io(_))
        ));
    }
}
