//! Searchable PDF writer: one full-page image per page with an invisible
//! text layer on top.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::layout::TextPlacement;
use crate::error::StorageError;
use crate::storage::write_atomic;

/// Predefined Adobe-GB1 font; viewers supply the glyphs.
const FONT_NAME: &str = "STSong-Light";
const FONT_ENCODING: &str = "UniGB-UCS2-H";

/// Text render mode 3: neither fill nor stroke.
const INVISIBLE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// Page background in a form the PDF can embed directly.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    color: ColorSpace,
    /// JPEG data is passed through as `DCTDecode`; raw samples get
    /// Flate-compressed on save.
    jpeg: bool,
    data: Vec<u8>,
}

impl PageImage {
    /// Raw 8-bit samples. Alpha is dropped.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => Self {
                width,
                height,
                color: ColorSpace::Gray,
                jpeg: false,
                data: img.to_luma8().into_raw(),
            },
            _ => Self {
                width,
                height,
                color: ColorSpace::Rgb,
                jpeg: false,
                data: img.to_rgb8().into_raw(),
            },
        }
    }

    /// Keeps the original bytes when they are a gray or RGB JPEG.
    pub fn from_encoded(bytes: Vec<u8>, decoded: &DynamicImage) -> Self {
        let is_jpeg = matches!(image::guess_format(&bytes), Ok(ImageFormat::Jpeg));
        let color = match decoded {
            DynamicImage::ImageLuma8(_) => Some(ColorSpace::Gray),
            DynamicImage::ImageRgb8(_) => Some(ColorSpace::Rgb),
            _ => None,
        };
        match (is_jpeg, color) {
            (true, Some(color)) => Self {
                width: decoded.width(),
                height: decoded.height(),
                color,
                jpeg: true,
                data: bytes,
            },
            _ => Self::from_dynamic(decoded),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.jpeg
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color
    }

    fn into_stream(self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color.name(),
            "BitsPerComponent" => 8,
        };
        if self.jpeg {
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, self.data).with_compression(false)
        } else {
            Stream::new(dict, self.data)
        }
    }
}

/// UCS-2 big-endian hex string for `UniGB-UCS2-H`. Characters outside the
/// BMP become U+FFFD.
pub fn encode_ucs2_hex(text: &str) -> String {
    let mut hex = String::with_capacity(text.len() * 4 + 2);
    hex.push('<');
    for c in text.chars() {
        let code = u32::from(c);
        let unit = if code > 0xFFFF { 0xFFFD } else { code };
        let _ = write!(hex, "{:04X}", unit);
    }
    hex.push('>');
    hex
}

/// Content stream for one page: the image scaled to the full page, then
/// every text run in invisible render mode.
pub fn page_content(width: u32, height: u32, texts: &[TextPlacement]) -> String {
    let mut content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", width, height);
    if texts.is_empty() {
        return content;
    }
    let _ = writeln!(content, "BT\n{} Tr", INVISIBLE);
    for text in texts {
        let _ = writeln!(
            content,
            "/F1 {:.2} Tf\n1 0 0 1 {:.2} {:.2} Tm\n{} Tj",
            text.font_size,
            text.x,
            text.baseline,
            encode_ucs2_hex(&text.text)
        );
    }
    content.push_str("ET\n");
    content
}

/// Accumulates pages of one document, then writes the file in one go.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => FONT_NAME,
            "Flags" => 6,
            "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
            "ItalicAngle" => 0,
            "Ascent" => 880,
            "Descent" => -120,
            "CapHeight" => 880,
            "StemV" => 93,
        });
        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType0",
            "BaseFont" => FONT_NAME,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("GB1"),
                "Supplement" => 2,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            // Half-width Latin CIDs.
            "W" => vec![1.into(), 95.into(), 500.into()],
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => FONT_NAME,
            "Encoding" => FONT_ENCODING,
            "DescendantFonts" => vec![descendant_id.into()],
        });

        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Appends a page sized to the image's pixel dimensions.
    pub fn add_page(&mut self, image: PageImage, texts: &[TextPlacement]) {
        let (width, height) = (image.width, image.height);
        let image_id = self.doc.add_object(Object::Stream(image.into_stream()));

        let content = page_content(width, height, texts);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content.into_bytes())));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => self.font_id },
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
    }

    /// Compresses and writes the document through temp + rename.
    pub fn save(mut self, path: &Path) -> Result<(), StorageError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut doc = self.doc;
        write_atomic(path, |file| {
            doc.save_to(file)
                .map(|_| ())
                .map_err(|e| io::Error::other(e.to_string()))
        })
    }
}
