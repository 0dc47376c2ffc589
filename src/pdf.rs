use lopdf::{content::Operation, Object, StringFormat};
use std::{collections::BTreeMap, io::BufWriter, mem};
use time::OffsetDateTime;

use crate::error::ContextError;

/// One layer of PDF content operations, the layers of a page are merged into its content stream.
#[derive(Debug, Clone, Default)]
pub struct PdfLayer {
    /// The operations drawn by this layer, in order.
    pub(crate) operations: Vec<Operation>,
}

impl PdfLayer {
    /// Encodes the operations, wrapped in their own graphics state, into the bytes of a content stream.
    fn encode(&self) -> Result<Vec<u8>, ContextError> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        // In the PDF specification q/Q isolate the graphics state changes of the layer
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations.iter().cloned());
        operations.push(Operation::new("Q", vec![]));

        lopdf::content::Content { operations }
            .encode()
            .map_err(|error| ContextError::with_error("Failed to encode PDF layer content", &error))
    }
}

/// How the bytes of an image are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// Baseline JPEG data, embedded as is.
    Dct,
    /// Raw 8-bit RGB samples, compressed when the document is written.
    Raw,
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels (original width, not scaled width).
    pub width: u32,
    /// Height of the image in pixels (original height, not scaled height).
    pub height: u32,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    pub filter: ImageFilter,
    /// The actual data from the image.
    pub image_data: Vec<u8>,
}

/// `XObject`s are parts of the PDF specification which allow for complex content such as images
/// to be referenced from the pages. Only images are supported.
#[derive(Debug, Clone)]
pub enum XObject {
    Image(ImageXObject),
}

impl From<XObject> for lopdf::Object {
    fn from(value: XObject) -> Self {
        use lopdf::Object::*;

        match value {
            XObject::Image(image) => {
                let mut dictionary = lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("XObject".into())),
                    ("Subtype", Name("Image".into())),
                    ("Width", Integer(image.width as i64)),
                    ("Height", Integer(image.height as i64)),
                    ("ColorSpace", Name("DeviceRGB".into())),
                    ("BitsPerComponent", Integer(8)),
                    ("Interpolate", Boolean(image.interpolate)),
                ]);
                let stream = match image.filter {
                    ImageFilter::Dct => {
                        dictionary.set("Filter", Name("DCTDecode".into()));
                        // JPEG data is already compressed
                        lopdf::Stream::new(dictionary, image.image_data).with_compression(false)
                    }
                    ImageFilter::Raw => lopdf::Stream::new(dictionary, image.image_data),
                };
                Stream(stream)
            }
        }
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The association between the `XObject`s names and the `XObject`s themselves.
#[derive(Default, Debug, Clone)]
pub struct XObjectMap(BTreeMap<XObjectReference, XObject>);

impl XObjectMap {
    fn add(&mut self, object: XObject) -> XObjectReference {
        let reference = XObjectReference::new(self.0.len());
        self.0.insert(reference.clone(), object);
        reference
    }

    /// Inserts the `XObject`s into the document, simultaneously constructing a PDF dictionary of them.
    fn into_with_document(self, document: &mut lopdf::Document) -> lopdf::Dictionary {
        self.0
            .into_iter()
            .map(|(reference, object)| {
                let object_id = document.add_object(lopdf::Object::from(object));
                (reference.0, lopdf::Object::Reference(object_id))
            })
            .collect()
    }
}

/// The representation of a PDF page, whose content is inserted into the document when it is written.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    pub layers: Vec<PdfLayer>,
    /// External objects used in this page.
    pub(crate) xobjects: XObjectMap,
}

/// Converts millimeters to points. This function is used in order to present the data
/// in the format required by the PDF specification, while the end user might want to work in
/// millimeters which are easier to reason about.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// A PDF document under construction: pages, their layers and the metadata needed to write it.
pub struct PdfDocument {
    /// The underlying PDF document, only filled in when `write_all` is called.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The title written into the document information dictionary.
    pub title: String,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` on version 1.5 of the PDF specification.
    ///
    /// # Arguments
    ///
    /// * `pdf_document_identifier` - The identifier to be given to the PDF document.
    /// * `title` - The title shown by PDF viewers.
    pub fn new(pdf_document_identifier: String, title: String) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            title,
            pages: Vec::new(),
        }
    }

    /// Adds a page of given width and height in millimeters with an empty layer for contents to be added to.
    /// Returns the index of the page and of the layer in the page, to be passed to the drawing functions.
    pub fn add_page_with_layer(&mut self, page_width: f32, page_height: f32) -> (usize, usize) {
        self.pages.push(PdfPage {
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            layers: vec![PdfLayer::default()],
            xobjects: XObjectMap::default(),
        });

        (self.pages.len() - 1, 0)
    }

    /// Draws an image onto the given layer of the given page.
    ///
    /// # Arguments
    ///
    /// * `page_index` - The index of the page to draw to (should be previously obtained).
    /// * `layer_index` - The index of the layer to draw to (should be previously obtained).
    /// * `image` - The image to be drawn.
    /// * `position` - The top left corner of the image, in millimeters from the top left corner of the page.
    /// * `size` - The width and height of the drawn image in millimeters.
    pub fn add_image_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        image: ImageXObject,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        let pdf_page = self
            .pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))?;
        let page_height = pdf_page.height;
        let reference = pdf_page.xobjects.add(XObject::Image(image));

        let [x, y] = position;
        let [width, height] = size;
        let (width, height) = (millimeters_to_points(width), millimeters_to_points(height));
        // PDF coordinates grow upwards from the bottom left corner
        let bottom = page_height - millimeters_to_points(y) - height;

        let pdf_layer = pdf_page
            .layers
            .get_mut(layer_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the layer with index {}",
                layer_index
            )))?;
        pdf_layer.operations.extend([
            Operation::new("q", vec![]),
            // Scale the unit square the image is drawn in to its final size and place it
            Operation::new(
                "cm",
                vec![
                    Object::Real(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height),
                    Object::Real(millimeters_to_points(x)),
                    Object::Real(bottom),
                ],
            ),
            Operation::new("Do", vec![Object::Name(reference.name().as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Write the pages so far specified into the underlying document and finalize it.
    ///
    /// # Arguments
    ///
    /// * `instance_id` - The second half of the PDF `ID` pair, identifying this particular save.
    pub fn write_all(&mut self, instance_id: String) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let timestamp = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            ("CreationDate", String(timestamp.clone().into_bytes(), Literal)),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
            ("Title", text_string(&self.title)),
            ("Creator", String("laporan".to_string().into_bytes(), Literal)),
            ("Producer", String("laporan".to_string().into_bytes(), Literal)),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in mem::take(&mut self.pages) {
            let media_box: Vec<lopdf::Object> = vec![
                Integer(0),
                Integer(0),
                Real(page.width),
                Real(page.height),
            ];
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                ("MediaBox", Array(media_box.clone())),
                ("TrimBox", Array(media_box.clone())),
                ("CropBox", Array(media_box)),
                ("Parent", Reference(pages_id)),
            ]);

            // Merge all the layers into one content stream
            let mut merged_layer_streams = Vec::<u8>::new();
            for layer in &page.layers {
                merged_layer_streams.extend(layer.encode()?);
            }
            let page_content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), merged_layer_streams));
            page_dictionary.set("Contents", Reference(page_content_id));

            let xobjects_dictionary = page.xobjects.into_with_document(&mut self.inner_document);
            let mut resource_dictionary = lopdf::Dictionary::new();
            if !xobjects_dictionary.is_empty() {
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }
            let resources_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));
            page_dictionary.set("Resources", Reference(resources_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        self.inner_document.compress();

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }
}

/// Builds a single-page document showing a JPEG image over the whole page.
///
/// # Arguments
///
/// * `jpeg_data` - The encoded JPEG image.
/// * `pixel_size` - The width and height of the image in pixels.
/// * `page_size` - The width and height of the page in millimeters.
/// * `identifier` - The document identifier, also used as first half of the PDF `ID`.
/// * `title` - The title written into the document information.
pub fn single_image_pdf(
    jpeg_data: Vec<u8>,
    pixel_size: [u32; 2],
    page_size: [f32; 2],
    identifier: String,
    title: String,
) -> Result<Vec<u8>, ContextError> {
    let [page_width, page_height] = page_size;
    let [pixel_width, pixel_height] = pixel_size;
    if pixel_width == 0 || pixel_height == 0 {
        return Err(ContextError::with_context("Cannot embed an empty image"));
    }

    let mut pdf_document = PdfDocument::new(identifier.clone(), title);
    let (page_index, layer_index) = pdf_document.add_page_with_layer(page_width, page_height);
    pdf_document.add_image_to_layer_in_page(
        page_index,
        layer_index,
        ImageXObject {
            width: pixel_width,
            height: pixel_height,
            interpolate: true,
            filter: ImageFilter::Dct,
            image_data: jpeg_data,
        },
        [0.0, 0.0],
        [page_width, page_height],
    )?;
    pdf_document.write_all(identifier)?;

    pdf_document.save_to_bytes()
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

/// A 32 characters long hexadecimal identifier, as expected for the PDF `ID` entries.
pub fn document_identifier(seed: &str) -> String {
    // FNV-1a, mixed with the current time so that two exports of the same report differ
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let nanoseconds = OffsetDateTime::now_utc().unix_timestamp_nanos() as u64;
    format!("{:016x}{:016x}", hash, nanoseconds)
}

/// Encodes a PDF text string: ASCII text is kept as a literal string, anything else is written
/// as UTF-16BE behind a byte order mark so that viewers do not read it as PDFDocEncoding.
pub fn text_string(text: &str) -> lopdf::Object {
    if text.is_ascii() {
        return lopdf::Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend(unit.to_be_bytes());
    }
    lopdf::Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a PDF text string back into a Rust string, used when inspecting written documents.
pub fn decode_text_string(object: &lopdf::Object) -> Option<String> {
    let lopdf::Object::String(bytes, _) = object else {
        return None;
    };
    match bytes.strip_prefix(&[0xfe, 0xff]) {
        Some(utf16_bytes) => {
            let units: Vec<u16> = utf16_bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            std::string::String::from_utf16(&units).ok()
        }
        None => std::string::String::from_utf8(bytes.clone()).ok(),
    }
}
