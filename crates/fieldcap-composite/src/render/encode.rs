use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::options::EncodeOptions;
use crate::types::Result;

/// Encode an image as JPEG at the given quality (alpha is dropped)
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode_image(&rgb)?;
    Ok(bytes)
}

/// Decode an encoded image from memory
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Downscale to `max_width`, keeping the aspect ratio. Narrower images are
/// returned unchanged.
pub fn resize_for_upload(image: &DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image.clone();
    }
    let height = ((max_width as f64 * image.height() as f64) / image.width() as f64)
        .round()
        .max(1.0) as u32;
    image.resize_exact(max_width, height, FilterType::Triangle)
}

/// Thumbnail fitting inside the configured bounds, JPEG encoded
pub fn make_thumbnail(image: &DynamicImage, options: &EncodeOptions) -> Result<Vec<u8>> {
    let thumb = image.resize(
        options.thumbnail_max_width,
        options.thumbnail_max_height,
        FilterType::Triangle,
    );
    encode_jpeg(&thumb, options.thumbnail_quality)
}

/// Bytes prepared for sending: the (possibly downscaled) composite and its thumbnail
#[derive(Debug, Clone)]
pub struct EncodedComposite {
    pub image_jpeg: Vec<u8>,
    pub thumbnail_jpeg: Vec<u8>,
}

/// Prepare a captured composite for upload
pub fn encode_for_upload(captured_jpeg: &[u8], options: &EncodeOptions) -> Result<EncodedComposite> {
    let image = decode_image(captured_jpeg)?;

    let image_jpeg = match options.upload_max_width {
        Some(max_width) => encode_jpeg(&resize_for_upload(&image, max_width), options.upload_quality)?,
        None => captured_jpeg.to_vec(),
    };

    // Thumbnails are cut from what is actually sent
    let sent = match options.upload_max_width {
        Some(_) => decode_image(&image_jpeg)?,
        None => image,
    };
    let thumbnail_jpeg = make_thumbnail(&sent, options)?;

    Ok(EncodedComposite {
        image_jpeg,
        thumbnail_jpeg,
    })
}

/// `data:image/jpeg;base64,...` URL for a JPEG payload
pub fn to_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}
