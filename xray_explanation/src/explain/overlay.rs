use base64::{engine::general_purpose::STANDARD, Engine};
use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Jet color map: dark blue at 0 through cyan, yellow to dark red at 255.
pub fn jet(value: u8) -> Rgb<u8> {
    let x = value as f32 / 255.0;
    let channel = |offset: f32| {
        let v = (1.5 - (4.0 * x - offset).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// `alpha * image + (1 - alpha) * jet(mask)`, per channel, saturating.
pub fn blend_heatmap(image: &RgbImage, mask: &GrayImage, alpha: f32) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let original = image.get_pixel(x, y);
        let heat = jet(mask.get_pixel(x, y)[0]);
        Rgb(std::array::from_fn(|c| {
            let v = alpha * original[c] as f32 + (1.0 - alpha) * heat[c] as f32;
            v.round().clamp(0.0, 255.0) as u8
        }))
    })
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

pub fn to_data_uri(image: &RgbImage) -> Result<String, image::ImageError> {
    let png = encode_png(image)?;
    Ok(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(png)))
}
