use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, Array3, Array4, Axis};
use thiserror::Error;

pub const INPUT_SIZE: u32 = 224;
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Error reading image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image is empty")]
    Empty,
}

pub fn decode_image(image_data: &[u8]) -> Result<RgbImage, PreprocessError> {
    let image_reader =
        image::ImageReader::new(std::io::Cursor::new(image_data)).with_guessed_format()?;

    let img = image_reader.decode()?.to_rgb8();
    if img.width() == 0 || img.height() == 0 {
        return Err(PreprocessError::Empty);
    }

    Ok(img)
}

/// Resizes to `INPUT_SIZE` square and normalizes into a `3 x 224 x 224` tensor.
pub fn image_to_tensor(img: &RgbImage) -> Array3<f32> {
    let resized;
    let img = if img.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
        img
    } else {
        resized = image::imageops::resize(img, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        &resized
    };

    let size = INPUT_SIZE as usize;
    let mut input = Array::zeros((3, size, size));
    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            input[[c, y, x]] = ((pixel[c] as f32) / 255. - MEAN[c]) / STD[c];
        }
    }

    input
}

pub fn images_to_batch(images: &[RgbImage]) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let mut batch = Array::zeros((images.len(), 3, size, size));
    for (mut slot, img) in batch.axis_iter_mut(Axis(0)).zip(images) {
        slot.assign(&image_to_tensor(img));
    }
    batch
}
