use axum::{
    body::Body,
    http::{header, Request},
};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, ArrayView4, Axis};
use std::io::Cursor;
use xray_model::{ModelError, ModelService};

pub const BOUNDARY: &str = "xray-test-boundary";

pub const LABELS: [&str; 5] = [
    "Viral Pneumonia",
    "Bacterial Pneumonia",
    "COVID",
    "Tuberculosis",
    "Normal",
];

/// Scores each class by how close the mean normalized intensity is to a
/// class-specific anchor, so different images land on different classes.
#[derive(Clone)]
pub struct IntensityModel {
    pub num_classes: usize,
}

impl ModelService for IntensityModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        let n = input.shape()[0];
        let mut logits = Array2::zeros((n, self.num_classes));
        for (i, sample) in input.axis_iter(Axis(0)).enumerate() {
            let mean = sample.mean().unwrap_or(0.0);
            for c in 0..self.num_classes {
                let anchor = -2.0 + 4.0 * c as f32 / (self.num_classes.max(2) - 1) as f32;
                logits[[i, c]] = -(mean - anchor).powi(2);
            }
        }
        Ok(logits)
    }
}

#[derive(Clone)]
pub struct FailingModel;

impl ModelService for FailingModel {
    fn forward(&self, _input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        Err(ModelError::Shape("backend unavailable".to_string()))
    }
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgb([v, v, v])
    });
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

pub fn multipart_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"xray.jpg\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
