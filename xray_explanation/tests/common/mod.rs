use axum::{
    body::Body,
    http::{header, Request},
};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, ArrayView4, Axis};
use std::io::Cursor;
use xray_model::{ModelError, ModelService};

pub const BOUNDARY: &str = "xray-test-boundary";

/// Binary model whose positive logit follows the mean normalized intensity.
#[derive(Clone)]
pub struct BrightnessModel;

impl ModelService for BrightnessModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        let n = input.shape()[0];
        let mut logits = Array2::zeros((n, 2));
        for (i, sample) in input.axis_iter(Axis(0)).enumerate() {
            logits[[i, 1]] = 2.0 * sample.mean().unwrap_or(0.0);
        }
        Ok(logits)
    }
}

/// Succeeds on single images but fails on the batches the explanation sends.
#[derive(Clone)]
pub struct SingleImageOnlyModel;

impl ModelService for SingleImageOnlyModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        if input.shape()[0] > 1 {
            return Err(ModelError::Shape("batch dimension is fixed to 1".to_string()));
        }
        BrightnessModel.forward(input)
    }
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = (64 + (x / 4 + y / 4) % 160) as u8;
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
