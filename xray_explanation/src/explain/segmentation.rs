//! SLIC superpixels: k-means over (L, a, b, x, y) with each center searching
//! only a `2S x 2S` window, followed by a connectivity pass.

use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::ArrayView1;

const UNASSIGNED: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Center {
    lab: [f32; 3],
    x: f32,
    y: f32,
}

/// Superpixel id of every pixel, row-major, ids dense in `0..count`.
#[derive(Debug, Clone)]
pub struct Segmentation {
    width: u32,
    height: u32,
    labels: Vec<usize>,
    count: usize,
}

impl Segmentation {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label_at(&self, x: u32, y: u32) -> usize {
        self.labels[(y * self.width + x) as usize]
    }

    /// Copies `image`, blacking out every superpixel whose presence is off.
    pub fn perturb(&self, image: &RgbImage, presence: ArrayView1<'_, f64>) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            if presence[self.label_at(x, y)] > 0.5 {
                *image.get_pixel(x, y)
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    /// 255 on the selected superpixels, 0 elsewhere.
    pub fn mask(&self, selected: &[usize]) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if selected.contains(&self.label_at(x, y)) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

pub fn slic(
    image: &RgbImage,
    num_segments: usize,
    compactness: f32,
    max_iter: usize,
) -> Segmentation {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let n = w * h;

    let lab: Vec<[f32; 3]> = image.pixels().map(|p| rgb_to_lab(p.0)).collect();

    let k = num_segments.clamp(1, n.max(1));
    let step = ((n as f32) / (k as f32)).sqrt().max(1.0);
    let mut centers = grid_centers(&lab, w, h, step);

    let spatial_scale = (compactness / step).powi(2);
    let mut labels = vec![UNASSIGNED; n];
    let mut distances = vec![f32::INFINITY; n];

    for _ in 0..max_iter {
        distances.fill(f32::INFINITY);

        for (ci, center) in centers.iter().enumerate() {
            let x0 = (center.x - step).floor().max(0.0) as usize;
            let x1 = ((center.x + step).ceil() as usize).min(w - 1);
            let y0 = (center.y - step).floor().max(0.0) as usize;
            let y1 = ((center.y + step).ceil() as usize).min(h - 1);

            for y in y0..=y1 {
                for x in x0..=x1 {
                    let idx = y * w + x;
                    let color = color_distance(&lab[idx], &center.lab);
                    let dx = x as f32 - center.x;
                    let dy = y as f32 - center.y;
                    let d = color + (dx * dx + dy * dy) * spatial_scale;
                    if d < distances[idx] {
                        distances[idx] = d;
                        labels[idx] = ci;
                    }
                }
            }
        }

        let mut sums = vec![[0f64; 5]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (idx, &label) in labels.iter().enumerate() {
            if label == UNASSIGNED {
                continue;
            }
            let s = &mut sums[label];
            s[0] += lab[idx][0] as f64;
            s[1] += lab[idx][1] as f64;
            s[2] += lab[idx][2] as f64;
            s[3] += (idx % w) as f64;
            s[4] += (idx / w) as f64;
            counts[label] += 1;
        }
        for ((center, s), &count) in centers.iter_mut().zip(&sums).zip(&counts) {
            if count == 0 {
                continue;
            }
            let c = count as f64;
            center.lab = [(s[0] / c) as f32, (s[1] / c) as f32, (s[2] / c) as f32];
            center.x = (s[3] / c) as f32;
            center.y = (s[4] / c) as f32;
        }
    }

    for (idx, label) in labels.iter_mut().enumerate() {
        if *label == UNASSIGNED {
            *label = nearest_center(&centers, (idx % w) as f32, (idx / w) as f32);
        }
    }

    let min_size = ((step * step) / 4.0) as usize;
    let (labels, count) = enforce_connectivity(&labels, w, h, min_size.max(1));

    Segmentation {
        width,
        height,
        labels,
        count,
    }
}

fn grid_centers(lab: &[[f32; 3]], w: usize, h: usize, step: f32) -> Vec<Center> {
    let mut centers = Vec::new();
    let mut y = step / 2.0;
    while y < h as f32 {
        let mut x = step / 2.0;
        while x < w as f32 {
            let idx = (y as usize) * w + x as usize;
            centers.push(Center { lab: lab[idx], x, y });
            x += step;
        }
        y += step;
    }

    if centers.is_empty() {
        let (x, y) = (w / 2, h / 2);
        centers.push(Center {
            lab: lab[y * w + x],
            x: x as f32,
            y: y as f32,
        });
    }
    centers
}

fn nearest_center(centers: &[Center], x: f32, y: f32) -> usize {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, (c.x - x).powi(2) + (c.y - y).powi(2)))
        .reduce(|best, item| if item.1 < best.1 { item } else { best })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Relabels 4-connected components densely in raster order. Components smaller
/// than `min_size` are absorbed by the component touching their first pixel.
fn enforce_connectivity(labels: &[usize], w: usize, h: usize, min_size: usize) -> (Vec<usize>, usize) {
    let n = w * h;
    let mut relabeled = vec![UNASSIGNED; n];
    let mut next = 0;
    let mut stack = Vec::new();
    let mut component = Vec::new();

    for start in 0..n {
        if relabeled[start] != UNASSIGNED {
            continue;
        }

        let adjacent = neighbors(start, w, h).find_map(|nb| {
            let label = relabeled[nb];
            (label != UNASSIGNED).then_some(label)
        });

        relabeled[start] = next;
        stack.clear();
        component.clear();
        stack.push(start);
        component.push(start);
        while let Some(p) = stack.pop() {
            for nb in neighbors(p, w, h) {
                if relabeled[nb] == UNASSIGNED && labels[nb] == labels[start] {
                    relabeled[nb] = next;
                    stack.push(nb);
                    component.push(nb);
                }
            }
        }

        match adjacent {
            Some(adjacent) if component.len() < min_size => {
                for &p in &component {
                    relabeled[p] = adjacent;
                }
            }
            _ => next += 1,
        }
    }

    (relabeled, next)
}

fn neighbors(idx: usize, w: usize, h: usize) -> impl Iterator<Item = usize> {
    let (x, y) = (idx % w, idx / w);
    [
        (x > 0).then(|| idx - 1),
        (y > 0).then(|| idx - w),
        (x + 1 < w).then(|| idx + 1),
        (y + 1 < h).then(|| idx + w),
    ]
    .into_iter()
    .flatten()
}

fn color_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB to CIELAB under the D65 white point.
fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(srgb_to_linear);

    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = (0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b) / 1.088_83;

    let f = |t: f32| {
        if t > 0.008_856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    };
    let (fx, fy, fz) = (f(x), f(y), f(z));

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}
