//! Box format conversion and Intersection over Union (`IoU`).

use crate::types::BoundingBox;

/// Added to the union so degenerate boxes never divide by zero.
pub const IOU_EPS: f64 = 1e-16;

/// Bounding box in [x_center, y_center, width, height] format
pub type BBoxXYWH = [f64; 4];

/// Bounding box in [x1, y1, x2, y2] format
pub type BBoxXYXY = [f64; 4];

/// Convert a bounding box from center/size to corner form.
///
/// No clipping is applied: a box hanging over the image edge keeps its
/// out-of-range corners.
///
/// # Examples
///
/// ```
/// # use fedeval::geometry::to_corner;
/// let xyxy = to_corner([0.5, 0.5, 0.2, 0.4]);
/// assert!((xyxy[0] - 0.4).abs() < 1e-12);
/// assert!((xyxy[3] - 0.7).abs() < 1e-12);
/// ```
#[must_use]
pub fn to_corner(bbox: BBoxXYWH) -> BBoxXYXY {
    let [x, y, w, h] = bbox;
    [
        x - w / 2.0, // x1
        y - h / 2.0, // y1
        x + w / 2.0, // x2
        y + h / 2.0, // y2
    ]
}

/// Convert a bounding box from corner to center/size form.
#[must_use]
pub fn to_center_size(bbox: BBoxXYXY) -> BBoxXYWH {
    let [x1, y1, x2, y2] = bbox;
    [(x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1]
}

/// `IoU` between two boxes.
///
/// The union carries [`IOU_EPS`], so two zero-area boxes give 0.0 instead of NaN.
///
/// # Examples
///
/// ```
/// use fedeval::geometry::box_iou;
/// use fedeval::types::BoundingBox;
///
/// let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
/// let b = BoundingBox::new(0.25, 0.25, 0.75, 0.75);
/// let iou = box_iou(&a, &b);
/// assert!((iou - 1.0 / 7.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn box_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = inter_w * inter_h;

    let union = a.area() + b.area() - intersection + IOU_EPS;
    intersection / union
}

/// `IoU` of one box against each box of a slice.
///
/// Returns one value per element of `boxes`, in order; an empty slice gives
/// an empty vector.
#[must_use]
pub fn iou(a: &BoundingBox, boxes: &[BoundingBox]) -> Vec<f64> {
    boxes.iter().map(|b| box_iou(a, b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_corner() {
        let xyxy = to_corner([0.5, 0.5, 0.2, 0.2]);
        let expected = [0.4, 0.4, 0.6, 0.6];
        for i in 0..4 {
            assert!((xyxy[i] - expected[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_to_corner_does_not_clip() {
        let xyxy = to_corner([0.0, 1.0, 0.4, 0.4]);
        assert!(xyxy[0] < 0.0);
        assert!(xyxy[3] > 1.0);
    }

    #[test]
    fn test_identical_boxes() {
        let a = BoundingBox::new(0.1, 0.1, 0.5, 0.5);
        assert!((box_iou(&a, &a) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_no_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 0.1, 0.1);
        let b = BoundingBox::new(0.5, 0.5, 0.6, 0.6);
        assert_eq!(box_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_touching_edges() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let b = BoundingBox::new(0.5, 0.0, 1.0, 0.5);
        assert_eq!(box_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_degenerate_boxes() {
        let point = BoundingBox::new(0.3, 0.3, 0.3, 0.3);
        let iou = box_iou(&point, &point);
        assert_eq!(iou, 0.0);
        assert!(!iou.is_nan());
    }

    #[test]
    fn test_iou_against_many() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 0.5, 0.5),
            BoundingBox::new(0.6, 0.6, 0.9, 0.9),
            BoundingBox::new(0.0, 0.0, 0.5, 0.25),
        ];
        let ious = iou(&a, &boxes);
        assert_eq!(ious.len(), 3);
        assert!((ious[0] - 1.0).abs() < 1e-10);
        assert_eq!(ious[1], 0.0);
        assert!((ious[2] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_iou_empty() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        assert!(iou(&a, &[]).is_empty());
    }
}
