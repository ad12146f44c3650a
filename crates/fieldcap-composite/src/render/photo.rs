use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::layout::ImagePlacement;
use crate::types::Rotation;

/// Stretch the source photo into the placement box, rotate it about the box
/// center, and draw it onto the target.
pub fn draw_photo(target: &mut RgbaImage, source: &DynamicImage, placement: &ImagePlacement) {
    let box_width = placement.width.round().max(1.0) as u32;
    let box_height = placement.height.round().max(1.0) as u32;

    let stretched = source
        .resize_exact(box_width, box_height, FilterType::Triangle)
        .to_rgba8();

    let rotated = match placement.rotation {
        Rotation::None => stretched,
        Rotation::Clockwise90 => imageops::rotate90(&stretched),
        Rotation::Clockwise180 => imageops::rotate180(&stretched),
        Rotation::Clockwise270 => imageops::rotate270(&stretched),
    };

    // Rotation keeps the center fixed
    let rect = placement.rect();
    let x = (rect.center_x() - rotated.width() as f32 / 2.0).round() as i64;
    let y = (rect.center_y() - rotated.height() as f32 / 2.0).round() as i64;

    imageops::overlay(target, &rotated, x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::image_placement;
    use crate::types::CanvasSize;
    use image::Rgba;

    /// 2x1 source: red on the left, blue on the right
    fn two_tone() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_unrotated_photo_covers_canvas() {
        let canvas = CanvasSize::new(40, 20);
        let mut target = RgbaImage::new(40, 20);
        draw_photo(&mut target, &two_tone(), &image_placement(canvas, Rotation::None));

        assert_eq!(target.get_pixel(0, 10)[0], 255);
        assert_eq!(target.get_pixel(39, 10)[2], 255);
        assert_eq!(target.get_pixel(20, 0)[3], 255);
    }

    #[test]
    fn test_quarter_turn_covers_canvas() {
        let canvas = CanvasSize::new(20, 40);
        let mut target = RgbaImage::new(20, 40);
        draw_photo(
            &mut target,
            &two_tone(),
            &image_placement(canvas, Rotation::Clockwise90),
        );

        // After a clockwise turn the left (red) half ends up on top
        assert_eq!(target.get_pixel(10, 0)[0], 255);
        assert_eq!(target.get_pixel(10, 39)[2], 255);
        // Every corner is covered
        for (x, y) in [(0, 0), (19, 0), (0, 39), (19, 39)] {
            assert_eq!(target.get_pixel(x, y)[3], 255);
        }
    }
}
