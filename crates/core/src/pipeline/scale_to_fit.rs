use image::imageops::FilterType;
use image::RgbImage;

/// Largest size with the source aspect ratio that fits in `bounds`.
///
/// The height-driven candidate `floor(box_h * width / height)` wins when it
/// fits, ties included; otherwise the width drives. Either side is raised to
/// one pixel when the floor would collapse it, unless the box itself is
/// empty on that axis.
pub fn scale_to_fit(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (width, height) = (u64::from(source.0), u64::from(source.1));
    let (box_w, box_h) = (u64::from(bounds.0), u64::from(bounds.1));
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let w_candidate = box_h * width / height;
    let (w, h) = if w_candidate <= box_w {
        (w_candidate, box_h)
    } else {
        (box_w, box_w * height / width)
    };

    let at_least_one = |v: u64, limit: u64| if limit > 0 { v.max(1) } else { 0 };
    (
        at_least_one(w, box_w) as u32,
        at_least_one(h, box_h) as u32,
    )
}

/// Resizes `image` with bilinear filtering to fit inside `bounds`.
pub fn fit_image(image: &RgbImage, bounds: (u32, u32)) -> RgbImage {
    let (w, h) = scale_to_fit(image.dimensions(), bounds);
    if (w, h) == image.dimensions() {
        return image.clone();
    }
    if w == 0 || h == 0 {
        return RgbImage::new(w, h);
    }
    image::imageops::resize(image, w, h, FilterType::Triangle)
}
