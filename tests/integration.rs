use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use photolab::filters::adjust_brightness_contrast;
use photolab::segmentation::refine::remove_small_holes;
use photolab::{
    apply_affine, convolve, encode_image, foreground_mask, remove_background, resolve_scene,
    AffineMatrix, BackgroundRemover, Error, Kernel, OutputMode, ReflectAxis, RemovalOptions,
    Scene, SceneType, SegmentationParams,
};

fn gradient_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) * 3 % 256) as u8])
    })
}

/// Uniform gray studio backdrop with an orange block in the middle.
fn studio_photo(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let inside = (size / 4..3 * size / 4).contains(&x) && (size / 4..3 * size / 4).contains(&y);
        if inside {
            Rgb([230, 120, 20])
        } else {
            Rgb([128, 128, 128])
        }
    })
}

/// Enclosed 4-connected background components, by area.
fn enclosed_hole_areas(mask: &GrayImage) -> Vec<u32> {
    use imageproc::region_labelling::{connected_components, Connectivity};
    let (w, h) = mask.dimensions();
    let inverted = GrayImage::from_fn(w, h, |x, y| Luma([255 - mask.get_pixel(x, y)[0]]));
    let labels = connected_components(&inverted, Connectivity::Four, Luma([0u8]));
    let n = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut area = vec![0u32; n + 1];
    let mut open = vec![false; n + 1];
    for (x, y, l) in labels.enumerate_pixels() {
        let l = l[0] as usize;
        area[l] += 1;
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            open[l] = true;
        }
    }
    (1..=n).filter(|&l| !open[l]).map(|l| area[l]).collect()
}

#[test]
fn zero_translation_is_identity() {
    let img = gradient_photo(37, 23);
    let out = apply_affine(&img, &AffineMatrix::translation(0.0, 0.0), None).unwrap();
    assert_eq!(out, img);
}

#[test]
fn reflecting_twice_restores_the_image() {
    let img = gradient_photo(31, 18);
    let (w, h) = img.dimensions();
    let flip = AffineMatrix::reflection(ReflectAxis::Horizontal, w, h);
    let once = apply_affine(&img, &flip, None).unwrap();
    assert_ne!(once, img);
    let twice = apply_affine(&once, &flip, None).unwrap();
    assert_eq!(twice, img);
}

#[test]
fn unit_kernel_convolution_is_identity() {
    let gray = GrayImage::from_fn(29, 17, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        Luma([((x * 13 + y * 29) % 256) as u8])
    });
    let unit = Kernel::from_rows(&[[1.0_f32]]).unwrap();
    assert_eq!(convolve(&gray, &unit).unwrap(), gray);
}

#[test]
fn convolution_preserves_dimensions() {
    let gray = GrayImage::from_pixel(13, 7, Luma([90]));
    for k in [1, 3, 5, 15] {
        let out = convolve(&gray, &Kernel::box_blur(k).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (13, 7), "k = {k}");
    }
    // kernel larger than the image still works thanks to mirrored padding
    let big = convolve(&GrayImage::from_pixel(3, 2, Luma([40])), &Kernel::box_blur(7).unwrap()).unwrap();
    assert_eq!(big.dimensions(), (3, 2));
}

#[test]
fn every_scene_mask_is_free_of_small_holes_after_cleanup() {
    let remover = BackgroundRemover::new();
    let min_area = remover.params().hole_min_area;
    let photos = [studio_photo(96), gradient_photo(96, 80)];
    let scenes = [
        Scene::Solid,
        Scene::Gradient,
        Scene::Textured,
        Scene::Natural,
        Scene::Minimalist,
        Scene::Abstract,
        Scene::Vintage,
    ];
    for photo in &photos {
        for scene in scenes {
            let raw = remover.raw_mask(photo, scene).unwrap();
            let cleaned = remove_small_holes(&raw, min_area);
            let small: Vec<u32> = enclosed_hole_areas(&cleaned)
                .into_iter()
                .filter(|&a| a < min_area)
                .collect();
            assert!(small.is_empty(), "{scene}: holes {small:?}");
        }
    }
}

#[test]
fn zero_feather_keeps_mask_binary() {
    let opts = RemovalOptions {
        feather_radius: 0,
        ..RemovalOptions::default()
    };
    let mask = foreground_mask(&gradient_photo(64, 48), &opts, &SegmentationParams::default()).unwrap();
    assert!(mask.is_binary());
    assert!(mask.to_gray().pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn transparent_output_is_rgba_with_original_colors() {
    for photo in [studio_photo(80), gradient_photo(70, 50)] {
        let input = DynamicImage::ImageRgb8(photo.clone());
        let out = remove_background(&input, &RemovalOptions::default()).unwrap();
        assert_eq!(out.color().channel_count(), 4);
        let rgba = out.to_rgba8();
        assert_eq!(rgba.dimensions(), photo.dimensions());
        for (x, y, px) in rgba.enumerate_pixels() {
            assert_eq!(&px.0[..3], &photo.get_pixel(x, y).0[..]);
        }
    }
}

#[test]
fn auto_mode_resolves_studio_photo_to_solid() {
    let params = SegmentationParams::default();
    assert_eq!(resolve_scene(&studio_photo(100), SceneType::Auto, &params), Scene::Solid);
}

#[test]
fn brightness_fifty_lifts_black_to_fifty() {
    let black = RgbImage::new(100, 100);
    let out = adjust_brightness_contrast(&black, 50.0, 0.0);
    assert!(out.pixels().all(|p| p.0 == [50, 50, 50]));
}

#[test]
fn quarter_turn_moves_corners_like_a_transpose() {
    let n = 9;
    let img = gradient_photo(n, n);
    let rot = AffineMatrix::rotation_about_center(n, n, 90.0);
    let out = apply_affine(&img, &rot, None).unwrap();
    for (x, y) in [(0, 0), (n - 1, 0), (0, n - 1), (n - 1, n - 1), (2, 5)] {
        assert_eq!(out.get_pixel(n - 1 - y, x), img.get_pixel(x, y), "source ({x}, {y})");
    }
}

#[test]
fn png_round_trip_keeps_cutout_alpha() {
    let opts = RemovalOptions {
        feather_radius: 4,
        ..RemovalOptions::default()
    };
    let cutout = remove_background(&DynamicImage::ImageRgb8(studio_photo(64)), &opts).unwrap();
    let bytes = encode_image(&cutout, ImageFormat::Png).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.to_rgba8(), cutout.to_rgba8());
}

#[test]
fn solid_color_mode_paints_backdrop() {
    let opts = RemovalOptions {
        output: OutputMode::SolidColor,
        solid_color: Some(Rgb([0, 0, 255])),
        feather_radius: 0,
        ..RemovalOptions::default()
    };
    let out = remove_background(&DynamicImage::ImageRgb8(studio_photo(80)), &opts).unwrap();
    let rgb = out.as_rgb8().unwrap();
    assert_eq!(rgb.get_pixel(1, 1), &Rgb([0, 0, 255]));
    assert_eq!(rgb.get_pixel(40, 40), &Rgb([230, 120, 20]));
}

#[test]
fn invalid_inputs_are_reported_not_panicked() {
    let empty = RgbImage::new(0, 0);
    assert!(matches!(
        apply_affine(&empty, &AffineMatrix::identity(), None),
        Err(Error::EmptyImage { .. })
    ));
    assert!(matches!(
        apply_affine(&gradient_photo(4, 4), &AffineMatrix::scaling(0.0, 1.0), None),
        Err(Error::DegenerateTransform { .. })
    ));
    assert!(matches!(
        Kernel::from_rows(&[[1.0_f32, 2.0]]),
        Err(Error::InvalidKernel { rows: 1, cols: 2 })
    ));
    assert!(matches!(
        "cubist".parse::<SceneType>(),
        Err(Error::UnknownSceneType(_))
    ));
    assert!(matches!(
        remove_background(&DynamicImage::new_rgba8(8, 8), &RemovalOptions::default()),
        Err(Error::ChannelCount { .. })
    ));
}
