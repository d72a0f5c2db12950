//! End-to-end tests over files on disk

use image::{GenericImageView, Rgba, RgbaImage};
use std::cell::Cell;
use std::io::Cursor;
use std::path::PathBuf;

use stylematch::outfit::{GenerationRequest, ImageEditTransport, UpstreamResponse};
use stylematch::{
    compose_atlas, generate_outfit_with, resize_to_file, thumbnail_to_file,
    GenerateOutfitOptions, PipelineError, UpstreamError,
};

/// JPEG with an EXIF APP1 segment carrying only `Orientation`
fn jpeg_with_orientation(img: &RgbaImage, orientation: u16) -> Vec<u8> {
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
        .encode_image(&rgb)
        .unwrap();

    let mut tiff = b"MM\x00\x2A".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn dims(path: &std::path::Path) -> (u32, u32) {
    image::open(path).unwrap().dimensions()
}

/// Top half red, bottom half blue
fn two_tone(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| {
        if y < height / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
}

#[test]
fn test_resize_rotated_photo_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("garments").join("42.jpg");

    // Stored 400x200, displayed 200x400 after a quarter turn
    let src = jpeg_with_orientation(&two_tone(400, 200), 6);
    resize_to_file(&src, 100, &out, 85).unwrap();

    assert_eq!(dims(&out), (50, 100));
}

#[test]
fn test_resize_never_upscales() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("small.jpg");

    resize_to_file(&png_bytes(&two_tone(120, 80)), 2048, &out, 85).unwrap();
    assert_eq!(dims(&out), (120, 80));
}

#[test]
fn test_resize_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("photo.jpg");
    std::fs::write(&out, vec![0u8; 100_000]).unwrap();

    resize_to_file(&png_bytes(&two_tone(30, 30)), 2048, &out, 85).unwrap();
    assert_eq!(dims(&out), (30, 30));
}

#[test]
fn test_rotate180_is_upright() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flipped.jpg");

    // Stored upside down: blue on top. Tag 3 turns it back to red on top.
    let stored = image::imageops::rotate180(&two_tone(64, 64));
    resize_to_file(&jpeg_with_orientation(&stored, 3), 2048, &out, 95).unwrap();

    let img = image::open(&out).unwrap().to_rgb8();
    let top = img.get_pixel(32, 8);
    let bottom = img.get_pixel(32, 56);
    assert!(top[0] > 200 && top[2] < 60, "{:?}", top);
    assert!(bottom[2] > 200 && bottom[0] < 60, "{:?}", bottom);
}

#[test]
fn test_thumbnail_to_file_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let src = png_bytes(&two_tone(400, 200));

    let up = dir.path().join("thumb_up.jpg");
    thumbnail_to_file(&src, 300, &up, 85, true).unwrap();
    assert_eq!(dims(&up), (300, 300));

    let capped = dir.path().join("thumb_capped.jpg");
    thumbnail_to_file(&src, 300, &capped, 85, false).unwrap();
    assert_eq!(dims(&capped), (200, 200));
}

#[test]
fn test_corrupt_input_is_decode_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.jpg");

    let err = resize_to_file(b"definitely not an image", 2048, &out, 85).unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));
    assert!(!out.exists());
}

#[test]
fn test_atlas_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths: Vec<PathBuf> = Vec::new();
    for i in 0..5 {
        let path = dir.path().join(format!("g{}.png", i));
        std::fs::write(&path, png_bytes(&two_tone(40, 20 + i * 10))).unwrap();
        paths.push(path);
    }
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"\xFF\xD8\xFFnope").unwrap();
    paths.push(broken);

    // 6 entries -> 3x2 grid
    let png = compose_atlas(&paths, 64, 4).unwrap();
    let atlas = image::load_from_memory(&png).unwrap();
    assert_eq!(atlas.dimensions(), (3 * 64 + 4 * 4, 2 * 64 + 3 * 4));
}

struct CountingTransport {
    calls: Cell<usize>,
    status: u16,
    body: String,
}

impl ImageEditTransport for CountingTransport {
    fn submit(&self, _request: &GenerationRequest) -> stylematch::Result<UpstreamResponse> {
        self.calls.set(self.calls.get() + 1);
        Ok(UpstreamResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

#[test]
fn test_generate_missing_file_makes_no_call() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("shirt.png");
    std::fs::write(&present, png_bytes(&two_tone(8, 8))).unwrap();
    let missing = dir.path().join("pants.png");

    let transport = CountingTransport {
        calls: Cell::new(0),
        status: 200,
        body: String::new(),
    };
    let err = generate_outfit_with(
        &transport,
        &[present, missing.clone()],
        "sk-test",
        &GenerateOutfitOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, PipelineError::NotFound(ref p) if *p == missing));
    assert!(err.to_string().contains("pants.png"));
    assert_eq!(transport.calls.get(), 0);
}

#[test]
fn test_generate_upstream_failure_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let shirt = dir.path().join("shirt.png");
    std::fs::write(&shirt, png_bytes(&two_tone(8, 8))).unwrap();

    let transport = CountingTransport {
        calls: Cell::new(0),
        status: 500,
        body: "upstream exploded".to_string(),
    };
    let options = GenerateOutfitOptions {
        cell_size: 32,
        ..Default::default()
    };
    let err = generate_outfit_with(&transport, &[shirt], "sk-test", &options).unwrap_err();

    match err {
        PipelineError::Upstream(UpstreamError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.calls.get(), 1);
}
