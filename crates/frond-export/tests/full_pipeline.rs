//! Integration test: load a synthetic foliage atlas, detect and place
//! leaves, composite every layer, seam-blend, and export to disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use frond_export::{DirectorySink, render_all, save_local};
use frond_pipeline::tile::blend_edges;
use frond_pipeline::{
    DetectParams, EditSession, LayerType, RgbaImage, SourceFile,
};
use image::ImageEncoder;

fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    buf
}

/// Build a 64x64 atlas with three disjoint leaf squares and four layers.
fn synthetic_atlas_batch() -> Vec<SourceFile> {
    let squares = [(4_u32, 4_u32, 10_u32), (30, 8, 12), (12, 36, 14)];

    let mut opacity = RgbaImage::from_pixel(64, 64, image::Rgba([0, 0, 0, 255]));
    let mut color = RgbaImage::from_pixel(64, 64, image::Rgba([0, 0, 0, 0]));
    for (x0, y0, size) in squares {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                opacity.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
                color.put_pixel(x, y, image::Rgba([30, 120, 40, 255]));
            }
        }
    }
    let normal = RgbaImage::from_pixel(64, 64, image::Rgba([128, 128, 255, 255]));
    let roughness = RgbaImage::from_pixel(64, 64, image::Rgba([180, 180, 180, 255]));

    vec![
        SourceFile::new("shrub_opacity.png", png_bytes(&opacity)),
        SourceFile::new("shrub_color.png", png_bytes(&color)),
        SourceFile::new("shrub_normalgl.png", png_bytes(&normal)),
        SourceFile::new("shrub_roughness.png", png_bytes(&roughness)),
        SourceFile::new("shrub_notes.txt", b"ignored".to_vec()),
    ]
}

#[test]
fn detect_place_composite_and_export() {
    let mut session = EditSession::new(128, 1);
    session.set_detect_params(DetectParams::new(128, 20));
    session
        .load_atlas("shrub", &synthetic_atlas_batch())
        .expect("atlas should load");

    // Three leaf squares, discovered in row-major order.
    let leaves = session.leaves();
    assert_eq!(leaves.len(), 3);
    assert_eq!((leaves[0].x, leaves[0].y), (4, 4));
    assert_eq!((leaves[1].x, leaves[1].y), (30, 8));
    assert_eq!((leaves[2].x, leaves[2].y), (12, 36));

    let placed = session.place_all_detected();
    assert_eq!(placed.len(), 3);

    // Every present layer renders at output size; the unknown .txt file
    // contributed nothing.
    let mut rendered = render_all(&mut session);
    let layer_order: Vec<LayerType> = rendered.iter().map(|(l, _)| *l).collect();
    assert_eq!(
        layer_order,
        vec![
            LayerType::Color,
            LayerType::Opacity,
            LayerType::NormalGl,
            LayerType::Roughness,
        ]
    );
    for (layer, buffer) in &rendered {
        assert_eq!(buffer.dimensions(), (128, 128), "{layer}");
    }

    // The normal render falls back to the neutral background where no
    // leaf covers the canvas.
    let (_, normal) = rendered
        .iter()
        .find(|(l, _)| *l == LayerType::NormalGl)
        .unwrap();
    assert_eq!(normal.get_pixel(0, 0).0, [128, 128, 255, 255]);

    // The color render actually drew something somewhere.
    let (_, color) = rendered
        .iter()
        .find(|(l, _)| *l == LayerType::Color)
        .unwrap();
    assert!(color.pixels().any(|p| p.0[3] != 0));

    // Seam-blend and export everything to a temp directory.
    for (_, buffer) in &mut rendered {
        *buffer = blend_edges(buffer, 16);
    }

    let out_dir = std::env::temp_dir().join(format!("frond-e2e-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&out_dir);
    let mut sink = DirectorySink::new(&out_dir);
    let report = save_local(&rendered, "shrub", &mut sink);
    assert!(report.is_complete(), "failed: {:?}", report.failed);

    for name in [
        "shrub_color.png",
        "shrub_opacity.png",
        "shrub_normalgl.png",
        "shrub_roughness.png",
    ] {
        let path = out_dir.join(name);
        let bytes = std::fs::read(&path).expect("exported file should exist");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (128, 128));
    }

    std::fs::remove_dir_all(&out_dir).unwrap();
}
