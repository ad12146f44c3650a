use fieldcap_composite::*;
use std::collections::HashMap;

fn style() -> TableStyle {
    TableStyle::default()
}

fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_table_height_is_rows_times_row_height() {
    let fields = ["날짜", "위치", "공종", "비고"];
    for width in [200, 540, 756, 1080, 1440] {
        let layout = compute_table_layout(CanvasSize::new(width, width), &fields, |_| None, &style());
        assert_eq!(layout.table_height, 4.0 * layout.row_height);
        assert!(layout.font_size >= 10.0);
    }
}

#[test]
fn test_table_never_exceeds_cap() {
    let long = "가".repeat(300);
    let vals = values(&[("비고", long.as_str())]);
    for width in [300, 342, 347, 756, 1080, 1999] {
        let layout = compute_table_layout(
            CanvasSize::new(width, width),
            &["비고"],
            |f| vals.get(f).map(String::as_str),
            &style(),
        );
        let cap = width as f32 * 0.95;
        assert_eq!(layout.table_width, cap);
        assert!((layout.col1_width + layout.col2_width - layout.table_width).abs() < 1e-3);
    }
}

#[test]
fn test_table_never_below_minimum() {
    let layout = compute_table_layout(CanvasSize::new(1080, 1440), &["a"], |_| None, &style());
    assert!(layout.table_width >= 1080.0 * 0.5);
}

#[test]
fn test_layout_is_deterministic() {
    let vals = values(&[("날짜", "2026-10-19"), ("위치", "3동-401호")]);
    let fields = ["날짜", "위치"];
    let a = compute_table_layout(
        CanvasSize::new(756, 1008),
        &fields,
        |f| vals.get(f).map(String::as_str),
        &style(),
    );
    let b = compute_table_layout(
        CanvasSize::new(756, 1008),
        &fields,
        |f| vals.get(f).map(String::as_str),
        &style(),
    );
    assert_eq!(a, b);
}

#[test]
fn test_scene_trims_values() {
    let vals = values(&[("위치", "  3동-401호 ")]);
    let scene = Scene::new(
        "photo.jpg",
        Rotation::Clockwise90,
        CanvasSize::new(756, 1008),
        &["위치", "공종"],
        |f| vals.get(f).map(String::as_str),
        &style(),
    );
    assert_eq!(
        scene.rows,
        vec![
            ("위치".to_string(), "3동-401호".to_string()),
            ("공종".to_string(), String::new()),
        ]
    );
    assert_eq!(scene.layout.row_count, 2);
    assert_eq!(scene.rotation, Rotation::Clockwise90);
}

#[test]
fn test_canvas_dims_and_placement() {
    let config = CompositeConfig::default();
    let canvas = canvas_dims(390.0, &config);
    // floor(390 * 0.7) = 273, floor(273 * 4 / 3) = 364
    assert_eq!(canvas, CanvasSize::new(273, 364));

    let placement = image_placement(canvas, Rotation::Clockwise270);
    assert_eq!(placement.width, 364.0);
    assert_eq!(placement.height, 273.0);
}

#[test]
fn test_rotation_steps_wrap() {
    let mut rotation = Rotation::None;
    let mut seen = Vec::new();
    for _ in 0..4 {
        rotation = rotation.rotated_cw();
        seen.push(rotation.degrees());
    }
    assert_eq!(seen, vec![90, 180, 270, 0]);
    assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Clockwise270));
    assert_eq!(Rotation::from_degrees(450), Some(Rotation::Clockwise90));
    assert_eq!(Rotation::from_degrees(45), None);
}
