use fieldcap_composite::*;

#[test]
fn test_default_config_is_valid() {
    assert!(CompositeConfig::default().validate().is_ok());
}

#[test]
fn test_validation_rejects_bad_dimensions() {
    let mut config = CompositeConfig::default();
    config.height = 0.0;
    match config.validate() {
        Err(CompositeError::Config(msg)) => assert!(msg.contains("positive")),
        _ => panic!("Expected Config error"),
    }
}

#[test]
fn test_validation_rejects_ratios_out_of_range() {
    let mut config = CompositeConfig::default();
    config.viewport_fraction = 1.5;
    assert!(config.validate().is_err());

    let mut config = CompositeConfig::default();
    config.table.col1_ratio = 0.0;
    assert!(config.validate().is_err());

    let mut config = CompositeConfig::default();
    config.table.min_table_width_ratio = 1.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_rejects_negative_padding() {
    let mut config = CompositeConfig::default();
    config.table.cell_padding_x = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_single_image_encoding_downscales() {
    let options = EncodeOptions::single_image();
    assert_eq!(options.upload_max_width, Some(1024));
    assert_eq!(options.upload_quality, 70);
    assert_eq!(EncodeOptions::default().upload_max_width, None);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_save_and_load_config() {
    use tempfile::NamedTempFile;

    let mut config = CompositeConfig::default();
    config.width = 1200.0;
    config.height = 1600.0;
    config.table.background_color = Color::rgba(0, 0, 0, 0x80);
    config.table.text_color = Color::WHITE;

    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    config.save(path).await.unwrap();
    let loaded = CompositeConfig::load(path).await.unwrap();

    assert_eq!(loaded, config);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_partial_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composite.json");
    tokio::fs::write(&path, r##"{ "width": 900, "table": { "border_color": "#f00" } }"##)
        .await
        .unwrap();

    let loaded = CompositeConfig::load(&path).await.unwrap();
    assert_eq!(loaded.width, 900.0);
    assert_eq!(loaded.height, CompositeConfig::default().height);
    assert_eq!(loaded.table.border_color, Color::rgb(255, 0, 0));
    assert_eq!(loaded.table.font_px, TableStyle::default().font_px);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composite.json");
    tokio::fs::write(&path, r#"{ "viewport_fraction": 0 }"#)
        .await
        .unwrap();

    assert!(matches!(
        CompositeConfig::load(&path).await,
        Err(CompositeError::Config(_))
    ));
}

#[test]
fn test_color_parsing() {
    assert_eq!(Color::parse_hex("#f00").unwrap(), Color::rgb(255, 0, 0));
    assert_eq!(Color::parse_hex(" #102030 ").unwrap(), Color::rgb(16, 32, 48));
    assert_eq!(
        Color::parse_hex("#ffffffd9").unwrap(),
        Color::rgba(255, 255, 255, 0xd9)
    );
}

#[test]
fn test_color_rejects_malformed_input() {
    for input in ["f00", "#ff", "#gg0000", "#+fffff", "#가나", "#가나다"] {
        assert!(
            matches!(Color::parse_hex(input), Err(CompositeError::Config(_))),
            "{input} should be rejected"
        );
    }
}
