/*!
 * Tests for application configuration
 */

use anyhow::Result;
use submux::app_config::{Config, LogLevel};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_shouldUsePortableToolNames() {
    let config = Config::default();

    assert_eq!(config.tools.mkvmerge, "mkvmerge");
    assert_eq!(config.tools.mkvextract, "mkvextract");
    assert_eq!(config.tools.tesseract, "tesseract");
    assert_eq!(config.ocr.languages, vec!["eng".to_string()]);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.dump_dir.is_none());
}

/// Test default configuration validates
#[test]
fn test_validate_withDefaults_shouldPass() {
    assert!(Config::default().validate().is_ok());
}

/// Test validation failures
#[test]
fn test_validate_withBadValues_shouldFail() {
    let mut config = Config::default();
    config.tools.mkvmerge = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ocr.languages.clear();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ocr.languages = vec!["zzz".to_string()];
    assert!(config.validate().is_err());
}

/// Test save and load round-trip
#[test]
fn test_save_and_load_withCustomValues_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.tools.tesseract = "/opt/tesseract/bin/tesseract".to_string();
    config.ocr.languages = vec!["deu".to_string(), "eng".to_string()];
    config.log_level = LogLevel::Debug;
    config.save_to_file(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.tools.tesseract, "/opt/tesseract/bin/tesseract");
    assert_eq!(loaded.ocr.languages, vec!["deu".to_string(), "eng".to_string()]);
    assert_eq!(loaded.log_level, LogLevel::Debug);

    Ok(())
}

/// Test partial config files fall back to serde defaults
#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let path = common::create_test_file(
        &dir,
        "conf.json",
        r#"{ "ocr": { "languages": ["fra"] } }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.ocr.languages, vec!["fra".to_string()]);
    // Everything else keeps its default
    assert_eq!(config.tools.mkvmerge, "mkvmerge");
    assert_eq!(config.log_level, LogLevel::Info);
    // Timeout default survives a partial ocr section
    assert_eq!(config.ocr.timeout_secs, 120);

    Ok(())
}

/// Test malformed config files are rejected
#[test]
fn test_from_file_withBadJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let path = common::create_test_file(&dir, "conf.json", "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file("/no/such/conf.json").is_err());

    Ok(())
}

/// Test the dump dir override is honored and created
#[test]
fn test_dump_dir_withOverride_shouldCreateDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let override_dir = temp_dir.path().join("dumps");

    let config = Config {
        dump_dir: Some(override_dir.clone()),
        ..Config::default()
    };

    let resolved = config.dump_dir()?;
    assert_eq!(resolved, override_dir);
    assert!(resolved.is_dir());

    Ok(())
}

/// Test cleaning the dump directory
#[test]
fn test_clean_dump_dir_withCachedFiles_shouldRemoveThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let override_dir = temp_dir.path().join("dumps");

    let config = Config {
        dump_dir: Some(override_dir.clone()),
        ..Config::default()
    };
    let dir = config.dump_dir()?;
    std::fs::write(dir.join("cached.info.json"), "{}")?;
    std::fs::create_dir(dir.join("scratch"))?;

    let removed = config.clean_dump_dir()?;
    assert_eq!(removed, 2);
    assert_eq!(std::fs::read_dir(&dir)?.count(), 0);

    Ok(())
}
