use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = Config::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.theme_color, "#6366f1");
    assert_eq!(cfg.export_dir, PathBuf::from("."));
    assert!(cfg.workspace.is_none());
}

#[test]
fn from_lookup_reads_all_values() {
    let cfg = Config::from_lookup(lookup_from(&[
        (WORKSPACE_VAR, "/tmp/flows"),
        (THEME_COLOR_VAR, "#F0A"),
        (EXPORT_DIR_VAR, "out"),
    ]))
    .unwrap();
    assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/flows")));
    assert_eq!(cfg.theme_color, "#ff00aa");
    assert_eq!(cfg.export_dir, PathBuf::from("out"));
}

#[test]
fn invalid_theme_color_errors() {
    let err = Config::from_lookup(lookup_from(&[(THEME_COLOR_VAR, "purple")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidThemeColor { value: "purple".into(), source: crate::color::ColorError::MissingHash }
    );
    assert!(err.to_string().contains("#rrggbb"));
}

#[test]
fn overrides_win_over_environment() {
    let cfg = Config::from_lookup(lookup_from(&[(WORKSPACE_VAR, "env-dir"), (THEME_COLOR_VAR, "#000")]))
        .unwrap()
        .with_overrides(Some(PathBuf::from("flag-dir")), Some("#123456"), None)
        .unwrap();
    assert_eq!(cfg.workspace, Some(PathBuf::from("flag-dir")));
    assert_eq!(cfg.theme_color, "#123456");
    assert_eq!(cfg.export_dir, PathBuf::from("."));

    let err = Config::default().with_overrides(None, Some("#12"), None).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidThemeColor { source: crate::color::ColorError::BadLength(2), .. }));
}

#[test]
fn from_env_ignores_blank_values() {
    unsafe {
        std::env::set_var(EXPORT_DIR_VAR, "  ");
        std::env::remove_var(THEME_COLOR_VAR);
        std::env::remove_var(WORKSPACE_VAR);
    }
    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg.export_dir, PathBuf::from("."));
    unsafe { std::env::remove_var(EXPORT_DIR_VAR) };
}
