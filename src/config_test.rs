use super::*;

#[test]
fn test_defaults() {
    let cfg = Config::new("/tmp/example.kbk");
    assert_eq!(cfg.max_key_len, MAX_KEY_LEN);
    assert_eq!(cfg.max_str_len, MAX_STR_LEN);
    assert_eq!(cfg.table_increment, TABLE_INCREMENT);
    assert!(!cfg.preload);
    assert_eq!(cfg.mode, ModeConfig::ReadWrite);
}

#[test]
fn test_builder_chaining() {
    let mut cfg = Config::new("/tmp/example.kbk");
    cfg.set_max_key_len(31).set_cache_len(500).set_mode(ModeConfig::New);
    assert_eq!(cfg.max_key_len, 31);
    assert_eq!(cfg.cache_len, 500);
    assert_eq!(cfg.mode, ModeConfig::New);
}
