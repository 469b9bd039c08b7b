use airframe_gfx::{
    Config, HeadlessDevice, Scene,
    logging::{LoggingConfig, logging_initialized},
};

// One test per binary: the logger is process-wide state.
#[test]
fn scenes_install_a_logger_only_on_request() {
    let _scene = Scene::new(HeadlessDevice::new(), Config::default());
    assert!(!logging_initialized());

    let config = Config::default().with_logging(LoggingConfig {
        env_filter: Some("airframe_gfx=debug".to_string()),
        ..LoggingConfig::default()
    });
    let _scene = Scene::new(HeadlessDevice::new(), config);
    assert!(logging_initialized());
}
