use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_render_at_lowest_quality_with_convention_lookup() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.render.program, PathBuf::from(DEFAULT_RENDER_PROGRAM));
    assert_eq!(settings.render.temp_root, PathBuf::from(DEFAULT_TEMP_ROOT));
    assert_eq!(settings.render.quality, QualityTier::Low);
    assert_eq!(settings.render.discovery, ArtifactDiscovery::Convention);
    assert_eq!(
        settings.render.timeout,
        Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)
    );
    assert_eq!(settings.videos.url_prefix, DEFAULT_VIDEOS_URL_PREFIX);
    assert!(settings.render.passthrough_env.iter().any(|name| name == "PATH"));
}

#[test]
fn render_overrides_apply_to_render_section() {
    let mut raw = RawSettings::default();
    let overrides = RenderOverrides {
        program: Some(PathBuf::from("/opt/manim/bin/manim")),
        quality: Some("high".to_string()),
        timeout_seconds: Some(30),
        discovery: Some("scan".to_string()),
        videos_url_prefix: Some("renders/".to_string()),
        ..Default::default()
    };

    raw.apply_render_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.render.program,
        PathBuf::from("/opt/manim/bin/manim")
    );
    assert_eq!(settings.render.quality, QualityTier::High);
    assert_eq!(settings.render.timeout, Duration::from_secs(30));
    assert_eq!(settings.render.discovery, ArtifactDiscovery::Scan);
    assert_eq!(settings.videos.url_prefix, "/renders");
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.timeout_seconds",
            ..
        }
    ));
}

#[test]
fn unknown_quality_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.quality = Some("ultra".to_string());
    let err = Settings::from_raw(raw).expect_err("bad quality");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.quality",
            ..
        }
    ));
}

#[test]
fn nested_url_prefix_is_rejected() {
    for prefix in ["/", "/a/b", "/../x", "/vid eos"] {
        let mut raw = RawSettings::default();
        raw.videos.url_prefix = Some(prefix.to_string());
        assert!(
            Settings::from_raw(raw).is_err(),
            "prefix `{prefix}` should be rejected"
        );
    }
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        max_concurrent_jobs: Some(0),
        ..Default::default()
    };
    raw.apply_serve_overrides(&overrides);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        logging: LoggingOverrides {
            log_json: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["scenecast"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "scenecast",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--render-program",
        "/usr/local/bin/manim",
        "--log-json",
        "true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.render.program.as_deref(),
                Some(std::path::Path::new("/usr/local/bin/manim"))
            );
            assert_eq!(serve.overrides.logging.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "scenecast",
        "render",
        "--scene",
        "Demo",
        "--render-quality",
        "medium",
        "/tmp/scene.py",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.scene.as_deref(), Some("Demo"));
            assert_eq!(render.render.quality.as_deref(), Some("medium"));
            assert_eq!(render.file, std::path::Path::new("/tmp/scene.py"));
        }
        _ => panic!("wrong command parsed"),
    }
}
