use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_production_with_memory_cache() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.mode, Mode::Production);
    assert!(settings.cache_enabled());
    assert_eq!(settings.cache.memory_capacity, 512);
    assert!(settings.cache.redis_url.is_none());
    assert!(settings.cache.purge_secret.is_none());
    assert_eq!(settings.content.github.reference, "meta");
    assert_eq!(settings.content.github.api_url, "https://api.github.com");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
}

#[test]
fn public_url_defaults_to_listener() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(8080);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_url.as_str(), "http://127.0.0.1:8080/");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn development_mode_disables_cache() {
    let mut raw = RawSettings::default();
    raw.apply_global_overrides(&GlobalOverrides {
        dev: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.mode.is_development());
    assert!(!settings.cache_enabled());
}

#[test]
fn unknown_mode_is_rejected() {
    let raw = RawSettings {
        mode: Some("staging".to_string()),
        ..Default::default()
    };
    let err = Settings::from_raw(raw).expect_err("invalid mode");
    assert!(matches!(err, LoadError::Invalid { key: "mode", .. }));
}

#[test]
fn blank_secrets_are_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.cache.redis_url = Some("  ".to_string());
    raw.cache.purge_secret = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.cache.redis_url.is_none());
    assert!(settings.cache.purge_secret.is_none());
}

#[test]
fn zero_memory_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.memory_capacity = Some(0);
    let err = Settings::from_raw(raw).expect_err("invalid capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.memory_capacity",
            ..
        }
    ));
}

#[test]
fn malformed_repo_is_rejected() {
    let mut raw = RawSettings::default();
    raw.content.github_repo = Some("just-a-name".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn local_backend_requires_development_mode() {
    let mut raw = RawSettings::default();
    raw.content.local_dir = Some(PathBuf::from("/srv/blog"));
    raw.content.github_repo = Some("someone/blog".to_string());
    let production = Settings::from_raw(raw.clone()).expect("valid settings");
    assert_eq!(
        production.content_backend().expect("backend"),
        ContentBackend::GitHub {
            repo: "someone/blog".to_string()
        }
    );

    raw.mode = Some("development".to_string());
    let development = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        development.content_backend().expect("backend"),
        ContentBackend::Local(PathBuf::from("/srv/blog"))
    );
}

#[test]
fn github_backend_requires_repo() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let err = settings.content_backend().expect_err("missing repo");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.github_repo",
            ..
        }
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--github-repo",
        "someone/blog",
        "--redis-url",
        "redis://cache:6379",
        "--dev",
    ]);
    assert_eq!(args.globals.dev, Some(true));

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.github_repo.as_deref(), Some("someone/blog"));
            assert_eq!(
                serve.overrides.redis_url.as_deref(),
                Some("redis://cache:6379")
            );
        }
    }
}

#[test]
fn development_flags_apply_without_subcommand() {
    let args = CliArgs::parse_from(["folio", "--dev", "--content-dir", "/srv/blog"]);
    assert!(args.command.is_none());

    let mut raw = RawSettings::default();
    raw.apply_global_overrides(&args.globals);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.mode.is_development());
    assert_eq!(
        settings.content_backend().expect("backend"),
        ContentBackend::Local(PathBuf::from("/srv/blog"))
    );
}
