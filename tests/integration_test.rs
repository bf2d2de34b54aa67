use portdrop::cli::Cli;
use portdrop::config::XdpMode;
use portdrop::error::{PortdropError, TableError};
use portdrop::Config;
use std::io::Write;

#[test]
fn test_error_types() {
    let err = PortdropError::AttachFailed {
        iface: "eth0".to_string(),
        reason: "Operation not supported".to_string(),
    };
    assert!(err.to_string().contains("eth0"));

    let err: PortdropError = TableError::new("PKT_COUNT", 1, "No such file or directory").into();
    assert!(err.to_string().contains("PKT_COUNT[1]"));
}

#[test]
fn test_version_const() {
    assert!(!portdrop::VERSION.is_empty());
}

#[test]
fn test_config_file_with_cli_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "iface: eth0").unwrap();
    writeln!(file, "drop_port: 443").unwrap();
    writeln!(file, "interval_ms: 500").unwrap();
    writeln!(file, "xdp_mode: skb").unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        port: Some(8443),
        ..Cli::default()
    };
    let config = Config::from_cli(&cli).unwrap();

    assert_eq!(config.iface, "eth0");
    assert_eq!(config.drop_port, 8443);
    assert_eq!(config.interval_ms, 500);
    assert_eq!(config.xdp_mode, XdpMode::Skb);
    assert!(config.interactive);
}

#[test]
fn test_invalid_config_file_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "drop_port: 0").unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Cli::default()
    };
    let err = Config::from_cli(&cli).unwrap_err();
    assert!(matches!(err, PortdropError::ConfigError(_)));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        config: Some(dir.path().join("absent.yaml")),
        ..Cli::default()
    };
    let err = Config::from_cli(&cli).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}
