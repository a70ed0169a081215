use discovery_service::config::{ConfigError, NtfyAuth, ServiceConfig};
use std::io::Write;
use std::time::Duration;

const MINIMAL: &str = r#"
[deployment]
hostname_prefix = "sensor"
psk = "0123456789abcdef"
ssh_keys = ["ssh-ed25519 AAAAC3Nza admin@host"]
enrollment_credential = "cred"
"#;

fn with_deployment(field: &str, value: &str) -> String {
    MINIMAL
        .lines()
        .map(|line| {
            if line.starts_with(&format!("{field} =")) {
                format!("{field} = {value}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn invalid(toml: &str) -> bool {
    matches!(
        ServiceConfig::from_toml_str(toml).unwrap().validate(),
        Err(ConfigError::Invalid(_))
    )
}

#[test]
fn minimal_config_uses_defaults() {
    let config = ServiceConfig::from_toml_str(MINIMAL).unwrap();
    config.validate().unwrap();
    assert_eq!(config.deployment.bind_address.to_string(), "0.0.0.0:8080");
    assert_eq!(config.database.path.to_str(), Some("data/registrations.db"));
    assert!(config.security.replay_window().is_none());
    assert!(!config.ntfy.enabled);
    assert_eq!(config.ntfy.priority, "default");
    assert_eq!(config.ntfy.auth, NtfyAuth::None);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn full_config_parses() {
    let toml = format!(
        r#"{MINIMAL}
bind_address = "127.0.0.1:9000"

[database]
path = "/var/lib/discovery/reg.db"

[security]
replay_window_secs = 120

[ntfy]
enabled = true
url = "https://ntfy.example.com/fleet"
priority = "low"
tags = ["lab"]
timeout_secs = 3
auth = {{ type = "basic", username = "ops", password = "hunter22" }}

[logging]
level = "debug"
"#
    );
    let config = ServiceConfig::from_toml_str(&toml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.deployment.bind_address.port(), 9000);
    assert_eq!(config.security.replay_window(), Some(Duration::from_secs(120)));
    assert_eq!(config.ntfy.tags, vec!["lab"]);
    assert_eq!(
        config.ntfy.auth,
        NtfyAuth::Basic {
            username: "ops".into(),
            password: "hunter22".into()
        }
    );
}

#[test]
fn bearer_auth_parses() {
    let toml = format!(
        "{MINIMAL}\n[ntfy]\nenabled = true\nurl = \"http://ntfy.local/t\"\n\
         auth = {{ type = \"bearer\", token = \"tk_abc\" }}\n"
    );
    let config = ServiceConfig::from_toml_str(&toml).unwrap();
    assert_eq!(config.ntfy.auth, NtfyAuth::Bearer { token: "tk_abc".into() });
}

#[test]
fn short_psk_is_rejected() {
    assert!(invalid(&with_deployment("psk", "\"too-short\"")));
}

#[test]
fn bad_prefixes_are_rejected() {
    for prefix in ["\"\"", "\"-sensor\"", "\"sensor-\"", "\"Sensor\"", "\"sen sor\""] {
        assert!(invalid(&with_deployment("hostname_prefix", prefix)), "{prefix}");
    }
}

#[test]
fn non_ssh_key_is_rejected() {
    assert!(invalid(&with_deployment("ssh_keys", "[\"not a key\"]")));
}

#[test]
fn ecdsa_and_security_keys_are_accepted() {
    let keys = "[\"ecdsa-sha2-nistp256 AAAAE2 a@b\", \"sk-ssh-ed25519@openssh.com AAAAG c@d\"]";
    let config = ServiceConfig::from_toml_str(&with_deployment("ssh_keys", keys)).unwrap();
    config.validate().unwrap();
}

#[test]
fn empty_credential_is_rejected() {
    assert!(invalid(&with_deployment("enrollment_credential", "\"  \"")));
}

#[test]
fn zero_replay_window_is_rejected() {
    assert!(invalid(&format!("{MINIMAL}\n[security]\nreplay_window_secs = 0\n")));
}

#[test]
fn enabled_ntfy_needs_http_url() {
    assert!(invalid(&format!("{MINIMAL}\n[ntfy]\nenabled = true\n")));
    assert!(invalid(&format!(
        "{MINIMAL}\n[ntfy]\nenabled = true\nurl = \"ftp://x\"\n"
    )));
}

#[test]
fn missing_deployment_is_parse_error() {
    assert!(matches!(
        ServiceConfig::from_toml_str("[database]\npath = \"x.db\"\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();
    let config = ServiceConfig::load(file.path()).unwrap();
    assert_eq!(config.deployment.hostname_prefix, "sensor");
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ServiceConfig::load(dir.path().join("absent.toml")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn debug_output_redacts_secrets() {
    let config = ServiceConfig::from_toml_str(MINIMAL).unwrap();
    let debug = format!("{:?}", config);
    assert!(!debug.contains("0123456789abcdef"));
    assert!(debug.contains("[REDACTED]"));
}
