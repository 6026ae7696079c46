// [tests/mirror/apps/server/config_overrides.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONFIGURACIÓN Y OVERRIDES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: DEFAULTS, NETRONOME__* Y RENDER DE generate-config
 * =================================================================
 */

use netronome_server::ServerConfig;

/// Defaults, overrides y render en secuencia: las variables de entorno
/// son estado de proceso y el orden importa.
#[test]
fn defaults_env_overrides_and_render_behave_in_sequence() {
    // --- 1. DEFAULTS DOCUMENTADOS ---
    let defaults = ServerConfig::load(None).expect("defaults load");
    assert_eq!(defaults.server.port, 7575);
    assert_eq!(defaults.database.backend, "sqlite");
    assert_eq!(defaults.packetloss.max_concurrent_monitors, 10);
    assert_eq!(defaults.agents.reconnect_interval_seconds, 30);
    assert_eq!(defaults.agents.snapshot_interval_seconds, 60);
    assert_eq!(defaults.discovery.interval_seconds, 300);
    assert!(!defaults.packetloss.restore_monitors_on_startup);

    // --- 2. OVERRIDES DE ENTORNO NETRONOME__<SECCION>_<CLAVE> ---
    std::env::set_var("NETRONOME__PACKETLOSS_MAX_CONCURRENT_MONITORS", "3");
    std::env::set_var("NETRONOME__SERVER_PORT", "9999");
    std::env::set_var("NETRONOME__DISCOVERY_ENABLED", "true");
    std::env::set_var("NETRONOME__DATABASE_PATH", "/tmp/override.db");

    let overridden = ServerConfig::load(None).expect("override load");
    assert_eq!(overridden.packetloss.max_concurrent_monitors, 3);
    assert_eq!(overridden.server.port, 9999);
    assert!(overridden.discovery.enabled);
    assert_eq!(overridden.database.path, "/tmp/override.db");

    std::env::remove_var("NETRONOME__PACKETLOSS_MAX_CONCURRENT_MONITORS");
    std::env::remove_var("NETRONOME__SERVER_PORT");
    std::env::remove_var("NETRONOME__DISCOVERY_ENABLED");
    std::env::remove_var("NETRONOME__DATABASE_PATH");

    // --- 3. RENDER DE generate-config: TOML válido y re-cargable ---
    let rendered = ServerConfig::render_default();
    let reparsed: ServerConfig = toml::from_str(&rendered).expect("rendered TOML must reload");
    assert_eq!(reparsed.server.port, 7575);
    assert_eq!(reparsed.packetloss.max_concurrent_monitors, 10);
}

#[test]
fn a_missing_explicit_config_file_is_a_hard_error() {
    let outcome = ServerConfig::load(Some(std::path::Path::new(
        "/nonexistent/netronome/config.toml",
    )));
    assert!(outcome.is_err(), "explicit missing file must not silently default");
}
