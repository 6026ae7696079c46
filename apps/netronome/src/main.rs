// [apps/netronome/src/main.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME MAIN ENTRY POINT
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO Y DESPACHO DE SUBCOMANDOS
 *
 * Códigos de salida: 0 éxito; 1 fallo de ejecución; 2 argumentos o
 * configuración inválidos.
 * =================================================================
 */

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AgentDirectives, NetronomeCommand, NetronomeDirectives};
use netronome_agent::{AgentConfig, AgentRuntime, TailscaleMethod, TailscaleSettings};
use netronome_infra_db::repositories::UserRepository;
use netronome_infra_db::StorageClient;
use netronome_server::{ServerConfig, ServerKernel};
use netronome_shared_watchtower::init_tracing;
use pbkdf2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use pbkdf2::Pbkdf2;
use std::io::Write;
use std::path::Path;
use tracing::info;

const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_INVALID_CONFIG: i32 = 2;

fn main() {
    // 1. CARGA DE ENTORNO
    dotenvy::dotenv().ok();

    // 2. PARSEO DE DIRECTIVAS (clap sale con código 2 ante argumentos inválidos)
    let directives = NetronomeDirectives::parse();

    // 3. RUNTIME ASÍNCRONO
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(fault) => {
            eprintln!("FATAL: async runtime ignition failed: {}", fault);
            std::process::exit(EXIT_RUNTIME_FAILURE);
        }
    };

    let outcome = runtime.block_on(dispatch(directives.command));

    match outcome {
        Ok(()) => {}
        Err(DispatchFault::InvalidConfig(message)) => {
            eprintln!("ERROR: {}", message);
            std::process::exit(EXIT_INVALID_CONFIG);
        }
        Err(DispatchFault::Runtime(fault)) => {
            eprintln!("ERROR: {:#}", fault);
            std::process::exit(EXIT_RUNTIME_FAILURE);
        }
    }
}

/// Fallos del despacho, separados por código de salida.
enum DispatchFault {
    InvalidConfig(String),
    Runtime(anyhow::Error),
}

impl From<anyhow::Error> for DispatchFault {
    fn from(fault: anyhow::Error) -> Self {
        DispatchFault::Runtime(fault)
    }
}

async fn dispatch(command: NetronomeCommand) -> Result<(), DispatchFault> {
    match command {
        NetronomeCommand::Serve { config } => {
            init_tracing("netronome_server");

            let server_config = ServerConfig::load(config.as_deref())
                .map_err(|fault| DispatchFault::InvalidConfig(format!("{:#}", fault)))?;

            let kernel = ServerKernel::ignite(server_config).await?;
            kernel.launch().await?;
            Ok(())
        }

        NetronomeCommand::Agent(directives) => {
            init_tracing("netronome_agent");

            let agent_config = agent_config_from(directives)
                .map_err(DispatchFault::InvalidConfig)?;

            AgentRuntime::launch(agent_config).await?;
            Ok(())
        }

        NetronomeCommand::GenerateConfig { output } => {
            let rendered = ServerConfig::render_default();
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("unwritable target {}", path.display()))?;
                    println!("configuration written to {}", path.display());
                }
                None => {
                    print!("{}", rendered);
                }
            }
            Ok(())
        }

        NetronomeCommand::CreateUser { name, config } => {
            init_tracing("netronome_admin");
            let repository = open_user_repository(config.as_deref()).await?;

            let password_hash = prompt_password_hash()?;
            repository
                .create_user(&name, &password_hash)
                .await
                .context("user creation failed")?;

            println!("user '{}' created", name);
            Ok(())
        }

        NetronomeCommand::ChangePassword { name, config } => {
            init_tracing("netronome_admin");
            let repository = open_user_repository(config.as_deref()).await?;

            let password_hash = prompt_password_hash()?;
            repository
                .update_password(&name, &password_hash)
                .await
                .context("password rotation failed")?;

            println!("password updated for '{}'", name);
            Ok(())
        }

        NetronomeCommand::Version => {
            println!("netronome {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        NetronomeCommand::Update => {
            check_for_update().await?;
            Ok(())
        }
    }
}

/// Directivas CLI -> configuración del agente.
fn agent_config_from(directives: AgentDirectives) -> Result<AgentConfig, String> {
    let method: TailscaleMethod = directives.tailscale_method.parse()?;

    if directives.tailscale
        && method == TailscaleMethod::Tsnet
        && directives.tailscale_auth_key.is_none()
    {
        return Err("tsnet mode requires --tailscale-auth-key".to_string());
    }

    Ok(AgentConfig {
        host: directives.host,
        port: directives.port,
        interface: directives.interface,
        api_key: directives.api_key,
        disk_includes: directives.disk_includes,
        disk_excludes: directives.disk_excludes,
        tailscale: TailscaleSettings {
            enabled: directives.tailscale,
            method,
            auth_key: directives.tailscale_auth_key,
            hostname: directives.tailscale_hostname,
            ephemeral: directives.tailscale_ephemeral,
            state_dir: directives.tailscale_state_dir,
            control_url: directives.tailscale_control_url,
        },
    })
}

async fn open_user_repository(config_path: Option<&Path>) -> Result<UserRepository, DispatchFault> {
    let server_config = ServerConfig::load(config_path)
        .map_err(|fault| DispatchFault::InvalidConfig(format!("{:#}", fault)))?;

    let client = StorageClient::connect(&server_config.database.path)
        .await
        .context("database unreachable")?;

    Ok(UserRepository::new(client))
}

/// Lee la contraseña de stdin y deriva el hash PBKDF2 con sal propia.
fn prompt_password_hash() -> Result<String> {
    print!("password: ");
    std::io::stdout().flush().ok();

    let mut password = String::new();
    std::io::stdin()
        .read_line(&mut password)
        .context("stdin unreadable")?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let salt = SaltString::generate(&mut OsRng);
    let derived = Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|fault| anyhow::anyhow!("hash derivation failed: {}", fault))?;

    Ok(derived.to_string())
}

/// Consulta la última release publicada y la compara con el binario.
async fn check_for_update() -> Result<()> {
    #[derive(serde::Deserialize)]
    struct ReleaseDocument {
        tag_name: String,
    }

    let client = reqwest::Client::builder()
        .user_agent(format!("netronome/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("update client ignition failed")?;

    let release: ReleaseDocument = client
        .get("https://api.github.com/repos/autobrr/netronome/releases/latest")
        .send()
        .await
        .context("release endpoint unreachable")?
        .error_for_status()
        .context("release endpoint rejected the probe")?
        .json()
        .await
        .context("release document undecodable")?;

    let current = format!("v{}", env!("CARGO_PKG_VERSION"));
    if release.tag_name == current {
        info!("✅ [UPDATE]: Running the latest release ({}).", current);
        println!("netronome is up to date ({})", current);
    } else {
        info!("⬆️  [UPDATE]: Newer release available: {}.", release.tag_name);
        println!("update available: {} (current {})", release.tag_name, current);
    }
    Ok(())
}
