// [apps/agent/src/hardware.rs]
/*!
 * =================================================================
 * APARATO: HARDWARE SNAPSHOT COLLECTOR
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CAPTURA DE CPU, MEMORIA, DISCOS Y TÉRMICAS
 * =================================================================
 */

use crate::disks::DiskFilter;
use netronome_domain_models::{
    CpuStats, DiskStats, HardwareStats, MemoryStats, SystemInfo, TempReading,
};
use sysinfo::{Components, Disks, System};
use tracing::instrument;

/// Rango térmico plausible; fuera de él la lectura se descarta.
const TEMP_CEILING_CELSIUS: f64 = 200.0;

/// Captura la instantánea agregada de hardware del host.
///
/// La medición de uso de CPU exige dos muestras separadas por el
/// intervalo mínimo del recolector.
#[instrument(skip(disk_filter))]
pub async fn collect_hardware(disk_filter: &DiskFilter) -> HardwareStats {
    let mut system = System::new();

    system.refresh_cpu_all();
    system.refresh_memory();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_cpu_all();

    let cpu = collect_cpu(&system);
    let memory = collect_memory(&system);
    let swap = collect_swap(&system);
    let disks = collect_disks(disk_filter);
    let temperatures = collect_temperatures();

    HardwareStats {
        cpu,
        memory,
        swap,
        disks,
        temperatures,
        uptime_seconds: System::uptime(),
    }
}

fn collect_cpu(system: &System) -> CpuStats {
    let load = System::load_average();
    let (model, frequency_mhz) = system
        .cpus()
        .first()
        .map(|cpu| (cpu.brand().trim().to_string(), cpu.frequency()))
        .unwrap_or_else(|| ("unknown".to_string(), 0));

    CpuStats {
        model,
        cores: num_cpus::get_physical() as i64,
        threads: num_cpus::get() as i64,
        frequency_mhz,
        usage_pct: f64::from(system.global_cpu_usage()),
        load_avg: [load.one, load.five, load.fifteen],
    }
}

/// Memoria principal: en Linux `used = total - free` (sin descontar
/// caches), que es lo que el operador espera ver en el panel.
fn collect_memory(system: &System) -> MemoryStats {
    let total_bytes = system.total_memory();
    let free_bytes = if cfg!(target_os = "linux") {
        system.free_memory()
    } else {
        system.available_memory()
    };
    let used_bytes = total_bytes.saturating_sub(free_bytes);

    MemoryStats {
        total_bytes,
        free_bytes,
        used_bytes,
        used_pct: ratio_pct(used_bytes, total_bytes),
    }
}

fn collect_swap(system: &System) -> MemoryStats {
    let total_bytes = system.total_swap();
    let used_bytes = system.used_swap();

    MemoryStats {
        total_bytes,
        free_bytes: system.free_swap(),
        used_bytes,
        used_pct: ratio_pct(used_bytes, total_bytes),
    }
}

fn ratio_pct(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64) * 100.0
    }
}

fn collect_disks(disk_filter: &DiskFilter) -> Vec<DiskStats> {
    let enumerated_disks = Disks::new_with_refreshed_list();
    let mut surviving_partitions = Vec::new();

    for disk in enumerated_disks.list() {
        let mount_path = disk.mount_point().to_string_lossy().to_string();
        let fstype = disk.file_system().to_string_lossy().to_string();
        let total_bytes = disk.total_space();

        if !disk_filter.admits(&mount_path, &fstype, total_bytes) {
            continue;
        }

        let free_bytes = disk.available_space();
        let used_bytes = total_bytes.saturating_sub(free_bytes);

        surviving_partitions.push(DiskStats {
            path: mount_path,
            fstype,
            total_bytes,
            free_bytes,
            used_bytes,
            used_pct: ratio_pct(used_bytes, total_bytes),
            model: None,
            serial: None,
            temperature_c: None,
        });
    }

    #[cfg(feature = "smart")]
    smart::enrich_partitions(&mut surviving_partitions);

    surviving_partitions
}

/// Saneo térmico: lecturas fuera de (0, 200] °C se descartan; las familias
/// PMU `tdev*`/`tdie*` se deduplican quedándose solo el sensor `*1`.
fn collect_temperatures() -> Vec<TempReading> {
    let components = Components::new_with_refreshed_list();
    let mut readings = Vec::new();

    for component in components.list() {
        let Some(raw_temperature) = component.temperature() else {
            continue;
        };
        let temperature_c = f64::from(raw_temperature);

        if temperature_c <= 0.0 || temperature_c > TEMP_CEILING_CELSIUS {
            continue;
        }

        let sensor_label = component.label().trim().to_string();
        if is_deduplicated_pmu_sensor(&sensor_label) {
            continue;
        }

        readings.push(TempReading {
            sensor: sensor_label,
            temperature_c,
        });
    }

    readings
}

fn is_deduplicated_pmu_sensor(label: &str) -> bool {
    let lowered = label.to_ascii_lowercase();
    for family_prefix in ["tdev", "tdie"] {
        if let Some(suffix) = lowered.strip_prefix(family_prefix) {
            let digits: String = suffix.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() && digits != "1" {
                return true;
            }
        }
    }
    false
}

/// Identidad de sistema servida en `GET /system/info`.
#[instrument(skip(vnstat_version))]
pub fn collect_system_info(vnstat_version: String) -> SystemInfo {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.refresh_memory();

    let cpu_model = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    SystemInfo {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        uptime_seconds: System::uptime(),
        vnstat_version,
        cpu_model,
        cpu_cores: num_cpus::get_physical() as i64,
        cpu_threads: num_cpus::get() as i64,
        total_memory_bytes: system.total_memory(),
    }
}

#[cfg(feature = "smart")]
mod smart {
    //! Enriquecimiento SMART vía `smartctl --json` (Linux y macOS NVMe).

    use netronome_domain_models::DiskStats;
    use serde::Deserialize;
    use std::process::Command;
    use tracing::debug;

    #[derive(Deserialize)]
    struct ScanDocument {
        #[serde(default)]
        devices: Vec<ScannedDevice>,
    }

    #[derive(Deserialize)]
    struct ScannedDevice {
        name: String,
    }

    #[derive(Deserialize)]
    struct SmartReport {
        #[serde(default)]
        model_name: Option<String>,
        #[serde(default)]
        serial_number: Option<String>,
        #[serde(default)]
        temperature: Option<SmartTemperature>,
    }

    #[derive(Deserialize)]
    struct SmartTemperature {
        #[serde(default)]
        current: Option<f64>,
    }

    /// Adjunta modelo/serie/temperatura SMART a las particiones cuyo
    /// dispositivo subyacente responde a smartctl. Best-effort.
    pub fn enrich_partitions(partitions: &mut [DiskStats]) {
        let Ok(scan_output) = Command::new("smartctl").args(["--scan", "-j"]).output() else {
            return;
        };
        let Ok(scan) = serde_json::from_slice::<ScanDocument>(&scan_output.stdout) else {
            return;
        };

        for device in scan.devices {
            let Ok(report_output) = Command::new("smartctl")
                .args(["-a", "-j", &device.name])
                .output()
            else {
                continue;
            };
            let Ok(report) = serde_json::from_slice::<SmartReport>(&report_output.stdout) else {
                continue;
            };

            debug!("💽 [SMART]: Report captured for {}.", device.name);

            for partition in partitions.iter_mut() {
                partition.model = partition.model.take().or_else(|| report.model_name.clone());
                partition.serial = partition
                    .serial
                    .take()
                    .or_else(|| report.serial_number.clone());
                partition.temperature_c = partition
                    .temperature_c
                    .take()
                    .or(report.temperature.as_ref().and_then(|t| t.current));
            }
        }
    }
}
