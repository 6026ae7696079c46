// [apps/agent/src/disks.rs]
/*!
 * =================================================================
 * APARATO: DISK PARTITION FILTER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: SEMÁNTICA INCLUDE/EXCLUDE DE PARTICIONES
 *
 * Reglas: los includes ganan a los excludes. Patrones: literal,
 * prefijo con `*` final, o glob completo (contrastado contra la ruta
 * completa y contra el basename). Particiones < 1 GiB se omiten.
 * =================================================================
 */

use regex::Regex;

/// Piso de tamaño: por debajo de 1 GiB la partición no se reporta.
pub const MIN_PARTITION_BYTES: u64 = 1024 * 1024 * 1024;

/// Prefijos de montaje excluidos por defecto.
const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["/snap", "/run", "/dev", "/proc", "/sys"];

/// Sistemas de archivos efímeros/overlay excluidos por defecto.
const DEFAULT_EXCLUDED_FSTYPES: &[&str] = &["overlay", "tmpfs", "devtmpfs", "devfs", "squashfs"];

#[derive(Debug, Clone, Default)]
pub struct DiskFilter {
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl DiskFilter {
    pub fn new(include_patterns: Vec<String>, exclude_patterns: Vec<String>) -> Self {
        Self {
            include_patterns,
            exclude_patterns,
        }
    }

    /// Decide si una partición entra en la instantánea de hardware.
    pub fn admits(&self, mount_path: &str, fstype: &str, total_bytes: u64) -> bool {
        if total_bytes < MIN_PARTITION_BYTES {
            return false;
        }

        // Includes explícitos: vencen a cualquier exclusión.
        if matches_any(&self.include_patterns, mount_path) {
            return true;
        }

        if matches_any(&self.exclude_patterns, mount_path) {
            return false;
        }

        if DEFAULT_EXCLUDED_FSTYPES.contains(&fstype) {
            return false;
        }

        if DEFAULT_EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| mount_path == *prefix || mount_path.starts_with(&format!("{}/", prefix)))
        {
            return false;
        }

        true
    }
}

/// Contrasta un patrón contra la ruta completa y contra su basename.
fn matches_any(patterns: &[String], mount_path: &str) -> bool {
    let basename = mount_path.rsplit('/').next().unwrap_or(mount_path);

    patterns.iter().any(|pattern| {
        matches_pattern(pattern, mount_path) || matches_pattern(pattern, basename)
    })
}

fn matches_pattern(pattern: &str, candidate: &str) -> bool {
    // 1. Literal exacto.
    if !pattern.contains('*') && !pattern.contains('?') {
        return pattern == candidate;
    }

    // 2. Prefijo: un único `*` final.
    if let Some(prefix) = pattern.strip_suffix('*') {
        if !prefix.contains('*') && !prefix.contains('?') {
            return candidate.starts_with(prefix);
        }
    }

    // 3. Glob completo: traducción a regex anclada.
    let mut translated = String::with_capacity(pattern.len() * 2);
    translated.push('^');
    for character in pattern.chars() {
        match character {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');

    Regex::new(&translated)
        .map(|compiled| compiled.is_match(candidate))
        .unwrap_or(false)
}
