// [tests/mirror/apps/agent/disk_filter.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL FILTRO DE PARTICIONES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: INCLUDES > EXCLUDES, PISO 1 GiB Y GLOBS
 * =================================================================
 */

use netronome_agent::disks::{DiskFilter, MIN_PARTITION_BYTES};

const TEN_GIB: u64 = 10 * 1024 * 1024 * 1024;

#[test]
fn partitions_below_one_gib_are_always_dropped() {
    let filter = DiskFilter::default();
    assert!(!filter.admits("/", "ext4", MIN_PARTITION_BYTES - 1));
    assert!(filter.admits("/", "ext4", MIN_PARTITION_BYTES));
}

#[test]
fn default_mount_prefixes_and_fstypes_are_excluded() {
    let filter = DiskFilter::default();

    for excluded_mount in ["/snap", "/snap/core22", "/run", "/dev/shm", "/proc", "/sys/kernel"] {
        assert!(
            !filter.admits(excluded_mount, "ext4", TEN_GIB),
            "{} must be excluded by default",
            excluded_mount
        );
    }

    for excluded_fstype in ["overlay", "tmpfs", "devtmpfs", "squashfs"] {
        assert!(
            !filter.admits("/mnt/scratch", excluded_fstype, TEN_GIB),
            "{} must be excluded by default",
            excluded_fstype
        );
    }

    assert!(filter.admits("/", "ext4", TEN_GIB));
    assert!(filter.admits("/home", "xfs", TEN_GIB));
}

#[test]
fn includes_win_over_excludes_and_defaults() {
    let filter = DiskFilter::new(
        vec!["/snap/important".to_string()],
        vec!["/snap/important".to_string()],
    );

    // Mismo patrón en ambas listas: el include prevalece.
    assert!(filter.admits("/snap/important", "squashfs", TEN_GIB));
    // El resto del prefijo /snap sigue excluido.
    assert!(!filter.admits("/snap/other", "squashfs", TEN_GIB));
}

#[test]
fn trailing_star_patterns_match_by_prefix() {
    let filter = DiskFilter::new(Vec::new(), vec!["/mnt/backup*".to_string()]);

    assert!(!filter.admits("/mnt/backup", "ext4", TEN_GIB));
    assert!(!filter.admits("/mnt/backup-nightly", "ext4", TEN_GIB));
    assert!(filter.admits("/mnt/media", "ext4", TEN_GIB));
}

#[test]
fn full_globs_match_against_path_and_basename() {
    let filter = DiskFilter::new(Vec::new(), vec!["vol?".to_string()]);

    // Basename "vol1" casa con el glob aunque la ruta completa no.
    assert!(!filter.admits("/mnt/vol1", "ext4", TEN_GIB));
    assert!(!filter.admits("/data/vol9", "ext4", TEN_GIB));
    assert!(filter.admits("/mnt/volume", "ext4", TEN_GIB));
}

#[test]
fn literal_patterns_require_an_exact_match() {
    let filter = DiskFilter::new(Vec::new(), vec!["/data".to_string()]);

    assert!(!filter.admits("/data", "ext4", TEN_GIB));
    assert!(filter.admits("/database", "ext4", TEN_GIB));
}
