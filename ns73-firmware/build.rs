//! Build script for ns73-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates transmitter.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Number of channels in the NS73 channel table
const CHANNEL_COUNT: i64 = 103;

/// Frequency of channel 0 (tenths of MHz)
const BASE_FREQUENCY: i64 = 875;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate transmitter.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=transmitter.toml");

    let config_path = Path::new("transmitter.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: transmitter.toml not found!                              ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds transmitter.toml as its default settings.   ║\n\
            ║  Please create one in the ns73-firmware directory.               ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read transmitter.toml                          ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in transmitter.toml                  ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    validate_startup(&config, &mut errors);
    validate_bands(&config, &mut errors);
    validate_timing(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid transmitter.toml                                 ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }

    println!("cargo:warning=transmitter.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look up an optional integer key, checking its range
fn int_in_range(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> Option<i64> {
    match table.get(key) {
        None => None,
        Some(toml::Value::Integer(n)) if range.contains(n) => Some(*n),
        Some(toml::Value::Integer(n)) => {
            errors.push(format!(
                "[{}] {} = {} is outside {}..={}",
                section,
                key,
                n,
                range.start(),
                range.end()
            ));
            None
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
    }
}

/// Check an optional boolean key
fn check_bool(table: &toml::value::Table, section: &str, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        if !value.is_bool() {
            errors.push(format!("[{}] {} must be true or false", section, key));
        }
    }
}

/// Reject keys the firmware does not understand
fn check_known_keys(
    table: &toml::value::Table,
    section: &str,
    known: &[&str],
    errors: &mut Vec<String>,
) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            errors.push(format!("[{}] unknown key '{}'", section, key));
        }
    }
}

fn section<'a>(config: &'a toml::Value, name: &str, errors: &mut Vec<String>) -> Option<&'a toml::value::Table> {
    match config.get(name) {
        None => None,
        Some(toml::Value::Table(table)) => Some(table),
        Some(_) => {
            errors.push(format!("'{}' must be a [section]", name));
            None
        }
    }
}

fn validate_startup(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(startup) = section(config, "startup", errors) else {
        return;
    };
    check_known_keys(
        startup,
        "startup",
        &["channel", "frequency", "tx_power", "attenuation", "online", "muted"],
        errors,
    );

    int_in_range(startup, "startup", "channel", 0..=CHANNEL_COUNT - 1, errors);
    // The top channel also accepts the odd tenth above it
    let max_frequency = BASE_FREQUENCY + 2 * CHANNEL_COUNT - 1;
    int_in_range(startup, "startup", "frequency", BASE_FREQUENCY..=max_frequency, errors);
    if startup.contains_key("channel") && startup.contains_key("frequency") {
        errors.push("[startup] set either channel or frequency, not both".to_string());
    }

    int_in_range(startup, "startup", "tx_power", 1..=3, errors);
    int_in_range(startup, "startup", "attenuation", 0..=2, errors);
    check_bool(startup, "startup", "online", errors);
    check_bool(startup, "startup", "muted", errors);
}

fn validate_bands(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bands) = section(config, "bands", errors) else {
        return;
    };
    check_known_keys(bands, "bands", &["band0_start", "band1_start", "band2_start"], errors);

    let band0 = int_in_range(bands, "bands", "band0_start", 0..=CHANNEL_COUNT, errors).unwrap_or(71);
    let band1 = int_in_range(bands, "bands", "band1_start", 0..=CHANNEL_COUNT, errors).unwrap_or(41);
    let band2 = int_in_range(bands, "bands", "band2_start", 0..=CHANNEL_COUNT, errors).unwrap_or(12);

    if !(band2 <= band1 && band1 <= band0) {
        errors.push(format!(
            "[bands] need band2_start <= band1_start <= band0_start (got {}, {}, {})",
            band2, band1, band0
        ));
    }
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(timing) = section(config, "timing", errors) else {
        return;
    };
    check_known_keys(
        timing,
        "timing",
        &[
            "cex_settle_ms",
            "search_settle_ms",
            "lock_samples",
            "lock_sample_interval_us",
            "bus_reset_settle_us",
        ],
        errors,
    );

    let u32_max = i64::from(u32::MAX);
    int_in_range(timing, "timing", "cex_settle_ms", 0..=u32_max, errors);
    int_in_range(timing, "timing", "search_settle_ms", 0..=u32_max, errors);
    int_in_range(timing, "timing", "lock_samples", 1..=255, errors);
    int_in_range(timing, "timing", "lock_sample_interval_us", 0..=u32_max, errors);
    int_in_range(timing, "timing", "bus_reset_settle_us", 0..=u32_max, errors);
}
