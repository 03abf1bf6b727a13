//! Build script for harp-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates device.toml and compiles it into a `DeviceConfig` constant

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Longest device name the name register holds
const MAX_NAME_LEN: usize = 25;

/// GPIOs reserved for the host link UART
const UART_PINS: [u8; 2] = [0, 1];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceFile {
    device: DeviceSection,
    #[serde(default)]
    clock: ClockSection,
    #[serde(default)]
    events: EventsSection,
    #[serde(default)]
    uart: UartSection,
    pins: PinsSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceSection {
    who_am_i: u16,
    name: String,
    #[serde(default)]
    serial_number: u16,
    #[serde(default)]
    assembly_version: u8,
    hardware_version: [u8; 2],
    firmware_version: [u8; 2],
    harp_version: [u8; 2],
    #[serde(default)]
    operation_control: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClockSection {
    read_compensation_us: u32,
    write_compensation_us: u32,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            read_compensation_us: 161,
            write_compensation_us: 170,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventsSection {
    heartbeat_period_ms: u32,
    #[serde(default)]
    status_period_ms: u32,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            heartbeat_period_ms: 1000,
            status_period_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UartSection {
    baudrate: u32,
}

impl Default for UartSection {
    fn default() -> Self {
        Self { baudrate: 1_000_000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PinsSection {
    indicator: u8,
    digital_io: u8,
    edge_input: u8,
    edge: String,
}

fn main() {
    setup_linker();
    let config = load_config();
    write_config(&config);
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
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    #[cfg(feature = "defmt")]
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read, parse and validate device.toml
fn load_config() -> DeviceFile {
    println!("cargo:rerun-if-changed=device.toml");

    let path = Path::new("device.toml");
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read device.toml", &[e.to_string()]),
    };

    let config: DeviceFile = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail(
            "Invalid device.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let errors = validate(&config);
    if !errors.is_empty() {
        fail("Invalid values in device.toml", &errors);
    }

    println!("cargo:warning=device.toml validated successfully");
    config
}

fn validate(config: &DeviceFile) -> Vec<String> {
    let mut errors = Vec::new();

    let name = &config.device.name;
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        errors.push(format!(
            "[device] name must be 1-{} bytes (got {})",
            MAX_NAME_LEN,
            name.len()
        ));
    }
    if !name.is_ascii() {
        errors.push("[device] name must be ASCII".to_string());
    }
    if config.events.heartbeat_period_ms == 0 {
        errors.push("[events] heartbeat_period_ms must be > 0".to_string());
    }
    if config.uart.baudrate == 0 {
        errors.push("[uart] baudrate must be > 0".to_string());
    }
    if edge_variant(&config.pins.edge).is_none() {
        errors.push(format!(
            "[pins] edge '{}' must be rising, falling or any",
            config.pins.edge
        ));
    }

    let pins = [
        ("indicator", config.pins.indicator),
        ("digital_io", config.pins.digital_io),
        ("edge_input", config.pins.edge_input),
    ];
    for (i, (name, pin)) in pins.iter().enumerate() {
        if *pin >= 30 {
            errors.push(format!("[pins] {} = {} is not a GPIO (0-29)", name, pin));
        }
        if UART_PINS.contains(pin) {
            errors.push(format!("[pins] {} = {} is reserved for the host UART", name, pin));
        }
        if pins[..i].iter().any(|(_, other)| other == pin) {
            errors.push(format!("[pins] {} = {} is assigned twice", name, pin));
        }
    }

    errors
}

fn edge_variant(edge: &str) -> Option<&'static str> {
    match edge {
        "rising" => Some("Rising"),
        "falling" => Some("Falling"),
        "any" => Some("Any"),
        _ => None,
    }
}

/// Generate `$OUT_DIR/device_config.rs`
fn write_config(config: &DeviceFile) {
    let d = &config.device;
    let edge = edge_variant(&config.pins.edge).unwrap_or("Any");
    let source = format!(
        "/// Device configuration from device.toml\n\
         pub const DEVICE: harp_core::DeviceConfig = harp_core::DeviceConfig {{\n\
         \x20   who_am_i: {who_am_i},\n\
         \x20   hw_version: harp_core::Version::new({hw0}, {hw1}),\n\
         \x20   assembly_version: {assembly},\n\
         \x20   harp_version: harp_core::Version::new({harp0}, {harp1}),\n\
         \x20   fw_version: harp_core::Version::new({fw0}, {fw1}),\n\
         \x20   serial_number: {serial},\n\
         \x20   device_name: {name:?},\n\
         \x20   operation_control: {ctrl},\n\
         \x20   heartbeat_period_ms: {heartbeat},\n\
         \x20   clock: harp_core::ClockConfig {{\n\
         \x20       read_compensation_us: {read_comp},\n\
         \x20       write_compensation_us: {write_comp},\n\
         \x20   }},\n\
         }};\n\
         pub const STATUS_PERIOD_MS: u32 = {status};\n\
         pub const UART_BAUDRATE: u32 = {baud};\n\
         pub const INDICATOR_PIN: u8 = {indicator};\n\
         pub const DIGITAL_IO_PIN: u8 = {dio};\n\
         pub const EDGE_INPUT_PIN: u8 = {edge_pin};\n\
         pub const EDGE_TRIGGER: harp_hal::Edge = harp_hal::Edge::{edge};\n",
        who_am_i = d.who_am_i,
        hw0 = d.hardware_version[0],
        hw1 = d.hardware_version[1],
        assembly = d.assembly_version,
        harp0 = d.harp_version[0],
        harp1 = d.harp_version[1],
        fw0 = d.firmware_version[0],
        fw1 = d.firmware_version[1],
        serial = d.serial_number,
        name = d.name,
        ctrl = d.operation_control,
        heartbeat = config.events.heartbeat_period_ms,
        read_comp = config.clock.read_compensation_us,
        write_comp = config.clock.write_compensation_us,
        status = config.events.status_period_ms,
        baud = config.uart.baudrate,
        indicator = config.pins.indicator,
        dio = config.pins.digital_io,
        edge_pin = config.pins.edge_input,
        edge = edge,
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("device_config.rs"), source).unwrap();
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
