//! Register console for an nRF24L01 on a Linux spidev bus.
//!
//! ```bash
//! nrf24ctl regs
//! nrf24ctl read all
//! nrf24ctl write RF_CH 0x4c
//! nrf24ctl --device /dev/spidev0.0 --ce-pin 25 --trace status
//! ```

mod console;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;

use nrf24_backend::{BackendConfig, Lifecycle, SharedTrace, TraceEntry, TraceLog};
use nrf24_regs::{registers, Register, SpiFrame};

use console::RegisterConsole;

#[derive(Parser)]
#[command(name = "nrf24ctl")]
#[command(version)]
#[command(about = "Read and write nRF24L01 registers over spidev")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (default: <config dir>/nrf24ctl/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// spidev device, e.g. /dev/spidev1.0
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// sysfs GPIO number of the CE line
    #[arg(long, global = true)]
    ce_pin: Option<u32>,

    /// SPI clock in Hz
    #[arg(long, global = true)]
    speed: Option<u32>,

    /// Print the decoded bus traffic on exit
    #[arg(long, global = true)]
    trace: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one register, or `all`
    Read { register: String },

    /// Write a register; the value may be decimal, 0x.., 0o.. or 0b..
    Write {
        register: String,
        #[arg(value_parser = parse_value)]
        value: u64,
    },

    /// Show the decoded STATUS register
    Status,

    /// List the register map
    Regs,
}

#[derive(Serialize)]
struct RegisterValue {
    #[serde(flatten)]
    register: Register,
    value: u64,
}

fn parse_value(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let (digits, radix) = match s.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => (&s[2..], 16),
        Some("0o") => (&s[2..], 8),
        Some("0b") => (&s[2..], 2),
        _ => (s.as_str(), 10),
    };
    u64::from_str_radix(digits, radix).map_err(|e| format!("`{s}`: {e}"))
}

fn lookup(name: &str) -> Result<Register> {
    Register::from_name(name).ok_or_else(|| {
        let names: Vec<&str> = registers::ALL.iter().map(|r| r.name).collect();
        anyhow!("unknown register `{name}`, expected one of: {}", names.join(", "))
    })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nrf24ctl").join("config.json"))
}

fn load_config(cli: &Cli) -> Result<BackendConfig> {
    let mut config = match &cli.config {
        Some(path) => BackendConfig::load(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => BackendConfig::load(&path)?,
            None => BackendConfig::default(),
        },
    };
    if let Some(device) = &cli.device {
        config.spi_device = device.clone();
    }
    if let Some(pin) = cli.ce_pin {
        config.ce_pin = pin;
    }
    if let Some(speed) = cli.speed {
        config.speed_hz = speed;
    }
    if cli.trace && config.trace_capacity == 0 {
        config.trace_capacity = 256;
    }
    config.validate()?;
    debug!("configuration: {config:?}");
    Ok(config)
}

fn format_entry(entry: &TraceEntry) -> String {
    let since_midnight = entry.timestamp % 86_400_000;
    let (hours, minutes) = (since_midnight / 3_600_000, since_midnight / 60_000 % 60);
    let (seconds, millis) = (since_midnight / 1000 % 60, since_midnight % 1000);
    let stamp = format!("[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}]");

    if !entry.ok {
        return match entry.opcode() {
            Some(opcode) => format!("{stamp} 0x{opcode:02X} FAILED >> {}", hex::encode(&entry.mosi)),
            None => format!("{stamp} FAILED"),
        };
    }
    match SpiFrame::decode(&entry.mosi, &entry.miso) {
        Some(frame) => format!("{stamp} {frame}"),
        None => format!("{stamp} <empty>"),
    }
}

fn dump_trace(trace: &SharedTrace) {
    let log = trace.lock();
    eprintln!("-- {} transactions (UTC) --", log.len());
    for entry in log.entries() {
        eprintln!("{}", format_entry(entry));
    }
}

fn print_values(values: &[RegisterValue], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(values)?);
        return Ok(());
    }
    for v in values {
        let digits = usize::from(v.register.width) * 2;
        println!("{}: 0x{:0digits$x}", v.register.name, v.value);
    }
    Ok(())
}

fn run(cli: &Cli, config: BackendConfig, trace: &SharedTrace) -> Result<()> {
    if let Commands::Regs = cli.command {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&registers::ALL)?);
        } else {
            for r in registers::ALL {
                println!("0x{:02X}  {:<12} {} byte(s)", r.address, r.name, r.width);
            }
        }
        return Ok(());
    }

    let device = config.spi_device.clone();
    let mut console = RegisterConsole::default();
    let mut lifecycle = Lifecycle::new(config).with_trace(trace.clone());
    lifecycle
        .start(&mut console)
        .with_context(|| format!("failed to bring up nRF24L01 on {}", device.display()))?;

    match &cli.command {
        Commands::Read { register } if register.eq_ignore_ascii_case("all") => {
            let values = registers::ALL
                .iter()
                .map(|&r| Ok(RegisterValue { register: r, value: console.read(r)? }))
                .collect::<Result<Vec<_>>>()?;
            print_values(&values, cli.json)?;
        }
        Commands::Read { register } => {
            let register = lookup(register)?;
            let value = console.read(register)?;
            print_values(&[RegisterValue { register, value }], cli.json)?;
        }
        Commands::Write { register, value } => {
            let register = lookup(register)?;
            let value = console.write_checked(register, *value)?;
            print_values(&[RegisterValue { register, value }], cli.json)?;
        }
        Commands::Status => {
            let status = console.status()?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": status.0, "decoded": status.to_string() }));
            } else {
                println!("STATUS: {status}");
            }
        }
        Commands::Regs => unreachable!("handled above"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let config = load_config(&cli)?;
    let trace = TraceLog::shared(config.trace_capacity);
    let result = run(&cli, config, &trace);
    if cli.trace {
        dump_trace(&trace);
    }
    result
}
