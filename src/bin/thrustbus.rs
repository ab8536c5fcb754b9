use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use serde_json::json;
use thrustbus::checksum::verify_packet;
use thrustbus::packet::{CHECKSUM_OFFSET, PACKET_LEN};
use thrustbus::{BenchConfig, ControlMode, FaultBitPolicy, PacketEncoder, Reply, ReplyDecoder, ReplyFormat, ThrusterId};
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("thrustbus")
        .version("0.1.0")
        .author("Propulsion Test Engineering Team")
        .about("🚤 Thruster fast-packet codec - build command packets and read telemetry replies")
        .arg(
            Arg::with_name("id")
                .short("i")
                .long("id")
                .value_name("ID")
                .help("Thruster id (1-7), overrides the configuration file")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Bench configuration (JSON)")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log codec activity to stderr")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("encode")
                .about("📦 Build a 44-byte fast packet")
                .arg(
                    Arg::with_name("rpm")
                        .help("Target rpm, clamped to 0-2200")
                        .required(true)
                        .allow_hyphen_values(true),
                )
                .arg(
                    Arg::with_name("direction")
                        .short("d")
                        .long("direction")
                        .help("Rotation direction")
                        .takes_value(true)
                        .possible_values(&["f", "r"])
                        .default_value("f"),
                )
                .arg(
                    Arg::with_name("closed-loop")
                        .long("closed-loop")
                        .help("Regulate to the commanded rpm instead of running open loop"),
                ),
        )
        .subcommand(
            SubCommand::with_name("decode")
                .about("📡 Decode a thruster reply frame")
                .arg(
                    Arg::with_name("frame")
                        .help("Reply bytes as hex")
                        .required(true),
                )
                .arg(
                    Arg::with_name("fault-policy")
                        .long("fault-policy")
                        .help("How status bits map to fault flags")
                        .takes_value(true)
                        .possible_values(&["nonzero", "literal"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("🔍 Check length and checksum of a fast packet")
                .arg(
                    Arg::with_name("packet")
                        .help("Packet bytes as hex")
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("sweep")
                .about("📈 Encode one packet per rpm step of the configured sweep"),
        )
        .subcommand(
            SubCommand::with_name("config")
                .about("🛠️  Print the effective bench configuration"),
        )
        .get_matches();

    let format = matches.value_of("format").unwrap_or("table");
    let verbose = matches.is_present("verbose");

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&matches)?;

    match matches.subcommand() {
        ("encode", Some(sub_matches)) => handle_encode(sub_matches, &config, format)?,
        ("decode", Some(sub_matches)) => handle_decode(sub_matches, &config, format)?,
        ("verify", Some(sub_matches)) => handle_verify(sub_matches, format)?,
        ("sweep", _) => handle_sweep(&config, format)?,
        ("config", _) => println!("{}", config.to_json_pretty()?),
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            println!("{}", "Quick start:".bright_green());
            println!("  {} Build a packet for 1200 rpm", "thrustbus encode 1200".bright_cyan());
            println!("  {} Decode a reply", "thrustbus decode <hex>".bright_cyan());
        }
    }

    Ok(())
}

fn load_config(matches: &ArgMatches<'_>) -> Result<BenchConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::default(),
    };
    if let Some(id) = matches.value_of("id") {
        let id = id
            .parse::<i64>()
            .map_err(|_| format!("thruster id must be a number, got '{}'", id))?;
        config.thruster_id = ThrusterId::new(id)?;
    }
    Ok(config)
}

fn parse_hex(text: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&cleaned).map_err(|e| format!("invalid hex input: {}", e).into())
}

fn handle_encode(matches: &ArgMatches<'_>, config: &BenchConfig, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let encoder = config.encoder();
    let mode = if matches.is_present("closed-loop") {
        ControlMode::ClosedLoop
    } else {
        ControlMode::OpenLoop
    };
    let rpm = matches.value_of("rpm").unwrap_or_default();
    let direction = matches.value_of("direction").unwrap_or("f");

    let packet = match encoder.encode_str(rpm, direction, mode) {
        Ok(packet) => packet,
        Err(e) => {
            eprintln!("{} {}", "❌".red(), e.to_string().bright_red());
            return Err(e.into());
        }
    };

    match format {
        "json" => {
            let output = json!({
                "thruster": encoder.thruster_id().get(),
                "rpm": rpm.trim(),
                "direction": direction,
                "mode": mode,
                "demand": packet.demand(encoder.thruster_id()),
                "checksum": packet.checksum(),
                "packet": packet.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "compact" => println!("{}", packet),
        _ => {
            let bytes = packet.as_bytes();
            println!("{} {}", "📦".bright_blue(), format!("Fast packet for thruster {}", encoder.thruster_id()).bright_blue().bold());
            println!("{} {}", "Demand:".bright_white(), packet.demand(encoder.thruster_id()).to_string().bright_cyan());
            println!("{} {}", "Mode:".bright_white(), mode);
            for (row, chunk) in bytes.chunks(11).enumerate() {
                let line: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
                println!("  {:02}: {}", row * 11, line.join(" "));
            }
            println!("{} {:#04x}", "Checksum:".bright_white(), bytes[CHECKSUM_OFFSET]);
        }
    }
    Ok(())
}

fn handle_decode(matches: &ArgMatches<'_>, config: &BenchConfig, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let frame = parse_hex(matches.value_of("frame").unwrap_or_default())?;
    let decoder = match matches.value_of("fault-policy") {
        Some("literal") => ReplyDecoder::with_policy(FaultBitPolicy::LiteralEqualsOne),
        Some(_) => ReplyDecoder::with_policy(FaultBitPolicy::Nonzero),
        None => config.decoder(),
    };

    let reply_format = if format == "compact" {
        ReplyFormat::Condensed
    } else {
        ReplyFormat::Structured
    };

    match decoder.decode(&frame, reply_format) {
        Reply::NoData => {
            println!("{} No data ({} bytes received)", "⏳".yellow(), frame.len());
        }
        Reply::Condensed(record) => println!("{}", record),
        Reply::Telemetry(telemetry) => {
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&telemetry)?);
            } else {
                println!("{}", telemetry.report());
                println!(
                    "{} {:.1} W at {} V",
                    "Power:".bright_white(),
                    telemetry.power_watts(config.supply_voltage),
                    config.supply_voltage
                );
                if telemetry.faults.any() {
                    println!("{} {}", "⚠️".yellow(), "Thruster reports a fault".bright_red());
                }
            }
        }
    }
    Ok(())
}

fn handle_verify(matches: &ArgMatches<'_>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let packet = parse_hex(matches.value_of("packet").unwrap_or_default())?;
    let valid = verify_packet(&packet);

    match format {
        "json" => println!("{}", json!({ "length": packet.len(), "valid": valid })),
        "compact" => println!("{}", if valid { "OK" } else { "BAD" }),
        _ => {
            if valid {
                println!("{} {}", "✅".green(), "Packet length and checksum are valid".bright_green());
            } else if packet.len() != PACKET_LEN {
                println!("{} Expected {} bytes, got {}", "❌".red(), PACKET_LEN, packet.len());
            } else {
                println!("{} {}", "❌".red(), "Checksum mismatch".bright_red());
            }
        }
    }
    Ok(())
}

fn handle_sweep(config: &BenchConfig, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let encoder: PacketEncoder = config.encoder();
    let steps: Vec<_> = config
        .sweep_commands()
        .into_iter()
        .map(|command| (command, encoder.encode_command(&command)))
        .collect();

    match format {
        "json" => {
            let output: Vec<_> = steps
                .iter()
                .map(|(command, packet)| json!({ "rpm": command.rpm, "packet": packet.to_string() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "compact" => {
            for (_, packet) in &steps {
                println!("{}", packet);
            }
        }
        _ => {
            println!("{} {}", "📈".bright_blue(), format!("Sweep for thruster {} ({})", config.thruster_id, config.mode).bright_blue().bold());
            for (command, packet) in &steps {
                println!("{:>6} rpm  {}", command.rpm.to_string().bright_cyan(), packet);
            }
        }
    }
    Ok(())
}
