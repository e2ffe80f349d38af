// src/main.rs
// Command-line front end for the TDMS scaling engine

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use tdms_scale::{ChannelDocument, ScaleChain, ScalingStatus};

fn print_usage() {
    eprintln!("Usage: tdms_scale <command> <channels.json> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  info <file>              Show each channel's scale chain");
    eprintln!("  scale <file>             Print scaled values for every channel");
    eprintln!("  convert <file> <output>  Write raw and scaled values to CSV");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  tdms_scale info channels.json");
    eprintln!("  tdms_scale scale channels.json");
    eprintln!("  tdms_scale convert channels.json scaled.csv");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to trace chain evaluation.");
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];
    let input_file = &args[2];

    let document = match ChannelDocument::load(input_file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error loading channel file '{}': {}", input_file, e);
            process::exit(1);
        }
    };

    match command.as_str() {
        "info" => {
            print_info(&document);
        }

        "scale" => {
            let scaler = document.scaler();
            let results = scaler.scale_channels(&document.channels);
            let mut failed = 0;

            for (channel, result) in document.channels.iter().zip(results) {
                match result {
                    Ok(values) => {
                        println!("# {}", channel.name);
                        for value in values {
                            println!("{}", value);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error scaling channel '{}': {}", channel.name, e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                process::exit(1);
            }
        }

        "convert" => {
            if args.len() < 4 {
                eprintln!("Error: Missing output file argument");
                print_usage();
                process::exit(1);
            }

            let output_file = &args[3];
            match write_csv(&document, output_file) {
                Ok((written, failed)) => {
                    println!("Successfully converted {} to {}", input_file, output_file);
                    println!("Channels written: {}, failed: {}", written, failed);
                    if failed > 0 {
                        process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error writing CSV file '{}': {}", output_file, e);
                    process::exit(1);
                }
            }
        }

        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_info(document: &ChannelDocument) {
    println!("Channel Scaling Information");
    println!("===========================");
    println!();
    println!("RTD iteration limit: {}", document.config.rtd_max_iterations);
    println!("RTD tolerance: {:e} °C", document.config.rtd_tolerance);
    println!();

    for channel in &document.channels {
        println!("Channel: {}", channel.name);
        println!("  Samples: {}", channel.data.len());
        println!("  Properties: {}", channel.properties.len());

        match ScaleChain::from_properties(&channel.properties) {
            Ok(chain) => {
                let status = match chain.status {
                    ScalingStatus::Unscaled => "unscaled",
                    ScalingStatus::Scaled => "scaled",
                };
                println!("  Status: {}", status);
                if chain.is_empty() {
                    println!("  Scales: none");
                } else {
                    println!("  Scales:");
                    for line in chain.describe().lines() {
                        println!("    {}", line);
                    }
                }
            }
            Err(e) => println!("  Invalid scale chain: {}", e),
        }
        println!();
    }
}

/// Write `Channel,Sample,Raw,Scaled` rows; returns (written, failed) channel counts.
fn write_csv(document: &ChannelDocument, output_file: &str) -> std::io::Result<(usize, usize)> {
    let file = File::create(output_file)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Channel,Sample,Raw,Scaled")?;

    let results = document.scaler().scale_channels(&document.channels);
    let mut written = 0;
    let mut failed = 0;

    for (channel, result) in document.channels.iter().zip(results) {
        match result {
            Ok(values) => {
                for (idx, (raw, scaled)) in channel.data.iter().zip(values).enumerate() {
                    writeln!(writer, "{},{},{},{}", channel.name, idx, raw, scaled)?;
                }
                written += 1;
            }
            Err(e) => {
                eprintln!("Error scaling channel '{}': {}", channel.name, e);
                failed += 1;
            }
        }
    }

    writer.flush()?;
    Ok((written, failed))
}
