//! eepromkv CLI
//!
//! Command-line interface for virtual EEPROM flash images.

use clap::{Parser, Subcommand};
use eepromkv::{Config, EepromError, FileFlash, Result, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// eepromkv CLI
#[derive(Parser, Debug)]
#[command(name = "eepromkv")]
#[command(about = "Inspect and edit virtual EEPROM flash images")]
#[command(version)]
struct Args {
    /// Flash image file (created erased if missing)
    #[arg(short, long, default_value = "./eeprom.img")]
    image: String,

    /// Pages in the page ring
    #[arg(short = 'n', long, default_value = "4")]
    pages: u32,

    /// Words (32-bit) per page
    #[arg(short = 'w', long, default_value = "512")]
    page_words: u32,

    /// Pages in the image file (defaults to base page + ring size)
    #[arg(short, long)]
    device_pages: Option<u32>,

    /// First image page used by the ring
    #[arg(short, long, default_value = "0")]
    base_page: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Erase the ring and make page 0 active
    Format,

    /// Get the value of a key
    Get {
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u16)]
        key: u16,
    },

    /// Set a key to a value
    Set {
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u16)]
        key: u16,

        /// Value (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u16)]
        value: u16,
    },

    /// Delete a key
    Del {
        /// Key (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_u16)]
        key: u16,
    },

    /// Get a length-prefixed byte array
    GetArray {
        /// First key of the array
        #[arg(value_parser = parse_u16)]
        key: u16,
    },

    /// Store a length-prefixed byte array
    SetArray {
        /// First key of the array
        #[arg(value_parser = parse_u16)]
        key: u16,

        /// Bytes as hex, e.g. "deadbeef"
        #[arg(value_parser = parse_hex)]
        bytes: HexBytes,
    },

    /// Delete a length-prefixed byte array
    DelArray {
        /// First key of the array
        #[arg(value_parser = parse_u16)]
        key: u16,
    },

    /// List every live key
    List,

    /// Rotate to the next page and drop stale slots
    Compact,

    /// Show the page ring wrap counter
    EraseCounter,

    /// Show the state of every page
    Inspect,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eepromkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("eepromkv v{}", eepromkv::VERSION);
    tracing::debug!("Image: {}", args.image);

    let device_pages = match device_pages(&args) {
        Ok(pages) => pages,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = Config::builder()
        .image_path(&args.image)
        .num_pages(args.pages)
        .base_page(args.base_page)
        .page_words(args.page_words)
        .device_pages(device_pages)
        .build();

    let mut store = match Store::open_image(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open image: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut store, args.command) {
        tracing::error!("{}", e);
        if matches!(e, EepromError::Unformatted) {
            eprintln!("hint: run `eepromkv format` first");
        }
        std::process::exit(1);
    }
}

/// Image size in pages: as given, or just large enough for the ring
fn device_pages(args: &Args) -> Result<u32> {
    if let Some(pages) = args.device_pages {
        return Ok(pages);
    }
    args.base_page.checked_add(args.pages.max(2)).ok_or_else(|| {
        EepromError::Config(format!(
            "base page {} plus {} ring pages overflows the page range",
            args.base_page, args.pages
        ))
    })
}

fn run(store: &mut Store<FileFlash>, command: Commands) -> Result<()> {
    match command {
        Commands::Format => return store.format(),
        Commands::Inspect => {
            // Inspect works on unformatted images; no init needed
            for page in store.inspect()? {
                println!(
                    "page {} (device {}): {:<12} erase_count={:<8} used={}/{} live={} tombstones={} crc32={:08x}",
                    page.index,
                    page.device_page,
                    page.status.to_string(),
                    page.erase_count
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    page.used_slots,
                    page.capacity,
                    page.live_keys,
                    page.tombstones,
                    page.crc32,
                );
            }
            return Ok(());
        }
        _ => store.init()?,
    }

    match command {
        Commands::Get { key } => match store.read(key)? {
            Some(value) => println!("{value:#06x} ({value})"),
            None => println!("(not found)"),
        },
        Commands::Set { key, value } => {
            store.write(key, value)?;
            println!("OK");
        }
        Commands::Del { key } => {
            let deleted = store.delete(key)?;
            println!("{}", if deleted { "deleted" } else { "(not found)" });
        }
        Commands::GetArray { key } => match store.read_array(key) {
            Ok(Some(bytes)) => println!("{}", hex::encode(bytes)),
            Ok(None) => println!("(not found)"),
            Err(EepromError::PartialArrayRead {
                recovered,
                expected,
            }) => {
                println!("{}", hex::encode(&recovered));
                eprintln!("warning: only {} of {} bytes present", recovered.len(), expected);
            }
            Err(e) => return Err(e),
        },
        Commands::SetArray { key, bytes } => {
            store.write_array(key, &bytes.0)?;
            println!("OK");
        }
        Commands::DelArray { key } => {
            let deleted = store.delete_array(key)?;
            println!("{}", if deleted { "deleted" } else { "(not found)" });
        }
        Commands::List => {
            for (key, value) in store.entries()? {
                println!("{key:#06x} = {value:#06x} ({value})");
            }
        }
        Commands::Compact => {
            store.compact()?;
            if let Some(page) = store.active_page() {
                println!("active page: {page}");
            }
        }
        Commands::EraseCounter => println!("{}", store.erase_counter()?),
        Commands::Format | Commands::Inspect => {} // handled before init
    }

    Ok(())
}

/// Parse decimal or 0x-prefixed hex
fn parse_u16(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

/// Byte string given on the command line
#[derive(Debug, Clone)]
struct HexBytes(Vec<u8>);

/// Parse a hex byte string, ignoring whitespace
fn parse_hex(s: &str) -> std::result::Result<HexBytes, String> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex '{}': {}", s, e))
}
