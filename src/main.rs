//! Rhythm Explorer CLI - parse, render and perform UPI patterns

use clap::{Parser, Subcommand, ValueEnum};
use rhythm_explorer::config::EngineConfig;
use rhythm_explorer::live_engine::{LiveEngine, UiSnapshot};
use rhythm_explorer::pattern_display::{
    render_circle, to_decimal_string, to_hex_string, to_octal_string,
};
use rhythm_explorer::upi::{ParseResult, UpiParser};
use rhythm_explorer::UpiError;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rhythm-explorer")]
#[command(about = "UPI rhythm pattern explorer", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for random generators (overrides the config)
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pattern and print the result
    Parse {
        upi: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render a pattern in one format
    Render {
        upi: String,

        #[arg(short, long, value_enum, default_value = "binary")]
        format: Format,
    },

    /// Load a pattern and trigger it repeatedly
    Trigger {
        upi: String,

        /// Number of triggers (default: 4)
        #[arg(short = 'n', long, default_value = "4")]
        count: usize,

        #[arg(long)]
        json: bool,
    },

    /// Interactive session: a pattern loads, an empty line triggers,
    /// `a N` toggles the accent at step N, `q` quits
    Repl {},
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Binary,
    Hex,
    Octal,
    Decimal,
    Circle,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    match cli.command {
        Commands::Parse { upi, json } => {
            let parser = match config.random_seed {
                Some(seed) => UpiParser::with_seed(seed),
                None => UpiParser::new(),
            };
            let result = parser.parse(&upi);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match &result {
                    ParseResult::Valid(parsed) => {
                        println!("{}", parsed.display_name);
                        println!("  pattern: {}", parsed.pattern);
                        println!(
                            "  steps:   {}  onsets: {}",
                            parsed.pattern.len(),
                            parsed.pattern.onset_count()
                        );
                        if let Some(accent) = &parsed.accent {
                            println!("  accent:  {}", accent);
                        }
                        if let Some(progressive) = &parsed.progressive {
                            println!("  progressive: {}", progressive);
                        }
                        if let Some(meta) = &parsed.quantization {
                            println!(
                                "  quantized: {} -> {} steps ({})",
                                meta.original_steps,
                                meta.target_steps,
                                if meta.clockwise { "clockwise" } else { "counter-clockwise" }
                            );
                        }
                    }
                    ParseResult::Invalid { message } => {
                        eprintln!("Invalid: {}", message);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Render { upi, format } => {
            let parser = match config.random_seed {
                Some(seed) => UpiParser::with_seed(seed),
                None => UpiParser::new(),
            };
            let parsed = parser.try_parse(&upi).map_err(explain)?;
            let pattern = parsed.pattern;
            let text = match format {
                Format::Binary => pattern.to_binary_string(),
                Format::Hex => to_hex_string(&pattern),
                Format::Octal => to_octal_string(&pattern),
                Format::Decimal => to_decimal_string(&pattern),
                Format::Circle => render_circle(&pattern, parsed.accent.as_ref()),
            };
            println!("{}", text);
        }

        Commands::Trigger { upi, count, json } => {
            let mut engine = LiveEngine::new(config);
            let snapshot = engine.set_upi(&upi).map_err(explain)?;
            print_snapshot(0, &snapshot, json)?;
            for i in 1..=count {
                let snapshot = engine.trigger()?;
                print_snapshot(i, &snapshot, json)?;
            }
        }

        Commands::Repl {} => run_repl(LiveEngine::new(config))?,
    }

    Ok(())
}

/// Render syntax errors with a caret before returning them
fn explain(error: UpiError) -> UpiError {
    if let UpiError::Syntax(diagnostic) = &error {
        eprint!("{}", diagnostic.render());
    }
    error
}

fn print_snapshot(
    index: usize,
    snapshot: &UiSnapshot,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    let position = match (&snapshot.scene, &snapshot.progressive) {
        (Some(scene), _) => format!("scene {}/{}", scene.active_slot + 1, scene.slots),
        (None, Some(state)) => format!(
            "offset {} after {} triggers",
            state.offset(),
            state.trigger_count()
        ),
        (None, None) => String::new(),
    };
    println!(
        "{:>3}  {}  {}  {}",
        index, snapshot.pattern, snapshot.displays.hex, position
    );
    Ok(())
}

fn run_repl(mut engine: LiveEngine) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "rhythm-explorer: enter a pattern, empty line to trigger, \
         'a N' to toggle an accent, 'q' to quit"
    );
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("upi> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        let result = if line == "q" || line == "quit" {
            break;
        } else if line.is_empty() {
            engine.trigger()
        } else if let Some(step) = line.strip_prefix("a ") {
            match step.trim().parse::<usize>() {
                Ok(step) => engine.toggle_accent(step),
                Err(_) => {
                    println!("usage: a <step>");
                    continue;
                }
            }
        } else if line == "reset" {
            engine.reset()
        } else {
            engine.set_upi(line)
        };

        match result {
            Ok(snapshot) => {
                println!("{}", render_circle(&snapshot.pattern, Some(&snapshot.accent_map)));
                println!(
                    "{}  {}  {}  {}",
                    snapshot.display_name,
                    snapshot.pattern,
                    snapshot.displays.hex,
                    snapshot.displays.decimal
                );
            }
            Err(UpiError::Syntax(diagnostic)) => print!("{}", diagnostic.render()),
            Err(e) => println!("error: {}", e),
        }
    }

    Ok(())
}
