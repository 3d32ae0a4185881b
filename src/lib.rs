//! # Rhythm Explorer - UPI rhythm notation engine
//!
//! Parses a compact rhythm notation (UPI) into fixed-length onset patterns
//! and keeps the per-pattern state needed for live performance.
//!
//! ## Core Features
//!
//! - **Generators**: Euclidean `E(k,n)`, Barlow `B(k,n)`, Wolrab `W(k,n)`,
//!   Dilcue `D(k,n)`, polygons `P(s,o,n)`, random `R(k,n)` and `R(r,n)`
//! - **Literals**: binary, `0x` hex, `o` octal, `d` decimal, `[0,3,6]:8`
//!   arrays and `m:` Morse
//! - **Combination**: `+ & ^ -` on an LCM grid, whitespace concatenation
//! - **Progressive suffixes**: offset `+N`, lengthening `*N`,
//!   transformation `B>N`, plus quantization `;N`
//! - **Scenes**: `|`-separated lists cycled by triggers
//! - **Accents**: `{accent}pattern` cycling over onsets, with manual
//!   suspension
//!
//! ## Quick Start
//!
//! ```rust
//! use rhythm_explorer::upi::{ParseResult, UpiParser};
//!
//! let parser = UpiParser::new();
//! match parser.parse("E(3,8)") {
//!     ParseResult::Valid(parsed) => assert_eq!(parsed.pattern.to_string(), "10010010"),
//!     ParseResult::Invalid { message } => panic!("{}", message),
//! }
//! ```
//!
//! ### Live use
//!
//! ```rust
//! use rhythm_explorer::config::EngineConfig;
//! use rhythm_explorer::live_engine::LiveEngine;
//!
//! let mut engine = LiveEngine::new(EngineConfig::default().with_seed(1));
//! let playback = engine.playback_view();
//!
//! engine.set_upi("E(5,8)+2").unwrap();
//! let snapshot = engine.trigger().unwrap();
//! assert_eq!(snapshot.onsets, 5);
//!
//! // realtime side
//! let first = playback.tick(0);
//! assert!(!first.onset);
//! ```

pub mod accent;
pub mod codec;
pub mod combiner;
pub mod config;
pub mod error_diagnostics;
pub mod generators;
pub mod live_engine;
pub mod nom_parser;
pub mod pattern;
pub mod pattern_display;
pub mod progressive;
pub mod quantize;
pub mod scene;
pub mod upi;

pub use error_diagnostics::UpiError;
pub use pattern::StepPattern;
pub use upi::{parse, ParseResult, ParsedPattern, UpiParser};
