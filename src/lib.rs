//! # glaemscribe
//!
//! Rule-driven transliteration engine: transcribes text written in one
//! orthography into another by walking an author-defined rule set, most
//! commonly Latin-alphabet text into Tengwar PUA code points.
//!
//! ## Features
//!
//! - Pure Rust, no bindings to the original JavaScript engine
//! - Loads modes and charsets directly from their plain-text source format
//! - Longest-match, anchor-aware rule application via a `TranscriptionTree`
//! - Parallel batch transcription via `rayon`
//! - A full debug trace (`DebugRecord`) of every pipeline stage
//!
//! ## Example
//!
//! ```no_run
//! use glaemscribe::Mode;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mode_source = std::fs::read_to_string("quenya.gmode")?;
//! let charset_source = std::fs::read_to_string("tengwar-annatar.gcharset")?;
//! let mode = Mode::from_source(&mode_source, &charset_source)?;
//!
//! let result = mode.transcribe("ai laurie lantar lassi surinen");
//! println!("{}", result.output);
//! # Ok(())
//! # }
//! ```

pub mod charset;
pub mod debug;
pub mod error;
pub mod fragment;
pub mod invariants;
pub mod macro_def;
pub mod mode;
pub mod modefile;
pub mod options;
pub mod postprocessor;
pub mod preprocessor;
pub mod processor;
pub mod resource;
pub mod rule;
pub mod rule_group;
pub mod token;
pub mod tree;
pub mod variable;

pub use charset::Charset;
pub use debug::DebugRecord;
pub use error::{Error, FinalizeError, ParseError, RuntimeWarning};
pub use mode::{Mode, TranscribeResult};
pub use options::{OptionValue, OptionsMap};
pub use resource::{default_resource_root, list_available_modes, ModeDescriptor, ResourceKind};
pub use token::{BoundaryKind, Token};
