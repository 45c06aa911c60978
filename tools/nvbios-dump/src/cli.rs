//! Command line parsing and [`DumpConfig`] construction.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, builder::EnumValueParser};
use nvbios::directory::DiscoveryMode;

use crate::print::PrintMask;

/// Description of what `nvbios-dump` should decode and how much it should print.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DumpConfig {
    /// The path of the BIOS image.
    pub image: PathBuf,
    /// Where the 'T' directory is declared.
    pub location: Location,
    /// How the directory is walked.
    pub discovery: DiscoveryMode,
    /// The sections to print and how.
    pub mask: PrintMask,
}

impl DumpConfig {
    /// Returns `true` if verbose output and debug logging are enabled.
    pub fn verbose(&self) -> bool {
        self.mask.contains(PrintMask::VERBOSE)
    }
}

/// Where the 'T' directory is declared.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Location {
    /// Read the BIT 'T' entry at the given offset.
    Entry(u64),
    /// Use a directory at a known offset and length.
    Raw {
        /// The absolute offset of slot zero.
        base: u64,
        /// The byte length of the directory.
        length: u16,
        /// The version reported for the directory.
        version: u8,
    },
}

/// Selectable directory walks.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum DiscoveryArg {
    /// Stop at the first slot that fails to resolve.
    #[default]
    Contiguous,
    /// Resolve every registered slot.
    Every,
}

impl DiscoveryArg {
    /// Returns the textual representation of the [`DiscoveryArg`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contiguous => "contiguous",
            Self::Every => "every",
        }
    }

    /// Returns the [`DiscoveryMode`] this [`DiscoveryArg`] selects.
    pub fn mode(&self) -> DiscoveryMode {
        match self {
            Self::Contiguous => DiscoveryMode::Contiguous,
            Self::Every => DiscoveryMode::EveryRegistered,
        }
    }
}

impl clap::ValueEnum for DiscoveryArg {
    fn value_variants<'a>() -> &'a [Self] {
        static DISCOVERIES: &[DiscoveryArg] = &[DiscoveryArg::Contiguous, DiscoveryArg::Every];

        DISCOVERIES
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Sections that can be selected for printing.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum Section {
    /// The 'T' directory and its tables.
    #[default]
    T,
    /// Nothing, only diagnostics are reported.
    None,
}

impl Section {
    /// Returns the textual representation of the [`Section`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::T => "t",
            Self::None => "none",
        }
    }

    /// Returns the [`PrintMask`] bits this [`Section`] enables.
    pub fn mask(&self) -> PrintMask {
        match self {
            Self::T => PrintMask::T,
            Self::None => PrintMask::empty(),
        }
    }
}

impl clap::ValueEnum for Section {
    fn value_variants<'a>() -> &'a [Self] {
        static SECTIONS: &[Section] = &[Section::T, Section::None];

        SECTIONS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Parses `nvbios-dump`'s arguments to construct a [`DumpConfig`].
pub fn get_config() -> DumpConfig {
    parse_arguments(&command_parser().get_matches())
}

/// Parses the arguments required to produce a valid [`DumpConfig`].
pub fn parse_arguments(matches: &ArgMatches) -> DumpConfig {
    let image = matches
        .get_one::<PathBuf>("image")
        .cloned()
        .unwrap_or_else(|| unreachable!("`image` is a required argument"));

    let location = match matches.get_one::<u64>("entry").copied() {
        Some(offset) => Location::Entry(offset),
        None => Location::Raw {
            base: matches
                .get_one::<u64>("base")
                .copied()
                .unwrap_or_else(|| unreachable!("`entry` or `base` is required")),
            length: matches
                .get_one::<u16>("length")
                .copied()
                .unwrap_or_else(|| unreachable!("`base` requires `length`")),
            version: matches
                .get_one::<u8>("bit-version")
                .copied()
                .unwrap_or_else(|| unreachable!("`bit-version` should have a default value")),
        },
    };

    let discovery = matches
        .get_one::<DiscoveryArg>("discovery")
        .copied()
        .unwrap_or_else(|| unreachable!("`discovery` should have a default value"));

    let mut mask = matches
        .get_many::<Section>("print")
        .into_iter()
        .flatten()
        .fold(PrintMask::empty(), |mask, section| mask | section.mask());
    if matches.get_flag("verbose") {
        mask |= PrintMask::VERBOSE;
    }

    DumpConfig {
        image,
        location,
        discovery: discovery.mode(),
        mask,
    }
}

/// Returns the command parser for `nvbios-dump`.
pub fn command_parser() -> Command {
    let image = Arg::new("image")
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
        .help("Path of the video BIOS image");

    let entry = Arg::new("entry")
        .long("entry")
        .value_parser(parse_offset)
        .help("Offset of the BIT 'T' entry");

    let base = Arg::new("base")
        .long("base")
        .value_parser(parse_offset)
        .requires("length")
        .help("Offset of the 'T' directory, when the BIT entry is not available");

    let length = Arg::new("length")
        .long("length")
        .value_parser(|value: &str| narrow::<u16>(value, "length"))
        .requires("base")
        .help("Byte length of the 'T' directory");

    let version = Arg::new("bit-version")
        .long("bit-version")
        .value_parser(|value: &str| narrow::<u8>(value, "version"))
        .default_value("1")
        .help("Version reported for a directory given by --base");

    let discovery = Arg::new("discovery")
        .long("discovery")
        .value_parser(EnumValueParser::<DiscoveryArg>::new())
        .default_value(DiscoveryArg::default().as_str())
        .help("How the directory slots are walked");

    let print = Arg::new("print")
        .long("print")
        .short('p')
        .value_parser(EnumValueParser::<Section>::new())
        .action(ArgAction::Append)
        .default_value(Section::default().as_str())
        .help("Sections to print, may be repeated");

    let verbose = Arg::new("verbose")
        .long("verbose")
        .short('v')
        .action(ArgAction::SetTrue)
        .help("Print separators between dumps and enable debug logging");

    Command::new("nvbios-dump")
        .about("Decodes the BIT 'T' table of an NVIDIA video BIOS image")
        .arg(image)
        .arg(entry)
        .arg(base)
        .arg(length)
        .arg(version)
        .arg(discovery)
        .arg(print)
        .arg(verbose)
        .group(
            ArgGroup::new("location")
                .args(["entry", "base"])
                .required(true),
        )
}

/// Parses a decimal or `0x` prefixed hexadecimal offset.
fn parse_offset(value: &str) -> Result<u64, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|error| format!("invalid offset {value:?}: {error}"))
}

/// Parses an offset-like value that must fit in `T`.
fn narrow<T: TryFrom<u64>>(value: &str, what: &str) -> Result<T, String> {
    let wide = parse_offset(value)?;
    T::try_from(wide).map_err(|_| format!("{what} {wide:#x} is too large"))
}
