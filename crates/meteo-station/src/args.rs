use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::sim::LightChip;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP port, overrides the configuration
    #[arg(long)]
    pub port: Option<u16>,

    /// CSV sample log, overrides the configuration
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Light sensor fitted on the simulated bus
    #[arg(long, value_enum, default_value_t = LightFamily::A)]
    pub light_family: LightFamily,

    /// Run without network time
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightFamily {
    /// TSL45315
    A,
    /// LTR-329ALS-01
    B,
    /// Nothing answers at the light sensor address
    Absent,
}

impl From<LightFamily> for LightChip {
    fn from(family: LightFamily) -> Self {
        match family {
            LightFamily::A => Self::Tsl45315,
            LightFamily::B => Self::Ltr329,
            LightFamily::Absent => Self::Absent,
        }
    }
}
