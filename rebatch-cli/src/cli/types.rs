use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl From<OutputFormat> for rebatch_core::OutputFormat {
    fn from(arg: OutputFormat) -> Self {
        match arg {
            OutputFormat::Summary => Self::Summary,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// File attribute to sort matches by before numbering
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortArg {
    Size,
    Mtime,
    Atime,
    Btime,
    Ctime,
}

impl From<SortArg> for rebatch_core::SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Size => Self::Size,
            SortArg::Mtime => Self::Modified,
            SortArg::Atime => Self::Accessed,
            SortArg::Btime => Self::Birth,
            SortArg::Ctime => Self::Changed,
        }
    }
}
