use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "runtar")]
#[command(version)]
#[command(about = "Query ustar archives in place, with HTTP URL support", long_about = None)]
#[command(after_help = "Examples:\n  \
  runtar data.tar check                    validate every header\n  \
  runtar data.tar list dir/                list the entries directly under dir/\n  \
  runtar data.tar read dir/a.txt --hex     hex dump a file\n  \
  runtar https://example.com/x.tar entries list a remote archive")]
pub struct Cli {
    /// Tar file path or HTTP URL (gzip-compressed archives are detected)
    #[arg(value_name = "FILE")]
    pub file: String,

    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode, print results only
    #[arg(short = 'q', global = true)]
    pub quiet: bool,

    /// Maximum number of symlinks followed for one path
    #[arg(long, value_name = "N", default_value_t = crate::tar::DEFAULT_MAX_SYMLINK_DEPTH, global = true)]
    pub max_symlinks: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate magic, version and checksum of every header
    Check,

    /// Test whether an entry exists
    Exists { path: String },

    /// Test whether an entry is a directory
    IsDir { path: String },

    /// Test whether an entry is a regular file
    IsFile { path: String },

    /// Test whether an entry is a symbolic link
    IsSymlink { path: String },

    /// List the immediate children of a directory
    List {
        path: String,

        /// Fail if the directory has more entries than this
        #[arg(short = 'n', long)]
        capacity: Option<usize>,
    },

    /// Read a file's contents
    Read {
        path: String,

        /// Byte offset to start reading at
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: u64,

        /// Maximum number of bytes to read (default: to the end)
        #[arg(short = 'l', long)]
        length: Option<usize>,

        /// Print a hex dump instead of raw bytes
        #[arg(long)]
        hex: bool,
    },

    /// Print every record in the archive
    Entries,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    /// Default log filter implied by `-v`
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
