//! Main entry point for the runtar CLI application.
//!
//! This binary opens a tar archive from the local filesystem or a remote HTTP
//! URL, runs one query against it and prints what the query returned.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use runtar::{Cli, Command, HttpRangeReader, LocalFileReader, ReadAt, TarWalker};

/// Read granularity when streaming a whole file to stdout.
const CHUNK_SIZE: usize = 64 * 1024;

/// Application entry point.
///
/// Parses command-line arguments and dispatches to the appropriate handler
/// based on whether the input is a local file or HTTP URL.
fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if cli.is_http_url() {
        // Handle remote archive via HTTP Range requests
        let reader = HttpRangeReader::new(cli.file.clone())
            .with_context(|| format!("failed to open {}", cli.file))?;
        let transferred_before = reader.transferred_bytes();
        let reader = Arc::new(reader);

        process_source(reader.clone(), &cli)?;

        // Display network transfer statistics for HTTP sources
        if !cli.quiet {
            let transferred = reader.transferred_bytes() - transferred_before;
            eprintln!("\nTotal bytes transferred: {}", format_size(transferred));
        }
    } else {
        // Handle local tar file
        let reader = LocalFileReader::new(Path::new(&cli.file))
            .with_context(|| format!("failed to open {}", cli.file))?;
        process_source(Arc::new(reader), &cli)?;
    }

    Ok(())
}

/// Unwrap gzip compression if present, then run the query.
fn process_source<R: ReadAt>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    if runtar::io::is_gzip(&*reader)? {
        log::debug!("{}: gzip-compressed, inflating into memory", cli.file);
        let inflated = runtar::io::inflate(&*reader).context("failed to inflate archive")?;
        return process_tar(Arc::new(inflated), cli);
    }
    process_tar(reader, cli)
}

/// Run the selected command against an archive.
///
/// Result lines follow the `<operation> returned <value>` form; `-q` prints
/// the bare value instead.
fn process_tar<R: ReadAt>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let walker = TarWalker::new(reader).with_max_symlink_depth(cli.max_symlinks);

    match &cli.command {
        Command::Check => {
            let count = walker.check_archive()?;
            report(cli, "check_archive", count);
        }
        Command::Exists { path } => report(cli, "exists", walker.exists(path)? as u8),
        Command::IsDir { path } => report(cli, "is_dir", walker.is_dir(path)? as u8),
        Command::IsFile { path } => report(cli, "is_file", walker.is_file(path)? as u8),
        Command::IsSymlink { path } => report(cli, "is_symlink", walker.is_symlink(path)? as u8),
        Command::List { path, capacity } => list_dir(&walker, path, *capacity, cli)?,
        Command::Read {
            path,
            offset,
            length,
            hex,
        } => read_file(&walker, path, *offset, *length, *hex, cli)?,
        Command::Entries => list_entries(&walker, cli)?,
    }

    Ok(())
}

fn report(cli: &Cli, operation: &str, value: impl std::fmt::Display) {
    if cli.quiet {
        println!("{}", value);
    } else {
        println!("{} returned {}", operation, value);
    }
}

/// List a directory, optionally into a fixed number of slots.
fn list_dir<R: ReadAt>(
    walker: &TarWalker<R>,
    path: &str,
    capacity: Option<usize>,
    cli: &Cli,
) -> Result<()> {
    let names = match capacity {
        Some(capacity) => {
            let mut slots = vec![String::new(); capacity];
            let count = walker.list_into(path, &mut slots)?;
            slots.truncate(count);
            slots
        }
        None => walker.list(path)?,
    };

    if cli.quiet {
        for name in &names {
            println!("{}", name);
        }
    } else {
        println!("list returned {}", names.len());
        println!("[ {} ]", names.join(" "));
    }

    Ok(())
}

/// Read a file entry to stdout.
///
/// With `--length` a single read of that size is issued. Without it the
/// entry is streamed in chunks until nothing remains. The result line goes to
/// stderr so stdout carries only file content.
fn read_file<R: ReadAt>(
    walker: &TarWalker<R>,
    path: &str,
    offset: u64,
    length: Option<usize>,
    hex: bool,
    cli: &Cli,
) -> Result<()> {
    let mut buf = vec![0u8; length.unwrap_or(CHUNK_SIZE)];
    let mut stdout = std::io::stdout().lock();
    let mut position = offset;

    let remaining = loop {
        let read = walker.read_file(path, position, &mut buf)?;
        let data = &buf[..read.written];

        if hex {
            hex_dump(&mut stdout, data, position)?;
        } else {
            stdout.write_all(data)?;
        }
        position += read.written as u64;

        if length.is_some() || read.is_complete() {
            break read.remaining;
        }
    };
    stdout.flush()?;

    if !cli.quiet {
        eprintln!("read_file returned {}", remaining);
    }

    Ok(())
}

/// Print every record in archive order.
///
/// Each line shows the entry type, size and path; `-v` adds the header
/// offset. Symlinks also show their target.
fn list_entries<R: ReadAt>(walker: &TarWalker<R>, cli: &Cli) -> Result<()> {
    let mut total_size = 0u64;
    let mut count = 0usize;

    for entry in walker.parser().records() {
        let entry = entry?;

        let mut line = if cli.verbose > 0 {
            format!(
                "{:>10}  {}  {:>10}  {}",
                entry.header_offset,
                entry.entry_type.as_char(),
                entry.size,
                entry.path
            )
        } else {
            format!(
                "{}  {:>10}  {}",
                entry.entry_type.as_char(),
                entry.size,
                entry.path
            )
        };
        if entry.is_symlink() {
            line.push_str(" -> ");
            line.push_str(&entry.link_name);
        }
        println!("{}", line);

        total_size += entry.size;
        count += 1;
    }

    if !cli.quiet {
        println!("{}", "-".repeat(40));
        println!("{} entries, {}", count, format_size(total_size));
    }

    Ok(())
}

/// Write `bytes` as a hex dump, 16 bytes per row.
///
/// Each row is the offset, the bytes in hex, then the printable characters
/// (others shown as `.`).
fn hex_dump(out: &mut impl Write, bytes: &[u8], base_offset: u64) -> std::io::Result<()> {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        write!(out, "{:08x}:  ", base_offset + (row * 16) as u64)?;
        for b in chunk {
            write!(out, "{:02x} ", b)?;
        }
        for _ in chunk.len()..16 {
            write!(out, "   ")?;
        }
        let text: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        writeln!(out, " {}", text)?;
    }
    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
