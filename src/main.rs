//! Main entry point for the nestjar CLI application.
//!
//! Lists and extracts entries of jar files, opening nested jars in place.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;

use nestjar::{Cli, Handler, JarEntry, JarFile};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let jar = open_jar(&cli)?;

    if cli.manifest {
        return print_manifest(&jar);
    }

    // List mode: display archive contents and exit
    if cli.list || cli.verbose {
        return list_entries(&jar, cli.verbose);
    }

    let entries: Vec<JarEntry> = jar
        .entries()
        .filter(|e| {
            if e.is_directory() {
                return false;
            }

            if !cli.files.is_empty() {
                let matches = cli.files.iter().any(|f| {
                    if has_glob_chars(f) {
                        glob_match(f, &e.name)
                    } else {
                        e.name == *f || base_name(&e.name) == f.as_str()
                    }
                });
                if !matches {
                    return false;
                }
            }

            !cli
                .exclude
                .iter()
                .any(|x| e.name.contains(x.as_str()) || glob_match(x, &e.name))
        })
        .collect();

    if !cli.is_very_quiet() {
        for pattern in &cli.files {
            let matched = entries.iter().any(|e| {
                glob_match(pattern, &e.name) || e.name == *pattern || base_name(&e.name) == pattern
            });
            if !matched {
                eprintln!("caution: filename not matched:  {pattern}");
            }
        }
    }

    let show_names = cli.pipe && entries.len() > 1;
    for entry in &entries {
        extract_entry(&jar, entry, &cli, show_names)?;
    }

    Ok(())
}

/// Open the jar named by the FILE argument, following nested segments.
///
/// FILE is either a `jar:` URL, resolved through a [`Handler`], or a path
/// whose `!/`-separated segments each open a nested jar or directory.
///
/// # Arguments
///
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// The innermost jar, or an error naming the segment that could not be opened.
fn open_jar(cli: &Cli) -> Result<JarFile> {
    if cli.is_jar_url() {
        let connection = Handler::new(cli.jar_file_options())
            .open_connection(&cli.file)
            .with_context(|| format!("cannot open {}", cli.file))?;
        return Ok(connection.jar_file().clone());
    }

    let (root, nested) = cli.nested_path();
    let mut jar = JarFile::open_with(root, &cli.jar_file_options())
        .with_context(|| format!("cannot open {root}"))?;
    for segment in nested {
        debug!(segment, "opening nested segment");
        jar = jar
            .nested_jar_file_by_name(segment)?
            .ok_or_else(|| anyhow!("{segment}: no such entry in {}", jar.url()))?;
    }
    Ok(jar)
}

/// Print the manifest of `jar`: main attributes, then each named section.
///
/// # Returns
///
/// An error if the jar has no manifest.
fn print_manifest(jar: &JarFile) -> Result<()> {
    let Some(manifest) = jar.manifest()? else {
        return Err(anyhow!("{} has no manifest", jar.url()));
    };
    for (name, value) in manifest.main_attributes().iter() {
        println!("{name}: {value}");
    }
    for (section, attributes) in manifest.sections() {
        println!();
        println!("[{section}]");
        for (name, value) in attributes.iter() {
            println!("{name}: {value}");
        }
    }
    Ok(())
}

/// List entries of the jar.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just entry names, one per line
/// - Verbose format (`-v`): Table with size, compression ratio, and timestamps
fn list_entries(jar: &JarFile, verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:>8}  Name",
            "Length", "Size", "Cmpr", "Date", "Time", "CRC-32"
        );
        println!("{}", "-".repeat(80));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in jar.entries() {
        if !verbose {
            println!("{}", entry.name);
            continue;
        }

        let ratio = if entry.size > 0 {
            format!(
                "{:>4}%",
                100i64 - (entry.compressed_size as i64 * 100 / entry.size as i64)
            )
        } else {
            "  0%".to_string()
        };
        let (date, time) = match entry.last_modified() {
            Some(modified) => (
                modified.format("%Y-%m-%d").to_string(),
                modified.format("%H:%M").to_string(),
            ),
            None => ("----------".to_string(), "--:--".to_string()),
        };

        println!(
            "{:>10}  {:>10}  {}  {}  {}  {:08x}  {}",
            entry.size, entry.compressed_size, ratio, date, time, entry.crc32, entry.name
        );

        if !entry.is_directory() {
            total_uncompressed += entry.size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(80));
        let total_ratio = if total_uncompressed > 0 {
            format!(
                "{:>4}%",
                100i64 - (total_compressed as i64 * 100 / total_uncompressed as i64)
            )
        } else {
            "  0%".to_string()
        };
        println!(
            "{:>10}  {:>10}  {}  {:>31}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

/// Extract a single entry from the jar.
///
/// Handles the pipe (`-p`), output directory (`-d`), junk paths (`-j`) and
/// overwrite (`-n`, `-o`) options.
fn extract_entry(jar: &JarFile, entry: &JarEntry, cli: &Cli, show_name: bool) -> Result<()> {
    let mut reader = jar
        .input_stream(entry)
        .with_context(|| format!("cannot read {}", entry.name))?;

    if cli.pipe {
        let mut stdout = io::stdout().lock();
        if show_name {
            writeln!(stdout, "--- {} ---", entry.name)?;
        }
        io::copy(&mut reader, &mut stdout)?;
        return Ok(());
    }

    let file_name = if cli.junk_paths {
        base_name(&entry.name).to_string()
    } else {
        entry.name.clone()
    };
    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(&file_name),
        None => PathBuf::from(&file_name),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", entry.name);
            }
            return Ok(());
        }
        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.name);
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(&output_path)
        .with_context(|| format!("cannot create {}", output_path.display()))?;
    io::copy(&mut reader, &mut file)?;

    Ok(())
}

/// Last path component of an entry name.
fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching supporting `*` (any run of characters) and `?` (one character).
///
/// # Arguments
///
/// * `pattern` - The glob pattern to match against
/// * `text` - The entry name to check
///
/// # Examples
///
/// ```ignore
/// assert!(glob_match("BOOT-INF/lib/*.jar", "BOOT-INF/lib/lib.jar"));
/// assert!(glob_match("a/?.txt", "a/b.txt"));
/// assert!(!glob_match("*.class", "application.yml"));
/// ```
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
