use clap::Parser;

use crate::JarFileOptions;
use crate::url::SEPARATOR;

#[derive(Parser, Debug)]
#[command(name = "nestjar")]
#[command(version)]
#[command(about = "List and extract entries of jar files, including nested jars", long_about = None)]
#[command(after_help = "Examples:\n  \
  nestjar -l app.jar                                   list entries of app.jar\n  \
  nestjar -l 'app.jar!/BOOT-INF/lib/lib.jar'           list entries of a nested jar\n  \
  nestjar -p 'app.jar!/BOOT-INF/classes' app.yml      print an entry of a nested directory\n  \
  nestjar -p 'jar:file:/app.jar!/BOOT-INF/lib/lib.jar!/'   nested jar given as a URL\n  \
  nestjar -m app.jar                                   print the manifest")]
/// Command line arguments of the `nestjar` binary.
pub struct Cli {
    /// Jar file path, optionally followed by `!/`-separated nested jars, or a jar: URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List entries (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract entries to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Print the manifest
    #[arg(short = 'm', long = "manifest")]
    pub manifest: bool,

    /// Extract entries into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude entries that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Parse the central directory again even if this process already did
    #[arg(long = "no-cache")]
    pub no_cache: bool,
}

impl Cli {
    /// Whether FILE was given as a `jar:` URL.
    pub fn is_jar_url(&self) -> bool {
        self.file.starts_with("jar:")
    }

    /// Physical file and nested segments of a `path!/nested!/...` argument.
    pub fn nested_path(&self) -> (&str, Vec<&str>) {
        let mut parts = self.file.split(SEPARATOR);
        let root = parts.next().unwrap_or_default();
        let nested = parts.filter(|part| !part.is_empty()).collect();
        (root, nested)
    }

    /// Reader options selected by the flags.
    pub fn jar_file_options(&self) -> JarFileOptions {
        JarFileOptions {
            use_metadata_cache: !self.no_cache,
        }
    }

    /// Suppress progress messages (`-q`, or piping to stdout).
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    /// Also suppress warnings (`-qq`).
    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}
