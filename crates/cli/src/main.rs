use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use upload_files::{StorageConfig, StorageService, STORAGE_DIR_ENV};

#[derive(Parser)]
#[command(name = "upload")]
#[command(about = "Upload storage CLI")]
struct Cli {
    /// Storage root directory
    #[arg(long, global = true, env = STORAGE_DIR_ENV)]
    root: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage root
    Init,
    /// Store a local file
    Store {
        /// File to upload
        source: PathBuf,
        /// Name to store under (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List stored files
    List,
    /// Show where a stored file lives and what it contains
    Show {
        /// Stored file name
        name: String,
    },
    /// Write a stored file to stdout
    Cat {
        /// Stored file name
        name: String,
    },
    /// Remove the storage root and everything in it
    DeleteAll,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'upload --help' for commands");
        return ExitCode::SUCCESS;
    };

    let storage = match open_storage(cli.root) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&storage, command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// An explicit `--root` must be non-blank; without one the default location is used.
fn open_storage(root: Option<String>) -> Result<StorageService, Box<dyn std::error::Error>> {
    let config = match root {
        Some(root) => StorageConfig::new(root)?,
        None => StorageConfig::default(),
    };
    Ok(StorageService::from_config(&config)?)
}

fn run(storage: &StorageService, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init => {
            storage.init()?;
            println!("Initialised storage at {}", storage.root_location().display());
        }
        Commands::Store { source, name } => {
            let name = stored_name(&source, name)?;
            let file = File::open(&source)?;
            let stored = storage.store(&name, file)?;
            println!("Stored {}", stored.display());
        }
        Commands::List => {
            let mut count = 0usize;
            for entry in storage.load_all()? {
                println!("{}", entry?.display());
                count += 1;
            }
            if count == 0 {
                println!("No files stored.");
            }
        }
        Commands::Show { name } => {
            let resource = storage.load_as_resource(&name)?;
            println!("URI: {}", resource.uri());
            println!("Size: {} bytes", resource.content_length()?);
            println!("Media type: {}", resource.media_type().unwrap_or("unknown"));
        }
        Commands::Cat { name } => {
            let resource = storage.load_as_resource(&name)?;
            let mut file = resource.open()?;
            io::copy(&mut file, &mut io::stdout().lock())?;
        }
        Commands::DeleteAll => {
            storage.delete_all();
            println!("Deleted {}", storage.root_location().display());
        }
    }

    Ok(())
}

/// Picks the stored name: the explicit `--name`, else the source's final component.
fn stored_name(source: &Path, name: Option<String>) -> Result<String, String> {
    match name {
        Some(name) => Ok(name),
        None => source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| format!("cannot derive a name from {}", source.display())),
    }
}
