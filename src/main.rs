use clap::{Parser, Subcommand};

use relsign::artifact::FsMetrics;
use relsign::error::{Result, SignerError};
use relsign::keys::file::{read_key_file, write_key_file, STDOUT_SENTINEL};
use relsign::keys::SecretKey;
use relsign::passphrase::{EnvThenPrompt, PassphraseSource};
use relsign::pipeline::ManifestMaker;

#[derive(Parser)]
#[command(name = "relsign")]
#[command(about = "Signify-compatible key management and update manifest signing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair and write the secret key file ('-' for stdout)
    Generate { filename: String },
    /// Print the public key from a secret key file
    Public { filename: String },
    /// Sign an update manifest
    Sign {
        /// Secret key file
        #[arg(short, long)]
        key: String,
        /// Release version
        #[arg(short, long)]
        version: String,
        /// Mark the release as mandatory
        #[arg(short, long)]
        mandatory: bool,
        /// GitHub repository ('username/project'); artifacts become
        /// release-download URLs instead of carrying explicit ones
        #[arg(short, long)]
        github: Option<String>,
        /// Output file for the signed manifest ('-' for stdout)
        #[arg(short, long, default_value = STDOUT_SENTINEL)]
        output: String,
        /// Artifacts: platform=path=url, or platform=path with --github
        #[arg(required = true)]
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let passphrase_source = EnvThenPrompt;

    match cli.command {
        Commands::Generate { filename } => {
            let passphrase = passphrase_source.read_passphrase(true)?;
            let (secret, public) = SecretKey::generate();
            println!("Public key: {}", public.to_base64());
            write_key_file(&filename, &passphrase, secret).await?;
        }
        Commands::Public { filename } => {
            let passphrase = passphrase_source.read_passphrase(false)?;
            let secret = read_key_file(&filename, &passphrase).await?;
            println!("untrusted comment: relsign public key");
            println!("{}", secret.public_key()?.to_base64());
        }
        Commands::Sign {
            key,
            version,
            mandatory,
            github,
            output,
            files,
        } => {
            let mut maker = ManifestMaker::new();
            maker.unlock_key_file(&key, &passphrase_source).await?;
            maker.set_version(&version, mandatory);

            for entry in &files {
                add_entry(&mut maker, entry, github.as_deref())?;
            }

            let document = maker.generate(&FsMetrics).await?;
            if output == STDOUT_SENTINEL {
                print!("{document}");
            } else {
                tokio::fs::write(&output, document).await?;
            }
        }
    }
    Ok(())
}

/// Parse a platform=path=url (or platform=path with a GitHub repo)
/// artifact argument and register it.
fn add_entry(maker: &mut ManifestMaker, entry: &str, github: Option<&str>) -> Result<()> {
    let mut parts = entry.splitn(3, '=');
    let platform = parts.next().filter(|p| !p.is_empty());
    let path = parts.next().filter(|p| !p.is_empty());
    let url = parts.next();

    match (platform, path, url, github) {
        (Some(platform), Some(path), Some(url), _) => {
            maker.add_file(platform, path, url);
            Ok(())
        }
        (Some(platform), Some(path), None, Some(repo)) => maker.add_github_file(platform, path, repo),
        _ => Err(SignerError::Format(format!(
            "expected platform=path=url (or platform=path with --github): {entry}"
        ))),
    }
}
