use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "astra-mana",
    about = "Astra Mana: verifiable stewardship claims into token rewards",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Identity configuration file
    #[arg(long, global = true, default_value = mana_sdk::CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize an identity (writes the config, creates the ledger and wallet)
    Init(InitArgs),
    /// Generate a supporter keypair and save the private key to the keystore
    GenKeys(GenKeysArgs),
    /// Register a supporter's public key with the identity
    Register(RegisterArgs),
    /// Create a signed and mined proof JSON
    CreateProof(CreateProofArgs),
    /// Verify a proof and credit its reward
    SubmitProof(SubmitProofArgs),
    /// Show a wallet
    Wallet(WalletArgs),
    /// Show the transaction log for a wallet
    History(HistoryArgs),
}

/// Overrides for the identity configuration file.
#[derive(Args, Clone, Debug, Default)]
pub struct IdentityArgs {
    /// Identity name (wallet owner)
    #[arg(long)]
    pub name: Option<String>,
    /// Ledger database path
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Tokens credited per claimed hour
    #[arg(long)]
    pub tph: Option<u64>,
    /// Largest number of hours a single claim may carry
    #[arg(long)]
    pub max_hours: Option<f64>,
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
    #[arg(long)]
    pub classif: Option<String>,
    #[arg(long)]
    pub purpose: Option<String>,
    /// Reward token symbol
    #[arg(long)]
    pub token: Option<String>,
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct GenKeysArgs {
    /// Supporter name
    #[arg(long)]
    pub supporter: String,
    /// Keystore directory [default: ~/.astra_mana/keys]
    #[arg(long)]
    pub key_dir: Option<PathBuf>,
    /// Encrypt the saved key under this password
    #[arg(long)]
    pub password: Option<String>,
    /// Overwrite an existing key for this supporter
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
    /// Supporter name
    #[arg(long)]
    pub supporter: String,
    #[arg(long)]
    pub pubkey_hex: String,
}

#[derive(Args)]
pub struct CreateProofArgs {
    #[arg(long)]
    pub supporter: String,
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub hours: f64,
    #[arg(long, default_value = "")]
    pub evidence_uri: String,
    #[arg(long, default_value = "")]
    pub evidence_hash: String,
    /// Keystore directory [default: ~/.astra_mana/keys]
    #[arg(long)]
    pub key_dir: Option<PathBuf>,
    /// Password for an encrypted key
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long, default_value = "proof.json")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct SubmitProofArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
    #[arg(long)]
    pub proof_json: PathBuf,
}

#[derive(Args)]
pub struct WalletArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
    /// Wallet owner [default: the identity name]
    #[arg(long)]
    pub owner: Option<String>,
}
