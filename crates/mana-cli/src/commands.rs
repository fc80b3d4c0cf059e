use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use mana_sdk::{
    CancelToken, ClaimRequest, Identity, IdentityConfig, Proof, SupporterKeys, Transaction,
    WalletState,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::cli::*;
use crate::keystore;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let config = cli.config;
    match cli.command {
        Command::Init(args) => cmd_init(&config, args, format),
        Command::GenKeys(args) => cmd_gen_keys(args),
        Command::Register(args) => cmd_register(&config, args, format),
        Command::CreateProof(args) => cmd_create_proof(args).await,
        Command::SubmitProof(args) => cmd_submit_proof(&config, args),
        Command::Wallet(args) => cmd_wallet(&config, args, format),
        Command::History(args) => cmd_history(&config, args, format),
    }
}

/// The config file if present, else defaults, with flags applied on top.
fn resolve_config(path: &Path, overrides: &IdentityArgs) -> anyhow::Result<IdentityConfig> {
    let mut config = if path.exists() {
        debug!("loading identity config from {}", path.display());
        IdentityConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?
    } else {
        IdentityConfig::default()
    };
    apply_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut IdentityConfig, overrides: &IdentityArgs) {
    if let Some(name) = &overrides.name {
        config.name = name.clone();
    }
    if let Some(db) = &overrides.db {
        config.db_path = db.clone();
    }
    if let Some(tph) = overrides.tph {
        config.tokens_per_hour = tph;
    }
    if let Some(max_hours) = overrides.max_hours {
        config.max_hours_per_claim = max_hours;
    }
}

fn open_identity(path: &Path, overrides: &IdentityArgs) -> anyhow::Result<Identity> {
    let config = resolve_config(path, overrides)?;
    let db = config.db_path.clone();
    Identity::open(config).with_context(|| format!("failed to open ledger {}", db.display()))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(path: &Path, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let mut config = IdentityConfig::default();
    apply_overrides(&mut config, &args.identity);
    if let Some(classif) = args.classif {
        config.classification = classif;
    }
    if let Some(purpose) = args.purpose {
        config.purpose = purpose;
    }
    if let Some(token) = args.token {
        config.token = token;
    }
    config.validate()?;

    let identity = Identity::open(config.clone())?;
    config.save(path)?;
    let wallet = identity.wallet()?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "config": path,
            "identity": config,
            "wallet": wallet,
        })),
        OutputFormat::Text => {
            println!(
                "{} Initialized {} ({}, {})",
                "✓".green().bold(),
                config.name.bold(),
                config.classification,
                config.purpose
            );
            println!("  Config: {}", path.display());
            println!("  Ledger: {}", config.db_path.display().to_string().cyan());
            println!(
                "  Rate: {} {}/hour, max {} hours per claim",
                config.tokens_per_hour,
                config.token.yellow(),
                config.max_hours_per_claim
            );
            Ok(())
        }
    }
}

fn cmd_gen_keys(args: GenKeysArgs) -> anyhow::Result<()> {
    let key_dir = args.key_dir.unwrap_or_else(keystore::default_key_dir);
    let keys = SupporterKeys::generate(args.supporter.clone());
    let path = keystore::save_private_key(
        keys.signing_key(),
        &args.supporter,
        &key_dir,
        args.password.as_deref(),
        args.force,
    )?;
    print_json(&json!({
        "supporter": args.supporter,
        "keystore_path": path,
        "pubkey_hex": keys.public_key_hex(),
    }))
}

fn cmd_register(path: &Path, args: RegisterArgs, format: OutputFormat) -> anyhow::Result<()> {
    let identity = open_identity(path, &args.identity)?;
    let id = identity.register_supporter(&args.supporter, &args.pubkey_hex)?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "supporter": args.supporter,
            "id": id,
        })),
        OutputFormat::Text => {
            println!(
                "{} Registered {} ({})",
                "✓".green().bold(),
                args.supporter.bold(),
                id.short_id().dimmed()
            );
            Ok(())
        }
    }
}

async fn cmd_create_proof(args: CreateProofArgs) -> anyhow::Result<()> {
    let key_dir = args.key_dir.unwrap_or_else(keystore::default_key_dir);
    let key = keystore::load_private_key(&args.supporter, &key_dir, args.password.as_deref())?;
    let keys = SupporterKeys::from_signing_key(args.supporter, key);
    let request = ClaimRequest::new(args.action, args.hours)
        .with_evidence(args.evidence_uri, args.evidence_hash);

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling mining");
                cancel.cancel();
            }
        })
    };
    let mined =
        tokio::task::spawn_blocking(move || keys.create_proof_with_cancel(request, &cancel)).await;
    interrupt.abort();
    let proof = mined.context("mining task failed")??;

    std::fs::write(&args.out, proof.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!(
        "{} Wrote {} (claim {}, nonce {})",
        "✓".green().bold(),
        args.out.display(),
        proof.claim_id().yellow(),
        proof.payload.nonce
    );
    Ok(())
}

fn cmd_submit_proof(path: &Path, args: SubmitProofArgs) -> anyhow::Result<()> {
    let identity = open_identity(path, &args.identity)?;
    let text = std::fs::read_to_string(&args.proof_json)
        .with_context(|| format!("failed to read {}", args.proof_json.display()))?;
    let proof = Proof::from_json(&text)?;
    let reward = identity
        .verify_and_accept(&proof)
        .with_context(|| format!("claim {} rejected", proof.claim_id()))?;
    print_json(&json!({
        "reward": reward,
        "wallet": identity.wallet()?,
    }))
}

fn cmd_wallet(path: &Path, args: WalletArgs, format: OutputFormat) -> anyhow::Result<()> {
    let identity = open_identity(path, &args.identity)?;
    let wallet = identity.wallet()?;
    match format {
        OutputFormat::Json => print_json(&wallet),
        OutputFormat::Text => {
            print_wallet(&wallet);
            Ok(())
        }
    }
}

fn print_wallet(wallet: &WalletState) {
    println!(
        "{}: {} {}",
        wallet.owner.bold(),
        wallet.balance.to_string().green().bold(),
        wallet.token.yellow()
    );
}

fn cmd_history(path: &Path, args: HistoryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let identity = open_identity(path, &args.identity)?;
    let owner = args.owner.unwrap_or_else(|| identity.config().name.clone());
    let txs = identity.transactions(&owner)?;
    match format {
        OutputFormat::Json => print_json(&txs),
        OutputFormat::Text => {
            if txs.is_empty() {
                println!("No transactions for {}.", owner.bold());
            }
            for tx in &txs {
                print_transaction(tx);
            }
            print_wallet(&identity.wallet_state(&owner)?);
            Ok(())
        }
    }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{}  {} {} {}  {}",
        mana_types::format_timestamp(&tx.timestamp).dimmed(),
        tx.kind,
        format!("+{}", tx.amount).green(),
        tx.token.yellow(),
        tx.related_claim_id.as_deref().unwrap_or("-")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut config = IdentityConfig::default();
        apply_overrides(
            &mut config,
            &IdentityArgs {
                tph: Some(7),
                ..Default::default()
            },
        );
        assert_eq!(config.tokens_per_hour, 7);
        assert_eq!(config.name, "Astra");
        assert_eq!(config.max_hours_per_claim, 24.0);
    }

    #[test]
    fn resolve_reads_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astra.toml");
        IdentityConfig {
            name: "Willow".into(),
            tokens_per_hour: 3,
            ..Default::default()
        }
        .save(&path)
        .unwrap();

        let config = resolve_config(
            &path,
            &IdentityArgs {
                max_hours: Some(6.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.name, "Willow");
        assert_eq!(config.tokens_per_hour, 3);
        assert_eq!(config.max_hours_per_claim, 6.0);
    }

    #[test]
    fn resolve_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_config(
            &dir.path().join("missing.toml"),
            &IdentityArgs {
                max_hours: Some(-1.0),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn gen_keys_register_mine_submit() {
        let dir = tempfile::tempdir().unwrap();
        let key_dir = dir.path().join("keys");
        let config_path = dir.path().join("astra.toml");
        let identity_args = IdentityArgs {
            db: Some(dir.path().join("ledger.db")),
            ..Default::default()
        };

        let keys = SupporterKeys::generate("Grove");
        keystore::save_private_key(keys.signing_key(), "Grove", &key_dir, None, false).unwrap();
        let loaded = keystore::load_private_key("Grove", &key_dir, None).unwrap();
        let keys = SupporterKeys::from_signing_key("Grove", loaded);

        cmd_register(
            &config_path,
            RegisterArgs {
                identity: identity_args.clone(),
                supporter: "Grove".into(),
                pubkey_hex: keys.public_key_hex(),
            },
            OutputFormat::Json,
        )
        .unwrap();

        let proof_path = dir.path().join("proof.json");
        let proof = keys.create_proof(ClaimRequest::new("patrol", 2.0)).unwrap();
        std::fs::write(&proof_path, proof.to_json_pretty().unwrap()).unwrap();

        let submit = |path: &Path| {
            cmd_submit_proof(
                &config_path,
                SubmitProofArgs {
                    identity: identity_args.clone(),
                    proof_json: path.to_path_buf(),
                },
            )
        };
        submit(&proof_path).unwrap();
        assert!(submit(&proof_path).is_err());

        let identity = open_identity(&config_path, &identity_args).unwrap();
        assert_eq!(identity.wallet().unwrap().balance, 20);
    }

    #[tokio::test]
    async fn password_protected_key_mines_a_proof() {
        let dir = tempfile::tempdir().unwrap();
        let key_dir = dir.path().join("keys");
        cmd_gen_keys(GenKeysArgs {
            supporter: "Grove".into(),
            key_dir: Some(key_dir.clone()),
            password: Some("s3cret".into()),
            force: false,
        })
        .unwrap();

        let out = dir.path().join("proof.json");
        let create = |password: Option<&str>| CreateProofArgs {
            supporter: "Grove".into(),
            action: "patrol".into(),
            hours: 0.5,
            evidence_uri: String::new(),
            evidence_hash: String::new(),
            key_dir: Some(key_dir.clone()),
            password: password.map(str::to_string),
            out: out.clone(),
        };
        assert!(cmd_create_proof(create(None)).await.is_err());
        assert!(cmd_create_proof(create(Some("wrong"))).await.is_err());
        cmd_create_proof(create(Some("s3cret"))).await.unwrap();

        let proof = Proof::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(proof.supporter(), "Grove");
        assert_eq!(proof.hours(), 0.5);
    }
}
