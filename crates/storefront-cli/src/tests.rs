use std::path::PathBuf;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["storefront-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn seed_templates_accepts_explicit_path() {
    let cli = Cli::try_parse_from([
        "storefront-cli",
        "seed-templates",
        "--path",
        "/etc/storefront/templates.yaml",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::SeedTemplates { path } => {
            assert_eq!(path, PathBuf::from("/etc/storefront/templates.yaml"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn seed_templates_defaults_to_repo_config() {
    if std::env::var_os("STOREFRONT_TEMPLATES_PATH").is_some() {
        return;
    }
    let cli =
        Cli::try_parse_from(["storefront-cli", "seed-templates"]).expect("expected valid cli args");
    match cli.command {
        Commands::SeedTemplates { path } => {
            assert_eq!(path, PathBuf::from("./config/email_templates.yaml"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn grant_admin_takes_positional_email() {
    let cli = Cli::try_parse_from(["storefront-cli", "grant-admin", "owner@example.com"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::GrantAdmin { ref email } if email == "owner@example.com"
    ));
}

#[test]
fn grant_admin_requires_email() {
    assert!(Cli::try_parse_from(["storefront-cli", "grant-admin"]).is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["storefront-cli"]).is_err());
}

#[test]
fn seed_file_in_repo_loads() {
    let file = storefront_core::load_templates(std::path::Path::new(
        "../../config/email_templates.yaml",
    ))
    .expect("seed file should load");
    assert!(!file.templates.is_empty());
}
