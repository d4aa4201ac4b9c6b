use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn parse_migrate_flags() {
    let cli = Cli::try_parse_from([
        "cv",
        "-p",
        "/srv/colvault",
        "migrate",
        "--target-version",
        "3",
        "--skip-fixtures",
    ])
    .unwrap();
    assert_eq!(cli.global.project_dir, "/srv/colvault");
    match cli.command {
        Commands::Migrate(args) => {
            assert_eq!(args.target_version, Some(3));
            assert!(args.skip_fixtures);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_rotate_key_with_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["cv", "rotate-key", "-v", "-c", "custom.yml"]).unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.config.as_deref(), Some("custom.yml"));
    assert!(matches!(cli.command, Commands::RotateKey));
}

#[test]
fn server_password_requires_username() {
    let result = Cli::try_parse_from(["cv", "migrate", "--server-password", "x"]);
    assert!(result.is_err());
}
