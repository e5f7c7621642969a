//! regnav command-line tool

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use regnav_core::NavigatorConfig;
use regnav_reference::ArtifactReference;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("regnav")
        .version(regnav_core::VERSION)
        .about("Registry reference and navigation tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("parse")
                .about("Parse a registry reference")
                .arg(
                    Arg::new("reference")
                        .required(true)
                        .help("Reference such as host:5000/ns/repo:tag or host/repo@sha256:..."),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("compose")
                .about("Compose a reference from its parts")
                .arg(Arg::new("registry").long("registry").required(true).help("Registry host"))
                .arg(
                    Arg::new("repository")
                        .long("repository")
                        .required(true)
                        .help("Repository path"),
                )
                .arg(Arg::new("tag").long("tag").help("Tag name"))
                .arg(Arg::new("digest").long("digest").help("Manifest digest"))
                .group(
                    ArgGroup::new("target")
                        .args(["tag", "digest"])
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Validate a configuration file and print the effective settings")
                .arg(Arg::new("path").required(true).help("TOML configuration file")),
        )
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_parse(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(text) = args.get_one::<String>("reference") else {
        bail!("missing reference");
    };
    let reference =
        ArtifactReference::parse(text).with_context(|| format!("cannot parse {text:?}"))?;
    tracing::debug!(%reference, "parsed");

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&reference)?);
    } else {
        println!("registry:   {}", reference.registry());
        println!("repository: {}", reference.repository());
        match reference.digest() {
            Some(digest) => println!("digest:     {digest}"),
            None => println!("tag:        {}", reference.tag_or_digest()),
        }
    }
    Ok(())
}

fn run_compose(args: &ArgMatches) -> anyhow::Result<()> {
    let (Some(registry), Some(repository)) = (
        args.get_one::<String>("registry"),
        args.get_one::<String>("repository"),
    ) else {
        bail!("--registry and --repository are required");
    };

    let reference = match (args.get_one::<String>("tag"), args.get_one::<String>("digest")) {
        (Some(tag), None) => ArtifactReference::with_tag(registry, repository, tag),
        (None, Some(digest)) => ArtifactReference::with_digest(registry, repository, digest),
        _ => bail!("exactly one of --tag or --digest is required"),
    };

    // Reject parts that would not read back as the same reference.
    let text = reference.to_string();
    let reparsed = ArtifactReference::parse(&text)
        .with_context(|| format!("composed {text:?} is not a valid reference"))?;
    if reparsed != reference {
        bail!("composed {text:?} parses back differently");
    }
    println!("{text}");
    Ok(())
}

fn run_config(config: &NavigatorConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("parse", args)) => {
            init_tracing(&NavigatorConfig::default().log_filter);
            run_parse(args)
        }
        Some(("compose", args)) => {
            init_tracing(&NavigatorConfig::default().log_filter);
            run_compose(args)
        }
        Some(("config", args)) => {
            let Some(path) = args.get_one::<String>("path") else {
                bail!("missing configuration path");
            };
            let config = NavigatorConfig::load(path).with_context(|| format!("loading {path}"))?;
            init_tracing(&config.log_filter);
            tracing::info!(path = %path, "configuration is valid");
            run_config(&config)
        }
        _ => unreachable!("subcommand_required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn compose_requires_tag_or_digest() {
        let result = cli().try_get_matches_from([
            "regnav",
            "compose",
            "--registry",
            "r",
            "--repository",
            "p",
        ]);
        assert!(result.is_err());

        let both = cli().try_get_matches_from([
            "regnav",
            "compose",
            "--registry",
            "r",
            "--repository",
            "p",
            "--tag",
            "t",
            "--digest",
            "d",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn compose_round_trips() {
        let matches = cli()
            .try_get_matches_from([
                "regnav",
                "compose",
                "--registry",
                "registry:5000",
                "--repository",
                "ns/repo",
                "--tag",
                "v1",
            ])
            .unwrap();
        let Some(("compose", args)) = matches.subcommand() else {
            panic!("expected compose");
        };
        assert!(run_compose(args).is_ok());
    }

    #[test]
    fn compose_rejects_tag_with_slash() {
        let matches = cli()
            .try_get_matches_from([
                "regnav",
                "compose",
                "--registry",
                "ghcr.io",
                "--repository",
                "org/app",
                "--tag",
                "a/b",
            ])
            .unwrap();
        let Some(("compose", args)) = matches.subcommand() else {
            panic!("expected compose");
        };
        assert!(run_compose(args).is_err());
    }
}
