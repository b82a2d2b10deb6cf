use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let matches = Command::new("agentgate")
        .version(VERSION)
        .about("Agentgate - request routing and admission control for generation handlers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .global(true),
        )
        .subcommand(
            Command::new("route")
                .about("Print the routing decision for a request")
                .arg(
                    Arg::new("request")
                        .short('r')
                        .long("request")
                        .value_name("JSON")
                        .help("Generation request as a JSON object")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("handlers")
                .about("List the handler catalog")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print manifests as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("check-config").about("Load and validate a configuration file"))
        .subcommand(
            Command::new("drain")
                .about("Submit requests and drain the queue through the admission gate")
                .arg(
                    Arg::new("requests")
                        .short('r')
                        .long("requests")
                        .value_name("FILE")
                        .help("File with one JSON request per line")
                        .required(true),
                ),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    let result = match matches.subcommand() {
        Some(("route", sub_matches)) => {
            let request = sub_matches
                .get_one::<String>("request")
                .map(String::as_str)
                .unwrap_or_default();
            commands::route::run(config_path, request).await
        }
        Some(("handlers", sub_matches)) => {
            commands::handlers::run(config_path, sub_matches.get_flag("json")).await
        }
        Some(("check-config", _)) => commands::check_config::run(config_path).await,
        Some(("drain", sub_matches)) => {
            let requests = sub_matches
                .get_one::<String>("requests")
                .map(String::as_str)
                .unwrap_or_default();
            commands::drain::run(config_path, requests).await
        }
        _ => {
            println!("agentgate v{}", VERSION);
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
