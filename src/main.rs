use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use apicontroller::config::{Settings, DEFAULT_RECORDINGS_DIR};
use apicontroller::controller::{Controller, SaveRequest};
use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};

fn cli() -> Command {
    Command::new("apicontroller")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(-d --dir <DIR>)
                .help("Directory holding the recordings")
                .env("APICONTROLLER_DIR")
                .default_value(DEFAULT_RECORDINGS_DIR)
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(command!("list").about("list the stored recordings"))
        .subcommand(
            command!("save")
                .about("record a single http call")
                .arg(arg!(<NAME> "recording name"))
                .arg(arg!(<URL> "url of the api"))
                .arg(arg!(-m --method <METHOD> "http method").default_value("GET"))
                .arg(arg!(-H --headers <JSON> "headers as a JSON object"))
                .arg(arg!(-q --params <JSON> "query parameters as a JSON object"))
                .arg(arg!(-b --body <JSON> "request body as JSON")),
        )
        .subcommand(
            command!("import")
                .about("turn a client-call transcript into a sequence")
                .arg(arg!(<NAME> "recording name"))
                .arg(arg!(<TARGET_URL> "endpoint the calls are made against"))
                .arg(
                    arg!([FILE] "transcript file, stdin when omitted")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("run")
                .about("replay a recording")
                .arg(arg!(<NAME> "recording name"))
                .arg(
                    arg!(--debug "print the debug report when the replay fails")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("debug")
                .about("diagnose a recording")
                .arg(arg!(<NAME> "recording name")),
        )
        .subcommand(
            command!("show")
                .about("print a stored recording")
                .arg(arg!(<NAME> "recording name")),
        )
}

fn text_arg(matches: &ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

fn read_transcript(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("while reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("while reading stdin")?;
            Ok(text)
        }
    }
}

fn report_status(status: String) -> ExitCode {
    println!("{}", status);
    if status.starts_with('❌') {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(matches: ArgMatches) -> Result<ExitCode> {
    let dir = matches
        .get_one::<PathBuf>("dir")
        .cloned()
        .ok_or_else(|| anyhow!("no recordings directory"))?;
    let settings = Settings::new(dir);
    let mut controller = Controller::new(&settings)
        .with_context(|| format!("while opening {}", settings.recordings_dir.display()))?;

    let code = match matches.subcommand() {
        Some(("list", _)) => {
            for name in controller.list_names() {
                match controller.store().get(&name) {
                    Some(recording) => println!("{}\t{}", name, recording.created_at().to_rfc3339()),
                    None => println!("{}", name),
                }
            }
            ExitCode::SUCCESS
        }
        Some(("save", matches)) => report_status(controller.save(&SaveRequest {
            name: text_arg(matches, "NAME"),
            url: text_arg(matches, "URL"),
            method: text_arg(matches, "method"),
            headers: text_arg(matches, "headers"),
            query_params: text_arg(matches, "params"),
            body: text_arg(matches, "body"),
        })),
        Some(("import", matches)) => {
            let text = read_transcript(matches.get_one::<PathBuf>("FILE"))?;
            report_status(controller.import_transcript(
                &text_arg(matches, "NAME"),
                &text_arg(matches, "TARGET_URL"),
                &text,
            ))
        }
        Some(("run", matches)) => {
            let name = text_arg(matches, "NAME");
            let outcome = controller.execute(&name);
            println!("{}", if outcome.success { "Succès" } else { "Échec" });
            print!("{}", outcome.transcript);
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                if matches.get_flag("debug") {
                    println!();
                    print!("{}", controller.debug(&name));
                }
                ExitCode::FAILURE
            }
        }
        Some(("debug", matches)) => {
            print!("{}", controller.debug(&text_arg(matches, "NAME")));
            ExitCode::SUCCESS
        }
        Some(("show", matches)) => {
            let name = text_arg(matches, "NAME");
            let recording = controller
                .store()
                .get(&name)
                .ok_or_else(|| anyhow!("recording '{}' not found", name))?;
            println!("{}", serde_json::to_string_pretty(recording)?);
            ExitCode::SUCCESS
        }
        _ => unreachable!("this should've been prevented"),
    };
    Ok(code)
}

fn main() -> Result<ExitCode> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    run(cli().get_matches())
}
