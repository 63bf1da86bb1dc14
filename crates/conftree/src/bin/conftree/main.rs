mod cli;

use anyhow::Context;
use conftree::combine::{Combiner, Includes};
use conftree::node::{ConfTree, Source};
use conftree::query::{Pred, SelectOpts};
use conftree::value::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CONFTREE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Print(print_cli) => print(print_cli),
        cli::Command::Query(query_cli) => query(query_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn parse_one(grammar: cli::Grammar, source: Source) -> Result<ConfTree, conftree::parse::ParseError> {
    match grammar {
        cli::Grammar::Httpd => conftree::tag::parse(source),
        cli::Grammar::Nginx => conftree::brace::parse_nginx(source),
        cli::Grammar::Multipath => conftree::brace::parse_multipath(source),
        cli::Grammar::Logrotate => conftree::brace::parse_logrotate(source),
    }
}

fn default_main(grammar: cli::Grammar) -> &'static str {
    match grammar {
        cli::Grammar::Httpd => "httpd.conf",
        cli::Grammar::Nginx => "nginx.conf",
        cli::Grammar::Multipath => "multipath.conf",
        cli::Grammar::Logrotate => "logrotate.conf",
    }
}

fn include_rules(grammar: cli::Grammar) -> Option<Includes> {
    match grammar {
        cli::Grammar::Httpd => Some(Includes::httpd()),
        cli::Grammar::Nginx => Some(Includes::nginx()),
        cli::Grammar::Logrotate => Some(Includes::logrotate()),
        // multipath has no include mechanism
        cli::Grammar::Multipath => None,
    }
}

fn load_documents(input: &cli::InputArgs) -> anyhow::Result<Vec<ConfTree>> {
    if input.files.is_empty() {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        let source = Source::from_text("<stdin>", &stdin);
        return Ok(vec![parse_one(input.grammar, source)?]);
    }

    let mut documents = Vec::new();
    for file_path in &input.files {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let text = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Unable to read {}", file_path.display()))?;
        documents.push(parse_one(input.grammar, Source::from_text(file_path, &text))?);
    }

    Ok(documents)
}

fn load_combined(input: &cli::InputArgs) -> anyhow::Result<ConfTree> {
    let mut documents = load_documents(input)?;

    let rules = match include_rules(input.grammar) {
        Some(rules) => rules,
        None => {
            anyhow::ensure!(
                documents.len() == 1,
                "this grammar has no includes; pass exactly one file"
            );
            return Ok(documents.remove(0));
        }
    };

    if documents.len() == 1 && input.files.is_empty() {
        // stdin document, nothing to resolve includes against
        return Ok(documents.remove(0));
    }

    let main_file = input
        .main
        .clone()
        .unwrap_or_else(|| default_main(input.grammar).to_string());

    Ok(Combiner::new(documents, main_file, rules).combine()?)
}

fn print(cli: cli::PrintCommand) -> anyhow::Result<()> {
    let combined = load_combined(&cli.input)?;
    if combined.is_empty() {
        tracing::info!("configuration is empty");
    }

    match cli.output.format {
        cli::OutputFormat::Tree => print!("{combined}"),
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), &Value::from(&combined))?
        }
        cli::OutputFormat::Yaml => {
            serde_yaml::to_writer(std::io::stdout(), &Value::from(&combined))?
        }
    };

    Ok(())
}

fn query(cli: cli::QueryCommand) -> anyhow::Result<()> {
    let combined = load_combined(&cli.input)?;

    let path: Vec<Pred> = cli.path.iter().map(|name| Pred::from(name.as_str())).collect();
    let mut opts = SelectOpts::new().matches_only();
    if cli.deep {
        opts = opts.deep();
    }

    let matches = combined.select(&path, opts);
    let selected: Vec<_> = if cli.first {
        matches.first().into_iter().collect()
    } else if cli.last {
        matches.last().into_iter().collect()
    } else {
        matches.iter().collect()
    };

    // absence is a legitimate answer, not an error
    for node in selected {
        println!(
            "# {}:{}",
            node.file_name().unwrap_or("<unknown>"),
            node.lineno().unwrap_or_default()
        );
        print!("{node}");
    }

    Ok(())
}

/// (conftree-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Documents => {
            let documents = load_documents(&cli.input)?;
            println!("{documents:#?}");
        }
        Combined => {
            let combined = load_combined(&cli.input)?;
            println!("{combined:#?}");
        }
    }

    Ok(())
}
