use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use log::info;
use serde_json::{Map, Value};

/// Evaluates a bql script and prints its result as JSON.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// JSON object whose members become bindings
    #[clap(short, long, value_name = "FILE")]
    context: Option<PathBuf>,

    /// Restrict bindings to these context names
    #[clap(short, long = "var", value_name = "NAME")]
    vars: Vec<String>,

    /// Print the parsed AST instead of evaluating
    #[clap(short, long)]
    tree: bool,

    /// Print the normalised source rendering of the AST
    #[clap(short, long)]
    source: bool,

    file: PathBuf,
}

fn load_context(path: Option<&PathBuf>) -> Result<Map<String, Value>> {
    let path = match path {
        Some(path) => path,
        None => return Ok(Map::new()),
    };

    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;

    match value {
        Value::Object(members) => Ok(members),
        _ => bail!("context in {} must be a JSON object", path.display()),
    }
}

fn run(args: &Args) -> Result<()> {
    let script = fs::read_to_string(&args.file).with_context(|| format!("failed to read {}", args.file.display()))?;

    if args.tree || args.source {
        let program = bql::parse(&script)?;
        if args.tree {
            println!("{:#?}", program);
        }
        if args.source {
            println!("{}", program);
        }
        return Ok(());
    }

    let context = load_context(args.context.as_ref())?;
    let result = if args.vars.is_empty() {
        bql::eval(&script, &context)?
    } else {
        bql::eval_with_context(&script, &context, args.vars.as_slice())?
    };

    match result {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("{}", "null".cyan()),
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    info!("running {}", args.file.display());

    if let Err(e) = run(&args) {
        eprintln!("{}", format!("{:#}", e).red());
        process::exit(1);
    }

    info!("done");
}
