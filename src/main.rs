use clap::Parser as ClapParser;
use std::io::{self, Read};
use treepath::{EvalError, ParseError, Value, compile, to_json, to_json_pretty};

#[derive(ClapParser)]
#[command(name = "treepath")]
#[command(about = "Apply a path template to JSON input and print the extracted values")]
#[command(version)]
struct Cli {
    /// The path template to apply, e.g. '{.items[*].name}'
    template: String,

    /// JSON input (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Treat fields that match nothing as empty instead of failing
    #[arg(long)]
    allow_missing_keys: bool,

    /// Pretty-print structured results
    #[arg(short, long)]
    pretty: bool,

    /// Only validate template syntax, don't evaluate
    #[arg(long)]
    syntax_only: bool,
}

/// Errors that can occur while driving the evaluator from the CLI
#[derive(Debug)]
enum CliError {
    /// Template syntax error
    Parse(ParseError),
    /// Evaluation error
    Eval(EvalError),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Use --input or pipe JSON to stdin."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoInput => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let path = compile("cli", &cli.template)
        .map_err(CliError::Parse)?
        .allow_missing_keys(cli.allow_missing_keys);

    if cli.syntax_only {
        println!("Syntax is valid");
        return Ok(());
    }

    let input = match cli.input {
        Some(s) => s,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    let json: serde_json::Value = serde_json::from_str(&input).map_err(CliError::Json)?;
    let root = Value::from(json);
    let groups = path.evaluate(&root).map_err(CliError::Eval)?;

    // template text supplies the separators between groups; values within
    // a group are space-separated
    let mut out = String::new();
    for group in &groups {
        let rendered: Vec<String> = group.iter().map(|v| render(v, cli.pretty)).collect();
        out.push_str(&rendered.join(" "));
    }
    println!("{}", out);
    Ok(())
}

fn render(value: &Value, pretty: bool) -> String {
    match value {
        Value::String(s) => s.clone(),
        other if pretty => to_json_pretty(other),
        other => to_json(other),
    }
}
