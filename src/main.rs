#![allow(unused_assignments)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use exprkit::{
    Diagnostic, ExprError, ExprResult, Expression, FunctionMap, PropertyMap, Severity, Token,
    Value, VariableMap,
};

/// exprkit expression evaluator
///
/// Evaluates, checks and pretty-prints expressions of the exprkit language.
#[derive(Parser)]
#[command(name = "exprkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log pipeline diagnostics to stderr (-v warnings, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct VariableArgs {
    /// Bind a variable (can be used multiple times, format: name=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    vars: Vec<(String, String)>,

    /// Load variables from a JSON or YAML file
    #[arg(long = "vars")]
    vars_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression ("-" reads it from stdin)
    Eval {
        expression: String,

        #[command(flatten)]
        variables: VariableArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print the variable table after evaluation
        #[arg(long)]
        show_vars: bool,

        /// Suppress warnings
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the canonical form of an expression
    Describe { expression: String },

    /// Report parse and validation diagnostics (exit 1 if the expression needed repair)
    Check { expression: String },

    /// Print the token tree of an expression
    Tokens { expression: String },

    /// Evaluate the properties of a JSON or YAML property file
    Props {
        file: PathBuf,

        /// Evaluate only this property
        #[arg(short, long)]
        key: Option<String>,

        #[command(flatten)]
        variables: VariableArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Parse a key=value pair
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid NAME=value: no '=' found in '{}'", s))?;
    Ok((s[..pos].trim().to_string(), s[pos + 1..].to_string()))
}

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Eval {
            expression,
            variables,
            format,
            show_vars,
            quiet,
        } => cmd_eval(expression, variables, format, show_vars, quiet),
        Commands::Describe { expression } => cmd_describe(expression),
        Commands::Check { expression } => cmd_check(expression),
        Commands::Tokens { expression } => cmd_tokens(expression),
        Commands::Props {
            file,
            key,
            variables,
            format,
        } => cmd_props(file, key, variables, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let exit_code = match &e {
                ExprError::Io { .. } => ExitCode::from(3),
                _ => ExitCode::from(1),
            };
            eprintln!("{:?}", miette::Report::new(e));
            exit_code
        }
    }
}

/// Route `tracing` output to stderr; `RUST_LOG` applies when no -v is given
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
        1 => EnvFilter::new("exprkit=warn"),
        2 => EnvFilter::new("exprkit=debug"),
        _ => EnvFilter::new("exprkit=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[derive(Serialize)]
struct EvalOutput<'a> {
    value: &'a Value,
    diagnostics: Vec<&'a Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a VariableMap>,
}

fn cmd_eval(
    expression: String,
    variables: VariableArgs,
    format: OutputFormat,
    show_vars: bool,
    quiet: bool,
) -> ExprResult<()> {
    let source = read_expression(expression)?;
    let mut vars = load_variables(&variables)?;
    let functions = FunctionMap::with_builtins();

    let expr = Expression::new(source);
    let evaluation = expr.evaluate_with_diagnostics(&functions, &mut vars);
    let diagnostics: Vec<&Diagnostic> = expr
        .diagnostics()
        .iter()
        .chain(&evaluation.diagnostics)
        .collect();

    match format {
        OutputFormat::Text => {
            if !quiet {
                print_warnings(&diagnostics);
            }
            println!("{}", evaluation.value);
            if show_vars {
                for (name, value) in vars.iter() {
                    println!("{} = {}", name, value);
                }
            }
        }
        OutputFormat::Json => {
            let output = EvalOutput {
                value: &evaluation.value,
                diagnostics: if quiet { Vec::new() } else { diagnostics },
                variables: show_vars.then_some(&vars),
            };
            println!("{}", to_json(&output)?);
        }
    }

    Ok(())
}

fn cmd_describe(expression: String) -> ExprResult<()> {
    let expr = Expression::new(read_expression(expression)?);
    println!("{}", expr.pretty());
    Ok(())
}

fn cmd_check(expression: String) -> ExprResult<()> {
    let source = read_expression(expression)?;
    let expr = Expression::new(source.clone());

    for diagnostic in expr.diagnostics() {
        let report = miette::Report::new(diagnostic.clone()).with_source_code(source.clone());
        eprintln!("{:?}", report);
    }

    if !expr.is_valid() {
        return Err(ExprError::invalid_input(format!(
            "'{}' is not a valid expression, it evaluates as '{}'",
            source,
            expr.pretty()
        )));
    }

    eprintln!("{}: OK", source);
    Ok(())
}

fn cmd_tokens(expression: String) -> ExprResult<()> {
    let expr = Expression::new(read_expression(expression)?);
    print_tokens(expr.tokens(), 0);
    Ok(())
}

fn print_tokens(tokens: &[Token], indent: usize) {
    let pad = "  ".repeat(indent);
    for token in tokens {
        match token {
            Token::Function { name, args } => {
                println!("{}function {}", pad, name);
                print_tokens(args, indent + 1);
            }
            Token::Group(inner) => {
                println!("{}group", pad);
                print_tokens(inner, indent + 1);
            }
            Token::Conditional {
                when_true,
                when_false,
            } => {
                println!("{}conditional", pad);
                println!("{}  true:", pad);
                print_tokens(when_true, indent + 2);
                println!("{}  false:", pad);
                print_tokens(when_false, indent + 2);
            }
            other => println!("{}{}", pad, other),
        }
    }
}

fn cmd_props(
    file: PathBuf,
    key: Option<String>,
    variables: VariableArgs,
    format: OutputFormat,
) -> ExprResult<()> {
    let text = read_file(&file)?;
    let props = if is_json(&file) {
        PropertyMap::from_json(&text)?
    } else {
        PropertyMap::from_yaml(&text)?
    };
    let mut vars = load_variables(&variables)?;
    let functions = FunctionMap::with_builtins();

    let keys: Vec<String> = match key {
        Some(key) => vec![key],
        None => props.keys().map(str::to_string).collect(),
    };

    let mut results = indexmap::IndexMap::new();
    for key in keys {
        let value = props.get(&key, Value::Null, &functions, &mut vars);
        results.insert(key, value);
    }

    match format {
        OutputFormat::Text => {
            for (key, value) in &results {
                println!("{} = {}", key, value);
            }
        }
        OutputFormat::Json => println!("{}", to_json(&results)?),
    }
    Ok(())
}

fn print_warnings(diagnostics: &[&Diagnostic]) {
    for diagnostic in diagnostics {
        if diagnostic.severity >= Severity::Warning {
            eprintln!("{}: {}", diagnostic.severity, diagnostic);
        }
    }
}

/// The expression argument, or stdin for "-"
fn read_expression(expression: String) -> ExprResult<String> {
    if expression != "-" {
        return Ok(expression);
    }
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .map_err(|e| ExprError::io_error(format!("failed to read stdin: {}", e)))?;
    Ok(source.trim_end_matches(['\n', '\r']).to_string())
}

fn load_variables(args: &VariableArgs) -> ExprResult<VariableMap> {
    let mut vars = match &args.vars_file {
        Some(path) => read_variables_file(path)?,
        None => VariableMap::new(),
    };
    for (name, value) in &args.vars {
        vars.insert(name.clone(), Value::infer(value));
    }
    Ok(vars)
}

fn read_variables_file(path: &Path) -> ExprResult<VariableMap> {
    let text = read_file(path)?;
    let parsed = if is_json(path) {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        ExprError::invalid_input(format!("invalid variables in {}: {}", path.display(), e))
    })
}

fn read_file(path: &Path) -> ExprResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ExprError::io_error(format!("failed to read {}: {}", path.display(), e)))
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn to_json<T: Serialize>(value: &T) -> ExprResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ExprError::invalid_input(format!("failed to serialize output: {}", e)))
}
