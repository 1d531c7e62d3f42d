//! The `bare` command-line runner.

use std::{env, fs, process::ExitCode, rc::Rc};

use clap::Parser;

use barescript::{
    ExecuteOptions, FetchRequest, FetchResponse, evaluate_expression, execute_script_async, lint_script,
    new_value_object, parse_expression, parse_script, script_exit_code,
};

/// Environment variable naming the system include prefix.
const SYSTEM_PREFIX_VAR: &str = "BARE_SYSTEM_PREFIX";

/// The system-include bootstrap line prepended by `-m`.
const BOOTSTRAP_SOURCE: &str = "include <runtime.bare>";

#[derive(Parser)]
#[command(name = "bare", version, about = "The BareScript command-line runner")]
struct Cli {
    /// Execute the inline script code
    #[arg(short = 'c', value_name = "CODE", action = clap::ArgAction::Append)]
    code: Vec<String>,

    /// Debug mode: lint scripts and log diagnostics
    #[arg(short = 'd')]
    debug: bool,

    /// Static analysis only; exit 1 when there are warnings
    #[arg(short = 's')]
    static_analysis: bool,

    /// Prepend the system-include bootstrap line
    #[arg(short = 'm')]
    bootstrap: bool,

    /// Seed global NAME with the value of EXPR
    #[arg(short = 'v', num_args = 2, value_names = ["NAME", "EXPR"], action = clap::ArgAction::Append)]
    variables: Vec<String>,

    /// Script files or URLs, executed in order
    #[arg(value_name = "file")]
    files: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let globals = new_value_object();
    for pair in cli.variables.chunks(2) {
        let [name, text] = pair else {
            continue;
        };
        let value = match parse_expression(text, false)
            .map_err(|error| error.to_string())
            .and_then(|expr| {
                evaluate_expression(&expr, &ExecuteOptions::default(), None, true).map_err(|error| error.to_string())
            }) {
            Ok(value) => value,
            Err(error) => {
                eprintln!("-v {name}:\n{error}");
                return ExitCode::from(1);
            }
        };
        globals.borrow_mut().insert(name.clone(), value);
    }

    let options = ExecuteOptions {
        globals: Some(globals),
        debug: cli.debug,
        fetch_fn: Some(Rc::new(cli_fetch)),
        log_fn: Some(Rc::new(|message| eprintln!("{message}"))),
        system_prefix: env::var(SYSTEM_PREFIX_VAR).ok(),
        ..ExecuteOptions::default()
    };

    // inline scripts run before files, the bootstrap include before both
    let mut sources: Vec<(String, String)> = Vec::new();
    if cli.bootstrap {
        sources.push(("-m".to_owned(), BOOTSTRAP_SOURCE.to_owned()));
    }
    for (index, code) in cli.code.iter().enumerate() {
        sources.push((format!("-c {}", index + 1), code.clone()));
    }
    for file in &cli.files {
        match read_source(file) {
            Ok(text) => sources.push((file.clone(), text)),
            Err(error) => {
                eprintln!("{file}:\n{error}");
                return ExitCode::from(1);
            }
        }
    }
    if sources.is_empty() {
        eprintln!("bare: no scripts to run (see --help)");
        return ExitCode::from(1);
    }

    let mut warned = false;
    for (name, source) in &sources {
        let script = match parse_script(source, Some(name)) {
            Ok(script) => script,
            Err(error) => {
                eprintln!("{name}:\n{error}");
                return ExitCode::from(1);
            }
        };

        if cli.static_analysis || cli.debug {
            let warnings = lint_script(&script, None);
            warned = warned || !warnings.is_empty();
            for warning in &warnings {
                eprintln!("BareScript: {warning}");
            }
        }
        if cli.static_analysis {
            continue;
        }

        match execute_script_async(&script, &options) {
            Ok(result) => {
                let status = script_exit_code(&result);
                if status != 0 {
                    return ExitCode::from(status);
                }
            }
            Err(error) => {
                eprintln!("{name}:\n{error}");
                return ExitCode::from(1);
            }
        }
    }

    if cli.static_analysis && warned {
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn read_source(path: &str) -> Result<String, String> {
    let response = cli_fetch(&FetchRequest::get(path))?;
    if response.ok() {
        Ok(response.body)
    } else {
        Err(format!("fetch failed with status {}", response.status))
    }
}

/// Fetch layering: `http(s)` URLs over HTTP, anything else from the
/// filesystem.
fn cli_fetch(request: &FetchRequest) -> Result<FetchResponse, String> {
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return fs::read_to_string(&request.url)
            .map(FetchResponse::of)
            .map_err(|error| error.to_string());
    }

    let mut http_request = match &request.body {
        Some(_) => ureq::post(&request.url),
        None => ureq::get(&request.url),
    };
    for (header, value) in &request.headers {
        http_request = http_request.set(header, value);
    }
    let result = match &request.body {
        Some(body) => http_request.send_string(body),
        None => http_request.call(),
    };
    let response = match result {
        Ok(response) => response,
        // non-2xx responses surface with their status, not as transport errors
        Err(ureq::Error::Status(status, response)) => {
            return Ok(FetchResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            });
        }
        Err(error) => return Err(error.to_string()),
    };
    let status = response.status();
    let body = response.into_string().map_err(|error| error.to_string())?;
    Ok(FetchResponse { status, body })
}
