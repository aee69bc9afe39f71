// src/main.rs
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use pacengine::log::LogLevel;
use pacengine::pac::{self, downloader::download_pac, worker};
use pacengine::{handle, EngineConfig, EvaluationRequest, Evaluator};
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use std::time::Duration;
use url::Url;

/// Evaluate a PAC script in a sandbox and print the proxy decision.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run one evaluation job from stdin (hidden; used by the evaluator's re-exec path)
    #[arg(long, hide = true)]
    internal_worker: bool,
    /// PAC script file, or `-` for stdin
    #[arg(
        long,
        conflicts_with = "pac_url",
        required_unless_present_any = ["pac_url", "internal_worker"]
    )]
    script: Option<String>,
    /// Download the PAC script from an http(s) URL
    #[arg(long, value_parser = parse_pac_url)]
    pac_url: Option<String>,
    /// Destination host passed to FindProxyForURL (defaults to the host of --url)
    #[arg(long)]
    host: Option<String>,
    /// Destination URL passed to FindProxyForURL
    #[arg(long)]
    url: Option<String>,
    /// Client address returned by myIpAddress()
    #[arg(long, required_unless_present = "internal_worker")]
    src_ip: Option<String>,
    /// Execution budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Print the full JSON response
    #[arg(long)]
    json: bool,
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

fn parse_pac_url(s: &str) -> Result<String, String> {
    if pac::is_pac_url(s) {
        Ok(s.to_string())
    } else {
        Err("expected an http or https URL".to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    pacengine::log::init(cli.log_level);

    if cli.internal_worker {
        return match worker::serve(io::stdin().lock(), io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: evaluation worker failed: {}", e);
                ExitCode::from(2)
            }
        };
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the evaluation succeeded.
fn run(cli: &Cli) -> Result<bool> {
    let mut config = EngineConfig::from_env();
    if let Some(ms) = cli.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    let script = match (&cli.script, &cli.pac_url) {
        (_, Some(pac_url)) => download_pac(pac_url, &config)?,
        (Some(path), None) => read_script(path)?,
        (None, None) => bail!("either --script or --pac-url is required"),
    };
    let src_ip = cli
        .src_ip
        .as_deref()
        .ok_or_else(|| anyhow!("--src-ip is required"))?;
    let host = match (&cli.host, &cli.url) {
        (Some(host), _) => host.clone(),
        (None, Some(url)) => Url::parse(url)
            .with_context(|| format!("invalid --url {url}"))?
            .host_str()
            .ok_or_else(|| anyhow!("URL has no host: {url}"))?
            .to_string(),
        (None, None) => bail!("either --host or --url is required"),
    };

    let mut request = EvaluationRequest::new(script, host, src_ip);
    request.destination_url = cli.url.clone();

    let response = handle(&Evaluator::new(config), &request);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if let Some(directives) = &response.directives {
        let rendered: Vec<String> = directives.iter().map(ToString::to_string).collect();
        println!("Proxy for {} → {}", request.effective_url(), rendered.join("; "));
    } else {
        eprintln!(
            "Evaluation failed: {}",
            response.message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(response.is_success())
}

fn read_script(path: &str) -> Result<String> {
    if path == "-" {
        let mut script = String::new();
        io::stdin()
            .read_to_string(&mut script)
            .context("failed to read PAC script from stdin")?;
        return Ok(script);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read PAC script {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn script_and_pac_url_are_exclusive() {
        let both = Cli::try_parse_from([
            "pacengine",
            "--script",
            "proxy.pac",
            "--pac-url",
            "http://wpad/wpad.dat",
            "--src-ip",
            "10.0.0.1",
        ]);
        assert!(both.is_err());

        let neither = Cli::try_parse_from(["pacengine", "--src-ip", "10.0.0.1"]);
        assert!(neither.is_err());
    }

    #[test]
    fn pac_url_must_be_http() {
        let cli = Cli::try_parse_from([
            "pacengine",
            "--pac-url",
            "file:///etc/proxy.pac",
            "--src-ip",
            "10.0.0.1",
        ]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from([
            "pacengine",
            "--pac-url",
            "https://wpad.example.com/wpad.dat",
            "--src-ip",
            "10.0.0.1",
            "--host",
            "example.com",
        ])
        .unwrap();
        assert_eq!(cli.pac_url.as_deref(), Some("https://wpad.example.com/wpad.dat"));
        assert!(cli.script.is_none());
    }

    #[test]
    fn worker_mode_needs_no_request_flags() {
        let cli = Cli::try_parse_from(["pacengine", "--internal-worker"]).unwrap();
        assert!(cli.internal_worker);
    }
}
