use std::fs;
use std::io::Write;

use acmev1::{ClientConfig, Dns01Solver, Http01Solver, Solver, DEFAULT_DIRECTORY_URL};
use clap::Parser;
use flexi_logger::Logger;

/// A certificate-issuance client for the ACME v1-style protocol.
#[derive(Parser, Debug)]
#[clap(version = "0.1.0")]
struct Args {
    /// Path to the account's RSA private key, PEM encoded.
    #[clap(long)]
    account_key: String,
    /// Path to the certificate signing request, PEM encoded.
    #[clap(long)]
    csr: String,
    /// The ACME directory URL. Defaults to Let's Encrypt production.
    #[clap(long)]
    server: Option<String>,
    /// Which built-in challenge solver to use.
    #[clap(long, default_value = "dns-01")]
    solver: SolverKind,
    /// Seconds to wait between challenge-validation polls.
    #[clap(long, default_value_t = 60)]
    poll_interval_secs: u64,
    /// Give up after this many polls per domain (default: unbounded).
    #[clap(long)]
    max_poll_attempts: Option<u32>,
    /// Where to write the issued certificate. Defaults to stdout.
    #[clap(long)]
    out: Option<String>,
    /// Enables info-level logging.
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
enum SolverKind {
    Http01,
    Dns01,
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http-01" => Ok(SolverKind::Http01),
            "dns-01" => Ok(SolverKind::Dns01),
            other => Err(format!("unknown solver \"{other}\", expected http-01 or dns-01")),
        }
    }
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        Logger::with_str("info")
            .log_target(flexi_logger::LogTarget::StdOut)
            .start()
            .unwrap_or_else(|e| panic!("logger initialization failed with {e}"));
    }

    let account_key_pem = fs::read_to_string(&args.account_key)
        .unwrap_or_else(|e| panic!("could not read account key at {}: {e}", args.account_key));
    let csr_pem =
        fs::read_to_string(&args.csr).unwrap_or_else(|e| panic!("could not read CSR at {}: {e}", args.csr));

    let config = ClientConfig {
        directory_url: args
            .server
            .clone()
            .unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string()),
        poll_interval: std::time::Duration::from_secs(args.poll_interval_secs),
        max_poll_attempts: args.max_poll_attempts,
    };

    let http01 = Http01Solver;
    let dns01 = Dns01Solver;
    let solver: &dyn Solver = match args.solver {
        SolverKind::Http01 => &http01,
        SolverKind::Dns01 => &dns01,
    };

    let http = acmev1::ReqwestHttpClient::new().expect("failed to build the HTTP client");
    let sleeper = acmev1::ThreadSleeper;

    let pem = acmev1::issue_certificate(&account_key_pem, &csr_pem, &config, solver, &http, &sleeper)
        .expect("certificate issuance failed");

    match args.out {
        Some(path) => {
            let mut file = fs::File::create(&path).unwrap_or_else(|e| panic!("could not create {path}: {e}"));
            file.write_all(pem.as_bytes())
                .unwrap_or_else(|e| panic!("could not write {path}: {e}"));
        }
        None => print!("{pem}"),
    }
}
