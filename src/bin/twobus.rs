use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use num_complex::Complex64;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use twobus::report::{format_fp_solution, format_solution, format_ybus, PrintProgress};
use twobus::{
    fixed_point, make_ybus, newtonpf, newtonpf_pq, parse_complex, parse_real, write_history,
    BusState, FPOpt, PFOpt, PFOptBuilder,
};

/// Two-bus AC power flow.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Newton's method for the load bus angle (P specified, |V| fixed)
    #[command(name = "nr")]
    Newton(NrArgs),

    /// Newton's method for a PQ load bus (P and Q specified)
    #[command(name = "pq")]
    NewtonPQ(PqArgs),

    /// Fixed-point current/voltage recursion
    #[command(name = "fp")]
    FixedPoint(FpArgs),
}

#[derive(Args)]
struct LineArgs {
    /// Series impedance of the line (e.g. 0.05+0.25j or 0.255<78.69).
    #[arg(long, allow_hyphen_values = true, value_parser = complex_arg)]
    z_line: Option<Complex64>,

    /// Shunt impedance of the line (0 for none).
    #[arg(long, allow_hyphen_values = true, value_parser = complex_arg)]
    z_shunt: Option<Complex64>,
}

#[derive(Args)]
struct NrArgs {
    #[command(flatten)]
    line: LineArgs,

    /// Slack bus voltage magnitude (pu).
    #[arg(long)]
    v1: Option<f64>,

    /// Load bus voltage magnitude (pu).
    #[arg(long)]
    v2: Option<f64>,

    /// Initial load bus angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    theta: Option<f64>,

    /// Specified active power at the load bus (pu).
    #[arg(long, allow_hyphen_values = true)]
    p: Option<f64>,

    /// Termination tolerance on per unit P mismatch.
    #[arg(long)]
    tol: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    max_it: Option<usize>,

    /// Fraction of the Newton step applied.
    #[arg(long)]
    damping: Option<f64>,

    /// Central-difference derivative instead of the closed form.
    #[arg(long, default_value_t = false)]
    numerical: bool,
}

#[derive(Args)]
struct PqArgs {
    #[command(flatten)]
    line: LineArgs,

    /// Slack bus voltage magnitude (pu).
    #[arg(long, default_value_t = 1.0)]
    v1: f64,

    /// Initial load bus voltage magnitude (pu).
    #[arg(long)]
    v2: Option<f64>,

    /// Initial load bus angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    theta: Option<f64>,

    /// Specified active power at the load bus (pu).
    #[arg(long, allow_hyphen_values = true)]
    p: Option<f64>,

    /// Specified reactive power at the load bus (pu).
    #[arg(long, allow_hyphen_values = true)]
    q: Option<f64>,

    /// Termination tolerance on per unit P & Q mismatch.
    #[arg(long)]
    tol: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    max_it: Option<usize>,
}

#[derive(Args)]
struct FpArgs {
    /// Initial load bus voltage.
    #[arg(long, allow_hyphen_values = true, value_parser = complex_arg)]
    v2: Option<Complex64>,

    /// Load bus complex power.
    #[arg(long, allow_hyphen_values = true, value_parser = complex_arg)]
    s2: Option<Complex64>,

    /// Line impedance.
    #[arg(long, allow_hyphen_values = true, value_parser = complex_arg)]
    z12: Option<Complex64>,

    /// Termination tolerance on the change of I and V.
    #[arg(long)]
    tol: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    max_it: Option<usize>,

    /// Write the I/V history to this file (tab separated).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn complex_arg(s: &str) -> std::result::Result<Complex64, String> {
    parse_complex(s).map_err(|err| err.to_string())
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let success = match &cli.command {
        Commands::Newton(args) => run_nr(args)?,
        Commands::NewtonPQ(args) => run_pq(args)?,
        Commands::FixedPoint(args) => run_fp(args)?,
    };
    if !success {
        bail!("power flow did not succeed");
    }
    Ok(())
}

/// Reads one line per attempt until `parse` accepts it.
fn prompt<T>(label: &str, parse: impl Fn(&str) -> twobus::Result<T>) -> Result<T> {
    let stdin = io::stdin();
    loop {
        print!("{}: ", label);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("no value given for {}", label);
        }
        match parse(&line) {
            Ok(value) => return Ok(value),
            Err(err) => eprintln!("error: {}", err),
        }
    }
}

fn or_prompt<T>(
    value: Option<T>,
    label: &str,
    parse: impl Fn(&str) -> twobus::Result<T>,
) -> Result<T> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label, parse),
    }
}

fn or_prompt_default(value: Option<f64>, label: &str, default: f64) -> Result<f64> {
    or_prompt(value, &format!("{} (default {:e})", label, default), |s| {
        if s.trim().is_empty() {
            Ok(default)
        } else {
            parse_real(s)
        }
    })
}

fn line_impedances(line: &LineArgs) -> Result<(Complex64, Complex64)> {
    let z_line = or_prompt(line.z_line, "Series line impedance", parse_complex)?;
    let z_shunt = or_prompt(line.z_shunt, "Shunt impedance", parse_complex)?;
    Ok((z_line, z_shunt))
}

fn build_opt(mut builder: PFOptBuilder, tol: f64, max_it: Option<usize>) -> Result<PFOpt> {
    builder.tolerance(tol);
    if let Some(max_it) = max_it {
        builder.max_it(max_it);
    }
    Ok(builder.build()?)
}

fn run_nr(args: &NrArgs) -> Result<bool> {
    println!("=== Newton's method for a 2-bus load flow ===");
    let (z_line, z_shunt) = line_impedances(&args.line)?;
    let ybus = make_ybus(z_line, z_shunt)?;
    print!("{}", format_ybus(&ybus));

    let v1 = or_prompt(args.v1, "Slack bus voltage (pu)", parse_real)?;
    let v2 = or_prompt(args.v2, "Load bus voltage (pu)", parse_real)?;
    let theta = or_prompt(args.theta, "Initial load bus angle (degrees)", parse_real)?;
    let p = or_prompt(args.p, "Specified active power (pu)", parse_real)?;
    let tol = or_prompt_default(args.tol, "Convergence tolerance", 1e-6)?;

    let mut builder = if args.numerical {
        PFOpt::nr_numeric()
    } else {
        PFOpt::nr()
    };
    if let Some(damping) = args.damping {
        builder.damping(damping);
    }
    let opt = build_opt(builder, tol, args.max_it)?;
    log::debug!("{:?}", opt);

    let progress = PrintProgress::default();
    let state0 = BusState::new(v1, v2, theta.to_radians());
    let sol = newtonpf(&ybus, state0, p, &opt, Some(&progress))?;

    println!("\n=== Result ===");
    print!("{}", format_solution(&sol, p, None));
    Ok(sol.converged())
}

fn run_pq(args: &PqArgs) -> Result<bool> {
    println!("=== Newton's method for a 2-bus load flow, PQ bus ===");
    let (z_line, z_shunt) = line_impedances(&args.line)?;
    let ybus = make_ybus(z_line, z_shunt)?;
    print!("{}", format_ybus(&ybus));

    let v2 = or_prompt(args.v2, "Initial load bus voltage (pu)", parse_real)?;
    let theta = or_prompt(args.theta, "Initial load bus angle (degrees)", parse_real)?;
    let p = or_prompt(args.p, "Specified active power (pu)", parse_real)?;
    let q = or_prompt(args.q, "Specified reactive power (pu)", parse_real)?;

    let opt = build_opt(PFOpt::pq(), args.tol.unwrap_or(1e-6), args.max_it)?;
    log::debug!("{:?}", opt);

    let progress = PrintProgress::with_ybus(&ybus);
    let state0 = BusState::new(args.v1, v2, theta.to_radians());
    let sol = newtonpf_pq(&ybus, state0, p, q, &opt, Some(&progress))?;

    println!("\n=== Result ===");
    print!("{}", format_solution(&sol, p, Some(q)));
    Ok(sol.converged())
}

fn run_fp(args: &FpArgs) -> Result<bool> {
    println!("=== Fixed-point bus voltage iteration ===");
    let v2 = or_prompt(args.v2, "Load bus voltage V2", parse_complex)?;
    let s2 = or_prompt(args.s2, "Load bus power S2", parse_complex)?;
    let z12 = or_prompt(args.z12, "Line impedance Z12", parse_complex)?;

    let mut opt = FPOpt::default();
    if let Some(tol) = args.tol {
        opt.tolerance = tol;
    }
    if let Some(max_it) = args.max_it {
        opt.max_it = max_it;
    }

    let progress = PrintProgress::default();
    let sol = fixed_point(v2, s2, z12, &opt, Some(&progress))?;

    println!("\n=== Result ===");
    print!("{}", format_fp_solution(&sol));

    if let Some(out_path) = &args.output {
        write_history(out_path, &sol.history)?;
        println!("History written to '{}'.", out_path.display());
    }
    Ok(sol.status == twobus::Status::Converged)
}
