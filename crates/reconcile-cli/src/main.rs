use clap::Parser;
use reconcile_cli::{run, Cli};

fn main() {
    // Reset SIGPIPE to default behavior to prevent panic on broken pipe
    // (e.g., when piping analysis CSV output to `head`).
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();
    tracing_subscriber::fmt().with_env_filter(format!("reconcile={}", cli.log_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
