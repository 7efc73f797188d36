use perft_bisect::reference::ReferenceOptions;
use perft_bisect::uci::{Misbehavior, ReferenceUci};

#[derive(clap::Parser, Debug)]
#[command(name = "perft_engine", about = "Reference perft engine speaking the line protocol on stdin/stdout")]
struct Args {
    /// Move token to drop from generation wherever it is legal (repeatable)
    #[arg(long = "hide", value_name = "MOVE")]
    hide: Vec<String>,
    /// Number of threads for root-split
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Exit after printing the move lines of the first perft, before the total
    #[arg(long, default_value_t = false)]
    exit_before_total: bool,
    /// Never answer `go perft`
    #[arg(long, default_value_t = false)]
    stall: bool,
    /// Never answer `isready`
    #[arg(long, default_value_t = false)]
    no_readyok: bool,
}

fn main() -> anyhow::Result<()> {
    use clap::Parser;
    env_logger::init();
    let args = Args::parse();
    let misbehavior = if args.exit_before_total {
        Misbehavior::ExitBeforeTotal
    } else if args.stall {
        Misbehavior::Stall
    } else if args.no_readyok {
        Misbehavior::NoReadyok
    } else {
        Misbehavior::None
    };
    let mut opts = ReferenceOptions::hiding(args.hide);
    opts.threads = args.threads;
    log::debug!("perft_engine: hidden={:?} threads={} misbehavior={:?}", opts.hidden_moves, opts.threads, misbehavior);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    ReferenceUci::new(opts, misbehavior).run_loop(stdin.lock(), stdout.lock())?;
    Ok(())
}
