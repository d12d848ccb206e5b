//! Search for bounded Petri-net realizations of a few classic formulas.
//!
//! Run with:
//! ```bash
//! cargo run --example realize -- cycle --bound 2
//! cargo run --example realize -- live --avoid-deadlocks
//! ```

use clap::{Parser, ValueEnum};
use log::info;

use mucalc_rs::lts::Lts;
use mucalc_rs::pool::TermPool;
use mucalc_rs::reference::FormulaId;
use mucalc_rs::regions::{BoundedNet, NetProperties};
use mucalc_rs::search::{ExpansionPolicy, Search, SearchConfig};
use mucalc_rs::tableau::Tableau;
use mucalc_rs::types::StateId;
use mucalc_rs::walk::{alphabet, prepare, Definitions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Example {
    /// nu X.(<a><b><c>true && <b><a>[c]X)
    Cycle,
    /// <a>true || <b>true
    Choice,
    /// <a>true
    Live,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Formula to realize.
    #[arg(value_enum, default_value = "cycle")]
    example: Example,

    /// Token bound of the net places.
    #[clap(long, value_name = "INT", default_value = "2")]
    bound: u32,

    /// Extend deadlock states of successful candidates instead of reporting them.
    #[clap(long)]
    avoid_deadlocks: bool,

    /// Stop after examining this many candidates.
    #[clap(long, value_name = "INT")]
    max_candidates: Option<usize>,

    /// Also print the successful tableau of every realization.
    #[clap(long)]
    tableau: bool,
}

fn build(pool: &TermPool, example: Example) -> FormulaId {
    match example {
        Example::Cycle => {
            let x = pool.mk_var("X");
            let abc = pool.mk_diamond("a", pool.mk_diamond("b", pool.mk_diamond("c", pool.mk_true())));
            let bacx = pool.mk_diamond("b", pool.mk_diamond("a", pool.mk_box("c", x)));
            pool.mk_nu("X", pool.mk_and([abc, bacx]))
        }
        Example::Choice => pool.mk_or([pool.mk_diamond("a", pool.mk_true()), pool.mk_diamond("b", pool.mk_true())]),
        Example::Live => pool.mk_diamond("a", pool.mk_true()),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();
    info!("cli = {:?}", cli);

    let time_total = std::time::Instant::now();

    let pool = TermPool::new();
    let f = prepare(&pool, &Definitions::new(), build(&pool, cli.example))?;
    info!("Formula: {}", pool.display(f));

    let policy = if cli.avoid_deadlocks {
        ExpansionPolicy::AvoidDeadlocks
    } else {
        ExpansionPolicy::Repair
    };
    let mut config = SearchConfig::default().with_policy(policy);
    if let Some(max) = cli.max_candidates {
        config = config.with_max_candidates(max);
    }
    let properties = NetProperties::default().with_bound(cli.bound);

    let mut count = 0;
    let mut search = Search::new(
        &pool,
        &BoundedNet,
        &properties,
        config,
        f,
        Lts::new(alphabet(&pool, f)),
        |ts: &Lts, tableau: &Tableau<StateId>| {
            count += 1;
            println!("// Realization #{} ({} states, {} arcs)", count, ts.num_states(), ts.num_arcs());
            match ts.to_dot() {
                Ok(dot) => print!("{}", dot),
                Err(e) => log::error!("Could not render realization: {}", e),
            }
            if cli.tableau {
                match tableau.to_dot(&pool) {
                    Ok(dot) => print!("{}", dot),
                    Err(e) => log::error!("Could not render tableau: {}", e),
                }
            }
        },
    )?;
    search.run()?;
    info!("Stats: {:?}", search.stats());

    let time_total = time_total.elapsed();
    info!("All done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
