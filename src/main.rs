use std::io::Write;

use anyhow::Result;
use splitclock::catalog::Catalog;
use splitclock::config::TimerConfig;
use splitclock::driver::{self, Controller, HELP};
use splitclock::logging::{json_log, obj, v_num, v_str};
use splitclock::presentation::{render_table, SessionObserver, SessionSnapshot};
use tokio::io::BufReader;

/// Redraws the table on every change; clock-only changes rewrite one line.
#[derive(Default)]
struct TerminalObserver {
    last: Option<SessionSnapshot>,
}

impl SessionObserver for TerminalObserver {
    fn on_change(&mut self, snapshot: &SessionSnapshot) {
        match &self.last {
            Some(last) if last.same_except_clock(snapshot) => {
                print!("\rrta {}", snapshot.clock);
                let _ = std::io::stdout().flush();
            }
            _ => println!("\n{}", render_table(snapshot)),
        }
        self.last = Some(snapshot.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = TimerConfig::from_env().with_args(std::env::args().skip(1));
    let catalog = Catalog::from_config(&cfg)?;

    json_log(
        "startup",
        obj(&[
            ("source", v_str(&catalog.describe())),
            ("index", v_str(&cfg.index_file)),
            ("export_path", v_str(&cfg.export_path.display().to_string())),
            ("tick_ms", v_num(cfg.tick_ms as f64)),
        ]),
    );

    let mut controller = Controller::new(catalog, cfg);
    controller.subscribe(Box::new(TerminalObserver::default()));
    println!("{}", HELP);

    driver::run(controller, BufReader::new(tokio::io::stdin())).await
}
