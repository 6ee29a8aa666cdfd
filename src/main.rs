use fanpage_tui::RunOptions;

fn main() {
    let Some(opts) = handle_cli_flags() else {
        return;
    };

    if let Err(err) = fanpage_tui::run_with(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when a flag was fully handled and the program should exit.
fn handle_cli_flags() -> Option<RunOptions> {
    let mut opts = RunOptions::default();
    let mut saw_flag = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Fanpage-TUI {}", fanpage_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Fanpage-TUI: the fan page in your terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --dump-html          Load the page once and print it as HTML\n  --base-url <url>     Backend to talk to (default {})",
                    fanpage_tui::api::DEFAULT_BASE_URL
                );
                saw_flag = true;
            }
            "--dump-html" => opts.dump_html = true,
            "--base-url" => match args.next() {
                Some(url) => opts.base_url = Some(url),
                None => {
                    eprintln!("error: --base-url needs a value");
                    std::process::exit(2);
                }
            },
            _ => {}
        }
    }
    if saw_flag {
        None
    } else {
        Some(opts)
    }
}
