use colored::Colorize;

fn main() {
    if let Err(err) = traversal_probe::app::run_cli() {
        eprintln!("{} {}", "error:".bold().red(), err);
        std::process::exit(1);
    }
}
