mod app;
mod calendar;
mod core;
mod input;
mod io;
mod panels;
mod ui;
mod weather;

fn main() {
    if let Err(err) = app::run() {
        eprintln!("dashdeck: {err:#}");
        std::process::exit(1);
    }
}
