mod application;
mod presentation {
    pub mod cli;
}

fn main() {
    if let Err(e) = application::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
