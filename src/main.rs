fn main() {
    if let Err(err) = powerpunch_lib::run() {
        eprintln!("powerpunch: {err:#}");
        std::process::exit(1);
    }
}
