fn main() {
    if let Err(err) = node_arrange::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
