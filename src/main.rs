fn main() {
    if let Err(err) = mindmap_core::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
