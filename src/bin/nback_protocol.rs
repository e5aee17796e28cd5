use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    nback::example_apps::run_protocol(std::env::args().skip(1))
}
