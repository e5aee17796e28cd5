use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    nback::example_apps::run_nbackgen(std::env::args().skip(1))
}
