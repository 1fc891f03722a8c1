//! An application for reading MHA file meta-data.

use std::env;
use flowvol::MhaHeader;

fn main() {
    let mut args = env::args().skip(1);
    let filename = args.next().expect("Path to MHA file is required");
    let parsed = MhaHeader::from_file(filename)
        .expect("Failed to read MHA file");
    println!("{:#?}", &parsed.header);
    for warning in &parsed.warnings {
        println!("warning: {}", warning);
    }
}
