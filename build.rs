use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

// HAZARD_RECLAIM_CAPACITY, HAZARD_RECLAIM_SCAN_THRESHOLD

fn main() {
    println!("cargo:rerun-if-env-changed=HAZARD_RECLAIM_CAPACITY");
    println!("cargo:rerun-if-env-changed=HAZARD_RECLAIM_SCAN_THRESHOLD");

    let out_dir = env::var("OUT_DIR").expect("no out directory");
    let dest = Path::new(&out_dir).join("build_constants.rs");

    let mut file = File::create(&dest).expect("could not create file");

    let capacity: usize = read_env("HAZARD_RECLAIM_CAPACITY", 100);
    let scan: u32 = read_env("HAZARD_RECLAIM_SCAN_THRESHOLD", 100);

    if capacity == 0 {
        panic!("invalid HAZARD_RECLAIM_CAPACITY value (0)");
    }

    if scan == 0 {
        panic!("invalid HAZARD_RECLAIM_SCAN_THRESHOLD value (0)");
    }

    writeln!(&mut file, "const DEFAULT_CAPACITY: usize = {};", capacity)
        .expect("could not write to file");
    writeln!(&mut file, "const DEFAULT_SCAN_THRESHOLD: u32 = {};", scan)
        .expect("could not write to file");
}

fn read_env<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("failed to parse env variable {}", var)),
        Err(_) => default,
    }
}
