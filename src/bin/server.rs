//! UPLIFT relay server binary.
//! Run with: cargo run --bin uplift-server

use std::process::ExitCode;

use uplift::start_uplift;

fn main() -> ExitCode {
    start_uplift::run()
}
