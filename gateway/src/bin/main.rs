// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

fn main() {
    if let Err(err) = atgate_gateway::run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
