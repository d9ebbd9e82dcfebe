mod config;
mod error;
mod handlers;
mod model;
mod repository;
mod routes;

use std::process;

use clap::Parser;
use iron::Iron;
use log::{error, info};

use crate::config::Config;
use crate::repository::PostRepository;

// RUST_LOG=logger=info,blog_backend=debug blog_backend > logs 2>&1 &
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    let repository = if config.no_seed {
        PostRepository::new()
    } else {
        PostRepository::seeded()
    };
    info!("starting with {} posts", repository.posts().len());

    let address = config.address();
    match Iron::new(routes::chain(repository)).http(address.as_str()) {
        Ok(_listening) => info!("listening on {}", address),
        Err(e) => {
            error!("could not bind {}: {}", address, e);
            process::exit(1);
        }
    }
}
