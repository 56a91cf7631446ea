use std::env;

use actix_web::{App, HttpServer};
use actix_web::middleware::Logger;
use actix_web::web::Data;
use log::{debug, info};

use speedcam::cameras;
use speedcam::config::Config;
use speedcam::db;
use speedcam::handlers;
use speedcam::logging;
use speedcam::Result;


/// Loads configuration from the file named on the command line, or else the environment
fn load_config() -> Result<Config> {

    match env::args().nth(1) {
        Some(path) => {
            debug!("loading configuration from {}", path);
            Config::load(path)
        },
        None => {
            debug!("loading configuration from environment");
            Config::from_env()
        },
    }
}


#[actix_web::main]
async fn main() -> Result<()> {

    logging::init();

    let config = load_config()?;
    let pool = db::connect(&config.database_url, config.pool_size)?;

    if config.seed {
        cameras::maybe_seed_sample_cameras(&pool)?;
    }

    let pool = Data::new(pool);

    info!("listening on {}", config.listen);
    HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(pool.clone())
                .configure(handlers::configure)
        })
        .bind(&config.listen)?
        .run()
        .await?;

    Ok(())
}
