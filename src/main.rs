// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod acquisition;
mod api;
mod camera;
mod error;
mod frame;
mod pipeline;
mod settings;
mod state;
mod util;

use crate::pipeline::Pipeline;
use crate::settings::{Args, Settings};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::from_args();
    let config = Settings::from_args(args)?;
    let runtime = tokio::runtime::Runtime::new().context("Unable to start async runtime")?;
    let result = runtime.block_on(async {
        let pipeline = Pipeline::new(config)?;
        info!("Serving thermal viewer on http://{}", pipeline.local_address());
        pipeline.await
    });
    if let Err(err) = &result {
        error!(error = ?err, "Shutting down");
    }
    // The acquisition thread blocks forever, don't wait for it.
    runtime.shutdown_background();
    result
}
