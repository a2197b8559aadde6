// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use futures::future::{Future, FutureExt};
use futures::ready;
use futures::stream::{FuturesUnordered, Stream};
use pin_project::pin_project;
use tokio::task::spawn_blocking;
use tracing::{debug, info_span};
use tracing_futures::Instrument;

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::acquisition::AcquisitionLoop;
use crate::api;
use crate::camera::SensorSource;
use crate::settings::Settings;
use crate::state::SharedThermalState;
use crate::util::flatten_join_result;

type InnerTask = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type TaskList = FuturesUnordered<InnerTask>;

/// The acquisition thread and the HTTP server, run together.
///
/// Neither task finishes during normal operation, so the pipeline only resolves if one of them
/// fails.
#[pin_project]
pub(crate) struct Pipeline {
    address: SocketAddr,
    #[pin]
    tasks: TaskList,
}

impl Pipeline {
    /// Bind the HTTP server and start acquiring frames. Must be called from within a tokio
    /// runtime.
    pub(crate) fn new(config: Settings) -> anyhow::Result<Self> {
        let state = SharedThermalState::new(config.display);

        let bind_address: SocketAddr = config.server.into();
        debug!(address = ?bind_address, "creating warp server");
        let (address, server) = warp::serve(api::routes(state.clone()))
            .try_bind_ephemeral(bind_address)
            .with_context(|| format!("Unable to start HTTP server on {}", bind_address))?;
        let server_task = server
            .instrument(info_span!("warp_server"))
            .map(Ok)
            .boxed();

        let source = SensorSource::from_settings(&config.sensor);
        let acquisition = AcquisitionLoop::new(source, state, config.acquisition);
        let acquisition_task = spawn_blocking(move || {
            acquisition
                .run()
                .context("Error within acquisition thread")
        })
        .map(flatten_join_result)
        .boxed();

        let tasks: TaskList = vec![acquisition_task, server_task].into_iter().collect();
        Ok(Self { address, tasks })
    }

    /// The address the HTTP server actually bound to.
    pub(crate) fn local_address(&self) -> SocketAddr {
        self.address
    }
}

impl Future for Pipeline {
    type Output = anyhow::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        // The first task to finish ends the whole pipeline.
        let res = ready!(this.tasks.poll_next(cx)).unwrap_or(Ok(()));
        debug!(result = ?res, "Pipeline terminating");
        Poll::Ready(res)
    }
}
