//! Bounded polling for asynchronous location fixes.
//!
//! The service resolves a location by round-tripping to the physical
//! device, so a fresh fix only becomes observable through repeated
//! refreshes. Each iteration checks the completion flag, then the
//! elapsed budget, and only then sleeps one poll interval before
//! refreshing again; the sleep is the only suspension point and is
//! never longer than one interval.

use std::time::Duration;

use log::debug;
use tokio::time::{sleep, Instant};

use crate::fmip::error::{FmipError, FmipResult};
use crate::fmip::service::FmipClient;
use crate::fmip::types::DeviceLocation;

impl FmipClient {
    /// Wait for a location fix on `device_id`, refreshing the device
    /// list every poll interval, for at most `timeout`.
    ///
    /// A device id unknown to the registry triggers one refresh before
    /// polling starts, covering a device registered after the last
    /// refresh; an id that is still unknown afterwards is an error.
    pub async fn locate_device(
        &mut self,
        device_id: &str,
        timeout: Duration,
    ) -> FmipResult<DeviceLocation> {
        if !self.registry.contains(device_id) {
            self.refresh().await?;
            if !self.registry.contains(device_id) {
                return Err(FmipError::DeviceNotFound(device_id.to_string()));
            }
        }

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let start = Instant::now();

        loop {
            if let Some(location) = self
                .registry
                .get(device_id)
                .and_then(|device| device.location.as_ref())
            {
                if location.location_finished {
                    debug!(
                        "fmip locate {}: fix after {:?}",
                        device_id,
                        start.elapsed()
                    );
                    return Ok(location.clone());
                }
            }

            if start.elapsed() >= timeout {
                return Err(FmipError::LocationTimeout {
                    device_id: device_id.to_string(),
                    waited_secs: start.elapsed().as_secs(),
                });
            }

            sleep(interval).await;
            self.refresh().await?;
        }
    }
}
