//! Sensor bus contract.
//!
//! The sampling loop is the only owner of the bus handle; reads are
//! synchronous and expected to return quickly (an SPI transfer on the real
//! hardware). Implementations live with the application, not in this crate.

use crate::Result;

/// A synchronous, exclusively-owned ADC read path.
///
/// `read` returns one raw sample in `[0, adc_max]`. A bus failure is fatal
/// for the monitoring loop; there is no recovery path for a broken sensor
/// link, so implementations should not retry internally forever.
pub trait SensorBus: Send {
    fn read(&mut self) -> Result<u16>;
}

impl<F> SensorBus for F
where
    F: FnMut() -> Result<u16> + Send,
{
    fn read(&mut self) -> Result<u16> {
        self()
    }
}
