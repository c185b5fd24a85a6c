//! Native pointer actions consumed by the dispatcher
//!
//! The real injection layer lives outside this crate; `DryRunPointer` walks
//! the same timing loop and logs each step instead of moving the cursor.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::constants;

/// External automation actions. Both calls block for their full duration.
pub trait PointerBackend: Send + Sync {
    /// Move the pointer by `sensitivity` units `times` times, `rate` ms apart
    fn mouse_move(&self, sensitivity: f64, times: u32, rate: u32) -> Result<bool>;

    /// Left-click `times` times, `rate` ms apart
    fn mouse_click(&self, times: u32, rate: u32) -> Result<bool>;
}

/// Backend that only logs what it would inject
#[derive(Debug, Default)]
pub struct DryRunPointer;

impl PointerBackend for DryRunPointer {
    fn mouse_move(&self, sensitivity: f64, times: u32, rate: u32) -> Result<bool> {
        info!(sensitivity, times, rate, "mouse_move (dry run)");
        for step in 1..=times {
            debug!(step, dy = sensitivity, "move");
            thread::sleep(Duration::from_millis(rate.into()));
        }
        Ok(true)
    }

    fn mouse_click(&self, times: u32, rate: u32) -> Result<bool> {
        info!(times, rate, "mouse_click (dry run)");
        for step in 1..=times {
            debug!(step, "click");
            thread::sleep(Duration::from_millis(constants::pointer::CLICK_HOLD_MS));
            thread::sleep(Duration::from_millis(rate.into()));
        }
        Ok(true)
    }
}
