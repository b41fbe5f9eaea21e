use log::info;
use std::thread;
use std::time::Duration;

/// Fixed pause between identifiers. Zero skips the sleep entirely.
pub fn item_delay(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    info!("Waiting for {} seconds (Item Delay)...", delay.as_secs_f32());
    thread::sleep(delay);
}
