//! Status LED task.
//!
//! The LED is wired active-low. The current pattern is replaced whenever a
//! new one is signalled, including in the middle of a blink.

use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use crate::led_logic::LedPattern;

pub type LedSignal = Signal<CriticalSectionRawMutex, LedPattern>;

pub static LED_PATTERN: LedSignal = Signal::new();

#[embassy_executor::task]
pub async fn led_task(mut led: Output<'static>, patterns: &'static LedSignal) -> ! {
    let mut pattern = patterns.wait().await;
    loop {
        match pattern {
            LedPattern::Solid => {
                led.set_low();
                pattern = patterns.wait().await;
            }
            LedPattern::Blink { on_ms, off_ms } => {
                led.set_low();
                if let Either::Second(next) =
                    select(Timer::after(Duration::from_millis(on_ms)), patterns.wait()).await
                {
                    pattern = next;
                    continue;
                }
                led.set_high();
                if let Either::Second(next) =
                    select(Timer::after(Duration::from_millis(off_ms)), patterns.wait()).await
                {
                    pattern = next;
                }
            }
        }
    }
}
