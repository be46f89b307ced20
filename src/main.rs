//! rmt-demo - pulse train on one RMT channel
//!
//! 1. Create a TX channel (100 ns ticks)
//! 2. Send the same pattern in each of the three pulse modes
//! 3. Wait for the queue to drain, drain the event log
//!
//! On ESP-IDF the log goes to UART1 (GPIO6). On the host the simulated
//! peripheral stands in for the RMT and everything prints to stdout.

use rmt_pulse_tx::{logging, Channel, ChannelConfig, PulseSequence, RmtBackend, RMT_EVENTS};

/// Output pin for the pulse train.
const DEMO_PIN: i32 = 18;

/// Toggle mode: 1 µs high, 2 µs low, 3 µs high.
const TOGGLE_TICKS: [u32; 3] = [10, 20, 30];

/// Constant-duration mode: 5 µs per level.
const CONST_TICKS: u32 = 50;
const CONST_LEVELS: [bool; 4] = [true, false, true, false];

/// Paired mode.
const PAIRED_TICKS: [u32; 5] = [100, 50, 100, 50, 200];
const PAIRED_LEVELS: [bool; 5] = [true, false, true, false, true];

/// Queue the three demo frames back to back, then wait up to `timeout_ms`.
fn run_pattern<B: RmtBackend>(channel: &mut Channel<B>, timeout_ms: u32) -> rmt_pulse_tx::error::Result<bool> {
    let frames = [
        PulseSequence::toggle(&TOGGLE_TICKS, true),
        PulseSequence::constant_duration(CONST_TICKS, &CONST_LEVELS),
        PulseSequence::paired(&PAIRED_TICKS, &PAIRED_LEVELS),
    ];

    for frame in &frames {
        channel.write_pulses(frame)?;
    }
    channel.wait_done(timeout_ms)
}

#[cfg(target_os = "espidf")]
fn main() -> Result<(), esp_idf_svc::sys::EspError> {
    use core::fmt::Write;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::uart::{self, UartTxDriver};
    use rmt_pulse_tx::hal::EspRmt;

    /// `fmt::Write` over the log UART.
    struct UartWriter<'a, 'd>(&'a mut UartTxDriver<'d>);

    impl Write for UartWriter<'_, '_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.write(s.as_bytes()).map(|_| ()).map_err(|_| core::fmt::Error)
        }
    }

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take()?;
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(115_200));
    let mut log_uart = UartTxDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio6,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )?;
    let mut out = UartWriter(&mut log_uart);
    let _ = writeln!(out, "{}", env!("VERSION_STRING"));

    let config = ChannelConfig::new(DEMO_PIN).channel_id(0);
    let mut channel = match Channel::create(EspRmt::new(), config) {
        Ok(channel) => channel,
        Err(err) => {
            let _ = writeln!(out, "rmt: {}", err);
            logging::drain_to(&RMT_EVENTS, &mut out);
            loop {
                FreeRtos::delay_ms(1000);
            }
        }
    };
    let _ = writeln!(out, "{}", channel);

    loop {
        if let Err(err) = run_pattern(&mut channel, 100) {
            let _ = writeln!(out, "rmt: {}", err);
        }
        logging::drain_to(&RMT_EVENTS, &mut out);
        FreeRtos::delay_ms(1000);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<(), rmt_pulse_tx::RmtError> {
    use rmt_pulse_tx::SimRmt;

    println!("{}", env!("VERSION_STRING"));

    let sim = SimRmt::new();
    let mut channel = Channel::create(sim.clone(), ChannelConfig::new(DEMO_PIN).channel_id(0))?;
    println!("{}", channel);

    let done = run_pattern(&mut channel, 100)?;
    println!("all frames done: {} (t = {} us)", done, sim.clock_us());

    for frame in sim.completed() {
        println!("slot {} ticks {:>4}: {:?}", frame.slot, frame.ticks(), frame.symbols);
    }

    channel.teardown();
    println!("{}", channel);

    let mut out = String::new();
    logging::drain_to(&RMT_EVENTS, &mut out);
    print!("{}", out);
    Ok(())
}
