//! Transmission controller tests (simulated peripheral)

use std::sync::Arc;
use std::thread;

use rmt_pulse_tx::config::TRANS_QUEUE_DEPTH;
use rmt_pulse_tx::{Channel, ChannelConfig, Feature, HwError, PulseSequence, RmtError, SimRmt, Symbol};

/// 1 µs ticks: air time in µs equals the tick count.
fn us_channel(sim: &SimRmt) -> Channel<SimRmt> {
    Channel::create(sim.clone(), ChannelConfig::new(4).clock_div(80)).unwrap()
}

#[test]
fn test_toggle_scenario_reaches_hardware() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    channel.write_pulses(&PulseSequence::toggle(&[10, 20, 30], true)).unwrap();

    let frames = sim.submitted();
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].symbols,
        [Symbol::new(true, 10, false, 20), Symbol::new(true, 30, false, 0)]
    );
}

#[test]
fn test_constant_duration_scenario_reaches_hardware() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    let levels = [true, false, true, false];
    channel.write_pulses(&PulseSequence::constant_duration(50, &levels)).unwrap();

    assert_eq!(
        sim.submitted()[0].symbols,
        [Symbol::new(true, 50, false, 50), Symbol::new(true, 50, false, 50)]
    );
}

#[test]
fn test_write_is_non_blocking_until_wait() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    channel.write_pulses(&PulseSequence::toggle(&[10, 20, 30], true)).unwrap();
    assert_eq!(sim.pending(0), 1);
    assert_eq!(sim.clock_us(), 0);

    assert_eq!(channel.wait_done(1), Ok(true));
    assert_eq!(sim.pending(0), 0);
    assert_eq!(sim.clock_us(), 60);
}

#[test]
fn test_wait_done_timeout_then_forever() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    // 2 x 30 ms
    channel
        .write_pulses(&PulseSequence::constant_duration(30_000, &[true, false]))
        .unwrap();

    assert_eq!(channel.wait_done(10), Ok(false));
    assert_eq!(channel.wait_done(10), Ok(false));
    assert_eq!(sim.pending(0), 1);

    // 0 waits forever
    assert_eq!(channel.wait_done(0), Ok(true));
    assert_eq!(sim.clock_us(), 60_000);
}

#[test]
fn test_wait_done_repeatable_when_idle() {
    let sim = SimRmt::new();
    let channel = us_channel(&sim);

    assert_eq!(channel.wait_done(5), Ok(true));
    assert_eq!(channel.wait_done(0), Ok(true));
    assert!(channel.is_ready());
}

#[test]
fn test_frames_complete_in_submission_order() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    channel.write_pulses(&PulseSequence::toggle(&[1, 1], true)).unwrap();
    channel.write_pulses(&PulseSequence::toggle(&[2, 2], true)).unwrap();
    channel.write_pulses(&PulseSequence::toggle(&[3, 3], true)).unwrap();
    assert_eq!(channel.wait_done(0), Ok(true));

    let firsts: Vec<u32> = sim.completed().iter().map(|f| f.symbols[0].duration0()).collect();
    assert_eq!(firsts, [1, 2, 3]);
    assert_eq!(channel.queued(), 0);
}

#[test]
fn test_queue_fills_without_blocking() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    for _ in 0..TRANS_QUEUE_DEPTH {
        channel.write_pulses(&PulseSequence::toggle(&[1000, 1000], true)).unwrap();
    }

    assert_eq!(sim.pending(0), TRANS_QUEUE_DEPTH);
    assert_eq!(channel.queued(), TRANS_QUEUE_DEPTH);
    assert!(sim.completed().is_empty());
    assert_eq!(sim.clock_us(), 0);
}

#[test]
fn test_full_queue_rejected_without_waiting() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    for _ in 0..TRANS_QUEUE_DEPTH {
        channel.write_pulses(&PulseSequence::toggle(&[1000, 1000], true)).unwrap();
    }

    assert_eq!(
        channel.write_pulses(&PulseSequence::toggle(&[5, 5], true)),
        Err(RmtError::HardwareBusyOrRejected(HwError::INVALID_STATE))
    );
    assert_eq!(
        channel.transmit(&[Symbol::new(true, 5, false, 5)]),
        Err(RmtError::HardwareBusyOrRejected(HwError::INVALID_STATE))
    );
    assert_eq!(sim.submitted().len(), TRANS_QUEUE_DEPTH);
    assert_eq!(sim.clock_us(), 0);

    // Room again once one frame has gone out
    assert_eq!(channel.wait_done(2), Ok(false));
    assert_eq!(channel.queued(), TRANS_QUEUE_DEPTH - 1);
    assert!(channel.write_pulses(&PulseSequence::toggle(&[5, 5], true)).is_ok());
    assert_eq!(channel.queued(), TRANS_QUEUE_DEPTH);
}

#[test]
fn test_buffers_reused_in_rotation() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    let long: Vec<u32> = (1..=12).collect();
    channel.write_pulses(&PulseSequence::toggle(&long, true)).unwrap();
    for _ in 1..TRANS_QUEUE_DEPTH {
        channel.write_pulses(&PulseSequence::toggle(&[7], true)).unwrap();
    }
    let allocated = channel.symbol_capacity();
    assert_eq!(allocated, 6 + (TRANS_QUEUE_DEPTH - 1));

    assert_eq!(channel.wait_done(0), Ok(true));
    assert_eq!(channel.queued(), 0);

    // Lands in the first buffer again: no growth, only the new prefix sent
    channel.write_pulses(&PulseSequence::toggle(&[9], true)).unwrap();
    assert_eq!(channel.symbol_capacity(), allocated);

    let frames = sim.submitted();
    assert_eq!(frames[TRANS_QUEUE_DEPTH].symbols, [Symbol::new(true, 9, false, 0)]);
    assert_eq!(frames[0].symbols.len(), 6);
}

#[test]
fn test_loop_request_blocks_writes() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    assert!(channel.set_loop(true).is_err());
    let err = channel.write_pulses(&PulseSequence::toggle(&[1, 2], true));
    assert_eq!(err, Err(RmtError::NotSupported(Feature::Loop)));
    assert!(sim.submitted().is_empty());

    // Switching loop off again restores normal operation
    channel.set_loop(false).unwrap();
    assert!(channel.write_pulses(&PulseSequence::toggle(&[1, 2], true)).is_ok());
}

#[test]
fn test_malformed_input_never_reaches_hardware() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    assert_eq!(
        channel.write_pulses(&PulseSequence::paired(&[1, 2, 3], &[true, false])),
        Err(RmtError::LengthMismatch { durations: 3, levels: 2 })
    );
    assert_eq!(
        channel.write_pulses(&PulseSequence::toggle(&[], true)),
        Err(RmtError::EmptySequence)
    );
    assert_eq!(channel.transmit(&[]), Err(RmtError::EmptySequence));

    assert!(sim.submitted().is_empty());
    assert_eq!(channel.symbol_capacity(), 0);
}

#[test]
fn test_rejected_transmit_leaves_channel_usable() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    sim.reject_next_transmit(HwError::INVALID_STATE);
    assert_eq!(
        channel.write_pulses(&PulseSequence::toggle(&[1, 2], true)),
        Err(RmtError::HardwareBusyOrRejected(HwError::INVALID_STATE))
    );
    assert!(sim.submitted().is_empty());

    assert!(channel.is_ready());
    assert!(channel.write_pulses(&PulseSequence::toggle(&[1, 2], true)).is_ok());
    assert_eq!(sim.submitted().len(), 1);
}

#[test]
fn test_not_ready_after_teardown() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);
    channel.teardown();

    assert_eq!(channel.queued(), 0);
    assert_eq!(
        channel.write_pulses(&PulseSequence::toggle(&[1, 2], true)),
        Err(RmtError::NotReady)
    );
    assert_eq!(channel.transmit(&[Symbol::new(true, 1, false, 1)]), Err(RmtError::NotReady));
    assert_eq!(channel.wait_done(0), Err(RmtError::NotReady));
}

#[test]
fn test_teardown_aborts_in_flight() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    channel.write_pulses(&PulseSequence::toggle(&[1000, 1000], true)).unwrap();
    assert_eq!(sim.pending(0), 1);

    channel.teardown();
    assert_eq!(sim.aborted(), 1);
    assert!(sim.completed().is_empty());
    assert_eq!(sim.live_channels(), 0);
}

#[test]
fn test_transmit_raw_symbols() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);

    let symbols = [Symbol::new(true, 3, false, 4), Symbol::new(true, 5, false, 0)];
    channel.transmit(&symbols).unwrap();

    assert_eq!(sim.submitted()[0].symbols, symbols);
    assert_eq!(channel.symbol_capacity(), 2);
}

#[test]
fn test_idle_level_sent_as_eot_level() {
    let sim = SimRmt::new();
    let mut high = Channel::create(sim.clone(), ChannelConfig::new(1).idle_level(true)).unwrap();
    let mut low = Channel::create(sim.clone(), ChannelConfig::new(2)).unwrap();

    high.write_pulses(&PulseSequence::toggle(&[1], false)).unwrap();
    low.write_pulses(&PulseSequence::toggle(&[1], true)).unwrap();

    let frames = sim.submitted();
    assert!(frames[0].eot_level);
    assert!(!frames[1].eot_level);
}

#[test]
fn test_channels_do_not_share_queues() {
    let sim = SimRmt::new();
    let mut a = us_channel(&sim);
    let mut b = Channel::create(sim.clone(), ChannelConfig::new(5).clock_div(80)).unwrap();

    a.write_pulses(&PulseSequence::toggle(&[10], true)).unwrap();
    b.write_pulses(&PulseSequence::toggle(&[20], true)).unwrap();

    assert_eq!(sim.pending(0), 1);
    assert_eq!(sim.pending(1), 1);

    assert_eq!(b.wait_done(0), Ok(true));
    assert_eq!(sim.pending(0), 1);
    assert_eq!(sim.pending(1), 0);
}

#[test]
fn test_concurrent_wait_done() {
    let sim = SimRmt::new();
    let mut channel = us_channel(&sim);
    channel
        .write_pulses(&PulseSequence::constant_duration(20_000, &[true, false, true]))
        .unwrap();

    let channel = Arc::new(channel);
    let mut handles = vec![];

    for _ in 0..4 {
        let channel = Arc::clone(&channel);
        handles.push(thread::spawn(move || channel.wait_done(0)));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(true));
    }
    assert_eq!(sim.pending(0), 0);
    assert_eq!(sim.completed().len(), 1);
}
